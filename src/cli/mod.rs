//! Command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};

use crate::entities::users::Role;

/// Coffyman - shop management backend
#[derive(Parser, Debug)]
#[command(name = "coffyman")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Change a user's role, e.g. to bootstrap the first administrator
    SetRole {
        /// Email of an existing user
        email: String,

        /// ADMIN or USER
        #[arg(value_parser = parse_role)]
        role: Role,
    },
}

fn parse_role(value: &str) -> Result<Role, String> {
    value.parse().map_err(|e: anyhow::Error| e.to_string())
}
