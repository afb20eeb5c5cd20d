use crate::config::{ACCESS_SECRET_ENV, Config, REFRESH_SECRET_ENV};

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("✓ Config file created. Edit config.toml and run again.");
    } else {
        println!("config.toml already exists, left untouched.");
    }
    println!("Token secrets are not written to the file; set {ACCESS_SECRET_ENV} and {REFRESH_SECRET_ENV}.");
    Ok(())
}
