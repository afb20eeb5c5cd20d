use crate::config::Config;
use crate::db::Store;
use crate::entities::users::Role;

pub async fn cmd_set_role(config: &Config, email: &str, role: Role) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    if store.set_user_role_by_email(email.trim(), role).await? {
        println!("✓ {email} is now {role}");
    } else {
        println!("No user registered with email {email}");
    }

    Ok(())
}
