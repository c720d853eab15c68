use bookverse_cart::{config::AppConfig, services::auth_service::issue_token};
use uuid::Uuid;

// usage: issue-token [user-id] [role]
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let mut args = std::env::args().skip(1);
    let user_id = match args.next() {
        Some(raw) => Uuid::parse_str(&raw)?,
        None => Uuid::new_v4(),
    };
    let role = args.next().unwrap_or_else(|| "user".to_string());

    let token = issue_token(&config.jwt_secret, user_id, &role, config.token_ttl_hours)?;

    println!("User ID: {user_id}");
    println!("Role: {role}");
    println!("Authorization: Bearer {token}");
    Ok(())
}
