//! Create-key command - operator bootstrap for key issuance

use crate::config::AppConfig;
use crate::domain::api_key::ApiKeyRepository;

/// Mint one API key against the configured repository and print the
/// one-time plaintext secret.
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    let repository = crate::create_api_key_repository(&config).await?;

    let issued = repository.create(None).await?;

    println!("API key issued");
    println!("  id:         {}", issued.api_key.id().unwrap_or("-"));
    println!("  key_prefix: {}", issued.api_key.key_prefix());
    println!("  secret:     {}  (shown once, store it now)", issued.secret);

    Ok(())
}
