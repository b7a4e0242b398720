use smsgate::{ClientConfig, SmsGateError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("smsgate=debug")),
        )
        .init();

    let client = ClientConfig::from_env()?.build()?;
    let Some(oauth) = client.oauth() else {
        return Err("set SMSGATE_CLIENT_ID and SMSGATE_CLIENT_SECRET instead of SMSGATE_API_KEY".into());
    };

    oauth.get_access_token().await?;
    if let Some(token) = oauth.token() {
        println!(
            "token type: {}, expires at: {}, refreshable: {}",
            token.token_type,
            token.expires_at,
            token.refresh_token.is_some()
        );
    }

    match oauth.refresh_token().await {
        Ok(token) => println!("refreshed, now expires at: {}", token.expires_at),
        Err(SmsGateError::Validation(err)) => println!("refresh skipped: {err}"),
        Err(err) => return Err(err.into()),
    }

    let balance = client.get_balance().await?;
    println!("balance: {:?}", balance.data);

    oauth.revoke_token().await?;
    println!("token revoked, valid: {}", oauth.is_token_valid());
    Ok(())
}
