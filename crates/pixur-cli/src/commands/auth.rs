use crate::context::AppContext;
use anyhow::{Context, Result};
use pixur_core::auth::{AuthState, Identity};

/// Environment variable read when `login` is given no secret.
pub const ENV_SECRET: &str = "PIXUR_SECRET";

pub async fn login(app: &AppContext, ident: &str, secret: Option<String>) -> Result<()> {
    let secret = secret
        .or_else(|| std::env::var(ENV_SECRET).ok())
        .with_context(|| format!("No secret given; pass it as an argument or set {}", ENV_SECRET))?;

    let identity = app.auth.login(ident, &secret).await?;
    println!("✅ Logged in as {}", display_name(&identity));
    Ok(())
}

pub async fn signup(app: &AppContext, ident: &str, secret: &str) -> Result<()> {
    let identity = app.auth.create_account(ident, secret).await?;
    println!("✅ Created account {}", display_name(&identity));
    Ok(())
}

pub async fn logout(app: &AppContext) -> Result<()> {
    app.auth.logout().await?;
    println!("✅ Logged out");
    Ok(())
}

pub async fn whoami(app: &AppContext) -> Result<()> {
    let state = app.auth.state().await?;
    match app.auth.identity().await? {
        Some(identity) if state != AuthState::Unauthenticated => {
            println!("{} ({:?})", display_name(&identity), state);
        }
        _ => println!("Not logged in"),
    }
    Ok(())
}

fn display_name(identity: &Identity) -> &str {
    identity.ident.as_deref().unwrap_or(&identity.subject)
}
