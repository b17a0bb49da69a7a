use crate::auth;
use polis_db::roles_cache::RoleName;

const ADMIN_EMAIL: &str = "admin@polis.example";
const ADMIN_PASS_PHRASE: &str = "ChangeMe99";

/// Idempotent startup seed: both roles always exist afterwards, and exactly
/// one administrator account is created when no account holds the admin
/// role yet.
pub async fn seed(store: &polis_db::Store) -> anyhow::Result<()> {
    store.ensure_roles().await?;
    if store.any_account_in_role(&RoleName::Admin).await? {
        tracing::info!("an administrator account already exists");
        return Ok(());
    }
    let hashed_pass_phrase = auth::hash_pass_phrase(ADMIN_PASS_PHRASE)?;
    let account = store
        .create_admin_account(ADMIN_EMAIL, hashed_pass_phrase)
        .await?;
    tracing::info!(email = %account.email, "administrator account created");
    Ok(())
}
