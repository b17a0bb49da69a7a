use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum_login::{AuthUser, AuthnBackend, UserId};
use polis_db::roles_cache::RoleName;
use rs_sha512::HasherContext;
use std::hash::Hasher;

#[derive(Clone, Debug)]
pub struct BackEnd {
    db: polis_db::Store,
}

pub(crate) fn create_backend(database: polis_db::Store) -> BackEnd {
    BackEnd { db: database }
}

/// The session-held caller identity: the account id plus the roles the
/// per-route guards and own-record checks decide on.
#[derive(Clone, Debug)]
pub struct User {
    id: i32,
    email: String,
    roles: Vec<RoleName>,
    session_auth_hash: [u8; 64],
}

impl User {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&RoleName::Admin)
    }

    /// Whether the caller may see or edit the record keyed by this e-mail:
    /// administrators always, clients only their own.
    pub fn may_access(&self, record_email: &str) -> bool {
        self.is_admin() || self.email.eq_ignore_ascii_case(record_email)
    }
}

impl AuthUser for User {
    type Id = i32;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        &self.session_auth_hash
    }
}

/// Sessions are invalidated when the stored credential changes, so the
/// session hash is derived from the pass phrase hash.
fn build_user(account: polis_db::models::Account, role_names: Vec<String>) -> User {
    let mut hasher = rs_sha512::Sha512Hasher::default();
    hasher.write(account.pass_phrase.as_bytes());
    let _ = hasher.finish();
    let final_result = HasherContext::finish(&mut hasher);
    User {
        id: account.id,
        email: account.email,
        roles: role_names
            .iter()
            .map(|name| RoleName::from_name(name))
            .collect(),
        session_auth_hash: final_result.into(),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("User database error: {0}")]
    UserDb(#[from] polis_db::Error),
    #[error("Stored pass phrase could not be parsed: {0}")]
    StoredPassPhraseUnableToParse(argon2::password_hash::Error),
    #[error("Pass phrase hash failed: {0}")]
    PassPhraseHash(argon2::password_hash::Error),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[async_trait::async_trait]
impl AuthnBackend for BackEnd {
    type User = User;
    type Credentials = Credentials;
    type Error = Error;

    async fn authenticate(
        &self,
        credentials: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let Some(account) = self.db.load_account_by_email(&credentials.email).await? else {
            return Ok(None);
        };
        let parsed_pass_phrase = PasswordHash::new(&account.pass_phrase)
            .map_err(Error::StoredPassPhraseUnableToParse)?;
        if Argon2::default()
            .verify_password(credentials.password.as_bytes(), &parsed_pass_phrase)
            .is_err()
        {
            return Ok(None);
        }
        let role_names = self.db.roles_of_account(account.id).await?;
        Ok(Some(build_user(account, role_names)))
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        let Some(account) = self.db.load_account_by_id(*user_id).await? else {
            return Ok(None);
        };
        let role_names = self.db.roles_of_account(account.id).await?;
        Ok(Some(build_user(account, role_names)))
    }
}

pub fn hash_pass_phrase(pass_phrase: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(pass_phrase.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(Error::PassPhraseHash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_pass_phrases_verify_and_salts_differ() {
        let first = hash_pass_phrase("secret1").expect("should hash");
        let second = hash_pass_phrase("secret1").expect("should hash");
        assert_ne!(first, second, "each hash should carry a fresh salt");
        let parsed = PasswordHash::new(&first).expect("should parse");
        assert!(Argon2::default()
            .verify_password(b"secret1", &parsed)
            .is_ok());
        assert!(Argon2::default()
            .verify_password(b"wrong", &parsed)
            .is_err());
    }
}
