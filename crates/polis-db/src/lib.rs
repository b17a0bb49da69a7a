use diesel_async::{
    pooled_connection::{
        mobc::{Builder, Pool},
        AsyncDieselConnectionManager,
    },
    AsyncPgConnection,
};
use std::time::Duration;

mod accounts;
mod agreements;
mod events;
mod insurances;
pub mod models;
mod persons;
pub mod roles_cache;
mod schema;
mod sql_functions;
#[cfg(test)]
mod tests;

pub use accounts::{NewClient, PersonUpdate};
pub use agreements::NewAgreement;
pub use events::{ClaimUpdate, NewClaim};
pub use insurances::InsuranceFields;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("getting connection from pool: {0}")]
    GetConnectionPool(#[from] mobc::Error<diesel_async::pooled_connection::PoolError>),
    #[error("result failure: {0}")]
    Result(#[from] diesel::result::Error),
    #[error("roles cache: {0}")]
    RolesCache(#[from] roles_cache::Error),
    #[error("an account with this e-mail already exists")]
    EmailTaken,
    #[error("this insurance has already been agreed for this person")]
    AlreadyAgreed,
    #[error("the row is still referenced by insurance events")]
    Blocked,
    #[error("Not Found")]
    NotFound,
}

#[derive(Clone, Debug)]
pub struct Store {
    pool: Pool<AsyncPgConnection>,
    roles: roles_cache::Cache,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub db_url: String,
    pub max_open: u64,
    pub max_idle: u64,
    #[serde(with = "humantime_serde", default)]
    pub max_lifetime: Option<Duration>,
    #[serde(with = "humantime_serde", default)]
    pub max_idle_lifetime: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub timeout_for_get: Duration,
}

pub async fn create(config: &Config) -> Result<Store, Error> {
    let pool = create_pool(config);
    let roles = roles_cache::Cache::new();
    let mut conn = pool.get().await?;
    roles.populate(&mut conn).await?;
    drop(conn);
    Ok(Store { pool, roles })
}

fn create_pool(config: &Config) -> mobc::Pool<AsyncDieselConnectionManager<AsyncPgConnection>> {
    let builder = Builder::new()
        .max_open(config.max_open)
        .max_idle(config.max_idle)
        .max_lifetime(
            config
                .max_lifetime
                .map(|v| v.max(Duration::from_secs(3600))),
        )
        .max_idle_lifetime(
            config
                .max_idle_lifetime
                .map(|v| v.max(Duration::from_secs(900))),
        )
        .get_timeout(Some(config.timeout_for_get.max(Duration::from_secs(5))));
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.db_url);
    builder.build(manager)
}

impl Store {
    async fn connection(
        &self,
    ) -> Result<mobc::Connection<AsyncDieselConnectionManager<AsyncPgConnection>>, Error> {
        self.pool.get().await.map_err(Into::into)
    }

    pub(crate) fn role_id(&self, name: &roles_cache::RoleName) -> Result<i32, Error> {
        self.roles.id_of(name).map_err(Into::into)
    }
}

/// Deletions against restrict-protected rows surface as foreign-key
/// violations; every delete path reports them as `Error::Blocked`.
pub(crate) fn blocked_on_fk(err: diesel::result::Error) -> Error {
    match err {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::ForeignKeyViolation,
            _,
        ) => Error::Blocked,
        other => Error::Result(other),
    }
}
