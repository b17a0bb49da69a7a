use arc_swap::ArcSwap;
use diesel_async::{pooled_connection::AsyncDieselConnectionManager, AsyncPgConnection};
use std::{collections::HashMap, sync::Arc};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("result failure: {0}")]
    ResultError(#[from] diesel::result::Error),
    #[error("role entry does not exist")]
    DoesNotExist,
}

/// The security roles the application knows about. Role rows live in the
/// database; `Other` covers rows added out of band.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RoleName {
    Admin,
    Client,
    Other(String),
}

impl RoleName {
    pub fn from_name(name: &str) -> Self {
        match name {
            "admin" => Self::Admin,
            "client" => Self::Client,
            s => Self::Other(s.to_owned()),
        }
    }

    pub fn as_name(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Client => "client",
            Self::Other(s) => s,
        }
    }
}

/// Maps role names to their row ids so grants never re-query the role table.
/// Swapped wholesale whenever the seed step (re)runs.
#[derive(Clone, Debug)]
pub struct Cache(Arc<ArcSwap<HashMap<RoleName, i32>>>);

impl Cache {
    pub fn new() -> Self {
        Self(Arc::new(ArcSwap::new(Arc::new(HashMap::new()))))
    }

    pub(crate) async fn populate(
        &self,
        conn: &mut mobc::Connection<AsyncDieselConnectionManager<AsyncPgConnection>>,
    ) -> Result<(), Error> {
        use crate::schema::polis::role::dsl::*;
        use diesel::{QueryDsl, SelectableHelper};
        use diesel_async::RunQueryDsl;
        let entries = role
            .select(crate::models::Role::as_select())
            .get_results(conn)
            .await?
            .into_iter()
            .map(|row| (RoleName::from_name(&row.name), row.id))
            .collect::<HashMap<_, _>>();
        self.0.swap(Arc::new(entries));
        Ok(())
    }

    pub fn id_of(&self, name: &RoleName) -> Result<i32, Error> {
        self.0.load().get(name).copied().ok_or(Error::DoesNotExist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_round_trip() {
        assert_eq!(RoleName::from_name("admin"), RoleName::Admin);
        assert_eq!(RoleName::from_name("client"), RoleName::Client);
        assert_eq!(
            RoleName::from_name("auditor"),
            RoleName::Other("auditor".to_owned())
        );
        assert_eq!(RoleName::Admin.as_name(), "admin");
        assert_eq!(RoleName::Other("auditor".to_owned()).as_name(), "auditor");
    }

    #[test]
    fn empty_cache_reports_missing_roles() {
        let cache = Cache::new();
        assert!(matches!(
            cache.id_of(&RoleName::Admin),
            Err(Error::DoesNotExist)
        ));
    }
}
