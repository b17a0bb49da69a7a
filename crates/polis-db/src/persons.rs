use crate::{models, schema::polis as schema, sql_functions::lower, Error, Store};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

impl Store {
    /// All insured persons with their accounts, optionally filtered by a
    /// case-insensitive substring over first or last name, ordered by first
    /// name.
    #[tracing::instrument(skip(self))]
    pub async fn list_persons(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<(models::InsuredPerson, models::Account)>, Error> {
        use schema::{account, insured_person};
        let mut conn = self.connection().await?;
        let mut query = insured_person::table
            .inner_join(account::table)
            .select((
                models::InsuredPerson::as_select(),
                models::Account::as_select(),
            ))
            .order(insured_person::first_name.asc())
            .into_boxed();
        if let Some(search) = search {
            let pattern = format!("%{search}%");
            query = query.filter(
                insured_person::first_name
                    .ilike(pattern.clone())
                    .or(insured_person::last_name.ilike(pattern)),
            );
        }
        query.load(&mut conn).await.map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn load_person_by_email(
        &self,
        account_email: &str,
    ) -> Result<Option<(models::InsuredPerson, models::Account)>, Error> {
        use schema::{account, insured_person};
        let mut conn = self.connection().await?;
        insured_person::table
            .inner_join(account::table)
            .filter(lower(account::email).eq(lower(account_email)))
            .select((
                models::InsuredPerson::as_select(),
                models::Account::as_select(),
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, person_id))]
    pub async fn load_person_by_id(
        &self,
        person_id: i32,
    ) -> Result<Option<(models::InsuredPerson, models::Account)>, Error> {
        use schema::{account, insured_person};
        let mut conn = self.connection().await?;
        insured_person::table
            .inner_join(account::table)
            .filter(insured_person::id.eq(person_id))
            .select((
                models::InsuredPerson::as_select(),
                models::Account::as_select(),
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, owner_account_id))]
    pub async fn load_person_by_account_id(
        &self,
        owner_account_id: i32,
    ) -> Result<Option<models::InsuredPerson>, Error> {
        use schema::insured_person;
        let mut conn = self.connection().await?;
        insured_person::table
            .filter(insured_person::account_id.eq(owner_account_id))
            .select(models::InsuredPerson::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }
}
