use crate::{
    blocked_on_fk, models, roles_cache::RoleName, schema::polis as schema, sql_functions::lower,
    Error, Store,
};
use diesel::prelude::*;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};

/// Everything needed to open a client account together with its insured
/// person row. The pass phrase arrives already hashed.
#[derive(Debug)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub date_of_birth: jiff::civil::Date,
    pub email: String,
    pub pass_phrase: String,
}

/// An edit of an insured person and their account. `original_email`
/// identifies the account; `email` is the (possibly unchanged) new login
/// name.
#[derive(Debug)]
pub struct PersonUpdate {
    pub original_email: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub date_of_birth: jiff::civil::Date,
}

impl Store {
    #[tracing::instrument(skip(self))]
    pub async fn load_account_by_email(
        &self,
        account_email: &str,
    ) -> Result<Option<models::Account>, Error> {
        use schema::account::dsl::*;
        let mut conn = self.connection().await?;
        account
            .filter(lower(email).eq(lower(account_email)))
            .select(models::Account::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, account_id))]
    pub async fn load_account_by_id(
        &self,
        account_id: i32,
    ) -> Result<Option<models::Account>, Error> {
        use schema::account::dsl::*;
        let mut conn = self.connection().await?;
        account
            .filter(id.eq(account_id))
            .select(models::Account::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, account_id))]
    pub async fn roles_of_account(&self, account_id: i32) -> Result<Vec<String>, Error> {
        use schema::{account_role, role};
        let mut conn = self.connection().await?;
        account_role::table
            .inner_join(role::table)
            .filter(account_role::account_id.eq(account_id))
            .select(role::name)
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    /// Inserts any of the two application roles that are missing, then
    /// reloads the role cache. Safe to run on every startup.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_roles(&self) -> Result<(), Error> {
        use schema::role;
        let now = jiff::Timestamp::now().into();
        let mut conn = self.connection().await?;
        for role_name in [RoleName::Admin, RoleName::Client] {
            let existing: i64 = role::table
                .filter(role::name.eq(role_name.as_name()))
                .count()
                .get_result(&mut conn)
                .await?;
            if existing == 0 {
                tracing::info!(role = role_name.as_name(), "creating missing role");
                diesel::insert_into(role::table)
                    .values(models::NewRole {
                        name: role_name.as_name().to_owned(),
                        created: now,
                        updated: now,
                    })
                    .execute(&mut conn)
                    .await?;
            }
        }
        self.roles.populate(&mut conn).await.map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn any_account_in_role(&self, role_name: &RoleName) -> Result<bool, Error> {
        use schema::account_role;
        let role_id = self.role_id(role_name)?;
        let mut conn = self.connection().await?;
        let members: i64 = account_role::table
            .filter(account_role::role_id.eq(role_id))
            .count()
            .get_result(&mut conn)
            .await?;
        Ok(members > 0)
    }

    /// Creates the seed administrator account and grants it the admin role.
    /// There is no person row for administrators.
    #[tracing::instrument(skip(self, hashed_pass_phrase))]
    pub async fn create_admin_account(
        &self,
        admin_email: &str,
        hashed_pass_phrase: String,
    ) -> Result<models::Account, Error> {
        let now = jiff::Timestamp::now().into();
        let role_id = self.role_id(&RoleName::Admin)?;
        let new_account = models::NewAccount {
            email: admin_email.to_owned(),
            pass_phrase: hashed_pass_phrase,
            first_name: "admin".to_owned(),
            last_name: "admin".to_owned(),
            address: String::new(),
            created: now,
            updated: now,
        };
        self.connection()
            .await?
            .transaction(|mut conn| {
                use schema::{account, account_role};
                async move {
                    let created_account = diesel::insert_into(account::table)
                        .values(new_account)
                        .returning(models::Account::as_returning())
                        .get_result(&mut conn)
                        .await?;
                    diesel::insert_into(account_role::table)
                        .values(models::NewAccountRole {
                            account_id: created_account.id,
                            role_id,
                            created: now,
                            updated: now,
                        })
                        .execute(&mut conn)
                        .await?;
                    Ok::<_, Error>(created_account)
                }
                .scope_boxed()
            })
            .await
    }

    /// Creates the account, the insured person row linked to it, and the
    /// client role grant in one transaction. A taken e-mail rejects the
    /// whole creation with `Error::EmailTaken`.
    #[tracing::instrument(skip(self, client))]
    pub async fn create_client_account(
        &self,
        client: NewClient,
    ) -> Result<(models::Account, models::InsuredPerson), Error> {
        let now = jiff::Timestamp::now().into();
        let role_id = self.role_id(&RoleName::Client)?;
        self.connection()
            .await?
            .transaction(|mut conn| {
                use schema::{account, account_role, insured_person};
                async move {
                    let taken: i64 = account::table
                        .filter(lower(account::email).eq(lower(client.email.as_str())))
                        .count()
                        .get_result(&mut conn)
                        .await?;
                    if taken > 0 {
                        return Err(Error::EmailTaken);
                    }
                    let created_account = diesel::insert_into(account::table)
                        .values(models::NewAccount {
                            email: client.email,
                            pass_phrase: client.pass_phrase,
                            first_name: client.first_name.clone(),
                            last_name: client.last_name.clone(),
                            address: client.address.clone(),
                            created: now,
                            updated: now,
                        })
                        .returning(models::Account::as_returning())
                        .get_result(&mut conn)
                        .await
                        .map_err(|err| match err {
                            diesel::result::Error::DatabaseError(
                                diesel::result::DatabaseErrorKind::UniqueViolation,
                                _,
                            ) => Error::EmailTaken,
                            other => Error::Result(other),
                        })?;
                    let created_person = diesel::insert_into(insured_person::table)
                        .values(models::NewInsuredPerson {
                            first_name: client.first_name,
                            last_name: client.last_name,
                            address: client.address,
                            date_of_birth: client.date_of_birth.into(),
                            account_id: created_account.id,
                            created: now,
                            updated: now,
                        })
                        .returning(models::InsuredPerson::as_returning())
                        .get_result(&mut conn)
                        .await?;
                    diesel::insert_into(account_role::table)
                        .values(models::NewAccountRole {
                            account_id: created_account.id,
                            role_id,
                            created: now,
                            updated: now,
                        })
                        .execute(&mut conn)
                        .await?;
                    Ok::<_, Error>((created_account, created_person))
                }
                .scope_boxed()
            })
            .await
    }

    /// Applies an edit to the person row and its account together. Returns
    /// `None` when the original e-mail no longer resolves to a person.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_person_and_account(
        &self,
        update: PersonUpdate,
    ) -> Result<Option<models::InsuredPerson>, Error> {
        let now: jiff_diesel::Timestamp = jiff::Timestamp::now().into();
        self.connection()
            .await?
            .transaction(|mut conn| {
                use schema::{account, insured_person};
                async move {
                    let Some(existing) = account::table
                        .filter(lower(account::email).eq(lower(update.original_email.as_str())))
                        .select(models::Account::as_select())
                        .first(&mut conn)
                        .await
                        .optional()?
                    else {
                        return Ok(None);
                    };
                    if !update.email.eq_ignore_ascii_case(&update.original_email) {
                        let taken: i64 = account::table
                            .filter(
                                lower(account::email)
                                    .eq(lower(update.email.as_str()))
                                    .and(account::id.ne(existing.id)),
                            )
                            .count()
                            .get_result(&mut conn)
                            .await?;
                        if taken > 0 {
                            return Err(Error::EmailTaken);
                        }
                    }
                    diesel::update(account::table.filter(account::id.eq(existing.id)))
                        .set((
                            account::email.eq(&update.email),
                            account::first_name.eq(&update.first_name),
                            account::last_name.eq(&update.last_name),
                            account::address.eq(&update.address),
                            account::updated.eq(now),
                        ))
                        .execute(&mut conn)
                        .await?;
                    let updated_person = diesel::update(
                        insured_person::table
                            .filter(insured_person::account_id.eq(existing.id)),
                    )
                    .set((
                        insured_person::first_name.eq(&update.first_name),
                        insured_person::last_name.eq(&update.last_name),
                        insured_person::address.eq(&update.address),
                        insured_person::date_of_birth
                            .eq(jiff_diesel::Date::from(update.date_of_birth)),
                        insured_person::updated.eq(now),
                    ))
                    .returning(models::InsuredPerson::as_returning())
                    .get_result(&mut conn)
                    .await
                    .optional()?;
                    Ok(updated_person)
                }
                .scope_boxed()
            })
            .await
    }

    /// Removes the insured person first and the account second, in one
    /// transaction; insurance events referencing the person block the whole
    /// deletion. Returns the removed person for confirmation messages, or
    /// `None` when the e-mail or the person row does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete_person_and_account(
        &self,
        account_email: &str,
    ) -> Result<Option<models::InsuredPerson>, Error> {
        self.connection()
            .await?
            .transaction(|mut conn| {
                use schema::{account, insured_person};
                async move {
                    let Some(existing) = account::table
                        .filter(lower(account::email).eq(lower(account_email)))
                        .select(models::Account::as_select())
                        .first(&mut conn)
                        .await
                        .optional()?
                    else {
                        return Ok(None);
                    };
                    let Some(person) = insured_person::table
                        .filter(insured_person::account_id.eq(existing.id))
                        .select(models::InsuredPerson::as_select())
                        .first(&mut conn)
                        .await
                        .optional()?
                    else {
                        return Ok(None);
                    };
                    diesel::delete(
                        insured_person::table.filter(insured_person::id.eq(person.id)),
                    )
                    .execute(&mut conn)
                    .await
                    .map_err(blocked_on_fk)?;
                    diesel::delete(account::table.filter(account::id.eq(existing.id)))
                        .execute(&mut conn)
                        .await?;
                    Ok(Some(person))
                }
                .scope_boxed()
            })
            .await
    }
}
