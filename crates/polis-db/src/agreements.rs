use crate::{models, schema::polis as schema, Error, Store};
use diesel::prelude::*;
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};

/// The user-chosen fields of a new contract; `active` starts true and the
/// audit columns are filled by the store.
#[derive(Debug)]
pub struct NewAgreement {
    pub insurance_id: i32,
    pub insured_person_id: i32,
    pub establishment_date: jiff::civil::Date,
    pub valid_to: jiff::civil::Date,
}

impl Store {
    /// All contracts with their product and person, optionally filtered by a
    /// case-insensitive substring over the person's name, ordered by the
    /// valid-to date.
    #[tracing::instrument(skip(self))]
    pub async fn list_agreements(
        &self,
        search: Option<&str>,
    ) -> Result<
        Vec<(
            models::AgreedInsurance,
            models::Insurance,
            models::InsuredPerson,
        )>,
        Error,
    > {
        use schema::{agreed_insurance, insurance, insured_person};
        let mut conn = self.connection().await?;
        let mut query = agreed_insurance::table
            .inner_join(insurance::table)
            .inner_join(insured_person::table)
            .select((
                models::AgreedInsurance::as_select(),
                models::Insurance::as_select(),
                models::InsuredPerson::as_select(),
            ))
            .order(agreed_insurance::valid_to.asc())
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

    /// One contract with product, person and the person's account (the
    /// account e-mail is where delete confirmations redirect to).
    #[tracing::instrument(skip(self, agreement_id))]
    pub async fn load_agreement(
        &self,
        agreement_id: i32,
    ) -> Result<
        Option<(
            models::AgreedInsurance,
            models::Insurance,
            models::InsuredPerson,
            models::Account,
        )>,
        Error,
    > {
        use schema::{account, agreed_insurance, insurance, insured_person};
        let mut conn = self.connection().await?;
        agreed_insurance::table
            .inner_join(insurance::table)
            .inner_join(insured_person::table.inner_join(account::table))
            .filter(agreed_insurance::id.eq(agreement_id))
            .select((
                models::AgreedInsurance::as_select(),
                models::Insurance::as_select(),
                models::InsuredPerson::as_select(),
                models::Account::as_select(),
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    /// A contract together with its product, for resolving the dropdown
    /// selection when a claim is recorded.
    #[tracing::instrument(skip(self, agreement_id))]
    pub async fn load_agreement_with_product(
        &self,
        agreement_id: i32,
    ) -> Result<Option<(models::AgreedInsurance, models::Insurance)>, Error> {
        use schema::{agreed_insurance, insurance};
        let mut conn = self.connection().await?;
        agreed_insurance::table
            .inner_join(insurance::table)
            .filter(agreed_insurance::id.eq(agreement_id))
            .select((
                models::AgreedInsurance::as_select(),
                models::Insurance::as_select(),
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    /// The contracts of one person with their products, for the person
    /// detail page and the claim dropdown.
    #[tracing::instrument(skip(self, person_id))]
    pub async fn agreements_for_person(
        &self,
        person_id: i32,
    ) -> Result<Vec<(models::AgreedInsurance, models::Insurance)>, Error> {
        use schema::{agreed_insurance, insurance};
        let mut conn = self.connection().await?;
        agreed_insurance::table
            .inner_join(insurance::table)
            .filter(agreed_insurance::insured_person_id.eq(person_id))
            .select((
                models::AgreedInsurance::as_select(),
                models::Insurance::as_select(),
            ))
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, person_id))]
    pub async fn person_has_agreements(&self, person_id: i32) -> Result<bool, Error> {
        use schema::agreed_insurance;
        let mut conn = self.connection().await?;
        let total: i64 = agreed_insurance::table
            .filter(agreed_insurance::insured_person_id.eq(person_id))
            .count()
            .get_result(&mut conn)
            .await?;
        Ok(total > 0)
    }

    /// Inserts a new contract unless one already binds the same product to
    /// the same person; the duplicate check and the insert share one
    /// transaction, so two racing submissions cannot both land.
    #[tracing::instrument(skip(self, agreement))]
    pub async fn create_agreement(
        &self,
        agreement: NewAgreement,
    ) -> Result<models::AgreedInsurance, Error> {
        let now = jiff::Timestamp::now().into();
        self.connection()
            .await?
            .transaction(|mut conn| {
                use schema::agreed_insurance;
                async move {
                    let duplicates: i64 = agreed_insurance::table
                        .filter(
                            agreed_insurance::insurance_id
                                .eq(agreement.insurance_id)
                                .and(
                                    agreed_insurance::insured_person_id
                                        .eq(agreement.insured_person_id),
                                ),
                        )
                        .count()
                        .get_result(&mut conn)
                        .await?;
                    if duplicates > 0 {
                        return Err(Error::AlreadyAgreed);
                    }
                    diesel::insert_into(agreed_insurance::table)
                        .values(models::NewAgreedInsurance {
                            insurance_id: agreement.insurance_id,
                            insured_person_id: agreement.insured_person_id,
                            establishment_date: agreement.establishment_date.into(),
                            valid_to: agreement.valid_to.into(),
                            active: true,
                            created: now,
                            updated: now,
                        })
                        .returning(models::AgreedInsurance::as_returning())
                        .get_result(&mut conn)
                        .await
                        .map_err(Into::into)
                }
                .scope_boxed()
            })
            .await
    }

    /// Deletes a contract (its events cascade away) and returns what was
    /// removed for the confirmation message and redirect target.
    #[tracing::instrument(skip(self, agreement_id))]
    pub async fn delete_agreement(
        &self,
        agreement_id: i32,
    ) -> Result<
        Option<(
            models::AgreedInsurance,
            models::Insurance,
            models::InsuredPerson,
            models::Account,
        )>,
        Error,
    > {
        let Some(loaded) = self.load_agreement(agreement_id).await? else {
            return Ok(None);
        };
        use schema::agreed_insurance;
        let mut conn = self.connection().await?;
        diesel::delete(agreed_insurance::table.filter(agreed_insurance::id.eq(agreement_id)))
            .execute(&mut conn)
            .await?;
        Ok(Some(loaded))
    }
}
