use crate::{models, schema::polis as schema, Error, Store};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use rust_decimal::Decimal;

/// A new claim. The insurance id is the one carried by the chosen contract,
/// resolved by the caller before the insert.
#[derive(Debug)]
pub struct NewClaim {
    pub description: String,
    pub amount_of_damage: Decimal,
    pub occurred_on: jiff::civil::Date,
    pub agreed_insurance_id: i32,
    pub insured_person_id: i32,
    pub insurance_id: i32,
}

/// The fields a claim edit may change; the contract linkage is immutable.
#[derive(Debug)]
pub struct ClaimUpdate {
    pub description: String,
    pub amount_of_damage: Decimal,
    pub occurred_on: jiff::civil::Date,
}

impl Store {
    /// All claims with product and person, optionally filtered by a
    /// case-insensitive substring over the insured object or the person's
    /// name, ordered by occurrence date.
    #[tracing::instrument(skip(self))]
    pub async fn list_events(
        &self,
        search: Option<&str>,
    ) -> Result<
        Vec<(
            models::InsuranceEvent,
            models::Insurance,
            models::InsuredPerson,
        )>,
        Error,
    > {
        use schema::{insurance, insurance_event, insured_person};
        let mut conn = self.connection().await?;
        let mut query = insurance_event::table
            .inner_join(insurance::table)
            .inner_join(insured_person::table)
            .select((
                models::InsuranceEvent::as_select(),
                models::Insurance::as_select(),
                models::InsuredPerson::as_select(),
            ))
            .order(insurance_event::occurred_on.asc())
            .into_boxed();
        if let Some(search) = search {
            let pattern = format!("%{search}%");
            query = query.filter(
                insurance::insured_object
                    .ilike(pattern.clone())
                    .or(insured_person::first_name.ilike(pattern.clone()))
                    .or(insured_person::last_name.ilike(pattern)),
            );
        }
        query.load(&mut conn).await.map_err(Into::into)
    }

    /// One claim with its product, person and contract.
    #[tracing::instrument(skip(self, event_id))]
    pub async fn load_event(
        &self,
        event_id: i32,
    ) -> Result<
        Option<(
            models::InsuranceEvent,
            models::Insurance,
            models::InsuredPerson,
            models::AgreedInsurance,
        )>,
        Error,
    > {
        use schema::{agreed_insurance, insurance, insurance_event, insured_person};
        let mut conn = self.connection().await?;
        insurance_event::table
            .inner_join(insurance::table)
            .inner_join(insured_person::table)
            .inner_join(agreed_insurance::table)
            .filter(insurance_event::id.eq(event_id))
            .select((
                models::InsuranceEvent::as_select(),
                models::Insurance::as_select(),
                models::InsuredPerson::as_select(),
                models::AgreedInsurance::as_select(),
            ))
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    /// The claims of one person, newest occurrence first, for the person
    /// detail page.
    #[tracing::instrument(skip(self, person_id))]
    pub async fn events_for_person(
        &self,
        person_id: i32,
    ) -> Result<Vec<models::InsuranceEvent>, Error> {
        use schema::insurance_event;
        let mut conn = self.connection().await?;
        insurance_event::table
            .filter(insurance_event::insured_person_id.eq(person_id))
            .order(insurance_event::occurred_on.desc())
            .select(models::InsuranceEvent::as_select())
            .load(&mut conn)
            .await
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self, claim))]
    pub async fn create_event(
        &self,
        claim: NewClaim,
    ) -> Result<models::InsuranceEvent, Error> {
        use schema::insurance_event;
        let now = jiff::Timestamp::now().into();
        let mut conn = self.connection().await?;
        diesel::insert_into(insurance_event::table)
            .values(models::NewInsuranceEvent {
                description: claim.description,
                amount_of_damage: claim.amount_of_damage,
                occurred_on: claim.occurred_on.into(),
                agreed_insurance_id: claim.agreed_insurance_id,
                insured_person_id: claim.insured_person_id,
                insurance_id: claim.insurance_id,
                created: now,
                updated: now,
            })
            .returning(models::InsuranceEvent::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(Into::into)
    }

    /// Applies an edit to an existing claim; `Error::NotFound` when the id
    /// no longer resolves to a row.
    #[tracing::instrument(skip(self, event_id, update))]
    pub async fn update_event(&self, event_id: i32, update: ClaimUpdate) -> Result<(), Error> {
        use schema::insurance_event;
        let now: jiff_diesel::Timestamp = jiff::Timestamp::now().into();
        let mut conn = self.connection().await?;
        match diesel::update(insurance_event::table.filter(insurance_event::id.eq(event_id)))
            .set((
                insurance_event::description.eq(update.description),
                insurance_event::amount_of_damage.eq(update.amount_of_damage),
                insurance_event::occurred_on.eq(jiff_diesel::Date::from(update.occurred_on)),
                insurance_event::updated.eq(now),
            ))
            .execute(&mut conn)
            .await
        {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes a claim and returns it with its product for the confirmation
    /// message.
    #[tracing::instrument(skip(self, event_id))]
    pub async fn delete_event(
        &self,
        event_id: i32,
    ) -> Result<Option<(models::InsuranceEvent, models::Insurance)>, Error> {
        use schema::{insurance, insurance_event};
        let mut conn = self.connection().await?;
        let Some(loaded) = insurance_event::table
            .inner_join(insurance::table)
            .filter(insurance_event::id.eq(event_id))
            .select((
                models::InsuranceEvent::as_select(),
                models::Insurance::as_select(),
            ))
            .first(&mut conn)
            .await
            .optional()?
        else {
            return Ok(None);
        };
        diesel::delete(insurance_event::table.filter(insurance_event::id.eq(event_id)))
            .execute(&mut conn)
            .await?;
        Ok(Some(loaded))
    }
}
