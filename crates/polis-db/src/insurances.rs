use crate::{blocked_on_fk, models, schema::polis as schema, Error, Store};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use rust_decimal::Decimal;

/// The writable fields of an insurance product; shared by create and edit.
#[derive(Debug)]
pub struct InsuranceFields {
    pub insured_object: String,
    pub description: String,
    pub annual_payment: Decimal,
}

impl Store {
    /// All products, optionally filtered by a case-insensitive substring
    /// over the insured object, ordered by the insured object.
    #[tracing::instrument(skip(self))]
    pub async fn list_insurances(
        &self,
        search: Option<&str>,
    ) -> Result<Vec<models::Insurance>, Error> {
        use schema::insurance;
        let mut conn = self.connection().await?;
        let mut query = insurance::table
            .select(models::Insurance::as_select())
            .order(insurance::insured_object.asc())
            .into_boxed();
        if let Some(search) = search {
            query = query.filter(insurance::insured_object.ilike(format!("%{search}%")));
        }
        query.load(&mut conn).await.map_err(Into::into)
    }

    #[tracing::instrument(skip(self, insurance_id))]
    pub async fn load_insurance(
        &self,
        insurance_id: i32,
    ) -> Result<Option<models::Insurance>, Error> {
        use schema::insurance;
        let mut conn = self.connection().await?;
        insurance::table
            .filter(insurance::id.eq(insurance_id))
            .select(models::Insurance::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    #[tracing::instrument(skip(self))]
    pub async fn any_insurances(&self) -> Result<bool, Error> {
        use schema::insurance;
        let mut conn = self.connection().await?;
        let total: i64 = insurance::table.count().get_result(&mut conn).await?;
        Ok(total > 0)
    }

    #[tracing::instrument(skip(self, fields))]
    pub async fn create_insurance(
        &self,
        fields: InsuranceFields,
    ) -> Result<models::Insurance, Error> {
        use schema::insurance;
        let now = jiff::Timestamp::now().into();
        let mut conn = self.connection().await?;
        diesel::insert_into(insurance::table)
            .values(models::NewInsurance {
                insured_object: fields.insured_object,
                description: fields.description,
                annual_payment: fields.annual_payment,
                created: now,
                updated: now,
            })
            .returning(models::Insurance::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(Into::into)
    }

    /// Applies an edit to an existing product; `Error::NotFound` when the id
    /// no longer resolves to a row.
    #[tracing::instrument(skip(self, insurance_id, fields))]
    pub async fn update_insurance(
        &self,
        insurance_id: i32,
        fields: InsuranceFields,
    ) -> Result<(), Error> {
        use schema::insurance;
        let now: jiff_diesel::Timestamp = jiff::Timestamp::now().into();
        let mut conn = self.connection().await?;
        match diesel::update(insurance::table.filter(insurance::id.eq(insurance_id)))
            .set((
                insurance::insured_object.eq(fields.insured_object),
                insurance::description.eq(fields.description),
                insurance::annual_payment.eq(fields.annual_payment),
                insurance::updated.eq(now),
            ))
            .execute(&mut conn)
            .await
        {
            Ok(0) => Err(Error::NotFound),
            Ok(_) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes a product; agreed contracts cascade away with it, while any
    /// insurance event referencing the product blocks the deletion. Returns
    /// the removed product for confirmation messages.
    #[tracing::instrument(skip(self, insurance_id))]
    pub async fn delete_insurance(
        &self,
        insurance_id: i32,
    ) -> Result<Option<models::Insurance>, Error> {
        use schema::insurance;
        let mut conn = self.connection().await?;
        let Some(existing) = insurance::table
            .filter(insurance::id.eq(insurance_id))
            .select(models::Insurance::as_select())
            .first(&mut conn)
            .await
            .optional()?
        else {
            return Ok(None);
        };
        diesel::delete(insurance::table.filter(insurance::id.eq(insurance_id)))
            .execute(&mut conn)
            .await
            .map_err(blocked_on_fk)?;
        Ok(Some(existing))
    }
}
