use diesel::prelude::*;
use rust_decimal::Decimal;

#[derive(Clone, Debug, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::polis::account)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Account {
    pub id: i32,
    pub email: String,
    pub pass_phrase: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::polis::account)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewAccount {
    pub email: String,
    pub pass_phrase: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Clone, Debug, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::polis::role)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::polis::role)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewRole {
    pub name: String,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::polis::account_role)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewAccountRole {
    pub account_id: i32,
    pub role_id: i32,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Clone, Debug, Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = crate::schema::polis::insured_person)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(Account))]
pub struct InsuredPerson {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub date_of_birth: jiff_diesel::Date,
    pub account_id: i32,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

impl InsuredPerson {
    /// Display name derived from the stored name parts, never persisted.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::polis::insured_person)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewInsuredPerson {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub date_of_birth: jiff_diesel::Date,
    pub account_id: i32,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Clone, Debug, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::polis::insurance)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Insurance {
    pub id: i32,
    pub insured_object: String,
    pub description: String,
    pub annual_payment: Decimal,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::polis::insurance)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewInsurance {
    pub insured_object: String,
    pub description: String,
    pub annual_payment: Decimal,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Clone, Debug, Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = crate::schema::polis::agreed_insurance)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(Insurance))]
#[diesel(belongs_to(InsuredPerson))]
pub struct AgreedInsurance {
    pub id: i32,
    pub insurance_id: i32,
    pub insured_person_id: i32,
    pub establishment_date: jiff_diesel::Date,
    pub valid_to: jiff_diesel::Date,
    pub active: bool,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::polis::agreed_insurance)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewAgreedInsurance {
    pub insurance_id: i32,
    pub insured_person_id: i32,
    pub establishment_date: jiff_diesel::Date,
    pub valid_to: jiff_diesel::Date,
    pub active: bool,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Clone, Debug, Identifiable, Queryable, Selectable, Associations)]
#[diesel(table_name = crate::schema::polis::insurance_event)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(AgreedInsurance))]
#[diesel(belongs_to(InsuredPerson))]
#[diesel(belongs_to(Insurance))]
pub struct InsuranceEvent {
    pub id: i32,
    pub description: String,
    pub amount_of_damage: Decimal,
    pub occurred_on: jiff_diesel::Date,
    pub agreed_insurance_id: i32,
    pub insured_person_id: i32,
    pub insurance_id: i32,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::polis::insurance_event)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewInsuranceEvent {
    pub description: String,
    pub amount_of_damage: Decimal,
    pub occurred_on: jiff_diesel::Date,
    pub agreed_insurance_id: i32,
    pub insured_person_id: i32,
    pub insurance_id: i32,
    pub created: jiff_diesel::Timestamp,
    pub updated: jiff_diesel::Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_first_and_last_with_a_space() {
        let now = jiff::Timestamp::now().into();
        let person = InsuredPerson {
            id: 1,
            first_name: "Jan".to_owned(),
            last_name: "Novak".to_owned(),
            address: "Main Street 1".to_owned(),
            date_of_birth: jiff::civil::date(1990, 4, 12).into(),
            account_id: 1,
            created: now,
            updated: now,
        };
        assert_eq!(person.full_name(), "Jan Novak");
    }
}
