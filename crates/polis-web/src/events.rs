use crate::{
    csrf::CsrfToken,
    forms::{self, FieldErrors, SearchQuery, SelectOption},
    persons::detail_url,
    AppState,
};
use askama_axum::Template;
use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect},
    Form,
};
use axum_messages::{Message, Messages};
use http::StatusCode;
use polis_db::models;

const DAMAGE_MIN: i64 = 1_000;
const DAMAGE_MAX: i64 = 10_000_000;
const DAMAGE_MESSAGE: &str =
    "Invalid value, make sure the amount is between 1 000 and 10 000 000";

#[derive(Debug, serde::Deserialize)]
pub struct PersonQuery {
    pub person: i32,
}

/// Description, damage amount and occurrence date rules shared by create and
/// edit.
fn validate_claim_fields(
    errors: &mut FieldErrors,
    description: &str,
    amount_text: &str,
    occurred_text: &str,
) -> (Option<rust_decimal::Decimal>, Option<jiff::civil::Date>) {
    let description_len = description.chars().count();
    if description_len == 0 || description_len > 300 {
        errors.add("description", "Enter a description of the insurance event");
    }
    let amount = match forms::parse_amount(amount_text, DAMAGE_MIN, DAMAGE_MAX) {
        Ok(amount) => Some(amount),
        Err(_) => {
            errors.add("amount_of_damage", DAMAGE_MESSAGE);
            None
        }
    };
    let occurred_on = match forms::parse_date(occurred_text) {
        Some(date) if forms::in_future(date) => {
            errors.add("occurred_on", "The event date cannot be in the future.");
            None
        }
        Some(date) => Some(date),
        None => {
            errors.add("occurred_on", "Enter the date of the event");
            None
        }
    };
    (amount, occurred_on)
}

pub mod index {
    use super::*;

    #[derive(Template)]
    #[template(path = "claims/index.html")]
    pub struct IndexTemplate {
        messages: Vec<Message>,
        search: String,
        events: Vec<(
            models::InsuranceEvent,
            models::Insurance,
            models::InsuredPerson,
        )>,
    }

    pub async fn get(
        messages: Messages,
        State(app_state): State<AppState>,
        Query(SearchQuery { search }): Query<SearchQuery>,
    ) -> impl IntoResponse {
        let events = match app_state.store.list_events(search.as_deref()).await {
            Ok(events) => events,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            IndexTemplate {
                messages: messages.into_iter().collect(),
                search: search.unwrap_or_default(),
                events,
            }
            .render()
            .unwrap(),
        )
        .into_response()
    }
}

pub mod detail {
    use super::*;

    #[derive(Template)]
    #[template(path = "claims/detail.html")]
    pub struct DetailTemplate {
        messages: Vec<Message>,
        event: models::InsuranceEvent,
        insurance: models::Insurance,
        person: models::InsuredPerson,
        contract: models::AgreedInsurance,
    }

    pub async fn get(
        messages: Messages,
        State(app_state): State<AppState>,
        Path(id): Path<i32>,
    ) -> impl IntoResponse {
        let (event, insurance, person, contract) = match app_state.store.load_event(id).await {
            Ok(Some(loaded)) => loaded,
            Ok(None) => return Redirect::to("/claims").into_response(),
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            DetailTemplate {
                messages: messages.into_iter().collect(),
                event,
                insurance,
                person,
                contract,
            }
            .render()
            .unwrap(),
        )
        .into_response()
    }
}

pub mod delete {
    use super::*;

    pub async fn get(
        messages: Messages,
        State(app_state): State<AppState>,
        Path(id): Path<i32>,
    ) -> impl IntoResponse {
        match app_state.store.delete_event(id).await {
            Ok(Some((_, insurance))) => {
                messages.success(format!(
                    "The insurance event for object: {} was removed",
                    insurance.insured_object
                ));
            }
            Ok(None) => {}
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
        Redirect::to("/claims").into_response()
    }
}

pub mod create {
    use super::*;

    #[derive(Template)]
    #[template(path = "claims/create.html")]
    pub struct CreateTemplate {
        messages: Vec<Message>,
        errors: FieldErrors,
        full_name: String,
        email: String,
        person_id: i32,
        description: String,
        amount_of_damage: String,
        occurred_on: String,
        agreed_insurance_id: String,
        options: Vec<SelectOption>,
        csrf_token: String,
    }

    #[derive(Debug, serde::Deserialize)]
    pub struct CreateForm {
        pub description: String,
        pub amount_of_damage: String,
        pub occurred_on: String,
        pub agreed_insurance_id: i32,
        pub insured_person_id: i32,
    }

    pub async fn get(
        messages: Messages,
        State(app_state): State<AppState>,
        csrf: CsrfToken,
        Query(PersonQuery { person }): Query<PersonQuery>,
    ) -> impl IntoResponse {
        let (person, account) = match app_state.store.load_person_by_id(person).await {
            Ok(Some(loaded)) => loaded,
            Ok(None) => {
                return (StatusCode::NOT_FOUND, "the insured person was not found")
                    .into_response()
            }
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        let any_products = match app_state.store.any_insurances().await {
            Ok(any_products) => any_products,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        let has_contracts = match app_state.store.person_has_agreements(person.id).await {
            Ok(has_contracts) => has_contracts,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        if !any_products || !has_contracts {
            messages.error(
                "Cannot create an event because no insurance product or agreed insurance contract exists.",
            );
            return Redirect::to(&detail_url(&account.email)).into_response();
        }
        let contracts = match app_state.store.agreements_for_person(person.id).await {
            Ok(contracts) => contracts,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            CreateTemplate {
                messages: messages.into_iter().collect(),
                errors: FieldErrors::default(),
                full_name: person.full_name(),
                email: account.email,
                person_id: person.id,
                description: String::new(),
                amount_of_damage: String::new(),
                occurred_on: forms::today().to_string(),
                agreed_insurance_id: "0".to_owned(),
                options: forms::contract_options(&contracts),
                csrf_token: csrf.0,
            }
            .render()
            .unwrap(),
        )
        .into_response()
    }

    pub async fn post(
        messages: Messages,
        State(app_state): State<AppState>,
        csrf: CsrfToken,
        Form(form): Form<CreateForm>,
    ) -> impl IntoResponse {
        let (person, account) = match app_state
            .store
            .load_person_by_id(form.insured_person_id)
            .await
        {
            Ok(Some(loaded)) => loaded,
            Ok(None) => {
                return (StatusCode::NOT_FOUND, "the insured person was not found")
                    .into_response()
            }
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        let mut errors = FieldErrors::default();
        let (amount, occurred_on) = validate_claim_fields(
            &mut errors,
            &form.description,
            &form.amount_of_damage,
            &form.occurred_on,
        );
        if form.agreed_insurance_id == 0 {
            errors.add("agreed_insurance_id", "You must select an agreed insurance.");
        }
        let resolved = if errors.any() {
            None
        } else {
            match app_state
                .store
                .load_agreement_with_product(form.agreed_insurance_id)
                .await
            {
                Ok(Some(resolved)) => Some(resolved),
                Ok(None) => {
                    errors.add("", "The selected insurance could not be found.");
                    None
                }
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        };
        if !errors.any() {
            let (contract, insurance) = resolved.expect("resolved above");
            match app_state
                .store
                .create_event(polis_db::NewClaim {
                    description: form.description.clone(),
                    amount_of_damage: amount.expect("validated above"),
                    occurred_on: occurred_on.expect("validated above"),
                    agreed_insurance_id: contract.id,
                    insured_person_id: person.id,
                    insurance_id: insurance.id,
                })
                .await
            {
                Ok(_) => {
                    messages.success(format!(
                        "The insurance event for object: {} was added",
                        insurance.insured_object
                    ));
                    return Redirect::to(&detail_url(&account.email)).into_response();
                }
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        }
        // Any failure re-renders the form with the dropdown rebuilt from
        // scratch and the placeholder re-inserted.
        let contracts = match app_state.store.agreements_for_person(person.id).await {
            Ok(contracts) => contracts,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            CreateTemplate {
                messages: messages.into_iter().collect(),
                errors,
                full_name: person.full_name(),
                email: account.email,
                person_id: person.id,
                description: form.description,
                amount_of_damage: form.amount_of_damage,
                occurred_on: form.occurred_on,
                agreed_insurance_id: form.agreed_insurance_id.to_string(),
                options: forms::contract_options(&contracts),
                csrf_token: csrf.0,
            }
            .render()
            .unwrap(),
        )
        .into_response()
    }
}

pub mod edit {
    use super::*;

    #[derive(Template)]
    #[template(path = "claims/edit.html")]
    pub struct EditTemplate {
        messages: Vec<Message>,
        errors: FieldErrors,
        id: i32,
        full_name: String,
        contract_label: String,
        description: String,
        amount_of_damage: String,
        occurred_on: String,
        csrf_token: String,
    }

    #[derive(Debug, serde::Deserialize)]
    pub struct EditForm {
        pub description: String,
        pub amount_of_damage: String,
        pub occurred_on: String,
    }

    pub async fn get(
        messages: Messages,
        State(app_state): State<AppState>,
        csrf: CsrfToken,
        Path(id): Path<i32>,
    ) -> impl IntoResponse {
        let (event, insurance, person, _) = match app_state.store.load_event(id).await {
            Ok(Some(loaded)) => loaded,
            Ok(None) => {
                messages.error("The insurance event was not found");
                return Redirect::to("/claims").into_response();
            }
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            EditTemplate {
                messages: messages.into_iter().collect(),
                errors: FieldErrors::default(),
                id,
                full_name: person.full_name(),
                contract_label: forms::insurance_label(
                    &insurance.insured_object,
                    &insurance.description,
                ),
                description: event.description,
                amount_of_damage: event.amount_of_damage.to_string(),
                occurred_on: event.occurred_on.to_jiff().to_string(),
                csrf_token: csrf.0,
            }
            .render()
            .unwrap(),
        )
        .into_response()
    }

    pub async fn post(
        messages: Messages,
        State(app_state): State<AppState>,
        csrf: CsrfToken,
        Path(id): Path<i32>,
        Form(form): Form<EditForm>,
    ) -> impl IntoResponse {
        let mut errors = FieldErrors::default();
        let (amount, occurred_on) = validate_claim_fields(
            &mut errors,
            &form.description,
            &form.amount_of_damage,
            &form.occurred_on,
        );
        if errors.any() {
            let (_, insurance, person, _) = match app_state.store.load_event(id).await {
                Ok(Some(loaded)) => loaded,
                Ok(None) => {
                    messages.error("The insurance event was not found");
                    return Redirect::to("/claims").into_response();
                }
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            };
            return Html(
                EditTemplate {
                    messages: messages.into_iter().collect(),
                    errors,
                    id,
                    full_name: person.full_name(),
                    contract_label: forms::insurance_label(
                        &insurance.insured_object,
                        &insurance.description,
                    ),
                    description: form.description,
                    amount_of_damage: form.amount_of_damage,
                    occurred_on: form.occurred_on,
                    csrf_token: csrf.0,
                }
                .render()
                .unwrap(),
            )
            .into_response();
        }
        match app_state
            .store
            .update_event(
                id,
                polis_db::ClaimUpdate {
                    description: form.description,
                    amount_of_damage: amount.expect("validated above"),
                    occurred_on: occurred_on.expect("validated above"),
                },
            )
            .await
        {
            Ok(()) => {
                messages.success("The insurance event was updated");
            }
            Err(polis_db::Error::NotFound) => {
                messages.error("The insurance event was not found");
            }
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
        Redirect::to("/claims").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_validation_accepts_damage_boundaries_and_today() {
        let mut errors = FieldErrors::default();
        let (amount, occurred_on) = validate_claim_fields(
            &mut errors,
            "Hail damage",
            "10000000",
            &forms::today().to_string(),
        );
        assert!(!errors.any());
        assert_eq!(amount, Some(rust_decimal::Decimal::from(10_000_000)));
        assert_eq!(occurred_on, Some(forms::today()));
    }

    #[test]
    fn claim_validation_rejects_future_dates_regardless_of_other_fields() {
        let mut errors = FieldErrors::default();
        let tomorrow = forms::today().tomorrow().unwrap().to_string();
        let (_, occurred_on) =
            validate_claim_fields(&mut errors, "Hail damage", "5000", &tomorrow);
        assert_eq!(occurred_on, None);
        assert_eq!(
            errors.get("occurred_on"),
            "The event date cannot be in the future."
        );
    }

    #[test]
    fn claim_validation_rejects_out_of_range_damage() {
        let mut errors = FieldErrors::default();
        let today = forms::today().to_string();
        validate_claim_fields(&mut errors, "Hail damage", "999", &today);
        assert_eq!(errors.get("amount_of_damage"), DAMAGE_MESSAGE);
        let mut errors = FieldErrors::default();
        validate_claim_fields(&mut errors, "Hail damage", "10000001", &today);
        assert_eq!(errors.get("amount_of_damage"), DAMAGE_MESSAGE);
    }
}
