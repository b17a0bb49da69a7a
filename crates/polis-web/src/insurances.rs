use crate::{
    csrf::CsrfToken,
    forms::{self, FieldErrors, SearchQuery},
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

const PAYMENT_MIN: i64 = 1_000;
const PAYMENT_MAX: i64 = 1_000_000;

#[derive(Debug, Default, serde::Deserialize)]
pub struct InsuranceForm {
    pub insured_object: String,
    pub description: String,
    pub annual_payment: String,
}

/// Object and description rules shared by create and edit; the payment is
/// checked separately because its message differs per handler.
fn validate_texts(errors: &mut FieldErrors, form: &InsuranceForm) {
    let object_len = form.insured_object.chars().count();
    if object_len == 0 || object_len > 100 {
        errors.add("insured_object", "Enter the insured thing or person");
    }
    let description_len = form.description.chars().count();
    if description_len == 0 || description_len > 200 {
        errors.add("description", "Enter a description of what the insurance covers");
    }
}

pub mod index {
    use super::*;

    #[derive(Template)]
    #[template(path = "insurances/index.html")]
    pub struct IndexTemplate {
        messages: Vec<Message>,
        search: String,
        insurances: Vec<models::Insurance>,
    }

    pub async fn get(
        messages: Messages,
        State(app_state): State<AppState>,
        Query(SearchQuery { search }): Query<SearchQuery>,
    ) -> impl IntoResponse {
        let insurances = match app_state.store.list_insurances(search.as_deref()).await {
            Ok(insurances) => insurances,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            IndexTemplate {
                messages: messages.into_iter().collect(),
                search: search.unwrap_or_default(),
                insurances,
            }
            .render()
            .unwrap(),
        )
        .into_response()
    }
}

pub mod create {
    use super::*;

    #[derive(Template)]
    #[template(path = "insurances/create.html")]
    pub struct CreateTemplate {
        messages: Vec<Message>,
        errors: FieldErrors,
        form: InsuranceForm,
        csrf_token: String,
    }

    pub async fn get(messages: Messages, csrf: CsrfToken) -> impl IntoResponse {
        Html(
            CreateTemplate {
                messages: messages.into_iter().collect(),
                errors: FieldErrors::default(),
                form: InsuranceForm::default(),
                csrf_token: csrf.0,
            }
            .render()
            .unwrap(),
        )
    }

    pub async fn post(
        messages: Messages,
        State(app_state): State<AppState>,
        csrf: CsrfToken,
        Form(form): Form<InsuranceForm>,
    ) -> impl IntoResponse {
        let mut errors = FieldErrors::default();
        validate_texts(&mut errors, &form);
        let annual_payment =
            match forms::parse_amount(&form.annual_payment, PAYMENT_MIN, PAYMENT_MAX) {
                Ok(amount) => Some(amount),
                Err(forms::AmountError::Invalid) => {
                    errors.add("annual_payment", "You did not enter a valid amount");
                    None
                }
                Err(forms::AmountError::OutOfRange) => {
                    errors.add(
                        "annual_payment",
                        "Enter an amount between 1 000 and 1 000 000",
                    );
                    None
                }
            };
        if !errors.any() {
            match app_state
                .store
                .create_insurance(polis_db::InsuranceFields {
                    insured_object: form.insured_object.clone(),
                    description: form.description.clone(),
                    annual_payment: annual_payment.expect("validated above"),
                })
                .await
            {
                Ok(insurance) => {
                    messages.success(format!(
                        "Insurance for: {} added",
                        insurance.insured_object
                    ));
                    return Redirect::to("/insurances").into_response();
                }
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        }
        Html(
            CreateTemplate {
                messages: messages.into_iter().collect(),
                errors,
                form,
                csrf_token: csrf.0,
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
    #[template(path = "insurances/detail.html")]
    pub struct DetailTemplate {
        messages: Vec<Message>,
        insurance: models::Insurance,
    }

    pub async fn get(
        messages: Messages,
        State(app_state): State<AppState>,
        Path(id): Path<i32>,
    ) -> impl IntoResponse {
        let insurance = match app_state.store.load_insurance(id).await {
            Ok(Some(insurance)) => insurance,
            Ok(None) => return Redirect::to("/insurances").into_response(),
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            DetailTemplate {
                messages: messages.into_iter().collect(),
                insurance,
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
    #[template(path = "insurances/edit.html")]
    pub struct EditTemplate {
        messages: Vec<Message>,
        errors: FieldErrors,
        id: i32,
        form: InsuranceForm,
        csrf_token: String,
    }

    pub async fn get(
        messages: Messages,
        State(app_state): State<AppState>,
        csrf: CsrfToken,
        Path(id): Path<i32>,
    ) -> impl IntoResponse {
        let insurance = match app_state.store.load_insurance(id).await {
            Ok(Some(insurance)) => insurance,
            Ok(None) => return Redirect::to("/insurances").into_response(),
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            EditTemplate {
                messages: messages.into_iter().collect(),
                errors: FieldErrors::default(),
                id,
                form: InsuranceForm {
                    insured_object: insurance.insured_object,
                    description: insurance.description,
                    annual_payment: insurance.annual_payment.to_string(),
                },
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
        Form(form): Form<InsuranceForm>,
    ) -> impl IntoResponse {
        match app_state.store.load_insurance(id).await {
            Ok(Some(_)) => {}
            Ok(None) => return Redirect::to("/insurances").into_response(),
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
        let mut errors = FieldErrors::default();
        validate_texts(&mut errors, &form);
        let annual_payment =
            match forms::parse_amount(&form.annual_payment, PAYMENT_MIN, PAYMENT_MAX) {
                Ok(amount) => Some(amount),
                Err(forms::AmountError::Invalid) => {
                    errors.add("annual_payment", "Please enter a valid amount");
                    None
                }
                Err(forms::AmountError::OutOfRange) => {
                    errors.add(
                        "annual_payment",
                        "Enter an amount between 1 000 and 1 000 000",
                    );
                    None
                }
            };
        if !errors.any() {
            match app_state
                .store
                .update_insurance(
                    id,
                    polis_db::InsuranceFields {
                        insured_object: form.insured_object.clone(),
                        description: form.description.clone(),
                        annual_payment: annual_payment.expect("validated above"),
                    },
                )
                .await
            {
                Ok(()) => {
                    messages.success(format!("Insurance for: {} updated", form.insured_object));
                    return Redirect::to("/insurances").into_response();
                }
                Err(polis_db::Error::NotFound) => {
                    return Redirect::to("/insurances").into_response()
                }
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        }
        Html(
            EditTemplate {
                messages: messages.into_iter().collect(),
                errors,
                id,
                form,
                csrf_token: csrf.0,
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
        match app_state.store.delete_insurance(id).await {
            Ok(Some(insurance)) => {
                messages.success(format!(
                    "Insurance for: {} removed",
                    insurance.insured_object
                ));
            }
            Ok(None) => {}
            Err(polis_db::Error::Blocked) => {
                messages.error(
                    "The insurance cannot be removed while insurance events reference it",
                );
            }
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
        Redirect::to("/insurances").into_response()
    }
}
