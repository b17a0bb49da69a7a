use crate::{
    auth::BackEnd,
    csrf::CsrfToken,
    forms::{self, FieldErrors, SearchQuery, SelectOption},
    persons::detail_url,
    AppState,
};
use askama_axum::Template;
use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_login::AuthSession;
use axum_messages::{Message, Messages};
use http::StatusCode;
use polis_db::models;

#[derive(Debug, serde::Deserialize)]
pub struct PersonQuery {
    pub person: i32,
}

pub mod index {
    use super::*;

    #[derive(Template)]
    #[template(path = "contracts/index.html")]
    pub struct IndexTemplate {
        messages: Vec<Message>,
        search: String,
        contracts: Vec<(
            models::AgreedInsurance,
            models::Insurance,
            models::InsuredPerson,
        )>,
    }

    pub async fn get(
        messages: Messages,
        State(app_state): State<AppState>,
        Query(SearchQuery { search }): Query<SearchQuery>,
    ) -> impl IntoResponse {
        let contracts = match app_state.store.list_agreements(search.as_deref()).await {
            Ok(contracts) => contracts,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            IndexTemplate {
                messages: messages.into_iter().collect(),
                search: search.unwrap_or_default(),
                contracts,
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
    #[template(path = "contracts/detail.html")]
    pub struct DetailTemplate {
        messages: Vec<Message>,
        contract: models::AgreedInsurance,
        insurance: models::Insurance,
        person: models::InsuredPerson,
        email: String,
    }

    pub async fn get(
        messages: Messages,
        State(app_state): State<AppState>,
        Path(id): Path<i32>,
    ) -> impl IntoResponse {
        let (contract, insurance, person, account) =
            match app_state.store.load_agreement(id).await {
                Ok(Some(loaded)) => loaded,
                Ok(None) => return Redirect::to("/contracts").into_response(),
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            };
        Html(
            DetailTemplate {
                messages: messages.into_iter().collect(),
                contract,
                insurance,
                person,
                email: account.email,
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
        let (_, insurance, person, account) = match app_state.store.delete_agreement(id).await {
            Ok(Some(removed)) => removed,
            Ok(None) => return Redirect::to("/contracts").into_response(),
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        messages.success(format!(
            "Agreed insurance: {} for: {} removed",
            insurance.description,
            person.full_name()
        ));
        Redirect::to(&detail_url(&account.email)).into_response()
    }
}

pub mod create {
    use super::*;

    #[derive(Template)]
    #[template(path = "contracts/create.html")]
    pub struct CreateTemplate {
        messages: Vec<Message>,
        errors: FieldErrors,
        full_name: String,
        email: String,
        person_id: i32,
        insurance_id: String,
        establishment_date: String,
        valid_to: String,
        options: Vec<SelectOption>,
        csrf_token: String,
    }

    #[derive(Debug, serde::Deserialize)]
    pub struct CreateForm {
        pub insurance_id: i32,
        pub insured_person_id: i32,
        pub establishment_date: String,
        pub valid_to: String,
    }

    /// Admin or the client the contract is for; anyone else is turned away.
    fn guard(
        auth_session: &AuthSession<BackEnd>,
        account: &models::Account,
    ) -> Option<Response> {
        match auth_session.user {
            Some(ref user) if user.may_access(&account.email) => None,
            Some(_) => Some(Redirect::to("/access-denied").into_response()),
            None => Some(Redirect::to("/login").into_response()),
        }
    }

    pub async fn get(
        auth_session: AuthSession<BackEnd>,
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
        if let Some(response) = guard(&auth_session, &account) {
            return response;
        }
        let insurances = match app_state.store.list_insurances(None).await {
            Ok(insurances) => insurances,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        if insurances.is_empty() {
            messages.error(
                "Cannot agree an insurance because no insurance products exist yet (one must be created)",
            );
            return Redirect::to(&detail_url(&account.email)).into_response();
        }
        let today = forms::today().to_string();
        Html(
            CreateTemplate {
                messages: messages.into_iter().collect(),
                errors: FieldErrors::default(),
                full_name: person.full_name(),
                email: account.email,
                person_id: person.id,
                insurance_id: String::new(),
                establishment_date: today.clone(),
                valid_to: today,
                options: forms::product_options(&insurances),
                csrf_token: csrf.0,
            }
            .render()
            .unwrap(),
        )
        .into_response()
    }

    pub async fn post(
        auth_session: AuthSession<BackEnd>,
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
        if let Some(response) = guard(&auth_session, &account) {
            return response;
        }
        let mut errors = FieldErrors::default();
        let establishment_date = forms::parse_date(&form.establishment_date);
        if establishment_date.is_none() {
            errors.add("establishment_date", "Enter the establishment date");
        }
        let valid_to = forms::parse_date(&form.valid_to);
        if valid_to.is_none() {
            errors.add("valid_to", "Enter the expiry date");
        }
        let insurance = if errors.any() {
            None
        } else {
            match app_state.store.load_insurance(form.insurance_id).await {
                Ok(Some(insurance)) => Some(insurance),
                Ok(None) => {
                    errors.add("", "The selected insurance could not be found.");
                    None
                }
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        };
        if !errors.any() {
            let insurance = insurance.expect("loaded above");
            match app_state
                .store
                .create_agreement(polis_db::NewAgreement {
                    insurance_id: insurance.id,
                    insured_person_id: person.id,
                    establishment_date: establishment_date.expect("validated above"),
                    valid_to: valid_to.expect("validated above"),
                })
                .await
            {
                Ok(_) => {
                    messages.success(format!(
                        "Agreed insurance: {} for: {} added",
                        insurance.description,
                        person.full_name()
                    ));
                    return Redirect::to(&detail_url(&account.email)).into_response();
                }
                Err(polis_db::Error::AlreadyAgreed) => {
                    errors.add("", "The agreed insurance already exists!");
                }
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        }
        // Re-render with the product dropdown rebuilt from scratch.
        let insurances = match app_state.store.list_insurances(None).await {
            Ok(insurances) => insurances,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            CreateTemplate {
                messages: messages.into_iter().collect(),
                errors,
                full_name: person.full_name(),
                email: account.email,
                person_id: person.id,
                insurance_id: form.insurance_id.to_string(),
                establishment_date: form.establishment_date,
                valid_to: form.valid_to,
                options: forms::product_options(&insurances),
                csrf_token: csrf.0,
            }
            .render()
            .unwrap(),
        )
        .into_response()
    }
}
