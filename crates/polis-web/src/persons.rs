use crate::{
    auth::BackEnd,
    csrf::CsrfToken,
    forms::{self, FieldErrors, SearchQuery},
    AppState,
};
use askama_axum::Template;
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect},
    Form,
};
use axum_login::AuthSession;
use axum_messages::{Message, Messages};
use http::StatusCode;
use polis_db::models;

pub(crate) fn detail_url(email: &str) -> String {
    format!("/persons/detail?email={}", forms::urlencode(email))
}

#[derive(Debug, serde::Deserialize)]
pub struct EmailQuery {
    #[serde(default)]
    pub email: String,
}

/// Field rules shared by create and edit; returns the parsed date of birth
/// when it is usable.
fn validate_profile(
    errors: &mut FieldErrors,
    first_name: &str,
    last_name: &str,
    address: &str,
    date_of_birth: &str,
    email: &str,
) -> Option<jiff::civil::Date> {
    let first_len = first_name.chars().count();
    if !(2..=15).contains(&first_len) {
        errors.add("first_name", "The first name must be 2 to 15 characters");
    }
    let last_len = last_name.chars().count();
    if !(2..=20).contains(&last_len) {
        errors.add("last_name", "The last name must be 2 to 20 characters");
    }
    let address_len = address.chars().count();
    if address_len == 0 || address_len > 100 {
        errors.add("address", "Enter an address of at most 100 characters");
    }
    if !email_address::EmailAddress::is_valid(email) {
        errors.add("email", "Enter an e-mail address in a valid format");
    }
    let parsed = forms::parse_date(date_of_birth);
    if parsed.is_none() {
        errors.add("date_of_birth", "Enter the date of birth");
    }
    parsed
}

pub mod index {
    use super::*;

    #[derive(Template)]
    #[template(path = "persons/index.html")]
    pub struct IndexTemplate {
        messages: Vec<Message>,
        search: String,
        persons: Vec<(models::InsuredPerson, models::Account)>,
    }

    pub async fn get(
        messages: Messages,
        State(app_state): State<AppState>,
        Query(SearchQuery { search }): Query<SearchQuery>,
    ) -> impl IntoResponse {
        let persons = match app_state.store.list_persons(search.as_deref()).await {
            Ok(persons) => persons,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            IndexTemplate {
                messages: messages.into_iter().collect(),
                search: search.unwrap_or_default(),
                persons,
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
    #[template(path = "persons/create.html")]
    pub struct CreateTemplate {
        messages: Vec<Message>,
        errors: FieldErrors,
        form: CreateForm,
        csrf_token: String,
    }

    #[derive(Debug, Default, serde::Deserialize)]
    pub struct CreateForm {
        pub first_name: String,
        pub last_name: String,
        pub address: String,
        pub date_of_birth: String,
        pub email: String,
        pub password: String,
    }

    pub async fn get(messages: Messages, csrf: CsrfToken) -> impl IntoResponse {
        Html(
            CreateTemplate {
                messages: messages.into_iter().collect(),
                errors: FieldErrors::default(),
                form: CreateForm::default(),
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
        Form(mut form): Form<CreateForm>,
    ) -> impl IntoResponse {
        let mut errors = FieldErrors::default();
        let date_of_birth = validate_profile(
            &mut errors,
            &form.first_name,
            &form.last_name,
            &form.address,
            &form.date_of_birth,
            &form.email,
        );
        if form.password.chars().count() < 6 {
            errors.add("password", "The password must have at least 6 characters");
        }
        if !errors.any() {
            let hashed_pass_phrase = match crate::auth::hash_pass_phrase(&form.password) {
                Ok(hashed_pass_phrase) => hashed_pass_phrase,
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            };
            match app_state
                .store
                .create_client_account(polis_db::NewClient {
                    first_name: form.first_name.clone(),
                    last_name: form.last_name.clone(),
                    address: form.address.clone(),
                    date_of_birth: date_of_birth.expect("validated above"),
                    email: form.email.clone(),
                    pass_phrase: hashed_pass_phrase,
                })
                .await
            {
                Ok((_, person)) => {
                    messages.success(format!(
                        "Insured person: {} was created",
                        person.full_name()
                    ));
                    return Redirect::to("/persons").into_response();
                }
                Err(polis_db::Error::EmailTaken) => {
                    errors.add("email", "Another user already has this e-mail");
                    form.email.clear();
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

pub mod edit {
    use super::*;

    #[derive(Template)]
    #[template(path = "persons/edit.html")]
    pub struct EditTemplate {
        messages: Vec<Message>,
        errors: FieldErrors,
        form: EditForm,
        csrf_token: String,
    }

    #[derive(Debug, serde::Deserialize)]
    pub struct EditForm {
        pub original_email: String,
        pub first_name: String,
        pub last_name: String,
        pub address: String,
        pub date_of_birth: String,
        pub email: String,
    }

    pub async fn get(
        auth_session: AuthSession<BackEnd>,
        messages: Messages,
        State(app_state): State<AppState>,
        csrf: CsrfToken,
        Query(EmailQuery { email }): Query<EmailQuery>,
    ) -> impl IntoResponse {
        let Some(ref user) = auth_session.user else {
            return Redirect::to("/login").into_response();
        };
        if !user.may_access(&email) {
            return Redirect::to("/access-denied").into_response();
        }
        let (person, account) = match app_state.store.load_person_by_email(&email).await {
            Ok(Some(loaded)) => loaded,
            Ok(None) => return Redirect::to("/persons").into_response(),
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            EditTemplate {
                messages: messages.into_iter().collect(),
                errors: FieldErrors::default(),
                form: EditForm {
                    original_email: account.email.clone(),
                    first_name: person.first_name,
                    last_name: person.last_name,
                    address: person.address,
                    date_of_birth: person.date_of_birth.to_jiff().to_string(),
                    email: account.email,
                },
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
        Form(form): Form<EditForm>,
    ) -> impl IntoResponse {
        let Some(user) = auth_session.user.clone() else {
            return Redirect::to("/login").into_response();
        };
        if !user.may_access(&form.original_email) {
            return Redirect::to("/access-denied").into_response();
        }
        let mut errors = FieldErrors::default();
        let date_of_birth = validate_profile(
            &mut errors,
            &form.first_name,
            &form.last_name,
            &form.address,
            &form.date_of_birth,
            &form.email,
        );
        if !errors.any() {
            match app_state
                .store
                .update_person_and_account(polis_db::PersonUpdate {
                    original_email: form.original_email.clone(),
                    email: form.email.clone(),
                    first_name: form.first_name.clone(),
                    last_name: form.last_name.clone(),
                    address: form.address.clone(),
                    date_of_birth: date_of_birth.expect("validated above"),
                })
                .await
            {
                Ok(Some(person)) => {
                    messages.success(format!(
                        "Insured person: {} was updated",
                        person.full_name()
                    ));
                    return if user.is_admin() {
                        Redirect::to("/persons").into_response()
                    } else {
                        Redirect::to(&detail_url(&form.email)).into_response()
                    };
                }
                Ok(None) => return Redirect::to("/persons").into_response(),
                Err(polis_db::Error::EmailTaken) => {
                    errors.add("email", "Another user already has this e-mail");
                }
                // A failed account update falls silently back to the form.
                Err(_) => {}
            }
        }
        Html(
            EditTemplate {
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
    #[template(path = "persons/detail.html")]
    pub struct DetailTemplate {
        messages: Vec<Message>,
        person: models::InsuredPerson,
        email: String,
        contracts: Vec<(models::AgreedInsurance, models::Insurance)>,
        events: Vec<models::InsuranceEvent>,
        is_admin: bool,
    }

    pub async fn get(
        auth_session: AuthSession<BackEnd>,
        messages: Messages,
        State(app_state): State<AppState>,
        Query(EmailQuery { email }): Query<EmailQuery>,
    ) -> impl IntoResponse {
        let Some(ref user) = auth_session.user else {
            return Redirect::to("/login").into_response();
        };
        if email.is_empty() {
            return Redirect::to("/persons").into_response();
        }
        if !user.may_access(&email) {
            return Redirect::to("/access-denied").into_response();
        }
        let (person, account) = match app_state.store.load_person_by_email(&email).await {
            Ok(Some(loaded)) => loaded,
            Ok(None) => return Redirect::to("/persons").into_response(),
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        let contracts = match app_state.store.agreements_for_person(person.id).await {
            Ok(contracts) => contracts,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        let events = match app_state.store.events_for_person(person.id).await {
            Ok(events) => events,
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        };
        Html(
            DetailTemplate {
                messages: messages.into_iter().collect(),
                person,
                email: account.email,
                contracts,
                events,
                is_admin: user.is_admin(),
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
        Query(EmailQuery { email }): Query<EmailQuery>,
    ) -> impl IntoResponse {
        match app_state.store.delete_person_and_account(&email).await {
            Ok(Some(person)) => {
                messages.success(format!(
                    "Insured person: {} was removed",
                    person.full_name()
                ));
            }
            Ok(None) => {}
            Err(polis_db::Error::Blocked) => {
                messages.error(
                    "The insured person cannot be removed while insurance events reference them",
                );
            }
            Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
        Redirect::to("/persons").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_validation_flags_each_bad_field() {
        let mut errors = FieldErrors::default();
        let parsed = validate_profile(&mut errors, "J", "N", "", "nonsense", "not-an-email");
        assert!(parsed.is_none());
        assert_ne!(errors.get("first_name"), "");
        assert_ne!(errors.get("last_name"), "");
        assert_ne!(errors.get("address"), "");
        assert_ne!(errors.get("date_of_birth"), "");
        assert_ne!(errors.get("email"), "");
    }

    #[test]
    fn profile_validation_accepts_boundary_lengths() {
        let mut errors = FieldErrors::default();
        let parsed = validate_profile(
            &mut errors,
            &"a".repeat(15),
            &"b".repeat(20),
            &"c".repeat(100),
            "1990-04-12",
            "jan@x.cz",
        );
        assert_eq!(parsed, Some(jiff::civil::date(1990, 4, 12)));
        assert!(!errors.any());
    }
}
