use crate::{
    auth::{BackEnd, Credentials, User},
    csrf::CsrfToken,
    forms::FieldErrors,
    AppState,
};
use askama_axum::Template;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_login::{
    tower_sessions::{cookie::time::Duration, Expiry, Session},
    AuthSession,
};
use axum_messages::{Message, Messages};
use http::StatusCode;

pub async fn root() -> impl IntoResponse {
    Redirect::to("/login")
}

/// Where a signed-in caller lands: administrators on the person list,
/// clients on their own detail page. `None` when a client has no person row
/// (the login page is shown again).
pub(crate) async fn landing_redirect(store: &polis_db::Store, user: &User) -> Option<Response> {
    if user.is_admin() {
        return Some(Redirect::to("/persons").into_response());
    }
    match store.load_person_by_email(user.email()).await {
        Ok(Some((_, account))) => {
            Some(Redirect::to(&crate::persons::detail_url(&account.email)).into_response())
        }
        Ok(None) => None,
        Err(_) => Some(StatusCode::INTERNAL_SERVER_ERROR.into_response()),
    }
}

pub mod login {
    use super::*;

    #[derive(Template)]
    #[template(path = "login.html")]
    pub struct LoginTemplate {
        messages: Vec<Message>,
        errors: FieldErrors,
        email: String,
        remember_me: bool,
        csrf_token: String,
    }

    pub async fn get(
        auth_session: AuthSession<BackEnd>,
        messages: Messages,
        State(app_state): State<AppState>,
        csrf: CsrfToken,
    ) -> impl IntoResponse {
        if let Some(ref user) = auth_session.user {
            if let Some(response) = landing_redirect(&app_state.store, user).await {
                return response;
            }
        }
        Html(
            LoginTemplate {
                messages: messages.into_iter().collect(),
                errors: FieldErrors::default(),
                email: String::new(),
                remember_me: false,
                csrf_token: csrf.0,
            }
            .render()
            .unwrap(),
        )
        .into_response()
    }

    pub async fn post(
        mut auth_session: AuthSession<BackEnd>,
        session: Session,
        messages: Messages,
        State(app_state): State<AppState>,
        csrf: CsrfToken,
        Form(credentials): Form<Credentials>,
    ) -> impl IntoResponse {
        let mut errors = FieldErrors::default();
        if credentials.email.trim().is_empty() {
            errors.add("email", "Please enter your e-mail");
        }
        if credentials.password.is_empty() {
            errors.add("password", "Please enter your password");
        }
        if !errors.any() {
            match app_state
                .store
                .load_account_by_email(&credentials.email)
                .await
            {
                Ok(None) => errors.add("email", "No user exists with this e-mail."),
                Ok(Some(_)) => match auth_session.authenticate(credentials.clone()).await {
                    Ok(Some(user)) => {
                        if credentials.remember_me {
                            session.set_expiry(Some(Expiry::OnInactivity(Duration::days(14))));
                        }
                        if auth_session.login(&user).await.is_err() {
                            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                        }
                        if let Some(response) = landing_redirect(&app_state.store, &user).await {
                            return response;
                        }
                        // A client without a person row falls back to the
                        // login page.
                    }
                    Ok(None) => errors.add("password", "You entered the wrong password!"),
                    Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
                },
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            }
        }
        Html(
            LoginTemplate {
                messages: messages.into_iter().collect(),
                errors,
                email: credentials.email,
                remember_me: credentials.remember_me,
                csrf_token: csrf.0,
            }
            .render()
            .unwrap(),
        )
        .into_response()
    }
}

pub mod logout {
    use super::*;

    pub async fn get(auth_session: AuthSession<BackEnd>) -> impl IntoResponse {
        perform(auth_session).await
    }

    pub async fn post(auth_session: AuthSession<BackEnd>) -> impl IntoResponse {
        perform(auth_session).await
    }

    async fn perform(mut auth_session: AuthSession<BackEnd>) -> Response {
        match auth_session.logout().await {
            Ok(_) => Redirect::to("/login").into_response(),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

pub mod access_denied {
    use super::*;

    #[derive(Template)]
    #[template(path = "access-denied.html")]
    pub struct AccessDeniedTemplate {
        messages: Vec<Message>,
    }

    pub async fn get(messages: Messages) -> impl IntoResponse {
        Html(
            AccessDeniedTemplate {
                messages: messages.into_iter().collect(),
            }
            .render()
            .unwrap(),
        )
    }
}
