use crate::{account, agreed, auth::BackEnd, csrf, events, insurances, persons, AppState};
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_login::{login_required, tower_sessions::MemoryStore, AuthManagerLayer, AuthSession};
use axum_messages::MessagesManagerLayer;

pub(super) fn setup(
    app_state: AppState,
    auth_manager: AuthManagerLayer<BackEnd, MemoryStore>,
) -> axum::routing::Router {
    let admin_only = axum::Router::new()
        .route("/persons", get(persons::index::get))
        .route(
            "/persons/create",
            get(persons::create::get).post(persons::create::post),
        )
        .route("/persons/delete", get(persons::delete::get))
        .route("/insurances", get(insurances::index::get))
        .route(
            "/insurances/create",
            get(insurances::create::get).post(insurances::create::post),
        )
        .route("/insurances/detail/{id}", get(insurances::detail::get))
        .route(
            "/insurances/edit/{id}",
            get(insurances::edit::get).post(insurances::edit::post),
        )
        .route("/insurances/delete/{id}", get(insurances::delete::get))
        .route("/contracts", get(agreed::index::get))
        .route("/contracts/detail/{id}", get(agreed::detail::get))
        .route("/contracts/delete/{id}", get(agreed::delete::get))
        .route("/claims", get(events::index::get))
        .route("/claims/detail/{id}", get(events::detail::get))
        .route("/claims/delete/{id}", get(events::delete::get))
        .route(
            "/claims/create",
            get(events::create::get).post(events::create::post),
        )
        .route(
            "/claims/edit/{id}",
            get(events::edit::get).post(events::edit::post),
        )
        .route_layer(middleware::from_fn(require_admin));
    let admin_or_client = axum::Router::new()
        .route("/persons/detail", get(persons::detail::get))
        .route(
            "/persons/edit",
            get(persons::edit::get).post(persons::edit::post),
        )
        .route(
            "/contracts/create",
            get(agreed::create::get).post(agreed::create::post),
        )
        .route(
            "/logout",
            get(account::logout::get).post(account::logout::post),
        )
        .route_layer(login_required!(BackEnd, login_url = "/login"));
    axum::Router::new()
        .merge(admin_only)
        .merge(admin_or_client)
        .route("/", get(account::root))
        .route(
            "/login",
            get(account::login::get).post(account::login::post),
        )
        .route("/access-denied", get(account::access_denied::get))
        .layer(middleware::from_fn(csrf::verify))
        .layer(MessagesManagerLayer)
        .layer(auth_manager)
        .fallback(fallback)
        .with_state(app_state)
}

/// The admin capability check, evaluated before any admin handler body runs:
/// anonymous callers go to the login page, signed-in non-admins to the
/// access-denied page.
async fn require_admin(
    auth_session: AuthSession<BackEnd>,
    request: Request,
    next: Next,
) -> Response {
    match auth_session.user {
        Some(ref user) if user.is_admin() => next.run(request).await,
        Some(_) => Redirect::to("/access-denied").into_response(),
        None => Redirect::to("/login").into_response(),
    }
}

pub async fn fallback(_uri: axum::http::Uri) -> impl axum::response::IntoResponse {
    (axum::http::StatusCode::NOT_FOUND, "not found")
}
