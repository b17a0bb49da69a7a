use anyhow::Context;
use axum_login::{
    tower_sessions::{MemoryStore, SessionManagerLayer},
    AuthManagerLayerBuilder,
};

mod account;
mod agreed;
mod auth;
mod bootstrap;
mod config;
mod csrf;
mod events;
mod forms;
mod insurances;
mod persons;
mod routes;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let config = config::load().context("loading configuration")?;
    init_tracing(&config.tracing);
    let store = polis_db::create(&config.database)
        .await
        .context("creating database store")?;
    bootstrap::seed(&store)
        .await
        .context("seeding roles and the administrator account")?;
    let session_layer = SessionManagerLayer::new(MemoryStore::default());
    let login_backend = auth::create_backend(store.clone());
    let auth_layer = AuthManagerLayerBuilder::new(login_backend, session_layer).build();
    let app_state = AppState { store };
    let app = routes::setup(app_state, auth_layer);
    let listener =
        tokio::net::TcpListener::bind((config.bind_address.as_str(), config.bind_port))
            .await
            .context("binding listener")?;
    Ok(axum::serve(listener, app)
        .await
        .context("serving application")?)
}

fn init_tracing(config: &config::TracingConfig) {
    if config.console {
        console_subscriber::init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }
}

#[derive(Clone)]
struct AppState {
    store: polis_db::Store,
}
