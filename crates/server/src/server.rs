use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;

use std::{net::SocketAddr, sync::Arc};

use crate::{ServerError, installments, loans, members, savings};
use api_types::Health;
use engine::{Engine, EngineError};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

/// Liveness check; also pings the database.
async fn health(State(state): State<ServerState>) -> Result<Json<Health>, ServerError> {
    state.db.ping().await.map_err(EngineError::from)?;
    Ok(Json(Health {
        status: "ok".to_string(),
    }))
}

pub fn router(state: ServerState) -> Router {
    let api = Router::new()
        .route("/members", post(members::register).get(members::list))
        .route("/members/{id}", get(members::get))
        .route("/members/{id}/verify", post(members::verify))
        .route("/members/{id}/activate", post(members::activate))
        .route("/members/{id}/activities", get(members::activities))
        .route("/savings", get(savings::list))
        .route("/savings/balances/{member_id}", get(savings::balances))
        .route("/savings/deposit", post(savings::deposit))
        .route("/savings/withdrawal", post(savings::withdrawal))
        .route("/loans", post(loans::apply).get(loans::list))
        .route("/loans/{id}", get(loans::get))
        .route("/loans/{id}/approve", post(loans::approve))
        .route("/loans/{id}/disburse", post(loans::disburse))
        .route("/installments", get(installments::list))
        .route("/installments/{id}/pay", post(installments::pay));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
