use crate::config::ModelOptions;
use crate::data::{SchedulingInput, SchedulingOutput};
use crate::error::InvigilationError;
use crate::solver;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use log::{error, info};
use std::net::SocketAddr;

async fn solve_handler(
    State(defaults): State<ModelOptions>,
    Json(input): Json<SchedulingInput>,
) -> Result<Json<SchedulingOutput>, (StatusCode, String)> {
    // the solve blocks until HiGHS returns
    let result = tokio::task::spawn_blocking(move || solver::run(&input, defaults))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    match result {
        Ok(output) => Ok(Json(output)),
        Err(e) => {
            error!("solve failed: {e}");
            Err((status_for(&e), e.to_string()))
        }
    }
}

fn status_for(e: &InvigilationError) -> StatusCode {
    match e {
        InvigilationError::Solver(_) | InvigilationError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(defaults: ModelOptions) -> Router {
    Router::new()
        .route("/v1/invigilation/solve", post(solve_handler))
        .route("/v1/health", get(health))
        .with_state(defaults)
}

pub async fn run_server(addr: SocketAddr, defaults: ModelOptions) -> Result<(), InvigilationError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, router(defaults)).await?;
    Ok(())
}
