use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{GenerateCardsRequest, GenerateCardsResponse, SessionReadResponse, SessionWriteResponse},
};
use storage::Storage;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
};
use tracing::{error, info, warn};

mod api;
mod app_state;
mod config;
mod generator;

use api::{
    cards_route, delete_session, generate_cards, read_session, session_route, write_session,
    ApiContext, ClientQuery, SessionWriteRequest,
};
use app_state::AppState;
use config::{load_settings, prepare_database_url};
use generator::StagedGenerator;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext {
        storage,
        generator: Arc::new(StagedGenerator::new(
            settings.batch_size,
            settings.insight_every,
        )),
    };

    let app = build_router(Arc::new(AppState { api }), settings.max_body_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(
        %addr,
        batch_size = settings.batch_size,
        insight_every = settings.insight_every,
        "server listening"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/healthz", get(healthz))
        .route(
            session_route(),
            get(http_read_session)
                .post(http_write_session)
                .delete(http_delete_session),
        )
        .route(cards_route(), post(http_generate_cards))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(cors)
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = status_for(err.code);
    if status.is_server_error() {
        warn!(error = %err.message, "request failed");
    }
    (status, Json(err))
}

async fn healthz(
    State(state): State<Arc<AppState>>,
) -> Result<&'static str, (StatusCode, Json<ApiError>)> {
    state.api.storage.health_check().await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::Unavailable, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn http_read_session(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ClientQuery>,
) -> ApiResult<SessionReadResponse> {
    let session = read_session(&state.api, q.client_id.as_deref())
        .await
        .map_err(reject)?;
    Ok(Json(session))
}

async fn http_write_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionWriteRequest>,
) -> ApiResult<SessionWriteResponse> {
    let response = write_session(&state.api, req).await.map_err(reject)?;
    Ok(Json(response))
}

async fn http_delete_session(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ClientQuery>,
) -> ApiResult<SessionWriteResponse> {
    let response = delete_session(&state.api, q.client_id.as_deref())
        .await
        .map_err(reject)?;
    Ok(Json(response))
}

async fn http_generate_cards(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateCardsRequest>,
) -> ApiResult<GenerateCardsResponse> {
    Ok(Json(generate_cards(&state.api, &req)))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
