use crate::{
    config::Config,
    places::{self, LocationResult, PlaceSearch, PlaceSearchError, YelpPlaceSearch},
    search::{SearchError, SearchOrchestrator},
    semantic::FastembedLoader,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{fmt::Debug, sync::Arc};
use tokio::signal;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[derive(Clone)]
pub struct SharedState {
    pub orchestrator: Arc<SearchOrchestrator>,
    /// Business search behind `/api/locations`; `None` when no API key is set
    pub proxy: Option<Arc<dyn PlaceSearch>>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/locations", get(locations))
        .route("/api/vibe", get(vibe))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(Arc::new(state))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::warn!("shutting down");
}

/// Build the shared state from config and serve until interrupted.
pub async fn serve(config: &Config, addr: &str) -> anyhow::Result<()> {
    let places = places::from_config(&config.places)?;
    let loader = Arc::new(FastembedLoader::new(
        &config.embedding.model,
        config.base_path().to_path_buf(),
        Some(config.embedding.download_timeout()),
    ));
    let orchestrator = Arc::new(SearchOrchestrator::new(loader, places, config));

    let proxy = match YelpPlaceSearch::from_env(
        &config.places.api_key_env,
        config.places.user_location.clone(),
        config.places.timeout(),
    ) {
        Ok(proxy) => Some(Arc::new(proxy) as Arc<dyn PlaceSearch>),
        Err(err) => {
            log::warn!("/api/locations disabled: {err}");
            None
        }
    };

    // warm the model in the background; requests wait on the same load
    let warmup = orchestrator.clone();
    tokio::spawn(async move {
        match warmup.initialize_model().await {
            Ok(()) => log::info!("model status={:?}", warmup.oracle_status()),
            Err(err) => log::error!("model warmup failed: {err}"),
        }
    });

    let app = router(SharedState {
        orchestrator,
        proxy,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("Query parameter is required")]
    MissingQuery,

    #[error("Yelp API key not configured")]
    MissingApiKey,

    #[error("Failed to search locations")]
    Upstream(#[source] PlaceSearchError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

#[derive(Debug)]
struct HttpError(ApiError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            ApiError::MissingQuery => StatusCode::BAD_REQUEST,
            ApiError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Search(err) => match err {
                SearchError::EmptyQuery => StatusCode::BAD_REQUEST,
                SearchError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
                SearchError::CandidateFetch(_) => StatusCode::BAD_GATEWAY,
                SearchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                SearchError::Embedding(_) => {
                    log::error!("{self:?}");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<ApiError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationsRequest {
    pub query: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "notesContent")]
    pub notes_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocationsResponse {
    pub results: Vec<LocationResult>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

async fn locations(
    State(state): State<Arc<SharedState>>,
    Query(payload): Query<LocationsRequest>,
) -> Result<Json<LocationsResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let query = non_blank(&payload.query).ok_or(ApiError::MissingQuery)?;
    let proxy = state.proxy.as_ref().ok_or(ApiError::MissingApiKey)?;

    let results = proxy
        .search(query, non_blank(&payload.location), non_blank(&payload.notes_content))
        .await
        .map_err(ApiError::Upstream)?;

    Ok(Json(LocationsResponse { results }))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VibeRequest {
    pub query: Option<String>,
    #[serde(rename = "notesContent")]
    pub notes_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VibeResponse {
    pub best: Option<LocationResult>,
    pub results: Vec<LocationResult>,
    pub contextual_query: String,
}

async fn vibe(
    State(state): State<Arc<SharedState>>,
    Query(payload): Query<VibeRequest>,
) -> Result<Json<VibeResponse>, HttpError> {
    log::debug!("payload: {payload:?}");

    let query = non_blank(&payload.query).ok_or(SearchError::EmptyQuery)?;

    let outcome = match non_blank(&payload.notes_content) {
        Some(notes) => state.orchestrator.search_with_context(query, notes).await?,
        None => state.orchestrator.search_locations(query).await?,
    };

    Ok(Json(VibeResponse {
        best: outcome.best().cloned(),
        contextual_query: outcome.contextual_query,
        results: outcome.results,
    }))
}
