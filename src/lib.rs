use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Request pipeline: contracts, validation, identity, policy, dispatch.
pub mod contract;
pub mod dispatch;
pub mod identity;
pub mod policy;
pub mod validation;

// Services behind the handlers.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// The route table: one module per feature area.
pub mod routes;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use contract::RegistryError;
pub use dispatch::Dispatcher;
pub use policy::{SystemMode, SystemModeSwitch};
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockDocumentStorage, S3DocumentStorage, StorageState};

/// ApiDoc
///
/// OpenAPI document for every contract-bound handler, served at `/api-docs/openapi.json`.
/// The contracts remain the source of truth for validation; this is documentation only.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::time, handlers::ping,
        handlers::get_announcements, handlers::create_announcement,
        handlers::get_contest_announcements, handlers::create_contest_announcement,
        handlers::delete_announcement, handlers::show_announcement, handlers::update_announcement,
        handlers::get_users, handlers::get_online_users, handlers::get_user_profile,
        handlers::update_user, handlers::update_show_name,
        handlers::get_problems, handlers::get_problem, handlers::get_problem_document
    ),
    components(
        schemas(
            models::User, models::UserProfile, models::Announcement, models::Problem,
            models::CreateAnnouncementRequest, models::ShowAnnouncementRequest,
            models::UpdateAnnouncementRequest, models::UpdateUserRequest,
            models::UpdateShowNameRequest, models::ShowNameResponse,
            models::MessageResponse, models::DocumentLink,
        )
    ),
    tags(
        (name = "contest-portal", description = "Contest Portal API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The shared container of application services, handed to every handler by the
/// dispatcher. Cloning is cheap; all members are reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: database access for handlers and the authentication layer.
    pub repo: RepositoryState,
    /// Storage Layer: presigned links to problem documents.
    pub storage: StorageState,
    /// Configuration: loaded once at startup.
    pub config: AppConfig,
    /// Process-wide system mode, shared by every clone of the state.
    pub mode: SystemModeSwitch,
}

impl AppState {
    /// Assembles the state with the mode switch starting at `config.system_mode`.
    pub fn new(repo: RepositoryState, storage: StorageState, config: AppConfig) -> Self {
        let mode = SystemModeSwitch::new(config.system_mode);
        Self {
            repo,
            storage,
            config,
            mode,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Builds the dispatcher from the route table and wraps it in the HTTP stack. Fails when
/// the route table itself is inconsistent, which is a startup error.
///
/// Layering, outermost first: CORS, request id, tracing, authentication, then either the
/// Swagger UI or the dispatcher fallback.
pub fn create_router(state: AppState) -> Result<Router, RegistryError> {
    let dispatcher = Arc::new(Dispatcher::new(routes::bindings(), state.clone())?);

    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Everything else is matched against the contract registry, not axum's router.
        .fallback(dispatch::serve_request)
        .with_state(dispatcher)
        .layer(middleware::from_fn_with_state(state, auth::authenticate))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors);

    Ok(router)
}

/// trace_span_logger
///
/// Opens the per-request span carrying method, uri, and the `x-request-id` set by the
/// outer layer, so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
