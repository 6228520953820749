/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskflow_api::{app::AppState, config::Config};
/// use taskflow_shared::store::postgres::PgStore;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config);
/// let app = taskflow_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use taskflow_shared::auth::middleware::authenticate_bearer;
use taskflow_shared::store::Store;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Transactional store
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token validation
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /v1/                             # API v1, JWT required
///     ├── GET /me
///     ├── /projects                    # GET list, POST create
///     │   └── /:id                     # GET, PATCH, DELETE
///     │       ├── /members             # GET
///     │       ├── /members/:user_id    # PATCH role, DELETE
///     │       ├── /invite              # POST
///     │       ├── /activities          # GET ?limit=
///     │       ├── /summary             # GET
///     │       ├── /tasks               # GET ?filters, POST
///     │       └── /labels              # GET, POST
///     ├── /tasks/:id                   # GET, PATCH, DELETE
///     │   ├── /reorder                 # POST {status, position}
///     │   ├── /status                  # POST {status}
///     │   ├── /assign                  # POST {assignee}
///     │   ├── /labels                  # POST, DELETE {label_id}
///     │   └── /comments                # GET, POST
///     ├── /comments/:id                # PATCH, DELETE
///     └── /labels/:id                  # PATCH, DELETE
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (on `/v1`)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/:id",
            get(routes::projects::get_project)
                .patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/:id/members", get(routes::projects::list_members))
        .route(
            "/:id/members/:user_id",
            patch(routes::projects::change_member_role).delete(routes::projects::remove_member),
        )
        .route("/:id/invite", post(routes::projects::invite_member))
        .route("/:id/activities", get(routes::projects::activity_feed))
        .route("/:id/summary", get(routes::tasks::project_summary))
        .route(
            "/:id/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id/labels",
            get(routes::labels::list_labels).post(routes::labels::create_label),
        );

    let task_routes = Router::new()
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/reorder", post(routes::tasks::reorder_task))
        .route("/:id/status", post(routes::tasks::change_status))
        .route("/:id/assign", post(routes::tasks::assign_task))
        .route(
            "/:id/labels",
            post(routes::labels::attach_label).delete(routes::labels::detach_label),
        )
        .route(
            "/:id/comments",
            get(routes::comments::list_comments).post(routes::comments::add_comment),
        );

    let comment_routes = Router::new().route(
        "/:id",
        patch(routes::comments::edit_comment).delete(routes::comments::delete_comment),
    );

    let label_routes = Router::new().route(
        "/:id",
        patch(routes::labels::update_label).delete(routes::labels::delete_label),
    );

    // Build complete v1 API (every route requires JWT authentication)
    let v1_routes = Router::new()
        .route("/me", get(routes::me::current_user))
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .nest("/labels", label_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// CORS from `CORS_ORIGINS`; `*` is permissive (development)
fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Validates the bearer token and injects an `AuthContext` into the
/// request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_context = authenticate_bearer(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
