/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_api::{app::AppState, config::Config};
/// use taskboard_shared::store::MemoryStore;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config);
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use taskboard_shared::{
    auth::middleware::{bearer_token, resolve},
    store::Store,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Both fields are `Arc`s, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Persistence for users, groups, and tasks
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

    /// Gets JWT secret for token operations
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
/// ├── GET  /health                              # public
/// ├── /api/users/
/// │   ├── POST /signup                          # public
/// │   ├── POST /login                           # public
/// │   ├── GET  /me
/// │   └── GET  /
/// ├── /api/groups/
/// │   ├── GET|POST   /
/// │   ├── GET|DELETE /:id
/// │   ├── PATCH  /:id/add_user/:user_id
/// │   ├── DELETE /:id/remove_user/:user_id
/// │   ├── GET    /:id/users
/// │   ├── GET    /:id/tasks
/// │   └── GET    /:id/dashboard
/// └── /api/tasks/
///     ├── GET|POST /                            # ?board_id=&deadline_before=
///     ├── GET  /dashboard                       # ?board_id=
///     ├── GET  /user/:user_id
///     ├── GET|PATCH|DELETE /:id
///     ├── PATCH /:id/assign
///     └── PATCH /:id/unassign
/// ```
///
/// Collection routes answer with and without the trailing slash.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (every route except health, signup, and login)
pub fn build_router(state: AppState) -> Router {
    // Public routes, no auth
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/users/signup", post(routes::users::signup))
        .route("/api/users/login", post(routes::users::login));

    let user_routes = Router::new()
        .route("/api/users/me", get(routes::users::me))
        .route("/api/users", get(routes::users::list_users))
        .route("/api/users/", get(routes::users::list_users));

    let group_routes = Router::new()
        .route(
            "/api/groups",
            get(routes::groups::list_groups).post(routes::groups::create_group),
        )
        .route(
            "/api/groups/",
            get(routes::groups::list_groups).post(routes::groups::create_group),
        )
        .route(
            "/api/groups/:id",
            get(routes::groups::get_group).delete(routes::groups::delete_group),
        )
        .route(
            "/api/groups/:id/add_user/:user_id",
            patch(routes::groups::add_user),
        )
        .route(
            "/api/groups/:id/remove_user/:user_id",
            delete(routes::groups::remove_user),
        )
        .route("/api/groups/:id/users", get(routes::groups::list_members))
        .route("/api/groups/:id/tasks", get(routes::groups::list_group_tasks))
        .route("/api/groups/:id/dashboard", get(routes::groups::group_dashboard));

    let task_routes = Router::new()
        .route(
            "/api/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/api/tasks/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/api/tasks/dashboard", get(routes::tasks::dashboard))
        .route("/api/tasks/user/:user_id", get(routes::tasks::list_user_tasks))
        .route(
            "/api/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/api/tasks/:id/assign", patch(routes::tasks::assign_user))
        .route("/api/tasks/:id/unassign", patch(routes::tasks::unassign_user));

    // Everything below requires a bearer token
    let protected_routes = Router::new()
        .merge(user_routes)
        .merge(group_routes)
        .merge(task_routes)
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    // Configure CORS based on environment
    let cors = if state.config.allows_any_origin() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter(|origin| origin.as_str() != "*")
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
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Resolves the bearer token to an existing user and injects the resulting
/// `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?.to_owned();

    let auth_context = resolve(state.store.as_ref(), state.jwt_secret(), &token).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
