/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// Every outbound dependency (mailer, object store, realtime notifier)
/// is constructed once at startup and injected through the state, so
/// tests can swap in doubles and nothing reaches for a global.

use crate::{
    clients::{DynMailer, DynObjectStore},
    config::Config,
    middleware::security::SecurityHeadersLayer,
    services::SideEffects,
};
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskflow_shared::auth::{jwt, middleware::bearer_token, policy::Actor};
use taskflow_shared::models::user::User;
use taskflow_shared::realtime::Notifier;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Transactional email client
    pub mailer: DynMailer,

    /// Object store for file attachments
    pub storage: DynObjectStore,

    /// Realtime notification publisher
    pub notifier: Notifier,

    /// Post-mutation side-effect dispatcher
    pub side_effects: SideEffects,
}

impl AppState {
    /// Creates new application state wiring the cascade to the given
    /// dependencies
    pub fn new(
        db: PgPool,
        config: Config,
        mailer: DynMailer,
        storage: DynObjectStore,
        notifier: Notifier,
    ) -> Self {
        let side_effects = SideEffects::new(
            db.clone(),
            notifier.clone(),
            mailer.clone(),
            config.email.frontend_url.clone(),
        );

        Self {
            db,
            config: Arc::new(config),
            mailer,
            storage,
            notifier,
            side_effects,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── /health                           # public
/// └── /v1/
///     ├── /auth/                        # register/login/verify public,
///     │                                 # logout/profile authenticated
///     ├── /users/                       # authenticated
///     ├── /tasks/                       # authenticated, incl. nested
///     │                                 # comments/files/favorite/activity
///     ├── /comments/:id                 # authenticated
///     ├── /files/:id                    # authenticated
///     ├── /favorites                    # authenticated
///     └── /activity                     # authenticated
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Public auth endpoints
    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/verify-email", post(routes::auth::verify_email))
        .route("/refresh-token", post(routes::auth::refresh_token));

    // Auth endpoints that need a valid access token
    let private_auth_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/profile", get(routes::auth::profile))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route("/:id", get(routes::users::get_user));

    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task))
        .route("/", get(routes::tasks::list_tasks))
        .route("/:id", get(routes::tasks::get_task))
        .route("/:id", put(routes::tasks::update_task))
        .route("/:id", delete(routes::tasks::delete_task))
        .route("/:id/comments", get(routes::comments::list_comments))
        .route("/:id/comments", post(routes::comments::create_comment))
        .route("/:id/files", get(routes::files::list_files))
        .route(
            "/:id/files",
            post(routes::files::upload_file)
                // Cap plus headroom for multipart framing
                .layer(DefaultBodyLimit::max(routes::files::MAX_FILE_SIZE + 1024 * 1024)),
        )
        .route("/:id/favorite", post(routes::favorites::add_favorite))
        .route("/:id/favorite", get(routes::favorites::check_favorite))
        .route("/:id/favorite", delete(routes::favorites::remove_favorite))
        .route("/:id/activity", get(routes::activity::list_task_activity));

    let comment_routes = Router::new()
        .route("/:id", put(routes::comments::update_comment))
        .route("/:id", delete(routes::comments::delete_comment));

    let file_routes = Router::new().route("/:id", delete(routes::files::delete_file));

    let favorite_routes = Router::new().route("/", get(routes::favorites::list_favorites));

    let activity_routes = Router::new().route("/", get(routes::activity::list_my_activity));

    let authed_routes = Router::new()
        .nest("/users", user_routes)
        .nest("/tasks", task_routes)
        .nest("/comments", comment_routes)
        .nest("/files", file_routes)
        .nest("/favorites", favorite_routes)
        .nest("/activity", activity_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(private_auth_routes))
        .merge(authed_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
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
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Validates the Bearer token, loads the user from the database and
/// injects an [`Actor`] into request extensions. The role comes from
/// the database row, not the token, so a role change or deactivation
/// takes effect on the next request rather than at token expiry.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = bearer_token(auth_header)?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    let user = User::find_active_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Unknown or deactivated user".to_string())
        })?;

    req.extensions_mut().insert(Actor {
        id: user.id,
        role: user.role,
    });

    Ok(next.run(req).await)
}
