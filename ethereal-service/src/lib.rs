pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use ethereal_core::error::AppError;
use ethereal_core::middleware::rate_limit::{
    create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter,
};
use ethereal_core::middleware::request_id::request_id_middleware;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::EtherealConfig;
use crate::middleware::access_proxy_middleware;
use crate::services::{
    Database, LocalMediaStore, LockManager, MediaStore, MembershipManager,
    ProgressiveRateLimiter, RoomDirectory, SessionStore, TokenService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: EtherealConfig,
    pub db: Database,
    pub tokens: TokenService,
    pub directory: RoomDirectory,
    pub sessions: SessionStore,
    pub membership: MembershipManager,
    pub locks: LockManager,
    pub pin_limiter: ProgressiveRateLimiter,
    pub media: Arc<dyn MediaStore>,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire every component of the gate onto one pool and one signing key.
    /// All state handles are explicit; there are no process-wide singletons.
    pub async fn new(config: EtherealConfig, pool: SqlitePool) -> Result<Self, AppError> {
        let db = Database::new(pool);
        let tokens = TokenService::new(&config.token.secret);
        let directory = RoomDirectory::new(db.clone());
        let sessions = SessionStore::new(db.clone());
        let membership = MembershipManager::new(
            db.clone(),
            directory.clone(),
            sessions.clone(),
            tokens.clone(),
            &config.room,
            &config.token,
        );
        let locks = LockManager::new(db.clone(), config.room.lock_lease_seconds);
        let pin_limiter = ProgressiveRateLimiter::new(
            db.clone(),
            config.rate_limit.max_failures,
            config.rate_limit.block_seconds,
        );
        let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(&config.media.root).await?);
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        Ok(Self {
            config,
            db,
            tokens,
            directory,
            sessions,
            membership,
            locks,
            pin_limiter,
            media,
            ip_rate_limiter,
        })
    }
}

/// Assemble the router. Everything room-scoped sits behind the access proxy;
/// only join, PIN verification and health are reachable without a token.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/rooms/me", get(handlers::room::me))
        .route("/rooms/leave", post(handlers::room::leave))
        .route("/rooms/members/:member_id/kick", post(handlers::room::kick))
        .route(
            "/rooms/messages",
            get(handlers::messages::list).post(handlers::messages::post),
        )
        .route(
            "/rooms/documents",
            get(handlers::documents::list).post(handlers::documents::create),
        )
        .route(
            "/rooms/documents/:document_id",
            get(handlers::documents::get_one)
                .put(handlers::documents::update)
                .delete(handlers::documents::remove),
        )
        .route(
            "/rooms/documents/:document_id/revisions",
            get(handlers::documents::revisions),
        )
        .route(
            "/rooms/documents/:document_id/media",
            post(handlers::documents::attach_media),
        )
        .route(
            "/rooms/documents/:document_id/lock",
            post(handlers::locks::lock),
        )
        .route(
            "/rooms/documents/:document_id/unlock",
            post(handlers::locks::unlock),
        )
        .route_layer(from_fn_with_state(state.clone(), access_proxy_middleware));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/rooms/join", post(handlers::join::join))
        .route("/auth/pin", post(handlers::pin::verify_pin))
        .merge(protected)
        .layer(from_fn_with_state(
            state.ip_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
