//! Artfeed server entry point.

use std::sync::Arc;

use artfeed_api::{AppState, CookieSettings, auth_middleware, router as api_router};
use artfeed_common::Config;
use artfeed_core::{
    AuthService, CloudflareClient, DailyGenerationsJob, ImageService, ImgbbClient, LikeService,
    TokenService, UserService,
};
use artfeed_db::repositories::{ImageRepository, LikeRepository, TagRepository, UserRepository};
use axum::middleware;
use tokio::signal;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artfeed=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting artfeed server...");

    let config = Config::load()?;

    let db = artfeed_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    artfeed_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let image_repo = ImageRepository::new(Arc::clone(&db));
    let tag_repo = TagRepository::new(Arc::clone(&db));
    let like_repo = LikeRepository::new(Arc::clone(&db));

    let tokens = TokenService::new(&config.auth)?;
    let model = Arc::new(CloudflareClient::new(config.cloudflare.clone())?);
    let host = Arc::new(ImgbbClient::new(config.imgbb.clone())?);

    let images = ImageService::new(image_repo.clone(), tag_repo, like_repo.clone(), model, host);
    let state = AppState {
        auth: AuthService::new(user_repo.clone(), tokens, config.generations.per_day),
        users: UserService::new(user_repo.clone()),
        likes: LikeService::new(like_repo, image_repo, images.clone()),
        images,
        cookies: CookieSettings::from_config(&config.auth),
    };

    let job = DailyGenerationsJob::new(user_repo, &config.generations)?.spawn();

    let app = api_router()
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    job.abort();
    info!("Server shutdown complete");
    Ok(())
}
