use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use db_pool::{create_pool, migrate};
use post_service::config::StoreBackend;
use post_service::db::{
    ConsistencySweeper, MemoryStore, PgStore, Repositories, StoreHealth, MIGRATOR,
};
use post_service::handlers::{self, HealthState, UploadLimits};
use post_service::jobs::ReferenceSweepJob;
use post_service::media::{CloudinaryMediaStore, DisabledMediaStore, MediaStore};
use post_service::metrics::serve_metrics;
use post_service::middleware::JwtVerifier;
use post_service::services::{CommentService, FeedService, PostService};
use post_service::Config;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn io_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{context}: {e}"))
}

struct Stores {
    repos: Repositories,
    health: Arc<dyn StoreHealth>,
    sweeper: Arc<dyn ConsistencySweeper>,
}

async fn open_stores(config: &Config) -> anyhow::Result<Stores> {
    match config.database.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            let store = Arc::new(MemoryStore::new());
            Ok(Stores {
                repos: Repositories::from_store(store.clone()),
                health: store.clone(),
                sweeper: store,
            })
        }
        StoreBackend::Postgres => {
            let db_cfg = config
                .database
                .pool_config()
                .map_err(|e| anyhow::anyhow!("Invalid database pool configuration: {e}"))?;
            db_cfg.log_config();

            let pool = create_pool(db_cfg)
                .await
                .context("Failed to create database pool")?;
            migrate(&pool, &MIGRATOR)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Connected to database via db-pool crate");

            let store = Arc::new(PgStore::new(pool));
            Ok(Stores {
                repos: Repositories::from_store(store.clone()),
                health: store.clone(),
                sweeper: store,
            })
        }
    }
}

fn build_media_store(config: &Config) -> anyhow::Result<Arc<dyn MediaStore>> {
    match &config.media {
        Some(media) => {
            let store = CloudinaryMediaStore::from_config(media)
                .context("Failed to initialize media store")?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("CLOUDINARY_CLOUD_NAME not set; media uploads are disabled");
            Ok(Arc::new(DisabledMediaStore))
        }
    }
}

/// Post Service
///
/// Posts, comments, likes and reposts for the Socialix social network.
///
/// # Routes
///
/// - `/api/v1/posts/*` - Create, list, fetch, delete, like and repost posts
/// - `/api/v1/posts/{id}/comments/*` - Add and delete comments
/// - `/api/v1/comments/{id}` - Fetch a comment
/// - `/api/v1/health*`, `/metrics` - Unauthenticated probes
#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenvy::dotenv();

    // Container healthcheck: `post-service healthcheck`
    {
        let mut args = std::env::args();
        let _bin = args.next();
        if let Some(cmd) = args.next() {
            if cmd == "healthcheck" || cmd == "healthcheck-http" {
                let port = std::env::var("POST_SERVICE_PORT")
                    .or_else(|_| std::env::var("PORT"))
                    .unwrap_or_else(|_| "3000".to_string());
                let url = format!("http://127.0.0.1:{}/api/v1/health", port);
                return match reqwest::Client::new().get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => Ok(()),
                    Ok(resp) => {
                        eprintln!("healthcheck HTTP status: {}", resp.status());
                        Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"))
                    }
                    Err(e) => {
                        eprintln!("healthcheck HTTP error: {}", e);
                        Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"))
                    }
                };
            }
        }
    }

    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting post-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let verifier = match &config.auth.jwt_public_key_pem {
        Some(pem) => JwtVerifier::from_rsa_pem(pem)
            .map_err(|e| io_error("Failed to initialize JWT verifier", e))?,
        None => {
            tracing::warn!("JWT public key not configured; authenticated routes will return 401");
            JwtVerifier::disabled()
        }
    };

    let stores = open_stores(&config)
        .await
        .map_err(|e| io_error("Store initialization failed", format!("{e:#}")))?;
    let media = build_media_store(&config)
        .map_err(|e| io_error("Media store initialization failed", format!("{e:#}")))?;

    let posts = web::Data::new(PostService::new(
        stores.repos.clone(),
        media,
        config.media_folder(),
    ));
    let comments = web::Data::new(CommentService::new(stores.repos.clone()));
    let feed = web::Data::new(FeedService::new(
        stores.repos.clone(),
        config.feed.page_size,
    ));
    let health_state = web::Data::new(HealthState::new(stores.health.clone()));
    let upload_limits = web::Data::new(UploadLimits {
        max_bytes: config.max_upload_bytes(),
    });

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();
    let server = HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let verifier = verifier.clone();
        App::new()
            .app_data(posts.clone())
            .app_data(comments.clone())
            .app_data(feed.clone())
            .app_data(health_state.clone())
            .app_data(upload_limits.clone())
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(serve_metrics))
            .service(web::scope("/api/v1").configure(move |cfg| handlers::configure(cfg, verifier)))
    })
    .bind(&bind_address)?
    .run();

    let server_handle = server.handle();
    let mut tasks: JoinSet<io::Result<()>> = JoinSet::new();

    tasks.spawn(async move {
        tracing::info!("HTTP server is running");
        server.await
    });

    if config.sweeper.interval_secs > 0 {
        let job = ReferenceSweepJob::new(
            stores.sweeper.clone(),
            Duration::from_secs(config.sweeper.interval_secs),
        );
        tasks.spawn(async move {
            job.run().await;
            Ok(())
        });
    } else {
        tracing::info!("Reference sweeper disabled (SWEEP_INTERVAL_SECS=0)");
    }

    let mut first_error: Option<io::Error> = None;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = tasks.join_next() => {
                match result {
                    Some(Ok(Ok(_))) => {
                        tracing::info!("Task completed");
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    Some(Ok(Err(e))) => {
                        tracing::error!("Task returned error: {}", e);
                        first_error = Some(e);
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!("Task join error: {}", e);
                        first_error = Some(io::Error::new(io::ErrorKind::Other, e.to_string()));
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                server_handle.stop(true).await;
                tasks.shutdown().await;
                break;
            }
        }
    }

    tracing::info!("Post-service shutting down");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
