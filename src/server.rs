//! HTTP server initialization and runtime setup.
//!
//! Handles storage selection, service wiring, the deletion worker, and the
//! Axum server lifecycle including graceful shutdown.

use crate::application::services::{AuthService, LinkService};
use crate::config::Config;
use crate::domain::deletion_worker::{DeletionCoordinator, DeletionSettings};
use crate::domain::repositories::{LinkRepository, UserRepository};
use crate::infrastructure::memory::FileStorage;
use crate::infrastructure::persistence::{self, PgLinkRepository, PgUserRepository};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::Router;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Storage backends selected by configuration.
pub struct Storage {
    pub links: Arc<dyn LinkRepository>,
    pub users: Arc<dyn UserRepository>,
}

/// Opens the configured storage backend.
///
/// PostgreSQL when a DSN is set, otherwise the file-backed memory store.
///
/// # Errors
///
/// Returns an error if the database is unreachable, migrations fail, or the
/// storage file cannot be read.
pub async fn open_storage(config: &Config) -> Result<Storage> {
    if let Some(ref dsn) = config.database_dsn {
        let pool = Arc::new(
            persistence::connect(dsn, config.db_max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?,
        );
        tracing::info!("Connected to database");

        return Ok(Storage {
            links: Arc::new(PgLinkRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool)),
        });
    }

    let store = Arc::new(
        FileStorage::open(&config.file_storage_path)
            .await
            .with_context(|| {
                format!("Failed to open storage file '{}'", config.file_storage_path)
            })?,
    );

    Ok(Storage {
        links: store.clone(),
        users: store,
    })
}

/// Wires services and the deletion worker on top of `storage`.
///
/// Must be called from within a tokio runtime.
pub fn build_state(config: &Config, storage: &Storage) -> AppState {
    let link_service = Arc::new(LinkService::new(
        storage.links.clone(),
        config.base_url.clone(),
    ));
    let auth_service = Arc::new(AuthService::new(
        storage.users.clone(),
        config.token_secret.clone(),
        config.token_ttl(),
    ));
    let deletion = Arc::new(DeletionCoordinator::start(
        storage.links.clone(),
        DeletionSettings {
            flush_interval: config.deletion_flush_interval(),
            queue_capacity: config.deletion_queue_capacity,
        },
    ));

    AppState::new(link_service, auth_service, deletion)
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Storage backend (PostgreSQL or file-backed memory store)
/// - Link and identity services
/// - Background deletion worker
/// - Axum HTTP server
///
/// On Ctrl-C or SIGTERM the server stops accepting connections, gives
/// in-flight requests up to the shutdown timeout, drains pending deletions
/// and closes storage.
///
/// # Errors
///
/// Returns an error if:
/// - Storage cannot be opened
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let storage = open_storage(&config).await?;
    let state = build_state(&config, &storage);
    let deletion = state.deletion.clone();

    let app = app_router(state);

    let listener = TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server_address))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    serve_until(listener, app, shutdown_signal(), config.shutdown_timeout()).await?;

    tracing::info!("HTTP server stopped, draining deletions");
    if let Err(e) = deletion.stop(config.shutdown_timeout()).await {
        tracing::error!(error = %e, "Deletion drain incomplete");
    }

    storage.links.close().await.context("Failed to close storage")?;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Serves `app` until `signal` resolves, then waits at most `grace` for
/// in-flight requests before returning.
///
/// Requests still running after `grace` are abandoned so the caller can go
/// on with shutdown.
///
/// # Errors
///
/// Returns an error if the server fails while running.
pub async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    grace: Duration,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let stop = Arc::new(Notify::new());
    let server = axum::serve(listener, app).with_graceful_shutdown({
        let stop = stop.clone();
        async move { stop.notified().await }
    });
    let mut server = std::pin::pin!(server.into_future());

    tokio::select! {
        result = &mut server => return result.context("HTTP server failed"),
        () = signal => {}
    }

    stop.notify_one();
    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => result.context("HTTP server failed"),
        Err(_) => {
            tracing::warn!(
                grace_ms = grace.as_millis() as u64,
                "In-flight requests still running, abandoning them"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_serve_until_abandons_stuck_requests() {
        let entered = Arc::new(Notify::new());
        let app = Router::new().route(
            "/stuck",
            get({
                let entered = entered.clone();
                move || {
                    let entered = entered.clone();
                    async move {
                        entered.notify_one();
                        std::future::pending::<()>().await
                    }
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (signal_tx, signal_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(serve_until(
            listener,
            app,
            async move {
                let _ = signal_rx.await;
            },
            Duration::from_millis(100),
        ));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /stuck HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        entered.notified().await;

        signal_tx.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not stop after the grace period")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_serve_until_returns_once_idle() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            serve_until(listener, Router::new(), async {}, Duration::from_secs(60)),
        )
        .await
        .expect("idle server should stop immediately");

        assert!(result.is_ok());
    }
}
