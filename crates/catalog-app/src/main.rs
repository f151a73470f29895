use std::sync::Arc;

use catalog_app::app::{AppState, router};
use catalog_app::keycloak_handler::KeycloakContext;
use catalog_app::worker::GroupSyncWorker;
use catalog_core::config::{DatabaseBackend, load_config};
use catalog_db::db::connection::{create_pool, run_migrations};
use catalog_db::mirror::{GroupMirror, MemoryMirror, PgMirror};
use catalog_keycloak::{
    AdminClient, GroupDirectory, KeycloakConnection, ResourceRegistry, ServiceAccountToken,
    Uma2ConfigSource, UmaClient,
};
use catalog_service::sync::GroupSyncJob;
use salvo::conn::TcpListener;
use salvo::Listener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting catalog authorization service");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let mirror: Arc<dyn GroupMirror> = match config.database.backend {
        DatabaseBackend::Postgres => {
            if config.database.run_migrations {
                run_migrations(&config.database.url).await?;
                tracing::info!("Database migrations applied");
            }
            let pool = create_pool(
                &config.database.url,
                u32::from(config.database.max_connections),
            )
            .await?;
            tracing::info!("Database connection pool created.");
            Arc::new(PgMirror::new(pool))
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using the in-memory group mirror; groups are lost on restart");
            Arc::new(MemoryMirror::new())
        }
    };

    let uma2 = Arc::new(Uma2ConfigSource::from_config(&config.keycloak)?);
    let connection = Arc::new(KeycloakConnection::from_config(&config.keycloak, uma2)?);
    let service_token = Arc::new(ServiceAccountToken::new(Arc::clone(&connection)));
    let directory: Arc<dyn GroupDirectory> = Arc::new(AdminClient::new(
        Arc::clone(&connection),
        Arc::clone(&service_token),
    ));
    let registry: Arc<dyn ResourceRegistry> =
        Arc::new(UmaClient::new(Arc::clone(&connection), service_token));

    let job = Arc::new(GroupSyncJob::new(
        directory,
        Arc::clone(&mirror),
        config.keycloak.client_id.clone(),
    ));
    let (worker, sync) = GroupSyncWorker::new(job, &config.sync);
    let worker_task = worker.spawn();

    let bind_addr = config.server.bind_addr();
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = router(AppState {
        settings: Arc::new(config),
        mirror,
        keycloak: KeycloakContext {
            connection,
            registry,
        },
        sync,
    });

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    worker_task.abort();
    Ok(())
}
