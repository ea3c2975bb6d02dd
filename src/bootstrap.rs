//! Application wiring shared by the server binary and the CLI.

use std::sync::Arc;

use anyhow::Context;

use shelf_authz::IdentityResolver;
use shelf_db::{InMemoryLibraryRepository, LibraryRepository, PgLibraryRepository, PgPool};
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// Everything needed to serve requests.
pub struct App {
    pub registry: ModuleRegistry,
    pub pool: Option<PgPool>,
}

/// Build the registry around the given repository.
pub fn build_registry(settings: &Settings, repository: Arc<dyn LibraryRepository>) -> ModuleRegistry {
    let resolver = Arc::new(IdentityResolver::new(&settings.auth));
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, repository, resolver);
    registry
}

/// Connect storage and register modules.
pub async fn assemble(settings: &Settings) -> anyhow::Result<App> {
    let (repository, pool): (Arc<dyn LibraryRepository>, Option<PgPool>) =
        match settings.database.url {
            Some(_) => {
                let pool = shelf_db::connect(&settings.database).await?;
                (Arc::new(PgLibraryRepository::new(pool.clone())), Some(pool))
            }
            None => {
                tracing::warn!("database.url is not set; using the in-memory library store");
                (Arc::new(InMemoryLibraryRepository::new()), None)
            }
        };

    Ok(App {
        registry: build_registry(settings, repository),
        pool,
    })
}

/// Apply pending migrations of every registered module.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let pool = shelf_db::connect(&settings.database).await?;
    let registry = build_registry(
        settings,
        Arc::new(PgLibraryRepository::new(pool.clone())),
    );
    shelf_db::migrate(&pool, &registry.collect_migrations()).await
}

/// Run the HTTP server until shutdown.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let app = assemble(&settings).await?;
    let ctx = InitCtx {
        settings: &settings,
    };

    app.registry.init_all(&ctx).await?;

    if let Some(pool) = &app.pool {
        if settings.database.run_migrations {
            let applied = shelf_db::migrate(pool, &app.registry.collect_migrations())
                .await
                .context("failed to run migrations")?;
            tracing::info!(applied, "migrations complete");
        }
    }

    app.registry.start_all(&ctx).await?;
    let served = shelf_http::start_server(&app.registry, &settings).await;
    app.registry.stop_all().await?;

    served
}
