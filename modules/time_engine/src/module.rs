use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arc_swap::ArcSwapOption;
use axum::Router;
use runtime::{AppConfig, DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::dto::TimeEvent;
use crate::api::rest::{self, HttpOptions, SseBroadcaster, SseEventPublisher};
use crate::config::TimeEngineConfig;
use crate::contract::client::TimeEngineApi;
use crate::domain::ports::SystemTimeSource;
use crate::domain::service::Service;
use crate::domain::EngineDeps;
use crate::gateways::local::TimeEngineLocalClient;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::{InMemoryStore, SeaOrmStore};
use crate::infra::streaks::SqlStreakRoutine;
use crate::scheduler::ReconcileScheduler;

pub const MODULE_NAME: &str = "time_engine";

/// The time engine module: owns the domain service and its wiring.
pub struct TimeEngine {
    config: TimeEngineConfig,
    events: SseBroadcaster<TimeEvent>,
    service: ArcSwapOption<Service>,
}

impl TimeEngine {
    pub fn new(config: TimeEngineConfig) -> Self {
        let events = SseBroadcaster::new(config.events_capacity);
        Self {
            config,
            events,
            service: ArcSwapOption::empty(),
        }
    }

    /// Read `modules.time_engine` from the app config.
    pub fn from_app_config(app: &AppConfig) -> anyhow::Result<Self> {
        let cfg: TimeEngineConfig = app.module_config(MODULE_NAME)?;
        debug!(?cfg, "loaded time_engine config");
        Ok(Self::new(cfg))
    }

    pub fn config(&self) -> &TimeEngineConfig {
        &self.config
    }

    /// Connect, migrate and wire the SQL store.
    pub async fn init_with_database(
        &self,
        db: &DatabaseConfig,
        home_dir: &Path,
    ) -> anyhow::Result<()> {
        let conn = connect(db, home_dir).await?;
        info!("running time_engine migrations");
        Migrator::up(&conn, None)
            .await
            .context("time_engine migrations failed")?;

        let store = Arc::new(SeaOrmStore::new(conn.clone()));
        let deps = EngineDeps {
            profiles: store.clone(),
            missions: store.clone(),
            questions: store,
            streaks: Arc::new(SqlStreakRoutine::new(conn)),
            events: Arc::new(SseEventPublisher::new(self.events.clone())),
            clock: Arc::new(SystemTimeSource),
            store_timeout: self.config.store_timeout(),
        };
        self.install(deps);
        Ok(())
    }

    /// Wire the in-process store; nothing survives a restart.
    pub fn init_in_memory(&self) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        let deps = EngineDeps {
            profiles: store.clone(),
            missions: store.clone(),
            questions: store.clone(),
            streaks: store.clone(),
            events: Arc::new(SseEventPublisher::new(self.events.clone())),
            clock: Arc::new(SystemTimeSource),
            store_timeout: self.config.store_timeout(),
        };
        self.install(deps);
        info!("time_engine running on the in-memory store");
        store
    }

    fn install(&self, deps: EngineDeps) {
        let service = Service::new(deps, &self.config);
        self.service.store(Some(Arc::new(service)));
    }

    pub fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("time_engine service not initialized"))
    }

    /// In-process client for other components.
    pub fn api(&self) -> anyhow::Result<Arc<dyn TimeEngineApi>> {
        Ok(Arc::new(TimeEngineLocalClient::new(self.service()?)))
    }

    pub fn router(&self, request_timeout: Duration) -> anyhow::Result<Router> {
        let options = HttpOptions {
            request_timeout,
            cors_enabled: self.config.cors_enabled,
        };
        Ok(rest::router(
            self.service()?,
            self.events.clone(),
            self.config.admin_token.clone(),
            &options,
        ))
    }

    pub fn scheduler(&self) -> anyhow::Result<Arc<ReconcileScheduler>> {
        Ok(Arc::new(ReconcileScheduler::new(
            self.service()?,
            self.config.reconcile_interval(),
        )))
    }
}

fn is_memory_sqlite(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Anchor relative SQLite files at the server home and create parent dirs.
fn prepare_sqlite_url(url: &str, home_dir: &Path) -> anyhow::Result<String> {
    if is_memory_sqlite(url) {
        return Ok(url.to_string());
    }
    let Some(rest) = url.strip_prefix("sqlite://") else {
        return Ok(url.to_string());
    };
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    let file = Path::new(path);
    let file = if file.is_absolute() {
        file.to_path_buf()
    } else {
        home_dir.join(file)
    };
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut out = format!("sqlite://{}", file.display());
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

async fn connect(db: &DatabaseConfig, home_dir: &Path) -> anyhow::Result<DatabaseConnection> {
    let sqlite = db.url.starts_with("sqlite:");
    let url = if sqlite {
        prepare_sqlite_url(&db.url, home_dir)?
    } else {
        db.url.clone()
    };

    let mut opts = ConnectOptions::new(url);
    opts.sqlx_logging(false);
    if sqlite && is_memory_sqlite(&db.url) {
        // Every pooled connection would otherwise open its own empty database.
        opts.max_connections(1);
    } else if let Some(n) = db.max_conns {
        opts.max_connections(n);
    }
    if sqlite {
        let busy = Duration::from_millis(u64::from(db.busy_timeout_ms.unwrap_or(5_000)));
        opts.map_sqlx_sqlite_opts(move |o| o.busy_timeout(busy));
    }

    let conn = Database::connect(opts)
        .await
        .context("connecting to the time_engine database")?;
    info!(engine = if sqlite { "sqlite" } else { "postgres" }, "database connected");
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls_are_untouched() {
        let home = Path::new("/srv/playops");
        assert_eq!(
            prepare_sqlite_url("sqlite::memory:", home).unwrap(),
            "sqlite::memory:"
        );
    }

    #[test]
    fn relative_sqlite_files_live_under_home() {
        let tmp = std::env::temp_dir().join(format!("te-{}", nanoid::nanoid!(8)));
        let url = prepare_sqlite_url("sqlite://database/playops.db?mode=rwc", &tmp).unwrap();
        assert!(url.starts_with("sqlite://"));
        assert!(url.ends_with("database/playops.db?mode=rwc"));
        assert!(tmp.join("database").exists());
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn uninitialized_module_refuses_to_serve() {
        let engine = TimeEngine::new(TimeEngineConfig::default());
        assert!(engine.service().is_err());
        assert!(engine.router(Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn sqlite_memory_database_migrates() {
        let engine = TimeEngine::new(TimeEngineConfig::default());
        let db = DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_conns: Some(4),
            busy_timeout_ms: None,
        };
        engine
            .init_with_database(&db, Path::new("/tmp"))
            .await
            .unwrap();
        let view = engine
            .api()
            .unwrap()
            .get_balance(uuid::Uuid::new_v4())
            .await
            .unwrap();
        assert!(view.is_default);
    }
}
