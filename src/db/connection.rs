use anyhow::{Context, Result};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaOrmDatabase,
    DatabaseConnection as SeaOrmConnection, DbBackend, Statement,
};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::db::migrations::Migrator;

pub type DatabaseConnection = Arc<SeaOrmConnection>;

/// A migrated SQLite catalog database.
pub struct Database {
    connection: DatabaseConnection,
}

impl Database {
    /// Opens (creating if needed) the database file at `path` and brings the
    /// schema up to date.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let url = format!("sqlite://{}?mode=rwc", path.display());
        info!("Opening catalog database {}", path.display());

        let mut options = ConnectOptions::new(url);
        options
            .max_connections(4)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let connection = SeaOrmDatabase::connect(options)
            .await
            .context("Failed to open catalog database")?;

        // Persisted in the file: readers keep going during a full replace
        connection
            .execute(Statement::from_string(
                DbBackend::Sqlite,
                "PRAGMA journal_mode = WAL",
            ))
            .await
            .context("Failed to switch the catalog database to WAL")?;

        let db = Self {
            connection: Arc::new(connection),
        };
        db.migrate().await?;
        Ok(db)
    }

    pub fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    async fn migrate(&self) -> Result<()> {
        let pending = Migrator::get_pending_migrations(&*self.connection)
            .await
            .context("Failed to list pending migrations")?;
        if pending.is_empty() {
            debug!("Catalog schema is current");
            return Ok(());
        }

        info!("Applying {} catalog migration(s)", pending.len());
        Migrator::up(&*self.connection, None)
            .await
            .context("Failed to migrate catalog database")
    }
}
