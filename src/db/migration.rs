use scylla::Session;
use std::path::{Path, PathBuf};
use tokio::{
    fs,
    time::{Duration, sleep},
};
use tracing::{debug, error, info, warn};

use crate::config::ScyllaConfig;

use super::DbError;

/// Keyspace name written in the migration files; replaced with the
/// configured keyspace before execution.
const DEFAULT_KEYSPACE: &str = "testing_autologin";

/// Apply every `.cql` file under `migrations/`, in lexicographic order.
/// Statements that fail with "already exists" are skipped.
pub async fn run_migrations(session: &Session, config: &ScyllaConfig) -> Result<(), DbError> {
    let migrations_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
    let files = collect_migration_files(&migrations_dir).await?;

    if files.is_empty() {
        warn!(
            "No migrations found in '{}'; skipping migration step",
            migrations_dir.display()
        );
        return Ok(());
    }

    info!("Applying {} migration file(s)", files.len());
    let mut keyspace_ready = false;

    for path in files {
        let display_path = path.display().to_string();
        let sql = fs::read_to_string(&path).await.map_err(|e| {
            DbError::MigrationError(format!("Failed to read {}: {}", display_path, e))
        })?;
        let statements = split_statements(&sql.replace(DEFAULT_KEYSPACE, &config.keyspace));
        info!(
            "Running {} statement(s) from {}",
            statements.len(),
            display_path
        );

        for (index, statement) in statements.iter().enumerate() {
            let number = index + 1;
            let upper = statement.to_uppercase();
            let creates_keyspace = upper.contains("CREATE KEYSPACE");

            if upper.starts_with("USE ") {
                select_keyspace(session, &config.keyspace, &display_path).await?;
                keyspace_ready = true;
                continue;
            }
            if !keyspace_ready && !creates_keyspace {
                select_keyspace(session, &config.keyspace, &display_path).await?;
                keyspace_ready = true;
            }

            match session.query(statement.as_str(), &[]).await {
                Ok(_) => debug!("Statement {} applied from {}", number, display_path),
                Err(err) if err.to_string().contains("already exists") => {
                    warn!("Statement {} skipped: object already exists", number);
                    continue;
                }
                Err(err) => {
                    error!(
                        "Failed to execute statement {} from {}: {}",
                        number, display_path, err
                    );
                    debug!("Statement {} content: {}", number, statement);
                    return Err(DbError::MigrationError(format!(
                        "Failed to execute statement {} from {}: {}",
                        number, display_path, err
                    )));
                }
            }

            if creates_keyspace {
                if let Err(err) = session.await_schema_agreement().await {
                    warn!("Schema agreement wait failed: {}", err);
                }
                if let Err(err) = session.refresh_metadata().await {
                    warn!("Metadata refresh failed: {}", err);
                }
                select_keyspace(session, &config.keyspace, &display_path).await?;
                keyspace_ready = true;
            }
        }
    }

    info!("Database migrations applied successfully");
    Ok(())
}

async fn collect_migration_files(dir: &Path) -> Result<Vec<PathBuf>, DbError> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| {
        DbError::MigrationError(format!(
            "Failed to read migrations directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| {
        DbError::MigrationError(format!(
            "Failed to iterate migrations in {}: {}",
            dir.display(),
            e
        ))
    })? {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("cql") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Split a CQL script on `;`, dropping blank lines and `--` comments.
fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|chunk| {
            chunk
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with("--"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|statement| !statement.is_empty())
        .collect()
}

async fn select_keyspace(
    session: &Session,
    keyspace: &str,
    display_path: &str,
) -> Result<(), DbError> {
    const MAX_ATTEMPTS: usize = 6;

    for attempt in 0..MAX_ATTEMPTS {
        match session.use_keyspace(keyspace, false).await {
            Ok(_) => {
                debug!("Selected keyspace '{}' (attempt {})", keyspace, attempt + 1);
                return Ok(());
            }
            Err(err) => {
                warn!(
                    "Attempt {} to select keyspace '{}' for {} failed: {}",
                    attempt + 1,
                    keyspace,
                    display_path,
                    err
                );
                if attempt + 1 == MAX_ATTEMPTS {
                    return Err(DbError::MigrationError(format!(
                        "Failed to select keyspace '{}' for {}: {}",
                        keyspace, display_path, err
                    )));
                }
                if let Err(refresh_err) = session.refresh_metadata().await {
                    warn!("Metadata refresh failed: {}", refresh_err);
                }
                sleep(Duration::from_millis(250 * (attempt as u64 + 1))).await;
            }
        }
    }

    Err(DbError::MigrationError(format!(
        "Unable to select keyspace '{}' after {} attempts",
        keyspace, MAX_ATTEMPTS
    )))
}
