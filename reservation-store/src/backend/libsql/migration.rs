use crate::backend::error::BackendError;
use libsql::params;
use rust_embed::RustEmbed;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/migrations"]
struct Migrations;

/// Apply all embedded migrations that weren't applied yet, in file name order.
pub async fn run_migrations(connection: &libsql::Connection) -> Result<(), BackendError> {
	let migrations = Migrations::iter()
		.filter_map(|file_name| Migrations::get(&file_name).map(|file| (file_name, file)))
		.collect::<BTreeMap<_, _>>();

	let transaction = connection.transaction().await?;
	transaction
		.execute(r"CREATE TABLE IF NOT EXISTS migration (name TEXT PRIMARY KEY NOT NULL)", ())
		.await?;

	for (file_name, migration) in migrations {
		let newly_recorded = transaction
			.execute(
				r"INSERT INTO migration(name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
				params![file_name.to_string()],
			)
			.await?;
		if newly_recorded == 0 {
			continue;
		}

		let sql = std::str::from_utf8(migration.data.as_ref()).map_err(|error| BackendError::Migration(error.into()))?;
		debug!(migration = %file_name, "Applying migration");
		transaction.execute_batch(sql).await?;
	}
	transaction.commit().await?;

	Ok(())
}
