use crate::backend::error::{BackendError, IntoBackendResult};
use crate::backend::libsql::pool::{LibSqlManager, LibSqlPool};
use crate::backend::{Backend, CommitOutcome, Fields, Watch, Write};
use async_trait::async_trait;
use deadpool::managed::{Object, PoolError};
use libsql::{TransactionBehavior, params};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

mod migration;
mod pool;
#[cfg(test)]
pub mod test_utils;

/// Backend on a local libsql database.
///
/// Every key is a row in `record` carrying a version that changes with every mutation,
/// its fields live in `record_field`.
pub struct LibSqlBackend {
	pool: LibSqlPool,
}

impl LibSqlBackend {
	/// Open (or create) the database at `path` and apply pending migrations.
	/// `":memory:"` gives a throwaway database, which only makes sense with a `pool_size` of 1.
	pub async fn open(path: impl AsRef<Path>, pool_size: usize) -> Result<Self, BackendError> {
		let path = path.as_ref();
		let database = libsql::Builder::new_local(path)
			.build()
			.await
			.connection_error("Failed to open libsql database")?;
		let pool = LibSqlPool::builder(LibSqlManager::new(database))
			.max_size(pool_size)
			.build()
			.connection_error("Failed to build connection pool")?;

		let backend = Self { pool };
		backend.migrate().await?;

		info!(path = %path.display(), pool_size, "Opened libsql backend");
		Ok(backend)
	}

	async fn migrate(&self) -> Result<(), BackendError> {
		let connection = self.pool.get().await?;
		migration::run_migrations(&connection).await
	}
}

#[async_trait]
impl Backend for LibSqlBackend {
	async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, BackendError> {
		let connection = self.pool.get().await?;
		query_field(&connection, key, field).await
	}

	async fn get_all(&self, key: &str) -> Result<Fields, BackendError> {
		let connection = self.pool.get().await?;

		let mut rows = connection
			.query(
				r"SELECT field, value
				FROM record_field
				WHERE key = ?1",
				params![key],
			)
			.await?;

		let mut fields = Fields::new();
		while let Some(row) = rows.next().await? {
			fields.insert(row.get::<String>(0)?, row.get::<String>(1)?);
		}
		Ok(fields)
	}

	async fn set_fields(&self, key: &str, fields: Fields) -> Result<(), BackendError> {
		if fields.is_empty() {
			return Ok(());
		}

		let connection = self.pool.get().await?;
		let transaction = begin_immediate(&connection).await?;
		upsert_fields(&transaction, key, &fields).await?;
		touch(&transaction, key).await?;
		transaction.commit().await?;
		Ok(())
	}

	async fn set_field_if_absent(&self, key: &str, field: &str, value: &str) -> Result<bool, BackendError> {
		let connection = self.pool.get().await?;
		let transaction = begin_immediate(&connection).await?;

		let inserted = transaction
			.execute(
				r"INSERT INTO record_field(key, field, value) VALUES (?1, ?2, ?3)
				ON CONFLICT(key, field) DO NOTHING",
				params![key, field, value],
			)
			.await?;
		if inserted > 0 {
			touch(&transaction, key).await?;
		}

		transaction.commit().await?;
		Ok(inserted > 0)
	}

	async fn delete_fields(&self, key: &str, fields: &[&str]) -> Result<(), BackendError> {
		let connection = self.pool.get().await?;
		let transaction = begin_immediate(&connection).await?;

		let mut deleted = 0;
		for field in fields {
			deleted += delete_field(&transaction, key, field).await?;
		}
		if deleted > 0 {
			touch(&transaction, key).await?;
			remove_if_empty(&transaction, key).await?;
		}

		transaction.commit().await?;
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), BackendError> {
		let connection = self.pool.get().await?;
		let transaction = begin_immediate(&connection).await?;
		clear_fields(&transaction, key).await?;
		remove_if_empty(&transaction, key).await?;
		transaction.commit().await?;
		Ok(())
	}

	async fn watch<'backend>(&'backend self, key: &str) -> Result<Box<dyn Watch + 'backend>, BackendError> {
		let connection = self.pool.get().await?;
		let version = query_version(&connection, key).await?;

		Ok(Box::new(LibSqlWatch {
			connection,
			key: key.to_owned(),
			version,
		}))
	}

	async fn close(&self) {
		self.pool.close();
	}
}

/// Holds on to its pooled connection until committed or dropped.
struct LibSqlWatch {
	connection: Object<LibSqlManager>,
	key: String,
	version: Option<String>,
}

#[async_trait]
impl Watch for LibSqlWatch {
	fn key(&self) -> &str {
		&self.key
	}

	async fn get_field(&self, field: &str) -> Result<Option<String>, BackendError> {
		query_field(&self.connection, &self.key, field).await
	}

	async fn commit(self: Box<Self>, writes: Vec<Write>) -> Result<CommitOutcome, BackendError> {
		let LibSqlWatch {
			connection,
			key,
			version,
		} = *self;

		let transaction = begin_immediate(&connection).await?;

		// Claiming the key is a single conditional statement, so no other writer can slip in
		// between the comparison and the update.
		let claimed = match version {
			Some(version) => {
				transaction
					.execute(
						r"UPDATE record SET version = ?1 WHERE key = ?2 AND version = ?3",
						params![new_version(), key.as_str(), version],
					)
					.await?
			}
			None => {
				transaction
					.execute(
						r"INSERT INTO record(key, version) VALUES (?1, ?2)
						ON CONFLICT(key) DO NOTHING",
						params![key.as_str(), new_version()],
					)
					.await?
			}
		};
		if claimed == 0 {
			transaction.rollback().await?;
			return Ok(CommitOutcome::Aborted);
		}

		for write in writes {
			match write {
				Write::SetFields(fields) => upsert_fields(&transaction, &key, &fields).await?,
				Write::DeleteFields(fields) => {
					for field in fields {
						delete_field(&transaction, &key, &field).await?;
					}
				}
				Write::Delete => clear_fields(&transaction, &key).await?,
			}
		}
		remove_if_empty(&transaction, &key).await?;

		transaction.commit().await?;
		Ok(CommitOutcome::Committed)
	}
}

/// Takes the write lock right away, so waiting for other writers is left to the busy timeout.
async fn begin_immediate(connection: &libsql::Connection) -> Result<libsql::Transaction, BackendError> {
	connection
		.transaction_with_behavior(TransactionBehavior::Immediate)
		.await
		.map_err(Into::into)
}

fn new_version() -> String {
	Uuid::new_v4().to_string()
}

async fn query_field(connection: &libsql::Connection, key: &str, field: &str) -> Result<Option<String>, BackendError> {
	let mut rows = connection
		.query(
			r"SELECT value FROM record_field WHERE key = ?1 AND field = ?2",
			params![key, field],
		)
		.await?;

	let Some(row) = rows.next().await? else {
		return Ok(None);
	};
	Ok(Some(row.get::<String>(0)?))
}

async fn query_version(connection: &libsql::Connection, key: &str) -> Result<Option<String>, BackendError> {
	let mut rows = connection
		.query(r"SELECT version FROM record WHERE key = ?1", params![key])
		.await?;

	let Some(row) = rows.next().await? else {
		return Ok(None);
	};
	Ok(Some(row.get::<String>(0)?))
}

async fn upsert_fields(connection: &libsql::Connection, key: &str, fields: &Fields) -> Result<(), BackendError> {
	for (field, value) in fields {
		connection
			.execute(
				r"INSERT INTO record_field(key, field, value) VALUES (?1, ?2, ?3)
				ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
				params![key, field.as_str(), value.as_str()],
			)
			.await?;
	}
	Ok(())
}

async fn delete_field(connection: &libsql::Connection, key: &str, field: &str) -> Result<u64, BackendError> {
	connection
		.execute(
			r"DELETE FROM record_field WHERE key = ?1 AND field = ?2",
			params![key, field],
		)
		.await
		.map_err(Into::into)
}

async fn clear_fields(connection: &libsql::Connection, key: &str) -> Result<(), BackendError> {
	connection
		.execute(r"DELETE FROM record_field WHERE key = ?1", params![key])
		.await?;
	Ok(())
}

/// Give the key a fresh version, creating its `record` row if necessary.
async fn touch(connection: &libsql::Connection, key: &str) -> Result<(), BackendError> {
	connection
		.execute(
			r"INSERT INTO record(key, version) VALUES (?1, ?2)
			ON CONFLICT(key) DO UPDATE SET version = excluded.version",
			params![key, new_version()],
		)
		.await?;
	Ok(())
}

async fn remove_if_empty(connection: &libsql::Connection, key: &str) -> Result<(), BackendError> {
	connection
		.execute(
			r"DELETE FROM record
			WHERE key = ?1
				AND NOT EXISTS (SELECT 1 FROM record_field WHERE record_field.key = ?1)",
			params![key],
		)
		.await?;
	Ok(())
}

impl From<PoolError<libsql::Error>> for BackendError {
	fn from(pool_error: PoolError<libsql::Error>) -> Self {
		match pool_error {
			PoolError::Timeout(_) => Self::Timeout(pool_error.into()),
			PoolError::Backend(error) => error.into(),
			PoolError::Closed | PoolError::NoRuntimeSpecified | PoolError::PostCreateHook(_) => {
				Self::Connection(pool_error.into())
			}
		}
	}
}

impl From<libsql::Error> for BackendError {
	fn from(error: libsql::Error) -> Self {
		use libsql::Error as LibSqlError;
		match error {
			LibSqlError::ToSqlConversionFailure(_) => Self::Encode(error.into()),
			LibSqlError::InvalidColumnIndex | LibSqlError::InvalidColumnType => Self::Decode(error.into()),
			LibSqlError::ConnectionFailed(_)
			| LibSqlError::InvalidUTF8Path
			| LibSqlError::InvalidParserState(_)
			| LibSqlError::InvalidTlsConfiguration(_) => Self::Connection(error.into()),
			_ => Self::Backend(error.into()),
		}
	}
}
