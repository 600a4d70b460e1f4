use deadpool::managed::{Manager, Metrics, Object, Pool, RecycleError, RecycleResult};

pub type LibSqlPool = Pool<LibSqlManager, Object<LibSqlManager>>;

/// How long a connection waits for another connection's write lock before giving up.
const BUSY_TIMEOUT_MILLISECONDS: i64 = 5_000;

pub struct LibSqlManager {
	database: libsql::Database,
}

impl LibSqlManager {
	pub fn new(database: libsql::Database) -> Self {
		Self { database }
	}
}

impl Manager for LibSqlManager {
	type Type = libsql::Connection;
	type Error = libsql::Error;

	async fn create(&self) -> Result<Self::Type, Self::Error> {
		let connection = self.database.connect()?;

		// The pragma only takes effect once its row has been stepped through.
		let mut rows = connection
			.query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MILLISECONDS}"), ())
			.await?;
		rows.next().await?;

		Ok(connection)
	}

	async fn recycle(&self, connection: &mut Self::Type, _metrics: &Metrics) -> RecycleResult<Self::Error> {
		let mut rows = connection.query("SELECT 1", ()).await?;
		let Some(first) = rows.next().await? else {
			return Err(RecycleError::Message("Ping query returned zero results".into()));
		};

		let value = first.get::<i64>(0).map_err(RecycleError::Backend)?;
		if value != 1 {
			return Err(RecycleError::Message("Ping query returned unexpected result".into()));
		}

		let None = rows.next().await? else {
			return Err(RecycleError::Message("Ping query returned more than one result".into()));
		};

		Ok(())
	}
}
