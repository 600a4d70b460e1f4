use crate::backend::libsql::LibSqlBackend;
use crate::backend::test::{TestBackend, TestFactory};
use std::sync::Arc;
use tempfile::TempDir;

/// Several connections need to see the same database, so it has to live in a file.
const POOL_SIZE: usize = 4;

pub struct LibSqlTestFactory;

impl TestFactory for LibSqlTestFactory {
	async fn backend() -> TestBackend {
		let directory = TempDir::new().expect("Failed to create temporary directory");
		let backend = LibSqlBackend::open(directory.path().join("reservations.db"), POOL_SIZE)
			.await
			.expect("Failed to open libsql backend");

		TestBackend::in_directory(Arc::new(backend), directory)
	}
}
