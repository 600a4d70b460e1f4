use crate::backend::Backend;
use crate::backend::libsql::LibSqlBackend;
use crate::backend::memory::MemoryBackend;
use crate::configuration::{BackendConfiguration, Configuration};
use crate::error::ApplicationError;
use crate::reservation::ReservationStore;
use crate::seed::Seed;
use std::sync::Arc;
use tracing::info;

pub struct ApplicationContext {
	pub configuration: Configuration,
	pub store: ReservationStore,
}

impl ApplicationContext {
	/// Open the configured backend. An in-memory backend starts out with the seed file's rooms,
	/// as it has no other way of knowing about any.
	pub async fn open(configuration: Configuration) -> Result<ApplicationContext, ApplicationError> {
		let backend: Arc<dyn Backend> = match &configuration.backend {
			BackendConfiguration::Memory => Arc::new(MemoryBackend::default()),
			BackendConfiguration::Libsql { path, pool_size } => Arc::new(LibSqlBackend::open(path, *pool_size).await?),
		};
		let store = ReservationStore::new(backend);

		let context = Self { configuration, store };
		if context.configuration.backend == BackendConfiguration::Memory && context.configuration.seed_file.is_some() {
			context.seed().await?;
		}

		info!(tenant = %context.configuration.tenant, "Opened reservation store");
		Ok(context)
	}

	/// Write the rooms of the configured seed file for the configured tenant.
	pub async fn seed(&self) -> Result<(), ApplicationError> {
		let path = self
			.configuration
			.seed_file
			.as_ref()
			.ok_or(ApplicationError::MissingSeedFile)?;
		let seed = Seed::from_file(path)?;

		self.store.seed(&self.configuration.tenant, &seed).await?;
		Ok(())
	}

	pub async fn close(self) {
		self.store.close().await;
		info!("Closed reservation store");
	}
}
