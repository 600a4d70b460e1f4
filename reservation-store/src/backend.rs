use crate::backend::error::BackendError;
use async_trait::async_trait;
use static_assertions::assert_obj_safe;
use std::collections::BTreeMap;

pub mod error;
pub mod libsql;
pub mod memory;


/// Field name to value mapping of a single key. An empty mapping means the key doesn't exist.
pub type Fields = BTreeMap<String, String>;

/// The narrow key-value interface the reservation store is built on.
///
/// Every key holds a hash of text fields. Mutations through this trait are unconditional,
/// conditional read-modify-write cycles go through [`Backend::watch`].
#[async_trait]
pub trait Backend: Send + Sync {
	async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, BackendError>;
	async fn get_all(&self, key: &str) -> Result<Fields, BackendError>;

	async fn set_fields(&self, key: &str, fields: Fields) -> Result<(), BackendError>;
	/// Returns `true` if the field was written, `false` if it already existed.
	async fn set_field_if_absent(&self, key: &str, field: &str, value: &str) -> Result<bool, BackendError>;

	/// A key that is left without fields ceases to exist.
	async fn delete_fields(&self, key: &str, fields: &[&str]) -> Result<(), BackendError>;
	async fn delete(&self, key: &str) -> Result<(), BackendError>;

	/// Start an optimistic transaction on `key`.
	///
	/// Any modification of the key between this call and [`Watch::commit`] makes the commit abort.
	async fn watch<'backend>(&'backend self, key: &str) -> Result<Box<dyn Watch + 'backend>, BackendError>;

	async fn close(&self);
}

assert_obj_safe!(Backend);

#[async_trait]
pub trait Watch: Send + Sync {
	fn key(&self) -> &str;

	async fn get_field(&self, field: &str) -> Result<Option<String>, BackendError>;

	/// Apply `writes` in order, all or nothing, if the watched key is unmodified.
	async fn commit(self: Box<Self>, writes: Vec<Write>) -> Result<CommitOutcome, BackendError>;
}

assert_obj_safe!(Watch);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Write {
	SetFields(Fields),
	DeleteFields(Vec<String>),
	Delete,
}

impl Write {
	/// Apply this write to the fields of a key.
	pub fn apply(self, fields: &mut Fields) {
		match self {
			Write::SetFields(new_fields) => fields.extend(new_fields),
			Write::DeleteFields(names) => {
				for name in names {
					fields.remove(&name);
				}
			}
			Write::Delete => fields.clear(),
		}
	}
}

#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
	Committed,
	/// The watched key was modified concurrently, nothing was written.
	Aborted,
}

#[cfg(test)]
pub(crate) mod test {
	use crate::backend::Backend;
	use std::sync::Arc;
	use tempfile::TempDir;

	pub type DefaultTestFactory = crate::backend::memory::test_utils::MemoryTestFactory;

	pub trait TestFactory {
		async fn backend() -> TestBackend;
	}

	/// Keeps on-disk test databases alive for as long as the backend is used.
	#[derive(derive_more::Deref)]
	pub struct TestBackend {
		#[deref]
		backend: Arc<dyn Backend>,
		_directory: Option<TempDir>,
	}

	impl TestBackend {
		pub fn new(backend: Arc<dyn Backend>) -> Self {
			Self {
				backend,
				_directory: None,
			}
		}

		pub fn in_directory(backend: Arc<dyn Backend>, directory: TempDir) -> Self {
			Self {
				backend,
				_directory: Some(directory),
			}
		}

		pub fn shared(&self) -> Arc<dyn Backend> {
			Arc::clone(&self.backend)
		}
	}
}
