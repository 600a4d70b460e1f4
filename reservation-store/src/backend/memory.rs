use crate::backend::error::BackendError;
use crate::backend::{Backend, CommitOutcome, Fields, Watch, Write};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::Relaxed;

#[cfg(test)]
pub mod test_utils;

/// In-process backend. Keys are sharded by `DashMap`, so operations on different rooms
/// rarely contend.
#[derive(Default)]
pub struct MemoryBackend {
	records: DashMap<String, Record>,
	versions: VersionSequence,
}

struct Record {
	version: u64,
	fields: Fields,
}

/// Hands out a fresh version for every mutation. Versions are never reused, so a key that was
/// deleted and created again doesn't look unmodified to a watcher.
#[derive(Default)]
struct VersionSequence {
	next_version: AtomicU64,
}

impl VersionSequence {
	fn next(&self) -> u64 {
		// Relaxed is enough, only uniqueness of the values matters.
		self.next_version.fetch_add(1, Relaxed)
	}
}

impl MemoryBackend {
	/// Store `fields` under the entry, or remove the entry if nothing is left.
	fn store(&self, entry: Entry<'_, String, Record>, fields: Fields) {
		match entry {
			Entry::Occupied(occupied) if fields.is_empty() => {
				occupied.remove();
			}
			Entry::Occupied(mut occupied) => {
				*occupied.get_mut() = Record {
					version: self.versions.next(),
					fields,
				};
			}
			Entry::Vacant(_) if fields.is_empty() => {}
			Entry::Vacant(vacant) => {
				vacant.insert(Record {
					version: self.versions.next(),
					fields,
				});
			}
		}
	}

	fn current_fields(entry: &Entry<'_, String, Record>) -> Fields {
		match entry {
			Entry::Occupied(occupied) => occupied.get().fields.clone(),
			Entry::Vacant(_) => Fields::new(),
		}
	}
}

#[async_trait]
impl Backend for MemoryBackend {
	async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>, BackendError> {
		Ok(self
			.records
			.get(key)
			.and_then(|record| record.fields.get(field).cloned()))
	}

	async fn get_all(&self, key: &str) -> Result<Fields, BackendError> {
		Ok(self.records.get(key).map(|record| record.fields.clone()).unwrap_or_default())
	}

	async fn set_fields(&self, key: &str, fields: Fields) -> Result<(), BackendError> {
		if fields.is_empty() {
			return Ok(());
		}

		let entry = self.records.entry(key.to_owned());
		let mut current = Self::current_fields(&entry);
		current.extend(fields);
		self.store(entry, current);
		Ok(())
	}

	async fn set_field_if_absent(&self, key: &str, field: &str, value: &str) -> Result<bool, BackendError> {
		let entry = self.records.entry(key.to_owned());
		let mut current = Self::current_fields(&entry);
		if current.contains_key(field) {
			return Ok(false);
		}

		current.insert(field.to_owned(), value.to_owned());
		self.store(entry, current);
		Ok(true)
	}

	async fn delete_fields(&self, key: &str, fields: &[&str]) -> Result<(), BackendError> {
		let Entry::Occupied(occupied) = self.records.entry(key.to_owned()) else {
			return Ok(());
		};

		let mut current = occupied.get().fields.clone();
		let mut modified = false;
		for field in fields {
			modified |= current.remove(*field).is_some();
		}
		if modified {
			self.store(Entry::Occupied(occupied), current);
		}
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), BackendError> {
		self.records.remove(key);
		Ok(())
	}

	async fn watch<'backend>(&'backend self, key: &str) -> Result<Box<dyn Watch + 'backend>, BackendError> {
		let version = self.records.get(key).map(|record| record.version);
		Ok(Box::new(MemoryWatch {
			backend: self,
			key: key.to_owned(),
			version,
		}))
	}

	async fn close(&self) {}
}

struct MemoryWatch<'backend> {
	backend: &'backend MemoryBackend,
	key: String,
	/// Version at the start of the watch, `None` if the key didn't exist.
	version: Option<u64>,
}

#[async_trait]
impl Watch for MemoryWatch<'_> {
	fn key(&self) -> &str {
		&self.key
	}

	async fn get_field(&self, field: &str) -> Result<Option<String>, BackendError> {
		self.backend.get_field(&self.key, field).await
	}

	async fn commit(self: Box<Self>, writes: Vec<Write>) -> Result<CommitOutcome, BackendError> {
		let MemoryWatch { backend, key, version } = *self;

		// The entry keeps the shard locked, comparing and applying can't interleave with other writers.
		let entry = backend.records.entry(key);
		let current_version = match &entry {
			Entry::Occupied(occupied) => Some(occupied.get().version),
			Entry::Vacant(_) => None,
		};
		if current_version != version {
			return Ok(CommitOutcome::Aborted);
		}

		let mut fields = MemoryBackend::current_fields(&entry);
		for write in writes {
			write.apply(&mut fields);
		}
		backend.store(entry, fields);

		Ok(CommitOutcome::Committed)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn version_sequence_should_count() {
		let sequence = VersionSequence::default();
		assert_eq!(0, sequence.next());
		assert_eq!(1, sequence.next());
		assert_eq!(2, sequence.next());
	}

	#[tokio::test]
	async fn every_mutation_bumps_the_version() {
		let backend = MemoryBackend::default();
		let version = |backend: &MemoryBackend| backend.records.get("key").map(|record| record.version);

		backend
			.set_fields("key", Fields::from([("a".to_owned(), "1".to_owned())]))
			.await
			.expect("Failed to set fields");
		let first = version(&backend);

		backend
			.set_field_if_absent("key", "b", "2")
			.await
			.expect("Failed to set field");
		let second = version(&backend);

		assert!(first.is_some());
		assert_ne!(first, second);
	}

	#[tokio::test]
	async fn noop_mutations_keep_the_version() {
		let backend = MemoryBackend::default();
		backend
			.set_field_if_absent("key", "a", "1")
			.await
			.expect("Failed to set field");
		let before = backend.records.get("key").map(|record| record.version);

		let written = backend
			.set_field_if_absent("key", "a", "2")
			.await
			.expect("Failed to set field");
		backend
			.delete_fields("key", &["missing"])
			.await
			.expect("Failed to delete fields");

		assert!(!written);
		assert_eq!(before, backend.records.get("key").map(|record| record.version));
	}
}
