use crate::backend::memory::MemoryBackend;
use crate::backend::test::{TestBackend, TestFactory};
use std::sync::Arc;

pub struct MemoryTestFactory;

impl TestFactory for MemoryTestFactory {
	async fn backend() -> TestBackend {
		TestBackend::new(Arc::new(MemoryBackend::default()))
	}
}
