use anyhow::Context;

/// Type erased error that works for all kinds of backend implementations
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
	#[error("Connection error: {0}")]
	Connection(anyhow::Error),
	#[error("Backend error: {0}")]
	Backend(anyhow::Error),
	#[error("Encoding values: {0}")]
	Encode(anyhow::Error),
	#[error("Decoding values: {0}")]
	Decode(anyhow::Error),
	#[error("Migration error: {0}")]
	Migration(anyhow::Error),
	#[error("Timeout: {0}")]
	Timeout(anyhow::Error),
}

pub trait IntoBackendResult<Ok>: Sized {
	fn connection_error(self, context: &'static str) -> Result<Ok, BackendError>;
}

impl<Ok, Error> IntoBackendResult<Ok> for Result<Ok, Error>
where
	Error: std::error::Error + Send + Sync + 'static,
{
	fn connection_error(self, context: &'static str) -> Result<Ok, BackendError> {
		self.context(context).map_err(BackendError::Connection)
	}
}
