use crate::backend::error::BackendError;
use crate::configuration::ConfigurationError;
use crate::reservation::error::ReservationError;
use crate::seed::SeedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApplicationError {
	#[error("Failed to load configuration: {0}")]
	Configuration(#[from] ConfigurationError),
	#[error("Failed to parse commandline: {0}")]
	Commandline(#[from] clap::Error),
	#[error("Invalid log filters: {0}")]
	LogFilters(#[from] tracing_subscriber::filter::ParseError),
	#[error("Failed to load seed file: {0}")]
	Seed(#[from] SeedError),
	#[error("No seed file configured.")]
	MissingSeedFile,
	#[error("Failed to open backend: {0}")]
	Backend(#[from] BackendError),
	#[error("{0}")]
	Reservation(#[from] ReservationError),
}
