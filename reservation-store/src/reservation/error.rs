use crate::backend::error::BackendError;
use crate::room::key::RoomKey;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReservationError {
	#[error("Room {0} is already booked.")]
	AlreadyBooked(RoomKey),
	#[error("Room {0} isn't booked.")]
	NotBooked(RoomKey),
	#[error("Room {0} doesn't exist.")]
	RoomNotFound(RoomKey),
	#[error("Room {0} was modified concurrently, nothing was written.")]
	Aborted(RoomKey),
	#[error("Gave up on room {key} after {limit} attempts lost against concurrent modifications.")]
	AttemptsExhausted { key: RoomKey, limit: u32 },
	#[error("Guest name was empty or whitespace-only.")]
	EmptyGuestName,
	#[error("Guest name is too long. (>256 bytes UTF-8)")]
	GuestNameTooLong,
	#[error("Stay has to end after it starts, got {start_date} to {end_date}.")]
	InvalidStay { start_date: NaiveDate, end_date: NaiveDate },
	#[error("Record {key} is corrupt: {reason}")]
	CorruptRecord { key: String, reason: String },
	#[error("Backend unavailable: {0}")]
	BackendUnavailable(#[from] BackendError),
}

impl ReservationError {
	/// Whether running the same operation again can succeed without anything else changing.
	pub fn is_retryable(&self) -> bool {
		matches!(self, ReservationError::Aborted(_))
	}
}
