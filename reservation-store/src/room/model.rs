use crate::reservation::error::ReservationError;
use crate::room::key::RoomId;
use chrono::NaiveDate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoomStatus {
	Free,
	Booked,
}

/// A guest's stay, validated on construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reservation {
	guest_name: String,
	start_date: NaiveDate,
	end_date: NaiveDate,
}

impl Reservation {
	pub const MAX_GUEST_NAME_LENGTH: usize = 256;

	pub fn new(
		guest_name: impl Into<String>,
		start_date: NaiveDate,
		end_date: NaiveDate,
	) -> Result<Self, ReservationError> {
		let guest_name = guest_name.into();
		if guest_name.trim().is_empty() {
			return Err(ReservationError::EmptyGuestName);
		}

		if guest_name.len() > Self::MAX_GUEST_NAME_LENGTH {
			return Err(ReservationError::GuestNameTooLong);
		}

		// The end date is the checkout day, so a stay needs at least one night.
		if end_date <= start_date {
			return Err(ReservationError::InvalidStay { start_date, end_date });
		}

		Ok(Self {
			guest_name,
			start_date,
			end_date,
		})
	}

	pub fn guest_name(&self) -> &str {
		&self.guest_name
	}

	pub fn start_date(&self) -> NaiveDate {
		self.start_date
	}

	pub fn end_date(&self) -> NaiveDate {
		self.end_date
	}

	pub fn nights(&self) -> i64 {
		(self.end_date - self.start_date).num_days()
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Room {
	pub room_id: RoomId,
	/// Only present while the room is booked.
	pub reservation: Option<Reservation>,
}

impl Room {
	pub fn status(&self) -> RoomStatus {
		match self.reservation {
			Some(_) => RoomStatus::Booked,
			None => RoomStatus::Free,
		}
	}
}
