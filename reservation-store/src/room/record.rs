//! Encoding of rooms as backend hashes.
//!
//! A room record always carries `booked` (`"0"` or `"1"`). While booked it also carries the
//! guest's `name` and the `start_date` and `end_date` of the stay as `YYYY-MM-DD`.

use crate::backend::Fields;
use crate::reservation::error::ReservationError;
use crate::room::key::RoomKey;
use crate::room::model::{Reservation, Room, RoomStatus};
use chrono::NaiveDate;

pub const BOOKED: &str = "booked";
pub const NAME: &str = "name";
pub const START_DATE: &str = "start_date";
pub const END_DATE: &str = "end_date";

const FREE_VALUE: &str = "0";
const BOOKED_VALUE: &str = "1";
const DATE_FORMAT: &str = "%Y-%m-%d";

impl RoomStatus {
	pub(crate) fn encode(self) -> &'static str {
		match self {
			RoomStatus::Free => FREE_VALUE,
			RoomStatus::Booked => BOOKED_VALUE,
		}
	}
}

/// Decode the `booked` field, `None` means the room doesn't exist.
pub fn decode_status(key: &RoomKey, booked: Option<&str>) -> Result<Option<RoomStatus>, ReservationError> {
	match booked {
		None => Ok(None),
		Some(FREE_VALUE) => Ok(Some(RoomStatus::Free)),
		Some(BOOKED_VALUE) => Ok(Some(RoomStatus::Booked)),
		Some(other) => Err(corrupt(key, format!("invalid booked status {other:?}"))),
	}
}

pub fn free_fields() -> Fields {
	Fields::from([(BOOKED.to_owned(), RoomStatus::Free.encode().to_owned())])
}

pub fn booked_fields(reservation: &Reservation) -> Fields {
	Fields::from([
		(BOOKED.to_owned(), RoomStatus::Booked.encode().to_owned()),
		(NAME.to_owned(), reservation.guest_name().to_owned()),
		(
			START_DATE.to_owned(),
			reservation.start_date().format(DATE_FORMAT).to_string(),
		),
		(END_DATE.to_owned(), reservation.end_date().format(DATE_FORMAT).to_string()),
	])
}

/// Decode a room record. Guest fields of a free room are ignored.
pub fn decode_room(key: &RoomKey, fields: &Fields) -> Result<Room, ReservationError> {
	let status = decode_status(key, fields.get(BOOKED).map(String::as_str))?
		.ok_or_else(|| corrupt(key, format!("missing {BOOKED} field")))?;

	let reservation = match status {
		RoomStatus::Free => None,
		RoomStatus::Booked => {
			let field = |name: &str| {
				fields
					.get(name)
					.map(String::as_str)
					.ok_or_else(|| corrupt(key, format!("booked room without {name} field")))
			};
			let start_date = parse_date(key, field(START_DATE)?)?;
			let end_date = parse_date(key, field(END_DATE)?)?;
			let reservation = Reservation::new(field(NAME)?, start_date, end_date)
				.map_err(|error| corrupt(key, error.to_string()))?;
			Some(reservation)
		}
	};

	Ok(Room {
		room_id: key.room_id(),
		reservation,
	})
}

/// Parse a stored date, accepting only the canonical `YYYY-MM-DD` form.
pub fn parse_date(key: &RoomKey, text: &str) -> Result<NaiveDate, ReservationError> {
	NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|error| corrupt(key, format!("invalid date {text:?}: {error}")))
}

fn corrupt(key: &RoomKey, reason: String) -> ReservationError {
	ReservationError::CorruptRecord {
		key: key.to_string(),
		reason,
	}
}
