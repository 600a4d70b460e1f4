use crate::backend::Fields;
use crate::room::key::RoomId;
use crate::room::model::RoomStatus;
use crate::room::record;
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::Path;
use thiserror::Error;

/// Initial rooms of a tenant, read from TOML:
///
/// ```toml
/// [[room]]
/// room_id = 201
///
/// [room.reservation]
/// booked = "1"
/// name = "Ada Lovelace"
/// start_date = "2019-08-01"
/// end_date = "2019-08-15"
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Seed {
	#[serde(default, rename = "room")]
	pub rooms: Vec<SeedRoom>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SeedRoom {
	pub room_id: RoomId,
	/// Raw record fields. Without a `booked` field the room is seeded free.
	#[serde(default)]
	pub reservation: Fields,
}

impl SeedRoom {
	pub fn fields(&self) -> Fields {
		let mut fields = self.reservation.clone();
		fields
			.entry(record::BOOKED.to_owned())
			.or_insert_with(|| RoomStatus::Free.encode().to_owned());
		fields
	}
}

impl Seed {
	pub fn from_file(path: impl AsRef<Path>) -> Result<Seed, SeedError> {
		let text = read_to_string(path)?;

		Ok(Seed::try_from(text.as_str())?)
	}
}

impl TryFrom<&str> for Seed {
	type Error = toml::de::Error;

	fn try_from(text: &str) -> Result<Self, Self::Error> {
		toml::from_str(text)
	}
}

#[derive(Error, Debug)]
pub enum SeedError {
	#[error("Failed to deserialize with error: {0}")]
	DeserializationError(#[from] toml::de::Error),
	#[error("IO operation failed: {0}")]
	IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn should_deserialize_seed_file() {
		const SEED_FILE_PATH: &str = "seed.toml";

		let seed = Seed::from_file(SEED_FILE_PATH).expect("Failed to read seed file");

		let room_ids = seed.rooms.iter().map(|room| u32::from(room.room_id)).collect::<Vec<_>>();
		assert_eq!(vec![101, 103, 104, 201], room_ids);
		assert_eq!(
			Some("Ada Lovelace"),
			seed.rooms[3].reservation.get("name").map(String::as_str)
		);
	}

	#[test]
	fn rooms_without_status_are_seeded_free() {
		let seed = Seed::try_from("[[room]]\nroom_id = 7").expect("Failed to deserialize");

		let fields = seed.rooms[0].fields();

		assert_eq!(Some("0"), fields.get("booked").map(String::as_str));
		assert_eq!(1, fields.len());
	}

	#[test]
	fn empty_seed_has_no_rooms() {
		let seed = Seed::try_from("").expect("Failed to deserialize");

		assert!(seed.rooms.is_empty());
	}

	#[test]
	fn should_reject_unknown_keys() {
		assert!(Seed::try_from("[[room]]\nroom_id = 7\nfloor = 1").is_err());
	}
}
