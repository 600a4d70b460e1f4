use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

/// Namespace of all keys belonging to one hotel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Deref)]
#[serde(transparent)]
pub struct Tenant {
	#[deref]
	name: String,
}

impl From<String> for Tenant {
	fn from(name: String) -> Self {
		Self { name }
	}
}

impl From<&str> for Tenant {
	fn from(name: &str) -> Self {
		name.to_owned().into()
	}
}

impl Display for Tenant {
	fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
		formatter.write_str(&self.name)
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RoomId {
	id: u32,
}

impl From<u32> for RoomId {
	fn from(id: u32) -> Self {
		RoomId { id }
	}
}

impl From<RoomId> for u32 {
	fn from(room_id: RoomId) -> Self {
		room_id.id
	}
}

impl FromStr for RoomId {
	type Err = ParseIntError;

	fn from_str(text: &str) -> Result<Self, Self::Err> {
		text.parse::<u32>().map(RoomId::from)
	}
}

impl Display for RoomId {
	fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
		write!(formatter, "{}", self.id)
	}
}

/// Backend key of a room record: `{tenant}:room:{room_id}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoomKey {
	room_id: RoomId,
	key: String,
}

impl RoomKey {
	pub fn new(tenant: &Tenant, room_id: RoomId) -> Self {
		Self {
			room_id,
			key: format!("{tenant}:room:{room_id}"),
		}
	}

	/// Key of the hash whose fields are the ids of every room of `tenant`.
	pub fn index_key(tenant: &Tenant) -> String {
		format!("{tenant}:rooms")
	}

	pub fn room_id(&self) -> RoomId {
		self.room_id
	}

	pub fn as_str(&self) -> &str {
		&self.key
	}
}

impl Display for RoomKey {
	fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
		formatter.write_str(&self.key)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn room_key_should_be_namespaced_by_tenant() {
		let key = RoomKey::new(&Tenant::from("trivago"), RoomId::from(103));

		assert_eq!("trivago:room:103", key.as_str());
		assert_eq!("trivago:room:103", key.to_string());
		assert_eq!(RoomId::from(103), key.room_id());
	}

	#[test]
	fn tenants_dont_share_keys() {
		let room_id = RoomId::from(1);

		assert_ne!(
			RoomKey::new(&Tenant::from("a"), room_id),
			RoomKey::new(&Tenant::from("b"), room_id)
		);
		assert_ne!(
			RoomKey::index_key(&Tenant::from("a")),
			RoomKey::index_key(&Tenant::from("b"))
		);
	}

	#[test]
	fn index_key_doesnt_collide_with_room_keys() {
		let tenant = Tenant::from("trivago");
		assert_eq!("trivago:rooms", RoomKey::index_key(&tenant));
	}

	#[test]
	fn room_id_should_parse_from_text() {
		assert_eq!(Ok(RoomId::from(42)), "42".parse::<RoomId>());
		assert!("-1".parse::<RoomId>().is_err());
		assert!("room".parse::<RoomId>().is_err());
	}

	#[test]
	fn room_id_should_serialize_as_number() {
		#[derive(Deserialize)]
		struct Wrapper {
			room_id: RoomId,
		}

		let wrapper = toml::from_str::<Wrapper>("room_id = 201").expect("Failed to deserialize");
		assert_eq!(RoomId::from(201), wrapper.room_id);
	}
}
