use crate::backend::{Backend, CommitOutcome, Fields, Write};
use crate::reservation::error::ReservationError;
use crate::reservation::retry::RetryPolicy;
use crate::room::key::{RoomId, RoomKey, Tenant};
use crate::room::model::{Reservation, Room, RoomStatus};
use crate::room::record;
use crate::seed::Seed;
use futures_util::FutureExt;
use futures_util::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};

pub mod error;
pub mod retry;


/// Rooms and their reservations, stored per tenant in a [`Backend`].
///
/// Reserving and cancelling are read-modify-write cycles under a watch on the room's key,
/// so of any number of concurrent callers at most one succeeds per state change.
#[derive(Clone)]
pub struct ReservationStore {
	backend: Arc<dyn Backend>,
}

impl ReservationStore {
	pub fn new(backend: Arc<dyn Backend>) -> Self {
		Self { backend }
	}

	/// Create a free room. Creating a room that already exists changes nothing.
	pub async fn create_room(&self, tenant: &Tenant, room_id: RoomId) -> Result<(), ReservationError> {
		let key = RoomKey::new(tenant, room_id);
		let created = self
			.backend
			.set_field_if_absent(key.as_str(), record::BOOKED, RoomStatus::Free.encode())
			.await?;
		self.register(tenant, room_id).await?;

		if created {
			debug!(%key, "Created room");
		} else {
			debug!(%key, "Room already exists");
		}
		Ok(())
	}

	/// Delete a room, including any reservation. Deleting a missing room changes nothing.
	pub async fn delete_room(&self, tenant: &Tenant, room_id: RoomId) -> Result<(), ReservationError> {
		let key = RoomKey::new(tenant, room_id);
		// Reverse order of `create_room`: a record surviving a concurrent create keeps its index entry.
		let index_field = room_id.to_string();
		self.backend
			.delete_fields(&RoomKey::index_key(tenant), &[index_field.as_str()])
			.await?;
		self.backend.delete(key.as_str()).await?;

		debug!(%key, "Deleted room");
		Ok(())
	}

	/// Book a free room for `reservation`.
	///
	/// Fails with [`ReservationError::Aborted`] if the room was modified between reading its status
	/// and writing the reservation, the room is left untouched in that case.
	pub async fn reserve(
		&self,
		tenant: &Tenant,
		room_id: RoomId,
		reservation: &Reservation,
	) -> Result<(), ReservationError> {
		let key = RoomKey::new(tenant, room_id);
		let watch = self.backend.watch(key.as_str()).await?;

		let booked = watch.get_field(record::BOOKED).await?;
		match record::decode_status(&key, booked.as_deref())? {
			None => return Err(ReservationError::RoomNotFound(key)),
			Some(RoomStatus::Booked) => return Err(ReservationError::AlreadyBooked(key)),
			Some(RoomStatus::Free) => {}
		}

		let writes = vec![Write::SetFields(record::booked_fields(reservation))];
		match watch.commit(writes).await? {
			CommitOutcome::Committed => {
				debug!(
					%key,
					guest_name = reservation.guest_name(),
					start_date = %reservation.start_date(),
					end_date = %reservation.end_date(),
					"Reserved room"
				);
				Ok(())
			}
			CommitOutcome::Aborted => {
				debug!(%key, "Reservation lost against a concurrent modification");
				Err(ReservationError::Aborted(key))
			}
		}
	}

	/// Cancel the reservation of a booked room, leaving it free without any guest data.
	pub async fn cancel(&self, tenant: &Tenant, room_id: RoomId) -> Result<(), ReservationError> {
		let key = RoomKey::new(tenant, room_id);
		let watch = self.backend.watch(key.as_str()).await?;

		let booked = watch.get_field(record::BOOKED).await?;
		if record::decode_status(&key, booked.as_deref())? != Some(RoomStatus::Booked) {
			return Err(ReservationError::NotBooked(key));
		}

		let writes = vec![Write::Delete, Write::SetFields(record::free_fields())];
		match watch.commit(writes).await? {
			CommitOutcome::Committed => {
				debug!(%key, "Cancelled reservation");
				Ok(())
			}
			CommitOutcome::Aborted => {
				debug!(%key, "Cancellation lost against a concurrent modification");
				Err(ReservationError::Aborted(key))
			}
		}
	}

	/// [`ReservationStore::reserve`], run again according to `policy` while it gets aborted.
	pub async fn reserve_with_retry(
		&self,
		tenant: &Tenant,
		room_id: RoomId,
		reservation: &Reservation,
		policy: &RetryPolicy,
	) -> Result<(), ReservationError> {
		let key = RoomKey::new(tenant, room_id);
		policy
			.run(&key, move || self.reserve(tenant, room_id, reservation).boxed())
			.await
	}

	/// [`ReservationStore::cancel`], run again according to `policy` while it gets aborted.
	pub async fn cancel_with_retry(
		&self,
		tenant: &Tenant,
		room_id: RoomId,
		policy: &RetryPolicy,
	) -> Result<(), ReservationError> {
		let key = RoomKey::new(tenant, room_id);
		policy.run(&key, move || self.cancel(tenant, room_id).boxed()).await
	}

	pub async fn room(&self, tenant: &Tenant, room_id: RoomId) -> Result<Option<Room>, ReservationError> {
		let key = RoomKey::new(tenant, room_id);
		let fields = self.backend.get_all(key.as_str()).await?;
		if fields.is_empty() {
			return Ok(None);
		}

		record::decode_room(&key, &fields).map(Some)
	}

	/// All rooms of `tenant`, ordered by room id.
	pub async fn list_rooms(&self, tenant: &Tenant) -> Result<Vec<Room>, ReservationError> {
		let index_key = RoomKey::index_key(tenant);
		let index = self.backend.get_all(&index_key).await?;

		let room_ids = index
			.keys()
			.map(|field| {
				field.parse::<RoomId>().map_err(|error| ReservationError::CorruptRecord {
					key: index_key.clone(),
					reason: format!("invalid room id {field:?}: {error}"),
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		// Rooms deleted concurrently with listing are skipped.
		let mut rooms = try_join_all(room_ids.into_iter().map(|room_id| self.room(tenant, room_id)))
			.await?
			.into_iter()
			.flatten()
			.collect::<Vec<_>>();
		rooms.sort_by_key(|room| room.room_id);
		Ok(rooms)
	}

	/// Write every room of `seed`, replacing the fields of rooms that already exist.
	///
	/// All rooms are validated before anything is written.
	pub async fn seed(&self, tenant: &Tenant, seed: &Seed) -> Result<(), ReservationError> {
		let records = seed
			.rooms
			.iter()
			.map(|seed_room| {
				let key = RoomKey::new(tenant, seed_room.room_id);
				let fields = seed_room.fields();
				record::decode_room(&key, &fields)?;
				Ok((key, fields))
			})
			.collect::<Result<Vec<_>, ReservationError>>()?;

		for (key, fields) in records {
			self.backend.set_fields(key.as_str(), fields).await?;
			self.register(tenant, key.room_id()).await?;
		}

		info!(%tenant, rooms = seed.rooms.len(), "Seeded rooms");
		Ok(())
	}

	pub async fn close(&self) {
		self.backend.close().await;
	}

	async fn register(&self, tenant: &Tenant, room_id: RoomId) -> Result<(), ReservationError> {
		let entry = Fields::from([(room_id.to_string(), String::new())]);
		self.backend.set_fields(&RoomKey::index_key(tenant), entry).await?;
		Ok(())
	}
}
