//! Hotel room reservations on a key-value backend.
//!
//! Every room is a hash under `{tenant}:room:{room_id}`. Reserving and cancelling use optimistic
//! locking: the room's key is watched, its status read, and the change committed only if nobody
//! modified the key in the meantime.

pub mod backend;
pub mod commandline;
pub mod configuration;
pub mod context;
pub mod error;
pub mod reservation;
pub mod room;
pub mod seed;
