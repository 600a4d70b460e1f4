use crate::configuration::Configuration;
use crate::context::ApplicationContext;
use crate::error::ApplicationError;
use crate::room::key::RoomId;
use crate::room::model::{Reservation, Room};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(clap::Parser)]
#[clap(version, about)]
pub struct Commandline {
	#[clap(short = 'c', long = "config-file", default_value = "configuration.toml")]
	pub configuration_file_path: PathBuf,
	/// Use this tenant instead of the configured one
	#[clap(short = 't', long = "tenant")]
	pub tenant: Option<String>,
	#[clap(subcommand)]
	pub command: BaseCommand,
}

#[derive(clap::Subcommand)]
pub enum BaseCommand {
	#[clap(flatten)]
	Store(StoreCommand),
	/// Print the configuration
	Configuration,
}

/// Commands working on the opened reservation store.
#[derive(clap::Subcommand)]
pub enum StoreCommand {
	/// Create a free room, does nothing if it already exists
	AddRoom { room_id: RoomId },
	/// Delete a room together with its reservation
	RemoveRoom { room_id: RoomId },
	/// Book a free room
	Reserve {
		room_id: RoomId,
		guest_name: String,
		/// First night, as YYYY-MM-DD
		start_date: NaiveDate,
		/// Checkout day, as YYYY-MM-DD
		end_date: NaiveDate,
	},
	/// Cancel the reservation of a booked room
	Cancel { room_id: RoomId },
	/// Show a single room
	Show { room_id: RoomId },
	/// List all rooms of the tenant
	Rooms,
	/// Write the rooms of the configured seed file
	Seed,
}

impl Commandline {
	pub async fn run(self) -> Result<(), ApplicationError> {
		let mut configuration = Configuration::from_file(&self.configuration_file_path)?;
		if let Some(tenant) = self.tenant {
			configuration.tenant = tenant.into();
		}

		tracing_subscriber::fmt()
			.with_env_filter(EnvFilter::try_new(&configuration.log_filters)?)
			.init();

		match self.command {
			BaseCommand::Configuration => {
				println!("{configuration:#?}");
				Ok(())
			}
			BaseCommand::Store(command) => {
				let context = ApplicationContext::open(configuration).await?;
				let result = command.execute(&context).await;
				context.close().await;
				result
			}
		}
	}
}

impl StoreCommand {
	async fn execute(self, context: &ApplicationContext) -> Result<(), ApplicationError> {
		let store = &context.store;
		let tenant = &context.configuration.tenant;
		let retry = &context.configuration.retry;

		match self {
			StoreCommand::AddRoom { room_id } => {
				store.create_room(tenant, room_id).await?;
				println!("Room {room_id} exists.");
			}
			StoreCommand::RemoveRoom { room_id } => {
				store.delete_room(tenant, room_id).await?;
				println!("Room {room_id} removed.");
			}
			StoreCommand::Reserve {
				room_id,
				guest_name,
				start_date,
				end_date,
			} => {
				let reservation = Reservation::new(guest_name, start_date, end_date)?;
				store.reserve_with_retry(tenant, room_id, &reservation, retry).await?;
				println!("Room {room_id} reserved for {}.", reservation.guest_name());
			}
			StoreCommand::Cancel { room_id } => {
				store.cancel_with_retry(tenant, room_id, retry).await?;
				println!("Reservation of room {room_id} cancelled.");
			}
			StoreCommand::Show { room_id } => match store.room(tenant, room_id).await? {
				Some(room) => println!("{}", describe(&room)),
				None => println!("Room {room_id} doesn't exist."),
			},
			StoreCommand::Rooms => {
				for room in store.list_rooms(tenant).await? {
					println!("{}", describe(&room));
				}
			}
			StoreCommand::Seed => {
				context.seed().await?;
				println!("Seeded rooms of {tenant}.");
			}
		}
		Ok(())
	}
}

fn describe(room: &Room) -> String {
	match &room.reservation {
		Some(reservation) => format!(
			"{}: booked by {} from {} to {} ({} nights)",
			room.room_id,
			reservation.guest_name(),
			reservation.start_date(),
			reservation.end_date(),
			reservation.nights()
		),
		None => format!("{}: free", room.room_id),
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use clap::Parser;

	#[test]
	fn should_parse_reserve_command() {
		let commandline = Commandline::try_parse_from([
			"reservation-store",
			"--tenant",
			"hilton",
			"reserve",
			"103",
			"Ada Lovelace",
			"2019-08-01",
			"2019-08-15",
		])
		.expect("Failed to parse commandline");

		assert_eq!(Some("hilton".to_owned()), commandline.tenant);
		assert_eq!(PathBuf::from("configuration.toml"), commandline.configuration_file_path);
		let BaseCommand::Store(StoreCommand::Reserve {
			room_id,
			guest_name,
			start_date,
			end_date,
		}) = commandline.command
		else {
			panic!("Expected reserve command");
		};
		assert_eq!(RoomId::from(103), room_id);
		assert_eq!("Ada Lovelace", guest_name);
		assert_eq!(NaiveDate::from_ymd_opt(2019, 8, 1), Some(start_date));
		assert_eq!(NaiveDate::from_ymd_opt(2019, 8, 15), Some(end_date));
	}

	#[test]
	fn configuration_command_shouldnt_need_the_store() {
		let configuration = Commandline::try_parse_from(["reservation-store", "configuration"])
			.expect("Failed to parse commandline");
		let rooms =
			Commandline::try_parse_from(["reservation-store", "rooms"]).expect("Failed to parse commandline");

		assert!(matches!(configuration.command, BaseCommand::Configuration));
		assert!(matches!(rooms.command, BaseCommand::Store(StoreCommand::Rooms)));
	}

	#[test]
	fn should_reject_invalid_room_id() {
		let result = Commandline::try_parse_from(["reservation-store", "cancel", "one-o-three"]);

		assert!(result.is_err());
	}

	#[test]
	fn should_describe_rooms() {
		let free = Room {
			room_id: RoomId::from(101),
			reservation: None,
		};

		let booked = Room {
			room_id: RoomId::from(201),
			reservation: Some(
				Reservation::new(
					"Ada Lovelace",
					NaiveDate::from_ymd_opt(2019, 8, 1).expect("Invalid date"),
					NaiveDate::from_ymd_opt(2019, 8, 15).expect("Invalid date"),
				)
				.expect("Failed to create reservation"),
			),
		};

		assert_eq!("101: free", describe(&free));
		assert_eq!(
			"201: booked by Ada Lovelace from 2019-08-01 to 2019-08-15 (14 nights)",
			describe(&booked)
		);
	}

	#[test]
	fn commandline_should_be_consistent() {
		use clap::CommandFactory;
		Commandline::command().debug_assert();
	}
}
