use clap::Parser;
use reservation_store::commandline::Commandline;
use reservation_store::error::ApplicationError;

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
	Commandline::parse().run().await
}
