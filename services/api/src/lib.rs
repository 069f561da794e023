mod cli;
mod demo;
mod infra;
mod routes;
mod server;

pub use server::StartupError;

pub async fn run() -> Result<(), StartupError> {
    cli::run().await
}
