mod api_doc;
mod auth;
mod error;
mod handlers;
mod setup;
mod state;
mod telemetry;
mod utils;

use docsmith_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load .env when present; real deployments set variables directly.
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    telemetry::init_telemetry();

    let (_state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    Ok(())
}
