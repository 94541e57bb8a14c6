pub mod bridge;
pub mod config;
pub mod error;
pub mod hass;
pub mod mqtt;
pub mod sensors;

use crate::bridge::BridgeController;
use crate::config::BridgeConfig;
use crate::mqtt::mqtt_handler::MqttLink;
use color_eyre::Result;
use rumqttc::AsyncClient;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const REQUEST_CAPACITY: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = config::resolve_config_path(std::env::args().nth(1))?;
    let config = BridgeConfig::load(&config_path).await?;
    let catalog = Arc::new(config.catalog());
    info!(
        "Loaded {} sensor types, broker {}",
        catalog.len(),
        config.broker
    );

    let (client, eventloop) = AsyncClient::new(config.broker.mqtt_options(), REQUEST_CAPACITY);

    let controller = Arc::new(BridgeController::new(
        catalog,
        Arc::new(client),
        config.manufacturer.clone(),
    ));

    let _sweeper_handle = controller
        .liveness_sweeper(config.offline_timeout_minutes)
        .spawn();

    info!("Starting MQTT link");
    MqttLink::create(eventloop, controller).run().await;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
