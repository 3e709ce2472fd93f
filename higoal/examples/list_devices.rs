//! List the devices of an account
//!
//! Reads the account from `HIGOAL_USERNAME` / `HIGOAL_PASSWORD`.

use higoal::{Config, Manager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let manager = Manager::new(Config::from_env()?)?;

    let devices = manager.get_devices().await?;
    println!("✓ {} devices", devices.len());

    for device in &devices {
        println!("{}", device);
        for entity in device.entities() {
            println!("  [{}] {:?} {}", entity.index(), entity.kind(), entity.name());
        }
    }

    Ok(())
}
