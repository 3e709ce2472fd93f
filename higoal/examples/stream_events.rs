//! Print device and entity changes as they arrive
//!
//! Set `RUST_LOG=higoal=debug` for protocol logs.

use std::sync::Arc;

use higoal::{Config, EventChannel, Manager, ManagerEvent};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let manager = Manager::new(Config::from_env()?)?;
    let (events, mut rx) = EventChannel::new();
    manager.add_listener(Arc::new(events));

    let devices = manager.get_devices().await?;
    println!("Loaded {} devices, connecting to relay...", devices.len());
    manager.start_streaming().await?;
    println!("✓ Streaming");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => match event {
                Some(ManagerEvent::EntityChanged(entity)) => println!(
                    "{} [{}] {}: state={} on={} percentage={:?}",
                    entity.device_key(),
                    entity.index(),
                    entity.name(),
                    entity.state(),
                    entity.is_turned_on(),
                    entity.percentage()
                ),
                Some(ManagerEvent::DeviceAdded(device)) => println!("+ {}", device),
                Some(ManagerEvent::DeviceRemoved(device)) => println!("- {}", device),
                None => break,
            },
        }
    }

    manager.stop().await;
    println!("✓ Stopped");
    Ok(())
}
