//! Loopback - two devices on an in-memory bus.
//!
//! This example demonstrates:
//! - Building adapters from device configuration
//! - Running exchanges and reading the parsed answers
//! - Watching the processor through tracing output
//!
//! ```text
//! RUST_LOG=cec_control=debug cargo run --example loopback
//! ```

use cec_control::control::DeviceConfig;
use cec_control::handler::messages::{OsdName, PhysicalAddress, Standby, VendorId};
use cec_control::protocol::LogicalAddress;
use cec_control::transport::MemoryBus;
use cec_control::{AdapterBuilder, ExchangeType, Reply};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let bus = MemoryBus::new();

    let tv_config = DeviceConfig::from_json(
        r#"{ "role": "tv", "logical_address": 0, "osd_name": "Living Room", "physical_address": 0 }"#,
    )?;
    let tv = AdapterBuilder::from_config(&tv_config)?.build(bus.attach(LogicalAddress::Tv));
    let player = AdapterBuilder::from_config(&DeviceConfig::default())?
        .build(bus.attach(LogicalAddress::Playback1));

    let mut name = ExchangeType::new(OsdName::default());
    player.exchange(LogicalAddress::Tv, &mut name).await?;
    println!("TV calls itself {:?}", name.message().name());

    let mut vendor = ExchangeType::new(VendorId::default());
    player.exchange(LogicalAddress::Tv, &mut vendor).await?;
    println!("TV vendor id: {:06X}", vendor.message().id);

    let mut address = ExchangeType::new(PhysicalAddress::default());
    tv.exchange(LogicalAddress::Playback1, &mut address).await?;
    println!(
        "Player sits at {:04X}, device type {}",
        address.message().address,
        address.message().device_type
    );

    let mut standby = ExchangeType::new(Standby);
    if tv.exchange(LogicalAddress::Playback1, &mut standby).await? == Reply::Sent {
        println!("Standby sent");
    }

    for frame in bus.traffic() {
        println!("{:02X?}", frame);
    }

    Ok(())
}
