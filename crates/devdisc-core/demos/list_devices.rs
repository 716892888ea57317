//! List the devices visible on this machine, per class.
//!
//! ```bash
//! cargo run -p devdisc-core --example list_devices
//! DEVDISC_DEVICE_TYPE=gpu RUST_LOG=debug cargo run -p devdisc-core --example list_devices
//! DEVDISC_EXPOSE_HOST=1 cargo run -p devdisc-core --example list_devices
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::{Context, Result, ensure};
use devdisc_core::{DefaultSelector, Device, DeviceClass, DeviceEnumerator};
use tracing_subscriber::EnvFilter;

fn describe(device: &Device) -> String {
    let class = device.class_of().map_or_else(|_| "unknown".to_owned(), |c| c.to_string());
    let name = device.name().unwrap_or_else(|_| "?".to_owned());
    format!("{class}: {name} [{}]", device.backend_name())
}

fn hash_of(device: &Device) -> u64 {
    let mut hasher = DefaultHasher::new();
    device.hash(&mut hasher);
    hasher.finish()
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    println!("Default device: {}", describe(&Device::default()));

    let enumerator = DeviceEnumerator::from_env();
    let devices = enumerator.enumerate_all().context("enumerating devices")?;
    println!("All devices:");
    for (index, device) in devices.iter().enumerate() {
        println!("  {}. {}", index + 1, describe(device));
    }

    for class in DeviceClass::ALL {
        let matching = enumerator
            .enumerate_by_class(class)
            .with_context(|| format!("enumerating {class} devices"))?;
        println!("{class} devices: {}", matching.len());
        for (index, device) in matching.iter().enumerate() {
            println!("  {}. {}", index + 1, describe(device));
        }
    }

    if let Some(host) = enumerator.host_device().context("looking up the host device")? {
        ensure!(host == Device::default(), "enumerated host is not the default device");
    }

    if let Ok(best) = enumerator.select(&DefaultSelector) {
        println!("Selected: {}", describe(&best));
    }

    let Some(first) = devices.first() else {
        return Ok(());
    };
    let second = devices.get(1).unwrap_or(first);

    let mut device = first.clone();
    let hash = hash_of(&device);
    let mut target = second.clone();
    target.clone_from(&device);
    ensure!(hash == hash_of(&target), "copy changed the hash");
    let moved = device.take();
    ensure!(hash == hash_of(&moved), "move changed the hash");
    ensure!(first.class_of().ok() == moved.class_of().ok(), "move changed the class");
    ensure!(device == Device::default(), "moved-from device is not the default device");
    println!("Identity checks passed for {}", describe(first));

    Ok(())
}
