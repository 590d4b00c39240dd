//! `volctl`: a command-line front-end over `volman`, driving a
//! `volman-sim`-simulated array of file-backed devices for manual exercise
//! and demonstration.
//!
//! Every subcommand is a complete `start -> operate -> stop` round trip in
//! one process invocation; there is no resident daemon, so the volume never
//! outlives the command that opened it.

mod config;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use volman::{Geometry, Volume, VolumeStatus, SECTOR_SIZE};
use volman_sim::FileBlockDevice;

use config::VolctlConfig;

#[derive(Parser)]
#[command(name = "volctl", about = "Drive a simulated RAID-5 volume from the command line")]
struct Cli {
    /// Path to a TOML config file providing `device_paths` and
    /// `sectors_per_device`. Overridden by `--device`/`--sectors-per-device`
    /// when both are given.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backing file for one device; repeat once per device.
    #[arg(long = "device", global = true)]
    devices: Vec<PathBuf>,

    /// Sectors per device.
    #[arg(long, global = true)]
    sectors_per_device: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a fresh array: zero-fills every device file and writes the
    /// initial service record.
    Create,
    /// Assemble the array and report its status.
    Status,
    /// Report the array's logical capacity in sectors.
    Size,
    /// Read one logical sector and print it as hex.
    Read {
        /// Logical sector to read.
        logical_sector: u64,
    },
    /// Write one logical sector, filling it with a single repeated byte.
    Write {
        /// Logical sector to write.
        logical_sector: u64,
        /// Byte value to fill the sector with, e.g. `0xAA` or `170`.
        #[arg(value_parser = parse_byte)]
        fill: u8,
    },
    /// Replace a dead device and resync the array back to full health.
    Resync {
        /// Index of the dead device to replace.
        device_index: usize,
        /// Path for the replacement device's backing file.
        replacement_path: PathBuf,
    },
}

fn parse_byte(raw: &str) -> Result<u8, String> {
    let without_prefix = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"));
    let result = match without_prefix {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    result.map_err(|error| error.to_string())
}

fn resolve_config(cli: &Cli) -> Result<VolctlConfig> {
    let mut config = match &cli.config {
        Some(path) => VolctlConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => VolctlConfig {
            device_paths: Vec::new(),
            sectors_per_device: 2048,
        },
    };

    if !cli.devices.is_empty() {
        config.device_paths = cli.devices.clone();
    }
    if let Some(sectors) = cli.sectors_per_device {
        config.sectors_per_device = sectors;
    }

    if config.device_paths.is_empty() {
        bail!("no device paths configured; pass --device at least three times or use --config");
    }

    Ok(config)
}

fn open_devices(config: &VolctlConfig) -> Result<Vec<FileBlockDevice>> {
    config
        .device_paths
        .iter()
        .map(|path| {
            FileBlockDevice::open(path, SECTOR_SIZE)
                .with_context(|| format!("opening device {}", path.display()))
        })
        .collect()
}

fn create_devices(config: &VolctlConfig) -> Result<Vec<FileBlockDevice>> {
    config
        .device_paths
        .iter()
        .map(|path| {
            FileBlockDevice::create(path, config.sectors_per_device, SECTOR_SIZE)
                .with_context(|| format!("creating device {}", path.display()))
        })
        .collect()
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    let geometry = Geometry::new(config.device_count() as u8, config.sectors_per_device)
        .map_err(|error| anyhow::anyhow!("{error}"))?;

    match cli.command {
        Command::Create => {
            let mut devices = create_devices(&config)?;
            Volume::create(&mut devices, geometry).map_err(|error| anyhow::anyhow!("{error}"))?;
            println!("created array: {} devices, {} sectors/device", geometry.device_count(), geometry.sectors_per_device());
        }

        Command::Status => {
            let devices = open_devices(&config)?;
            let volume = Volume::start(devices, geometry).map_err(|error| anyhow::anyhow!("{error}"))?;
            println!("status: {:?}", volume.status());
            for index in 0..geometry.device_count() as usize {
                println!("  device {index}: {}", if volume.is_alive(index) { "alive" } else { "dead" });
            }
            let _ = volume.stop();
        }

        Command::Size => {
            println!("{}", geometry.capacity());
        }

        Command::Read { logical_sector } => {
            let devices = open_devices(&config)?;
            let mut volume = Volume::start(devices, geometry).map_err(|error| anyhow::anyhow!("{error}"))?;

            let mut buf = [0u8; SECTOR_SIZE];
            let ok = volume.read(logical_sector, &mut buf);
            let status = volume.status();
            let _ = volume.stop();

            if !ok {
                bail!("read of logical sector {logical_sector} failed (array status: {status:?})");
            }
            println!("{}", hex_dump(&buf));
        }

        Command::Write { logical_sector, fill } => {
            let devices = open_devices(&config)?;
            let mut volume = Volume::start(devices, geometry).map_err(|error| anyhow::anyhow!("{error}"))?;

            let buf = [fill; SECTOR_SIZE];
            let ok = volume.write(logical_sector, &buf);
            let status = volume.status();
            let _ = volume.stop();

            if !ok {
                bail!("write of logical sector {logical_sector} failed (array status: {status:?})");
            }
            println!("wrote logical sector {logical_sector} (array status: {status:?})");
        }

        Command::Resync { device_index, replacement_path } => {
            let devices = open_devices(&config)?;
            let mut volume = Volume::start(devices, geometry).map_err(|error| anyhow::anyhow!("{error}"))?;

            if volume.status() != VolumeStatus::Degraded {
                let _ = volume.stop();
                bail!("array is not degraded; nothing to resync");
            }
            if volume.is_alive(device_index) {
                let _ = volume.stop();
                bail!("device {device_index} is not the dead one; resync replaces the sole dead device");
            }

            let replacement = FileBlockDevice::create(&replacement_path, geometry.sectors_per_device(), SECTOR_SIZE)
                .with_context(|| format!("creating replacement device {}", replacement_path.display()))?;

            let status = volume.resync(replacement);
            let _ = volume.stop();
            println!("resync complete: status {status:?}");
        }
    }

    Ok(())
}

fn hex_dump(buf: &[u8]) -> String {
    buf.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    run(cli)
}
