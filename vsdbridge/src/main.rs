// SPDX-License-Identifier: MIT

mod config;
mod link;
mod output;
mod utils;

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use vsddev::prelude::*;
use vsdpart::FatSizing;
use vsdproto::prelude::*;

use crate::config::BridgeConfig;
use crate::utils::{LogLevel, hex_dump, pretty_bytes};

#[derive(Parser)]
#[command(name = "vsdbridge", version, about = "SD block-device bridge", long_about = None)]
struct Cli {
    /// Config file
    #[arg(short, long, global = true, default_value = "bridge.toml")]
    config: PathBuf,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct HostArgs {
    /// Device address (host:port)
    #[arg(long)]
    connect: Option<String>,

    /// Serial device node
    #[arg(long)]
    serial: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the image directory to a host
    Serve {
        /// Image directory
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Listen address (host:port)
        #[arg(short, long)]
        listen: Option<String>,

        /// Serial device node
        #[arg(long)]
        serial: Option<PathBuf>,

        #[arg(long)]
        max_units: Option<usize>,

        /// Size FATs from the volume geometry instead of the fixed placeholder
        #[arg(long)]
        compute_fat: bool,
    },
    /// Print the drives an image directory would serve
    Scan {
        /// Image directory
        #[arg(short, long)]
        dir: Option<PathBuf>,

        #[arg(long)]
        compute_fat: bool,
    },
    /// Ask a device for its drive catalog
    Init {
        #[command(flatten)]
        host: HostArgs,
    },
    /// Read sectors from a device drive
    Read {
        #[command(flatten)]
        host: HostArgs,

        #[arg(long)]
        drive: u8,

        #[arg(long)]
        sector: u32,

        #[arg(long, default_value_t = 1)]
        count: u16,

        /// Write the data here instead of dumping it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write sectors to a device drive
    Write {
        #[command(flatten)]
        host: HostArgs,

        #[arg(long)]
        drive: u8,

        #[arg(long)]
        sector: u32,

        #[arg(long, default_value_t = 1)]
        count: u16,

        /// Sector data, exactly `count` sectors long
        #[arg(short, long)]
        input: PathBuf,
    },
}

impl HostArgs {
    fn apply(self, config: &mut BridgeConfig) {
        if self.connect.is_some() {
            config.link.connect = self.connect;
        }
        if self.serial.is_some() {
            config.link.serial = self.serial;
        }
    }
}

fn apply_device(config: &mut BridgeConfig, dir: Option<PathBuf>, compute_fat: bool) {
    if let Some(dir) = dir {
        config.device.image_dir = dir;
    }
    if compute_fat {
        config.device.fat_sizing = FatSizing::Computed;
    }
}

fn device(config: &BridgeConfig) -> anyhow::Result<Device<DirImageSource>> {
    let dir = &config.device.image_dir;
    if !dir.is_dir() {
        anyhow::bail!("Image directory not found: {}", dir.display());
    }
    Ok(Device::new(
        config.device.clone(),
        DirImageSource::new(dir.clone()),
    ))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::log::init(LogLevel::from_flags(cli.quiet, cli.verbose))?;

    let mut config = BridgeConfig::load(&cli.config)?;

    match cli.command {
        Commands::Serve {
            dir,
            listen,
            serial,
            max_units,
            compute_fat,
        } => {
            apply_device(&mut config, dir, compute_fat);
            if let Some(n) = max_units {
                config.device.max_units = n;
            }
            if listen.is_some() {
                config.link.listen = listen;
            }
            if serial.is_some() {
                config.link.serial = serial;
            }
            config.device.validate()?;

            let mut device = device(&config)?;
            info!("serving {}", config.device.image_dir.display());
            let res = link::serve(&mut device, &config.link);
            device.shutdown()?;
            res?;
        }
        Commands::Scan { dir, compute_fat } => {
            apply_device(&mut config, dir, compute_fat);
            let mut source = DirImageSource::new(config.device.image_dir.clone());
            let table = DriveTable::build(&config.device, &mut source)?;
            println!("{}:", config.device.image_dir.display());
            print!("{}", output::format_table(&table));
        }
        Commands::Init { host } => {
            host.apply(&mut config);
            let mut conn = link::connect(&config.link)?;
            let catalog = conn.init()?;
            print!("{}", output::format_catalog(&catalog));
        }
        Commands::Read {
            host,
            drive,
            sector,
            count,
            output,
        } => {
            host.apply(&mut config);
            let mut conn = link::connect(&config.link)?;
            let data = conn.read(IoParams {
                drive,
                start_sector: sector,
                sector_count: count,
            })?;
            match output {
                Some(path) => {
                    fs::write(&path, &data)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(
                        "{} read from drive {drive} into {}",
                        pretty_bytes(data.len() as u64),
                        path.display()
                    );
                }
                None => print!("{}", hex_dump(&data)),
            }
        }
        Commands::Write {
            host,
            drive,
            sector,
            count,
            input,
        } => {
            host.apply(&mut config);
            let data =
                fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
            if data.len() > MAX_DATA_SIZE {
                anyhow::bail!(
                    "{} is {} bytes, a transfer carries at most {MAX_DATA_SIZE}",
                    input.display(),
                    data.len()
                );
            }
            let len = data.len();
            let mut conn = link::connect(&config.link)?;
            conn.write(
                IoParams {
                    drive,
                    start_sector: sector,
                    sector_count: count,
                },
                data,
            )?;
            info!("{} written to drive {drive}", pretty_bytes(len as u64));
        }
    }

    Ok(())
}
