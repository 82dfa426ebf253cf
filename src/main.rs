use std::{io::Write, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use openlog_i2c::{Config, OpenLog, config::parse_address_str, transport::I2cSpeed};

#[derive(Parser)]
#[command(
    name = "openlog",
    about = "Talk to a Qwiic OpenLog through a CH341 USB-to-I2C bridge"
)]
struct Cli {
    /// YAML file with connection settings
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    /// Device address, e.g. 0x2a
    #[arg(long, short = 'a', value_parser = parse_address_str)]
    address: Option<u8>,
    /// Pause after every register write, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,
    /// Index of the CH341 bridge to use
    #[arg(long, short = 'd')]
    device: Option<usize>,
    /// I2C clock
    #[arg(long, short = 's')]
    speed: Option<I2cSpeed>,
    /// Log every bus frame
    #[arg(long, short = 'v')]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show id, firmware version and status
    Info {},
    /// Show the decoded status register
    Status {},
    /// List the current directory
    Ls {
        /// Name pattern, wildcards allowed
        pattern: Option<String>,
    },
    /// Print a file
    Cat {
        path: String,
        /// Hex dump of the raw bytes, terminators included
        #[arg(long)]
        hex: bool,
    },
    /// Print the size of a file in bytes
    Size { path: String },
    /// Create an empty file
    Touch { path: String },
    Mkdir { path: String },
    /// Change the device's current directory
    Cd { path: String },
    /// Remove files, or directories with -r
    Rm {
        path: String,
        #[arg(long, short = 'r')]
        recursive: bool,
    },
    /// Append one line of text to a file
    Append {
        path: String,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Upload a local file
    Put { local: PathBuf, remote: String },
    /// Start a new sequential log file
    NewLog {},
    /// Move the device to a new bus address
    SetAddress {
        #[arg(value_parser = parse_address_str)]
        new_address: u8,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = simplelog::TermLogger::init(
        if cli.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(address) = cli.address {
        config.address = address;
    }
    if let Some(ms) = cli.settle_ms {
        config.settle_delay_ms = ms;
    }
    if let Some(device) = cli.device {
        config.usb_index = device;
    }
    if let Some(speed) = cli.speed {
        config.i2c_speed = speed;
    }

    let mut openlog = OpenLog::new_from_usb(&config)?;
    match cli.command {
        Commands::Info {} => {
            openlog.dump_info()?;
        }
        Commands::Status {} => {
            let status = openlog.status()?;
            println!("{}", status);
        }
        Commands::Ls { pattern } => {
            for name in openlog.list(pattern.as_deref().unwrap_or(""))? {
                println!("{}", name);
            }
        }
        Commands::Cat { path, hex } => {
            if hex {
                let data = openlog.read_raw(&path)?;
                let mut out = Vec::new();
                hxdmp::hexdump(&data, &mut out)?;
                std::io::stdout().write_all(&out)?;
                println!();
            } else {
                for line in openlog.read_to_end(&path)? {
                    println!("{}", line);
                }
            }
        }
        Commands::Size { path } => {
            println!("{}", openlog.file_size(&path)?);
        }
        Commands::Touch { path } => {
            openlog.create_file(&path)?;
        }
        Commands::Mkdir { path } => {
            openlog.make_dir(&path)?;
        }
        Commands::Cd { path } => {
            openlog.change_dir(&path)?;
        }
        Commands::Rm { path, recursive } => {
            if recursive {
                openlog.remove_dir(&path)?;
            } else {
                openlog.remove_file(&path)?;
            }
        }
        Commands::Append { path, text } => {
            openlog.open_file(&path)?;
            openlog.write_line(&text.join(" "))?;
        }
        Commands::Put { local, remote } => {
            let data = std::fs::read(&local)?;
            log::info!("Uploading {} ({} bytes) to {}", local.display(), data.len(), remote);
            let bar = ProgressBar::new(data.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("[{elapsed_precise}] {wide_bar} {bytes}/{total_bytes}")?,
            );
            openlog.open_file(&remote)?;
            openlog.write_bytes(&data, |sent| bar.set_position(sent as u64))?;
            bar.finish();
            log::info!("Remote size: {} bytes", openlog.file_size(&remote)?);
        }
        Commands::NewLog {} => {
            openlog.init_log()?;
        }
        Commands::SetAddress { new_address } => {
            openlog.change_device_address(new_address)?;
        }
    }

    Ok(())
}
