use clap::{Parser, Subcommand};
use netplayer::helpers::{SettingsDb, UserSettings};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Inspect the netplayer settings database", long_about = None)]
struct Args {
    /// Path to the settings database file
    #[clap(long, short = 'p', default_value = "/var/lib/netplayer/settings.db")]
    path: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dump all entries in key|value format (default)
    Dump,
    /// Show the device settings with their defaults applied
    Device,
    /// Print the raw JSON value of one key
    Get {
        key: String,
    },
    /// Remove one key
    Remove {
        key: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if !args.path.exists() {
        eprintln!("Error: Database file does not exist: {:?}", args.path);
        return Err(format!("Database not found: {:?}", args.path).into());
    }
    let db = SettingsDb::open(&args.path)?;

    match args.command.unwrap_or(Commands::Dump) {
        Commands::Dump => {
            println!("Settings database contents (key|value format):");
            println!("Database path: {:?}", db.path());
            println!("Total entries: {}", db.len()?);
            println!();
            for key in db.get_all_keys()? {
                let value = db.get_raw(&key)?.unwrap_or_default();
                println!("{}|{}", key, value);
            }
        }
        Commands::Device => {
            let settings = UserSettings::new(db);
            println!("i2s_output|{}", settings.i2s_output()?);
            println!("audio_volume|{}", settings.audio_volume()?);
            println!("backlight_level|{}", settings.backlight_level()?);
            println!("backlight_dim_level|{}", settings.backlight_dim_level()?);
            println!("backlight_timeout_secs|{}", settings.backlight_timeout_secs()?);
            println!("scan_on_boot|{}", settings.scan_on_boot()?);
        }
        Commands::Get { key } => match db.get_raw(&key)? {
            Some(value) => println!("{}", value),
            None => {
                eprintln!("Key not found: {}", key);
                std::process::exit(1);
            }
        },
        Commands::Remove { key } => {
            if db.remove(&key)? {
                println!("Removed {}", key);
            } else {
                println!("Key not found: {}", key);
            }
        }
    }

    Ok(())
}
