use clap::{Parser, Subcommand};
use netplayer::config::ApplianceConfig;
use netplayer::data::RadioStation;
use netplayer::helpers::{TuneInClient, UreqHttpClient};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Internet radio directory tool", long_about = None)]
struct Args {
    /// Configuration file holding the radio directory endpoints
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[clap(long, short = 'v', help = "Enable verbose output")]
    verbose: bool,

    /// Print results as JSON
    #[clap(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the favourite stations
    ///
    /// Example: netplayer_tunein favorites --resolve
    Favorites {
        /// Also look up the stream URL of every station
        #[clap(long, short = 'r')]
        resolve: bool,
    },
    /// Look up the stream URL of one station
    ///
    /// Example: netplayer_tunein resolve s24896
    Resolve {
        /// Station guide id
        guide_id: String,
    },
}

fn print_station(args: &Args, index: usize, station: &RadioStation) {
    println!(
        "{:3} {:10} {}",
        index,
        station.guide_id,
        station.title.as_deref().unwrap_or("")
    );
    if args.verbose {
        if let Some(subtitle) = &station.subtitle {
            println!("    {}", subtitle);
        }
        if let Some(image) = &station.image_url {
            println!("    image:  {}", image);
        }
    }
    if let Some(url) = &station.stream_url {
        println!("    stream: {}", url);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ApplianceConfig::from_file(path)?,
        None => ApplianceConfig::default(),
    };

    let http = Arc::new(UreqHttpClient::with_max_response_size(
        config.http.timeout_secs,
        config.http.max_response_size,
    ));
    let tunein = TuneInClient::new(http, config.tunein.clone());

    let stations = match &args.command {
        Commands::Favorites { resolve } => {
            let mut stations = tunein.favorites()?;
            if *resolve {
                for station in stations.iter_mut() {
                    if let Err(e) = tunein.resolve_stream_url(station) {
                        eprintln!("Cannot resolve {}: {}", station.guide_id, e);
                    }
                }
            }
            stations
        }
        Commands::Resolve { guide_id } => {
            let mut station = RadioStation::new(guide_id.as_str());
            tunein.resolve_stream_url(&mut station)?;
            vec![station]
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stations)?);
    } else {
        for (index, station) in stations.iter().enumerate() {
            print_station(&args, index, station);
        }
    }

    Ok(())
}
