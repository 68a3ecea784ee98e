use clap::Parser;
use crossbeam::channel::{self, RecvTimeoutError};
use netplayer::config::ApplianceConfig;
use netplayer::data::{MediaSource, RadioStation, SourceType};
use netplayer::logging::initialize_logging_with_flags;
use netplayer::players::NullAudioEngine;
use netplayer::remote::Notification;
use netplayer::stream::StreamEvent;
use netplayer::Appliance;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use log::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Network media player console", long_about = None)]
struct Args {
    /// JSON configuration file
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[clap(long, short = 'd')]
    debug: bool,

    /// Enable verbose logging
    #[clap(long, short = 'v')]
    verbose: bool,
}

const HELP: &str = "Commands:
  play [url]            start playback, optionally of a new stream
  pause | stop          pause or stop playback
  seek <secs>           jump to a position
  vol <0-100>           set the volume
  mute | unmute         toggle muting
  radio                 list radio favourites
  radio <index>         play a radio favourite
  local <path>          play a local file
  next | prev           step through the local folder
  action <Name> [arg]   run a remote-control action
  camera <url> | off    open or close the camera stream
  status                show the player state
  save                  persist the user settings
  quit                  exit";

fn load_config(args: &Args) -> ApplianceConfig {
    match &args.config {
        Some(path) => match ApplianceConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Cannot load configuration: {}, using defaults", e);
                ApplianceConfig::default()
            }
        },
        None => ApplianceConfig::default(),
    }
}

fn print_status(appliance: &Appliance) {
    let player = appliance.player();
    println!("source:   {}", player.source());
    println!("state:    {}", player.state());
    match player.volume_get() {
        Ok(volume) => println!("volume:   {}{}", volume, if player.mute_get() { " (muted)" } else { "" }),
        Err(e) => println!("volume:   unavailable ({})", e),
    }
    println!(
        "time:     {}s / {}s",
        player.audio_time_secs(),
        player.audio_duration_secs()
    );
    println!("metadata: {}", appliance.metadata().get());
    println!("camera:   {:?}", appliance.camera().state());
}

fn camera_listener() -> impl Fn(&StreamEvent) + Send + Sync + 'static {
    |event: &StreamEvent| match event {
        StreamEvent::Open => info!("Camera stream open"),
        StreamEvent::Frame(frame) => debug!("Camera frame {}x{}", frame.width, frame.height),
        StreamEvent::Error(message) => warn!("Camera stream error: {}", message),
        StreamEvent::Close => info!("Camera stream closed"),
    }
}

/// Run one console command; returns false when the console should exit
fn handle_command(appliance: &Appliance, stations: &mut Vec<RadioStation>, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };
    let rest: Vec<&str> = parts.collect();
    let player = appliance.player();

    match (command, rest.as_slice()) {
        ("play", []) => {
            player.play();
        }
        ("play", [url]) => {
            player.set_source(MediaSource::new(SourceType::Other, *url));
            player.play();
        }
        ("pause", []) => {
            player.pause();
        }
        ("stop", []) => {
            player.stop();
        }
        ("seek", [secs]) => match secs.parse::<u32>() {
            Ok(secs) => {
                if let Err(e) = player.seek(secs) {
                    error!("Seek failed: {}", e);
                }
            }
            Err(_) => println!("seek expects seconds"),
        },
        ("vol", [volume]) => match volume.parse::<i32>() {
            Ok(volume) => {
                if let Err(e) = player.volume_set(volume) {
                    error!("Setting volume failed: {}", e);
                }
            }
            Err(_) => println!("vol expects a number"),
        },
        ("mute", []) | ("unmute", []) => {
            if let Err(e) = player.mute_set(command == "mute") {
                error!("{}", e);
            }
        }
        ("radio", []) => match appliance.radio_favorites() {
            Ok(list) => {
                for (index, station) in list.iter().enumerate() {
                    println!("{:3} {}", index, station.title.as_deref().unwrap_or(&station.guide_id));
                }
                *stations = list;
            }
            Err(e) => error!("Cannot load radio favourites: {}", e),
        },
        ("radio", [index]) => match index.parse::<usize>().ok().and_then(|i| stations.get_mut(i)) {
            Some(station) => {
                if let Err(e) = appliance.play_station(station) {
                    error!("Cannot play station: {}", e);
                }
            }
            None => println!("unknown station, run 'radio' first"),
        },
        ("local", [path]) => {
            if let Err(e) = appliance.play_local(path, None) {
                error!("Cannot play {}: {}", path, e);
            }
        }
        ("next", []) | ("prev", []) => {
            let stepped = if command == "next" {
                appliance.next_local()
            } else {
                appliance.prev_local()
            };
            match stepped {
                Ok(true) => {}
                Ok(false) => println!("{} only works while playing local files", command),
                Err(e) => error!("Cannot play {} track: {}", command, e),
            }
        }
        ("action", [name]) => println!("{}", appliance.remote().handle_request(name, "")),
        ("action", [name, argument @ ..]) => {
            let argument = argument.join(" ");
            println!("{}", appliance.remote().handle_request(name, &argument));
        }
        ("camera", ["off"]) => appliance.close_camera(),
        ("camera", [url]) => {
            if let Err(e) = appliance.open_camera(url, Arc::new(camera_listener())) {
                error!("Cannot open camera stream: {}", e);
            }
        }
        ("status", []) => print_status(appliance),
        ("save", []) => {
            if let Err(e) = appliance.save_settings() {
                error!("Cannot save settings: {}", e);
            }
        }
        ("quit", []) | ("exit", []) => return false,
        _ => println!("{}", HELP),
    }
    true
}

fn main() {
    let args = Args::parse();
    let config = load_config(&args);

    if let Err(e) = initialize_logging_with_flags(config.logging.clone(), args.debug, args.verbose) {
        eprintln!("Logging setup failed: {}", e);
    }
    info!("netplayer starting");

    let engine = Arc::new(NullAudioEngine::new());
    let appliance = match Appliance::new(engine, &config) {
        Ok(appliance) => appliance,
        Err(e) => {
            error!("Cannot start appliance: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = appliance.restore_settings() {
        warn!("Cannot restore settings: {}", e);
    }

    // Remote notifications are logged off the firing thread
    let (notify_tx, notify_rx) = channel::unbounded::<Notification>();
    appliance.remote().subscribe(move |notification: &Notification| {
        let _ = notify_tx.send(notification.clone());
    });
    thread::Builder::new()
        .name("notifications".to_string())
        .spawn(move || {
            for notification in notify_rx.iter() {
                info!("Remote notification: {}", notification);
            }
        })
        .map_err(|e| error!("Cannot start notification thread: {}", e))
        .ok();

    if let Some(url) = &config.camera.url {
        if let Err(e) = appliance.open_camera(url, Arc::new(camera_listener())) {
            warn!("Cannot open camera stream {}: {}", url, e);
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!("\nReceived Ctrl+C, shutting down...");
        r.store(false, Ordering::SeqCst);
    }) {
        error!("Error setting Ctrl+C handler: {}", e);
    }

    // stdin blocks, so it is read on its own thread
    let (line_tx, line_rx) = channel::unbounded::<String>();
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Cannot read console input: {}", e);
                        break;
                    }
                }
            }
        })
        .map_err(|e| error!("Cannot start console thread: {}", e))
        .ok();

    println!("{}", HELP);
    let mut stations = Vec::new();
    while running.load(Ordering::SeqCst) {
        match line_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => {
                if !handle_command(&appliance, &mut stations, line.trim()) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    appliance.close_camera();
    appliance.player().stop();
    info!("Exiting application");
}
