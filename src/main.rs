use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use tuneflow::library::{Catalog, FavoritesStore, JsonFavoritesStore, YouTubeCatalog};
use tuneflow::player::{
    Command, PlaybackSession, PlaybackSessionBuilder, PlayerEvent, PlayerEventHandler,
    SessionEvent, SessionHandle, SimulatedPlayer, Track,
};
use tuneflow::utils::Config;

/// TuneFlow - search the music catalog and play it from the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Use this configuration file instead of the system/user ones
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search the catalog and list the results
    Search {
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Search the catalog and play the results as a queue
    Play {
        #[arg(value_name = "QUERY")]
        query: String,

        /// Length of each simulated track in seconds
        #[arg(long, value_name = "SECS", default_value = "180")]
        track_secs: u64,
    },

    /// List favorite tracks, or play them as a queue
    Favorites {
        /// Play the favorites instead of listing them
        #[arg(long)]
        play: bool,

        /// Length of each simulated track in seconds
        #[arg(long, value_name = "SECS", default_value = "180")]
        track_secs: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let config = Config::from_file(path)?;
            config.validate()?;
            config
        }
        None => Config::load()?,
    };

    // Initialize logging
    let log_level = if args.debug { "debug" } else { config.general.log_level.as_str() };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    info!("Starting TuneFlow v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Commands::Search { query } => search(&config, &query).await,
        Commands::Play { query, track_secs } => {
            play(config, &query, Duration::from_secs(track_secs)).await
        }
        Commands::Favorites { play: true, track_secs } => {
            play_favorites(config, Duration::from_secs(track_secs)).await
        }
        Commands::Favorites { play: false, .. } => {
            let store = JsonFavoritesStore::open(config.favorites_path());
            if store.list().is_empty() {
                println!("No favorites yet");
            }
            print_tracks(store.list());
            Ok(())
        }
    }
}

async fn search(config: &Config, query: &str) -> Result<()> {
    let catalog = YouTubeCatalog::new(config.catalog.clone())?;
    let tracks = catalog.search(query).await?;

    if tracks.is_empty() {
        println!("No results for \"{}\"", query);
    }
    print_tracks(&tracks);
    Ok(())
}

async fn play(config: Config, query: &str, track_length: Duration) -> Result<()> {
    let catalog = YouTubeCatalog::new(config.catalog.clone())?;
    let tracks = catalog.search(query).await?;
    if tracks.is_empty() {
        bail!("No results for \"{}\"", query);
    }

    let favorites = Rc::new(RefCell::new(JsonFavoritesStore::open(config.favorites_path())));
    run_session(config, tracks, favorites, track_length).await
}

async fn play_favorites(config: Config, track_length: Duration) -> Result<()> {
    let store = JsonFavoritesStore::open(config.favorites_path());
    let tracks = store.list().to_vec();
    if tracks.is_empty() {
        bail!("No favorites to play");
    }

    run_session(config, tracks, Rc::new(RefCell::new(store)), track_length).await
}

/// Play `tracks` as a queue until the user quits
async fn run_session(
    config: Config,
    tracks: Vec<Track>,
    favorites: Rc<RefCell<JsonFavoritesStore>>,
    track_length: Duration,
) -> Result<()> {
    let now_playing = Rc::new(RefCell::new(None));

    let (handle, events) = PlaybackSession::channel();
    let player = SimulatedPlayer::new(handle.clone(), track_length);

    let builder = PlaybackSessionBuilder::new()
        .with_config(config)
        .with_adapter(Box::new(player.clone()))
        .with_favorites(favorites.clone())
        .with_event_handler(Box::new(ConsoleEventHandler {
            now_playing: Rc::clone(&now_playing),
        }));

    #[cfg(feature = "native-audio")]
    let builder = builder.with_audio_backend(Box::new(tuneflow::audio::CpalBackend::new()));

    let session = builder.build(handle.clone())?;

    player.announce_ready();
    handle.command(Command::PlayAt { index: 0, queue: Some(tracks) });

    println!("Commands: p play/pause, n next, b previous, s <secs> seek, h hide, v show, f favorite, q quit");

    let input = InputLoop {
        handle,
        player,
        favorites,
        now_playing,
    };
    tokio::join!(session.run(events), input.run());

    Ok(())
}

/// Reads terminal commands and feeds them into the session
struct InputLoop {
    handle: SessionHandle,
    player: SimulatedPlayer,
    favorites: Rc<RefCell<JsonFavoritesStore>>,
    now_playing: Rc<RefCell<Option<Track>>>,
}

impl InputLoop {
    async fn run(self) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut clock = tokio::time::interval(Duration::from_millis(250));

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if !self.dispatch(line.trim()) {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!("Failed to read input: {}", e);
                            break;
                        }
                    }
                }
                _ = clock.tick() => {
                    self.player.poll();
                }
            }
        }

        self.handle.send(SessionEvent::Shutdown);
    }

    /// Returns `false` when the user asked to quit
    fn dispatch(&self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("p") => self.command(Command::TogglePlayPause),
            Some("n") => self.command(Command::Next),
            Some("b") => self.command(Command::Previous),
            Some("s") => match parts.next().map(str::parse::<f64>) {
                Some(Ok(seconds)) => self.command(Command::SeekTo(seconds)),
                _ => warn!("Usage: s <seconds>"),
            },
            Some("h") => {
                self.handle.send(SessionEvent::VisibilityChanged { hidden: true });
            }
            Some("v") => {
                self.handle.send(SessionEvent::VisibilityChanged { hidden: false });
            }
            Some("f") => self.toggle_favorite(),
            Some("q") => return false,
            Some(other) => warn!("Unknown command: {}", other),
            None => {}
        }
        true
    }

    fn command(&self, command: Command) {
        self.handle.command(command);
    }

    fn toggle_favorite(&self) {
        let Some(track) = self.now_playing.borrow().clone() else {
            warn!("Nothing playing");
            return;
        };

        match self.favorites.borrow_mut().toggle(&track) {
            Ok(_) => self.command(Command::RefreshFavorite),
            Err(e) => error!("Failed to save favorites: {}", e),
        }
    }
}

/// Prints player events to the terminal
struct ConsoleEventHandler {
    now_playing: Rc<RefCell<Option<Track>>>,
}

impl PlayerEventHandler for ConsoleEventHandler {
    fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::TrackChanged { index, track, is_favorite } => {
                let heart = if is_favorite { " <3" } else { "" };
                println!("[{}] {} - {}{}", index + 1, track.title, track.channel_name, heart);
                *self.now_playing.borrow_mut() = Some(track);
            }
            PlayerEvent::PlayingChanged { playing } => {
                println!("{}", if playing { "Playing" } else { "Paused" });
            }
            PlayerEvent::Progress(snapshot) => {
                // Log progress at debug level to avoid spam
                debug!("{} / {} ({:.0}%)", snapshot.current_label, snapshot.total_label, snapshot.percent);
            }
            PlayerEvent::FavoriteChanged { is_favorite, .. } => {
                println!("{}", if is_favorite { "Added to favorites" } else { "Removed from favorites" });
            }
            PlayerEvent::AdSkipped { attempt, .. } => info!("Skipped ad (attempt {})", attempt),
            PlayerEvent::TrackAbandoned { id } => warn!("Gave up on {} after repeated ads", id),
            PlayerEvent::PhaseChanged { phase } => debug!("Phase: {:?}", phase),
        }
    }
}

fn print_tracks(tracks: &[Track]) {
    for (index, track) in tracks.iter().enumerate() {
        println!("{:>3}. {} - {} [{}]", index + 1, track.title, track.channel_name, track.id);
    }
}
