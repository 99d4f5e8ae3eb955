use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use poimap_core::{
    api::{PoiClient, PoiSource},
    geo::LatLng,
    models::{Category, FavoriteLookup},
    storage::{Database, FavoriteRepository, SlotStore, SqliteSlotStore},
};
use poimap_tui::{load_config, App, Config, Event, EventHandler};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal map of nearby AEDs, hospitals, Wi-Fi spots, shelters and toilets")]
struct Args {
    /// SQLite database holding favorites
    #[arg(long, default_value = "poimap.db")]
    db: PathBuf,

    /// Config file (default: config.toml next to the database)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Current location latitude; the map starts here
    #[arg(long, allow_negative_numbers = true, requires = "lon")]
    lat: Option<f64>,

    /// Current location longitude
    #[arg(long, allow_negative_numbers = true, requires = "lat")]
    lon: Option<f64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch POIs of one category and print them
    Fetch {
        /// aed, hospital, freewifi, evacuation or toilet
        #[arg(long)]
        category: Category,

        /// Search centre latitude (default: current location, else the configured map centre)
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Search centre longitude (default: configured map centre)
        #[arg(long, allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Manage stored favorites
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum FavoritesCommand {
    /// List favorites, optionally of one category
    List {
        #[arg(long)]
        category: Option<String>,
    },

    /// Remove one favorite, by the key shown in `list` or by its parts
    Remove {
        /// Stored key, or the data source's id together with the options below
        id: String,

        #[arg(long)]
        category: Option<String>,

        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Original id, when `id` is a stored key without its record
        #[arg(long)]
        original_id: Option<String>,
    },

    /// Print the number of favorites
    Count,

    /// Write favorites as JSON to a file or stdout
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replace favorites with the contents of a JSON export
    Import { file: PathBuf },

    /// Remove every favorite
    Clear,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(parent) = args.db.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| sibling_path(&args.db, "config.toml"));
    let location = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Some(LatLng::new(lat, lon)),
        _ => None,
    };

    match args.command {
        None => {
            init_logging(Some(&sibling_path(&args.db, "poimap.log")))?;
            let config = load_config(&config_path)?;
            run_tui(&args.db, config, location)
        }
        Some(command) => {
            init_logging(None)?;
            let config = load_config(&config_path)?;
            run_command(command, &args.db, &config, location)
        }
    }
}

fn sibling_path(db: &Path, name: &str) -> PathBuf {
    db.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.join(name))
        .unwrap_or_else(|| PathBuf::from(name))
}

/// Log to `log_file` while the TUI owns the terminal, otherwise to stderr
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

fn open_favorites(db: &Path, config: &Config) -> Result<FavoriteRepository<SqliteSlotStore>> {
    let store = SqliteSlotStore::open(&Database::new(db))?;
    Ok(FavoriteRepository::with_config(
        store,
        config.favorites.to_favorites_config(),
    ))
}

/// Lookup for `favorites remove`. A bare stored key resolves to the record
/// holding it, so favorites without coordinates can be targeted too.
fn removal_lookup<S: SlotStore>(
    favorites: &FavoriteRepository<S>,
    id: &str,
    category: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    original_id: Option<String>,
) -> FavoriteLookup {
    if category.is_none() && lat.is_none() && lon.is_none() && original_id.is_none() {
        if let Some(record) = favorites.get_all().into_iter().find(|r| r.resource_id == id) {
            return record.lookup();
        }
    }

    FavoriteLookup {
        identifier: id.to_string(),
        category,
        lat,
        lon,
        original_resource_id: original_id,
    }
}

fn run_command(command: Command, db: &Path, config: &Config, location: Option<LatLng>) -> Result<()> {
    match command {
        Command::Fetch { category, lat, lon } => {
            let default_center = location.unwrap_or_else(|| config.map.center());
            let center = LatLng::new(lat.unwrap_or(default_center.lat), lon.unwrap_or(default_center.lon));
            let client = PoiClient::new(config.api.to_api_config())?;
            let features = client
                .fetch(category, center)
                .with_context(|| format!("Failed to fetch {}", category.display_name()))?;

            let favorites = open_favorites(db, config)?;
            let stored = favorites.load_all();
            for feature in &features {
                let Some(position) = feature.position() else {
                    continue;
                };
                let star = if favorites.is_favorite(&feature.to_candidate(category).lookup(), Some(&stored)) {
                    "★"
                } else {
                    " "
                };
                println!(
                    "{} {:.6}\t{:.6}\t{:>6.0} m\t{}\t{}",
                    star,
                    position.lat,
                    position.lon,
                    center.distance_to(&position),
                    feature.display_name(),
                    feature.address().unwrap_or_default(),
                );
            }
            info!(count = features.len(), category = %category, "fetch finished");
        }
        Command::Favorites { action } => {
            let favorites = open_favorites(db, config)?;
            match action {
                FavoritesCommand::List { category } => {
                    let records = match category {
                        Some(c) => favorites.get_by_category(&c),
                        None => favorites.get_all(),
                    };
                    for record in &records {
                        let added = record
                            .added_at
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default();
                        println!("{}\t{}\t{}", record.resource_id, record.display_name(), added);
                    }
                }
                FavoritesCommand::Remove {
                    id,
                    category,
                    lat,
                    lon,
                    original_id,
                } => {
                    let lookup = removal_lookup(&favorites, &id, category, lat, lon, original_id);
                    favorites
                        .remove(&lookup)
                        .with_context(|| format!("Failed to remove favorite {}", id))?;
                    println!("Removed {}", lookup.key());
                }
                FavoritesCommand::Count => {
                    println!("{}", favorites.count());
                }
                FavoritesCommand::Export { out } => {
                    let json = favorites.export_json()?;
                    match out {
                        Some(path) => {
                            fs::write(&path, json)
                                .with_context(|| format!("Failed to write {}", path.display()))?;
                            info!(path = %path.display(), "favorites exported");
                        }
                        None => println!("{}", json),
                    }
                }
                FavoritesCommand::Import { file } => {
                    let text = fs::read_to_string(&file)
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    let count = favorites.import_json(&text)?;
                    println!("Imported {} favorites", count);
                }
                FavoritesCommand::Clear => {
                    favorites.clear_all()?;
                    println!("All favorites removed");
                }
            }
        }
    }
    Ok(())
}

fn run_tui(db: &Path, config: Config, location: Option<LatLng>) -> Result<()> {
    // Create app before touching the terminal so setup errors print normally
    let mut app = App::new(db, config)?;
    if let Some(location) = location {
        app.set_current_location(location);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Initial load
    app.move_end();

    let event_handler = EventHandler::new(250); // 250ms tick rate

    // Main loop
    let result = run_app(&mut terminal, &mut app, &event_handler);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!(error = %err, "event loop failed");
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_handler: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|f| poimap_tui::ui::render(f, app))?;

        match event_handler.next()? {
            Event::Key(key) => poimap_tui::event::handle_key_event(key, app),
            Event::Mouse(mouse) => poimap_tui::event::handle_mouse_event(mouse, app),
            Event::Tick => app.tick(),
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use poimap_core::models::FavoriteCandidate;
    use poimap_core::storage::MemorySlotStore;
    use serde_json::json;

    #[test]
    fn test_remove_by_stored_key_without_coordinates() {
        let favorites = FavoriteRepository::new(MemorySlotStore::new());
        let data = json!([{"resource_id": "x", "category": "aed", "name": "Lost AED", "lat": "abc", "lon": "abc"}]);
        favorites.import_json(&data.to_string()).unwrap();

        let lookup = removal_lookup(&favorites, "aed::x::na::na", None, None, None, None);
        favorites.remove(&lookup).unwrap();
        assert_eq!(favorites.count(), 0);
    }

    #[test]
    fn test_remove_by_parts() {
        let favorites = FavoriteRepository::new(MemorySlotStore::new());
        favorites
            .add(&FavoriteCandidate::new("123", Category::Aed, 33.5902, 130.351903).with_name("Station AED"))
            .unwrap();

        let lookup = removal_lookup(
            &favorites,
            "123",
            Some("aed".to_string()),
            Some(33.5902),
            Some(130.351903),
            None,
        );
        assert_eq!(lookup.key(), "aed::123::33.59020000::130.35190300");
        favorites.remove(&lookup).unwrap();
        assert!(favorites.remove(&lookup).is_err());
    }

    #[test]
    fn test_parse_remove_and_location() {
        let args = Args::try_parse_from([
            "poimap", "favorites", "remove", "123", "--category", "aed", "--lat", "33.59", "--lon", "-130.35",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Some(Command::Favorites {
                action: FavoritesCommand::Remove { lon: Some(lon), .. }
            }) if lon == -130.35
        ));

        let args = Args::try_parse_from(["poimap", "--lat", "35.68", "--lon", "139.77"]).unwrap();
        assert_eq!((args.lat, args.lon), (Some(35.68), Some(139.77)));
        assert!(Args::try_parse_from(["poimap", "--lat", "35.68"]).is_err());
    }
}
