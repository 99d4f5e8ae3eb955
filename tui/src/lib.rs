pub mod app;
pub mod config;
pub mod event;
pub mod markers;
pub mod ui;

pub use app::App;
pub use config::{load_config, Config};
pub use event::{Event, EventHandler};
