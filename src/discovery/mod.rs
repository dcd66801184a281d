pub mod discover_engine;
pub mod filter_menu;
pub mod tokenize;

pub use discover_engine::{discover, DiscoverParams, DiscoverResult, DiscoveredScreen, ScreenAvailability};
pub use filter_menu::FilterMenu;
