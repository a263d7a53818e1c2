pub mod loader;
pub mod types;

pub use loader::{get_settings, init_settings, load_settings};
pub use types::Settings;
