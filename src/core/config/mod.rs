pub mod data;
pub mod io;

pub use data::{path_display, Config, ProviderOverride};
pub use io::ConfigError;
