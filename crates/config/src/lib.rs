// Configuration loading

pub mod credentials;
pub mod settings;

pub use credentials::{get_access_token, KeyLookup, KeySource};
pub use settings::{Settings, SettingsError};
