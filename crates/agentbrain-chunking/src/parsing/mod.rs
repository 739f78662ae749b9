pub mod languages;

pub use languages::{get_language_config, get_language_from_extension, LanguageConfig};
