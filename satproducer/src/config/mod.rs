//! Producer settings from an INI file.
//!
//! Settings structs live in [`settings`], constants in [`defaults`], parsing
//! in `parser` and file loading in `file`.
//!
//! ```
//! use satproducer::config::ProducerSettings;
//!
//! let settings = ProducerSettings::from_ini_str(
//!     "[default]\ninstruments = avhrr/3\nproduct_config_file = products.json\n",
//!     "default",
//! )
//! .unwrap();
//! assert_eq!(settings.instruments, vec!["avhrr/3".to_string()]);
//! ```

pub mod defaults;
mod file;
mod parser;
pub mod settings;

pub use defaults::DEFAULT_SECTION;
pub use file::SettingsError;
pub use settings::ProducerSettings;
