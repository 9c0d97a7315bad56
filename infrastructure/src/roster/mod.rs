//! Roster source adapters.

mod toml_roster;

pub use toml_roster::TomlRosterSource;
