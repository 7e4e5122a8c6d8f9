//! Headliner polls NewsAPI for the articles of a fixed set of sources.
//!
//! - [`api`] - NewsAPI v2 client and payload types
//! - [`refresher`] - the budgeted, cutoff-bounded polling loop
//! - [`settings`] - the TOML settings file

pub mod api;
pub mod refresher;
pub mod settings;
