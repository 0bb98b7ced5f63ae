//! Vistagram library
//!
//! Photo timeline with a fail-open counter cache in front of PostgreSQL.

use shadow_rs::shadow;
shadow!(build);

pub mod auth;
pub mod blob;
pub mod cache;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod logger;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod services;
pub mod state;
pub mod store;

pub use state::AppState;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
