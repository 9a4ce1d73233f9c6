/*!
 * Hotspot Connection Setter
 * Wi-Fi scan/connect via OS tools, fixed-size image cropping
 * and a flat KEY=VALUE env file editor
 */

pub mod config;
pub mod connectivity;
pub mod crop;
pub mod envfile;
pub mod error;
pub mod gallery;
pub mod network;

pub use config::AppConfig;
pub use error::{Error, Result};
