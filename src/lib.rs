//! Async Rust client for the EZVIZ / Ys7 open platform device API.
//!
//! Provides app-key/secret token acquisition with expiry tracking, an
//! authenticated HTTP client that picks the regional endpoint and retries
//! once on a server-side token rejection, and typed error mapping for the
//! platform's several response envelope shapes.
//!
//! # Modules
//!
//! - [`auth`]: Token provider with expiry tracking and refresh.
//! - [`client`]: Authenticated HTTP wrapper with region-aware base URL.
//! - [`config`]: Credentials, region, and timeouts (programmatic or env).
//! - [`constants`]: Platform codes and default timeouts.
//! - [`devices`]: Device registration, lookup, listing, capture, defence,
//!   NVR links and stream encryption.
//! - [`envelope`]: Response envelope parsing and error mapping.
//! - [`error`]: Typed error hierarchy (`EzvizError`).
//! - [`logger`]: Optional `tracing` subscriber setup.
//! - [`ptz`]: Pan/tilt/zoom, presets, calibration and panoramas.
//! - [`region`]: The eight regional deployments.
//! - [`upgrade`]: Firmware and module upgrades.
//!
//! # Quick Start
//!
//! ```ignore
//! use ezviz_openapi::auth::TokenProvider;
//! use ezviz_openapi::client::EzvizClient;
//! use ezviz_openapi::config::Config;
//! use ezviz_openapi::devices;
//!
//! let config = Config::new("app-key", "app-secret", "cn")?;
//! let client = EzvizClient::connect(TokenProvider::new(&config)?).await?;
//! let resp = devices::add_device(&client, "427734888", "ABCDEF").await?;
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod config;
pub mod constants;
pub mod devices;
pub mod envelope;
pub mod error;
pub mod logger;
pub mod ptz;
pub mod region;
pub mod upgrade;

pub use client::EzvizClient;
pub use config::Config;
pub use error::{EzvizError, Result};
pub use region::Region;
