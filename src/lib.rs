// src/lib.rs

//! HAPM, the Home Assistant package manager
//!
//! Keeps a Home Assistant configuration's third-party add-ons (custom
//! integrations and Lovelace plugins hosted on GitHub) in line with a
//! declarative manifest.
//!
//! # Architecture
//!
//! - Manifest: desired packages, parsed and validated before anything runs
//! - Registry: installed packages with their handlers, rehydrated from the lock record
//! - Diff/apply: minimal add/switch/delete plan, applied fail-fast
//! - Lock record: rewritten atomically only after a whole plan succeeded
//! - Handlers: one per package kind, fetching payloads through a `GitSource`

mod error;
pub mod lockfile;
pub mod manager;
pub mod manifest;
pub mod packages;
pub mod report;
pub mod repository;
pub mod version;

pub use error::{Error, Result};
