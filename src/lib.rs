//! # Earthpaper Library
//!
//! Internal library for the earthpaper binary: live full-disk Earth
//! wallpapers with a projected star field.
//!
//! ## Architecture
//!
//! - **Entry Point**: [`EarthPaper`] acquires resources and runs the daemon
//! - **Acquisition**: `acquisition` fetches, retries, preprocesses and publishes
//!   one disk per ten-minute bucket on an epoch-aligned schedule
//! - **Cache**: `cache` maps instants to buckets and decides freshness
//! - **Imaging**: `imaging` holds the preprocessor, night backgrounds and the
//!   wallpaper compositor
//! - **Sky**: `sky` loads the star catalog and projects it around the Earth
//! - **Requests**: `request` validates wallpaper parameters, `service` renders them
//! - **Infrastructure**: configuration, logging, lock file, signals, clocks

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod common;

pub mod acquisition;
pub mod args;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod imaging;
pub mod io;
pub mod request;
pub mod service;
pub mod sky;
pub mod time;

mod earthpaper;

#[cfg(any(test, feature = "testing-support"))]
pub mod testing;

pub use earthpaper::EarthPaper;
