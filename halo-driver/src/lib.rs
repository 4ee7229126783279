//! # Halo Driver
//!
//! Networked driver for Simrad/Navico Halo marine radars, built on the
//! pure protocol library [`halo_core`].
//!
//! A radar is discovered with [`locator::scan`], then driven by a
//! [`Radar`] facade. The facade owns one OS thread per UDP stream (spoke
//! data, reports, command traffic) plus a heartbeat thread, and hands
//! assembled [`RadarSector`]s and [`ControlSet`] snapshots to the host
//! through its [`RadarSink`]. Dropping the facade stops and joins every
//! thread.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use halo_driver::{locator, ControlSet, Radar, RadarSector, RadarSink};
//!
//! struct Printer;
//!
//! impl RadarSink for Printer {
//!     fn on_sector(&self, sector: RadarSector) {
//!         println!("sector of {} spokes", sector.intensities.len());
//!     }
//!     fn on_state(&self, controls: ControlSet) {
//!         println!("{} controls known", controls.items.len());
//!     }
//! }
//!
//! let found = locator::scan(&[]).unwrap();
//! let radars: Vec<Radar> = found
//!     .into_iter()
//!     .map(|addresses| Radar::new(addresses, Arc::new(Printer)).unwrap())
//!     .collect();
//! for radar in &radars {
//!     radar.send_command("status", "transmit").unwrap();
//! }
//! ```

pub mod error;
pub mod locator;
mod network;
pub mod radar;

pub use error::RadarError;
pub use halo_core::{AddressSet, ControlItem, ControlSet, RadarSector, Spoke};
pub use radar::{Radar, RadarSink, Statistics};
