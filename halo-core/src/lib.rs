//! # Halo Core
//!
//! Platform-independent protocol library for Simrad/Navico Halo marine radars.
//!
//! This crate contains pure parsing, formatting and signal-processing logic
//! with **zero I/O dependencies**. All sockets and threads live in the
//! companion `halo-driver` crate.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  halo-core (platform-independent, no socket/thread deps)  │
//! │  ├── protocol/   (wire format parsing & formatting)       │
//! │  ├── estimator   (antenna angular-speed Kalman filter)    │
//! │  ├── spoke       (scanline → sector assembly)             │
//! │  ├── state       (last-reported control values)           │
//! │  └── controls    (control schema & ControlSet synthesis)  │
//! └───────────────────────────────────────────────────────────┘
//!                             ▲
//!                 ┌───────────┴───────────┐
//!                 │  halo-driver          │
//!                 │  (UDP multicast, OS   │
//!                 │   threads, facade)    │
//!                 └───────────────────────┘
//! ```
//!
//! ## Key Modules
//!
//! - [`protocol`] - Wire protocol parsing and command formatting
//! - [`estimator`] - Angular-speed estimation from timestamped angles
//! - [`spoke`] - Spoke and sector data structures, sector assembly
//! - [`state`] - Cache of last-reported control values
//! - [`controls`] - Control schema and [`ControlSet`] synthesis
//!
//! ## Example: Encoding a control command
//!
//! ```rust
//! use halo_core::protocol::command::encode_command;
//!
//! // One logical control change may expand to several datagrams.
//! let frames = encode_command("range", "750").unwrap();
//! assert_eq!(frames[0][0..2], [0x03, 0xC1]);
//! ```

pub mod controls;
pub mod error;
pub mod estimator;
pub mod protocol;
pub mod spoke;
pub mod state;

// Re-export commonly used types
pub use controls::{ControlItem, ControlSet, ControlType};
pub use error::{CommandError, ParseError};
pub use estimator::AngularSpeedEstimator;
pub use protocol::beacon::AddressSet;
pub use spoke::{RadarSector, SectorAssembler, Spoke};
pub use state::StateMap;
