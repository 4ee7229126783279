//! Spokes and sector assembly
//!
//! The data stream delivers spokes in frames of 32; each frame becomes one
//! [`RadarSector`]: an evenly-angular-spaced window of normalised intensity
//! traces with timing derived from the angular-speed estimator.

use std::f64::consts::{PI, TAU};
use std::time::Instant;

use crate::estimator::AngularSpeedEstimator;
use crate::protocol::data::SAMPLES_PER_SPOKE;

/// One rotational sample from the antenna
#[derive(Debug, Clone, PartialEq)]
pub struct Spoke {
    /// Angle in raw units, 4096 per revolution (0..4095)
    pub angle: u16,
    /// Boat heading in the same units, when the radar knows it
    pub heading: Option<u16>,
    /// Meters to the furthest sample of this spoke
    pub range: f64,
    /// 1024 intensity samples, each 0..15
    pub intensities: Vec<u8>,
}

impl Spoke {
    /// Angle in degrees, clockwise as the device reports it
    pub fn angle_degrees(&self) -> f64 {
        self.angle as f64 * 360.0 / 4096.0
    }
}

/// A collated window of consecutive spokes
///
/// Angles are radians, CCW-positive; `angle_increment` is negative when
/// the antenna sweeps the other way. `scan_time` and `time_increment` are
/// zero until the estimator has locked on to the rotation.
#[derive(Debug, Clone)]
pub struct RadarSector {
    /// Monotonic time at assembly completion
    pub stamp: Instant,
    /// First spoke bearing in radians, within [0, 2π)
    pub angle_start: f64,
    /// Radians between consecutive spokes, signed
    pub angle_increment: f64,
    pub range_min: f64,
    /// Meters, from the first spoke's range code
    pub range_max: f64,
    /// One normalised trace per spoke, values in [0, 1]
    pub intensities: Vec<Vec<f32>>,
    /// Estimated seconds per full revolution
    pub scan_time: f64,
    /// Seconds of dwell per unit of sweep
    pub time_increment: f64,
}

/// Turns spoke frames into [`RadarSector`]s.
///
/// Owns the angular-speed estimator; only the data-receive loop touches
/// it, so there is no locking.
#[derive(Debug, Default)]
pub struct SectorAssembler {
    estimator: AngularSpeedEstimator,
}

/// Convert a device angle (degrees, CW) to the CCW-positive convention.
fn bearing_radians(device_degrees: f64) -> f64 {
    TAU * (360.0 - device_degrees) / 360.0
}

impl SectorAssembler {
    pub fn new() -> SectorAssembler {
        SectorAssembler::default()
    }

    /// Assemble one frame of spokes into a sector, `None` when empty.
    pub fn assemble(&mut self, now: Instant, spokes: &[Spoke]) -> Option<RadarSector> {
        let first = spokes.first()?;
        let last = spokes.last()?;

        let angle_start = bearing_radians(first.angle_degrees());
        let mut angle_end = bearing_radians(last.angle_degrees());
        let angle_increment = if spokes.len() > 1 {
            if angle_end > angle_start && angle_end - angle_start > PI {
                // The frame straddles the 0/2π seam
                angle_end -= TAU;
            }
            (angle_end - angle_start) / (spokes.len() - 1) as f64
        } else {
            0.0
        };
        let angle_start = angle_start.rem_euclid(TAU);

        let intensities = spokes
            .iter()
            .map(|spoke| {
                debug_assert_eq!(spoke.intensities.len(), SAMPLES_PER_SPOKE);
                spoke
                    .intensities
                    .iter()
                    .map(|&sample| sample as f32 / 15.0)
                    .collect()
            })
            .collect();

        let angular_speed = self.estimator.update(now, angle_start);
        let scan_time = if angular_speed != 0.0 {
            TAU / angular_speed.abs()
        } else {
            0.0
        };
        let time_increment = if scan_time > 0.0 {
            angle_increment.abs() / scan_time
        } else {
            0.0
        };

        Some(RadarSector {
            stamp: now,
            angle_start,
            angle_increment,
            range_min: 0.0,
            range_max: first.range,
            intensities,
            scan_time,
            time_increment,
        })
    }

    /// Current rotation estimate in rad/s
    pub fn angular_speed(&self) -> f64 {
        self.estimator.angular_speed()
    }
}
