//! Antenna angular-speed estimation
//!
//! A one-dimensional Kalman filter over a sliding window of timestamped
//! angle observations. The output drives the sector timing fields
//! (`scan_time`, `time_increment`): spokes only carry angles, so rotation
//! speed has to be estimated from their arrival times.
//!
//! The `prediction_variance` recursion below blends the previous value
//! with the squared innovation instead of using the textbook constant-Q
//! update. The effect is a self-tuning process noise during spin-up, and
//! the behaviour is kept exactly as the field-proven filter has it.

use std::collections::VecDeque;
use std::f64::consts::{PI, TAU};
use std::time::{Duration, Instant};

const MEASUREMENT_VARIANCE: f64 = 0.045 * 0.045;
const PROCESS_NOISE_VARIANCE: f64 = 0.0015 * 0.0015;

/// Observations older than this are evicted from the window
const WINDOW_DURATION: Duration = Duration::from_millis(750);

/// A gap at least this long resets the filter
const MAX_MEASUREMENT_GAP: Duration = Duration::from_millis(450);

/// Sliding-window scalar Kalman filter for antenna rotation speed.
///
/// Feed it `(time, angle)` pairs with monotonic times and angles in
/// `[0, 2π)`; it returns the current speed estimate in rad/s, signed by
/// rotation direction. A measurement gap of 0.45 s or more resets the
/// filter, which shows up as a single `0.0` output.
#[derive(Debug)]
pub struct AngularSpeedEstimator {
    angular_speed: f64,
    measured_angular_speed: f64,
    prediction_error: f64,
    prediction_variance: f64,
    variance: f64,
    window: VecDeque<(Instant, f64)>,
}

impl AngularSpeedEstimator {
    pub fn new() -> AngularSpeedEstimator {
        AngularSpeedEstimator {
            angular_speed: 0.0,
            measured_angular_speed: 0.0,
            prediction_error: 0.0,
            prediction_variance: 0.0,
            variance: 1.0,
            window: VecDeque::new(),
        }
    }

    /// Ingest one observation and return the updated speed estimate.
    pub fn update(&mut self, t: Instant, angle: f64) -> f64 {
        if let Some(&(newest, _)) = self.window.back() {
            if t.saturating_duration_since(newest) >= MAX_MEASUREMENT_GAP {
                self.reset();
                self.window.push_back((t, angle));
                return 0.0;
            }
        }

        while let Some(&(oldest, _)) = self.window.front() {
            if t.saturating_duration_since(oldest) > WINDOW_DURATION {
                self.window.pop_front();
            } else {
                break;
            }
        }

        if let (Some(&(oldest, oldest_angle)), Some(&(_, newest_angle))) =
            (self.window.front(), self.window.back())
        {
            // Rotation direction from the freshest step; a jump larger
            // than π is a wrap across 0/2π, not a direction change.
            let mut positive = angle > newest_angle;
            if (angle - newest_angle).abs() > PI {
                positive = !positive;
            }

            let mut angle_difference = angle - oldest_angle;
            if positive && angle_difference < 0.0 {
                angle_difference += TAU;
            }
            if !positive && angle_difference > 0.0 {
                angle_difference -= TAU;
            }

            let mut dt = t.saturating_duration_since(oldest).as_secs_f64();
            if dt <= 0.0 {
                dt = 1e-6;
            }
            self.measured_angular_speed = angle_difference / dt;

            let factor = self.prediction_variance / MEASUREMENT_VARIANCE;
            let predicted_variance = self.variance + PROCESS_NOISE_VARIANCE * factor;
            let gain = predicted_variance / (predicted_variance + MEASUREMENT_VARIANCE);

            self.prediction_error = self.measured_angular_speed - self.angular_speed;
            self.prediction_variance = gain * self.prediction_variance
                + (1.0 - gain) * self.prediction_error * self.prediction_error;
            self.angular_speed += gain * self.prediction_error;
            self.variance = (1.0 - gain) * predicted_variance;
        }

        self.window.push_back((t, angle));
        self.angular_speed
    }

    fn reset(&mut self) {
        self.angular_speed = 0.0;
        self.measured_angular_speed = 0.0;
        self.prediction_error = 0.0;
        self.prediction_variance = 0.0;
        self.variance = 1.0;
        self.window.clear();
    }

    /// Current speed estimate in rad/s
    pub fn angular_speed(&self) -> f64 {
        self.angular_speed
    }

    /// Latest raw measurement in rad/s
    pub fn measured_angular_speed(&self) -> f64 {
        self.measured_angular_speed
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn prediction_variance(&self) -> f64 {
        self.prediction_variance
    }
}

impl Default for AngularSpeedEstimator {
    fn default() -> Self {
        AngularSpeedEstimator::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_INTERVAL: Duration = Duration::from_millis(40); // 25 Hz

    /// Feed `count` noise-free samples of a constant rotation and return
    /// the last estimate.
    fn spin(
        estimator: &mut AngularSpeedEstimator,
        base: Instant,
        start: u32,
        count: u32,
        omega: f64,
    ) -> f64 {
        let mut last = 0.0;
        for i in start..start + count {
            let t = base + SAMPLE_INTERVAL * i;
            let angle = (omega * SAMPLE_INTERVAL.as_secs_f64() * i as f64).rem_euclid(TAU);
            last = estimator.update(t, angle);
        }
        last
    }

    #[test]
    fn test_converges_to_constant_speed() {
        for omega in [6.28, 2.5, -2.5] {
            let mut estimator = AngularSpeedEstimator::new();
            let estimate = spin(&mut estimator, Instant::now(), 0, 15, omega);
            assert!(
                (estimate - omega).abs() <= 0.01 * omega.abs(),
                "estimate {} for true speed {}",
                estimate,
                omega
            );
        }
    }

    #[test]
    fn test_gap_resets_filter() {
        let base = Instant::now();
        let mut estimator = AngularSpeedEstimator::new();
        spin(&mut estimator, base, 0, 10, 6.28);
        assert!(estimator.angular_speed() > 6.0);

        // 0.5 s pause, then the same rotation again
        let resume = base + SAMPLE_INTERVAL * 9 + Duration::from_millis(500);
        assert_eq!(estimator.update(resume, 1.0), 0.0);
        assert_eq!(estimator.variance(), 1.0);
        assert_eq!(estimator.prediction_variance(), 0.0);
        assert_eq!(estimator.measured_angular_speed(), 0.0);

        // The post-reset window still holds the triggering sample
        let mut last = 0.0;
        for i in 1..15u32 {
            let t = resume + SAMPLE_INTERVAL * i;
            let angle = (1.0 + 6.28 * SAMPLE_INTERVAL.as_secs_f64() * i as f64).rem_euclid(TAU);
            last = estimator.update(t, angle);
        }
        assert!((last - 6.28).abs() <= 0.0628, "reconverged to {}", last);
    }

    #[test]
    fn test_wrap_is_a_small_positive_step() {
        let base = Instant::now();
        let mut estimator = AngularSpeedEstimator::new();
        // Constant +5 rad/s rotation crossing the 2π seam
        let mut last = 0.0;
        for i in 0..6u32 {
            let t = base + Duration::from_millis(100 * i as u64);
            let angle = (5.0 + 0.5 * i as f64).rem_euclid(TAU);
            last = estimator.update(t, angle);
        }
        // Crossing 2π must read as continued positive rotation, not a
        // large negative jump
        assert!(last > 4.0, "wrap produced {}", last);
        assert!((estimator.measured_angular_speed() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_gap_just_under_threshold() {
        let base = Instant::now();
        let mut estimator = AngularSpeedEstimator::new();
        estimator.update(base, 0.0);
        let speed = estimator.update(base + Duration::from_millis(440), 1.0);
        assert!(speed != 0.0, "0.44 s is not a gap");
    }

    #[test]
    fn test_window_eviction() {
        let base = Instant::now();
        let mut estimator = AngularSpeedEstimator::new();
        // 1.2 s of samples; only the last 0.75 s may remain
        spin(&mut estimator, base, 0, 30, 2.5);
        assert!(estimator.window.len() <= 20);
    }
}
