//! Command frame synthesis
//!
//! User commands are `(name, value)` string pairs; this module turns them
//! into the vendor's `..C1` control datagrams. Values are validated against
//! the control schema before any bytes are produced, so a failed command
//! never reaches the wire.

use crate::controls::{self, ControlKind, DOPPLER_MODE_OPTIONS, LEVEL_OPTIONS};
use crate::controls::{SCAN_SPEED_OPTIONS, SEA_STATE_OPTIONS};
use crate::error::CommandError;

/// Asks the radar to send report 03
pub const REQUEST_03_REPORT: [u8; 2] = [0x04, 0xC2];

/// Asks the radar to send reports 02, 03, 04, 06 and 08
pub const REQUEST_MANY_REPORT: [u8; 2] = [0x01, 0xC2];

/// Keeps the radar's primary range active
pub const STAY_ON: [u8; 2] = [0xA0, 0xC1];

/// Synthesise the datagrams for one control change.
///
/// A single logical change can need more than one datagram (`status` is
/// preceded by a wake frame, for example), so the result is a list sent in
/// order.
pub fn encode_command(name: &str, value: &str) -> Result<Vec<Vec<u8>>, CommandError> {
    match name {
        "status" => {
            let v = match value {
                "standby" => 0x00,
                "transmit" => 0x01,
                _ => return Err(invalid(name, value)),
            };
            Ok(vec![vec![0x00, 0xC1, 0x01], vec![0x01, 0xC1, v]])
        }
        "range" => {
            let meters = numeric_in_schema_range(name, value)?;
            let decimeters = (meters * 10.0) as u32;
            let mut cmd = vec![0x03, 0xC1];
            cmd.extend_from_slice(&decimeters.to_le_bytes());
            Ok(vec![cmd])
        }
        "bearing_alignment" => {
            let degrees = numeric_in_schema_range(name, value)?;
            let deci_degrees = ((degrees * 10.0) as i32).rem_euclid(3600) as u16;
            let mut cmd = vec![0x05, 0xC1];
            cmd.extend_from_slice(&deci_degrees.to_le_bytes());
            Ok(vec![cmd])
        }
        "gain" => auto_level_command(name, value, 0x00),
        "gain_mode" => mode_flag_command(name, value, 0x00),
        "sea_clutter" => {
            if value == "auto" {
                return Ok(vec![sea_clutter_frame(true, 0.0)]);
            }
            let level = numeric_in_schema_range(name, value)?;
            Ok(vec![sea_clutter_frame(false, level)])
        }
        "sea_clutter_mode" => match value {
            "auto" => Ok(vec![sea_clutter_frame(true, 0.0)]),
            "manual" => Ok(vec![sea_clutter_frame(false, 0.0)]),
            _ => Err(invalid(name, value)),
        },
        "auto_sea_clutter_nudge" => {
            let nudge = numeric_in_schema_range(name, value)?;
            Ok(vec![vec![
                0x11,
                0xC1,
                0x01,
                0x00,
                (nudge as i32 as i8) as u8,
                0x04,
            ]])
        }
        "rain_clutter" => {
            let level = numeric_in_schema_range(name, value)?;
            Ok(vec![level_command(0x04, false, level)])
        }
        "sidelobe_suppression" => auto_level_command(name, value, 0x05),
        "sidelobe_suppression_mode" => mode_flag_command(name, value, 0x05),
        "mode" => {
            let byte = controls::mode_wire_value(value).ok_or_else(|| invalid(name, value))?;
            Ok(vec![vec![0x10, 0xC1, byte]])
        }
        "sea_state" => enum_command(name, value, SEA_STATE_OPTIONS, 0x0B),
        "interference_rejection" => enum_command(name, value, LEVEL_OPTIONS, 0x08),
        "target_expansion" => enum_command(name, value, LEVEL_OPTIONS, 0x12),
        "scan_speed" => enum_command(name, value, SCAN_SPEED_OPTIONS, 0x0F),
        "noise_rejection" => enum_command(name, value, LEVEL_OPTIONS, 0x21),
        "target_separation" => enum_command(name, value, LEVEL_OPTIONS, 0x22),
        "doppler_mode" => enum_command(name, value, DOPPLER_MODE_OPTIONS, 0x23),
        "doppler_speed" => {
            let speed = numeric_in_schema_range(name, value)?;
            let cm_per_s = (speed * 100.0).round() as u16;
            let mut cmd = vec![0x24, 0xC1];
            cmd.extend_from_slice(&cm_per_s.to_le_bytes());
            Ok(vec![cmd])
        }
        "antenna_height" => {
            let meters = numeric_in_schema_range(name, value)?;
            let millimeters = (meters * 1000.0).round() as u32;
            let mut cmd = vec![0x30, 0xC1, 0x01, 0x00, 0x00, 0x00];
            cmd.extend_from_slice(&millimeters.to_le_bytes());
            Ok(vec![cmd])
        }
        "lights" => enum_command(name, value, LEVEL_OPTIONS, 0x31),
        _ => Err(CommandError::UnknownControl(name.to_string())),
    }
}

fn invalid(name: &str, value: &str) -> CommandError {
    CommandError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Parse a numeric value and check it against the schema range for `name`.
///
/// `*_mode` companions share their base control's schema entry.
fn numeric_in_schema_range(name: &str, value: &str) -> Result<f64, CommandError> {
    let base = name.strip_suffix("_mode").unwrap_or(name);
    let (min, max) = match controls::schema_entry(base).map(|entry| entry.kind) {
        Some(ControlKind::Float { min, max }) => (min as f64, max as f64),
        Some(ControlKind::FloatWithAuto { min, max, .. }) => (min as f64, max as f64),
        _ => return Err(CommandError::UnknownControl(name.to_string())),
    };
    let parsed: f64 = value.trim().parse().map_err(|_| invalid(name, value))?;
    if parsed < min || parsed > max {
        return Err(CommandError::OutOfRange {
            name: name.to_string(),
            value: parsed,
            min,
            max,
        });
    }
    Ok(parsed)
}

/// Map the user 0..100 range to the wire's 0..255 magnitude byte.
fn scale_100_to_byte(value: f64) -> u8 {
    (value * 255.0 / 100.0).clamp(0.0, 255.0) as u8
}

/// The 11-byte `0x06C1` frame shared by the gain/rain/sidelobe family:
/// sub-op, auto flag word, magnitude byte.
fn level_command(sub_op: u8, auto: bool, level: f64) -> Vec<u8> {
    let mut cmd = vec![0x06, 0xC1, sub_op, 0x00, 0x00, 0x00];
    cmd.extend_from_slice(&(auto as u32).to_le_bytes());
    cmd.push(scale_100_to_byte(level));
    cmd
}

/// Halo sea clutter uses its own opcode: auto flag word, magnitude byte.
fn sea_clutter_frame(auto: bool, level: f64) -> Vec<u8> {
    let mut cmd = vec![0x11, 0xC1];
    cmd.extend_from_slice(&(auto as u32).to_le_bytes());
    cmd.push(scale_100_to_byte(level));
    cmd
}

/// Auto-capable magnitude control: the literal `"auto"` engages auto mode,
/// a number sets a manual level.
fn auto_level_command(name: &str, value: &str, sub_op: u8) -> Result<Vec<Vec<u8>>, CommandError> {
    if value == "auto" {
        return Ok(vec![level_command(sub_op, true, 0.0)]);
    }
    let level = numeric_in_schema_range(name, value)?;
    Ok(vec![level_command(sub_op, false, level)])
}

/// `*_mode` companion of an auto-capable control.
fn mode_flag_command(name: &str, value: &str, sub_op: u8) -> Result<Vec<Vec<u8>>, CommandError> {
    match value {
        "auto" => Ok(vec![level_command(sub_op, true, 0.0)]),
        "manual" => Ok(vec![level_command(sub_op, false, 0.0)]),
        _ => Err(invalid(name, value)),
    }
}

fn enum_command(
    name: &str,
    value: &str,
    options: &[&str],
    op: u8,
) -> Result<Vec<Vec<u8>>, CommandError> {
    let index = options
        .iter()
        .position(|option| *option == value)
        .ok_or_else(|| invalid(name, value))?;
    Ok(vec![vec![op, 0xC1, index as u8]])
}
