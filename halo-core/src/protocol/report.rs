//! Report frame decoding
//!
//! Reports arrive on the report stream and carry the radar's current
//! parameter values. The first two bytes identify the report; each known id
//! has a fixed layout. Decoding produces `(name, value)` pairs in the same
//! string vocabulary the control schema uses, ready to merge into a
//! [`StateMap`](crate::StateMap).

use serde::Deserialize;

use super::c_string;
use crate::controls::{self, LEVEL_OPTIONS, SCAN_SPEED_OPTIONS, SEA_STATE_OPTIONS};
use crate::controls::DOPPLER_MODE_OPTIONS;
use crate::error::ParseError;

/// Report 01 - status (0x01 0xC4, 18 bytes)
#[derive(Deserialize, Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct Report01 {
    pub what: u8,
    pub command: u8,
    pub status: u8,
    _u00: [u8; 15],
}

pub const REPORT_01_SIZE: usize = std::mem::size_of::<Report01>();

/// Report 02 - primary controls (0x02 0xC4, 99 bytes)
#[derive(Deserialize, Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct Report02 {
    pub what: u8,               // 0x02
    pub command: u8,            // 0xC4
    pub range: [u8; 4],         // 2..6, decimeters
    _u00: u8,                   // 6
    pub mode: u8,               // 7
    pub gain_auto: u8,          // 8
    _u01: [u8; 3],              // 9..12
    pub gain: u8,               // 12
    pub sea_auto: u8,           // 13
    _u02: [u8; 3],              // 14..17
    pub sea: [u8; 4],           // 17..21
    _u03: u8,                   // 21
    pub rain: u8,               // 22
    _u04: [u8; 11],             // 23..34
    pub interference_rejection: u8, // 34
    _u05: [u8; 3],              // 35..38
    pub target_expansion: u8,   // 38
    _u06: [u8; 3],              // 39..42
    _target_boost: u8,          // 42, not exposed on Halo
    _u07: [u8; 32],             // 43..75
    _u08: [u8; 24],             // 75..99
}

pub const REPORT_02_SIZE: usize = std::mem::size_of::<Report02>();

/// Report 04 - installation settings (0x04 0xC4, 66 bytes)
#[derive(Deserialize, Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct Report04 {
    pub what: u8,               // 0x04
    pub command: u8,            // 0xC4
    _u00: [u8; 4],              // 2..6
    pub bearing_alignment: [u8; 2], // 6..8, deci-degrees
    _u01: [u8; 2],              // 8..10
    pub antenna_height: [u8; 2], // 10..12, millimeters
    _u02: [u8; 7],              // 12..19
    pub accent_light: u8,       // 19
    _u03a: [u8; 32],            // 20..52
    _u03b: [u8; 14],            // 52..66
}

pub const REPORT_04_SIZE: usize = std::mem::size_of::<Report04>();

/// Report 08 - advanced settings (0x08 0xC4, 18 bytes)
#[derive(Deserialize, Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct Report08 {
    pub what: u8,                     // 0x08
    pub command: u8,                  // 0xC4
    pub sea_state: u8,                // 2
    _local_interference_rejection: u8, // 3, report 02 is authoritative
    pub scan_speed: u8,               // 4
    pub sidelobe_suppression_auto: u8, // 5
    _u06: u8,
    _u07: u8,
    _u08: u8,
    pub sidelobe_suppression: u8, // 9
    _u10: [u8; 2],            // 10..12
    pub noise_rejection: u8,  // 12
    pub target_separation: u8, // 13
    _sea_clutter: u8,         // 14, report 02 is authoritative
    pub auto_sea_clutter: i8, // 15
    _u16: u8,
    _u17: u8,
}

pub const REPORT_08_SIZE: usize = std::mem::size_of::<Report08>();

/// Report 08 extension carrying Doppler settings (21 bytes total)
#[derive(Deserialize, Debug, Clone, Copy)]
#[repr(C, packed)]
pub struct Report08Doppler {
    pub base: Report08,
    pub doppler_mode: u8,
    pub doppler_speed: [u8; 2], // cm/s
}

pub const REPORT_08_DOPPLER_SIZE: usize = std::mem::size_of::<Report08Doppler>();

const REPORT_03_MIN_SIZE: usize = 3;
const REPORT_06_MIN_SIZE: usize = 12;

type Pairs = Vec<(String, String)>;

/// Decode one report datagram into state-map pairs.
///
/// Recognised reports with no user-visible fields (`03C4`, `06C4`, `12C4`)
/// decode to an empty list. Ids outside the documented set return
/// [`ParseError::UnknownReport`].
pub fn parse_report(data: &[u8]) -> Result<Pairs, ParseError> {
    if data.len() < 2 {
        return Err(ParseError::TooShort {
            expected: 2,
            actual: data.len(),
        });
    }

    match (data[0], data[1]) {
        (0x01, 0xC4) => report_01(data),
        (0x02, 0xC4) => report_02(data),
        (0x03, 0xC4) => report_03(data),
        (0x04, 0xC4) => report_04(data),
        (0x06, 0xC4) => report_06(data),
        (0x08, 0xC4) => report_08(data),
        // Sent periodically while transmitting; no known fields
        (0x12, 0xC4) => Ok(Vec::new()),
        (what, command) => Err(ParseError::UnknownReport(u16::from_le_bytes([
            what, command,
        ]))),
    }
}

fn check_len(data: &[u8], expected: usize) -> Result<(), ParseError> {
    if data.len() < expected {
        Err(ParseError::TooShort {
            expected,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

fn push(pairs: &mut Pairs, name: &str, value: impl ToString) {
    pairs.push((name.to_string(), value.to_string()));
}

/// Map a 0..255 wire magnitude to the 0..100 user range.
fn scale_byte_to_100(value: u8) -> u8 {
    ((value as u32 * 100 + 127) / 255) as u8
}

fn push_level(pairs: &mut Pairs, name: &str, options: &[&str], value: u8) {
    match options.get(value as usize) {
        Some(option) => push(pairs, name, option),
        None => log::debug!("Report value {} out of range for {}", value, name),
    }
}

fn report_01(data: &[u8]) -> Result<Pairs, ParseError> {
    check_len(data, REPORT_01_SIZE)?;
    let report: Report01 = bincode::deserialize(&data[..REPORT_01_SIZE])?;

    let status = match report.status {
        0 => "off",
        1 => "standby",
        2 => "transmit",
        5 => "spinning_up",
        other => {
            log::debug!("Unknown radar status {}", other);
            "unknown"
        }
    };
    Ok(vec![("status".to_string(), status.to_string())])
}

fn report_02(data: &[u8]) -> Result<Pairs, ParseError> {
    check_len(data, REPORT_02_SIZE)?;
    let report: Report02 = bincode::deserialize(&data[..REPORT_02_SIZE])?;

    let mut pairs = Vec::new();
    let decimeters = i32::from_le_bytes(report.range);
    push(&mut pairs, "range", decimeters / 10);
    if let Some(mode) = controls::mode_from_wire(report.mode) {
        push(&mut pairs, "mode", mode);
    } else {
        log::debug!("Unknown radar mode byte {}", report.mode);
    }
    push(&mut pairs, "gain", scale_byte_to_100(report.gain));
    push(
        &mut pairs,
        "gain_mode",
        if report.gain_auto > 0 { "auto" } else { "manual" },
    );
    let sea = i32::from_le_bytes(report.sea).clamp(0, 255) as u8;
    push(&mut pairs, "sea_clutter", scale_byte_to_100(sea));
    push(
        &mut pairs,
        "sea_clutter_mode",
        if report.sea_auto > 0 { "auto" } else { "manual" },
    );
    push(&mut pairs, "rain_clutter", scale_byte_to_100(report.rain));
    push_level(
        &mut pairs,
        "interference_rejection",
        LEVEL_OPTIONS,
        report.interference_rejection,
    );
    push_level(
        &mut pairs,
        "target_expansion",
        LEVEL_OPTIONS,
        report.target_expansion,
    );
    Ok(pairs)
}

fn report_03(data: &[u8]) -> Result<Pairs, ParseError> {
    check_len(data, REPORT_03_MIN_SIZE)?;
    // Model/firmware report; nothing in it is a user control
    log::debug!("Radar model byte {:#04X}", data[2]);
    Ok(Vec::new())
}

fn report_04(data: &[u8]) -> Result<Pairs, ParseError> {
    check_len(data, REPORT_04_SIZE)?;
    let report: Report04 = bincode::deserialize(&data[..REPORT_04_SIZE])?;

    let mut pairs = Vec::new();
    let deci_degrees = u16::from_le_bytes(report.bearing_alignment);
    push(&mut pairs, "bearing_alignment", deci_degrees as f64 / 10.0);
    let millimeters = u16::from_le_bytes(report.antenna_height);
    push(&mut pairs, "antenna_height", millimeters as f64 / 1000.0);
    push_level(&mut pairs, "lights", LEVEL_OPTIONS, report.accent_light);
    Ok(pairs)
}

fn report_06(data: &[u8]) -> Result<Pairs, ParseError> {
    check_len(data, REPORT_06_MIN_SIZE)?;
    // Radar name and sector blanking; neither is part of the control set
    if let Some(name) = c_string(&data[6..12]) {
        if !name.is_empty() {
            log::debug!("Radar name {:?}", name);
        }
    }
    Ok(Vec::new())
}

fn report_08(data: &[u8]) -> Result<Pairs, ParseError> {
    check_len(data, REPORT_08_SIZE)?;
    let report: Report08 = bincode::deserialize(&data[..REPORT_08_SIZE])?;

    let mut pairs = Vec::new();
    push_level(&mut pairs, "sea_state", SEA_STATE_OPTIONS, report.sea_state);
    push_level(&mut pairs, "scan_speed", SCAN_SPEED_OPTIONS, report.scan_speed);
    push(
        &mut pairs,
        "sidelobe_suppression",
        scale_byte_to_100(report.sidelobe_suppression),
    );
    push(
        &mut pairs,
        "sidelobe_suppression_mode",
        if report.sidelobe_suppression_auto > 0 {
            "auto"
        } else {
            "manual"
        },
    );
    push_level(
        &mut pairs,
        "noise_rejection",
        LEVEL_OPTIONS,
        report.noise_rejection,
    );
    push_level(
        &mut pairs,
        "target_separation",
        LEVEL_OPTIONS,
        report.target_separation,
    );
    push(&mut pairs, "auto_sea_clutter_nudge", report.auto_sea_clutter);

    // Halo appends Doppler settings
    if data.len() >= REPORT_08_DOPPLER_SIZE {
        let extended: Report08Doppler = bincode::deserialize(&data[..REPORT_08_DOPPLER_SIZE])?;
        push_level(
            &mut pairs,
            "doppler_mode",
            DOPPLER_MODE_OPTIONS,
            extended.doppler_mode,
        );
        let cm_per_s = u16::from_le_bytes(extended.doppler_speed);
        push(&mut pairs, "doppler_speed", cm_per_s as f64 / 100.0);
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
        pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_report_sizes() {
        assert_eq!(REPORT_01_SIZE, 18);
        assert_eq!(REPORT_02_SIZE, 99);
        assert_eq!(REPORT_04_SIZE, 66);
        assert_eq!(REPORT_08_SIZE, 18);
        assert_eq!(REPORT_08_DOPPLER_SIZE, 21);
    }

    #[test]
    fn test_report_01_status() {
        let mut data = vec![0u8; REPORT_01_SIZE];
        data[0] = 0x01;
        data[1] = 0xC4;
        data[2] = 2;

        let pairs = parse_report(&data).unwrap();
        assert_eq!(pairs, vec![("status".to_string(), "transmit".to_string())]);

        data[2] = 5;
        assert_eq!(get(&parse_report(&data).unwrap(), "status"), Some("spinning_up"));
    }

    #[test]
    fn test_report_02_controls() {
        let mut data = vec![0u8; REPORT_02_SIZE];
        data[0] = 0x02;
        data[1] = 0xC4;
        data[2..6].copy_from_slice(&7500i32.to_le_bytes()); // 750 m in decimeters
        data[7] = 4; // weather
        data[8] = 1; // gain auto
        data[12] = 255; // gain = 100
        data[13] = 0; // sea manual
        data[17..21].copy_from_slice(&51i32.to_le_bytes()); // sea = 20
        data[22] = 128; // rain = 50
        data[34] = 2; // interference medium
        data[38] = 3; // target expansion high

        let pairs = parse_report(&data).unwrap();
        assert_eq!(get(&pairs, "range"), Some("750"));
        assert_eq!(get(&pairs, "mode"), Some("weather"));
        assert_eq!(get(&pairs, "gain"), Some("100"));
        assert_eq!(get(&pairs, "gain_mode"), Some("auto"));
        assert_eq!(get(&pairs, "sea_clutter"), Some("20"));
        assert_eq!(get(&pairs, "sea_clutter_mode"), Some("manual"));
        assert_eq!(get(&pairs, "rain_clutter"), Some("50"));
        assert_eq!(get(&pairs, "interference_rejection"), Some("medium"));
        assert_eq!(get(&pairs, "target_expansion"), Some("high"));
    }

    #[test]
    fn test_report_04_installation() {
        let mut data = vec![0u8; REPORT_04_SIZE];
        data[0] = 0x04;
        data[1] = 0xC4;
        data[6..8].copy_from_slice(&55u16.to_le_bytes()); // 5.5 degrees
        data[10..12].copy_from_slice(&2500u16.to_le_bytes()); // 2.5 m
        data[19] = 1; // lights low

        let pairs = parse_report(&data).unwrap();
        assert_eq!(get(&pairs, "bearing_alignment"), Some("5.5"));
        assert_eq!(get(&pairs, "antenna_height"), Some("2.5"));
        assert_eq!(get(&pairs, "lights"), Some("low"));
    }

    #[test]
    fn test_report_08_advanced() {
        let mut data = vec![0u8; REPORT_08_DOPPLER_SIZE];
        data[0] = 0x08;
        data[1] = 0xC4;
        data[2] = 1; // moderate
        data[4] = 2; // scan speed high
        data[5] = 1; // sidelobe auto
        data[9] = 51; // sidelobe = 20
        data[12] = 1; // noise low
        data[13] = 2; // separation medium
        data[15] = (-12i8) as u8;
        data[18] = 2; // approaching only
        data[19..21].copy_from_slice(&1050u16.to_le_bytes()); // 10.5 m/s

        let pairs = parse_report(&data).unwrap();
        assert_eq!(get(&pairs, "sea_state"), Some("moderate"));
        assert_eq!(get(&pairs, "scan_speed"), Some("high"));
        assert_eq!(get(&pairs, "sidelobe_suppression"), Some("20"));
        assert_eq!(get(&pairs, "sidelobe_suppression_mode"), Some("auto"));
        assert_eq!(get(&pairs, "noise_rejection"), Some("low"));
        assert_eq!(get(&pairs, "target_separation"), Some("medium"));
        assert_eq!(get(&pairs, "auto_sea_clutter_nudge"), Some("-12"));
        assert_eq!(get(&pairs, "doppler_mode"), Some("approaching_only"));
        assert_eq!(get(&pairs, "doppler_speed"), Some("10.5"));
    }

    #[test]
    fn test_report_08_without_doppler() {
        let mut data = vec![0u8; REPORT_08_SIZE];
        data[0] = 0x08;
        data[1] = 0xC4;

        let pairs = parse_report(&data).unwrap();
        assert_eq!(get(&pairs, "doppler_mode"), None);
        assert_eq!(get(&pairs, "doppler_speed"), None);
    }

    #[test]
    fn test_silent_reports() {
        let mut model = vec![0u8; 129];
        model[0] = 0x03;
        model[1] = 0xC4;
        assert!(parse_report(&model).unwrap().is_empty());

        let mut name = vec![0u8; 68];
        name[0] = 0x06;
        name[1] = 0xC4;
        name[6..10].copy_from_slice(b"HALO");
        assert!(parse_report(&name).unwrap().is_empty());

        assert!(parse_report(&[0x12, 0xC4, 0, 0]).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_report() {
        assert_eq!(
            parse_report(&[0x0A, 0xC4, 0, 0]),
            Err(ParseError::UnknownReport(0xC40A))
        );
        assert!(matches!(
            parse_report(&[0x01]),
            Err(ParseError::TooShort { .. })
        ));
    }
}
