//! Discovery beacon exchange
//!
//! Halo radars are located by sending an address-request datagram to a
//! well-known multicast group. The radar answers with a beacon that embeds
//! its own address plus the multicast group/port for each of its three
//! per-radar streams (spoke data, reports, commands). Dual-range radars
//! answer with two endpoint blocks ("A" and "B"); each block is driven as
//! an independent radar.

use std::net::{Ipv4Addr, SocketAddrV4};

use serde::{Deserialize, Serialize};

use super::{c_string, WireSocketAddrV4};
use crate::error::ParseError;

/// Discovery multicast group for Gen3+/HALO radars
pub const DISCOVERY_ADDR: Ipv4Addr = Ipv4Addr::new(236, 6, 7, 5);
pub const DISCOVERY_PORT: u16 = 6878;

/// Address request packet - send to the discovery group to solicit beacons
pub const ADDRESS_REQUEST: [u8; 2] = [0x01, 0xB1];

/// Beacon response header (first 2 bytes)
const BEACON_HEADER: [u8; 2] = [0x01, 0xB2];

/// Common beacon header
#[derive(Deserialize, Debug, Copy, Clone)]
#[repr(C, packed)]
pub struct BeaconHeader {
    pub id: u16,
    pub serial_no: [u8; 16], // ASCII serial number, zero terminated
    pub radar_addr: WireSocketAddrV4, // DHCP address of the radar
    _filler1: [u8; 12],
    _addr1: WireSocketAddrV4,
    _filler2: [u8; 4],
    _addr2: WireSocketAddrV4,
    _filler3: [u8; 10],
    _addr3: WireSocketAddrV4,
    _filler4: [u8; 4],
    _addr4: WireSocketAddrV4,
}

/// Endpoint triple for one radar (the "A" or "B" half of a dual-range set)
#[derive(Deserialize, Debug, Copy, Clone)]
#[repr(C, packed)]
pub struct BeaconEndpoints {
    _filler1: [u8; 10],
    pub data: WireSocketAddrV4, // Spoke data multicast group
    _filler2: [u8; 4],
    pub send: WireSocketAddrV4, // Command send group
    _filler3: [u8; 4],
    pub report: WireSocketAddrV4, // Report multicast group
}

/// Single-range beacon (Halo 20 and friends)
#[derive(Deserialize, Debug, Copy, Clone)]
#[repr(C, packed)]
pub struct BeaconSingle {
    pub header: BeaconHeader,
    pub a: BeaconEndpoints,
}

/// Dual-range beacon (Halo 20+, 24, 3000 etc.)
#[derive(Deserialize, Debug, Copy, Clone)]
#[repr(C, packed)]
pub struct BeaconDual {
    pub header: BeaconHeader,
    pub a: BeaconEndpoints,
    pub b: BeaconEndpoints,
}

pub const BEACON_SINGLE_SIZE: usize = std::mem::size_of::<BeaconSingle>();
pub const BEACON_DUAL_SIZE: usize = std::mem::size_of::<BeaconDual>();

/// The addresses identifying one radar, as learned from its beacon.
///
/// Created by discovery; cloned into the facade that drives the radar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSet {
    /// Local interface address the beacon was heard on
    pub interface: Ipv4Addr,
    /// The radar's own address
    pub radar: Ipv4Addr,
    /// Radar serial number from the beacon
    pub serial: String,
    /// "A" or "B" for dual-range radars, `None` for single-range
    pub suffix: Option<String>,
    /// Spoke data multicast group
    pub data: SocketAddrV4,
    /// Report multicast group
    pub report: SocketAddrV4,
    /// Command group
    pub send: SocketAddrV4,
}

impl AddressSet {
    /// Short identifier used in log messages.
    pub fn key(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}-{}", self.radar, suffix),
            None => self.radar.to_string(),
        }
    }
}

impl std::fmt::Display for AddressSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (data {}, report {}, send {}) via {}",
            self.key(),
            self.data,
            self.report,
            self.send,
            self.interface
        )
    }
}

/// Check whether a datagram is a beacon response
pub fn is_beacon(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == BEACON_HEADER[0] && data[1] == BEACON_HEADER[1]
}

/// Parse a beacon response heard on `interface`.
///
/// Returns one [`AddressSet`] per endpoint block; dual-range radars yield
/// two ("A" and "B").
pub fn parse_beacon(data: &[u8], interface: Ipv4Addr) -> Result<Vec<AddressSet>, ParseError> {
    if data.len() < 2 {
        return Err(ParseError::TooShort {
            expected: 2,
            actual: data.len(),
        });
    }
    if !is_beacon(data) {
        return Err(ParseError::InvalidHeader {
            expected: BEACON_HEADER.to_vec(),
            actual: data[0..2].to_vec(),
        });
    }

    if data.len() >= BEACON_DUAL_SIZE {
        let beacon: BeaconDual = bincode::deserialize(&data[..BEACON_DUAL_SIZE])?;
        let radar = beacon.header.radar_addr.to_socket_addr();
        let serial = c_string(&beacon.header.serial_no).ok_or_else(|| {
            ParseError::InvalidPacket("beacon serial number is not ASCII".into())
        })?;
        Ok(vec![
            address_set(interface, &radar, &serial, Some("A"), &beacon.a),
            address_set(interface, &radar, &serial, Some("B"), &beacon.b),
        ])
    } else if data.len() >= BEACON_SINGLE_SIZE {
        let beacon: BeaconSingle = bincode::deserialize(&data[..BEACON_SINGLE_SIZE])?;
        let radar = beacon.header.radar_addr.to_socket_addr();
        let serial = c_string(&beacon.header.serial_no).ok_or_else(|| {
            ParseError::InvalidPacket("beacon serial number is not ASCII".into())
        })?;
        Ok(vec![address_set(interface, &radar, &serial, None, &beacon.a)])
    } else {
        Err(ParseError::TooShort {
            expected: BEACON_SINGLE_SIZE,
            actual: data.len(),
        })
    }
}

fn address_set(
    interface: Ipv4Addr,
    radar: &SocketAddrV4,
    serial: &str,
    suffix: Option<&str>,
    endpoints: &BeaconEndpoints,
) -> AddressSet {
    AddressSet {
        interface,
        radar: *radar.ip(),
        serial: serial.to_string(),
        suffix: suffix.map(str::to_string),
        data: endpoints.data.to_socket_addr(),
        report: endpoints.report.to_socket_addr(),
        send: endpoints.send.to_socket_addr(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_addr(buf: &mut Vec<u8>, addr: [u8; 4], port: u16) {
        buf.extend_from_slice(&addr);
        buf.extend_from_slice(&port.to_be_bytes());
    }

    fn push_endpoints(buf: &mut Vec<u8>, base: u8) {
        buf.extend_from_slice(&[0; 10]);
        push_addr(buf, [236, 6, 7, base], 6678); // data
        buf.extend_from_slice(&[0; 4]);
        push_addr(buf, [236, 6, 7, base + 1], 6679); // send
        buf.extend_from_slice(&[0; 4]);
        push_addr(buf, [236, 6, 7, base + 2], 6680); // report
    }

    fn beacon_bytes(dual: bool) -> Vec<u8> {
        let mut buf = vec![0x01, 0xB2];
        buf.extend_from_slice(b"1810300132\0\0\0\0\0\0"); // serial
        push_addr(&mut buf, [10, 0, 0, 42], 2054); // radar address
        buf.extend_from_slice(&[0; 12]);
        push_addr(&mut buf, [10, 0, 0, 42], 2052);
        buf.extend_from_slice(&[0; 4]);
        push_addr(&mut buf, [10, 0, 0, 42], 2053);
        buf.extend_from_slice(&[0; 10]);
        push_addr(&mut buf, [10, 0, 0, 42], 2055);
        buf.extend_from_slice(&[0; 4]);
        push_addr(&mut buf, [10, 0, 0, 42], 2056);
        push_endpoints(&mut buf, 8);
        if dual {
            push_endpoints(&mut buf, 13);
        }
        buf
    }

    #[test]
    fn test_beacon_sizes() {
        assert_eq!(BEACON_SINGLE_SIZE, 114);
        assert_eq!(BEACON_DUAL_SIZE, 150);
    }

    #[test]
    fn test_parse_single_beacon() {
        let data = beacon_bytes(false);
        assert_eq!(data.len(), BEACON_SINGLE_SIZE);
        let nic = Ipv4Addr::new(192, 168, 1, 2);

        let sets = parse_beacon(&data, nic).unwrap();
        assert_eq!(sets.len(), 1);
        let set = &sets[0];
        assert_eq!(set.interface, nic);
        assert_eq!(set.radar, Ipv4Addr::new(10, 0, 0, 42));
        assert_eq!(set.serial, "1810300132");
        assert_eq!(set.suffix, None);
        assert_eq!(set.data, "236.6.7.8:6678".parse().unwrap());
        assert_eq!(set.send, "236.6.7.9:6679".parse().unwrap());
        assert_eq!(set.report, "236.6.7.10:6680".parse().unwrap());
    }

    #[test]
    fn test_parse_dual_beacon() {
        let data = beacon_bytes(true);
        assert_eq!(data.len(), BEACON_DUAL_SIZE);

        let sets = parse_beacon(&data, Ipv4Addr::UNSPECIFIED).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].suffix.as_deref(), Some("A"));
        assert_eq!(sets[1].suffix.as_deref(), Some("B"));
        assert_eq!(sets[1].data, "236.6.7.13:6678".parse().unwrap());
        assert_eq!(sets[0].key(), "10.0.0.42-A");
    }

    #[test]
    fn test_reject_non_beacon() {
        assert!(parse_beacon(&ADDRESS_REQUEST, Ipv4Addr::UNSPECIFIED).is_err());
        assert!(parse_beacon(&[0x01], Ipv4Addr::UNSPECIFIED).is_err());
        assert!(matches!(
            parse_beacon(&[0x01, 0xB2, 0x00], Ipv4Addr::UNSPECIFIED),
            Err(ParseError::TooShort { .. })
        ));
    }
}
