//! Halo wire protocol
//!
//! Pure `&[u8]` ↔ structured-frame functions for the three UDP streams a
//! Halo radar uses: spoke data, reports and commands, plus the discovery
//! beacon exchange. No I/O happens here.
//!
//! All multi-byte integers on the wire are little-endian, except the port
//! numbers embedded in beacon responses, which are network byte order.

pub mod beacon;
pub mod command;
pub mod data;
pub mod report;

use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddrV4};

/// Socket address with a known fixed layout, as embedded in beacon frames.
#[derive(Deserialize, Debug, Copy, Clone)]
#[repr(C, packed)]
pub struct WireSocketAddrV4 {
    pub addr: [u8; 4],
    pub port: [u8; 2], // network byte order
}

impl WireSocketAddrV4 {
    pub fn to_socket_addr(self) -> SocketAddrV4 {
        SocketAddrV4::new(
            Ipv4Addr::new(self.addr[0], self.addr[1], self.addr[2], self.addr[3]),
            u16::from_be_bytes(self.port),
        )
    }
}

/// Extract a NUL-terminated ASCII string from a fixed-size field.
pub(crate) fn c_string(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).ok().map(str::to_string)
}
