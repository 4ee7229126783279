//! Radar discovery
//!
//! Probes the vendor discovery multicast group from each candidate local
//! interface and collects beacon responses for a bounded window. Finding
//! nothing is a normal outcome, not an error.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4, UdpSocket};
use std::time::{Duration, Instant};

use network_interface::{NetworkInterface, NetworkInterfaceConfig};

use halo_core::protocol::beacon::{self, AddressSet};

use crate::network;

/// How long one scan listens for beacon responses
const SCAN_WINDOW: Duration = Duration::from_secs(2);

/// Per-socket poll interval while scanning several interfaces
const POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// Probe for radars on the given local interface addresses.
///
/// An empty `hosts` list means every non-loopback IPv4 interface. Each
/// discovered radar appears once; dual-range radars appear as two
/// independent [`AddressSet`]s ("A" and "B").
pub fn scan(hosts: &[Ipv4Addr]) -> io::Result<Vec<AddressSet>> {
    let interfaces = if hosts.is_empty() {
        local_interfaces()?
    } else {
        hosts.to_vec()
    };

    let group = SocketAddrV4::new(beacon::DISCOVERY_ADDR, beacon::DISCOVERY_PORT);
    let mut sockets: Vec<(Ipv4Addr, UdpSocket)> = Vec::new();
    for nic_addr in interfaces {
        match network::create_discovery_socket(&group, &nic_addr, POLL_TIMEOUT) {
            Ok(socket) => {
                if let Err(e) = socket.send_to(&beacon::ADDRESS_REQUEST, group) {
                    log::debug!("{}: probe send failed: {}", nic_addr, e);
                }
                sockets.push((nic_addr, socket));
            }
            Err(e) => {
                log::debug!("{}: no discovery socket: {}", nic_addr, e);
            }
        }
    }

    let mut found: Vec<AddressSet> = Vec::new();
    let mut buf = [0u8; 1024];
    let deadline = Instant::now() + SCAN_WINDOW;
    while Instant::now() < deadline {
        for (nic_addr, socket) in &sockets {
            let (len, source) = match socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if network::is_timeout(&e) => continue,
                Err(e) => {
                    log::debug!("{}: discovery receive failed: {}", nic_addr, e);
                    continue;
                }
            };
            let data = &buf[..len];
            if !beacon::is_beacon(data) {
                continue;
            }
            match beacon::parse_beacon(data, *nic_addr) {
                Ok(sets) => {
                    for set in sets {
                        if found
                            .iter()
                            .any(|known| known.radar == set.radar && known.suffix == set.suffix)
                        {
                            continue;
                        }
                        log::info!("Located radar {}", set);
                        found.push(set);
                    }
                }
                Err(e) => {
                    log::debug!("{}: bad beacon from {}: {}", nic_addr, source, e);
                }
            }
        }
        if sockets.is_empty() {
            break;
        }
    }

    if found.is_empty() {
        log::debug!("Scan finished without finding a radar");
    }
    Ok(found)
}

/// Addresses of all non-loopback IPv4 interfaces.
fn local_interfaces() -> io::Result<Vec<Ipv4Addr>> {
    let interfaces = NetworkInterface::show()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    let mut addresses = Vec::new();
    for interface in interfaces {
        for addr in interface.addr {
            if let IpAddr::V4(v4) = addr.ip() {
                if !v4.is_loopback() && !addresses.contains(&v4) {
                    addresses.push(v4);
                }
            }
        }
    }
    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_local_interfaces_skip_loopback() {
        let addresses = local_interfaces().unwrap();
        assert!(addresses.iter().all(|a| !a.is_loopback()));
    }

    /// A quiet scan yields an empty list, then a scan against a fake
    /// radar on loopback finds it. One test because both talk to the
    /// fixed discovery group.
    #[test]
    fn test_scan_on_loopback() {
        // No answer within the window is an empty list, not an error
        let found = scan(&[Ipv4Addr::LOCALHOST]).unwrap();
        assert!(found.is_empty());

        let group = SocketAddrV4::new(beacon::DISCOVERY_ADDR, beacon::DISCOVERY_PORT);
        let responder =
            network::create_discovery_socket(&group, &Ipv4Addr::LOCALHOST, POLL_TIMEOUT).unwrap();

        let answer = thread::spawn(move || {
            let mut buf = [0u8; 64];
            // Wait for the probe, then multicast a single-range beacon
            // back to the group, the way a real radar advertises itself
            for _ in 0..20 {
                match responder.recv_from(&mut buf) {
                    Ok((len, _)) if buf[..len] == beacon::ADDRESS_REQUEST => {
                        let mut data = vec![0x01u8, 0xB2];
                        data.extend_from_slice(b"FAKEHALO\0\0\0\0\0\0\0\0");
                        data.extend_from_slice(&[127, 0, 0, 1]);
                        data.extend_from_slice(&2054u16.to_be_bytes());
                        data.resize(78, 0);
                        // Endpoint block: data/send/report groups
                        data.extend_from_slice(&[0; 10]);
                        for (last_octet, port) in [(21u8, 16340u16), (22, 16341), (23, 16342)] {
                            data.extend_from_slice(&[239, 254, 7, last_octet]);
                            data.extend_from_slice(&port.to_be_bytes());
                            if last_octet != 23 {
                                data.extend_from_slice(&[0; 4]);
                            }
                        }
                        responder.send_to(&data, group).unwrap();
                        return;
                    }
                    _ => {}
                }
            }
        });

        let found = scan(&[Ipv4Addr::LOCALHOST]).unwrap();
        answer.join().unwrap();

        assert_eq!(found.len(), 1);
        let set = &found[0];
        assert_eq!(set.serial, "FAKEHALO");
        assert_eq!(set.radar, Ipv4Addr::LOCALHOST);
        assert_eq!(set.interface, Ipv4Addr::LOCALHOST);
        assert_eq!(set.data, "239.254.7.21:16340".parse().unwrap());
        assert_eq!(set.send, "239.254.7.22:16341".parse().unwrap());
        assert_eq!(set.report, "239.254.7.23:16342".parse().unwrap());
    }
}
