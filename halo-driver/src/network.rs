//! Multicast socket setup
//!
//! All sockets are blocking with a short read timeout so receive loops can
//! poll their shutdown flag between datagrams.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Type};

/// Receive loops wake at least this often to check for shutdown
pub(crate) const READ_TIMEOUT: Duration = Duration::from_secs(1);

// this will be common for all our sockets
fn new_socket() -> io::Result<socket2::Socket> {
    let socket = socket2::Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    Ok(socket)
}

/// On Windows, unlike all Unix variants, it is improper to bind to the
/// multicast address
///
/// see https://msdn.microsoft.com/en-us/library/windows/desktop/ms737550(v=vs.85).aspx
#[cfg(windows)]
fn bind_to_multicast(
    socket: &socket2::Socket,
    addr: &SocketAddrV4,
    nic_addr: &Ipv4Addr,
) -> io::Result<()> {
    socket.join_multicast_v4(addr.ip(), nic_addr)?;
    let sockaddr = SocketAddr::new((*nic_addr).into(), addr.port());
    socket.bind(&socket2::SockAddr::from(sockaddr))?;
    Ok(())
}

/// On unixes we bind to the multicast address itself, which filters away
/// unrelated unicast traffic on the same port
#[cfg(unix)]
fn bind_to_multicast(
    socket: &socket2::Socket,
    addr: &SocketAddrV4,
    nic_addr: &Ipv4Addr,
) -> io::Result<()> {
    socket.join_multicast_v4(addr.ip(), nic_addr)?;
    let sockaddr = SocketAddr::new((*addr.ip()).into(), addr.port());
    socket.bind(&socket2::SockAddr::from(sockaddr))?;
    Ok(())
}

/// Listen socket joined to `addr` on the interface `nic_addr`.
pub(crate) fn create_udp_multicast_listen(
    addr: &SocketAddrV4,
    nic_addr: &Ipv4Addr,
) -> io::Result<UdpSocket> {
    let socket = new_socket()?;
    bind_to_multicast(&socket, addr, nic_addr)?;

    let socket: UdpSocket = socket.into();
    socket.set_read_timeout(Some(READ_TIMEOUT))?;
    Ok(socket)
}

/// Connected send socket for the multicast group `addr`, transmitting via
/// `nic_addr`.
pub(crate) fn create_multicast_send(
    addr: &SocketAddrV4,
    nic_addr: &Ipv4Addr,
) -> io::Result<UdpSocket> {
    let socket = new_socket()?;
    socket.set_multicast_if_v4(nic_addr)?;
    let local = SocketAddr::new((*nic_addr).into(), 0);
    socket.bind(&socket2::SockAddr::from(local))?;

    let socket: UdpSocket = socket.into();
    socket.connect(SocketAddr::V4(*addr))?;
    Ok(socket)
}

/// Discovery socket on one interface: joined to the discovery group for
/// replies, short timeout so a scan can poll several interfaces.
pub(crate) fn create_discovery_socket(
    group: &SocketAddrV4,
    nic_addr: &Ipv4Addr,
    read_timeout: Duration,
) -> io::Result<UdpSocket> {
    let socket = new_socket()?;
    socket.set_multicast_if_v4(nic_addr)?;
    bind_to_multicast(&socket, group, nic_addr)?;

    let socket: UdpSocket = socket.into();
    socket.set_read_timeout(Some(read_timeout))?;
    Ok(socket)
}

/// A receive timeout, as opposed to a real socket failure.
pub(crate) fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
