//! The per-radar facade
//!
//! A [`Radar`] owns everything needed to drive one radar: a receive thread
//! per UDP stream (spoke data, reports, command traffic), a heartbeat
//! thread, a connected command socket and the shared state the threads
//! maintain. Assembled sectors and control snapshots are handed to the
//! host through its [`RadarSink`]; callbacks run on the producing thread.
//!
//! Threads start in the constructor and are stopped and joined by `Drop`:
//! each loop polls a shared shutdown flag at least once per second, so a
//! dropped facade leaves nothing running.

use std::io;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use halo_core::protocol::{command, data, report};
use halo_core::{AddressSet, ControlSet, ParseError, SectorAssembler, StateMap};

use crate::error::RadarError;
use crate::network;

/// How often the heartbeat considers republishing the control state
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Reports older than this mean the radar has gone quiet
const REPORT_TIMEOUT_MILLIS: u64 = 5_000;

/// Room for a full data frame (8 + 32 × 536 bytes) with slack
const RECEIVE_BUFFER: usize = 32_768;

const NEVER: u64 = u64::MAX;

/// Host callbacks for one radar.
///
/// Both run on the thread that produced the value. Do not call back into
/// [`Radar::send_command`] from `on_sector`/`on_state` on the same thread
/// that delivered the callback; an independent host thread is safe.
pub trait RadarSink: Send + Sync + 'static {
    fn on_sector(&self, sector: halo_core::RadarSector);
    fn on_state(&self, controls: ControlSet);
}

/// Decode and delivery counters, one facade each.
#[derive(Debug, Default)]
pub struct Statistics {
    received_spokes: AtomicUsize,
    broken_spokes: AtomicUsize,
    broken_frames: AtomicUsize,
    broken_reports: AtomicUsize,
    unknown_reports: AtomicUsize,
}

impl Statistics {
    pub fn received_spokes(&self) -> usize {
        self.received_spokes.load(Ordering::Relaxed)
    }
    pub fn broken_spokes(&self) -> usize {
        self.broken_spokes.load(Ordering::Relaxed)
    }
    pub fn broken_frames(&self) -> usize {
        self.broken_frames.load(Ordering::Relaxed)
    }
    pub fn broken_reports(&self) -> usize {
        self.broken_reports.load(Ordering::Relaxed)
    }
    pub fn unknown_reports(&self) -> usize {
        self.unknown_reports.load(Ordering::Relaxed)
    }
}

/// State shared between the facade and its worker threads
struct Shared {
    key: String,
    state: Mutex<StateMap>,
    /// Milliseconds since `started` of the last good report, `NEVER`
    /// before the first one
    last_report: AtomicU64,
    started: Instant,
    shutdown: AtomicBool,
    stats: Statistics,
}

impl Shared {
    fn running(&self) -> bool {
        !self.shutdown.load(Ordering::Relaxed)
    }

    fn touch_last_report(&self) {
        let millis = self.started.elapsed().as_millis() as u64;
        self.last_report.store(millis, Ordering::Relaxed);
    }

    fn report_fresh(&self) -> bool {
        let last = self.last_report.load(Ordering::Relaxed);
        if last == NEVER {
            return false;
        }
        let now = self.started.elapsed().as_millis() as u64;
        now.saturating_sub(last) < REPORT_TIMEOUT_MILLIS
    }
}

/// One radar: sockets, threads, state cache and the host sink.
pub struct Radar {
    addresses: AddressSet,
    shared: Arc<Shared>,
    command_socket: Mutex<UdpSocket>,
    threads: Vec<JoinHandle<()>>,
}

impl Radar {
    /// Join the radar's streams and start the worker threads.
    pub fn new(addresses: AddressSet, sink: Arc<dyn RadarSink>) -> Result<Radar, RadarError> {
        let key = addresses.key();

        let data_socket =
            network::create_udp_multicast_listen(&addresses.data, &addresses.interface)?;
        let report_socket =
            network::create_udp_multicast_listen(&addresses.report, &addresses.interface)?;
        let echo_socket =
            network::create_udp_multicast_listen(&addresses.send, &addresses.interface)?;
        let command_socket = network::create_multicast_send(&addresses.send, &addresses.interface)?;

        log::debug!("{}: streams joined via {}", key, addresses.interface);

        let shared = Arc::new(Shared {
            key,
            state: Mutex::new(StateMap::new()),
            last_report: AtomicU64::new(NEVER),
            started: Instant::now(),
            shutdown: AtomicBool::new(false),
            stats: Statistics::default(),
        });

        let mut threads = Vec::with_capacity(4);
        let spawned = (|| -> io::Result<()> {
            threads.push(spawn_loop("data", &shared, {
                let shared = Arc::clone(&shared);
                let sink = Arc::clone(&sink);
                move || data_loop(&shared, data_socket, &*sink)
            })?);
            threads.push(spawn_loop("report", &shared, {
                let shared = Arc::clone(&shared);
                move || report_loop(&shared, report_socket)
            })?);
            threads.push(spawn_loop("command", &shared, {
                let shared = Arc::clone(&shared);
                move || command_echo_loop(&shared, echo_socket)
            })?);
            threads.push(spawn_loop("heartbeat", &shared, {
                let shared = Arc::clone(&shared);
                move || heartbeat_loop(&shared, &*sink)
            })?);
            Ok(())
        })();
        if let Err(e) = spawned {
            shared.shutdown.store(true, Ordering::Relaxed);
            for handle in threads {
                let _ = handle.join();
            }
            return Err(RadarError::Io(e));
        }

        let radar = Radar {
            addresses,
            shared,
            command_socket: Mutex::new(command_socket),
            threads,
        };

        // Ask the radar to publish its reports now rather than waiting
        // for its periodic cycle.
        if let Err(e) = radar.send_report_requests() {
            log::warn!("{}: report request failed: {}", radar.key(), e);
        }

        Ok(radar)
    }

    pub fn addresses(&self) -> &AddressSet {
        &self.addresses
    }

    pub fn key(&self) -> &str {
        &self.shared.key
    }

    pub fn statistics(&self) -> &Statistics {
        &self.shared.stats
    }

    /// Snapshot of the currently known controls.
    pub fn controls(&self) -> ControlSet {
        let state = self.shared.state.lock().unwrap();
        ControlSet::from_state(&state)
    }

    /// Synthesise and send one control change.
    ///
    /// Completes as soon as the datagrams are written; the change is
    /// observable only once a later report reflects it. Unknown controls
    /// and out-of-range values fail before anything is sent.
    pub fn send_command(&self, name: &str, value: &str) -> Result<(), RadarError> {
        let frames = command::encode_command(name, value)?;
        let socket = self.command_socket.lock().unwrap();
        for frame in &frames {
            socket.send(frame)?;
            log::trace!("{}: sent {:02X?}", self.shared.key, frame);
        }
        Ok(())
    }

    fn send_report_requests(&self) -> Result<(), RadarError> {
        let socket = self.command_socket.lock().unwrap();
        socket.send(&command::REQUEST_03_REPORT)?;
        socket.send(&command::REQUEST_MANY_REPORT)?;
        socket.send(&command::STAY_ON)?;
        Ok(())
    }
}

impl Drop for Radar {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                log::error!("{}: worker thread panicked", self.shared.key);
            }
        }
        log::debug!("{}: stopped", self.shared.key);
    }
}

fn spawn_loop(
    stream: &str,
    shared: &Arc<Shared>,
    body: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{}-{}", shared.key, stream))
        .spawn(body)
}

/// Receive one datagram, distinguishing timeouts from real failures.
fn receive(shared: &Shared, socket: &UdpSocket, buf: &mut [u8], stream: &str) -> Option<usize> {
    loop {
        if !shared.running() {
            return None;
        }
        match socket.recv(buf) {
            Ok(len) => return Some(len),
            Err(e) if network::is_timeout(&e) => continue,
            Err(e) => {
                // A dead interface kills this loop only; the rest of the
                // facade keeps running until the host drops it.
                log::error!("{}: {} receive failed: {}", shared.key, stream, e);
                return None;
            }
        }
    }
}

fn data_loop(shared: &Shared, socket: UdpSocket, sink: &dyn RadarSink) {
    let mut assembler = SectorAssembler::new();
    let mut buf = vec![0u8; RECEIVE_BUFFER];

    while let Some(len) = receive(shared, &socket, &mut buf, "data") {
        match data::parse_data_frame(&buf[..len]) {
            Ok(frame) => {
                shared
                    .stats
                    .received_spokes
                    .fetch_add(frame.spokes.len(), Ordering::Relaxed);
                if frame.broken_spokes > 0 {
                    shared
                        .stats
                        .broken_spokes
                        .fetch_add(frame.broken_spokes, Ordering::Relaxed);
                }
                if let Some(sector) = assembler.assemble(Instant::now(), &frame.spokes) {
                    sink.on_sector(sector);
                }
            }
            Err(e) => {
                shared.stats.broken_frames.fetch_add(1, Ordering::Relaxed);
                log::warn!("{}: dropped data frame ({} bytes): {}", shared.key, len, e);
            }
        }
    }
}

fn report_loop(shared: &Shared, socket: UdpSocket) {
    let mut buf = vec![0u8; 1024];

    while let Some(len) = receive(shared, &socket, &mut buf, "report") {
        match report::parse_report(&buf[..len]) {
            Ok(pairs) => {
                if !pairs.is_empty() {
                    let mut state = shared.state.lock().unwrap();
                    state.apply(pairs);
                }
                shared.touch_last_report();
            }
            Err(ParseError::UnknownReport(id)) => {
                shared.stats.unknown_reports.fetch_add(1, Ordering::Relaxed);
                log::debug!("{}: unknown report {:#06X}, {} bytes", shared.key, id, len);
            }
            Err(e) => {
                shared.stats.broken_reports.fetch_add(1, Ordering::Relaxed);
                log::warn!("{}: dropped report: {}", shared.key, e);
            }
        }
    }
}

/// The command group also carries traffic from other controllers on the
/// network; watching it is useful when diagnosing fights over a control.
fn command_echo_loop(shared: &Shared, socket: UdpSocket) {
    let mut buf = vec![0u8; 1024];

    while let Some(len) = receive(shared, &socket, &mut buf, "command") {
        if len >= 2 {
            log::trace!(
                "{}: command {:02X} {:02X} on the wire, {} bytes",
                shared.key,
                buf[0],
                buf[1],
                len
            );
        }
    }
}

fn heartbeat_loop(shared: &Shared, sink: &dyn RadarSink) {
    loop {
        thread::sleep(HEARTBEAT_INTERVAL);
        if !shared.running() {
            return;
        }
        if !shared.report_fresh() {
            continue;
        }
        let snapshot = shared.state.lock().unwrap().clone();
        sink.on_state(ControlSet::from_state(&snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Mutex;

    use halo_core::{CommandError, RadarSector};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[derive(Default)]
    struct CaptureSink {
        sectors: Mutex<Vec<RadarSector>>,
        states: Mutex<Vec<ControlSet>>,
    }

    impl RadarSink for CaptureSink {
        fn on_sector(&self, sector: RadarSector) {
            self.sectors.lock().unwrap().push(sector);
        }
        fn on_state(&self, controls: ControlSet) {
            self.states.lock().unwrap().push(controls);
        }
    }

    /// Loopback stand-in for a radar's address set. Distinct groups per
    /// test so parallel tests don't hear each other.
    fn loopback_addresses(id: u8) -> AddressSet {
        AddressSet {
            interface: Ipv4Addr::LOCALHOST,
            radar: Ipv4Addr::LOCALHOST,
            serial: "TEST".to_string(),
            suffix: None,
            data: format!("239.254.9.{}:163{:02}", id, id).parse().unwrap(),
            report: format!("239.254.10.{}:164{:02}", id, id).parse().unwrap(),
            send: format!("239.254.11.{}:165{:02}", id, id).parse().unwrap(),
        }
    }

    fn report_sender(addresses: &AddressSet) -> UdpSocket {
        network::create_multicast_send(&addresses.report, &addresses.interface).unwrap()
    }

    #[test]
    fn test_drop_joins_threads() {
        init_logging();
        let sink = Arc::new(CaptureSink::default());
        let radar = Radar::new(loopback_addresses(1), sink).expect("facade");
        thread::sleep(Duration::from_millis(200));

        let dropped_at = Instant::now();
        drop(radar);
        assert!(
            dropped_at.elapsed() < Duration::from_millis(1500),
            "threads not joined within 1.5 s"
        );
    }

    #[test]
    fn test_invalid_commands_send_nothing() {
        init_logging();
        let sink = Arc::new(CaptureSink::default());
        let radar = Radar::new(loopback_addresses(2), sink).expect("facade");

        match radar.send_command("gain", "999") {
            Err(RadarError::Command(CommandError::OutOfRange { .. })) => {}
            other => panic!("expected range error, got {:?}", other.map(|_| ())),
        }
        match radar.send_command("wibble", "1") {
            Err(RadarError::Command(CommandError::UnknownControl(name))) => {
                assert_eq!(name, "wibble")
            }
            other => panic!("expected unknown control, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_reports_drive_state_and_heartbeat() {
        init_logging();
        let sink = Arc::new(CaptureSink::default());
        let addresses = loopback_addresses(3);
        let radar = Radar::new(addresses.clone(), Arc::clone(&sink) as Arc<dyn RadarSink>)
            .expect("facade");

        let sender = report_sender(&addresses);
        let mut status = vec![0u8; 18];
        status[0] = 0x01;
        status[1] = 0xC4;
        status[2] = 2; // transmit
        sender.send(&status).unwrap();
        let mut controls = vec![0u8; 99];
        controls[0] = 0x02;
        controls[1] = 0xC4;
        controls[2..6].copy_from_slice(&7500i32.to_le_bytes());
        sender.send(&controls).unwrap();

        // The heartbeat republishes within a second of a fresh report
        let deadline = Instant::now() + Duration::from_secs(3);
        let published = loop {
            if let Some(set) = sink.states.lock().unwrap().last().cloned() {
                break set;
            }
            assert!(Instant::now() < deadline, "no ControlSet within 3 s");
            thread::sleep(Duration::from_millis(50));
        };

        let status_item = published
            .items
            .iter()
            .find(|item| item.name == "status")
            .expect("status in snapshot");
        assert_eq!(status_item.value, "transmit");

        // The on-demand snapshot agrees
        let snapshot = radar.controls();
        let range = snapshot
            .items
            .iter()
            .find(|item| item.name == "range")
            .expect("range in snapshot");
        assert_eq!(range.value, "750");
    }

    #[test]
    fn test_data_frames_become_sectors() {
        init_logging();
        let sink = Arc::new(CaptureSink::default());
        let addresses = loopback_addresses(4);
        let radar = Radar::new(addresses.clone(), Arc::clone(&sink) as Arc<dyn RadarSink>)
            .expect("facade");

        let sender =
            network::create_multicast_send(&addresses.data, &addresses.interface).unwrap();
        let mut frame = vec![0u8; 8];
        for i in 0..32u16 {
            frame.push(24); // header_len
            frame.push(0x02); // status
            frame.extend_from_slice(&i.to_le_bytes()); // scan number
            frame.extend_from_slice(&[0, 0]); // mark
            frame.extend_from_slice(&0x100u16.to_le_bytes()); // large range
            frame.extend_from_slice(&(i * 2).to_le_bytes()); // angle
            frame.extend_from_slice(&0x8000u16.to_le_bytes()); // no heading
            frame.extend_from_slice(&0x200u16.to_le_bytes()); // small range
            frame.extend_from_slice(&[0; 10]);
            frame.extend(std::iter::repeat(0x33u8).take(512));
        }
        sender.send(&frame).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let sector = loop {
            if let Some(sector) = sink.sectors.lock().unwrap().last().cloned() {
                break sector;
            }
            assert!(Instant::now() < deadline, "no sector within 2 s");
            thread::sleep(Duration::from_millis(20));
        };

        assert_eq!(sector.intensities.len(), 32);
        assert_eq!(sector.intensities[0][0], 3.0 / 15.0);
        assert_eq!(sector.range_max, 256.0 * 1.024);
        assert_eq!(radar.statistics().received_spokes(), 32);
        assert_eq!(radar.statistics().broken_frames(), 0);
    }
}
