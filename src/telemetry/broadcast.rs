//! UDP broadcast of telemetry records.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use crate::core::channel::Channel;
use crate::core::os::{ServiceUnit, ShutdownToken, UnitError};
use crate::storage::Record;
use crate::{log_info, log_warn};

const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Blocking service unit draining a telemetry channel onto a UDP broadcast
/// socket, one datagram per record.
///
/// The composition root constructs exactly one instance per telemetry stream
/// and attaches it to a networking lane; the socket is bound during `init`
/// so a bad port fails the lane loud before launch instead of mid-flight.
pub struct UdpBroadcastUnit<R: Record + Send + 'static, const N: usize> {
    name: String,
    channel: &'static Channel<R, N>,
    port: u16,
    destination: SocketAddr,
    recv_timeout: Duration,
    socket: Option<UdpSocket>,
    scratch: Vec<u8>,
}

impl<R: Record + Send + 'static, const N: usize> UdpBroadcastUnit<R, N> {
    /// Creates a broadcaster sending to `port` on the local broadcast
    /// address.
    pub fn new(name: &str, channel: &'static Channel<R, N>, port: u16) -> Self {
        Self {
            name: name.to_string(),
            channel,
            port,
            destination: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, port)),
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            socket: None,
            scratch: vec![0u8; R::WIDTH],
        }
    }

    /// Overrides the destination (point-to-point telemetry, test harnesses).
    pub fn set_destination(&mut self, destination: SocketAddr) {
        self.destination = destination;
    }

    /// How long one drain attempt waits before re-checking for shutdown.
    pub fn set_recv_timeout(&mut self, timeout: Duration) {
        self.recv_timeout = timeout;
    }
}

impl<R: Record + Send + 'static, const N: usize> ServiceUnit for UdpBroadcastUnit<R, N> {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) -> Result<(), UnitError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, self.port))?;
        socket.set_broadcast(true)?;
        self.socket = Some(socket);
        log_info!("{}: telemetry broadcast ready on port {}", self.name, self.port);
        Ok(())
    }

    fn service(&mut self, shutdown: &ShutdownToken) {
        let Some(socket) = self.socket.take() else {
            log_warn!("{}: started without a socket, unit idle", self.name);
            return;
        };

        while !shutdown.is_signaled() {
            match self.channel.recv(self.recv_timeout) {
                Ok(record) => {
                    record.encode(&mut self.scratch);
                    if let Err(err) = socket.send_to(&self.scratch, self.destination) {
                        log_warn!("{}: broadcast send failed: {}", self.name, err);
                    }
                }
                // Quiet channel: just re-check for shutdown.
                Err(_) => {}
            }
        }

        self.socket = Some(socket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::FastFrame;
    use std::thread;

    fn frame(seq: u64) -> FastFrame {
        FastFrame {
            timestamp_us: seq,
            accel_mps2: [0.0, 0.0, seq as f32],
            gyro_rads: [0.0; 3],
        }
    }

    #[test]
    fn broadcasts_each_record_as_one_datagram() {
        static CHANNEL: Channel<FastFrame, 8> = Channel::new();

        let receiver = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind receiver");
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .expect("set timeout");
        let destination = receiver.local_addr().expect("receiver addr");

        let mut unit = UdpBroadcastUnit::new("bcast", &CHANNEL, 0);
        unit.set_destination(destination);
        unit.set_recv_timeout(Duration::from_millis(10));
        unit.init().expect("socket binds");

        let shutdown = ShutdownToken::new();
        let worker = {
            let shutdown = shutdown.clone();
            thread::spawn(move || {
                unit.service(&shutdown);
            })
        };

        for seq in 0..3 {
            CHANNEL
                .send(frame(seq), Duration::from_millis(100))
                .expect("capacity available");
        }

        let mut buf = [0u8; 64];
        for seq in 0..3u64 {
            let (len, _) = receiver.recv_from(&mut buf).expect("datagram arrives");
            assert_eq!(len, FastFrame::WIDTH);
            assert_eq!(FastFrame::decode(&buf[..len]), frame(seq));
        }

        shutdown.signal();
        worker.join().expect("worker exits");
    }

    #[test]
    fn init_failure_surfaces_as_unit_error() {
        static CHANNEL: Channel<FastFrame, 2> = Channel::new();

        // Two binds on the same explicit port: the second init must fail.
        let first = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).expect("bind probe");
        let taken_port = first.local_addr().expect("probe addr").port();

        let mut unit = UdpBroadcastUnit::new("bcast", &CHANNEL, taken_port);
        assert!(matches!(unit.init(), Err(UnitError::Io(_))));
    }
}
