//! Storage sink: drains a telemetry channel into sample logs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::channel::Channel;
use crate::core::os::{ServiceUnit, ShutdownToken};
use crate::core::phase::{PhaseChange, PhaseObserver};
use crate::storage::{Record, SampleLog, StorageError};
use crate::{log_error, log_info, log_warn};

const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Shared switch selecting the sink's active target log.
///
/// One-way: once flipped to flight it stays there for the life of the
/// process, the same way a vehicle does not return to pad idle mid-mission.
#[derive(Clone, Debug, Default)]
pub struct FlightSwitch {
    flag: Arc<AtomicBool>,
}

impl FlightSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the flight log is the active target.
    pub fn is_flight(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Retargets the sink to the flight log.
    pub fn set_flight(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// Phase observer flipping a [`FlightSwitch`] when its phase is entered.
///
/// Register on the entry list of the boost phase; the sink retargets without
/// pausing its drain loop, so samples queued before the transition are
/// written, not lost.
pub struct FlightModeSwitch {
    switch: FlightSwitch,
}

impl FlightModeSwitch {
    pub fn new(switch: FlightSwitch) -> Self {
        Self { switch }
    }
}

impl<P> PhaseObserver<P> for FlightModeSwitch {
    fn notify(&mut self, _change: &PhaseChange<P>) {
        self.switch.set_flight();
    }
}

/// Blocking service unit draining a channel into sample logs.
///
/// Before flight, records land in the circular idle log (only the most
/// recent pad window matters); after the flight switch flips, they land in
/// the fill-once flight log (the forensic record that must not be lost).
/// The log is owned by this unit alone - producers only ever touch the
/// channel, which is what keeps storage latency out of their loops.
pub struct LogSinkUnit<R: Record + Send + 'static, const N: usize> {
    name: String,
    channel: &'static Channel<R, N>,
    idle_log: SampleLog<R>,
    flight_log: SampleLog<R>,
    switch: FlightSwitch,
    recv_timeout: Duration,
    flight_log_full: bool,
}

impl<R: Record + Send + 'static, const N: usize> LogSinkUnit<R, N> {
    /// Creates a sink writing to `idle_log` until `switch` flips, then to
    /// `flight_log`.
    pub fn new(
        name: &str,
        channel: &'static Channel<R, N>,
        idle_log: SampleLog<R>,
        flight_log: SampleLog<R>,
        switch: FlightSwitch,
    ) -> Self {
        Self {
            name: name.to_string(),
            channel,
            idle_log,
            flight_log,
            switch,
            recv_timeout: DEFAULT_RECV_TIMEOUT,
            flight_log_full: false,
        }
    }

    /// How long one drain attempt waits before re-checking for shutdown.
    pub fn set_recv_timeout(&mut self, timeout: Duration) {
        self.recv_timeout = timeout;
    }

    fn store(&mut self, record: &R) {
        let target = if self.switch.is_flight() {
            &mut self.flight_log
        } else {
            &mut self.idle_log
        };
        match target.write(record) {
            Ok(()) => {}
            Err(StorageError::OutOfSpace) => {
                // Terminal for this log; report once and keep draining so
                // producers never stall on a frozen volume.
                if !self.flight_log_full {
                    self.flight_log_full = true;
                    log_error!(
                        "{}: flight log at capacity, further samples dropped",
                        self.name
                    );
                }
            }
            Err(err) => {
                log_warn!("{}: sample write failed: {}", self.name, err);
            }
        }
    }
}

impl<R: Record + Send + 'static, const N: usize> ServiceUnit for LogSinkUnit<R, N> {
    fn name(&self) -> &str {
        &self.name
    }

    fn service(&mut self, shutdown: &ShutdownToken) {
        while !shutdown.is_signaled() {
            match self.channel.recv(self.recv_timeout) {
                Ok(record) => self.store(&record),
                // Quiet channel: just re-check for shutdown.
                Err(_) => {}
            }
        }

        // Drain what is already queued, then make the volumes durable.
        while let Some(record) = self.channel.try_recv() {
            self.store(&record);
        }
        for log in [&mut self.idle_log, &mut self.flight_log] {
            if let Err(err) = log.flush() {
                log_warn!("{}: flush failed: {}", self.name, err);
            }
        }
        log_info!(
            "{}: sink stopped ({} idle, {} flight records)",
            self.name,
            self.idle_log.record_count(),
            self.flight_log.record_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LogMode;
    use std::thread;
    use tempfile::tempdir;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Tick(u32);

    impl Record for Tick {
        const WIDTH: usize = 4;

        fn encode(&self, buf: &mut [u8]) {
            buf[0..4].copy_from_slice(&self.0.to_le_bytes());
        }

        fn decode(buf: &[u8]) -> Self {
            Self(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
        }
    }

    #[test]
    fn flight_switch_is_one_way_and_shared() {
        let switch = FlightSwitch::new();
        let observer_handle = switch.clone();
        assert!(!switch.is_flight());

        observer_handle.set_flight();
        assert!(switch.is_flight());
    }

    #[test]
    fn observer_flips_the_switch_on_entry() {
        let switch = FlightSwitch::new();
        let mut observer = FlightModeSwitch::new(switch.clone());
        observer.notify(&PhaseChange { from: 0u8, to: 1u8 });
        assert!(switch.is_flight());
    }

    #[test]
    fn records_split_between_idle_and_flight_logs() {
        static CHANNEL: Channel<Tick, 32> = Channel::new();

        let dir = tempdir().expect("tempdir");
        let idle = SampleLog::circular(&dir.path().join("idle.bin"), 16).expect("idle log");
        let flight = SampleLog::fill_once(&dir.path().join("flight.bin"), 16).expect("flight log");
        let switch = FlightSwitch::new();

        let mut unit = LogSinkUnit::new("sink", &CHANNEL, idle, flight, switch.clone());
        unit.set_recv_timeout(Duration::from_millis(5));

        let shutdown = ShutdownToken::new();
        let worker = {
            let shutdown = shutdown.clone();
            thread::spawn(move || unit.service(&shutdown))
        };

        for n in 0..4 {
            CHANNEL
                .send(Tick(n), Duration::from_millis(100))
                .expect("capacity available");
        }
        // Let the sink drain the pad records before the phase flips.
        thread::sleep(Duration::from_millis(50));
        switch.set_flight();
        for n in 4..10 {
            CHANNEL
                .send(Tick(n), Duration::from_millis(100))
                .expect("capacity available");
        }
        thread::sleep(Duration::from_millis(50));
        shutdown.signal();
        worker.join().expect("worker exits");

        let idle_raw = std::fs::read(dir.path().join("idle.bin")).expect("idle file");
        let flight_raw = std::fs::read(dir.path().join("flight.bin")).expect("flight file");
        let idle_ticks: Vec<Tick> = idle_raw.chunks(Tick::WIDTH).map(Tick::decode).collect();
        let flight_ticks: Vec<Tick> = flight_raw.chunks(Tick::WIDTH).map(Tick::decode).collect();

        assert_eq!(idle_ticks, (0..4).map(Tick).collect::<Vec<_>>());
        assert_eq!(flight_ticks, (4..10).map(Tick).collect::<Vec<_>>());
    }

    #[test]
    fn full_flight_log_does_not_stall_the_drain() {
        static CHANNEL: Channel<Tick, 32> = Channel::new();

        let dir = tempdir().expect("tempdir");
        let idle = SampleLog::circular(&dir.path().join("idle.bin"), 4).expect("idle log");
        let flight = SampleLog::fill_once(&dir.path().join("flight.bin"), 2).expect("flight log");
        assert_eq!(flight.mode(), LogMode::FillOnce);

        let switch = FlightSwitch::new();
        switch.set_flight();
        let mut unit = LogSinkUnit::new("sink", &CHANNEL, idle, flight, switch);
        unit.set_recv_timeout(Duration::from_millis(5));

        let shutdown = ShutdownToken::new();
        let worker = {
            let shutdown = shutdown.clone();
            thread::spawn(move || unit.service(&shutdown))
        };

        // Five records into a two-slot flight log: the first two stick, the
        // rest are reported and dropped while the channel keeps moving.
        for n in 0..5 {
            CHANNEL
                .send(Tick(n), Duration::from_millis(100))
                .expect("sink keeps draining");
        }
        thread::sleep(Duration::from_millis(50));
        shutdown.signal();
        worker.join().expect("worker exits");

        let flight_raw = std::fs::read(dir.path().join("flight.bin")).expect("flight file");
        let flight_ticks: Vec<Tick> = flight_raw.chunks(Tick::WIDTH).map(Tick::decode).collect();
        assert_eq!(flight_ticks, vec![Tick(0), Tick(1)]);
        assert!(CHANNEL.is_empty());
    }
}
