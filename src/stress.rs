//! Repeated-read loop for provoking the MSC endpoint double-arming bug.
//!
//! The target firmware re-arms its bulk-in endpoint while a transfer is
//! still in flight if reads of the same LBA arrive back to back with just
//! the right spacing. The loop here reads LBA 0 over and over with a fixed
//! pause between reads; an I/O failure mid-loop means the device dropped
//! off the bus, which is exactly the signal we are fishing for.

use crate::error::DeviceError;
use crate::sector::{self, SECTOR_SIZE};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Source of LBA-0 reads, one open/read/close cycle per call.
pub trait SectorSource {
    fn read_lba0(&mut self, sector_size: usize) -> Result<Vec<u8>, DeviceError>;
}

/// Reads LBA 0 of a real device node, reopening the device each time.
pub struct DeviceSectorSource {
    path: PathBuf,
}

impl DeviceSectorSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SectorSource for DeviceSectorSource {
    fn read_lba0(&mut self, sector_size: usize) -> Result<Vec<u8>, DeviceError> {
        Ok(sector::read_sector(&self.path, 0, sector_size)?)
    }
}

/// Pacing between iterations, injectable so tests run with zero delay.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Real blocking pause. The pacing gives the device firmware time to
/// process the previous transaction; it is part of the trigger protocol,
/// not a throttle.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StressConfig {
    pub iterations: u32,
    pub delay: Duration,
    pub sector_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            delay: Duration::from_millis(10),
            sector_size: SECTOR_SIZE,
        }
    }
}

/// How a stress run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StressOutcome {
    /// A read failed with an I/O error: the device likely disconnected,
    /// i.e. the firmware bug fired.
    Triggered,
    /// Every iteration completed without incident.
    CompletedClean,
    /// A non-I/O failure stopped the loop; ambiguous, not counted as a
    /// confirmed trigger.
    UnexpectedFailure,
}

impl StressOutcome {
    pub fn triggered(&self) -> bool {
        matches!(self, StressOutcome::Triggered)
    }
}

#[derive(Debug)]
pub struct StressReport {
    pub outcome: StressOutcome,
    /// Iterations that completed successfully before the loop ended.
    pub completed: u32,
    /// The error that stopped the loop, for `Triggered` and
    /// `UnexpectedFailure` outcomes.
    pub failure: Option<DeviceError>,
}

/// Runs the repeated-read loop.
///
/// `on_read` is called after each successful read with the 1-based
/// iteration number and the byte count returned. The loop stops early on
/// the first failure; it never retries, since a retry could eat the very
/// disconnect this tool exists to observe.
pub fn run<S, P>(
    source: &mut S,
    sleeper: &mut P,
    config: &StressConfig,
    mut on_read: impl FnMut(u32, usize),
) -> StressReport
where
    S: SectorSource,
    P: Sleeper,
{
    let mut completed = 0;

    for iteration in 1..=config.iterations {
        match source.read_lba0(config.sector_size) {
            Ok(data) => {
                on_read(iteration, data.len());
                completed += 1;
            }
            Err(err @ DeviceError::Io(_)) => {
                return StressReport {
                    outcome: StressOutcome::Triggered,
                    completed,
                    failure: Some(err),
                };
            }
            Err(err) => {
                return StressReport {
                    outcome: StressOutcome::UnexpectedFailure,
                    completed,
                    failure: Some(err),
                };
            }
        }

        sleeper.sleep(config.delay);
    }

    StressReport {
        outcome: StressOutcome::CompletedClean,
        completed,
        failure: None,
    }
}
