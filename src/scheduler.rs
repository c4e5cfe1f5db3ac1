//! Fixed-interval poll loop with cooperative shutdown
//!
//! The loop runs one pass, then waits for the interval in short slices and
//! checks the shutdown flag between slices. A pass that has started always
//! runs to completion; shutdown takes effect at the next wait boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use signal_hook::consts::{SIGINT, SIGTERM};

/// Longest single sleep while waiting for the next pass.
const WAIT_SLICE: Duration = Duration::from_millis(200);

/// Shutdown request shared between signal handlers and the poll loop
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag on SIGINT (Ctrl+C) and SIGTERM.
    pub fn install(&self) -> std::io::Result<()> {
        signal_hook::flag::register(SIGINT, Arc::clone(&self.flag))?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&self.flag))?;
        Ok(())
    }

    #[inline]
    pub fn is_signaled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Request shutdown programmatically
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// Runs passes on a fixed delay until shutdown is requested
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Scheduler { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Call `pass` with a running pass number until `shutdown` is signaled.
    ///
    /// # Returns
    /// The number of passes that were run
    pub fn run<F>(&self, shutdown: &ShutdownSignal, mut pass: F) -> usize
    where
        F: FnMut(usize),
    {
        let mut count = 0;
        while !shutdown.is_signaled() {
            count += 1;
            pass(count);
            if !self.wait(shutdown) {
                break;
            }
        }
        count
    }

    /// Sleep for the interval.
    ///
    /// An interval too large to be represented as a deadline waits until
    /// shutdown.
    ///
    /// # Returns
    /// * `true` - The full interval elapsed
    /// * `false` - Shutdown was signaled while waiting
    pub fn wait(&self, shutdown: &ShutdownSignal) -> bool {
        let deadline = Instant::now().checked_add(self.interval);
        loop {
            if shutdown.is_signaled() {
                return false;
            }
            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return true;
                    }
                    WAIT_SLICE.min(deadline - now)
                }
                None => WAIT_SLICE,
            };
            thread::sleep(slice);
        }
    }
}
