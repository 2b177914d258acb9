// Copyright (c) 2025 Sean McNamara <smcnam@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Flush coordination for a single logger instance.
//!
//! One background task owns the pending list and the durable sink. It
//! selects over three event sources:
//!
//! - the control channel (`FlushNow`, `Exit`)
//! - the flush timer, a one-shot sleep re-armed after every timer flush
//! - the incoming line queue
//!
//! Every mutation of `pending` and every sink write happens inside that task,
//! so callers only ever touch the channel senders.

use anyhow::{Context, Result, bail};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time;

use crate::constants::{
    CONTROL_CHANNEL_CAPACITY, DEFAULT_FLUSH_INTERVAL, DEFAULT_FLUSH_THRESHOLD,
    DEFAULT_QUEUE_CAPACITY,
};
use crate::sink::DurableSink;

/// Signals carried on the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    FlushNow,
    Exit,
}

/// Lifecycle of the coordinator task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Waiting for the next event.
    Running,
    /// Writing the pending list to the sink.
    Draining,
    /// Terminal. The task has ended and the sink is closed.
    Stopped,
}

/// Settings fixed for the lifetime of a coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub flush_threshold: usize,
    pub flush_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Point-in-time counters published by the coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Lines held in the pending list after the last event.
    pub pending: usize,
    /// Lines successfully written to the sink.
    pub lines_written: u64,
    /// Flushes that wrote at least one line.
    pub flushes: u64,
    /// Flush attempts that failed and left the pending list for a retry.
    pub failed_flushes: u64,
}

/// State shared between the coordinator task and its handle.
struct Shared {
    state: Mutex<CoordinatorState>,
    condvar: Condvar,
    flush_threshold: AtomicUsize,
    pending: AtomicUsize,
    lines_written: AtomicU64,
    flushes: AtomicU64,
    failed_flushes: AtomicU64,
}

impl Shared {
    fn new(flush_threshold: usize) -> Self {
        Self {
            state: Mutex::new(CoordinatorState::Running),
            condvar: Condvar::new(),
            flush_threshold: AtomicUsize::new(flush_threshold),
            pending: AtomicUsize::new(0),
            lines_written: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            failed_flushes: AtomicU64::new(0),
        }
    }

    fn set_state(&self, next: CoordinatorState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
            self.condvar.notify_all();
        }
    }

    fn state(&self) -> CoordinatorState {
        self.state
            .lock()
            .map(|state| *state)
            .unwrap_or(CoordinatorState::Stopped)
    }
}

/// The single consumer task. Sole owner of `pending` and `sink`.
struct FlushCoordinator {
    incoming: mpsc::Receiver<String>,
    control_rx: mpsc::Receiver<Control>,
    /// Used to post our own threshold-triggered flush requests.
    control_tx: mpsc::Sender<Control>,
    pending: Vec<String>,
    sink: Option<Box<dyn DurableSink>>,
    flush_interval: Duration,
    queue_capacity: usize,
    shared: Arc<Shared>,
}

impl FlushCoordinator {
    async fn run(mut self) {
        let timer = time::sleep(self.flush_interval);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                biased;

                signal = self.control_rx.recv() => match signal {
                    Some(Control::FlushNow) => self.flush(),
                    Some(Control::Exit) | None => break,
                },
                () = &mut timer => {
                    self.flush();
                    timer
                        .as_mut()
                        .reset(time::Instant::now() + self.flush_interval);
                }
                line = self.incoming.recv() => match line {
                    Some(line) => self.accept(line),
                    None => {
                        // Every producer is gone; nothing more can arrive.
                        self.flush();
                        break;
                    }
                },
            }
        }

        self.stop();
    }

    fn accept(&mut self, line: String) {
        self.pending.push(line);
        self.publish_pending();

        let threshold = self.shared.flush_threshold.load(Ordering::Relaxed);
        if self.pending.len() >= threshold {
            // A full channel already holds a signal that will flush these lines.
            let _ = self.control_tx.try_send(Control::FlushNow);
        }
    }

    /// Move lines that are already queued into `pending`, preserving order.
    fn absorb_queued(&mut self) {
        for _ in 0..self.queue_capacity {
            match self.incoming.try_recv() {
                Ok(line) => self.pending.push(line),
                Err(_) => break,
            }
        }
    }

    fn flush(&mut self) {
        self.shared.set_state(CoordinatorState::Draining);
        self.absorb_queued();
        self.write_pending();
        self.publish_pending();
        self.shared.set_state(CoordinatorState::Running);
    }

    fn write_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        let result = self
            .pending
            .iter()
            .try_for_each(|line| sink.write_line(line))
            .and_then(|()| sink.sync());

        match result {
            Ok(()) => {
                let written = self.pending.len() as u64;
                self.pending.clear();
                self.publish_pending();
                self.shared.flushes.fetch_add(1, Ordering::Relaxed);
                // Published last so a reader that sees the new total also sees the counters above.
                self.shared
                    .lines_written
                    .fetch_add(written, Ordering::Release);
            }
            Err(e) => {
                self.shared.failed_flushes.fetch_add(1, Ordering::Relaxed);
                eprintln!(
                    "Warning: Failed to flush {} log line(s), keeping them for the next flush: {}",
                    self.pending.len(),
                    e
                );
            }
        }
    }

    fn publish_pending(&self) {
        self.shared
            .pending
            .store(self.pending.len(), Ordering::Relaxed);
    }

    fn stop(&mut self) {
        if !self.pending.is_empty() {
            eprintln!(
                "Warning: Logger stopped with {} unflushed line(s)",
                self.pending.len()
            );
        }
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.close() {
                eprintln!("Warning: Failed to close log sink: {}", e);
            }
        }
        self.shared.set_state(CoordinatorState::Stopped);
    }
}

/// Owner-side handle to a running coordinator.
///
/// Submitting lines and posting control signals block while the respective
/// channel is full. None of these methods may be called from inside an async
/// runtime.
pub struct CoordinatorHandle {
    lines: mpsc::Sender<String>,
    control: mpsc::Sender<Control>,
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl CoordinatorHandle {
    /// Start a coordinator on its own thread.
    ///
    /// A `None` sink yields a coordinator whose flushes are no-ops.
    pub fn spawn(sink: Option<Box<dyn DurableSink>>, config: CoordinatorConfig) -> Result<Self> {
        if config.flush_threshold == 0 {
            bail!("Flush threshold must be positive");
        }
        let queue_capacity = config.queue_capacity.max(1);

        let (lines_tx, lines_rx) = mpsc::channel(queue_capacity);
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared::new(config.flush_threshold));

        let coordinator = FlushCoordinator {
            incoming: lines_rx,
            control_rx,
            control_tx: control_tx.clone(),
            pending: Vec::new(),
            sink,
            flush_interval: config.flush_interval,
            queue_capacity,
            shared: Arc::clone(&shared),
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .context("Failed to build flush coordinator runtime")?;

        let thread = thread::Builder::new()
            .name("flush-coordinator".into())
            .spawn(move || runtime.block_on(coordinator.run()))
            .context("Failed to spawn flush coordinator thread")?;

        Ok(Self {
            lines: lines_tx,
            control: control_tx,
            shared,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Enqueue a line for durable writing, blocking while the queue is full.
    ///
    /// Lines submitted after the coordinator stopped are discarded.
    pub fn submit(&self, line: String) {
        let _ = self.lines.blocking_send(line);
    }

    /// Ask for an immediate flush. Returns before the flush happens.
    pub fn request_flush(&self) {
        let _ = self.control.blocking_send(Control::FlushNow);
    }

    /// Ask the coordinator to stop. Lines not flushed by then are lost.
    pub fn request_exit(&self) {
        let _ = self.control.blocking_send(Control::Exit);
    }

    /// Update the pending-list length that triggers a flush request.
    pub fn set_flush_threshold(&self, threshold: usize) -> Result<()> {
        if threshold == 0 {
            bail!("Flush threshold must be positive, got {}", threshold);
        }
        self.shared
            .flush_threshold
            .store(threshold, Ordering::Relaxed);
        Ok(())
    }

    pub fn flush_threshold(&self) -> usize {
        self.shared.flush_threshold.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> CoordinatorState {
        self.shared.state()
    }

    pub fn stats(&self) -> CoordinatorStats {
        let lines_written = self.shared.lines_written.load(Ordering::Acquire);
        CoordinatorStats {
            pending: self.shared.pending.load(Ordering::Relaxed),
            lines_written,
            flushes: self.shared.flushes.load(Ordering::Relaxed),
            failed_flushes: self.shared.failed_flushes.load(Ordering::Relaxed),
        }
    }

    /// Wait until the coordinator reaches `Stopped`.
    ///
    /// Returns `true` if it stopped, `false` if the timeout was reached.
    pub fn wait_stopped(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        let Ok(mut state) = self.shared.state.lock() else {
            return false;
        };

        while start.elapsed() < timeout {
            if *state == CoordinatorState::Stopped {
                return true;
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            match self.shared.condvar.wait_timeout(state, remaining) {
                Ok((guard, _)) => state = guard,
                Err(_) => return false,
            }
        }

        *state == CoordinatorState::Stopped
    }

    /// Join the coordinator thread. Only the first call waits.
    pub fn join(&self) {
        let handle = self.thread.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                eprintln!("Warning: Flush coordinator thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::io;

    const DEADLINE: Duration = Duration::from_secs(5);

    fn wait_until(condition: impl FnMut() -> bool) -> bool {
        wait_until_within(DEADLINE, condition)
    }

    fn wait_until_within(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < limit {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    fn config(flush_threshold: usize, flush_interval: Duration) -> CoordinatorConfig {
        CoordinatorConfig {
            flush_threshold,
            flush_interval,
            ..CoordinatorConfig::default()
        }
    }

    fn spawn_memory(flush_threshold: usize, flush_interval: Duration) -> (CoordinatorHandle, MemorySink) {
        let sink = MemorySink::new();
        let handle = CoordinatorHandle::spawn(
            Some(Box::new(sink.clone())),
            config(flush_threshold, flush_interval),
        )
        .unwrap();
        (handle, sink)
    }

    /// Fails the first `failures` writes, then behaves like a memory sink.
    struct FlakySink {
        failures: usize,
        inner: MemorySink,
    }

    impl DurableSink for FlakySink {
        fn write_line(&mut self, line: &str) -> io::Result<()> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(io::Error::other("disk unavailable"));
            }
            self.inner.write_line(line)
        }
    }

    #[test]
    fn test_threshold_triggers_flush() {
        let (handle, sink) = spawn_memory(3, Duration::from_secs(60));

        handle.submit("A\n".to_string());
        handle.submit("B\n".to_string());
        handle.submit("C\n".to_string());

        assert!(wait_until(|| handle.stats().lines_written == 3));
        assert_eq!(sink.contents(), "A\nB\nC\n");
        assert_eq!(handle.stats().pending, 0);
        assert_eq!(handle.stats().flushes, 1);

        handle.request_exit();
        assert!(handle.wait_stopped(DEADLINE));
    }

    #[test]
    fn test_below_threshold_waits_for_timer() {
        let (handle, sink) = spawn_memory(100, Duration::from_millis(50));

        handle.submit("tick\n".to_string());

        assert!(wait_until(|| handle.stats().lines_written == 1));
        assert_eq!(sink.contents(), "tick\n");
        assert_eq!(handle.stats().pending, 0);

        handle.request_exit();
        assert!(handle.wait_stopped(DEADLINE));
    }

    #[test]
    fn test_timer_keeps_firing_after_rearm() {
        let (handle, sink) = spawn_memory(100, Duration::from_millis(30));

        handle.submit("one\n".to_string());
        assert!(wait_until(|| handle.stats().lines_written == 1));
        handle.submit("two\n".to_string());
        assert!(wait_until(|| handle.stats().lines_written == 2));

        assert_eq!(sink.lines(), vec!["one\n", "two\n"]);
        assert_eq!(handle.stats().flushes, 2);
        handle.request_exit();
        assert!(handle.wait_stopped(DEADLINE));
    }

    #[test]
    fn test_empty_flush_writes_nothing() {
        let (handle, sink) = spawn_memory(10, Duration::from_secs(60));

        handle.request_flush();
        handle.request_flush();
        handle.request_exit();

        assert!(handle.wait_stopped(DEADLINE));
        assert!(sink.lines().is_empty());
        assert_eq!(handle.stats(), CoordinatorStats::default());
    }

    #[test]
    fn test_flush_then_exit_persists_queued_lines() {
        let (handle, sink) = spawn_memory(1_000, Duration::from_secs(60));

        let expected: Vec<String> = (0..250).map(|i| format!("line {}\n", i)).collect();
        for line in &expected {
            handle.submit(line.clone());
        }
        handle.request_flush();
        handle.request_exit();

        assert!(handle.wait_stopped(DEADLINE));
        assert_eq!(sink.lines(), expected);
        assert_eq!(handle.state(), CoordinatorState::Stopped);
    }

    #[test]
    fn test_exit_without_flush_drops_pending() {
        let (handle, sink) = spawn_memory(100, Duration::from_secs(60));

        handle.submit("lost\n".to_string());
        handle.request_exit();

        assert!(handle.wait_stopped(DEADLINE));
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_failed_flush_is_retried_wholesale() {
        let inner = MemorySink::new();
        let sink = FlakySink {
            failures: 1,
            inner: inner.clone(),
        };
        let handle = CoordinatorHandle::spawn(
            Some(Box::new(sink)),
            config(100, Duration::from_millis(20)),
        )
        .unwrap();

        handle.submit("first\n".to_string());
        handle.submit("second\n".to_string());

        assert!(wait_until(|| handle.stats().lines_written == 2));
        assert_eq!(inner.contents(), "first\nsecond\n");
        assert!(handle.stats().failed_flushes >= 1);
        assert_eq!(handle.stats().pending, 0);

        handle.request_exit();
        assert!(handle.wait_stopped(DEADLINE));
    }

    /// Accepts the first line of a batch, then fails once on the second.
    struct FailsMidBatch {
        writes: usize,
        inner: MemorySink,
    }

    impl DurableSink for FailsMidBatch {
        fn write_line(&mut self, line: &str) -> io::Result<()> {
            self.writes += 1;
            if self.writes == 2 {
                return Err(io::Error::other("short write"));
            }
            self.inner.write_line(line)
        }
    }

    #[test]
    fn test_retry_after_partial_write_repeats_accepted_lines() {
        let inner = MemorySink::new();
        let sink = FailsMidBatch {
            writes: 0,
            inner: inner.clone(),
        };
        let handle = CoordinatorHandle::spawn(
            Some(Box::new(sink)),
            config(2, Duration::from_secs(60)),
        )
        .unwrap();

        handle.submit("a\n".to_string());
        handle.submit("b\n".to_string());
        assert!(wait_until(|| handle.stats().failed_flushes == 1));
        assert_eq!(handle.stats().pending, 2);

        handle.request_flush();
        assert!(wait_until(|| handle.stats().lines_written == 2));
        assert_eq!(inner.lines(), vec!["a\n", "a\n", "b\n"]);
        assert_eq!(handle.stats().failed_flushes, 1);

        handle.request_exit();
        assert!(handle.wait_stopped(DEADLINE));
    }

    #[test]
    fn test_missing_sink_makes_flush_a_no_op() {
        let handle = CoordinatorHandle::spawn(None, config(1, Duration::from_millis(20))).unwrap();

        handle.submit("nowhere\n".to_string());
        handle.request_flush();

        assert!(wait_until(|| handle.stats().pending == 1));
        assert_eq!(handle.stats().lines_written, 0);

        handle.request_exit();
        assert!(handle.wait_stopped(DEADLINE));
    }

    #[test]
    fn test_threshold_updates() {
        let (handle, _sink) = spawn_memory(5, Duration::from_secs(60));

        assert_eq!(handle.flush_threshold(), 5);
        handle.set_flush_threshold(2).unwrap();
        assert_eq!(handle.flush_threshold(), 2);

        assert!(handle.set_flush_threshold(0).is_err());
        assert_eq!(handle.flush_threshold(), 2);

        handle.request_exit();
        handle.join();
        assert_eq!(handle.state(), CoordinatorState::Stopped);
    }

    #[test]
    fn test_lowered_threshold_applies_to_next_check() {
        let (handle, sink) = spawn_memory(100, Duration::from_secs(60));

        handle.set_flush_threshold(2).unwrap();
        handle.submit("x\n".to_string());
        handle.submit("y\n".to_string());

        assert!(wait_until(|| handle.stats().lines_written == 2));
        assert_eq!(sink.contents(), "x\ny\n");
        assert_eq!(handle.stats().flushes, 1);

        handle.request_exit();
        assert!(handle.wait_stopped(DEADLINE));
    }

    #[test]
    fn test_rejected_threshold_keeps_flushing_at_old_value() {
        let (handle, sink) = spawn_memory(100, Duration::from_secs(60));
        handle.set_flush_threshold(2).unwrap();

        assert!(handle.set_flush_threshold(0).is_err());
        handle.submit("p\n".to_string());
        assert!(!wait_until_within(Duration::from_millis(100), || {
            handle.stats().lines_written > 0
        }));
        handle.submit("q\n".to_string());

        assert!(wait_until(|| handle.stats().lines_written == 2));
        assert_eq!(sink.contents(), "p\nq\n");

        handle.request_exit();
        assert!(handle.wait_stopped(DEADLINE));
    }

    #[test]
    fn test_spawn_rejects_zero_threshold() {
        assert!(CoordinatorHandle::spawn(None, config(0, Duration::from_secs(1))).is_err());
    }

    #[test]
    fn test_wait_stopped_times_out_while_running() {
        let (handle, _sink) = spawn_memory(5, Duration::from_secs(60));

        assert!(!handle.wait_stopped(Duration::from_millis(50)));
        assert_ne!(handle.state(), CoordinatorState::Stopped);

        handle.request_exit();
        assert!(handle.wait_stopped(DEADLINE));
    }

    #[test]
    fn test_calls_after_stop_are_ignored() {
        let (handle, sink) = spawn_memory(1, Duration::from_secs(60));

        handle.request_exit();
        handle.join();

        handle.submit("late\n".to_string());
        handle.request_flush();
        handle.request_exit();
        assert!(sink.lines().is_empty());
    }
}
