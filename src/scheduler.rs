use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::fetcher::CycleRunner;
use crate::models::FetchBatch;
use crate::utils::error::AppError;

/// Terminal signal for one refresh cycle. The consumer always gets exactly
/// one of these per cycle, populated or not.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed(FetchBatch),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Waiting,
    Fetching,
    Delivering,
}

/// Bounded single-producer/single-consumer mailbox between the scheduler
/// and the foreground loop. When full, the oldest undelivered outcome is
/// dropped in favour of the newest; publishing never blocks the loop.
struct BatchMailbox {
    queue: Mutex<VecDeque<CycleOutcome>>,
    capacity: usize,
}

impl BatchMailbox {
    fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    fn publish(&self, outcome: CycleOutcome) {
        let mut queue = self.queue.lock().expect("mailbox lock poisoned");
        if queue.len() == self.capacity {
            queue.pop_front();
            warn!("result mailbox full, dropped oldest undelivered batch");
        }
        queue.push_back(outcome);
    }

    fn try_recv(&self) -> Option<CycleOutcome> {
        self.queue.lock().expect("mailbox lock poisoned").pop_front()
    }
}

enum Command {
    Refresh,
    Shutdown,
}

/// Foreground boundary: non-blocking batch consumption, manual refresh,
/// cooperative shutdown.
pub struct SchedulerHandle {
    mailbox: Arc<BatchMailbox>,
    command_tx: mpsc::Sender<Command>,
    in_flight: Arc<AtomicBool>,
    state: Arc<Mutex<SchedulerState>>,
    task: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    /// Non-blocking poll; an empty mailbox just means no new cycle yet.
    pub fn try_receive(&self) -> Option<CycleOutcome> {
        self.mailbox.try_recv()
    }

    /// Ask for an immediate cycle. Rejected with `SchedulerBusy` while one
    /// is in flight; a request that races past this check is coalesced into
    /// a no-op by the loop's own in-flight gate.
    pub fn request_refresh(&self) -> Result<(), AppError> {
        if self.in_flight.load(Ordering::SeqCst) {
            return Err(AppError::SchedulerBusy);
        }
        self.command_tx
            .try_send(Command::Refresh)
            .map_err(|_| AppError::SchedulerStopped)
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock().expect("state lock poisoned")
    }

    /// Cooperative shutdown: an in-flight cycle finishes and is delivered
    /// before the loop exits.
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(Command::Shutdown).await;
        let _ = self.task.await;
    }
}

/// Owns timing and the single in-flight fetch task. Fetch work is shed to a
/// background task; the loop itself never blocks on the network.
pub struct RefreshScheduler<R: CycleRunner> {
    runner: Arc<R>,
    interval: Duration,
    mailbox: Arc<BatchMailbox>,
    in_flight: Arc<AtomicBool>,
    state: Arc<Mutex<SchedulerState>>,
}

impl<R: CycleRunner> RefreshScheduler<R> {
    pub fn start(runner: Arc<R>, interval: Duration, channel_capacity: usize) -> SchedulerHandle {
        let mailbox = Arc::new(BatchMailbox::new(channel_capacity));
        let in_flight = Arc::new(AtomicBool::new(false));
        let state = Arc::new(Mutex::new(SchedulerState::Idle));
        let (command_tx, command_rx) = mpsc::channel(8);

        let scheduler = Self {
            runner,
            interval,
            mailbox: Arc::clone(&mailbox),
            in_flight: Arc::clone(&in_flight),
            state: Arc::clone(&state),
        };

        let task = tokio::spawn(scheduler.run_loop(command_rx));

        SchedulerHandle {
            mailbox,
            command_tx,
            in_flight,
            state,
            task,
        }
    }

    async fn run_loop(self, mut command_rx: mpsc::Receiver<Command>) {
        // Completion channel from the fetch task back to this loop; the
        // sender half lives here so recv never observes a closed channel.
        let (done_tx, mut done_rx) = mpsc::channel::<CycleOutcome>(1);

        self.set_state(SchedulerState::Waiting);
        let mut next_due = Instant::now() + self.interval;
        let mut shutting_down = false;

        info!(interval_secs = self.interval.as_secs(), "refresh scheduler started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next_due), if !shutting_down => {
                    self.launch_if_idle(&done_tx);
                    // Pushed forward even when the launch was skipped, so a
                    // slow cycle does not turn the timer into a busy loop.
                    next_due = Instant::now() + self.interval;
                }
                Some(command) = command_rx.recv() => match command {
                    Command::Refresh => {
                        if shutting_down {
                            debug!("manual refresh ignored during shutdown");
                        } else {
                            debug!("manual refresh requested");
                            self.launch_if_idle(&done_tx);
                        }
                    }
                    Command::Shutdown => {
                        shutting_down = true;
                        if !self.in_flight.load(Ordering::SeqCst) {
                            break;
                        }
                        info!("shutdown requested, letting in-flight cycle finish");
                    }
                },
                Some(outcome) = done_rx.recv() => {
                    self.set_state(SchedulerState::Delivering);
                    self.mailbox.publish(outcome);
                    self.in_flight.store(false, Ordering::SeqCst);

                    let last_refresh = Instant::now();
                    next_due = last_refresh + self.interval;
                    self.set_state(SchedulerState::Waiting);

                    if shutting_down {
                        break;
                    }
                }
            }
        }

        self.set_state(SchedulerState::Idle);
        info!("refresh scheduler stopped");
    }

    fn launch_if_idle(&self, done_tx: &mpsc::Sender<CycleOutcome>) {
        // Single atomic gate: whoever flips false -> true owns the cycle.
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("cycle already in flight, request coalesced");
            return;
        }

        self.set_state(SchedulerState::Fetching);

        let runner = Arc::clone(&self.runner);
        let done_tx = done_tx.clone();

        tokio::spawn(async move {
            let outcome = match runner.run_cycle().await {
                Ok(batch) => CycleOutcome::Completed(batch),
                Err(e) => {
                    warn!("refresh cycle failed: {}", e);
                    CycleOutcome::Failed(e.to_string())
                }
            };
            // Capacity 1 and at most one cycle in flight: this never waits.
            let _ = done_tx.send(outcome).await;
        });
    }

    fn set_state(&self, next: SchedulerState) {
        *self.state.lock().expect("state lock poisoned") = next;
    }
}
