use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Owner side of the cooperative shutdown protocol.
///
/// Workers poll a shared flag at loop boundaries and may sleep on
/// [`ShutdownToken::wait`], which wakes immediately when shutdown is
/// requested (the wake channel is disconnected). On exit each worker reports
/// its name; [`ShutdownController::wait_for_exits`] waits a bounded time for
/// those reports and then gives up. Cleanup proceeds either way.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use md_core::shutdown::ShutdownController;
///
/// let mut controller = ShutdownController::new();
/// let token = controller.token();
/// let worker = std::thread::spawn(move || {
///     while !token.wait(Duration::from_millis(5)) {}
///     token.report_exit("worker");
/// });
/// controller.request();
/// let missing = controller.wait_for_exits(&["worker"], Duration::from_secs(5));
/// assert!(missing.is_empty());
/// worker.join().unwrap();
/// ```
pub struct ShutdownController {
    flag: Arc<AtomicBool>,
    /// Dropped on request: disconnects every token's `wake` receiver.
    trigger: Option<flume::Sender<()>>,
    wake: flume::Receiver<()>,
    requests_tx: flume::Sender<()>,
    requests_rx: flume::Receiver<()>,
    exits_tx: flume::Sender<&'static str>,
    exits_rx: flume::Receiver<&'static str>,
}

impl ShutdownController {
    /// New controller with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        let (trigger, wake) = flume::bounded(0);
        let (requests_tx, requests_rx) = flume::unbounded();
        let (exits_tx, exits_rx) = flume::unbounded();
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            trigger: Some(trigger),
            wake,
            requests_tx,
            requests_rx,
            exits_tx,
            exits_rx,
        }
    }

    /// Handle given to a worker thread.
    #[must_use]
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            flag: Arc::clone(&self.flag),
            wake: self.wake.clone(),
            exits: self.exits_tx.clone(),
        }
    }

    /// Handle for signal handlers: asks the controller to shut down.
    #[must_use]
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            flag: Arc::clone(&self.flag),
            requests: self.requests_tx.clone(),
        }
    }

    /// Request shutdown: raise the flag and wake every sleeping worker.
    pub fn request(&mut self) {
        self.flag.store(true, Ordering::Relaxed);
        self.trigger = None;
    }

    /// `true` once shutdown has been requested (directly or by an interrupter).
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Block until an [`Interrupter`] fires, then request shutdown.
    ///
    /// Used by the thread that owns the audio streams.
    pub fn wait_for_interrupt(&mut self) {
        if !self.is_requested() {
            let _ = self.requests_rx.recv();
        }
        self.request();
    }

    /// Wait up to `timeout` for every name in `expected` to report its exit.
    ///
    /// Returns the names that did not report in time.
    #[must_use]
    pub fn wait_for_exits(&self, expected: &[&'static str], timeout: Duration) -> Vec<&'static str> {
        let deadline = Instant::now() + timeout;
        let mut pending: Vec<&'static str> = expected.to_vec();
        while !pending.is_empty() {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.exits_rx.recv_timeout(left) {
                Ok(name) => pending.retain(|p| *p != name),
                Err(_) => break,
            }
        }
        for name in &pending {
            log::warn!("Thread '{name}' ne s'est pas arrêté dans le délai ({timeout:?}), abandon");
        }
        pending
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable shutdown request handle, usable from a signal handler.
#[derive(Clone)]
pub struct Interrupter {
    flag: Arc<AtomicBool>,
    requests: flume::Sender<()>,
}

impl Interrupter {
    /// Raise the shutdown flag and wake the controller.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::Relaxed);
        let _ = self.requests.try_send(());
    }
}

/// Worker side of the shutdown protocol.
#[derive(Clone)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
    wake: flume::Receiver<()>,
    exits: flume::Sender<&'static str>,
}

impl ShutdownToken {
    /// `true` once shutdown has been requested.
    #[inline]
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Sleep up to `timeout`, waking early on shutdown.
    ///
    /// Returns `true` if shutdown has been requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.is_requested() {
            return true;
        }
        // Nothing is ever sent: the call ends on timeout or on disconnect.
        let _ = self.wake.recv_timeout(timeout);
        self.is_requested()
    }

    /// Tell the controller this worker has left its loop.
    pub fn report_exit(&self, name: &'static str) {
        let _ = self.exits.send(name);
    }
}
