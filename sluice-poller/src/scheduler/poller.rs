//! Queue poller
//!
//! Fetches batches from the queue client and hands them to the installed
//! handlers. The loop runs on its own task and reschedules itself after every
//! iteration until `stop` clears the running flag; `stop` then waits for the
//! in-flight messages to settle, bounded by the shutdown timeout.

use sluice_core::{QueueClient, ReceiveRequest};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::futures::Notified;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::{debug, error, info, warn};

use super::dispatch::panic_message;
use super::state::PollerState;
use crate::config::{PollerBuilder, PollerConfig};
use crate::error::{PollerError, Result};
use crate::service::{Handlers, PollerEvent, PollerObserver, Session};

/// How often `stop` checks whether in-flight work has drained
const DRAIN_CHECK_INTERVAL: Duration = Duration::from_millis(1000);

/// Error events buffered per subscriber before it starts lagging
const ERROR_CHANNEL_CAPACITY: usize = 256;

/// Consumes a queue until stopped
///
/// ```no_run
/// use sluice_core::QueueClient;
/// use sluice_poller::{HandlerResult, Handlers, Poller};
/// use std::sync::Arc;
///
/// # async fn example(client: Arc<dyn QueueClient>) -> sluice_poller::Result<()> {
/// let poller = Poller::builder()
///     .queue_url("https://sqs.us-east-1.amazonaws.com/000000000000/orders")
///     .client(client)
///     .build()?;
///
/// poller.start(Handlers::new().each_message(|message| async move {
///     println!("{:?}", message.body);
///     HandlerResult::Ok(())
/// }))?;
///
/// // ... later
/// poller.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Poller {
    shared: Arc<Shared>,
}

/// State shared between the `Poller` handle, the loop task and the
/// per-message tasks
pub(super) struct Shared {
    pub config: PollerConfig,
    pub request: ReceiveRequest,
    pub client: Arc<dyn QueueClient>,
    pub observer: Arc<dyn PollerObserver>,
    pub state: Arc<PollerState>,
    session: Mutex<Option<Session>>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
    wake: Notify,
    errors: broadcast::Sender<Arc<PollerError>>,
}

impl Poller {
    /// Creates a builder; see [`PollerBuilder`]
    pub fn builder() -> PollerBuilder {
        PollerBuilder::new()
    }

    pub(crate) fn new(
        config: PollerConfig,
        client: Arc<dyn QueueClient>,
        observer: Arc<dyn PollerObserver>,
    ) -> Self {
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        let request = config.receive_request();

        Self {
            shared: Arc::new(Shared {
                config,
                request,
                client,
                observer,
                state: Arc::new(PollerState::default()),
                session: Mutex::new(None),
                loop_task: Mutex::new(None),
                wake: Notify::new(),
                errors,
            }),
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.shared.config
    }

    /// Installs the handlers and starts polling in the background
    ///
    /// Returns as soon as the loop task is spawned. Must be called from
    /// within a Tokio runtime.
    ///
    /// # Errors
    /// - `Handler` if neither or both of `each_message`/`each_batch` are set
    /// - `AlreadyRunning` if the poller has not been stopped
    /// - `Runtime` if there is no current Tokio runtime
    pub fn start(&self, handlers: Handlers) -> Result<()> {
        let session = handlers.into_session()?;
        let runtime = current_runtime()?;

        if !self.shared.state.begin() {
            return Err(PollerError::AlreadyRunning);
        }

        info!(
            queue_url = %self.shared.config.queue_url,
            mode = session.mode.name(),
            "Starting poller"
        );

        *lock(&self.shared.session) = Some(session);
        self.spawn_loop(&runtime);

        Ok(())
    }

    /// Restarts polling with the handlers installed by the last `start`
    ///
    /// A no-op while already running. Fails with `Handler` if `start` never
    /// succeeded.
    pub fn resume(&self) -> Result<()> {
        if lock(&self.shared.session).is_none() {
            return Err(PollerError::handler(
                "no handlers installed, call start before resume",
            ));
        }

        let runtime = current_runtime()?;

        if !self.shared.state.begin() {
            debug!("Poller already running, nothing to resume");
            return Ok(());
        }

        info!(queue_url = %self.shared.config.queue_url, "Resuming poller");
        self.spawn_loop(&runtime);

        Ok(())
    }

    /// Stops scheduling new iterations and waits for in-flight work
    ///
    /// Returns once no message is in flight or the shutdown timeout elapses,
    /// whichever comes first. Handlers still running are not cancelled; their
    /// deletes and bookkeeping finish in the background.
    ///
    /// Returns `true` if nothing was left in flight.
    pub async fn stop(&self) -> bool {
        let state = &self.shared.state;

        if !state.halt() {
            return state.in_flight() == 0;
        }

        self.shared.wake.notify_waiters();
        info!(in_flight = state.in_flight(), "Stopping poller");

        let drained = async {
            let mut ticker = time::interval(DRAIN_CHECK_INTERVAL);
            loop {
                ticker.tick().await;
                if state.in_flight() == 0 {
                    break;
                }
            }
        };

        match time::timeout(self.shared.config.shutdown_timeout, drained).await {
            Ok(()) => {
                info!("Poller stopped");
                true
            }
            Err(_) => {
                warn!(
                    in_flight = state.in_flight(),
                    timeout = ?self.shared.config.shutdown_timeout,
                    "Shutdown timeout elapsed with messages still in flight"
                );
                false
            }
        }
    }

    /// Number of messages fetched but not yet settled
    pub fn in_flight(&self) -> usize {
        self.shared.state.in_flight()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.is_running()
    }

    /// Number of messages returned by the most recent fetch
    pub fn last_batch_size(&self) -> usize {
        self.shared.state.last_batch_size()
    }

    /// Subscribes to runtime error events
    ///
    /// Every fetch, handler, delete or pre-poll failure is published here.
    /// Slow subscribers may observe `RecvError::Lagged`.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<Arc<PollerError>> {
        self.shared.errors.subscribe()
    }

    fn spawn_loop(&self, runtime: &Handle) {
        let session = self.shared.state.next_session();
        let mut slot = lock(&self.shared.loop_task);
        let previous = slot.take();

        // Wake a previous loop sleeping between iterations so it can exit
        self.shared.wake.notify_waiters();

        *slot = Some(runtime.spawn(Shared::run(
            Arc::clone(&self.shared),
            session,
            previous,
        )));
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if self.shared.state.halt() {
            self.shared.wake.notify_waiters();
        }
    }
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("config", &self.shared.config)
            .field("running", &self.is_running())
            .field("in_flight", &self.in_flight())
            .field("last_batch_size", &self.last_batch_size())
            .finish()
    }
}

impl Shared {
    /// The poll loop of one session
    async fn run(self: Arc<Self>, session: u64, previous: Option<JoinHandle<()>>) {
        // Let the previous session finish its iteration so two never overlap
        if let Some(previous) = previous {
            let _ = previous.await;
        }

        debug!(session, "Poll loop started");

        while self.state.is_current(session) {
            let iteration = tokio::spawn(Arc::clone(&self).poll());

            if let Err(e) = iteration.await {
                error!(error = %e, "Poll iteration panicked");
                self.emit_error(PollerError::Panicked(panic_message(e)));
            }

            let woken = self.wake.notified();
            if !self.state.is_current(session) {
                break;
            }
            self.pause(woken).await;
        }

        debug!(session, "Poll loop stopped");
    }

    async fn pause(&self, woken: Notified<'_>) {
        let delay = self.config.polling_delay;

        if delay.is_zero() {
            tokio::task::yield_now().await;
            return;
        }

        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = woken => {}
        }
    }

    pub(super) fn session(&self) -> Option<Session> {
        lock(&self.session).clone()
    }

    pub(super) fn observe(&self, event: PollerEvent<'_>) {
        if self.observer.is_enabled() {
            self.observer.on_event(&event);
        }
    }

    /// Publishes an error to the observer and to error subscribers
    pub(super) fn emit_error(&self, error: PollerError) {
        if self.observer.is_enabled() {
            self.observer.on_error(&error);
        }

        // Sending fails only when nobody is subscribed
        let _ = self.errors.send(Arc::new(error));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn current_runtime() -> Result<Handle> {
    Handle::try_current().map_err(|e| PollerError::Runtime(e.to_string()))
}
