//! The runtime supervisor: owns the poller, the waiter-storage sweeper,
//! lifespan tasks and timers, and fans updates out to the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::api::Api;
use crate::bot::dispatch::waiter::WaiterMachine;
use crate::bot::dispatch::Dispatcher;
use crate::bot::polling::LongPolling;
use crate::settings::Settings;
use crate::tools::lifespan::Lifespan;
use crate::types::Update;

type TimerTask = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

enum TimerKind {
    /// Repeats on a fixed period until shutdown.
    Interval(Duration),
    /// Fires once after the delay.
    Once(Duration),
}

struct Timer {
    kind: TimerKind,
    task: TimerTask,
}

/// One bot process: API handle, dispatcher, waiter machine, timers and the
/// run loop tying them together.
pub struct Bot {
    api: Api,
    dispatcher: Arc<Dispatcher>,
    machine: WaiterMachine,
    settings: Settings,
    lifespan: Lifespan,
    timers: Vec<Timer>,
    cancel: CancellationToken,
}

impl Bot {
    /// Default settings; the `api` handle is used exactly as given.
    pub fn new(api: Api, dispatcher: Dispatcher) -> Self {
        Self::build(api, dispatcher, Settings::default())
    }

    /// Applies the recognized options: waiter capacity and lifetime, the
    /// poller subscription and timeout, and the API base URLs (rebound onto
    /// the given handle). The transport deadline is applied where the
    /// handle is built, see [`Api::from_settings`].
    pub fn with_settings(api: Api, dispatcher: Dispatcher, settings: Settings) -> Self {
        let api = api.with_base_urls(
            settings.api_base_url.clone(),
            settings.api_file_base_url.clone(),
        );
        Self::build(api, dispatcher, settings)
    }

    fn build(api: Api, dispatcher: Dispatcher, settings: Settings) -> Self {
        let machine = WaiterMachine::with_settings(
            settings.max_storage_size,
            settings.base_state_lifetime,
        );
        Self {
            api,
            dispatcher: Arc::new(dispatcher),
            machine,
            settings,
            lifespan: Lifespan::new(),
            timers: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the default waiter machine (for sharing one across bots or
    /// pre-attaching hashers).
    pub fn with_machine(mut self, machine: WaiterMachine) -> Self {
        self.machine = machine;
        self
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn machine(&self) -> &WaiterMachine {
        &self.machine
    }

    pub fn on_startup(
        &mut self,
        task: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> &mut Self {
        self.lifespan.on_startup(task);
        self
    }

    pub fn on_shutdown(
        &mut self,
        task: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> &mut Self {
        self.lifespan.on_shutdown(task);
        self
    }

    /// Repeating task on a fixed period, cancelled at shutdown.
    pub fn interval<F, Fut>(&mut self, period: Duration, task: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.timers.push(Timer {
            kind: TimerKind::Interval(period),
            task: Arc::new(move || Box::pin(task())),
        });
        self
    }

    /// One-shot task after a delay, cancelled at shutdown.
    pub fn delayed<F, Fut>(&mut self, delay: Duration, task: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.timers.push(Timer {
            kind: TimerKind::Once(delay),
            task: Arc::new(move || Box::pin(task())),
        });
        self
    }

    /// A handle that stops the run loop cleanly.
    pub fn stop_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn spawn_sweeper(&self) {
        let machine = self.machine.clone();
        let cancel = self.cancel.clone();
        let period = self.settings.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The immediate first tick would sweep an empty storage.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => machine.clear_storage(),
                }
            }
        });
    }

    fn spawn_timers(&mut self) {
        for timer in self.timers.drain(..) {
            let cancel = self.cancel.clone();
            match timer.kind {
                TimerKind::Interval(period) => {
                    tokio::spawn(async move {
                        let mut ticker = tokio::time::interval(period);
                        ticker.tick().await;
                        loop {
                            tokio::select! {
                                _ = cancel.cancelled() => break,
                                _ = ticker.tick() => (timer.task)().await,
                            }
                        }
                    });
                }
                TimerKind::Once(delay) => {
                    tokio::spawn(async move {
                        tokio::select! {
                            _ = cancel.cancelled() => {}
                            _ = tokio::time::sleep(delay) => (timer.task)().await,
                        }
                    });
                }
            }
        }
    }

    fn dispatch_batch(&self, batch: Vec<Update>) {
        for update in batch {
            let dispatcher = self.dispatcher.clone();
            let api = self.api.clone();
            tokio::spawn(async move {
                dispatcher.feed(Arc::new(update), &api).await;
            });
        }
    }

    /// Runs until SIGINT or [`Bot::stop_handle`] fires: startup tasks, then
    /// the poller with per-update fan-out, then drop-all and shutdown tasks.
    pub async fn run_polling(mut self) {
        self.lifespan.start().await;
        info!(bot_id = self.api.id(), "bot starting");

        self.spawn_sweeper();
        self.spawn_timers();

        let mut poller = LongPolling::new(self.api.clone())
            .timeout(self.settings.polling_timeout)
            .allowed_updates(self.settings.allowed_updates.clone())
            .with_cancellation(self.cancel.child_token());

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("interrupt received, shutting down");
                    break;
                }
                _ = self.cancel.cancelled() => break,
                batch = poller.next_batch() => match batch {
                    Some(batch) => {
                        debug!(count = batch.len(), "dispatching batch");
                        self.dispatch_batch(batch);
                    }
                    None => break,
                },
            }
        }

        // Shutdown: abort suspended conversations, stop workers, run
        // shutdown tasks.
        self.machine.drop_all();
        self.cancel.cancel();
        self.lifespan.stop().await;
        info!("bot stopped");
    }
}
