//! Startup and shutdown tasks scoped to the bot's run.

use futures::future::BoxFuture;

/// Async tasks run before the poller starts and after it stops.
///
/// Startup tasks run to completion, in registration order, before any
/// update is polled; shutdown tasks run after the poller has stopped.
#[derive(Default)]
pub struct Lifespan {
    startup: Vec<BoxFuture<'static, ()>>,
    shutdown: Vec<BoxFuture<'static, ()>>,
}

impl Lifespan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_startup(
        &mut self,
        task: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> &mut Self {
        self.startup.push(Box::pin(task));
        self
    }

    pub fn on_shutdown(
        &mut self,
        task: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> &mut Self {
        self.shutdown.push(Box::pin(task));
        self
    }

    /// Runs and consumes the startup tasks, in order.
    pub async fn start(&mut self) {
        for task in self.startup.drain(..) {
            task.await;
        }
    }

    /// Runs and consumes the shutdown tasks, in order.
    pub async fn stop(&mut self) {
        for task in self.shutdown.drain(..) {
            task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// **Scenario**: Startup tasks run in registration order; shutdown tasks
    /// run only on stop.
    #[tokio::test]
    async fn ordered_start_and_stop() {
        let order = Arc::new(AtomicUsize::new(0));
        let mut lifespan = Lifespan::new();

        let first = order.clone();
        lifespan.on_startup(async move {
            assert_eq!(first.fetch_add(1, Ordering::SeqCst), 0);
        });
        let second = order.clone();
        lifespan.on_startup(async move {
            assert_eq!(second.fetch_add(1, Ordering::SeqCst), 1);
        });
        let third = order.clone();
        lifespan.on_shutdown(async move {
            assert_eq!(third.fetch_add(1, Ordering::SeqCst), 2);
        });

        lifespan.start().await;
        assert_eq!(order.load(Ordering::SeqCst), 2);
        lifespan.stop().await;
        assert_eq!(order.load(Ordering::SeqCst), 3);
    }
}
