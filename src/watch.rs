//! Keeps a derived view fresh by reloading it when the store changes.
//!
//! A [`ViewRefresher`] owns a background task that re-runs a loader on the
//! blocking pool whenever a watched table changes, and optionally on a
//! fallback tick. The latest result is published on a `watch` channel.
//! Dropping the refresher aborts the task; a load that is still running is
//! discarded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::{Store, Table};

pub struct ViewRefresher<T> {
    current: watch::Receiver<Option<T>>,
    task: JoinHandle<()>,
}

impl<T> ViewRefresher<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Loads the view once, then again after every change to one of `tables`.
    pub fn spawn<F>(store: Arc<Store>, tables: Vec<Table>, fallback: Option<Duration>, loader: F) -> Self
    where
        F: Fn(&Store) -> Result<T> + Send + Sync + 'static,
    {
        let (tx, current) = watch::channel(None);
        // Subscribe before spawning so no change between now and the first
        // load is missed.
        let mut changes = store.subscribe();
        let loader = Arc::new(loader);

        let task = tokio::spawn(async move {
            // A zero period means no fallback tick.
            let mut tick = fallback.filter(|period| !period.is_zero()).map(|period| {
                let mut interval = time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                interval
            });
            if let Some(interval) = tick.as_mut() {
                interval.tick().await;
            }
            reload(&store, &loader, &tx).await;

            loop {
                let due = tokio::select! {
                    change = changes.recv() => match change {
                        Ok(change) => tables.contains(&change.table),
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "change stream lagged, reloading");
                            true
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = next_tick(&mut tick) => true,
                };
                if due {
                    reload(&store, &loader, &tx).await;
                }
            }
        });

        ViewRefresher { current, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.current.clone()
    }

    /// The last successfully loaded view, if any.
    pub fn current(&self) -> Option<T> {
        self.current.borrow().clone()
    }
}

impl<T> Drop for ViewRefresher<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn next_tick(tick: &mut Option<Interval>) {
    match tick {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn reload<T, F>(store: &Arc<Store>, loader: &Arc<F>, tx: &watch::Sender<Option<T>>)
where
    T: Send + Sync + 'static,
    F: Fn(&Store) -> Result<T> + Send + Sync + 'static,
{
    let store = Arc::clone(store);
    let loader = Arc::clone(loader);
    match tokio::task::spawn_blocking(move || (*loader)(&*store)).await {
        Ok(Ok(view)) => {
            tx.send_replace(Some(view));
        }
        Ok(Err(err)) => warn!(error = %err, "view reload failed"),
        Err(err) => warn!(error = %err, "view loader did not finish"),
    }
}
