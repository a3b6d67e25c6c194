use std::{sync::Arc, time::Duration};

use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

use super::updater::SubstitutionUpdater;
use crate::fetch::PageFetcher;

/// Background sweep that refreshes stale stores every `period`.
///
/// [`RefreshTask::stop`] ends the loop; a sweep still running at that point is
/// dropped, which cancels its requests and leaves every store as it was.
#[derive(Debug)]
pub struct RefreshTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    pub fn spawn<F: PageFetcher + 'static>(
        updater: Arc<SubstitutionUpdater<F>>,
        period: Duration,
    ) -> Self {
        let period = period.max(Duration::from_millis(1));
        let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {}
                }
                let start = std::time::Instant::now();
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        log::info!("Shutdown during refresh sweep, abandoning it");
                        break;
                    }
                    refreshed = updater.refresh_stale() => {
                        log::info!(
                            "Refresh sweep updated {refreshed} of {} stores in {:?}",
                            updater.len().await,
                            start.elapsed()
                        );
                    }
                }
            }
            log::info!("Refresh task stopped");
        });
        Self { shutdown, handle }
    }

    pub async fn stop(self) {
        // the task may already be gone, in which case there is nobody to tell
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            log::error!("Refresh task failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{identity::Credentials, testing::ScriptedFetcher};
    use crate::config::Config;
    use std::fs;

    fn updater(refresh_interval: u64) -> Arc<SubstitutionUpdater<ScriptedFetcher>> {
        let html = fs::read_to_string("./src/parse/html_examples/infoscreen.html").unwrap();
        let config = Config {
            refresh_interval,
            ..Config::default()
        };
        Arc::new(SubstitutionUpdater::new(ScriptedFetcher::serving(html), config))
    }

    #[tokio::test]
    async fn test_sweeps_refresh_stale_stores() {
        let updater = updater(0);
        updater.get_or_create(Credentials::new("max", "geheim")).await.unwrap();
        assert_eq!(updater.fetcher().calls(), 1);

        let task = RefreshTask::spawn(Arc::clone(&updater), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(150)).await;
        task.stop().await;

        let calls = updater.fetcher().calls();
        assert!(calls >= 2, "expected a sweep to refetch, got {calls} calls");

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(updater.fetcher().calls(), calls);
    }

    #[tokio::test]
    async fn test_sweeps_leave_fresh_stores_alone() {
        let updater = updater(5);
        updater.get_or_create(Credentials::new("max", "geheim")).await.unwrap();

        let task = RefreshTask::spawn(Arc::clone(&updater), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        task.stop().await;

        assert_eq!(updater.fetcher().calls(), 1);
    }

    #[tokio::test]
    async fn test_stop_before_first_tick() {
        let updater = updater(0);
        let task = RefreshTask::spawn(Arc::clone(&updater), Duration::from_secs(3600));
        tokio::time::timeout(Duration::from_secs(1), task.stop())
            .await
            .expect("stop should not wait for the next tick");
        assert_eq!(updater.fetcher().calls(), 0);
    }
}
