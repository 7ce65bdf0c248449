use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::debug;

use crate::service::FeedService;

/// Invalidates every cached feed once per `every`, starting one period from
/// now. Abort the handle to stop it.
pub fn spawn(service: Arc<FeedService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            debug!("Periodic refresh");
            service.run().await;
        }
    })
}
