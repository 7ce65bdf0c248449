//! Cache-or-build orchestration of feeds.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{Cache, Entry};
use crate::error::{Error, Result};
use crate::ics;
use crate::subscriber::Subscriber;

pub struct Config {
    /// Store built feeds; when off every request rebuilds.
    pub enabled: bool,
    /// TTL for feeds built without an explicit one.
    pub ttl: Duration,
    /// Published window when neither the caller nor the subscriber picks one.
    pub window: TimeDelta,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(6 * 60 * 60),
            window: TimeDelta::days(730),
        }
    }
}

/// Serves rendered feeds from the cache, rebuilding them when stale.
///
/// The store lock is only taken for the lookup and the final insert, so a
/// slow rebuild never holds up requests for other keys.
pub struct FeedService {
    cache: Cache<String, Entry>,
    ttl: Duration,
    window: TimeDelta,
}

impl FeedService {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            cache: Cache::new(config.enabled),
            ttl: config.ttl,
            window: config.window,
        })
    }

    /// Returns the feed for `key`, rebuilding it with `subscriber` unless a
    /// fresh copy is cached.
    ///
    /// A zero `ttl` keeps the TTL of the existing entry; anything else
    /// applies from now on. A failed rebuild leaves the cache untouched.
    pub async fn get_or_build(
        &self,
        key: &str,
        subscriber: &dyn Subscriber,
        ttl: Duration,
    ) -> Result<Arc<str>> {
        let requested = (!ttl.is_zero()).then_some(ttl);
        let previous = self.cache.get(key).await;

        if let Some(entry) = &previous {
            if entry.is_fresh(requested) {
                debug!(key, "Serving cached feed");
                return Ok(Arc::clone(&entry.content));
            }
        }

        let window = match requested {
            Some(ttl) => TimeDelta::from_std(ttl).unwrap_or(self.window),
            None => subscriber.window().unwrap_or(self.window),
        };
        let ttl = requested
            .or_else(|| previous.as_ref().map(|entry| entry.ttl))
            .unwrap_or(self.ttl);

        let start = Utc::now();
        let end = start.checked_add_signed(window).unwrap_or(start);

        let content = match self.build(subscriber, start, end).await {
            Ok(content) => content,
            Err(err) => {
                warn!(key, error = %err, "Failed to build feed");
                return Err(Error::Build {
                    key: key.to_string(),
                    source: Box::new(err),
                });
            }
        };

        let entry = self
            .cache
            .insert(key.to_string(), Entry::new(Arc::from(content), ttl))
            .await;

        info!(key, ttl_secs = ttl.as_secs(), bytes = entry.content.len(), "Built feed");
        Ok(Arc::clone(&entry.content))
    }

    /// Builds the feed for `[start, end)` without touching the cache.
    pub async fn build(
        &self,
        subscriber: &dyn Subscriber,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<String> {
        let events = subscriber.events(start, end).await?;

        ics::render(
            subscriber.name(),
            subscriber.description(),
            &events,
            Utc::now(),
        )
    }

    /// Invalidates every cached feed; the next request per key rebuilds.
    pub async fn run(&self) {
        let removed = self.cache.clear().await;
        info!(removed, "Invalidated cached feeds");
    }

    pub async fn cached(&self, key: &str) -> Option<Arc<Entry>> {
        self.cache.get(key).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::event::Event;
    use crate::juhe::JuheError;
    use async_trait::async_trait;
    use tokio::time::Instant;

    const TTL: Duration = Duration::from_secs(60);

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
        window: Option<TimeDelta>,
        interval: Mutex<Option<(DateTime<Utc>, DateTime<Utc>)>>,
    }

    impl Counting {
        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn span(&self) -> TimeDelta {
            let (start, end) = self.interval.lock().unwrap().expect("not called");
            end - start
        }
    }

    #[async_trait]
    impl Subscriber for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn description(&self) -> &str {
            "counts builds"
        }

        async fn events(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Event>> {
            let build = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            *self.interval.lock().unwrap() = Some((start, end));

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Upstream {
                    day: start.date_naive(),
                    source: JuheError::Status(503),
                });
            }

            Ok(vec![Event::all_day(
                "counting",
                start.date_naive(),
                format!("build {build}"),
                "",
            )])
        }

        fn window(&self) -> Option<TimeDelta> {
            self.window
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entry_is_served_without_rebuild() {
        let service = FeedService::new(Config::default());
        let subscriber = Counting::default();

        let first = service.get_or_build("feed", &subscriber, TTL).await.unwrap();
        tokio::time::advance(Duration::from_secs(59)).await;
        let second = service.get_or_build("feed", &subscriber, TTL).await.unwrap();
        let third = service.get_or_build("feed", &subscriber, TTL).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(subscriber.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_rebuilds_once() {
        let service = FeedService::new(Config::default());
        let subscriber = Counting::default();

        service.get_or_build("feed", &subscriber, TTL).await.unwrap();
        let built_at = service.cached("feed").await.unwrap().built_at;

        tokio::time::advance(TTL + Duration::from_millis(1)).await;
        let rebuilt = service.get_or_build("feed", &subscriber, TTL).await.unwrap();
        service.get_or_build("feed", &subscriber, TTL).await.unwrap();

        assert_eq!(subscriber.calls(), 2);
        assert!(rebuilt.contains("build 2"));
        assert!(service.cached("feed").await.unwrap().built_at > built_at);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_keeps_stored_ttl() {
        let service = FeedService::new(Config::default());
        let subscriber = Counting::default();

        service.get_or_build("feed", &subscriber, TTL).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        service.get_or_build("feed", &subscriber, Duration::ZERO).await.unwrap();
        assert_eq!(subscriber.calls(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        service.get_or_build("feed", &subscriber, Duration::ZERO).await.unwrap();
        assert_eq!(subscriber.calls(), 2);
        assert_eq!(service.cached("feed").await.unwrap().ttl, TTL);
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_ttl_applies_to_existing_entry() {
        let service = FeedService::new(Config::default());
        let subscriber = Counting::default();

        service.get_or_build("feed", &subscriber, TTL).await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;
        service
            .get_or_build("feed", &subscriber, Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(subscriber.calls(), 2);
        assert_eq!(
            service.cached("feed").await.unwrap().ttl,
            Duration::from_secs(10)
        );
    }

    #[tokio::test]
    async fn zero_ttl_without_entry_uses_defaults() {
        let config = Config {
            ttl: Duration::from_secs(120),
            window: TimeDelta::days(10),
            ..Default::default()
        };
        let service = FeedService::new(config);
        let subscriber = Counting::default();

        service.get_or_build("feed", &subscriber, Duration::ZERO).await.unwrap();

        assert_eq!(subscriber.span(), TimeDelta::days(10));
        assert_eq!(
            service.cached("feed").await.unwrap().ttl,
            Duration::from_secs(120)
        );
    }

    #[tokio::test]
    async fn window_follows_ttl_or_subscriber() {
        let service = FeedService::new(Config::default());
        let narrow = Counting {
            window: Some(TimeDelta::days(7)),
            ..Default::default()
        };

        service.get_or_build("a", &narrow, Duration::ZERO).await.unwrap();
        assert_eq!(narrow.span(), TimeDelta::days(7));

        service
            .get_or_build("b", &narrow, Duration::from_secs(3 * 60 * 60))
            .await
            .unwrap();
        assert_eq!(narrow.span(), TimeDelta::hours(3));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_rebuild_leaves_entry_untouched() {
        let service = FeedService::new(Config::default());
        let subscriber = Counting::default();

        let content = service.get_or_build("feed", &subscriber, TTL).await.unwrap();
        let before = service.cached("feed").await.unwrap();

        tokio::time::advance(TTL * 2).await;
        subscriber.fail.store(true, Ordering::SeqCst);
        let result = service.get_or_build("feed", &subscriber, TTL).await;

        match result {
            Err(Error::Build { key, source }) => {
                assert_eq!(key, "feed");
                assert!(matches!(*source, Error::Upstream { .. }));
            }
            other => panic!("expected build error, got {other:?}"),
        }

        let after = service.cached("feed").await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.content, content);
        assert_eq!(after.built_at, before.built_at);
    }

    #[tokio::test]
    async fn failed_first_build_stores_nothing() {
        let service = FeedService::new(Config::default());
        let subscriber = Counting::default();
        subscriber.fail.store(true, Ordering::SeqCst);

        let err = service.get_or_build("feed", &subscriber, TTL).await.unwrap_err();

        assert!(err.is_upstream());
        assert!(service.cached("feed").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_keys_do_not_block_each_other() {
        let service = FeedService::new(Config::default());
        let slow = Arc::new(Counting::slow(Duration::from_secs(30)));
        let fast = Counting::default();

        let pending = tokio::spawn({
            let service = Arc::clone(&service);
            let slow = Arc::clone(&slow);
            async move { service.get_or_build("slow", slow.as_ref(), TTL).await }
        });

        while slow.calls() == 0 {
            tokio::task::yield_now().await;
        }

        let started = Instant::now();
        service.get_or_build("fast", &fast, TTL).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!pending.is_finished());
        assert!(service.cached("fast").await.is_some());

        pending.await.unwrap().unwrap();
        assert!(service.cached("slow").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn run_forces_rebuild_of_every_key() {
        let service = FeedService::new(Config::default());
        let first = Counting::default();
        let second = Counting::default();

        service.get_or_build("a", &first, TTL).await.unwrap();
        service.get_or_build("b", &second, TTL).await.unwrap();

        service.run().await;
        assert!(service.cached("a").await.is_none());
        assert!(service.cached("b").await.is_none());

        service.get_or_build("a", &first, TTL).await.unwrap();
        service.get_or_build("a", &first, TTL).await.unwrap();
        service.get_or_build("b", &second, TTL).await.unwrap();

        assert_eq!(first.calls(), 2);
        assert_eq!(second.calls(), 2);
    }

    #[tokio::test]
    async fn run_on_empty_store() {
        let service = FeedService::new(Config::default());
        service.run().await;
        assert!(service.cached("missing").await.is_none());
    }

    #[tokio::test]
    async fn disabled_cache_always_rebuilds() {
        let service = FeedService::new(Config {
            enabled: false,
            ..Default::default()
        });
        let subscriber = Counting::default();

        service.get_or_build("feed", &subscriber, TTL).await.unwrap();
        service.get_or_build("feed", &subscriber, TTL).await.unwrap();

        assert_eq!(subscriber.calls(), 2);
        assert!(service.cached("feed").await.is_none());
    }
}
