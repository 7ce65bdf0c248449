use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::subscriber::Subscriber;

/// Subscription keys bound to their subscribers, fixed at startup.
#[derive(Clone, Default)]
pub struct Subscriptions {
    inner: BTreeMap<String, Arc<dyn Subscriber>>,
}

impl Subscriptions {
    pub fn builder() -> SubscriptionsBuilder {
        SubscriptionsBuilder::default()
    }

    pub fn get(&self, key: &str) -> Result<&Arc<dyn Subscriber>> {
        self.inner
            .get(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Subscriptions in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Subscriber>)> {
        self.inner.iter().map(|(key, sub)| (key.as_str(), sub))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[derive(Default)]
pub struct SubscriptionsBuilder {
    inner: BTreeMap<String, Arc<dyn Subscriber>>,
}

impl SubscriptionsBuilder {
    /// Binds `key` to `subscriber`, replacing an earlier binding.
    #[must_use]
    pub fn add<S>(mut self, key: &str, subscriber: S) -> Self
    where
        S: Subscriber + 'static,
    {
        self.inner.insert(key.to_string(), Arc::new(subscriber));
        self
    }

    pub fn build(self) -> Subscriptions {
        Subscriptions { inner: self.inner }
    }
}
