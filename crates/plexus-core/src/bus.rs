use std::collections::HashMap;
use std::fmt;

use crate::guard;

/// Published by a module once its own setup in `attach` has completed. The
/// payload is the module name.
pub const MODULE_READY: &str = "ModuleReady";

/// A subscriber callback. Receives the published payload.
pub type Callback = Box<dyn FnMut(&str)>;

/// Handle returned by [`MessageBus::subscribe`], used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    callback: Callback,
}

/// A synchronous topic-based publish/subscribe channel.
///
/// Each topic keeps its subscribers in subscription order. [`publish`]
/// invokes all of them, in that order, before returning. Callbacks only ever
/// see the payload, never the bus, so delivery cannot re-enter and mutate the
/// list it is walking.
///
/// [`publish`]: MessageBus::publish
pub struct MessageBus {
    topics: HashMap<String, Vec<Subscriber>>,
    next_id: u64,
    isolate: bool,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .topics
            .iter()
            .map(|(topic, subs)| (topic.as_str(), subs.len()))
            .collect();
        f.debug_struct("MessageBus")
            .field("topics", &counts)
            .field("isolate", &self.isolate)
            .finish()
    }
}

impl MessageBus {
    /// Create an empty bus. Subscriber panics propagate to the publisher.
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
            next_id: 0,
            isolate: false,
        }
    }

    /// When enabled, a panicking subscriber is logged and delivery continues
    /// with the next one.
    pub fn set_isolation(&mut self, isolate: bool) {
        self.isolate = isolate;
    }

    /// Append `callback` to the subscriber list of `topic`.
    pub fn subscribe(&mut self, topic: &str, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.topics
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber { id, callback });
        tracing::debug!(topic, subscription = id.0, "subscribed");
        id
    }

    /// Remove a single subscription. The remaining subscribers of that topic
    /// keep their relative order. Returns `false` if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let mut emptied = None;
        let mut removed = false;
        for (topic, subs) in self.topics.iter_mut() {
            if let Some(pos) = subs.iter().position(|s| s.id == id) {
                subs.remove(pos);
                removed = true;
                if subs.is_empty() {
                    emptied = Some(topic.clone());
                }
                break;
            }
        }
        if let Some(topic) = emptied {
            self.topics.remove(&topic);
        }
        removed
    }

    /// Deliver `payload` to every subscriber of `topic`, in subscription
    /// order. Returns the number of callbacks invoked; a topic with no
    /// subscribers yields `0`.
    pub fn publish(&mut self, topic: &str, payload: &str) -> usize {
        let Some(subs) = self.topics.get_mut(topic) else {
            tracing::trace!(topic, "publish with no subscribers");
            return 0;
        };

        let isolate = self.isolate;
        let mut delivered = 0;
        for sub in subs.iter_mut() {
            if let Err(reason) = guard::run_hook(isolate, || (sub.callback)(payload)) {
                guard::report(topic, "publish", &reason);
            }
            delivered += 1;
        }
        tracing::debug!(topic, delivered, "published");
        delivered
    }

    /// Number of live subscribers for `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }

    /// Topics that currently have at least one subscriber, sorted.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.topics.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }
}
