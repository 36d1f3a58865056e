//! Synchronous fan-out of notification models to subscribers.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::{Character, NoticeBehavior, NotificationModel, NotificationStyle};

pub trait UpdateSubscriber: Send + Sync {
    fn on_update(&self, update: &NotificationModel);
}

impl<F> UpdateSubscriber for F
where
    F: Fn(&NotificationModel) + Send + Sync,
{
    fn on_update(&self, update: &NotificationModel) {
        self(update)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Broadcast point for published updates.
///
/// Delivery happens on the publishing thread, in subscription order, before
/// `publish` returns. Nothing is retained: late subscribers miss earlier
/// updates. Cloning yields another handle to the same subscriber list.
#[derive(Clone, Default)]
pub struct UpdatePublisher {
    subscribers: Arc<RwLock<Vec<(SubscriptionId, Arc<dyn UpdateSubscriber>)>>>,
    next_id: Arc<AtomicU64>,
}

impl UpdatePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: impl UpdateSubscriber + 'static) -> SubscriptionId {
        self.subscribe_arc(Arc::new(subscriber))
    }

    pub fn subscribe_arc(&self, subscriber: Arc<dyn UpdateSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, subscriber));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn publish(&self, update: &NotificationModel) {
        // Snapshot so a subscriber may (un)subscribe without deadlocking.
        let subscribers: Vec<Arc<dyn UpdateSubscriber>> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();

        tracing::trace!(
            kind = update.notice.kind(),
            character = %update.character.name,
            subscribers = subscribers.len(),
            "publishing update"
        );

        for subscriber in subscribers {
            // One failing consumer must not starve the ones after it.
            if panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_update(update))).is_err() {
                tracing::error!(
                    kind = update.notice.kind(),
                    character = %update.character.name,
                    "update subscriber panicked"
                );
            }
        }
    }
}

/// What the toast layer needs to show one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub character: Character,
    pub body: String,
    pub style: NotificationStyle,
    pub link: Option<String>,
}

impl Toast {
    pub fn from_update(update: &NotificationModel) -> Self {
        Self {
            character: update.character.clone(),
            body: update.notice.render(),
            style: update.style(),
            link: update.link(),
        }
    }

    pub fn is_loud(&self) -> bool {
        self.style == NotificationStyle::Loud
    }
}

pub trait ToastSink: Send + Sync {
    fn show(&self, toast: Toast);
}

/// Subscriber that turns every update into a toast.
pub struct ToastRouter<S: ToastSink> {
    sink: S,
}

impl<S: ToastSink> ToastRouter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<S: ToastSink> UpdateSubscriber for ToastRouter<S> {
    fn on_update(&self, update: &NotificationModel) {
        self.sink.show(Toast::from_update(update));
    }
}
