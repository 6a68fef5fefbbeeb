//! The items selected for checkout, shared by everyone in the process.
//!
//! Mutations notify every subscribed observer synchronously, once per mutation, before they
//! return. Observers run after the state lock is released so they are free to read the state
//! (or mutate it, which notifies again).

use std::sync::{Arc, LazyLock, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::api::{MenuItem, Order};

/// What a mutation did
#[derive(Debug, Clone, PartialEq)]
pub enum OrderChange {
    Appended { index: usize },
    Removed { index: usize, item: MenuItem },
    Cleared,
}

type Observer = Arc<dyn Fn(&OrderChange, &Order) + Send + Sync>;

#[derive(Default)]
struct Inner {
    items: Vec<MenuItem>,
    observers: Vec<(u64, Observer)>,
    next_observer: u64,
}

static SHARED: LazyLock<OrderState> = LazyLock::new(OrderState::new);

/// Handle on an ordered list of menu items.
///
/// Clones share the same list and observers.
#[derive(Clone, Default)]
pub struct OrderState {
    inner: Arc<Mutex<Inner>>,
}

impl OrderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide order
    pub fn shared() -> &'static OrderState {
        &SHARED
    }

    pub fn append(&self, item: MenuItem) {
        let (index, snapshot, observers) = {
            let mut inner = self.inner.lock();
            inner.items.push(item);
            (inner.items.len() - 1, Self::capture(&inner), Self::observers(&inner))
        };
        Self::notify(observers, OrderChange::Appended { index }, &snapshot);
    }

    /// Remove the item at `index`, shifting the following ones down.
    ///
    /// Out of range indices leave the order untouched and notify nobody.
    pub fn remove_at(&self, index: usize) -> Option<MenuItem> {
        let (item, snapshot, observers) = {
            let mut inner = self.inner.lock();
            if index >= inner.items.len() {
                return None;
            }
            let item = inner.items.remove(index);
            (item, Self::capture(&inner), Self::observers(&inner))
        };
        Self::notify(
            observers,
            OrderChange::Removed {
                index,
                item: item.clone(),
            },
            &snapshot,
        );
        Some(item)
    }

    /// Empty the order, as after a completed checkout
    pub fn remove_all(&self) {
        let (snapshot, observers) = {
            let mut inner = self.inner.lock();
            inner.items.clear();
            (Self::capture(&inner), Self::observers(&inner))
        };
        Self::notify(observers, OrderChange::Cleared, &snapshot);
    }

    pub fn current_items(&self) -> Vec<MenuItem> {
        self.inner.lock().items.clone()
    }

    pub fn snapshot(&self) -> Order {
        Self::capture(&self.inner.lock())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.inner.lock().items.iter().map(|item| item.price).sum()
    }

    pub fn menu_ids(&self) -> Vec<u32> {
        self.inner.lock().items.iter().map(|item| item.id).collect()
    }

    /// Call `observer` after every mutation until the returned subscription is dropped
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&OrderChange, &Order) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = inner.next_observer;
        inner.next_observer += 1;
        inner.observers.push((id, Arc::new(observer)));
        trace!(id, observers = inner.observers.len(), "order observer subscribed");

        Subscription {
            state: Arc::downgrade(&self.inner),
            id,
            active: true,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.inner.lock().observers.len()
    }

    fn capture(inner: &Inner) -> Order {
        Order {
            menu_items: inner.items.clone(),
        }
    }

    fn observers(inner: &Inner) -> Vec<Observer> {
        inner.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
    }

    fn notify(observers: Vec<Observer>, change: OrderChange, snapshot: &Order) {
        trace!(?change, observers = observers.len(), "order changed");
        for observer in observers {
            observer(&change, snapshot);
        }
    }
}

/// Keeps an observer registered; dropping it unsubscribes
#[must_use = "dropping a subscription unsubscribes its observer"]
pub struct Subscription {
    state: Weak<Mutex<Inner>>,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    /// Keep the observer for as long as the order itself lives
    pub fn detach(mut self) {
        self.active = false;
    }

    fn remove(&mut self) {
        if !std::mem::take(&mut self.active) {
            return;
        }
        if let Some(state) = self.state.upgrade() {
            let id = self.id;
            state.lock().observers.retain(|(other, _)| *other != id);
            trace!(id, "order observer unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}
