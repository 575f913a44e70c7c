//! In-context event bus.
//!
//! A typed publish/subscribe channel shared by the components of one
//! execution context (the canvas or the control panel). Delivery is
//! synchronous and FIFO relative to dispatch order: an event published from
//! inside a handler is queued and delivered after the current event has
//! reached every subscriber, never nested inside it.
//!
//! The bus is single-threaded (`Rc`-based); it is cloned, not shared across
//! threads. Crossing into another context goes through
//! [`crate::boundary::BoundaryPort`].

use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

/// Something that can travel on a [`LocalBus`]: it names its channel.
pub trait BusEvent: 'static {
    fn channel(&self) -> &'static str;
}

impl BusEvent for crate::protocol::Event {
    fn channel(&self) -> &'static str {
        self.name()
    }
}

type Handler<E> = Rc<dyn Fn(&E)>;

struct Subscriber<E> {
    id: u64,
    /// `None` receives every channel.
    channel: Option<&'static str>,
    handler: Handler<E>,
}

struct BusInner<E> {
    next_id: u64,
    subscribers: Vec<Subscriber<E>>,
    queue: VecDeque<E>,
    delivering: bool,
}

/// A cloneable handle to one context's bus.
pub struct LocalBus<E: BusEvent> {
    inner: Rc<RefCell<BusInner<E>>>,
}

impl<E: BusEvent> Clone for LocalBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: BusEvent> Default for LocalBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> LocalBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                next_id: 0,
                subscribers: Vec::new(),
                queue: VecDeque::new(),
                delivering: false,
            })),
        }
    }

    /// Receive events published on `channel`. The returned guard
    /// unsubscribes when dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, channel: &'static str, handler: impl Fn(&E) + 'static) -> Subscription {
        self.add_subscriber(Some(channel), Rc::new(handler))
    }

    /// Receive every event regardless of channel.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe_all(&self, handler: impl Fn(&E) + 'static) -> Subscription {
        self.add_subscriber(None, Rc::new(handler))
    }

    fn add_subscriber(&self, channel: Option<&'static str>, handler: Handler<E>) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(Subscriber {
            id,
            channel,
            handler,
        });
        let weak: Weak<RefCell<BusInner<E>>> = Rc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().subscribers.retain(|s| s.id != id);
                }
            })),
        }
    }

    /// Publish an event. Returns after the event (and anything published
    /// while delivering it) has reached all current subscribers.
    pub fn publish(&self, event: E) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.queue.push_back(event);
            if inner.delivering {
                return;
            }
            inner.delivering = true;
        }
        let _drain = DeliveryGuard(&self.inner);

        loop {
            let (event, handlers) = {
                let mut inner = self.inner.borrow_mut();
                let Some(event) = inner.queue.pop_front() else {
                    break;
                };
                let channel = event.channel();
                let handlers: SmallVec<[Handler<E>; 4]> = inner
                    .subscribers
                    .iter()
                    .filter(|s| s.channel.is_none_or(|c| c == channel))
                    .map(|s| Rc::clone(&s.handler))
                    .collect();
                (event, handlers)
            };
            log::debug!("bus: {} → {} subscriber(s)", event.channel(), handlers.len());
            for handler in handlers {
                handler(&event);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

/// Clears the delivering flag even if a handler panics, so the bus stays
/// usable.
struct DeliveryGuard<'a, E>(&'a Rc<RefCell<BusInner<E>>>);

impl<E> Drop for DeliveryGuard<'_, E> {
    fn drop(&mut self) {
        let mut inner = self.0.borrow_mut();
        inner.delivering = false;
        if std::thread::panicking() {
            inner.queue.clear();
        }
    }
}

/// RAII subscription handle.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Keep the subscription alive for the lifetime of the bus.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(&'static str, u32);

    impl BusEvent for Ping {
        fn channel(&self) -> &'static str {
            self.0
        }
    }

    #[test]
    fn delivers_by_channel() {
        let bus = LocalBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _sub = bus.subscribe("a", move |p: &Ping| sink.borrow_mut().push(p.1));

        bus.publish(Ping("a", 1));
        bus.publish(Ping("b", 2));
        bus.publish(Ping("a", 3));
        assert_eq!(*seen.borrow(), vec![1, 3]);
    }

    #[test]
    fn reentrant_publish_is_fifo() {
        let bus: LocalBus<Ping> = LocalBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let echo_bus = bus.clone();
        let _echo = bus.subscribe("first", move |p: &Ping| {
            echo_bus.publish(Ping("second", p.1 + 100));
        });
        let sink = Rc::clone(&seen);
        let _log = bus.subscribe_all(move |p: &Ping| sink.borrow_mut().push((p.0, p.1)));

        bus.publish(Ping("first", 1));
        // "first" reaches every subscriber before the echoed "second".
        assert_eq!(*seen.borrow(), vec![("first", 1), ("second", 101)]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let bus: LocalBus<Ping> = LocalBus::new();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let sub = bus.subscribe_all(move |_| *sink.borrow_mut() += 1);
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(Ping("x", 0));
        drop(sub);
        bus.publish(Ping("x", 0));
        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn detached_subscription_outlives_guard() {
        let bus: LocalBus<Ping> = LocalBus::new();
        bus.subscribe_all(|_| {}).detach();
        assert_eq!(bus.subscriber_count(), 1);
    }
}
