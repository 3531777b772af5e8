use super::*;
use crate::connection::ConnectionState;
use std::sync::atomic::{AtomicUsize, Ordering};

fn counting_handler(counter: Arc<AtomicUsize>) -> EventHandler {
    Arc::new(move |_event| {
        counter.fetch_add(1, Ordering::SeqCst);
    })
}

fn status_event() -> FeedEvent {
    FeedEvent::StatusChange(ConnectionState::Connected)
}

#[test]
fn dispatch_reaches_subscriber() {
    let hub = EventHub::new();
    let hits = Arc::new(AtomicUsize::new(0));

    hub.subscribe(FeedEventKind::StatusChange, counting_handler(Arc::clone(&hits)));
    hub.dispatch(&status_event());

    // Dispatch is synchronous: the count is visible immediately
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn duplicate_registration_is_deduplicated() {
    let hub = EventHub::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let handler = counting_handler(Arc::clone(&hits));

    hub.subscribe(FeedEventKind::StatusChange, Arc::clone(&handler));
    hub.subscribe(FeedEventKind::StatusChange, Arc::clone(&handler));
    assert_eq!(hub.handler_count(FeedEventKind::StatusChange), 1);

    hub.dispatch(&status_event());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn distinct_handlers_each_run_once() {
    let hub = EventHub::new();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    hub.subscribe(FeedEventKind::StatusChange, counting_handler(Arc::clone(&first)));
    hub.subscribe(FeedEventKind::StatusChange, counting_handler(Arc::clone(&second)));
    hub.dispatch(&status_event());

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn unsubscribe_stops_delivery() {
    let hub = EventHub::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let handler = counting_handler(Arc::clone(&hits));

    hub.subscribe(FeedEventKind::StatusChange, Arc::clone(&handler));
    hub.unsubscribe(FeedEventKind::StatusChange, &handler);
    hub.dispatch(&status_event());

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn unsubscribe_unknown_handler_is_noop() {
    let hub = EventHub::new();
    let never_registered = counting_handler(Arc::new(AtomicUsize::new(0)));

    // No panic, no error
    hub.unsubscribe(FeedEventKind::EntityUpdate, &never_registered);
}

#[test]
fn kinds_are_independent() {
    let hub = EventHub::new();
    let hits = Arc::new(AtomicUsize::new(0));

    hub.subscribe(FeedEventKind::EntityUpdate, counting_handler(Arc::clone(&hits)));
    hub.dispatch(&status_event());

    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn handler_may_unsubscribe_itself_during_dispatch() {
    let hub = Arc::new(EventHub::new());
    let hits = Arc::new(AtomicUsize::new(0));

    let slot: Arc<parking_lot::Mutex<Option<EventHandler>>> =
        Arc::new(parking_lot::Mutex::new(None));

    let handler: EventHandler = {
        let hub = Arc::clone(&hub);
        let hits = Arc::clone(&hits);
        let slot = Arc::clone(&slot);
        Arc::new(move |_event| {
            hits.fetch_add(1, Ordering::SeqCst);
            if let Some(me) = slot.lock().as_ref() {
                hub.unsubscribe(FeedEventKind::StatusChange, me);
            }
        })
    };
    *slot.lock() = Some(Arc::clone(&handler));

    hub.subscribe(FeedEventKind::StatusChange, handler);
    hub.dispatch(&status_event());
    hub.dispatch(&status_event());

    // First dispatch ran it and removed it; second dispatch skipped it
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
