use std::cell::RefCell;
use std::collections::VecDeque;

use crate::event::{EventHandler, SessionEvent};

/// Broadcasts [`SessionEvent`]s to subscribed handlers, in subscription order.
///
/// Delivery is synchronous. An event emitted while another is being
/// delivered, e.g. by a handler holding a clone of the session's state, is
/// queued and delivered after the current one finishes, so every handler
/// sees events in emission order. Handlers subscribed during delivery start
/// receiving with the next event.
pub struct EventBus {
    handlers: RefCell<Vec<Box<dyn EventHandler>>>,
    /// Handlers subscribed while `handlers` was borrowed for delivery
    joining: RefCell<Vec<Box<dyn EventHandler>>>,
    /// Events emitted during delivery
    backlog: RefCell<VecDeque<SessionEvent>>,
}

// Subscriptions belong to one session; a cloned bus starts without any.
impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &format!("<{} handlers>", self.handler_count()))
            .field("backlog", &self.backlog.borrow().len())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            joining: RefCell::new(Vec::new()),
            backlog: RefCell::new(VecDeque::new()),
        }
    }

    /// Subscribe a handler to every later event
    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        match self.handlers.try_borrow_mut() {
            Ok(mut handlers) => handlers.push(handler),
            Err(_) => self.joining.borrow_mut().push(handler),
        }
    }

    pub fn handler_count(&self) -> usize {
        let active = self.handlers.try_borrow().map_or(0, |handlers| handlers.len());
        active + self.joining.borrow().len()
    }

    /// Deliver an event to all handlers, or queue it if a delivery is running
    pub fn emit(&self, event: SessionEvent) {
        let Ok(mut handlers) = self.handlers.try_borrow_mut() else {
            log::trace!("Queueing {:?} behind the event being delivered", event);
            self.backlog.borrow_mut().push_back(event);
            return;
        };

        let mut next = Some(event);
        while let Some(event) = next {
            for handler in handlers.iter_mut() {
                handler.handle_event(&event);
            }
            handlers.append(&mut self.joining.borrow_mut());
            next = self.backlog.borrow_mut().pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventLog;
    use std::rc::Rc;

    #[test]
    fn test_handlers_receive_events_in_order() {
        let bus = EventBus::new();
        let first = EventLog::new();
        let second = EventLog::new();
        bus.subscribe(Box::new(first.clone()));
        bus.subscribe(Box::new(second.clone()));

        bus.emit(SessionEvent::PropertiesChanged(vec!["a".to_owned()]));
        bus.emit(SessionEvent::MeasurementUpdated(None));

        assert_eq!(first.events(), second.events());
        assert_eq!(first.events().len(), 2);
        assert_eq!(bus.handler_count(), 2);
    }

    #[test]
    fn test_emit_during_delivery_is_queued() {
        let bus = Rc::new(EventBus::new());
        let log = EventLog::new();

        let relay = Rc::clone(&bus);
        bus.subscribe(Box::new(move |event: &SessionEvent| {
            if let SessionEvent::UploadRejected { message } = event {
                relay.emit(SessionEvent::PropertiesChanged(vec![message.clone()]));
            }
        }));
        bus.subscribe(Box::new(log.clone()));

        bus.emit(SessionEvent::UploadRejected {
            message: "bad.json".to_owned(),
        });

        assert_eq!(
            log.events(),
            vec![
                SessionEvent::UploadRejected {
                    message: "bad.json".to_owned()
                },
                SessionEvent::PropertiesChanged(vec!["bad.json".to_owned()]),
            ]
        );
    }
}
