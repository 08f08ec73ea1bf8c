use std::cell::RefCell;
use std::rc::Rc;

use crate::event::{EventHandler, SessionEvent};

/// Records every session event it receives.
///
/// Clones share the same log, so keep one clone and subscribe the other.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<SessionEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the events recorded so far
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.borrow().clone()
    }

    /// Remove and return the recorded events
    pub fn drain(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl EventHandler for EventLog {
    fn handle_event(&mut self, event: &SessionEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
