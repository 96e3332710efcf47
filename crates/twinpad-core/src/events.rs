//! Change notifications.
//!
//! The coordinator never draws anything. After each state transition it emits the UI-adjacent
//! refreshes first and then the collaborator notification, through an [`EventBus`] that any
//! number of subscribers may listen on.

use crate::buffer::BufferId;
use crate::surface::SurfaceId;

/// Notifications delivered to collaborators (plugins, the shell).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// `buffer` became the current buffer of `view`.
    BufferActivated {
        /// The activated buffer.
        buffer: BufferId,
        /// The view it is shown in.
        view: SurfaceId,
    },
    /// The language of a buffer changed.
    LanguageChanged(BufferId),
    /// The read-only state of a buffer changed.
    ReadOnlyChanged(BufferId),
    /// A buffer is about to be destroyed.
    BeforeClose(BufferId),
    /// The file behind a buffer was deleted outside the editor.
    FileDeleted(BufferId),
}

/// UI-adjacent state that must be refreshed before a notification goes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshScope {
    /// Status display (encoding, language, position).
    StatusBar,
    /// Menu and toolbar enable state.
    MenuState,
    /// Tab strip of one view.
    TabStrip(SurfaceId),
    /// Which views are visible.
    Layout,
}

/// An event on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// Refresh dependent state.
    Refresh(RefreshScope),
    /// Collaborator notification.
    Notify(Notification),
}

/// Subscriber callback type.
pub type EventCallback = Box<dyn FnMut(&CoordinatorEvent) + Send>;

/// Fan-out of coordinator events.
#[derive(Default)]
pub struct EventBus {
    callbacks: Vec<EventCallback>,
    closed: bool,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.callbacks.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl EventBus {
    /// Register a subscriber.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&CoordinatorEvent) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Emit the refreshes in order, then the notification.
    pub(crate) fn notify(&mut self, notification: Notification, refresh: &[RefreshScope]) {
        if self.closed {
            log::debug!("dropping {notification:?} during teardown");
            return;
        }
        for scope in refresh {
            self.emit(&CoordinatorEvent::Refresh(*scope));
        }
        self.emit(&CoordinatorEvent::Notify(notification));
    }

    /// Emit a refresh with no notification attached.
    pub(crate) fn refresh(&mut self, scope: RefreshScope) {
        if !self.closed {
            self.emit(&CoordinatorEvent::Refresh(scope));
        }
    }

    fn emit(&mut self, event: &CoordinatorEvent) {
        for callback in &mut self.callbacks {
            callback(event);
        }
    }

    /// Stop delivering events.
    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    /// Returns `true` after teardown started.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn refresh_precedes_notification_and_close_silences() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut bus = EventBus::default();
        bus.subscribe(move |e| sink.lock().unwrap().push(*e));

        let id = crate::BufferStore::new(Default::default()).new_empty();
        bus.notify(Notification::LanguageChanged(id), &[RefreshScope::StatusBar]);
        bus.close();
        bus.notify(Notification::BeforeClose(id), &[]);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                CoordinatorEvent::Refresh(RefreshScope::StatusBar),
                CoordinatorEvent::Notify(Notification::LanguageChanged(id)),
            ]
        );
    }
}
