//! Explicit subscription lists used for change notification.
use core::fmt;

/// Handle returned by [`Signal::connect`], used to disconnect a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection(u64);

/// A synchronous, single-threaded list of listeners.
///
/// Listeners run in connection order every time the signal is emitted.
pub struct Signal<T> {
    slots: Vec<(Connection, Box<dyn FnMut(&T)>)>,
    next_id: u64,
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.slots.len())
            .finish()
    }
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn connect(&mut self, listener: impl FnMut(&T) + 'static) -> Connection {
        let id = Connection(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.slots.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not connected.
    pub fn disconnect(&mut self, connection: Connection) -> bool {
        let before = self.slots.len();
        self.slots.retain(|(id, _)| *id != connection);
        self.slots.len() != before
    }

    pub fn emit(&mut self, value: &T) {
        for (_, listener) in &mut self.slots {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
