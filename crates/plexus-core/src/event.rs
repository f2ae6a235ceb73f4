/// Name of the input event synthesized once per frame when the host does not
/// supply its own event source.
pub const CLICK: &str = "Click";

/// A transient, consumable input signal.
///
/// Events are walked across modules from the most recently registered to the
/// first one. The first module that sets [`handled`](Event::handled) stops the
/// walk for this instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub handled: bool,
}

impl Event {
    /// Create an unhandled event with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handled: false,
        }
    }

    /// Return `true` if this event carries the given name.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Mark the event as consumed.
    pub fn consume(&mut self) {
        self.handled = true;
    }
}
