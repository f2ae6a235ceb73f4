use crate::bus::{Callback, MessageBus, SubscriptionId};
use crate::event::Event;

/// What a module hook gets to talk to besides itself.
///
/// Under [`crate::registry::ModuleRegistry`] the context carries the
/// registry's [`MessageBus`]. Under [`crate::layer::LayerStack`] there is no
/// bus: publishing reaches nobody and subscribing is refused.
pub struct ModuleContext<'a> {
    bus: Option<&'a mut MessageBus>,
}

impl<'a> ModuleContext<'a> {
    /// Context backed by a message bus.
    pub fn with_bus(bus: &'a mut MessageBus) -> Self {
        Self { bus: Some(bus) }
    }

    /// Context for hosts that provide no bus.
    pub fn detached() -> Self {
        Self { bus: None }
    }

    pub fn has_bus(&self) -> bool {
        self.bus.is_some()
    }

    /// Publish on the bus. Returns the number of subscribers reached, `0`
    /// when there is no bus.
    pub fn publish(&mut self, topic: &str, payload: &str) -> usize {
        match self.bus.as_deref_mut() {
            Some(bus) => bus.publish(topic, payload),
            None => 0,
        }
    }

    /// Subscribe on the bus. Returns `None` when there is no bus.
    pub fn subscribe(&mut self, topic: &str, callback: Callback) -> Option<SubscriptionId> {
        self.bus
            .as_deref_mut()
            .map(|bus| bus.subscribe(topic, callback))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus
            .as_deref_mut()
            .is_some_and(|bus| bus.unsubscribe(id))
    }
}

/// A pluggable unit driven by the kernel.
///
/// Modules have a unique [`name`](Module::name) and four hooks, each with a
/// no-op default:
///
/// - [`attach`](Module::attach) runs once, at registration, before the module
///   sees any update or event.
/// - [`update`](Module::update) runs once per frame, in registration order.
/// - [`handle_event`](Module::handle_event) runs in reverse registration
///   order until some module marks the event handled.
/// - [`detach`](Module::detach) runs once at shutdown. No hook runs after it.
///
/// Hooks do not return errors. A module contains its own failures and reports
/// them through logging or the bus.
pub trait Module {
    /// Unique, stable identifier (e.g. `"Rendering"`, `"UI"`).
    fn name(&self) -> &str;

    fn attach(&mut self, _ctx: &mut ModuleContext<'_>) {}

    fn detach(&mut self, _ctx: &mut ModuleContext<'_>) {}

    /// `dt` is the time in seconds since the previous frame started.
    fn update(&mut self, _ctx: &mut ModuleContext<'_>, _dt: f32) {}

    /// Inspect `event` and call [`Event::consume`] to stop propagation. An
    /// unrecognised event must be left untouched.
    fn handle_event(&mut self, _ctx: &mut ModuleContext<'_>, _event: &mut Event) {}
}
