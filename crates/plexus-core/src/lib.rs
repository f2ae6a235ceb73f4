//! Core of the PLEXUS module kernel.
//!
//! A [`registry::ModuleRegistry`] owns named modules, attaches them in
//! registration order, drives a bounded frame loop (update first-to-last,
//! then one event walked last-to-first until handled) and detaches them on
//! shutdown. Modules reach each other only through the registry's
//! [`bus::MessageBus`]. [`layer::LayerStack`] is the bus-less variant that
//! splits registration into layers and overlays.

pub mod bus;
pub mod event;
pub mod frame;
mod guard;
pub mod layer;
pub mod logging;
pub mod module;
pub mod registry;

pub use bus::{MessageBus, SubscriptionId, MODULE_READY};
pub use event::Event;
pub use frame::{FrameTarget, LoopReport};
pub use layer::LayerStack;
pub use module::{Module, ModuleContext};
pub use registry::{KernelState, ModuleRegistry};
