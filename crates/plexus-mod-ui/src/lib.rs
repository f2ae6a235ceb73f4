use std::cell::RefCell;
use std::rc::Rc;

use plexus_core::{bus::MODULE_READY, event::CLICK, Event, Module, ModuleContext, SubscriptionId};

pub const NAME: &str = "UI";

/// A minimal menu overlay.
///
/// Listens for [`MODULE_READY`] announcements and consumes `Click` events so
/// nothing registered before it sees them. Serves as the reference
/// implementation of a bus subscriber.
pub struct UiModule {
    label: String,
    ready: Rc<RefCell<Vec<String>>>,
    subscription: Option<SubscriptionId>,
    clicks: u64,
}

impl Default for UiModule {
    fn default() -> Self {
        Self::new()
    }
}

impl UiModule {
    pub fn new() -> Self {
        Self {
            label: "New Game".to_string(),
            ready: Rc::new(RefCell::new(Vec::new())),
            subscription: None,
            clicks: 0,
        }
    }

    /// Names of modules whose readiness this module has heard about.
    pub fn ready_modules(&self) -> Vec<String> {
        self.ready.borrow().clone()
    }

    /// Shared view of [`ready_modules`](Self::ready_modules) that outlives
    /// the module being boxed into a registry.
    pub fn ready_log(&self) -> Rc<RefCell<Vec<String>>> {
        self.ready.clone()
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }
}

impl Module for UiModule {
    fn name(&self) -> &str {
        NAME
    }

    fn attach(&mut self, ctx: &mut ModuleContext<'_>) {
        let ready = self.ready.clone();
        self.subscription = ctx.subscribe(
            MODULE_READY,
            Box::new(move |module| {
                tracing::info!(module, "received message: module ready");
                ready.borrow_mut().push(module.to_string());
            }),
        );
        tracing::info!(subscribed = self.subscription.is_some(), "ui attached");
    }

    fn detach(&mut self, ctx: &mut ModuleContext<'_>) {
        if let Some(id) = self.subscription.take() {
            ctx.unsubscribe(id);
        }
        tracing::info!(clicks = self.clicks, "ui detached");
    }

    fn update(&mut self, _ctx: &mut ModuleContext<'_>, dt: f32) {
        tracing::debug!(dt, label = %self.label, "render menu");
    }

    fn handle_event(&mut self, _ctx: &mut ModuleContext<'_>, event: &mut Event) {
        if event.is(CLICK) {
            self.clicks += 1;
            event.consume();
            tracing::info!(clicks = self.clicks, "click handled");
        }
    }
}
