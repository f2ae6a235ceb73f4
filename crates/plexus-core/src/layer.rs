use std::time::Duration;

use anyhow::{bail, Result};

use crate::event::{Event, CLICK};
use crate::frame::{self, FrameTarget, LoopReport};
use crate::guard;
use crate::module::{Module, ModuleContext};

/// A two-band module stack without a message bus.
///
/// One sequence split by `insert_index`: everything before it is a *layer*,
/// everything from it onward is an *overlay*. Layers keep push order among
/// themselves and always precede every overlay, so overlays are updated last
/// and see events first.
pub struct LayerStack {
    modules: Vec<Box<dyn Module>>,
    insert_index: usize,
    isolate: bool,
    terminated: bool,
}

impl Default for LayerStack {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStack {
    /// Empty stack. Hook panics are isolated by default.
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            insert_index: 0,
            isolate: true,
            terminated: false,
        }
    }

    pub fn set_isolation(&mut self, isolate: bool) {
        self.isolate = isolate;
    }

    /// Attach, then insert at the layer/overlay boundary. A module whose
    /// attach panics is rejected and the stack is left unchanged.
    pub fn push_layer(&mut self, mut module: Box<dyn Module>) -> Result<()> {
        self.check_push(module.as_ref())?;
        let at = self.insert_index;
        self.attach(module.as_mut(), "layer", at)?;
        self.modules.insert(at, module);
        self.insert_index += 1;
        Ok(())
    }

    /// Attach, then append after every existing entry.
    pub fn push_overlay(&mut self, mut module: Box<dyn Module>) -> Result<()> {
        self.check_push(module.as_ref())?;
        let at = self.modules.len();
        self.attach(module.as_mut(), "overlay", at)?;
        self.modules.push(module);
        Ok(())
    }

    fn check_push(&self, module: &dyn Module) -> Result<()> {
        if self.terminated {
            bail!("cannot push '{}' onto a layer stack that was shut down", module.name());
        }
        if self.modules.iter().any(|m| m.name() == module.name()) {
            bail!("duplicate module name: {}", module.name());
        }
        Ok(())
    }

    fn attach(&self, module: &mut dyn Module, band: &'static str, at: usize) -> Result<()> {
        let mut ctx = ModuleContext::detached();
        if let Err(reason) = guard::run_hook(self.isolate, || module.attach(&mut ctx)) {
            guard::report(module.name(), "attach", &reason);
            bail!("module '{}' failed to attach", module.name());
        }
        tracing::info!(module = %module.name(), band, position = at, "module attached");
        Ok(())
    }

    /// Boundary between layers and overlays.
    pub fn insert_index(&self) -> usize {
        self.insert_index
    }

    /// All names, layers first.
    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn layers(&self) -> Vec<&str> {
        self.modules[..self.insert_index]
            .iter()
            .map(|m| m.name())
            .collect()
    }

    pub fn overlays(&self) -> Vec<&str> {
        self.modules[self.insert_index..]
            .iter()
            .map(|m| m.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn run_loop(&mut self, frame_count: u64, frame_interval: Duration) -> Result<LoopReport> {
        self.run_loop_with(frame_count, frame_interval, |_| Event::new(CLICK))
    }

    pub fn run_loop_with<S>(
        &mut self,
        frame_count: u64,
        frame_interval: Duration,
        source: S,
    ) -> Result<LoopReport>
    where
        S: FnMut(u64) -> Event,
    {
        if self.terminated {
            bail!("cannot run a layer stack that was shut down");
        }
        Ok(frame::run_frames(self, frame_count, frame_interval, source))
    }

    /// Detach overlays then layers, each band newest first.
    pub fn shutdown(&mut self) {
        if self.terminated {
            return;
        }
        while let Some(mut module) = self.modules.pop() {
            let mut ctx = ModuleContext::detached();
            if let Err(reason) = guard::run_hook(self.isolate, || module.detach(&mut ctx)) {
                guard::report(module.name(), "detach", &reason);
            }
            tracing::info!(module = %module.name(), "module detached");
        }
        self.insert_index = 0;
        self.terminated = true;
    }
}

impl FrameTarget for LayerStack {
    fn update_all(&mut self, dt: f32) {
        let isolate = self.isolate;
        for module in &mut self.modules {
            let mut ctx = ModuleContext::detached();
            if let Err(reason) = guard::run_hook(isolate, || module.update(&mut ctx, dt)) {
                guard::report(module.name(), "update", &reason);
            }
        }
    }

    fn dispatch(&mut self, event: &mut Event) -> Option<String> {
        let isolate = self.isolate;
        for module in self.modules.iter_mut().rev() {
            let mut ctx = ModuleContext::detached();
            if let Err(reason) = guard::run_hook(isolate, || module.handle_event(&mut ctx, event)) {
                guard::report(module.name(), "handle_event", &reason);
            }
            if event.handled {
                return Some(module.name().to_string());
            }
        }
        None
    }
}

impl Drop for LayerStack {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: String,
        consumes: bool,
        log: Journal,
    }

    impl Recorder {
        fn boxed(name: &str, log: &Journal) -> Box<dyn Module> {
            Box::new(Self { name: name.to_string(), consumes: false, log: log.clone() })
        }

        fn consumer(name: &str, log: &Journal) -> Box<dyn Module> {
            Box::new(Self { name: name.to_string(), consumes: true, log: log.clone() })
        }
    }

    impl Module for Recorder {
        fn name(&self) -> &str { &self.name }
        fn attach(&mut self, ctx: &mut ModuleContext<'_>) {
            let bus = if ctx.has_bus() { "+bus" } else { "" };
            self.log.borrow_mut().push(format!("{}:attach{}", self.name, bus));
        }
        fn detach(&mut self, _ctx: &mut ModuleContext<'_>) {
            self.log.borrow_mut().push(format!("{}:detach", self.name));
        }
        fn update(&mut self, _ctx: &mut ModuleContext<'_>, _dt: f32) {
            self.log.borrow_mut().push(format!("{}:update", self.name));
        }
        fn handle_event(&mut self, _ctx: &mut ModuleContext<'_>, ev: &mut Event) {
            self.log.borrow_mut().push(format!("{}:event", self.name));
            if self.consumes && ev.is(CLICK) {
                ev.consume();
            }
        }
    }

    #[test]
    fn layer_pushed_after_overlay_lands_before_it() {
        let log = Journal::default();
        let mut stack = LayerStack::new();
        stack.push_layer(Recorder::boxed("L1", &log)).unwrap();
        stack.push_overlay(Recorder::boxed("O1", &log)).unwrap();
        stack.push_layer(Recorder::boxed("L2", &log)).unwrap();

        assert_eq!(stack.names(), vec!["L1", "L2", "O1"]);
        assert_eq!(stack.layers(), vec!["L1", "L2"]);
        assert_eq!(stack.overlays(), vec!["O1"]);
        assert_eq!(stack.insert_index(), 2);
        assert_eq!(log.borrow().as_slice(), &["L1:attach", "O1:attach", "L2:attach"]);
    }

    #[test]
    fn bands_stay_partitioned_for_any_push_sequence() {
        let log = Journal::default();
        let mut stack = LayerStack::new();
        // Deterministic mix of pushes: bit set => overlay.
        let pattern: u32 = 0b1011_0010_1101;
        for i in 0..12 {
            let overlay = pattern & (1 << i) != 0;
            let name = format!("{}{}", if overlay { "O" } else { "L" }, i);
            if overlay {
                stack.push_overlay(Recorder::boxed(&name, &log)).unwrap();
            } else {
                stack.push_layer(Recorder::boxed(&name, &log)).unwrap();
            }

            let names = stack.names();
            let last_layer = names.iter().rposition(|n| n.starts_with('L'));
            let first_overlay = names.iter().position(|n| n.starts_with('O'));
            if let (Some(l), Some(o)) = (last_layer, first_overlay) {
                assert!(l < o, "layer after overlay in {:?}", names);
            }
            assert!(stack.layers().iter().all(|n| n.starts_with('L')));
            assert!(stack.overlays().iter().all(|n| n.starts_with('O')));
        }

        // Push order is preserved inside each band.
        let layers = stack.layers();
        let mut sorted = layers.clone();
        sorted.sort_by_key(|n| n[1..].parse::<u32>().unwrap());
        assert_eq!(layers, sorted);
    }

    #[test]
    fn overlays_see_events_first() {
        let log = Journal::default();
        let mut stack = LayerStack::new();
        stack.push_layer(Recorder::consumer("render", &log)).unwrap();
        stack.push_overlay(Recorder::consumer("ui", &log)).unwrap();
        log.borrow_mut().clear();

        let mut ev = Event::new(CLICK);
        assert_eq!(stack.dispatch(&mut ev).as_deref(), Some("ui"));
        assert_eq!(log.borrow().as_slice(), &["ui:event"]);
    }

    #[test]
    fn run_loop_updates_layers_before_overlays() {
        let log = Journal::default();
        let mut stack = LayerStack::new();
        stack.push_overlay(Recorder::boxed("O1", &log)).unwrap();
        stack.push_layer(Recorder::boxed("L1", &log)).unwrap();
        log.borrow_mut().clear();

        let report = stack.run_loop(2, Duration::ZERO).unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.events_handled, 0);
        assert_eq!(
            log.borrow().as_slice(),
            &[
                "L1:update", "O1:update", "O1:event", "L1:event",
                "L1:update", "O1:update", "O1:event", "L1:event",
            ]
        );
    }

    #[test]
    fn duplicate_names_rejected_across_bands() {
        let log = Journal::default();
        let mut stack = LayerStack::new();
        stack.push_layer(Recorder::boxed("x", &log)).unwrap();
        let err = stack.push_overlay(Recorder::boxed("x", &log)).unwrap_err();
        assert!(err.to_string().contains("duplicate module name"));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn shutdown_detaches_in_reverse_and_blocks_pushes() {
        let log = Journal::default();
        let mut stack = LayerStack::new();
        stack.push_layer(Recorder::boxed("L1", &log)).unwrap();
        stack.push_overlay(Recorder::boxed("O1", &log)).unwrap();
        stack.push_layer(Recorder::boxed("L2", &log)).unwrap();
        log.borrow_mut().clear();

        stack.shutdown();
        assert_eq!(log.borrow().as_slice(), &["O1:detach", "L2:detach", "L1:detach"]);
        assert!(stack.is_empty());
        assert!(stack.push_layer(Recorder::boxed("L3", &log)).is_err());
        assert!(stack.run_loop(1, Duration::ZERO).is_err());
    }

    struct FailsToAttach {
        log: Journal,
    }

    impl Module for FailsToAttach {
        fn name(&self) -> &str { "bad" }
        fn attach(&mut self, _ctx: &mut ModuleContext<'_>) {
            panic!("asset missing");
        }
        fn detach(&mut self, _ctx: &mut ModuleContext<'_>) {
            self.log.borrow_mut().push("bad:detach".to_string());
        }
        fn update(&mut self, _ctx: &mut ModuleContext<'_>, _dt: f32) {
            self.log.borrow_mut().push("bad:update".to_string());
        }
    }

    #[test]
    fn attach_panic_rejects_the_push_and_keeps_the_boundary() {
        let log = Journal::default();
        let mut stack = LayerStack::new();
        stack.push_layer(Recorder::boxed("L1", &log)).unwrap();
        stack.push_overlay(Recorder::boxed("O1", &log)).unwrap();

        let err = stack
            .push_layer(Box::new(FailsToAttach { log: log.clone() }))
            .unwrap_err();
        assert!(err.to_string().contains("failed to attach"));
        assert_eq!(stack.insert_index(), 1);
        assert_eq!(stack.names(), vec!["L1", "O1"]);

        let err = stack
            .push_overlay(Box::new(FailsToAttach { log: log.clone() }))
            .unwrap_err();
        assert!(err.to_string().contains("failed to attach"));
        assert_eq!(stack.insert_index(), 1);
        assert_eq!(stack.len(), 2);

        // The name is free again once the failed push is dropped.
        stack.push_layer(Recorder::boxed("L2", &log)).unwrap();
        assert_eq!(stack.layers(), vec!["L1", "L2"]);

        log.borrow_mut().clear();
        stack.run_loop(1, Duration::ZERO).unwrap();
        stack.shutdown();
        let log = log.borrow();
        assert!(!log.iter().any(|entry| entry.starts_with("bad:")), "{:?}", log);
        assert_eq!(&log[log.len() - 3..], &["O1:detach", "L2:detach", "L1:detach"]);
    }
}
