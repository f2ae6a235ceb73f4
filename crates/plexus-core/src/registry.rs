use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::bus::MessageBus;
use crate::event::{Event, CLICK};
use crate::frame::{self, FrameTarget, LoopReport};
use crate::guard;
use crate::module::{Module, ModuleContext};

/// Lifecycle of a [`ModuleRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelState {
    /// Nothing registered yet.
    Empty,
    /// Modules are being registered.
    Building,
    /// At least one frame loop has started.
    Running,
    /// Modules are being detached.
    Draining,
    /// Every module has been detached; the registry is inert.
    Terminated,
}

impl fmt::Display for KernelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KernelState::Empty => "empty",
            KernelState::Building => "building",
            KernelState::Running => "running",
            KernelState::Draining => "draining",
            KernelState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// The kernel: owns every module and the message bus.
///
/// Modules are updated in registration order and receive events in the
/// reverse order. Each module's hooks get a [`ModuleContext`] backed by this
/// registry's bus; nothing else holds a reference to a module.
pub struct ModuleRegistry {
    modules: Vec<Box<dyn Module>>,
    index: HashMap<String, usize>,
    bus: MessageBus,
    state: KernelState,
    isolate: bool,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    /// Empty registry. Hook and subscriber panics are isolated by default.
    pub fn new() -> Self {
        let mut bus = MessageBus::new();
        bus.set_isolation(true);
        Self {
            modules: Vec::new(),
            index: HashMap::new(),
            bus,
            state: KernelState::Empty,
            isolate: true,
        }
    }

    /// Whether panics raised by module hooks and bus subscribers are contained
    /// (logged, pass continues) or end the frame loop.
    pub fn set_isolation(&mut self, isolate: bool) {
        self.isolate = isolate;
        self.bus.set_isolation(isolate);
    }

    /// Register and immediately attach a module.
    ///
    /// Fails on a duplicate name, once shutdown has begun, or when the
    /// module's attach hook panics under isolation. A module that fails to
    /// attach is dropped without being registered.
    pub fn register(&mut self, mut module: Box<dyn Module>) -> Result<()> {
        if matches!(self.state, KernelState::Draining | KernelState::Terminated) {
            bail!(
                "cannot register module '{}' while the kernel is {}",
                module.name(),
                self.state
            );
        }
        let name = module.name().to_string();
        if self.index.contains_key(&name) {
            bail!("duplicate module name: {}", name);
        }
        if self.state == KernelState::Empty {
            self.state = KernelState::Building;
        }

        let mut ctx = ModuleContext::with_bus(&mut self.bus);
        if let Err(reason) = guard::run_hook(self.isolate, || module.attach(&mut ctx)) {
            guard::report(&name, "attach", &reason);
            bail!("module '{}' failed to attach", name);
        }

        tracing::info!(module = %name, position = self.modules.len(), "module attached");
        self.index.insert(name, self.modules.len());
        self.modules.push(module);
        Ok(())
    }

    /// Run exactly `frame_count` frames, synthesizing a `Click` event each
    /// frame.
    pub fn run_loop(&mut self, frame_count: u64, frame_interval: Duration) -> Result<LoopReport> {
        self.run_loop_with(frame_count, frame_interval, |_| Event::new(CLICK))
    }

    /// Run exactly `frame_count` frames, taking each frame's event from
    /// `source`.
    pub fn run_loop_with<S>(
        &mut self,
        frame_count: u64,
        frame_interval: Duration,
        source: S,
    ) -> Result<LoopReport>
    where
        S: FnMut(u64) -> Event,
    {
        if matches!(self.state, KernelState::Draining | KernelState::Terminated) {
            bail!("cannot run the frame loop while the kernel is {}", self.state);
        }
        self.state = KernelState::Running;
        tracing::info!(
            frame_count,
            interval_ms = frame_interval.as_millis() as u64,
            modules = self.modules.len(),
            "frame loop starting"
        );
        let report = frame::run_frames(self, frame_count, frame_interval, source);
        tracing::info!(
            frames = report.frames,
            handled = report.events_handled,
            "frame loop finished"
        );
        Ok(report)
    }

    /// Detach every module, most recently registered first, and drop them.
    /// Calling this again is a no-op.
    pub fn shutdown(&mut self) {
        if self.state == KernelState::Terminated {
            return;
        }
        self.state = KernelState::Draining;
        while let Some(mut module) = self.modules.pop() {
            let mut ctx = ModuleContext::with_bus(&mut self.bus);
            if let Err(reason) = guard::run_hook(self.isolate, || module.detach(&mut ctx)) {
                guard::report(module.name(), "detach", &reason);
            }
            tracing::info!(module = %module.name(), "module detached");
        }
        self.index.clear();
        self.state = KernelState::Terminated;
    }

    pub fn state(&self) -> KernelState {
        self.state
    }

    /// Module names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Module> {
        self.index.get(name).map(|&i| &*self.modules[i])
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut MessageBus {
        &mut self.bus
    }
}

impl FrameTarget for ModuleRegistry {
    fn update_all(&mut self, dt: f32) {
        let isolate = self.isolate;
        for module in &mut self.modules {
            let mut ctx = ModuleContext::with_bus(&mut self.bus);
            if let Err(reason) = guard::run_hook(isolate, || module.update(&mut ctx, dt)) {
                guard::report(module.name(), "update", &reason);
            }
        }
    }

    fn dispatch(&mut self, event: &mut Event) -> Option<String> {
        let isolate = self.isolate;
        for module in self.modules.iter_mut().rev() {
            let mut ctx = ModuleContext::with_bus(&mut self.bus);
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

impl Drop for ModuleRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
