use anyhow::Result;

use plexus_config::{KernelConfig, RunMode};
use plexus_core::{
    logging::{self, LogSettings},
    Event, LayerStack, LoopReport, ModuleRegistry,
};
use plexus_mod_render::{FsResourceLoader, RenderingModule, TraceSurface};
use plexus_mod_ui::UiModule;

fn rendering_module(config: &KernelConfig) -> RenderingModule {
    RenderingModule::new(
        config.render.asset.as_str(),
        Box::new(FsResourceLoader::new(&config.render.asset_root)),
        Box::new(TraceSurface::new()),
    )
}

/// Bus-backed kernel: rendering first, UI last so it sees input first.
fn run_kernel(config: &KernelConfig) -> Result<LoopReport> {
    let mut kernel = ModuleRegistry::new();
    kernel.set_isolation(config.isolate_modules);
    kernel.register(Box::new(rendering_module(config)))?;
    kernel.register(Box::new(UiModule::new()))?;

    let input = config.input_event.as_str();
    let report = kernel.run_loop_with(config.frame_count, config.frame_interval(), |_| {
        Event::new(input)
    })?;
    kernel.shutdown();
    Ok(report)
}

/// Layer stack: rendering as a layer, UI as an overlay.
fn run_layered(config: &KernelConfig) -> Result<LoopReport> {
    let mut stack = LayerStack::new();
    stack.set_isolation(config.isolate_modules);
    stack.push_layer(Box::new(rendering_module(config)))?;
    stack.push_overlay(Box::new(UiModule::new()))?;

    let input = config.input_event.as_str();
    let report = stack.run_loop_with(config.frame_count, config.frame_interval(), |_| {
        Event::new(input)
    })?;
    stack.shutdown();
    Ok(report)
}

fn run(config: &KernelConfig) -> Result<LoopReport> {
    match config.mode {
        RunMode::Kernel => run_kernel(config),
        RunMode::Layered => run_layered(config),
    }
}

fn main() -> Result<()> {
    let config = KernelConfig::load()?;
    let _log_guard = logging::init(&LogSettings {
        filter: config.log.filter.clone(),
        json: config.log.json,
        file: config.log.file,
    });
    tracing::info!(mode = ?config.mode, "PLEXUS starting up");

    let report = run(&config)?;
    tracing::info!(
        frames = report.frames,
        events = report.events_dispatched,
        handled = report.events_handled,
        "PLEXUS shut down"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(mode: RunMode) -> KernelConfig {
        KernelConfig {
            mode,
            frame_interval_ms: 0,
            ..KernelConfig::default()
        }
    }

    #[test]
    fn kernel_mode_runs_configured_frames() {
        let report = run(&quick(RunMode::Kernel)).unwrap();
        assert_eq!(report.frames, 5);
        assert_eq!(report.events_dispatched, 5);
        assert_eq!(report.events_handled, 5);
    }

    #[test]
    fn layered_mode_runs_configured_frames() {
        let report = run(&quick(RunMode::Layered)).unwrap();
        assert_eq!(report.frames, 5);
        assert_eq!(report.events_handled, 5);
    }

    #[test]
    fn unhandled_input_event_passes_through() {
        let config = KernelConfig {
            input_event: "Scroll".to_string(),
            frame_count: 3,
            ..quick(RunMode::Kernel)
        };
        let report = run(&config).unwrap();
        assert_eq!(report.events_dispatched, 3);
        assert_eq!(report.events_handled, 0);
    }
}
