//! The rendering module: loads a named text resource when attached, draws it
//! to a [`Surface`] every frame and announces itself on the bus.

pub mod loader;
pub mod surface;

use plexus_core::{bus::MODULE_READY, Module, ModuleContext};

pub use loader::{FsResourceLoader, MemoryLoader, ResourceLoader};
pub use surface::{Surface, TraceSurface};

/// Drawn in place of a resource the loader could not find.
pub const MISSING_IMAGE: &str = "[No Image Found]";

pub const NAME: &str = "Rendering";

/// Draws a loaded "image" each frame.
///
/// A missing resource never fails attach; [`MISSING_IMAGE`] is drawn
/// instead.
pub struct RenderingModule {
    asset: String,
    loader: Box<dyn ResourceLoader>,
    surface: Box<dyn Surface>,
    image: Option<String>,
    frames: u64,
}

impl RenderingModule {
    pub fn new(
        asset: impl Into<String>,
        loader: Box<dyn ResourceLoader>,
        surface: Box<dyn Surface>,
    ) -> Self {
        Self {
            asset: asset.into(),
            loader,
            surface,
            image: None,
            frames: 0,
        }
    }

    /// Currently loaded image, `None` outside attach/detach.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }

    fn load_image(&mut self) -> String {
        match self.loader.read(&self.asset) {
            Some(content) => {
                tracing::info!(asset = %self.asset, bytes = content.len(), "image loaded");
                content
            }
            None => {
                tracing::warn!(asset = %self.asset, "image not found; using placeholder");
                MISSING_IMAGE.to_string()
            }
        }
    }
}

impl Module for RenderingModule {
    fn name(&self) -> &str {
        NAME
    }

    fn attach(&mut self, ctx: &mut ModuleContext<'_>) {
        self.image = Some(self.load_image());
        let reached = ctx.publish(MODULE_READY, NAME);
        tracing::info!(subscribers = reached, "rendering attached");
    }

    fn detach(&mut self, _ctx: &mut ModuleContext<'_>) {
        self.image = None;
        tracing::info!(frames = self.frames, "rendering detached");
    }

    fn update(&mut self, _ctx: &mut ModuleContext<'_>, dt: f32) {
        let image = self.image.as_deref().unwrap_or(MISSING_IMAGE);
        self.surface.clear();
        self.surface.draw_text(image);
        self.surface.present();
        self.frames += 1;
        tracing::debug!(dt, frame = self.frames, "drew image");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use plexus_core::{Event, MessageBus};

    type Journal = Rc<RefCell<Vec<String>>>;

    struct RecordingSurface(Journal);

    impl Surface for RecordingSurface {
        fn clear(&mut self) { self.0.borrow_mut().push("clear".into()); }
        fn draw_text(&mut self, text: &str) { self.0.borrow_mut().push(format!("draw:{}", text)); }
        fn present(&mut self) { self.0.borrow_mut().push("present".into()); }
    }

    fn module(loader: MemoryLoader, log: &Journal) -> RenderingModule {
        RenderingModule::new(
            "background.txt",
            Box::new(loader),
            Box::new(RecordingSurface(log.clone())),
        )
    }

    #[test]
    fn attach_loads_image_and_announces_ready() {
        let heard = Journal::default();
        let mut bus = MessageBus::new();
        let sink = heard.clone();
        bus.subscribe(MODULE_READY, Box::new(move |p| sink.borrow_mut().push(p.to_string())));

        let mut m = module(MemoryLoader::new().with("background.txt", "~~~"), &Journal::default());
        m.attach(&mut ModuleContext::with_bus(&mut bus));

        assert_eq!(m.image(), Some("~~~"));
        assert_eq!(heard.borrow().as_slice(), &["Rendering"]);
    }

    #[test]
    fn missing_resource_uses_placeholder() {
        let mut m = module(MemoryLoader::new(), &Journal::default());
        m.attach(&mut ModuleContext::detached());
        assert_eq!(m.image(), Some(MISSING_IMAGE));
    }

    #[test]
    fn update_clears_draws_presents() {
        let log = Journal::default();
        let mut m = module(MemoryLoader::new().with("background.txt", "img"), &log);
        let mut ctx = ModuleContext::detached();
        m.attach(&mut ctx);
        m.update(&mut ctx, 0.0);
        m.update(&mut ctx, 0.3);

        assert_eq!(m.frames_drawn(), 2);
        assert_eq!(
            log.borrow().as_slice(),
            &["clear", "draw:img", "present", "clear", "draw:img", "present"]
        );
    }

    #[test]
    fn ignores_events_and_releases_image_on_detach() {
        let mut m = module(MemoryLoader::new().with("background.txt", "img"), &Journal::default());
        let mut ctx = ModuleContext::detached();
        m.attach(&mut ctx);

        let mut ev = Event::new("Click");
        m.handle_event(&mut ctx, &mut ev);
        assert!(!ev.handled);

        m.detach(&mut ctx);
        assert!(m.image().is_none());
    }
}
