/// A presentation target the rendering module draws into each frame.
///
/// Real graphics backends live outside this workspace; they implement this
/// trait and must not block for longer than one frame interval.
pub trait Surface {
    fn clear(&mut self);
    fn draw_text(&mut self, text: &str);
    fn present(&mut self);
}

/// Surface that writes each presented frame to the log.
#[derive(Debug, Default)]
pub struct TraceSurface {
    pending: Vec<String>,
    presented: u64,
}

impl TraceSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Surface for TraceSurface {
    fn clear(&mut self) {
        self.pending.clear();
    }

    fn draw_text(&mut self, text: &str) {
        self.pending.push(text.to_string());
    }

    fn present(&mut self) {
        self.presented += 1;
        for block in self.pending.drain(..) {
            tracing::info!(target: "plexus::surface", frame = self.presented, "{}", block.trim_end());
        }
    }
}
