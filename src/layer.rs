use crate::field::{reduced_count, ParticleField};
use crate::perf::PerfSignal;
use crate::render::Renderer;
use crate::surface::Surface;
use tracing::{debug, info};

/// One drawable subsystem driven by the frame loop. Every frame each layer is
/// updated, then all layers are drawn in order; the event hooks default to
/// doing nothing.
pub trait Layer {
    fn name(&self) -> &'static str;

    fn update(&mut self, now: f32, pointer: Option<(f32, f32)>);

    fn draw(&self, surface: &mut dyn Surface);

    fn pointer_moved(&mut self, _x: f32, _y: f32, _now: f32) {}

    fn pointer_left(&mut self) {}

    fn clicked(&mut self, _x: f32, _y: f32, _now: f32) {}

    fn resized(&mut self, _width: f32, _height: f32) {}

    fn reduce(&mut self, _signal: PerfSignal) {}

    /// Short status for the HUD.
    fn status(&self) -> Option<String> {
        None
    }
}

/// The particle field and its renderer as a single layer.
pub struct Constellation {
    field: ParticleField,
    renderer: Renderer,
    wide: Option<bool>,
    fixed_count: Option<usize>,
}

impl Constellation {
    pub fn new(field: ParticleField, renderer: Renderer) -> Self {
        Self {
            field,
            renderer,
            wide: None,
            fixed_count: None,
        }
    }

    /// Pins the population to `count` on every resize, whatever the width.
    pub fn with_fixed_count(mut self, count: usize) -> Self {
        self.fixed_count = Some(count);
        self
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }
}

impl Layer for Constellation {
    fn name(&self) -> &'static str {
        "particle field"
    }

    fn update(&mut self, now: f32, pointer: Option<(f32, f32)>) {
        self.field.tick(now, pointer);
    }

    fn draw(&self, surface: &mut dyn Surface) {
        self.renderer.render(surface, self.field.particles());
    }

    // A resize always starts over at the tier count, dropping any reduction.
    fn resized(&mut self, width: f32, height: f32) {
        let params = self.field.params();
        let wide = params.is_wide(width);
        let count = self
            .fixed_count
            .unwrap_or_else(|| params.target_count(width));
        self.wide = Some(wide);
        self.field.configure(count, width, height);
        debug!(count, width, height, wide, "particle field configured");
    }

    fn reduce(&mut self, signal: PerfSignal) {
        let before = self.field.len();
        let after = reduced_count(before, signal);
        if after == before {
            return;
        }
        let (w, h) = self.field.bounds();
        self.field.configure(after, w, h);
        info!(before, after, "reduced particle count");
    }

    fn status(&self) -> Option<String> {
        let tier = match self.wide {
            Some(true) => "wide",
            Some(false) => "narrow",
            None => "-",
        };
        Some(format!("particles:{} ({tier})", self.field.len()))
    }
}
