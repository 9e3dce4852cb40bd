use crate::config::{require_positive, require_within, ConfigError};
use crate::field::Particle;
use crate::surface::{clip_stops, Stop, Surface};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    pub connection_distance: f32,
    pub connection_opacity: f32,
    /// The disc gradient would reach transparency at this multiple of the
    /// particle size; the disc itself is clipped at the size.
    pub gradient_radius_scale: f32,
    pub glow_threshold: f32,
    pub glow_alpha: f32,
    pub glow_radius_scale: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            connection_distance: 120.0,
            connection_opacity: 0.15,
            gradient_radius_scale: 3.0,
            glow_threshold: 0.1,
            glow_alpha: 0.1,
            glow_radius_scale: 2.0,
        }
    }
}

impl RenderParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("render.connection_distance", self.connection_distance)?;
        require_within("render.connection_opacity", self.connection_opacity, 0.0, 1.0)?;
        require_within(
            "render.gradient_radius_scale",
            self.gradient_radius_scale,
            1.0,
            f32::MAX,
        )?;
        require_within("render.glow_threshold", self.glow_threshold, 0.0, 1.0)?;
        require_within("render.glow_alpha", self.glow_alpha, 0.0, 1.0)?;
        require_positive("render.glow_radius_scale", self.glow_radius_scale)?;
        Ok(())
    }
}

/// Alpha of the line joining two particles `distance` apart, or `None` when
/// they are too far apart to be joined. Falls off linearly from `max_opacity`
/// at distance 0 to nothing at `threshold`.
pub fn connection_opacity(distance: f32, threshold: f32, max_opacity: f32) -> Option<f32> {
    (distance < threshold).then(|| (threshold - distance) / threshold * max_opacity)
}

/// Draws a particle population: connection lines first, discs on top.
pub struct Renderer {
    params: RenderParams,
}

impl Renderer {
    pub fn new(params: RenderParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn render(&self, surface: &mut dyn Surface, particles: &[Particle]) {
        self.draw_connections(surface, particles);
        for p in particles {
            self.draw_particle(surface, p);
        }
    }

    // All pairs; fine for the few dozen particles the field ever holds.
    fn draw_connections(&self, surface: &mut dyn Surface, particles: &[Particle]) {
        let threshold = self.params.connection_distance;
        for (i, a) in particles.iter().enumerate() {
            for b in &particles[i + 1..] {
                let dx = a.x - b.x;
                let dy = a.y - b.y;
                let d = (dx * dx + dy * dy).sqrt();
                let Some(alpha) = connection_opacity(d, threshold, self.params.connection_opacity)
                else {
                    continue;
                };
                surface.stroke_line(
                    (a.x, a.y),
                    (b.x, b.y),
                    a.color.with_alpha(alpha),
                    b.color.with_alpha(alpha),
                );
            }
        }
    }

    fn draw_particle(&self, surface: &mut dyn Surface, p: &Particle) {
        let gradient = [
            Stop::new(0.0, p.color.with_alpha(p.opacity)),
            Stop::new(0.5, p.color.with_alpha(p.opacity * 0.5)),
            Stop::new(1.0, p.color.with_alpha(0.0)),
        ];
        let stops = clip_stops(&gradient, 1.0 / self.params.gradient_radius_scale);
        surface.fill_radial(p.x, p.y, p.size, &stops);

        if p.proximity > self.params.glow_threshold {
            let glow = p.color.with_alpha(p.proximity * self.params.glow_alpha);
            surface.fill_radial(
                p.x,
                p.y,
                p.size * self.params.glow_radius_scale,
                &[Stop::new(0.0, glow)],
            );
        }
    }
}
