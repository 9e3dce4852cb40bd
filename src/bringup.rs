//! Subsystem start-up. Every subsystem starts on its own: one that fails is
//! logged and left out, and the rest come up regardless.

use crate::config::Settings;
use crate::effects::{CursorTrail, RipplePool};
use crate::field::ParticleField;
use crate::layer::{Constellation, Layer};
use crate::render::Renderer;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, warn};

/// Runs `init` for the subsystem called `name`. Failures are logged and
/// turned into `None`.
pub fn isolated<T, E>(name: &str, init: impl FnOnce() -> Result<T, E>) -> Option<T>
where
    E: Into<anyhow::Error>,
{
    match init() {
        Ok(v) => {
            info!(subsystem = name, "initialized");
            Some(v)
        }
        Err(e) => {
            let e: anyhow::Error = e.into();
            warn!(subsystem = name, error = %format!("{e:#}"), "failed to initialize");
            None
        }
    }
}

/// Independent random stream per subsystem. A fixed seed gives reproducible
/// runs; otherwise each stream is seeded from the OS.
pub fn rng_for(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        None => StdRng::from_entropy(),
    }
}

/// The drawable layers, back to front. Layers that fail to start are absent.
pub fn build_layers(settings: &Settings) -> Vec<Box<dyn Layer>> {
    let mut layers: Vec<Box<dyn Layer>> = Vec::new();

    let constellation = isolated("particle field", || -> anyhow::Result<_> {
        let field = ParticleField::new(settings.field.clone(), rng_for(settings.seed, 1))?;
        let renderer = Renderer::new(settings.render.clone())?;
        let constellation = Constellation::new(field, renderer);
        Ok(if settings.reduced_motion {
            constellation.with_fixed_count(settings.field.reduced_motion_count)
        } else {
            constellation
        })
    });
    if let Some(c) = constellation {
        layers.push(Box::new(c));
    }

    if let Some(t) = isolated("cursor trail", || {
        CursorTrail::new(settings.trail.clone(), rng_for(settings.seed, 2))
    }) {
        layers.push(Box::new(t));
    }

    if let Some(r) = isolated("click ripples", || RipplePool::new(settings.ripple.clone())) {
        layers.push(Box::new(r));
    }

    layers
}
