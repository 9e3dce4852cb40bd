//! The particle field: a fixed-size population of drifting points that pulse,
//! wrap around the edges, and lean toward the pointer.

use crate::config::{require_positive, require_within, ConfigError};
use crate::perf::PerfSignal;
use crate::surface::Rgb;
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

pub const PALETTE: [Rgb; 3] = [
    Rgb::new(6, 182, 212),   // cyan
    Rgb::new(139, 92, 246),  // violet
    Rgb::new(16, 185, 129),  // emerald
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldParams {
    /// Each initial velocity component is drawn from `[-initial_speed, initial_speed)`.
    pub initial_speed: f32,
    pub size_min: f32,
    pub size_max: f32,
    pub pulse_amplitude: f32,
    pub opacity_base: f32,
    pub opacity_amplitude: f32,
    pub interaction_radius: f32,
    pub attraction: f32,
    pub proximity_decay: f32,
    pub damping: f32,
    pub max_speed: f32,
    pub wide_threshold: f32,
    pub wide_count: usize,
    pub narrow_count: usize,
    /// Population when the user asked for reduced motion.
    pub reduced_motion_count: usize,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            initial_speed: 0.4,
            size_min: 1.0,
            size_max: 4.0,
            pulse_amplitude: 0.5,
            opacity_base: 0.3,
            opacity_amplitude: 0.2,
            interaction_radius: 150.0,
            attraction: 0.01,
            proximity_decay: 0.95,
            damping: 0.99,
            max_speed: 2.0,
            wide_threshold: 768.0,
            wide_count: 60,
            narrow_count: 30,
            reduced_motion_count: 5,
        }
    }
}

impl FieldParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_within("field.initial_speed", self.initial_speed, 0.0, f32::MAX)?;
        require_positive("field.size_min", self.size_min)?;
        if !(self.size_max > self.size_min) {
            return Err(ConfigError::invalid(
                "field.size_max",
                format!("must exceed size_min ({})", self.size_min),
            ));
        }
        // keeps the pulsing radius strictly positive
        require_within(
            "field.pulse_amplitude",
            self.pulse_amplitude,
            0.0,
            self.size_min * 0.99,
        )?;
        require_within("field.opacity_base", self.opacity_base, 0.0, 1.0)?;
        require_within("field.opacity_amplitude", self.opacity_amplitude, 0.0, 1.0)?;
        require_positive("field.interaction_radius", self.interaction_radius)?;
        require_within("field.attraction", self.attraction, 0.0, f32::MAX)?;
        require_within("field.proximity_decay", self.proximity_decay, 0.0, 1.0)?;
        require_within("field.damping", self.damping, 0.0, 1.0)?;
        require_positive("field.max_speed", self.max_speed)?;
        require_positive("field.wide_threshold", self.wide_threshold)?;
        Ok(())
    }

    /// Two-tier particle count for a viewport `width` units wide.
    pub fn target_count(&self, width: f32) -> usize {
        if self.is_wide(width) {
            self.wide_count
        } else {
            self.narrow_count
        }
    }

    pub fn is_wide(&self, width: f32) -> bool {
        width >= self.wide_threshold
    }
}

/// Count after a performance reduction: scaled by the signal ratio and
/// rounded up, never below its floor, and never more than `current`.
pub fn reduced_count(current: usize, signal: PerfSignal) -> usize {
    // 60 × 0.8f32 lands a hair above 48; don't let that round up to 49.
    let scaled = (current as f64 * signal.ratio as f64 - 1e-3).ceil().max(0.0) as usize;
    scaled.max(signal.floor).min(current)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
    pub base_size: f32,
    pub opacity: f32,
    pub color: Rgb,
    pub phase: f32,
    pub proximity: f32,
}

pub struct ParticleField {
    params: FieldParams,
    rng: StdRng,
    width: f32,
    height: f32,
    particles: Vec<Particle>,
}

impl ParticleField {
    pub fn new(params: FieldParams, rng: StdRng) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            params,
            rng,
            width: 1.0,
            height: 1.0,
            particles: Vec::new(),
        })
    }

    /// Throws away the current population and spawns `count` fresh particles
    /// inside `[0,width) × [0,height)`.
    pub fn configure(&mut self, count: usize, width: f32, height: f32) {
        self.width = sane_extent(width);
        self.height = sane_extent(height);

        let p = &self.params;
        let mut particles = Vec::with_capacity(count);
        for _ in 0..count {
            let base_size = self.rng.gen_range(p.size_min..p.size_max);
            let speed = p.initial_speed;
            let (vx, vy) = if speed > 0.0 {
                (
                    self.rng.gen_range(-speed..speed),
                    self.rng.gen_range(-speed..speed),
                )
            } else {
                (0.0, 0.0)
            };
            particles.push(Particle {
                x: self.rng.gen_range(0.0..self.width),
                y: self.rng.gen_range(0.0..self.height),
                vx,
                vy,
                size: base_size,
                base_size,
                opacity: p.opacity_base,
                color: PALETTE[self.rng.gen_range(0..PALETTE.len())],
                phase: self.rng.gen_range(0.0..TAU),
                proximity: 0.0,
            });
        }
        self.particles = particles;
    }

    /// Advances every particle one frame. `t` is seconds on a monotonic clock;
    /// `pointer` is the latest pointer position, if any.
    pub fn tick(&mut self, t: f32, pointer: Option<(f32, f32)>) {
        let p = &self.params;
        let (w, h) = (self.width, self.height);

        for particle in &mut self.particles {
            particle.x = wrap(particle.x + particle.vx, w);
            particle.y = wrap(particle.y + particle.vy, h);

            particle.size = particle.base_size + (t + particle.phase).sin() * p.pulse_amplitude;
            particle.opacity = (p.opacity_base
                + (t * 2.0 + particle.phase).sin() * p.opacity_amplitude)
                .clamp(0.0, 1.0);

            match pointer.and_then(|at| pull_toward(particle, at, p.interaction_radius)) {
                Some((force, ux, uy)) => {
                    particle.vx += ux * force * p.attraction;
                    particle.vy += uy * force * p.attraction;
                    particle.size = particle.base_size * (1.0 + force);
                    particle.proximity = force;
                }
                None => particle.proximity *= p.proximity_decay,
            }

            particle.vx = (particle.vx * p.damping).clamp(-p.max_speed, p.max_speed);
            particle.vy = (particle.vy * p.damping).clamp(-p.max_speed, p.max_speed);
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn params(&self) -> &FieldParams {
        &self.params
    }
}

/// Normalised pull toward the pointer: `(force, unit_x, unit_y)`. `None` when
/// the pointer is out of reach or sits exactly on the particle.
fn pull_toward(particle: &Particle, at: (f32, f32), radius: f32) -> Option<(f32, f32, f32)> {
    let dx = at.0 - particle.x;
    let dy = at.1 - particle.y;
    let d = (dx * dx + dy * dy).sqrt();
    if d > 0.0 && d < radius {
        Some(((radius - d) / radius, dx / d, dy / d))
    } else {
        None
    }
}

fn sane_extent(v: f32) -> f32 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        1.0
    }
}

/// Toroidal wrap into the half-open range `[0, max)`.
pub(crate) fn wrap(v: f32, max: f32) -> f32 {
    let r = if v < 0.0 {
        v + max
    } else if v >= max {
        v - max
    } else {
        return v;
    };
    if (0.0..max).contains(&r) {
        return r;
    }
    // large jumps, or `v + max` rounding up onto the edge itself
    let r = r.rem_euclid(max);
    if r >= max {
        0.0
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn field(seed: u64) -> ParticleField {
        ParticleField::new(FieldParams::default(), StdRng::seed_from_u64(seed)).unwrap()
    }

    fn lone(x: f32, y: f32, vx: f32, vy: f32) -> ParticleField {
        let mut f = field(1);
        f.configure(1, 100.0, 100.0);
        let p = &mut f.particles_mut()[0];
        p.x = x;
        p.y = y;
        p.vx = vx;
        p.vy = vy;
        f
    }

    #[test]
    fn configure_populates_inside_bounds() {
        let mut f = field(42);
        f.configure(60, 320.0, 200.0);
        assert_eq!(f.len(), 60);
        for p in f.particles() {
            assert!((0.0..320.0).contains(&p.x) && (0.0..200.0).contains(&p.y));
            assert!((-0.4..0.4).contains(&p.vx) && (-0.4..0.4).contains(&p.vy));
            assert!((1.0..4.0).contains(&p.base_size));
            assert!((0.0..TAU).contains(&p.phase));
            assert!(PALETTE.contains(&p.color));
            assert_eq!(p.proximity, 0.0);
        }
    }

    #[test]
    fn configure_replaces_the_population() {
        let mut f = field(3);
        f.configure(10, 50.0, 50.0);
        f.configure(0, 50.0, 50.0);
        assert!(f.is_empty());
        f.configure(5, 0.0, f32::NAN);
        assert_eq!(f.bounds(), (1.0, 1.0));
        assert_eq!(f.len(), 5);
    }

    #[test]
    fn wrap_is_half_open() {
        assert_eq!(wrap(-1.0, 100.0), 99.0);
        assert_eq!(wrap(100.0, 100.0), 0.0);
        assert_eq!(wrap(101.5, 100.0), 1.5);
        assert_eq!(wrap(50.0, 100.0), 50.0);
        assert_eq!(wrap(-1e-9, 100.0), 0.0);
        assert_eq!(wrap(-350.0, 100.0), 50.0);
    }

    #[test]
    fn particle_crossing_an_edge_reappears_opposite() {
        let mut f = lone(99.5, 0.5, 1.0, -1.0);
        f.tick(0.0, None);
        let p = &f.particles()[0];
        assert!((p.x - 0.5).abs() < 1e-4, "x = {}", p.x);
        assert!((p.y - 99.5).abs() < 1e-4, "y = {}", p.y);
    }

    #[test]
    fn pulse_follows_the_phase() {
        let mut f = lone(50.0, 50.0, 0.0, 0.0);
        let (base, phase) = {
            let p = &f.particles()[0];
            (p.base_size, p.phase)
        };
        f.tick(1.25, None);
        let p = &f.particles()[0];
        assert!((p.size - (base + (1.25 + phase).sin() * 0.5)).abs() < 1e-5);
        assert!((p.opacity - (0.3 + (2.5 + phase).sin() * 0.2)).abs() < 1e-5);
    }

    #[test]
    fn pointer_in_reach_pulls_and_inflates() {
        let mut f = lone(50.0, 50.0, 0.0, 0.0);
        let base = f.particles()[0].base_size;
        f.tick(0.0, Some((125.0, 50.0)));

        let p = &f.particles()[0];
        let force = (150.0 - 75.0) / 150.0;
        assert!((p.proximity - force).abs() < 1e-6);
        assert!((p.vx - force * 0.01 * 0.99).abs() < 1e-6);
        assert_eq!(p.vy, 0.0);
        assert!((p.size - base * (1.0 + force)).abs() < 1e-5);
    }

    #[test]
    fn pointer_exactly_on_the_particle_exerts_nothing() {
        let mut f = lone(50.0, 50.0, 0.0, 0.0);
        f.particles_mut()[0].proximity = 0.5;
        f.tick(0.0, Some((50.0, 50.0)));

        let p = &f.particles()[0];
        assert_eq!((p.vx, p.vy), (0.0, 0.0));
        assert!(p.size.is_finite() && p.x.is_finite());
        assert!((p.proximity - 0.475).abs() < 1e-6);
    }

    #[test]
    fn velocity_is_damped_then_clamped() {
        let mut f = lone(50.0, 50.0, 1.0, -1.0);
        f.tick(0.0, None);
        let p = &f.particles()[0];
        assert!((p.vx - 0.99).abs() < 1e-6);
        assert!((p.vy + 0.99).abs() < 1e-6);

        let mut f = lone(50.0, 50.0, 9.0, -9.0);
        f.tick(0.0, None);
        let p = &f.particles()[0];
        assert_eq!((p.vx, p.vy), (2.0, -2.0));
    }

    #[test]
    fn target_count_is_two_tier() {
        let p = FieldParams::default();
        assert_eq!(p.target_count(767.9), 30);
        assert_eq!(p.target_count(768.0), 60);
        assert_eq!(p.target_count(1920.0), 60);
    }

    #[test]
    fn reduction_respects_floor_and_never_grows() {
        let sig = PerfSignal {
            ratio: 0.8,
            floor: 20,
        };
        assert_eq!(reduced_count(60, sig), 48);
        // 38.4 particles means 39 of them on screen
        assert_eq!(reduced_count(48, sig), 39);
        assert_eq!(reduced_count(24, sig), 20);
        assert_eq!(reduced_count(20, sig), 20);
        assert_eq!(reduced_count(5, sig), 5);
    }

    #[test]
    fn memory_pressure_cuts_deeper_with_a_lower_floor() {
        let sig = PerfSignal {
            ratio: 0.7,
            floor: 15,
        };
        assert_eq!(reduced_count(60, sig), 42);
        assert_eq!(reduced_count(30, sig), 21);
        assert_eq!(reduced_count(20, sig), 15);
        assert_eq!(reduced_count(15, sig), 15);
    }

    #[test]
    fn params_validation_catches_nonsense() {
        assert!(FieldParams::default().validate().is_ok());

        let p = FieldParams {
            pulse_amplitude: 1.5,
            ..FieldParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ConfigError::Invalid { name: "field.pulse_amplitude", .. })
        ));

        let p = FieldParams {
            size_max: 0.5,
            ..FieldParams::default()
        };
        assert!(p.validate().is_err());

        let p = FieldParams {
            damping: 1.2,
            ..FieldParams::default()
        };
        assert!(ParticleField::new(p, StdRng::seed_from_u64(0)).is_err());
    }
}
