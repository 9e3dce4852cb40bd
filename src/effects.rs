//! Cursor tracer, trail and click ripples.
//!
//! Both effects keep their transient marks in an [`ExpiringPool`]: a fixed
//! number of slots, each stamped with its birth time, dropped once older than
//! the pool lifetime. Nothing is allocated after construction.

use crate::config::{require_positive, require_within, ConfigError};
use crate::layer::Layer;
use crate::surface::{Rgb, Stop, Surface};
use rand::{rngs::StdRng, Rng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const CYAN: Rgb = Rgb::new(6, 182, 212);
const VIOLET: Rgb = Rgb::new(139, 92, 246);

#[derive(Clone, Debug, PartialEq)]
pub struct Handle<T> {
    pub born: f32,
    pub item: T,
}

pub struct ExpiringPool<T> {
    slots: VecDeque<Handle<T>>,
    capacity: usize,
    lifetime: f32,
}

impl<T> ExpiringPool<T> {
    pub fn new(capacity: usize, lifetime: f32) -> Self {
        Self {
            slots: VecDeque::with_capacity(capacity),
            capacity,
            lifetime,
        }
    }

    /// Adds a handle born at `now`, evicting the oldest when full.
    pub fn spawn(&mut self, now: f32, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.slots.len() == self.capacity {
            self.slots.pop_front();
        }
        self.slots.push_back(Handle { born: now, item });
    }

    /// Drops every handle that has lived its full lifetime.
    pub fn expire(&mut self, now: f32) {
        while let Some(h) = self.slots.front() {
            if now - h.born < self.lifetime {
                break;
            }
            self.slots.pop_front();
        }
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Handle<T>> {
        self.slots.iter()
    }

    /// How far through its life `h` is at `now`, in `[0,1]`.
    pub fn progress(&self, h: &Handle<T>, now: f32) -> f32 {
        ((now - h.born) / self.lifetime).clamp(0.0, 1.0)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailParams {
    pub capacity: usize,
    pub lifetime_secs: f32,
    pub size_min: f32,
    pub size_max: f32,
    pub min_size: f32,
    /// Only every `stride`-th point is drawn.
    pub stride: usize,
    pub tracer_radius: f32,
    pub tracer_alpha: f32,
}

impl Default for TrailParams {
    fn default() -> Self {
        Self {
            capacity: 25,
            lifetime_secs: 0.8,
            size_min: 8.0,
            size_max: 12.0,
            min_size: 2.0,
            stride: 2,
            tracer_radius: 8.0,
            tracer_alpha: 0.9,
        }
    }
}

impl TrailParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::invalid("trail.capacity", "must be > 0"));
        }
        if self.stride == 0 {
            return Err(ConfigError::invalid("trail.stride", "must be > 0"));
        }
        require_positive("trail.lifetime_secs", self.lifetime_secs)?;
        require_positive("trail.size_min", self.size_min)?;
        if !(self.size_max > self.size_min) {
            return Err(ConfigError::invalid(
                "trail.size_max",
                format!("must exceed size_min ({})", self.size_min),
            ));
        }
        require_positive("trail.min_size", self.min_size)?;
        require_positive("trail.tracer_radius", self.tracer_radius)?;
        require_within("trail.tracer_alpha", self.tracer_alpha, 0.0, 1.0)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailPoint {
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

/// A glowing dot under the pointer with a fading trail behind it.
pub struct CursorTrail {
    params: TrailParams,
    points: ExpiringPool<TrailPoint>,
    rng: StdRng,
    now: f32,
    tracer: Option<(f32, f32)>,
    visible: bool,
}

impl CursorTrail {
    pub fn new(params: TrailParams, rng: StdRng) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            points: ExpiringPool::new(params.capacity, params.lifetime_secs),
            params,
            rng,
            now: 0.0,
            tracer: None,
            visible: false,
        })
    }

    pub fn points(&self) -> &ExpiringPool<TrailPoint> {
        &self.points
    }
}

impl Layer for CursorTrail {
    fn name(&self) -> &'static str {
        "cursor trail"
    }

    fn update(&mut self, now: f32, pointer: Option<(f32, f32)>) {
        self.now = now;
        self.tracer = pointer;
        self.points.expire(now);
    }

    fn draw(&self, surface: &mut dyn Surface) {
        for (i, h) in self.points.iter().enumerate() {
            if i % self.params.stride != 0 {
                continue;
            }
            let a = 1.0 - self.points.progress(h, self.now);
            let size = (h.item.size * a).max(self.params.min_size);
            let stops = [
                Stop::new(0.0, CYAN.with_alpha(a * 0.6)),
                Stop::new(1.0, VIOLET.with_alpha(a * 0.3)),
            ];
            surface.fill_radial(h.item.x, h.item.y, size * 0.5, &stops);
        }

        if let (true, Some((x, y))) = (self.visible, self.tracer) {
            let stops = [
                Stop::new(0.0, CYAN.with_alpha(self.params.tracer_alpha)),
                Stop::new(1.0, CYAN.with_alpha(0.0)),
            ];
            surface.fill_radial(x, y, self.params.tracer_radius, &stops);
        }
    }

    fn pointer_moved(&mut self, x: f32, y: f32, now: f32) {
        self.visible = true;
        let size = self.rng.gen_range(self.params.size_min..self.params.size_max);
        self.points.spawn(now, TrailPoint { x, y, size });
    }

    fn pointer_left(&mut self) {
        self.visible = false;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RippleParams {
    pub capacity: usize,
    pub lifetime_secs: f32,
    pub radius: f32,
    /// Radius multiplier reached at the end of a ripple's life.
    pub growth: f32,
    pub ring_width: f32,
    pub ring_alpha: f32,
    pub fill_alpha: f32,
}

impl Default for RippleParams {
    fn default() -> Self {
        Self {
            capacity: 8,
            lifetime_secs: 0.6,
            radius: 25.0,
            growth: 2.0,
            ring_width: 2.0,
            ring_alpha: 0.6,
            fill_alpha: 0.1,
        }
    }
}

impl RippleParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::invalid("ripple.capacity", "must be > 0"));
        }
        require_positive("ripple.lifetime_secs", self.lifetime_secs)?;
        require_positive("ripple.radius", self.radius)?;
        require_positive("ripple.growth", self.growth)?;
        require_positive("ripple.ring_width", self.ring_width)?;
        require_within("ripple.ring_alpha", self.ring_alpha, 0.0, 1.0)?;
        require_within("ripple.fill_alpha", self.fill_alpha, 0.0, 1.0)?;
        Ok(())
    }
}

/// Expanding rings left by clicks.
pub struct RipplePool {
    params: RippleParams,
    ripples: ExpiringPool<(f32, f32)>,
    now: f32,
}

impl RipplePool {
    pub fn new(params: RippleParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            ripples: ExpiringPool::new(params.capacity, params.lifetime_secs),
            params,
            now: 0.0,
        })
    }
}

impl Layer for RipplePool {
    fn name(&self) -> &'static str {
        "click ripples"
    }

    fn update(&mut self, now: f32, _pointer: Option<(f32, f32)>) {
        self.now = now;
        self.ripples.expire(now);
    }

    fn draw(&self, surface: &mut dyn Surface) {
        let p = &self.params;
        for h in self.ripples.iter() {
            let t = self.ripples.progress(h, self.now);
            let (x, y) = h.item;
            let radius = p.radius * (1.0 + (p.growth - 1.0) * t);
            let fade = 1.0 - t;

            let fill = [
                Stop::new(0.0, CYAN.with_alpha(p.fill_alpha * fade)),
                Stop::new(0.7, CYAN.with_alpha(0.0)),
            ];
            surface.fill_radial(x, y, radius, &fill);
            surface.stroke_ring(x, y, radius, p.ring_width, CYAN.with_alpha(p.ring_alpha * fade));
        }
    }

    fn clicked(&mut self, x: f32, y: f32, now: f32) {
        self.ripples.spawn(now, (x, y));
    }
}
