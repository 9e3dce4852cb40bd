use crate::layer::Layer;
use crate::perf::PerfSignal;
use crate::pointer::PointerState;
use crate::surface::Surface;
use std::sync::Arc;
use tracing::{error, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Stopped,
}

/// Runs the per-frame update-then-draw pass over every layer and decides,
/// after each presented or failed frame, whether the loop keeps going.
pub struct FrameDriver {
    layers: Vec<Box<dyn Layer>>,
    pointer: Arc<PointerState>,
    state: DriverState,
    fault_streak: u32,
    max_faults: u32,
    frames: u64,
}

impl FrameDriver {
    pub fn new(layers: Vec<Box<dyn Layer>>, pointer: Arc<PointerState>, max_faults: u32) -> Self {
        Self {
            layers,
            pointer,
            state: DriverState::Running,
            fault_streak: 0,
            max_faults: max_faults.max(1),
            frames: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == DriverState::Running
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    pub fn stop(&mut self) {
        self.state = DriverState::Stopped;
    }

    /// One frame: read the pointer once, clear, update every layer, then draw
    /// every layer in order.
    pub fn frame(&mut self, now: f32, surface: &mut dyn Surface) {
        if !self.is_running() {
            return;
        }
        let pointer = self.pointer.get();
        surface.clear();
        for layer in &mut self.layers {
            layer.update(now, pointer);
        }
        for layer in &self.layers {
            layer.draw(surface);
        }
        self.frames += 1;
    }

    pub fn presented(&mut self) {
        self.fault_streak = 0;
    }

    /// Failure boundary for a frame that could not be shown. The loop keeps
    /// running until `max_faults` frames in a row have failed.
    pub fn fault(&mut self, err: &anyhow::Error) {
        self.fault_streak += 1;
        if self.fault_streak >= self.max_faults {
            error!(error = %err, streak = self.fault_streak, "too many failed frames, stopping");
            self.state = DriverState::Stopped;
        } else {
            warn!(error = %err, streak = self.fault_streak, "frame failed, continuing");
        }
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32, now: f32) {
        for layer in &mut self.layers {
            layer.pointer_moved(x, y, now);
        }
    }

    pub fn pointer_left(&mut self) {
        for layer in &mut self.layers {
            layer.pointer_left();
        }
    }

    pub fn clicked(&mut self, x: f32, y: f32, now: f32) {
        for layer in &mut self.layers {
            layer.clicked(x, y, now);
        }
    }

    pub fn resized(&mut self, width: f32, height: f32) {
        for layer in &mut self.layers {
            layer.resized(width, height);
        }
    }

    pub fn reduce(&mut self, signal: PerfSignal) {
        for layer in &mut self.layers {
            layer.reduce(signal);
        }
    }

    pub fn status(&self) -> String {
        self.layers
            .iter()
            .filter_map(|l| l.status())
            .collect::<Vec<_>>()
            .join("  ")
    }
}
