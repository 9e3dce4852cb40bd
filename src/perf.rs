//! Performance feedback. Two sources can ask the particle field to shrink:
//! frame rate falling under a floor, and the process using most of its memory
//! budget. Both speak [`PerfSignal`]; neither ever asks for more particles.

use crate::config::{require_positive, require_within, ConfigError};
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Request to shrink the particle population: scale by `ratio`, but not
/// below `floor`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerfSignal {
    pub ratio: f32,
    pub floor: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfParams {
    pub enabled: bool,
    pub min_fps: f32,
    /// A window only counts as slow when it also misses this share of the
    /// frame-rate cap, so a low cap is not mistaken for lag.
    pub cap_tolerance: f32,
    pub window_secs: f32,
    pub reduce_ratio: f32,
    pub min_count: usize,
}

impl Default for PerfParams {
    fn default() -> Self {
        Self {
            enabled: true,
            min_fps: 30.0,
            cap_tolerance: 0.9,
            window_secs: 1.0,
            reduce_ratio: 0.8,
            min_count: 20,
        }
    }
}

impl PerfParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("perf.min_fps", self.min_fps)?;
        require_within("perf.cap_tolerance", self.cap_tolerance, 0.0, 1.0)?;
        require_positive("perf.cap_tolerance", self.cap_tolerance)?;
        require_positive("perf.window_secs", self.window_secs)?;
        require_within("perf.reduce_ratio", self.reduce_ratio, 0.0, 1.0)?;
        Ok(())
    }
}

/// Counts presented frames over fixed windows and asks for fewer particles
/// whenever a window comes in under the slow-frame threshold.
pub struct FrameRateMonitor {
    params: PerfParams,
    slow_below: f32,
    window_start: Option<f32>,
    frames: u32,
    last_fps: Option<f32>,
}

impl FrameRateMonitor {
    /// `fps_cap` is the rate the loop is paced to.
    pub fn new(params: PerfParams, fps_cap: u32) -> Result<Self, ConfigError> {
        params.validate()?;
        if fps_cap == 0 {
            return Err(ConfigError::invalid("fps_cap", "must be > 0"));
        }
        let slow_below = params.min_fps.min(fps_cap as f32 * params.cap_tolerance);
        Ok(Self {
            params,
            slow_below,
            window_start: None,
            frames: 0,
            last_fps: None,
        })
    }

    /// Frame rate under which a window counts as slow.
    pub fn slow_below(&self) -> f32 {
        self.slow_below
    }

    /// Records one presented frame at `now` seconds.
    pub fn record_frame(&mut self, now: f32) -> Option<PerfSignal> {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;

        let elapsed = now - start;
        if elapsed < self.params.window_secs {
            return None;
        }

        let fps = self.frames as f32 / elapsed;
        self.last_fps = Some(fps);
        self.frames = 0;
        self.window_start = Some(now);

        (self.params.enabled && fps < self.slow_below).then_some(PerfSignal {
            ratio: self.params.reduce_ratio,
            floor: self.params.min_count,
        })
    }

    /// Frame rate measured over the last complete window.
    pub fn fps(&self) -> Option<f32> {
        self.last_fps
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryParams {
    pub enabled: bool,
    pub check_secs: f32,
    /// Resident memory the process is expected to stay under.
    pub budget_mb: u64,
    /// Share of the budget that counts as pressure.
    pub high_water: f32,
    pub reduce_ratio: f32,
    pub min_count: usize,
}

impl Default for MemoryParams {
    fn default() -> Self {
        Self {
            enabled: true,
            check_secs: 10.0,
            budget_mb: 256,
            high_water: 0.9,
            reduce_ratio: 0.7,
            min_count: 15,
        }
    }
}

impl MemoryParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("memory.check_secs", self.check_secs)?;
        if self.budget_mb == 0 {
            return Err(ConfigError::invalid("memory.budget_mb", "must be > 0"));
        }
        require_within("memory.high_water", self.high_water, 0.0, 1.0)?;
        require_within("memory.reduce_ratio", self.reduce_ratio, 0.0, 1.0)?;
        Ok(())
    }
}

/// Checks resident memory against the budget every `check_secs`.
pub struct MemoryMonitor {
    params: MemoryParams,
    next_check: Option<f32>,
}

impl MemoryMonitor {
    pub fn new(params: MemoryParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            params,
            next_check: None,
        })
    }

    /// True once per check interval; the first check comes one interval
    /// after the first call.
    pub fn due(&mut self, now: f32) -> bool {
        let next = *self
            .next_check
            .get_or_insert(now + self.params.check_secs);
        if now < next {
            return false;
        }
        self.next_check = Some(now + self.params.check_secs);
        true
    }

    pub fn assess(&self, resident_bytes: u64) -> Option<PerfSignal> {
        let budget = self.params.budget_mb as f64 * 1024.0 * 1024.0;
        let usage = resident_bytes as f64 / budget;
        (self.params.enabled && usage > self.params.high_water as f64).then_some(PerfSignal {
            ratio: self.params.reduce_ratio,
            floor: self.params.min_count,
        })
    }
}

/// Resident set size of this process, read through `sysinfo`.
pub struct ProcessMemory {
    sys: System,
    pid: Pid,
}

impl ProcessMemory {
    pub fn new() -> anyhow::Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| anyhow::anyhow!("no pid: {e}"))?;
        Ok(Self {
            sys: System::new(),
            pid,
        })
    }

    pub fn resident_bytes(&mut self) -> Option<u64> {
        self.sys
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        self.sys.process(self.pid).map(|p| p.memory())
    }
}
