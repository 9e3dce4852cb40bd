use crate::bringup::{build_layers, isolated};
use crate::config::Settings;
use crate::driver::FrameDriver;
use crate::input::{collect_input_nonblocking, InputEvent};
use crate::perf::{FrameRateMonitor, MemoryMonitor, ProcessMemory};
use crate::pointer::PointerState;
use crate::surface::PixelCanvas;
use crate::term::Terminal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

struct App {
    settings: Settings,
    term: Terminal,
    canvas: PixelCanvas,
    pointer: Arc<PointerState>,
    driver: FrameDriver,
    monitor: Option<FrameRateMonitor>,
    memory: Option<(MemoryMonitor, ProcessMemory)>,
    started: Instant,
    show_hud: bool,
}

impl App {
    fn init(settings: Settings) -> anyhow::Result<Self> {
        let mut term = Terminal::begin()?;
        // Without a pointer the field still animates, it just never reacts.
        isolated("pointer capture", || term.capture_pointer());

        let monitor = isolated("frame-rate monitor", || {
            FrameRateMonitor::new(settings.perf.clone(), settings.effective_fps())
        });
        let memory = isolated("memory monitor", || -> anyhow::Result<_> {
            Ok((
                MemoryMonitor::new(settings.memory.clone())?,
                ProcessMemory::new()?,
            ))
        });

        let (cols, rows) = term.size();
        let canvas = PixelCanvas::for_cells(cols, rows, settings.units_per_px);
        let pointer = Arc::new(PointerState::new());
        let mut driver = FrameDriver::new(
            build_layers(&settings),
            Arc::clone(&pointer),
            settings.max_consecutive_faults,
        );
        let (w, h) = canvas.logical_size();
        driver.resized(w, h);
        info!(cols, rows, width = w, height = h, layers = ?driver.layer_names(), "started");

        Ok(Self {
            show_hud: settings.show_hud,
            settings,
            term,
            canvas,
            pointer,
            driver,
            monitor,
            memory,
            started: Instant::now(),
        })
    }

    fn now(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.effective_fps();
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);

        while self.driver.is_running() {
            let frame_start = Instant::now();

            for ev in collect_input_nonblocking(frame_dt)? {
                self.handle(ev);
            }
            if !self.driver.is_running() {
                break;
            }

            let now = self.now();
            self.driver.frame(now, &mut self.canvas);
            let hud = self.show_hud.then(|| self.hud_line());
            self.term
                .compose(&self.canvas, self.settings.enable_color, hud.as_deref());

            match self.term.present() {
                Ok(()) => {
                    self.driver.presented();
                    self.feedback(now);
                }
                Err(e) => self.driver.fault(&e),
            }

            spin_sleep(frame_dt, frame_start);
        }

        info!(frames = self.driver.frames(), "shutting down");
        self.term.end()?;
        Ok(())
    }

    // Both sources may shrink the field; neither grows it back.
    fn feedback(&mut self, now: f32) {
        if let Some(signal) = self.monitor.as_mut().and_then(|m| m.record_frame(now)) {
            self.driver.reduce(signal);
        }
        if let Some((monitor, process)) = self.memory.as_mut() {
            if !monitor.due(now) {
                return;
            }
            let Some(bytes) = process.resident_bytes() else {
                return;
            };
            if let Some(signal) = monitor.assess(bytes) {
                warn!(resident_mb = bytes / (1024 * 1024), "high memory use");
                self.driver.reduce(signal);
            }
        }
    }

    fn handle(&mut self, ev: InputEvent) {
        let now = self.now();
        match ev {
            InputEvent::Quit => self.driver.stop(),
            InputEvent::ToggleHud => self.show_hud = !self.show_hud,
            InputEvent::PointerMoved { col, row } => {
                let (x, y) = self.canvas.cell_center(col, row);
                self.pointer.set(x, y);
                self.driver.pointer_moved(x, y, now);
            }
            InputEvent::Clicked { col, row } => {
                let (x, y) = self.canvas.cell_center(col, row);
                self.pointer.set(x, y);
                self.driver.clicked(x, y, now);
            }
            InputEvent::PointerLeft => {
                self.pointer.clear();
                self.driver.pointer_left();
            }
            InputEvent::Resized { cols, rows } => {
                self.canvas = PixelCanvas::for_cells(cols, rows, self.settings.units_per_px);
                self.term.resize(cols, rows);
                let (w, h) = self.canvas.logical_size();
                self.driver.resized(w, h);
                info!(cols, rows, width = w, height = h, "resized");
            }
        }
    }

    fn hud_line(&self) -> String {
        let fps = match self.monitor.as_ref().and_then(|m| m.fps()) {
            Some(f) => format!("{f:.0}"),
            None => "-".to_string(),
        };
        let pointer = match self.pointer.get() {
            Some((x, y)) => format!("{x:.0},{y:.0}"),
            None => "-".to_string(),
        };
        format!(
            " {}  fps:{fps}  pointer:{pointer}  [h]ud [q]uit ",
            self.driver.status()
        )
    }
}

/// Runs the animation until the user quits or frames keep failing.
pub fn run(settings: Settings) -> anyhow::Result<()> {
    let mut app = App::init(settings)?;
    app.run()
}

fn spin_sleep(target: Duration, start: Instant) {
    let end = start + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
