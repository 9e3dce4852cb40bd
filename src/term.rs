use crate::surface::PixelCanvas;
use anyhow::Context;
use crossterm::{
    cursor,
    event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

/// Dots dimmer than this (max channel × alpha, 0..255) stay unlit.
const INK_THRESHOLD: f32 = 6.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

impl Cell {
    // Never produced by drawing, so a buffer of these forces a full repaint.
    const STALE: Cell = Cell {
        ch: '\0',
        fg: Color::Reset,
        bg: Color::Reset,
    };
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self::filled(w, h, Cell::default())
    }

    fn filled(w: u16, h: u16, c: Cell) -> Self {
        Self {
            w,
            h,
            cells: vec![c; (w as usize) * (h as usize)],
        }
    }

    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    #[cfg(test)]
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }

    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
}

/* -----------------------------
   Braille encoding: 2×4 pixels -> U+2800..U+28FF
------------------------------ */

fn braille_bit(dx: u32, dy: u32) -> u8 {
    // (0,0)=1 (0,1)=2 (0,2)=4 (0,3)=64
    // (1,0)=8 (1,1)=16 (1,2)=32 (1,3)=128
    match (dx, dy) {
        (0, 0) => 0x01,
        (0, 1) => 0x02,
        (0, 2) => 0x04,
        (0, 3) => 0x40,
        (1, 0) => 0x08,
        (1, 1) => 0x10,
        (1, 2) => 0x20,
        (1, 3) => 0x80,
        _ => 0x00,
    }
}

/// Rasterizes the canvas into braille cells. A dot is lit when the pixel
/// composited over black is bright enough; the cell colour is the mean of its
/// lit dots, weighted toward the more opaque ones.
pub(crate) fn canvas_to_cells(canvas: &PixelCanvas, out: &mut CellBuffer, enable_color: bool) {
    for cy in 0..out.h as u32 {
        for cx in 0..out.w as u32 {
            let mut mask: u8 = 0;
            let (mut sum_r, mut sum_g, mut sum_b) = (0.0f32, 0.0f32, 0.0f32);
            let mut ink: u32 = 0;

            for dy in 0..4 {
                for dx in 0..2 {
                    let Some(p) = canvas.get(cx * 2 + dx, cy * 4 + dy) else {
                        continue;
                    };
                    let a = p.a as f32 / 255.0;
                    let lum = p.r.max(p.g).max(p.b) as f32 * a;
                    if lum < INK_THRESHOLD {
                        continue;
                    }
                    mask |= braille_bit(dx, dy);
                    let shade = a.sqrt();
                    sum_r += p.r as f32 * shade;
                    sum_g += p.g as f32 * shade;
                    sum_b += p.b as f32 * shade;
                    ink += 1;
                }
            }

            let ch = char::from_u32(0x2800 + mask as u32).unwrap_or(' ');
            let fg = if enable_color && ink > 0 {
                let n = ink as f32;
                Color::Rgb {
                    r: (sum_r / n).round() as u8,
                    g: (sum_g / n).round() as u8,
                    b: (sum_b / n).round() as u8,
                }
            } else {
                Color::White
            };

            out.set(
                cx as u16,
                cy as u16,
                Cell {
                    ch,
                    fg,
                    bg: Color::Black,
                },
            );
        }
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let Ok(i) = u16::try_from(i) else {
            break;
        };
        let xx = x.saturating_add(i);
        if xx >= buf.w {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

/// Alternate-screen terminal with a diffed cell buffer. Restores the user's
/// terminal on `end` or, failing that, on drop.
pub struct Terminal {
    out: io::Stdout,
    cols: u16,
    rows: u16,
    prev: CellBuffer,
    cur: CellBuffer,
    pointer_captured: bool,
    active: bool,
}

impl Terminal {
    pub fn begin() -> anyhow::Result<Self> {
        let (cols, rows) = terminal::size().context("could not query terminal size")?;

        terminal::enable_raw_mode().context("could not enable raw mode")?;
        // From here on, dropping `term` puts the terminal back.
        let mut term = Self {
            out: io::stdout(),
            cols,
            rows,
            prev: CellBuffer::filled(cols, rows, Cell::STALE),
            cur: CellBuffer::new(cols, rows),
            pointer_captured: false,
            active: true,
        };
        execute!(
            term.out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            Clear(ClearType::All)
        )
        .context("could not enter the alternate screen")?;
        Ok(term)
    }

    /// Turns on mouse tracking and focus reporting.
    pub fn capture_pointer(&mut self) -> anyhow::Result<()> {
        execute!(self.out, EnableMouseCapture, EnableFocusChange)
            .context("terminal refused mouse capture")?;
        self.pointer_captured = true;
        Ok(())
    }

    pub fn end(&mut self) -> anyhow::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        if self.pointer_captured {
            queue!(self.out, DisableMouseCapture, DisableFocusChange)?;
        }
        queue!(
            self.out,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        self.prev = CellBuffer::filled(cols, rows, Cell::STALE);
        self.cur = CellBuffer::new(cols, rows);
    }

    /// Builds the next frame from the canvas, with an optional status line on top.
    pub fn compose(&mut self, canvas: &PixelCanvas, enable_color: bool, hud: Option<&str>) {
        canvas_to_cells(canvas, &mut self.cur, enable_color);
        if let Some(line) = hud {
            draw_text(&mut self.cur, 0, 0, line, Color::Grey, Color::Black);
        }
    }

    /// Writes the cells that changed since the last present.
    pub fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.end();
    }
}
