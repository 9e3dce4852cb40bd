//! The 2D raster contract the renderers draw against, and the pixel canvas
//! that implements it.
//!
//! All coordinates passed through [`Surface`] are logical units. The canvas
//! maps them onto its pixel grid with a fixed `units_per_px` scale, so the
//! simulation never needs to know how coarse the output device is.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Attaches an alpha in `[0,1]`; values outside are clamped.
    pub fn with_alpha(self, a: f32) -> Pixel {
        Pixel {
            r: self.r,
            g: self.g,
            b: self.b,
            a: unit_to_u8(a),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub const TRANSPARENT: Pixel = Pixel {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    fn lerp(self, other: Pixel, t: f32) -> Pixel {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 { (a as f32 + (b as f32 - a as f32) * t + 0.5) as u8 };
        Pixel {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// One colour stop of a gradient; `offset` is in `[0,1]` along the gradient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stop {
    pub offset: f32,
    pub color: Pixel,
}

impl Stop {
    pub const fn new(offset: f32, color: Pixel) -> Self {
        Self { offset, color }
    }
}

/// Samples a gradient at `t`. Stops must be sorted by offset.
pub fn sample_stops(stops: &[Stop], t: f32) -> Pixel {
    let Some(first) = stops.first() else {
        return Pixel::TRANSPARENT;
    };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            if span <= f32::EPSILON {
                return b.color;
            }
            return a.color.lerp(b.color, (t - a.offset) / span);
        }
    }
    stops[stops.len() - 1].color
}

/// The part of a gradient inside `cut` (in `(0,1]`), rescaled so that `cut`
/// becomes the rim. Filling a disc of radius `r` with the result looks like a
/// gradient of radius `r / cut` clipped to `r`.
pub fn clip_stops(stops: &[Stop], cut: f32) -> Vec<Stop> {
    let cut = cut.clamp(f32::EPSILON, 1.0);
    let mut out: Vec<Stop> = stops
        .iter()
        .filter(|s| s.offset < cut)
        .map(|s| Stop::new(s.offset / cut, s.color))
        .collect();
    out.push(Stop::new(1.0, sample_stops(stops, cut)));
    out
}

pub trait Surface {
    /// Wipes the whole surface to transparent.
    fn clear(&mut self);

    /// Fills a disc of `radius` with a radial gradient running from the
    /// centre (offset 0) to the rim (offset 1).
    fn fill_radial(&mut self, cx: f32, cy: f32, radius: f32, stops: &[Stop]);

    /// Strokes a one-pixel line whose colour runs linearly from `from` to `to`.
    fn stroke_line(&mut self, a: (f32, f32), b: (f32, f32), from: Pixel, to: Pixel);

    /// Strokes a circle outline of the given `width`.
    fn stroke_ring(&mut self, cx: f32, cy: f32, radius: f32, width: f32, color: Pixel);
}

pub struct PixelCanvas {
    pub(crate) w: u32,
    pub(crate) h: u32,
    units_per_px: f32,
    pub(crate) px: Vec<Pixel>,
}

impl PixelCanvas {
    pub fn new(w: u32, h: u32, units_per_px: f32) -> Self {
        Self {
            w,
            h,
            units_per_px,
            px: vec![Pixel::default(); (w as usize) * (h as usize)],
        }
    }

    /// Canvas sized for a terminal of `cols × rows` braille cells.
    pub fn for_cells(cols: u16, rows: u16, units_per_px: f32) -> Self {
        Self::new(cols as u32 * 2, rows as u32 * 4, units_per_px)
    }

    pub fn width_px(&self) -> u32 {
        self.w
    }

    pub fn height_px(&self) -> u32 {
        self.h
    }

    /// Canvas extent in logical units.
    pub fn logical_size(&self) -> (f32, f32) {
        (
            self.w as f32 * self.units_per_px,
            self.h as f32 * self.units_per_px,
        )
    }

    /// Logical coordinate of the centre of terminal cell `(col, row)`.
    pub fn cell_center(&self, col: u16, row: u16) -> (f32, f32) {
        (
            (col as f32 * 2.0 + 1.0) * self.units_per_px,
            (row as f32 * 4.0 + 2.0) * self.units_per_px,
        )
    }

    pub(crate) fn idx(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Pixel> {
        (x < self.w && y < self.h).then(|| self.px[self.idx(x, y)])
    }

    fn to_px(&self, v: f32) -> f32 {
        v / self.units_per_px
    }

    // Source-over compositing in straight (non-premultiplied) alpha.
    fn blend_over(&mut self, x: i32, y: i32, src: Pixel) {
        if x < 0 || y < 0 || src.a == 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.w || y >= self.h {
            return;
        }
        let i = self.idx(x, y);
        let dst = self.px[i];

        let sa = src.a as f32 / 255.0;
        let da = dst.a as f32 / 255.0;

        let out_a = sa + da * (1.0 - sa);
        if out_a <= 1e-6 {
            self.px[i] = Pixel::default();
            return;
        }

        let blend = |sc: u8, dc: u8| -> u8 {
            let sc = sc as f32 / 255.0;
            let dc = dc as f32 / 255.0;
            unit_to_u8((sc * sa + dc * da * (1.0 - sa)) / out_a)
        };

        self.px[i] = Pixel {
            r: blend(src.r, dst.r),
            g: blend(src.g, dst.g),
            b: blend(src.b, dst.b),
            a: unit_to_u8(out_a),
        };
    }
}

impl Surface for PixelCanvas {
    fn clear(&mut self) {
        self.px.fill(Pixel::TRANSPARENT);
    }

    fn fill_radial(&mut self, cx: f32, cy: f32, radius: f32, stops: &[Stop]) {
        if !(radius > 0.0) || stops.is_empty() {
            return;
        }
        let (pcx, pcy, pr) = (self.to_px(cx), self.to_px(cy), self.to_px(radius));

        // Sub-pixel discs still light the pixel they sit in.
        if pr < 0.5 {
            let c = sample_stops(stops, 0.0);
            self.blend_over(pcx.floor() as i32, pcy.floor() as i32, c);
            return;
        }

        let x0 = (pcx - pr).floor() as i32;
        let x1 = (pcx + pr).ceil() as i32;
        let y0 = (pcy - pr).floor() as i32;
        let y1 = (pcy + pr).ceil() as i32;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 + 0.5 - pcx;
                let dy = y as f32 + 0.5 - pcy;
                let d = (dx * dx + dy * dy).sqrt() / pr;
                if d > 1.0 {
                    continue;
                }
                self.blend_over(x, y, sample_stops(stops, d));
            }
        }
    }

    fn stroke_line(&mut self, a: (f32, f32), b: (f32, f32), from: Pixel, to: Pixel) {
        let (ax, ay) = (self.to_px(a.0), self.to_px(a.1));
        let (bx, by) = (self.to_px(b.0), self.to_px(b.1));
        let steps = (bx - ax).abs().max((by - ay).abs()).ceil().max(1.0) as u32;
        let mut last = None;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = (ax + (bx - ax) * t).floor() as i32;
            let y = (ay + (by - ay) * t).floor() as i32;
            // DDA can land on the same pixel twice; blending it twice would
            // double the alpha there.
            if last == Some((x, y)) {
                continue;
            }
            last = Some((x, y));
            self.blend_over(x, y, from.lerp(to, t));
        }
    }

    fn stroke_ring(&mut self, cx: f32, cy: f32, radius: f32, width: f32, color: Pixel) {
        if !(radius > 0.0) {
            return;
        }
        let (pcx, pcy, pr) = (self.to_px(cx), self.to_px(cy), self.to_px(radius));
        let half = (self.to_px(width) * 0.5).max(0.5);
        let outer = pr + half;

        let x0 = (pcx - outer).floor() as i32;
        let x1 = (pcx + outer).ceil() as i32;
        let y0 = (pcy - outer).floor() as i32;
        let y1 = (pcy + outer).ceil() as i32;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 + 0.5 - pcx;
                let dy = y as f32 + 0.5 - pcy;
                let d = (dx * dx + dy * dy).sqrt();
                if (d - pr).abs() <= half {
                    self.blend_over(x, y, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYAN: Rgb = Rgb::new(6, 182, 212);

    #[test]
    fn with_alpha_clamps() {
        assert_eq!(CYAN.with_alpha(2.0).a, 255);
        assert_eq!(CYAN.with_alpha(-1.0).a, 0);
        assert_eq!(CYAN.with_alpha(0.5).a, 128);
    }

    #[test]
    fn stops_interpolate_between_neighbours() {
        let stops = [
            Stop::new(0.0, Rgb::new(0, 0, 0).with_alpha(1.0)),
            Stop::new(1.0, Rgb::new(200, 100, 0).with_alpha(0.0)),
        ];
        let mid = sample_stops(&stops, 0.5);
        assert_eq!((mid.r, mid.g, mid.b), (100, 50, 0));
        assert_eq!(sample_stops(&stops, -1.0), stops[0].color);
        assert_eq!(sample_stops(&stops, 3.0), stops[1].color);
        assert_eq!(sample_stops(&[], 0.3), Pixel::TRANSPARENT);
    }

    #[test]
    fn clipped_gradient_ends_where_it_was_cut() {
        let stops = [
            Stop::new(0.0, CYAN.with_alpha(1.0)),
            Stop::new(0.5, CYAN.with_alpha(0.5)),
            Stop::new(1.0, CYAN.with_alpha(0.0)),
        ];
        let clipped = clip_stops(&stops, 0.5);
        assert_eq!(clipped.len(), 2);
        assert_eq!(clipped[0], stops[0]);
        assert_eq!(clipped[1], Stop::new(1.0, CYAN.with_alpha(0.5)));

        let whole = clip_stops(&stops, 1.0);
        assert_eq!(whole, stops.to_vec());
    }

    #[test]
    fn logical_coordinates_are_scaled() {
        let c = PixelCanvas::for_cells(10, 5, 4.0);
        assert_eq!((c.width_px(), c.height_px()), (20, 20));
        assert_eq!(c.logical_size(), (80.0, 80.0));
        assert_eq!(c.cell_center(0, 0), (4.0, 8.0));
        assert_eq!(c.cell_center(3, 1), (28.0, 24.0));
    }

    #[test]
    fn radial_fill_is_brightest_in_the_middle() {
        let mut c = PixelCanvas::new(20, 20, 1.0);
        let stops = [
            Stop::new(0.0, CYAN.with_alpha(1.0)),
            Stop::new(1.0, CYAN.with_alpha(0.0)),
        ];
        c.fill_radial(10.0, 10.0, 8.0, &stops);

        let centre = c.get(10, 10).unwrap().a;
        let edge = c.get(16, 10).unwrap().a;
        assert!(centre > edge);
        assert_eq!(c.get(0, 0).unwrap().a, 0);
    }

    #[test]
    fn tiny_disc_still_lights_one_pixel() {
        let mut c = PixelCanvas::new(4, 4, 4.0);
        c.fill_radial(9.0, 5.0, 0.5, &[Stop::new(0.0, CYAN.with_alpha(0.5))]);
        assert!(c.get(2, 1).unwrap().a > 0);
        assert_eq!(c.px.iter().filter(|p| p.a > 0).count(), 1);
    }

    #[test]
    fn line_touches_both_endpoints_once() {
        let mut c = PixelCanvas::new(10, 10, 1.0);
        let col = CYAN.with_alpha(0.5);
        c.stroke_line((0.5, 0.5), (9.5, 0.5), col, col);
        for x in 0..10 {
            assert_eq!(c.get(x, 0).unwrap().a, col.a, "pixel {x}");
        }
        assert_eq!(c.get(0, 1).unwrap().a, 0);
    }

    #[test]
    fn ring_leaves_the_centre_empty() {
        let mut c = PixelCanvas::new(30, 30, 1.0);
        c.stroke_ring(15.0, 15.0, 10.0, 2.0, CYAN.with_alpha(1.0));
        assert_eq!(c.get(15, 15).unwrap().a, 0);
        assert!(c.get(25, 15).unwrap().a > 0);
    }

    #[test]
    fn clear_resets_everything() {
        let mut c = PixelCanvas::new(4, 4, 1.0);
        c.fill_radial(2.0, 2.0, 2.0, &[Stop::new(0.0, CYAN.with_alpha(1.0))]);
        c.clear();
        assert!(c.px.iter().all(|p| *p == Pixel::TRANSPARENT));
    }

    #[test]
    fn blending_accumulates_alpha() {
        let mut c = PixelCanvas::new(1, 1, 1.0);
        let half = CYAN.with_alpha(0.5);
        c.blend_over(0, 0, half);
        let once = c.get(0, 0).unwrap().a;
        c.blend_over(0, 0, half);
        assert!(c.get(0, 0).unwrap().a > once);
        assert_eq!((c.get(0, 0).unwrap().r, c.get(0, 0).unwrap().g), (6, 182));
    }
}
