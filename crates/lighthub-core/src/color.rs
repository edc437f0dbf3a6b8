//! RGB colors

use std::fmt;

/// 8-bit RGB color as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build a color from hue (degrees, wrapped into 0..360), saturation
    /// and value (both clamped to 0..=1).
    pub fn hsv(hue: f64, saturation: f64, value: f64) -> Self {
        let h = hue.rem_euclid(360.0);
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);

        let chroma = v * s;
        let sector = h / 60.0;
        let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let m = v - chroma;

        let (r, g, b) = match sector as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };

        Self::rgb(to_channel(r + m), to_channel(g + m), to_channel(b + m))
    }

    /// Hue (degrees), saturation and value of this color
    pub fn to_hsv(&self) -> (f64, f64, f64) {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let saturation = if max == 0.0 { 0.0 } else { delta / max };

        (hue, saturation, max)
    }

    /// Linear interpolation toward `other`; `t` is clamped to 0..=1
    pub fn lerp(&self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| to_channel((a as f64 + (b as f64 - a as f64) * t) / 255.0);
        Color::rgb(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    /// First-order low-pass step toward `target`.
    ///
    /// `strength` 0 jumps straight to the target, 1 keeps the current color.
    ///
    /// Every channel that differs from the target moves at least one step,
    /// so repeated filtering always reaches the target unless `strength`
    /// is 1.
    pub fn filter(&self, target: Color, strength: f64) -> Color {
        let strength = strength.clamp(0.0, 1.0);
        if strength >= 1.0 {
            return *self;
        }
        let smoothed = self.lerp(target, 1.0 - strength);
        Color::rgb(
            nudge(self.r, smoothed.r, target.r),
            nudge(self.g, smoothed.g, target.g),
            nudge(self.b, smoothed.b, target.b),
        )
    }

    /// Scale brightness by `factor` (clamped to 0..=1)
    pub fn scale(&self, factor: f64) -> Color {
        Color::BLACK.lerp(*self, factor)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Color::rgb(r, g, b)
    }
}

/// Keep a filtered channel from stalling short of its target on rounding
fn nudge(current: u8, smoothed: u8, target: u8) -> u8 {
    if smoothed != current || current == target {
        smoothed
    } else if target > current {
        current + 1
    } else {
        current - 1
    }
}

fn to_channel(unit: f64) -> u8 {
    (unit.clamp(0.0, 1.0) * 255.0).round() as u8
}
