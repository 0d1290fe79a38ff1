//! Color palette shared by the egui plotter and the bitmap renderer.

/// How a series or cell picks its color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorKey {
    /// First palette entry.
    Default,
    /// Qualitative palette entry for the n-th category.
    Category(usize),
    /// Position on the sequential scale, 0.0..=1.0.
    Scale(f64),
    /// Position on the diverging scale, -1.0..=1.0.
    Diverging(f64),
}

pub const DEFAULT_RGB: (u8, u8, u8) = (52, 152, 219); // Blue

pub const PALETTE: [(u8, u8, u8); 10] = [
    (231, 76, 60),  // Red
    (46, 204, 113), // Green
    (155, 89, 182), // Purple
    (243, 156, 18), // Orange
    (26, 188, 156), // Teal
    (233, 30, 99),  // Pink
    (0, 188, 212),  // Cyan
    (255, 87, 34),  // Deep Orange
    (121, 85, 72),  // Brown
    (96, 125, 139), // Blue Grey
];

// Viridis stops
const SEQUENTIAL: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

// Blue - white - red
const DIVERGING: [(u8, u8, u8); 3] = [(33, 102, 172), (247, 247, 247), (178, 24, 43)];

fn lerp(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

fn ramp(stops: &[(u8, u8, u8)], t: f64) -> (u8, u8, u8) {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let span = (stops.len() - 1) as f64;
    let pos = t * span;
    let idx = (pos.floor() as usize).min(stops.len() - 2);
    lerp(stops[idx], stops[idx + 1], pos - idx as f64)
}

/// Resolve a color key to RGB.
pub fn rgb(key: ColorKey) -> (u8, u8, u8) {
    match key {
        ColorKey::Default => DEFAULT_RGB,
        ColorKey::Category(i) => PALETTE[i % PALETTE.len()],
        ColorKey::Scale(t) => ramp(&SEQUENTIAL, t),
        ColorKey::Diverging(t) => ramp(&DIVERGING, (t + 1.0) / 2.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_endpoints() {
        assert_eq!(rgb(ColorKey::Scale(0.0)), SEQUENTIAL[0]);
        assert_eq!(rgb(ColorKey::Scale(1.0)), SEQUENTIAL[4]);
        assert_eq!(rgb(ColorKey::Scale(7.0)), SEQUENTIAL[4]);
        assert_eq!(rgb(ColorKey::Diverging(0.0)), DIVERGING[1]);
        assert_eq!(rgb(ColorKey::Diverging(-1.0)), DIVERGING[0]);
        assert_eq!(rgb(ColorKey::Scale(f64::NAN)), SEQUENTIAL[0]);
    }

    #[test]
    fn categories_cycle() {
        assert_eq!(rgb(ColorKey::Category(0)), rgb(ColorKey::Category(PALETTE.len())));
    }
}
