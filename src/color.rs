use palette::{Hsl, IntoColor, Srgb};

/// An 8-bit sRGB color.
pub type Rgb = [u8; 3];

/// Color of single-entry plots and thumbnails (matplotlib's `b`).
pub const DEFAULT_TRACE_COLOR: Rgb = [0x1f, 0x77, 0xb4];

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            let rgb: Srgb<u8> = rgb.into_format();
            [rgb.red, rgb.green, rgb.blue]
        })
        .collect()
}

/// `#rrggbb` notation as understood by plotly.
pub fn to_hex(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}
