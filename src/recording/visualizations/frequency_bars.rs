//! Frequency spectrum as bottom-anchored bars.

use crate::recording::analyser::AnalyserNode;
use crate::recording::surface::{Rect, Rgba, Surface};

pub const FFT_SIZE: usize = 256;

const BAR_WIDTH_FACTOR: f32 = 2.5;
const BAR_GAP: f32 = 1.0;

pub fn draw<S: Surface + ?Sized>(
    surface: &mut S,
    analyser: &AnalyserNode,
    background: Rgba,
    stroke: Rgba,
) {
    let bounds = surface.bounds();
    let data = analyser.byte_frequency_data();

    surface.clear_rect(bounds);
    surface.fill_rect(bounds, background);

    if data.is_empty() {
        return;
    }

    let bar_width = bounds.width / data.len() as f32 * BAR_WIDTH_FACTOR;
    let mut x = 0.0;
    for &value in &data {
        // Bars past the right edge are never visible.
        if x >= bounds.width {
            break;
        }
        let bar_height = value as f32 / 2.0;
        surface.fill_rect(
            Rect::new(x, bounds.height - bar_height, bar_width, bar_height),
            stroke,
        );
        x += bar_width + BAR_GAP;
    }
}
