//! Frequency magnitudes as concentric circles.
//!
//! The spectrum is averaged down to a handful of values; each one becomes a
//! ring whose radius grows with its magnitude.

use crate::recording::analyser::AnalyserNode;
use crate::recording::surface::{Point, Rgba, Surface};

pub const FFT_SIZE: usize = 32;

const REDUCTION: usize = 3;
const LINE_WIDTH: f32 = 1.0;

/// Averages consecutive groups of `REDUCTION` bins, dropping the remainder.
fn reduce(data: &[u8]) -> Vec<f32> {
    data.chunks_exact(REDUCTION)
        .map(|group| group.iter().map(|&v| v as f32).sum::<f32>() / REDUCTION as f32)
        .collect()
}

pub fn draw<S: Surface + ?Sized>(
    surface: &mut S,
    analyser: &AnalyserNode,
    background: Rgba,
    stroke: Rgba,
) {
    let bounds = surface.bounds();
    let reduced = reduce(&analyser.byte_frequency_data());

    surface.clear_rect(bounds);

    let center = Point::new(bounds.width / 2.0, bounds.height / 2.0);
    let max_radius = bounds.width.min(bounds.height) / 2.0;
    surface.fill_circle(center, max_radius, background);

    if reduced.is_empty() {
        return;
    }

    let step = max_radius / reduced.len() as f32;
    for (i, value) in reduced.iter().enumerate() {
        let radius = step * i as f32 + step * (value / 255.0);
        if radius > 0.0 {
            surface.stroke_circle(center, radius, stroke, LINE_WIDTH);
        }
    }
}
