//! Time-domain waveform visualization.
//!
//! Draws the raw waveform as one connected stroke across the full width,
//! centered vertically.

use crate::recording::analyser::AnalyserNode;
use crate::recording::surface::{Point, Rgba, Surface};

pub const FFT_SIZE: usize = 2048;

const LINE_WIDTH: f32 = 2.0;

pub fn draw<S: Surface + ?Sized>(
    surface: &mut S,
    analyser: &AnalyserNode,
    background: Rgba,
    stroke: Rgba,
) {
    let bounds = surface.bounds();
    let data = analyser.byte_time_domain_data();

    surface.clear_rect(bounds);
    surface.fill_rect(bounds, background);

    if data.is_empty() {
        return;
    }

    let slice_width = bounds.width / data.len() as f32;
    let mut points: Vec<Point> = data
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let v = value as f32 / 128.0;
            Point::new(i as f32 * slice_width, v * bounds.height / 2.0)
        })
        .collect();
    points.push(Point::new(bounds.width, bounds.height / 2.0));

    surface.stroke_path(&points, stroke, LINE_WIDTH);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::capability::{FrameSink, StreamFormat};
    use crate::recording::surface::{DisplayList, DrawCommand};

    #[test]
    fn test_silence_draws_centered_line() {
        let analyser = AnalyserNode::new();
        analyser.set_fft_size(FFT_SIZE).unwrap();
        let mut surface = DisplayList::new(640, 100);

        draw(&mut surface, &analyser, Rgba::WHITE, Rgba::BLACK);

        let commands = surface.commands();
        assert_eq!(commands.len(), 2);
        assert!(matches!(
            commands[0],
            DrawCommand::FillRect { color, .. } if color == Rgba::WHITE
        ));
        let DrawCommand::StrokePath {
            points,
            color,
            line_width,
        } = &commands[1]
        else {
            panic!("expected a stroke, got {:?}", commands[1]);
        };
        assert_eq!(*color, Rgba::BLACK);
        assert_eq!(*line_width, 2.0);
        assert_eq!(points.len(), FFT_SIZE + 1);
        assert!(points.iter().all(|p| (p.y - 50.0).abs() < f32::EPSILON));
        assert_eq!(points.last().unwrap().x, 640.0);
    }

    #[test]
    fn test_loud_sample_moves_the_stroke() {
        let analyser = AnalyserNode::new();
        analyser.set_fft_size(FFT_SIZE).unwrap();
        let mut input = vec![0.0; FFT_SIZE];
        input[FFT_SIZE - 1] = 1.0;
        analyser.consume(
            &input,
            StreamFormat {
                sample_rate: 48_000,
                channels: 1,
            },
        );
        let mut surface = DisplayList::new(640, 100);

        draw(&mut surface, &analyser, Rgba::WHITE, Rgba::BLACK);

        let DrawCommand::StrokePath { points, .. } = &surface.commands()[1] else {
            panic!("expected a stroke");
        };
        let peak = points[FFT_SIZE - 1];
        assert!(peak.y > 99.0);
        assert!((peak.x - (FFT_SIZE - 1) as f32 * 640.0 / FFT_SIZE as f32).abs() < 1e-3);
    }
}
