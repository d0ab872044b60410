//! Live analysis node and the context that owns it.
//!
//! The analyser keeps a window of recent mono samples and exposes byte-scaled
//! time-domain and frequency-domain snapshots for the visualizations.

use parking_lot::Mutex;
use rustfft::{num_complex::Complex, FftPlanner};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::capability::{FrameSink, StreamFormat};
use super::error::AnalyserError;

pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32_768;
pub const DEFAULT_FFT_SIZE: usize = 2_048;
pub const DEFAULT_SMOOTHING: f32 = 0.8;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

struct AnalyserState {
    fft_size: usize,
    /// Most recent mono samples, oldest first.
    history: VecDeque<f32>,
    /// Smoothed magnitudes from the previous frequency snapshot.
    smoothed: Vec<f32>,
    smoothing: f32,
    planner: FftPlanner<f32>,
}

impl AnalyserState {
    /// Last `fft_size` samples, zero-padded at the front.
    fn window(&self) -> Vec<f32> {
        let available = self.history.len().min(self.fft_size);
        let mut window = vec![0.0; self.fft_size - available];
        window.extend(self.history.iter().skip(self.history.len() - available));
        window
    }
}

/// Exposes live time-domain and frequency-domain data for a stream.
pub struct AnalyserNode {
    state: Mutex<AnalyserState>,
    running: Arc<AtomicBool>,
}

impl AnalyserNode {
    /// Creates a node that only accepts input while `running` is set.
    fn with_gate(running: Arc<AtomicBool>) -> Self {
        Self {
            state: Mutex::new(AnalyserState {
                fft_size: DEFAULT_FFT_SIZE,
                history: VecDeque::with_capacity(MAX_FFT_SIZE),
                smoothed: vec![0.0; DEFAULT_FFT_SIZE / 2],
                smoothing: DEFAULT_SMOOTHING,
                planner: FftPlanner::new(),
            }),
            running,
        }
    }

    /// Creates a free-standing node that always accepts input.
    pub fn new() -> Self {
        Self::with_gate(Arc::new(AtomicBool::new(true)))
    }

    pub fn fft_size(&self) -> usize {
        self.state.lock().fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size() / 2
    }

    /// Sets the analysis window. Resets smoothing history when it changes.
    pub fn set_fft_size(&self, size: usize) -> Result<(), AnalyserError> {
        if !size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&size) {
            return Err(AnalyserError::InvalidFftSize(size));
        }

        let mut state = self.state.lock();
        if state.fft_size != size {
            state.fft_size = size;
            state.smoothed = vec![0.0; size / 2];
        }
        Ok(())
    }

    /// Drops buffered input and smoothing history.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.history.clear();
        state.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }

    pub fn set_smoothing_time_constant(&self, value: f32) {
        self.state.lock().smoothing = value.clamp(0.0, 1.0);
    }

    /// Current waveform as `fft_size` bytes, 128 meaning silence.
    pub fn byte_time_domain_data(&self) -> Vec<u8> {
        let state = self.state.lock();
        state
            .window()
            .into_iter()
            .map(|sample| (128.0 * (1.0 + sample)).clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Current spectrum as `fft_size / 2` bytes.
    ///
    /// Blackman-windowed FFT magnitudes are smoothed over time, converted to
    /// decibels and mapped from [`MIN_DECIBELS`, `MAX_DECIBELS`] onto 0..=255.
    pub fn byte_frequency_data(&self) -> Vec<u8> {
        let mut state = self.state.lock();
        let size = state.fft_size;
        let window = state.window();

        let mut buffer: Vec<Complex<f32>> = window
            .iter()
            .enumerate()
            .map(|(i, &sample)| Complex::new(sample * blackman(i, size), 0.0))
            .collect();

        let fft = state.planner.plan_fft_forward(size);
        fft.process(&mut buffer);

        let tau = state.smoothing;
        let range = MAX_DECIBELS - MIN_DECIBELS;
        let mut bytes = Vec::with_capacity(size / 2);
        for (bin, value) in buffer.iter().take(size / 2).enumerate() {
            let magnitude = value.norm() / size as f32;
            let smoothed = tau * state.smoothed[bin] + (1.0 - tau) * magnitude;
            state.smoothed[bin] = smoothed;

            let db = 20.0 * smoothed.log10();
            let scaled = (255.0 / range * (db - MIN_DECIBELS)).floor();
            bytes.push(scaled.clamp(0.0, 255.0) as u8);
        }
        bytes
    }
}

impl Default for AnalyserNode {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for AnalyserNode {
    fn consume(&self, samples: &[f32], format: StreamFormat) {
        if !self.running.load(Ordering::Relaxed) {
            return;
        }

        let channels = format.channels.max(1) as usize;
        let mut state = self.state.lock();
        for frame in samples.chunks_exact(channels) {
            let mono = frame.iter().sum::<f32>() / channels as f32;
            if state.history.len() == MAX_FFT_SIZE {
                state.history.pop_front();
            }
            state.history.push_back(mono);
        }
    }
}

fn blackman(i: usize, size: usize) -> f32 {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
    A0 - A1 * phase.cos() + A2 * (2.0 * phase).cos()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
}

/// Owner of the analysis node shared by consecutive sessions.
///
/// The node is created lazily and replaced, not dropped, when a session
/// ends, so the next session starts from a clean analyser.
pub struct AudioContext {
    running: Arc<AtomicBool>,
    analyser: Option<Arc<AnalyserNode>>,
}

impl AudioContext {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            analyser: None,
        }
    }

    pub fn state(&self) -> ContextState {
        if self.running.load(Ordering::Relaxed) {
            ContextState::Running
        } else {
            ContextState::Suspended
        }
    }

    pub fn resume(&self) {
        self.running.store(true, Ordering::Relaxed);
    }

    pub fn suspend(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Returns the analyser, creating it on first use.
    pub fn analyser(&mut self) -> Arc<AnalyserNode> {
        let running = Arc::clone(&self.running);
        Arc::clone(
            self.analyser
                .get_or_insert_with(|| Arc::new(AnalyserNode::with_gate(running))),
        )
    }

    /// Analyser if one has been created.
    pub fn current_analyser(&self) -> Option<Arc<AnalyserNode>> {
        self.analyser.clone()
    }

    /// Swaps in a fresh analyser. The old node is emptied so anything still
    /// holding it sees silence.
    pub fn reset_analyser(&mut self) {
        if let Some(old) = self.analyser.take() {
            old.clear();
        }
        self.analyser = Some(Arc::new(AnalyserNode::with_gate(Arc::clone(&self.running))));
    }
}

impl Default for AudioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONO: StreamFormat = StreamFormat {
        sample_rate: 48_000,
        channels: 1,
    };

    fn sine(bin: usize, size: usize, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / size as f32).sin() * 0.1
            })
            .collect()
    }

    #[test]
    fn test_silence_is_centered_and_empty() {
        let node = AnalyserNode::new();
        let time = node.byte_time_domain_data();
        assert_eq!(time.len(), DEFAULT_FFT_SIZE);
        assert!(time.iter().all(|&b| b == 128));

        let freq = node.byte_frequency_data();
        assert_eq!(freq.len(), DEFAULT_FFT_SIZE / 2);
        assert!(freq.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_time_domain_scaling_and_padding() {
        let node = AnalyserNode::new();
        node.set_fft_size(32).unwrap();
        node.consume(&[1.0, -1.0, 0.5], MONO);

        let time = node.byte_time_domain_data();
        assert_eq!(time.len(), 32);
        assert!(time[..29].iter().all(|&b| b == 128));
        assert_eq!(&time[29..], &[255, 0, 192]);
    }

    #[test]
    fn test_stereo_is_averaged_to_mono() {
        let node = AnalyserNode::new();
        node.set_fft_size(32).unwrap();
        let stereo = StreamFormat {
            sample_rate: 48_000,
            channels: 2,
        };
        node.consume(&[1.0, 0.0, -0.5, -0.5], stereo);

        let time = node.byte_time_domain_data();
        assert_eq!(&time[30..], &[192, 64]);
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let node = AnalyserNode::new();
        node.set_fft_size(256).unwrap();
        node.set_smoothing_time_constant(0.0);
        node.consume(&sine(16, 256, 256), MONO);

        let freq = node.byte_frequency_data();
        assert_eq!(freq.len(), 128);
        let peak = freq
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 16);
        assert!(freq[16] > 200);
        assert!(freq[60] < freq[16]);
    }

    #[test]
    fn test_smoothing_lags_behind_input() {
        let node = AnalyserNode::new();
        node.set_fft_size(256).unwrap();
        node.consume(&sine(16, 256, 256), MONO);

        let first = node.byte_frequency_data()[16];
        let second = node.byte_frequency_data()[16];
        assert!(second > first);
    }

    #[test]
    fn test_invalid_fft_sizes_are_rejected() {
        let node = AnalyserNode::new();
        assert_eq!(node.set_fft_size(100), Err(AnalyserError::InvalidFftSize(100)));
        assert_eq!(node.set_fft_size(16), Err(AnalyserError::InvalidFftSize(16)));
        assert_eq!(
            node.set_fft_size(65_536),
            Err(AnalyserError::InvalidFftSize(65_536))
        );
        assert!(node.set_fft_size(32).is_ok());
        assert_eq!(node.frequency_bin_count(), 16);
    }

    #[test]
    fn test_history_is_bounded() {
        let node = AnalyserNode::new();
        node.consume(&vec![0.1; MAX_FFT_SIZE + 1_000], MONO);
        assert_eq!(node.state.lock().history.len(), MAX_FFT_SIZE);
    }

    #[test]
    fn test_context_lazily_creates_and_reuses_analyser() {
        let mut ctx = AudioContext::new();
        assert!(ctx.current_analyser().is_none());
        assert_eq!(ctx.state(), ContextState::Suspended);

        let first = ctx.analyser();
        let again = ctx.analyser();
        assert!(Arc::ptr_eq(&first, &again));

        ctx.reset_analyser();
        let fresh = ctx.analyser();
        assert!(!Arc::ptr_eq(&first, &fresh));
    }

    #[test]
    fn test_suspended_context_freezes_analyser() {
        let mut ctx = AudioContext::new();
        let node = ctx.analyser();
        node.set_fft_size(32).unwrap();

        node.consume(&[1.0; 32], MONO);
        assert!(node.byte_time_domain_data().iter().all(|&b| b == 128));

        ctx.resume();
        assert_eq!(ctx.state(), ContextState::Running);
        node.consume(&[1.0; 32], MONO);
        assert!(node.byte_time_domain_data().iter().all(|&b| b == 255));
    }
}
