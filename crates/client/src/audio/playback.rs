//! FIFO playback queue with per-chunk fades and barge-in.
//!
//! A single worker (the device output callback) drains the queue. Each chunk
//! gets a short sine fade-in and fade-out when it is taken up, which
//! suppresses clicks between chunks. Barge-in clears everything pending,
//! stops the current chunk, and schedules a short burst of silence to flush
//! the output.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::pcm::WIRE_SAMPLE_RATE;

/// Silence scheduled after barge-in: 100 ms at the wire rate.
pub const BARGE_IN_SILENCE_SAMPLES: usize = (WIRE_SAMPLE_RATE as usize) / 10;

/// Longest fade, in samples.
const MAX_FADE: usize = 50;

/// Fade length for a chunk: 50 samples or 5% of the chunk, whichever is
/// shorter.
pub fn fade_len(chunk_len: usize) -> usize {
    MAX_FADE.min(chunk_len / 20)
}

/// Applies the sine-curve fade-in and fade-out in place.
pub fn apply_fade(samples: &mut [f32]) {
    let n = fade_len(samples.len());
    if n == 0 {
        return;
    }
    let len = samples.len();
    for i in 0..n {
        let gain = (std::f32::consts::FRAC_PI_2 * (i + 1) as f32 / n as f32).sin();
        samples[i] *= gain;
        samples[len - 1 - i] *= gain;
    }
}

struct QueueState {
    pending: VecDeque<Vec<f32>>,
    current: Option<(Vec<f32>, usize)>,
    silence_remaining: usize,
}

pub struct PlaybackQueue {
    state: Mutex<QueueState>,
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                current: None,
                silence_remaining: 0,
            }),
        }
    }

    /// Appends a decoded down-frame to the tail of the queue.
    pub fn enqueue(&self, chunk: Vec<f32>) {
        if chunk.is_empty() {
            return;
        }
        self.state.lock().expect("queue lock poisoned").pending.push_back(chunk);
    }

    /// Number of chunks waiting behind the one currently playing.
    pub fn pending_len(&self) -> usize {
        self.state.lock().expect("queue lock poisoned").pending.len()
    }

    /// True when nothing is queued, playing, or flushing.
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock().expect("queue lock poisoned");
        state.pending.is_empty() && state.current.is_none() && state.silence_remaining == 0
    }

    /// Barge-in: discard all pending chunks, stop the current one, and play
    /// up to 100 ms of silence to flush the output.
    pub fn barge_in(&self) {
        let mut state = self.state.lock().expect("queue lock poisoned");
        state.pending.clear();
        state.current = None;
        state.silence_remaining = BARGE_IN_SILENCE_SAMPLES;
    }

    /// Fills a mono output block, advancing through silence, the current
    /// chunk, and then the queue. Gaps are zero-filled.
    pub fn next_block(&self, out: &mut [f32]) {
        let mut state = self.state.lock().expect("queue lock poisoned");
        for sample in out.iter_mut() {
            *sample = state.next_sample();
        }
    }

    /// Fills an interleaved output block by duplicating the mono signal
    /// across `channels`.
    pub fn fill_interleaved(&self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let mut state = self.state.lock().expect("queue lock poisoned");
        for frame in out.chunks_mut(channels) {
            let sample = state.next_sample();
            frame.fill(sample);
        }
    }
}

impl QueueState {
    fn next_sample(&mut self) -> f32 {
        if self.silence_remaining > 0 {
            self.silence_remaining -= 1;
            return 0.0;
        }
        loop {
            if let Some((chunk, pos)) = self.current.as_mut() {
                if *pos < chunk.len() {
                    let sample = chunk[*pos];
                    *pos += 1;
                    return sample;
                }
                self.current = None;
            }
            match self.pending.pop_front() {
                Some(mut chunk) => {
                    apply_fade(&mut chunk);
                    self.current = Some((chunk, 0));
                }
                None => return 0.0,
            }
        }
    }
}
