//! Accumulation of PCM16 samples into wire frames.

/// Samples per up-frame: 200 ms at 24 kHz.
pub const FRAME_SAMPLES: usize = 4800;

/// Collects resampled PCM16 samples and emits fixed-size frames. Partial
/// frames stay buffered until enough samples arrive; an empty push emits
/// nothing.
pub struct FrameAccumulator {
    frame_len: usize,
    buffer: Vec<i16>,
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new(FRAME_SAMPLES)
    }
}

impl FrameAccumulator {
    pub fn new(frame_len: usize) -> Self {
        assert!(frame_len > 0, "frame length must be positive");
        Self {
            frame_len,
            buffer: Vec::with_capacity(frame_len),
        }
    }

    /// Adds samples and returns every complete frame now available.
    pub fn push(&mut self, samples: &[i16]) -> Vec<Vec<i16>> {
        if samples.is_empty() {
            return Vec::new();
        }
        self.buffer.extend_from_slice(samples);
        let mut frames = Vec::new();
        while self.buffer.len() >= self.frame_len {
            let rest = self.buffer.split_off(self.frame_len);
            frames.push(std::mem::replace(&mut self.buffer, rest));
        }
        frames
    }

    /// Samples waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_push_emits_nothing() {
        let mut acc = FrameAccumulator::default();
        assert!(acc.push(&[]).is_empty());
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn partial_input_is_buffered() {
        let mut acc = FrameAccumulator::new(100);
        assert!(acc.push(&[1i16; 60]).is_empty());
        assert_eq!(acc.pending(), 60);
    }

    #[test]
    fn full_frames_are_emitted_in_order() {
        let mut acc = FrameAccumulator::new(4);
        let samples: Vec<i16> = (0..10).collect();
        let frames = acc.push(&samples);
        assert_eq!(frames, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);
        assert_eq!(acc.pending(), 2);

        let more = acc.push(&[10, 11]);
        assert_eq!(more, vec![vec![8, 9, 10, 11]]);
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn default_frame_is_two_hundred_ms() {
        assert_eq!(FRAME_SAMPLES, 4800);
        let mut acc = FrameAccumulator::default();
        let frames = acc.push(&vec![0i16; FRAME_SAMPLES]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), FRAME_SAMPLES);
    }
}
