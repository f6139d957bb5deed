//! Streaming linear-interpolation resampler.
//!
//! For each output index `i` the source position is `carry + i * ratio`; the
//! sample is interpolated between the two neighboring source samples. The
//! fractional position and the final source sample are carried across calls
//! so chunk boundaries introduce no discontinuity.

/// Resamples mono float audio from `src_rate` to `dst_rate`.
pub struct LinearResampler {
    step: f64,
    pos: f64,
    tail: Option<f32>,
}

impl LinearResampler {
    pub fn new(src_rate: u32, dst_rate: u32) -> Self {
        assert!(src_rate > 0 && dst_rate > 0, "sample rates must be positive");
        Self {
            step: f64::from(src_rate) / f64::from(dst_rate),
            pos: 0.0,
            tail: None,
        }
    }

    /// Processes one input buffer, returning the resampled output. An empty
    /// input produces an empty output and leaves the carry untouched.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if input.is_empty() {
            return Vec::new();
        }

        // Prepend the previous buffer's final sample so interpolation can
        // span the boundary.
        let mut src: Vec<f32> = Vec::with_capacity(input.len() + 1);
        if let Some(tail) = self.tail {
            src.push(tail);
        }
        src.extend_from_slice(input);

        let mut out = Vec::with_capacity((src.len() as f64 / self.step) as usize + 1);
        let limit = (src.len() - 1) as f64;
        while self.pos < limit {
            let base = self.pos.floor() as usize;
            let frac = (self.pos - base as f64) as f32;
            let a = src[base];
            let b = src[base + 1];
            out.push(a + (b - a) * frac);
            self.pos += self.step;
        }

        // Re-base the position relative to the carried final sample.
        let consumed = src.len() - 1;
        self.pos -= consumed as f64;
        self.tail = Some(src[consumed]);
        out
    }
}
