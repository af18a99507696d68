// -----------------------------------------------------------------------------
// Fitness
// -----------------------------------------------------------------------------

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::Canvas;

/// Which bytes of the interleaved RGBA buffer take part in the distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMode {
    /// Compare R, G and B; ignore alpha.
    #[default]
    RgbOnly,
    /// Skip every byte whose flat index is a multiple of 3. Matches scores
    /// written by older tools that used this stride on 4-byte pixels.
    LegacyStride,
}

/// Buffers at or above this many bytes are scored in parallel chunks.
const PAR_THRESHOLD_BYTES: usize = 256 * 1024;
/// Multiple of 12 so every chunk starts on a pixel and on a stride boundary.
const CHUNK_BYTES: usize = 48 * 1024;

/// Root of summed squared byte differences between a candidate and the target.
///
/// Not divided by the sample count. Lower is better, zero means identical.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FitnessEvaluator {
    mode: FitnessMode,
}

impl FitnessEvaluator {
    pub fn new(mode: FitnessMode) -> Self {
        Self { mode }
    }

    #[inline]
    pub fn mode(&self) -> FitnessMode {
        self.mode
    }

    /// Both canvases must have the same dimensions.
    pub fn score(&self, target: &Canvas, candidate: &Canvas) -> f64 {
        (self.sum_squared_error(target.pixels(), candidate.pixels()) as f64).sqrt()
    }

    /// Integer sum, so the parallel and serial paths agree exactly.
    pub fn sum_squared_error(&self, target: &[u8], candidate: &[u8]) -> u64 {
        debug_assert_eq!(target.len(), candidate.len());
        let mode = self.mode;
        if target.len() < PAR_THRESHOLD_BYTES {
            return sse_chunk(mode, 0, target, candidate);
        }
        target
            .par_chunks(CHUNK_BYTES)
            .zip(candidate.par_chunks(CHUNK_BYTES))
            .enumerate()
            .map(|(k, (t, c))| sse_chunk(mode, k * CHUNK_BYTES, t, c))
            .sum()
    }
}

/// `base` is the flat index of the chunk's first byte; it must be pixel aligned.
fn sse_chunk(mode: FitnessMode, base: usize, target: &[u8], candidate: &[u8]) -> u64 {
    match mode {
        FitnessMode::RgbOnly => {
            let mut sse: u64 = 0;
            for (t, c) in target.chunks_exact(4).zip(candidate.chunks_exact(4)) {
                let dr = t[0] as i32 - c[0] as i32;
                let dg = t[1] as i32 - c[1] as i32;
                let db = t[2] as i32 - c[2] as i32;
                sse += (dr * dr + dg * dg + db * db) as u64;
            }
            sse
        }
        FitnessMode::LegacyStride => {
            target
                .iter()
                .zip(candidate)
                .enumerate()
                .filter(|(i, _)| (base + i) % 3 != 0)
                .map(|(_, (t, c))| {
                    let d = *t as i32 - *c as i32;
                    (d * d) as u64
                })
                .sum()
        }
    }
}
