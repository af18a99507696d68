// -----------------------------------------------------------------------------
// Mutation operators
// -----------------------------------------------------------------------------

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Color, ConfigError, Point, Polygon};
use super::clamp_i32;

// ---------- Mutation Enum -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationOperator {
    /// Nudge one coordinate of one vertex.
    Jitter,
    /// Move one vertex anywhere on the canvas.
    Relocate,
    Recolor,
}

impl MutationOperator {
    pub const COUNT: usize = 3;
    pub const ALL: [MutationOperator; Self::COUNT] =
        [MutationOperator::Jitter, MutationOperator::Relocate, MutationOperator::Recolor];

    pub fn index(self) -> usize {
        match self {
            MutationOperator::Jitter => 0,
            MutationOperator::Relocate => 1,
            MutationOperator::Recolor => 2,
        }
    }
    pub fn label(self) -> &'static str {
        match self {
            MutationOperator::Jitter => "Jitter",
            MutationOperator::Relocate => "Relocate",
            MutationOperator::Recolor => "Recolor",
        }
    }
}

/// How a color mutation changes the fill.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorPolicy {
    /// Shift one channel by a bounded signed offset.
    #[default]
    Jitter,
    /// Replace the whole fill with a uniformly random RGBA.
    Randomize,
}

// ---------- Parameters -------------
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationParams {
    /// Chance of a vertex mutation; the rest are color mutations.
    pub vertex_probability: f64,
    /// Jitter offsets are drawn from `-amp..=amp`.
    pub jitter_amplitude: i32,
    /// Channel offsets are drawn from `-amp..amp`.
    pub color_amplitude: i32,
    /// Below this success ratio vertices are jittered instead of relocated.
    pub jitter_threshold: f64,
    pub color_policy: ColorPolicy,
}

impl Default for MutationParams {
    fn default() -> Self {
        Self {
            vertex_probability: 0.5,
            jitter_amplitude: 10,
            color_amplitude: 50,
            jitter_threshold: 0.07,
            color_policy: ColorPolicy::Jitter,
        }
    }
}

impl MutationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.vertex_probability) {
            return Err(ConfigError::ProbabilityOutOfRange {
                name: "vertex_probability",
                value: self.vertex_probability,
            });
        }
        if !self.jitter_threshold.is_finite() || self.jitter_threshold < 0.0 {
            return Err(ConfigError::ProbabilityOutOfRange {
                name: "jitter_threshold",
                value: self.jitter_threshold,
            });
        }
        if self.jitter_amplitude <= 0 {
            return Err(ConfigError::InvalidAmplitude { name: "jitter" });
        }
        if self.color_amplitude <= 0 {
            return Err(ConfigError::InvalidAmplitude { name: "color" });
        }
        Ok(())
    }
}

// ---------- Polygon operators -------------
impl Polygon {
    /// Apply one random mutation in place and report which operator ran.
    ///
    /// `success_ratio` is the optimizer's recent acceptance rate; when it drops
    /// under `params.jitter_threshold` vertex moves become small local nudges.
    pub fn mutate<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        success_ratio: f64,
        width: usize,
        height: usize,
        params: &MutationParams,
    ) -> MutationOperator {
        if rng.gen::<f64>() < params.vertex_probability {
            self.mutate_vertex(rng, success_ratio, width, height, params)
        } else {
            self.mutate_color(rng, params);
            MutationOperator::Recolor
        }
    }

    fn mutate_vertex<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        success_ratio: f64,
        width: usize,
        height: usize,
        params: &MutationParams,
    ) -> MutationOperator {
        let i = rng.gen_range(0..self.order());
        let v = self.vertices()[i];
        let (w, h) = (width as i32, height as i32);

        if success_ratio < params.jitter_threshold {
            let amp = params.jitter_amplitude;
            let d = rng.gen_range(-amp..=amp);
            // Upper bound is the canvas size itself; the rasterizer clips.
            let p = if rng.gen::<bool>() {
                Point::new(clamp_i32(v.x + d, 0, w), v.y)
            } else {
                Point::new(v.x, clamp_i32(v.y + d, 0, h))
            };
            self.set_vertex(i, p);
            MutationOperator::Jitter
        } else {
            let p = Point::new(rng.gen_range(0..w.max(1)), rng.gen_range(0..h.max(1)));
            self.set_vertex(i, p);
            MutationOperator::Relocate
        }
    }

    fn mutate_color<R: Rng + ?Sized>(&mut self, rng: &mut R, params: &MutationParams) {
        let color = match params.color_policy {
            ColorPolicy::Randomize => Color::from_array(rng.gen()),
            ColorPolicy::Jitter => {
                let mut c = self.color().to_array();
                let ch = rng.gen_range(0..4);
                let amp = params.color_amplitude;
                let d = rng.gen_range(-amp..amp);
                c[ch] = clamp_i32(c[ch] as i32 + d, 0, 255) as u8;
                Color::from_array(c)
            }
        };
        self.set_color(color);
    }
}

// ---------- Mutation Proposal Type -------------
/// A trial polygon sequence derived from a committed one.
///
/// Only the mutated slot is deep-copied; every other slot shares its `Arc`
/// (and its interior cache) with the committed sequence.
#[derive(Clone, Debug)]
pub(crate) struct Proposal {
    pub(crate) polygons: Vec<Arc<Polygon>>,
    pub(crate) index: usize,
    pub(crate) op: MutationOperator,
}

/// Clone `committed`, mutate one uniformly chosen polygon, return the trial.
/// `committed` must be non-empty.
pub(crate) fn propose<R: Rng + ?Sized>(
    rng: &mut R,
    committed: &[Arc<Polygon>],
    success_ratio: f64,
    width: usize,
    height: usize,
    params: &MutationParams,
) -> Proposal {
    let mut polygons = committed.to_vec();
    let index = rng.gen_range(0..polygons.len());
    let op = Arc::make_mut(&mut polygons[index]).mutate(rng, success_ratio, width, height, params);
    Proposal { polygons, index, op }
}
