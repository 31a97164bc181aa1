#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::BLOCK_SIZE;

/*
AHDSR Envelope
==============

The envelope generator used for voice amplitude (AEG), the second voice
envelope (EG2) and the group envelopes.

Vocabulary
----------

  output      The envelope's current value (0.0 to 1.0).

  stage       Attack, Hold, Decay, Sustain, Release or Complete.

  gate        High while the note is held. Dropping the gate sends the
              envelope to Release from wherever it currently is.

  phase       Progress through the current timed stage, 0.0 → 1.0.

  shape       A curvature control in [-1, 1]. 0 is a straight line,
              positive values bow the segment one way, negative the other.


Time Mapping
------------

Stage times are normalized controls in [0, 1], mapped exponentially:

    seconds = 2 ^ (ENV_TIME_MIN_LOG2 + x * (ENV_TIME_MAX_LOG2 - ENV_TIME_MIN_LOG2))

    x = 0.0   →  2^-8  ≈ 3.9 ms
    x = 0.5   →  2^-1.5 ≈ 354 ms
    x = 1.0   →  2^5   = 32 s

A hold of exactly zero skips the Hold stage.


Shape
-----

Each segment walks a phase from 0 to 1 and bends it:

    k       = 2 ^ (shape * 2)           shape  -1   0    1
    curved  = phase ^ k                 k      0.25 1    4

    Attack:   out = start + (1 - start) * curved(phase, a_shape)
    Decay:    out = S + (1 - S) * (1 - curved(phase, d_shape))
    Release:  out = release_start * (1 - curved(phase, r_shape))


The State Machine
-----------------

    attack_from(level)
        │
        ▼
    ┌────────┐ phase=1 ┌──────┐ phase=1 ┌───────┐ phase=1 ┌─────────┐
    │ Attack │───────→ │ Hold │───────→ │ Decay │───────→ │ Sustain │
    └────────┘  (h>0)  └──────┘         └───────┘         └─────────┘
        │  └────────────(h=0)──────────────↗                  │
        │                                                      │
        └────────────── gate low (any gated stage) ────────────┤
                                                               ▼
                                    ┌──────────┐ phase=1  ┌─────────┐
                                    │ Complete │ ←─────── │ Release │
                                    └──────────┘          └─────────┘

Output is computed once per sample and cached for the block, so the voice can
multiply its audio by `output_cache` after the whole chain has run.
*/

pub const ENV_TIME_MIN_LOG2: f32 = -8.0;
pub const ENV_TIME_MAX_LOG2: f32 = 5.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
    Complete,
}

/// Stored envelope settings. Times are normalized to [0, 1].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrStorage {
    pub a: f32,
    pub h: f32,
    pub d: f32,
    pub s: f32,
    pub r: f32,
    pub a_shape: f32,
    pub d_shape: f32,
    pub r_shape: f32,
}

impl Default for AdsrStorage {
    fn default() -> Self {
        Self {
            a: 0.0,
            h: 0.0,
            d: 0.0,
            s: 1.0,
            r: 0.5,
            a_shape: 0.0,
            d_shape: 0.0,
            r_shape: 0.0,
        }
    }
}

/// Seconds for a normalized stage time.
#[inline]
pub fn stage_seconds(x: f32) -> f32 {
    let x = if x.is_finite() { x.clamp(0.0, 1.0) } else { 0.0 };
    2.0f32.powf(ENV_TIME_MIN_LOG2 + x * (ENV_TIME_MAX_LOG2 - ENV_TIME_MIN_LOG2))
}

#[inline]
fn curved(phase: f32, shape: f32) -> f32 {
    let shape = if shape.is_finite() { shape.clamp(-1.0, 1.0) } else { 0.0 };
    if shape == 0.0 {
        phase
    } else {
        phase.powf(2.0f32.powf(shape * 2.0))
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub stage: EnvelopeStage,
    pub output: f32,
    pub output_cache: [f32; BLOCK_SIZE],
    phase: f32,
    attack_start: f32,
    release_start: f32,
    sample_rate: f32,
}

impl Envelope {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            stage: EnvelopeStage::Complete,
            output: 0.0,
            output_cache: [0.0; BLOCK_SIZE],
            phase: 0.0,
            attack_start: 0.0,
            release_start: 0.0,
            sample_rate: sample_rate.max(1.0),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
    }

    /// Restart the attack from `level`.
    pub fn attack_from(&mut self, level: f32) {
        let level = level.clamp(0.0, 1.0);
        self.stage = EnvelopeStage::Attack;
        self.phase = 0.0;
        self.attack_start = level;
        self.output = level;
    }

    pub fn is_complete(&self) -> bool {
        self.stage == EnvelopeStage::Complete
    }

    pub fn is_gated_stage(&self) -> bool {
        matches!(
            self.stage,
            EnvelopeStage::Attack | EnvelopeStage::Hold | EnvelopeStage::Decay | EnvelopeStage::Sustain
        )
    }

    #[inline]
    fn increment(&self, x: f32) -> f32 {
        1.0 / (stage_seconds(x) * self.sample_rate)
    }

    /// Run one block. `params` are the (possibly modulated) stage settings.
    pub fn process_block(&mut self, params: &AdsrStorage, gate: bool) {
        if !gate && self.is_gated_stage() {
            self.stage = EnvelopeStage::Release;
            self.phase = 0.0;
            self.release_start = self.output;
        }

        let sustain = if params.s.is_finite() {
            params.s.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let attack_inc = self.increment(params.a);
        let hold_inc = self.increment(params.h);
        let decay_inc = self.increment(params.d);
        let release_inc = self.increment(params.r);

        for i in 0..BLOCK_SIZE {
            match self.stage {
                EnvelopeStage::Attack => {
                    self.phase += attack_inc;
                    if self.phase >= 1.0 {
                        self.phase = 0.0;
                        self.output = 1.0;
                        self.stage = if params.h > 0.0 {
                            EnvelopeStage::Hold
                        } else {
                            EnvelopeStage::Decay
                        };
                    } else {
                        self.output = self.attack_start
                            + (1.0 - self.attack_start) * curved(self.phase, params.a_shape);
                    }
                }
                EnvelopeStage::Hold => {
                    self.phase += hold_inc;
                    self.output = 1.0;
                    if self.phase >= 1.0 {
                        self.phase = 0.0;
                        self.stage = EnvelopeStage::Decay;
                    }
                }
                EnvelopeStage::Decay => {
                    self.phase += decay_inc;
                    if self.phase >= 1.0 {
                        self.phase = 0.0;
                        self.output = sustain;
                        self.stage = EnvelopeStage::Sustain;
                    } else {
                        self.output =
                            sustain + (1.0 - sustain) * (1.0 - curved(self.phase, params.d_shape));
                    }
                }
                EnvelopeStage::Sustain => {
                    self.output = sustain;
                }
                EnvelopeStage::Release => {
                    self.phase += release_inc;
                    if self.phase >= 1.0 {
                        self.phase = 0.0;
                        self.output = 0.0;
                        self.stage = EnvelopeStage::Complete;
                    } else {
                        self.output =
                            self.release_start * (1.0 - curved(self.phase, params.r_shape));
                    }
                }
                EnvelopeStage::Complete => {
                    self.output = 0.0;
                }
            }
            self.output_cache[i] = self.output;
        }
    }
}
