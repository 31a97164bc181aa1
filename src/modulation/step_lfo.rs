use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::STEP_LFO_STEPS;

/*
Step LFO
========

A sequence of up to 32 values played back as a stepped (or smoothed)
modulation source.

Vocabulary
----------

  data      The step values, normally in [-1, 1].

  repeat    How many of the 32 steps form one cycle.

  rate      log2 of the frequency in Hz. In cycle mode the frequency is for
            the whole pattern, otherwise it is per step.

  smooth    0 holds each step flat. Larger values glide into each new step
            over that fraction of the step.

  shuffle   Swing. Even steps last (1 + shuffle), odd steps (1 - shuffle).


Trigger Modes
-------------

  Voice     restart at step 0 when the voice starts
  FreeRun   start wherever a free-running clock since engine start would be
  Random    start at a random step
  Release   hold at step 0 while the note is held, run after release


Smoothing
---------

    step value  ──┐        ┌────────        smooth = 0
                  └────────┘

                  ╲        ╱‾‾‾‾‾‾‾‾        smooth = 0.3
                   ‾‾‾‾‾‾‾╱
                  |<-0.3->|

The glide uses a smoothstep curve from the previous step's value to the new
one across the first `smooth` of each step.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerMode {
    #[default]
    Voice,
    FreeRun,
    Random,
    Release,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepLfoStorage {
    pub data: [f32; STEP_LFO_STEPS],
    pub repeat: usize,
    pub rate: f32,
    pub smooth: f32,
    pub shuffle: f32,
    pub trigger_mode: TriggerMode,
    pub cycle_mode: bool,
    pub only_once: bool,
}

impl Default for StepLfoStorage {
    fn default() -> Self {
        Self {
            data: [0.0; STEP_LFO_STEPS],
            repeat: 16,
            rate: 0.0,
            smooth: 0.0,
            shuffle: 0.0,
            trigger_mode: TriggerMode::Voice,
            cycle_mode: true,
            only_once: false,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LfoPreset {
    Clear,
    Sine,
    Tri,
    Square,
    RampUp,
    RampDown,
    Noise,
    NoiseMean3,
    NoiseMean5,
    TremoloTri,
    TremoloSin,
}

impl LfoPreset {
    pub const ALL: [LfoPreset; 11] = [
        LfoPreset::Clear,
        LfoPreset::Sine,
        LfoPreset::Tri,
        LfoPreset::Square,
        LfoPreset::RampUp,
        LfoPreset::RampDown,
        LfoPreset::Noise,
        LfoPreset::NoiseMean3,
        LfoPreset::NoiseMean5,
        LfoPreset::TremoloTri,
        LfoPreset::TremoloSin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LfoPreset::Clear => "clear",
            LfoPreset::Sine => "sine",
            LfoPreset::Tri => "tri",
            LfoPreset::Square => "square",
            LfoPreset::RampUp => "ramp_up",
            LfoPreset::RampDown => "ramp_down",
            LfoPreset::Noise => "noise",
            LfoPreset::NoiseMean3 => "noise_mean3",
            LfoPreset::NoiseMean5 => "noise_mean5",
            LfoPreset::TremoloTri => "tremolo_tri",
            LfoPreset::TremoloSin => "tremolo_sin",
        }
    }
}

fn smear(data: &mut [f32; STEP_LFO_STEPS], repeat: usize, radius: usize) {
    let src = *data;
    let width = (2 * radius + 1) as f32;
    for i in 0..repeat {
        let mut acc = 0.0;
        for o in 0..=2 * radius {
            acc += src[(i + repeat + o - radius) % repeat];
        }
        data[i] = acc / width;
    }
}

/// Overwrite `storage` with one of the stock shapes.
pub fn load_preset(preset: LfoPreset, storage: &mut StepLfoStorage, rng: &mut StdRng) {
    *storage = StepLfoStorage::default();
    let n = STEP_LFO_STEPS;
    let shape = |i: usize| i as f32 / n as f32;
    match preset {
        LfoPreset::Clear => {}
        LfoPreset::Sine => {
            storage.repeat = n;
            storage.smooth = 1.0;
            for i in 0..n {
                storage.data[i] = (TAU * shape(i)).sin();
            }
        }
        LfoPreset::Tri => {
            storage.repeat = n;
            storage.smooth = 1.0;
            for i in 0..n {
                let x = shape(i);
                storage.data[i] = if x < 0.5 { 4.0 * x - 1.0 } else { 3.0 - 4.0 * x };
            }
        }
        LfoPreset::Square => {
            storage.repeat = 2;
            storage.data[0] = 1.0;
            storage.data[1] = -1.0;
        }
        LfoPreset::RampUp => {
            storage.repeat = n;
            for i in 0..n {
                storage.data[i] = 2.0 * shape(i) - 1.0;
            }
        }
        LfoPreset::RampDown => {
            storage.repeat = n;
            for i in 0..n {
                storage.data[i] = 1.0 - 2.0 * shape(i);
            }
        }
        LfoPreset::Noise | LfoPreset::NoiseMean3 | LfoPreset::NoiseMean5 => {
            storage.repeat = n;
            for v in storage.data.iter_mut() {
                *v = rng.gen_range(-1.0..=1.0);
            }
            match preset {
                LfoPreset::NoiseMean3 => smear(&mut storage.data, n, 1),
                LfoPreset::NoiseMean5 => smear(&mut storage.data, n, 2),
                _ => {}
            }
        }
        LfoPreset::TremoloTri => {
            storage.repeat = n;
            storage.smooth = 1.0;
            for i in 0..n {
                let x = shape(i);
                storage.data[i] = if x < 0.5 { 2.0 * x } else { 2.0 - 2.0 * x };
            }
        }
        LfoPreset::TremoloSin => {
            storage.repeat = n;
            storage.smooth = 1.0;
            for i in 0..n {
                storage.data[i] = 0.5 - 0.5 * (TAU * shape(i)).cos();
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepLfo {
    pub output: f32,
    step: usize,
    phase: f32,
    previous: f32,
    finished: bool,
    sample_rate_inv: f32,
}

impl StepLfo {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            output: 0.0,
            step: 0,
            phase: 0.0,
            previous: 0.0,
            finished: false,
            sample_rate_inv: 1.0 / sample_rate.max(1.0),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate_inv = 1.0 / sample_rate.max(1.0);
    }

    fn repeat(storage: &StepLfoStorage) -> usize {
        storage.repeat.clamp(1, STEP_LFO_STEPS)
    }

    fn steps_per_second(storage: &StepLfoStorage, rate: f32) -> f32 {
        let rate = if rate.is_finite() { rate.clamp(-10.0, 10.0) } else { 0.0 };
        let hz = 2.0f32.powf(rate);
        if storage.cycle_mode {
            hz * Self::repeat(storage) as f32
        } else {
            hz
        }
    }

    /// Reset for a new voice according to the trigger mode.
    pub fn assign(
        &mut self,
        storage: &StepLfoStorage,
        rate: f32,
        rng: &mut StdRng,
        free_run_seconds: f64,
    ) {
        let repeat = Self::repeat(storage);
        self.phase = 0.0;
        self.finished = false;
        self.step = match storage.trigger_mode {
            TriggerMode::Voice | TriggerMode::Release => 0,
            TriggerMode::Random => rng.gen_range(0..repeat),
            TriggerMode::FreeRun => {
                let steps = free_run_seconds * Self::steps_per_second(storage, rate) as f64;
                self.phase = steps.fract() as f32;
                (steps.trunc() as u64 % repeat as u64) as usize
            }
        };
        self.previous = storage.data[self.step];
        self.output = self.previous;
    }

    /// Advance by `samples` and update `output`.
    pub fn process(&mut self, storage: &StepLfoStorage, rate: f32, samples: usize, gated: bool) {
        let repeat = Self::repeat(storage);
        if self.step >= repeat {
            self.step %= repeat;
        }
        let holding = storage.trigger_mode == TriggerMode::Release && gated;
        if !self.finished && !holding {
            let shuffle = storage.shuffle.clamp(-0.99, 0.99);
            let swing = if self.step % 2 == 0 {
                1.0 + shuffle
            } else {
                1.0 - shuffle
            };
            self.phase += Self::steps_per_second(storage, rate)
                * samples as f32
                * self.sample_rate_inv
                / swing;
            while self.phase >= 1.0 {
                self.phase -= 1.0;
                if storage.only_once && self.step + 1 >= repeat {
                    self.finished = true;
                    self.phase = 0.0;
                    break;
                }
                self.previous = storage.data[self.step];
                self.step = (self.step + 1) % repeat;
            }
        }

        let current = storage.data[self.step];
        let smooth = storage.smooth.clamp(0.0, 1.0);
        self.output = if smooth <= 0.0 || self.finished {
            current
        } else {
            let t = (self.phase / smooth).clamp(0.0, 1.0);
            let t = t * t * (3.0 - 2.0 * t);
            self.previous + (current - self.previous) * t
        };
    }

    pub fn current_step(&self) -> usize {
        self.step
    }
}
