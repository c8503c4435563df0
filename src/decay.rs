use crate::error::{Error, Result};

/// An implementation of a time-decaying value
pub trait Decay {
    /// Calculate value at time `t`
    fn evaluate(&self, t: f32) -> f32;
}

fn validate(rate: f32, vi: f32, vf: f32) -> Result<()> {
    ((rate >= 0.0 && vi > vf) || (rate < 0.0 && vi < vf))
        .then_some(())
        .ok_or_else(|| Error::config("`vi - vf` must have same sign as `rate`"))
}

/// A constant value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constant {
    value: f32,
}

impl Constant {
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: f32) -> f32 {
        self.value
    }
}

/// v(t) = v<sub>f</sub> + (v<sub>i</sub> - v<sub>f</sub>) * e<sup>-rt</sup>
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exponential {
    rate: f32,
    vi: f32,
    vf: f32,
}

impl Exponential {
    pub fn new(rate: f32, vi: f32, vf: f32) -> Result<Self> {
        validate(rate, vi, vf)?;
        Ok(Self { rate, vi, vf })
    }
}

impl Decay for Exponential {
    fn evaluate(&self, t: f32) -> f32 {
        let &Self { rate, vi, vf } = self;
        vf + (vi - vf) * (-rate * t).exp()
    }
}

/// v(t) = max(v<sub>i</sub> * r<sup>floor(t/s)</sup>, v<sub>f</sub>)
///
/// With `t` counted in episodes, `Step::new(0.9, 0.1, 0.0, 100.0)` multiplies an
/// exploration rate of 0.1 by 0.9 after every 100 episodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    rate: f32,
    vi: f32,
    vf: f32,
    step: f32,
}

impl Step {
    pub fn new(rate: f32, vi: f32, vf: f32, step: f32) -> Result<Self> {
        validate(rate, vi, vf)?;
        if step <= 0.0 {
            return Err(Error::config("`step` must be positive"));
        }
        Ok(Self { rate, vi, vf, step })
    }
}

impl Decay for Step {
    fn evaluate(&self, t: f32) -> f32 {
        let &Self { rate, vi, vf, step } = self;
        (vi * rate.powf((t / step).floor())).max(vf)
    }
}
