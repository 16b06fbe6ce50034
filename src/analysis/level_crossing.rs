use serde::{Deserialize, Serialize};

/// Direction of a threshold crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelCrossingEvent {
    Rising,
    Falling,
}

/// Schmitt-trigger crossing detector over a smoothed series
///
/// A rising crossing fires when the value reaches `level + hysteresis`, a
/// falling one when it drops below `level - hysteresis`. Wobble inside the
/// band never fires twice.
#[derive(Debug)]
pub struct LevelCrossingDetector {
    level: f32,
    hysteresis: f32,
    above: Option<bool>,
}

impl LevelCrossingDetector {
    pub fn new(level: f32, hysteresis: f32) -> Self {
        Self {
            level,
            hysteresis: hysteresis.max(0.0),
            above: None,
        }
    }

    /// Feed the next value; the first value only primes the state
    pub fn process(&mut self, value: f32) -> Option<LevelCrossingEvent> {
        match self.above {
            None => {
                self.above = Some(value >= self.level);
                None
            }
            Some(false) if value >= self.level + self.hysteresis => {
                self.above = Some(true);
                Some(LevelCrossingEvent::Rising)
            }
            Some(true) if value < self.level - self.hysteresis => {
                self.above = Some(false);
                Some(LevelCrossingEvent::Falling)
            }
            Some(_) => None,
        }
    }
}
