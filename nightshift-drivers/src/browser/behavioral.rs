use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone)]
/// Produces human-like pauses between keystrokes.
pub struct BehavioralEngine {
    min_ms: u64,
    max_ms: u64,
}

impl Default for BehavioralEngine {
    fn default() -> Self {
        Self::new(30, 150)
    }
}

impl BehavioralEngine {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms,
        }
    }

    /// A random pause between `min` and `max` milliseconds.
    pub fn keystroke_pause(&self) -> Duration {
        let mut rng = OsRng;
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }
}
