// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Redraw pacing
//!
//! Tells the caller when enough simulated time has passed for the state to
//! be worth drawing again.

/// Simulated time between redraws
pub const REDRAW_INTERVAL: f64 = 0.05;

/// Consecutive quiet steps after which a redraw is forced
pub const MAX_SKIPPED: u32 = 8;

/// Accumulates step sizes and reports when a redraw is due
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FramePacer {
    elapsed: f64,
    skipped: u32,
}

impl FramePacer {
    /// Create a pacer with nothing accumulated
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one step of size `dt`; returns whether a redraw is due
    ///
    /// Only the interval is subtracted when time runs over, so long steps
    /// keep their remainder for the next frame.
    pub fn tick(&mut self, dt: f64) -> bool {
        self.elapsed += dt;
        if self.elapsed > REDRAW_INTERVAL {
            self.elapsed -= REDRAW_INTERVAL;
            self.skipped = 0;
            return true;
        }

        self.skipped += 1;
        if self.skipped > MAX_SKIPPED {
            self.skipped = 0;
            return true;
        }
        false
    }

    /// Simulated time carried towards the next redraw
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Forget accumulated time
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_after_interval() {
        let mut pacer = FramePacer::new();
        assert!(!pacer.tick(0.025));
        assert!(!pacer.tick(0.025));
        assert!(pacer.tick(0.025));
        assert!((pacer.elapsed() - 0.025).abs() < 1e-12);
    }

    #[test]
    fn test_large_step_is_always_due() {
        let mut pacer = FramePacer::new();
        assert!(pacer.tick(0.5));
        assert!(pacer.tick(0.0));
    }

    #[test]
    fn test_starvation_guard() {
        let mut pacer = FramePacer::new();
        for _ in 0..MAX_SKIPPED {
            assert!(!pacer.tick(0.0001));
        }
        assert!(pacer.tick(0.0001));
        assert!(!pacer.tick(0.0001));
    }

    #[test]
    fn test_reset() {
        let mut pacer = FramePacer::new();
        pacer.tick(0.04);
        pacer.reset();
        assert_eq!(pacer.elapsed(), 0.0);
        assert!(!pacer.tick(0.04));
    }
}
