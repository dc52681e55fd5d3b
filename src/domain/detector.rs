//! Sequential reversal detection: consecutive directional close comparisons
//! against a lagged reference, in the TD-setup style.

use std::collections::VecDeque;

/// Run counters for one asset. At most one of the two is ever positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComparisonState {
    pub ascending_run: u32,
    pub descending_run: u32,
}

/// Counts consecutive bars whose close is above (or below) the close
/// `lookback` bars earlier. A tie breaks any run. Inert until `lookback`
/// prior closes have been seen.
#[derive(Debug, Clone)]
pub struct SequentialReversalDetector {
    lookback: usize,
    closes: VecDeque<f64>,
    state: ComparisonState,
}

impl SequentialReversalDetector {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback,
            closes: VecDeque::with_capacity(lookback + 1),
            state: ComparisonState::default(),
        }
    }

    pub fn state(&self) -> ComparisonState {
        self.state
    }

    /// Feed the next close and return the updated run counters.
    pub fn update(&mut self, close: f64) -> ComparisonState {
        self.closes.push_back(close);
        if self.closes.len() > self.lookback + 1 {
            self.closes.pop_front();
        }

        if self.closes.len() == self.lookback + 1 {
            let reference = self.closes[0];
            if close > reference {
                self.state.ascending_run += 1;
                self.state.descending_run = 0;
            } else if close < reference {
                self.state.descending_run += 1;
                self.state.ascending_run = 0;
            } else {
                self.state.ascending_run = 0;
                self.state.descending_run = 0;
            }
        }

        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn runs(lookback: usize, closes: &[f64]) -> Vec<(u32, u32)> {
        let mut detector = SequentialReversalDetector::new(lookback);
        closes
            .iter()
            .map(|&c| {
                let s = detector.update(c);
                (s.ascending_run, s.descending_run)
            })
            .collect()
    }

    #[test]
    fn inert_before_lookback_bars() {
        let trace = runs(3, &[10.0, 11.0, 12.0]);
        assert_eq!(trace, vec![(0, 0), (0, 0), (0, 0)]);
    }

    #[test]
    fn reference_trace_lookback_two() {
        // closes [10,11,9,12,13,14,8]: the ascending run first reaches 3 on
        // the sixth bar (14 > 12), and the final bar flips to descending.
        let trace = runs(2, &[10.0, 11.0, 9.0, 12.0, 13.0, 14.0, 8.0]);
        assert_eq!(
            trace,
            vec![
                (0, 0),
                (0, 0),
                (0, 1), // 9 < 10
                (1, 0), // 12 > 11
                (2, 0), // 13 > 9
                (3, 0), // 14 > 12
                (0, 1), // 8 < 13
            ]
        );
    }

    #[test]
    fn tie_resets_both_runs() {
        let trace = runs(1, &[10.0, 11.0, 12.0, 12.0, 13.0]);
        assert_eq!(trace, vec![(0, 0), (1, 0), (2, 0), (0, 0), (1, 0)]);
    }

    #[test]
    fn descending_run_accumulates() {
        let trace = runs(1, &[10.0, 9.0, 8.0, 7.0]);
        assert_eq!(trace, vec![(0, 0), (0, 1), (0, 2), (0, 3)]);
    }

    #[test]
    fn reversal_resets_opposite_counter() {
        let trace = runs(1, &[10.0, 9.0, 8.0, 11.0]);
        assert_eq!(trace.last(), Some(&(1, 0)));
    }

    proptest! {
        #[test]
        fn counters_never_both_positive(
            lookback in 1usize..5,
            closes in proptest::collection::vec(1.0f64..1000.0, 0..100),
        ) {
            let mut detector = SequentialReversalDetector::new(lookback);
            for close in closes {
                let s = detector.update(close);
                prop_assert!(s.ascending_run == 0 || s.descending_run == 0);
            }
        }

        #[test]
        fn inert_until_lookback(
            lookback in 1usize..8,
            closes in proptest::collection::vec(1.0f64..1000.0, 1..8),
        ) {
            let mut detector = SequentialReversalDetector::new(lookback);
            for (i, close) in closes.iter().enumerate() {
                let s = detector.update(*close);
                if i < lookback {
                    prop_assert_eq!(s, ComparisonState::default());
                }
            }
        }
    }
}
