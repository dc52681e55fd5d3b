//! Signal evaluation: converts run counters into edge-triggered,
//! at-most-once-per-run buy/sell signals.

use chrono::NaiveDateTime;

use super::detector::ComparisonState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Buy,
    Sell,
}

/// Which run direction maps to a buy. The TD-sequential reading (the
/// original strategy's) treats a descending run as a buy setup; the
/// momentum reading is the inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolarityConvention {
    #[default]
    TdSequential,
    Momentum,
}

impl PolarityConvention {
    fn ascending_polarity(self) -> Polarity {
        match self {
            PolarityConvention::TdSequential => Polarity::Sell,
            PolarityConvention::Momentum => Polarity::Buy,
        }
    }

    fn descending_polarity(self) -> Polarity {
        match self {
            PolarityConvention::TdSequential => Polarity::Buy,
            PolarityConvention::Momentum => Polarity::Sell,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub asset: String,
    pub timestamp: NaiveDateTime,
    pub polarity: Polarity,
    pub run_length: u32,
}

/// Fires exactly once per run, on the bar the relevant counter first reaches
/// the threshold; re-arms only after that counter returns to zero.
#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    threshold: u32,
    convention: PolarityConvention,
    fired_ascending: bool,
    fired_descending: bool,
}

impl SignalEvaluator {
    pub fn new(threshold: u32, convention: PolarityConvention) -> Self {
        Self {
            threshold,
            convention,
            fired_ascending: false,
            fired_descending: false,
        }
    }

    pub fn evaluate(
        &mut self,
        asset: &str,
        timestamp: NaiveDateTime,
        state: ComparisonState,
    ) -> Option<Signal> {
        if state.ascending_run == 0 {
            self.fired_ascending = false;
        }
        if state.descending_run == 0 {
            self.fired_descending = false;
        }

        if state.ascending_run >= self.threshold && !self.fired_ascending {
            self.fired_ascending = true;
            return Some(Signal {
                asset: asset.to_string(),
                timestamp,
                polarity: self.convention.ascending_polarity(),
                run_length: state.ascending_run,
            });
        }

        if state.descending_run >= self.threshold && !self.fired_descending {
            self.fired_descending = true;
            return Some(Signal {
                asset: asset.to_string(),
                timestamp,
                polarity: self.convention.descending_polarity(),
                run_length: state.descending_run,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, minute, 0)
            .unwrap()
    }

    fn asc(run: u32) -> ComparisonState {
        ComparisonState {
            ascending_run: run,
            descending_run: 0,
        }
    }

    fn desc(run: u32) -> ComparisonState {
        ComparisonState {
            ascending_run: 0,
            descending_run: run,
        }
    }

    #[test]
    fn fires_on_threshold_edge() {
        let mut eval = SignalEvaluator::new(3, PolarityConvention::Momentum);
        assert!(eval.evaluate("AAPL", ts(0), asc(1)).is_none());
        assert!(eval.evaluate("AAPL", ts(1), asc(2)).is_none());
        let signal = eval.evaluate("AAPL", ts(2), asc(3)).unwrap();
        assert_eq!(signal.polarity, Polarity::Buy);
        assert_eq!(signal.run_length, 3);
        assert_eq!(signal.timestamp, ts(2));
    }

    #[test]
    fn suppressed_while_run_persists() {
        let mut eval = SignalEvaluator::new(3, PolarityConvention::Momentum);
        assert!(eval.evaluate("AAPL", ts(0), asc(3)).is_some());
        assert!(eval.evaluate("AAPL", ts(1), asc(4)).is_none());
        assert!(eval.evaluate("AAPL", ts(2), asc(5)).is_none());
        assert!(eval.evaluate("AAPL", ts(3), asc(9)).is_none());
    }

    #[test]
    fn rearms_after_run_resets() {
        let mut eval = SignalEvaluator::new(2, PolarityConvention::Momentum);
        assert!(eval.evaluate("AAPL", ts(0), asc(2)).is_some());
        assert!(eval.evaluate("AAPL", ts(1), asc(3)).is_none());
        assert!(eval.evaluate("AAPL", ts(2), asc(0)).is_none());
        assert!(eval.evaluate("AAPL", ts(3), asc(2)).is_some());
    }

    #[test]
    fn opposite_run_does_not_consume_arm() {
        let mut eval = SignalEvaluator::new(2, PolarityConvention::Momentum);
        assert!(eval.evaluate("AAPL", ts(0), asc(2)).is_some());
        // Flip to a descending run: fires its own signal, and the ascending
        // side re-arms because its counter dropped to zero.
        let s = eval.evaluate("AAPL", ts(1), desc(2)).unwrap();
        assert_eq!(s.polarity, Polarity::Sell);
        let s = eval.evaluate("AAPL", ts(2), asc(2)).unwrap();
        assert_eq!(s.polarity, Polarity::Buy);
    }

    #[test]
    fn td_convention_maps_descending_to_buy() {
        let mut eval = SignalEvaluator::new(3, PolarityConvention::TdSequential);
        let signal = eval.evaluate("AAPL", ts(0), desc(3)).unwrap();
        assert_eq!(signal.polarity, Polarity::Buy);
        let signal = eval.evaluate("AAPL", ts(1), asc(3)).unwrap();
        assert_eq!(signal.polarity, Polarity::Sell);
    }

    #[test]
    fn run_already_past_threshold_fires_once() {
        // A counter can first be observed above the threshold (e.g. threshold
        // lowered mid-run is not supported, but the evaluator must still fire
        // exactly once).
        let mut eval = SignalEvaluator::new(3, PolarityConvention::Momentum);
        assert!(eval.evaluate("AAPL", ts(0), asc(5)).is_some());
        assert!(eval.evaluate("AAPL", ts(1), asc(6)).is_none());
    }
}
