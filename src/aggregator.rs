use serde::{Deserialize, Serialize};

use crate::analyzers::Signal;
use crate::config::AggregatorSettings;
use crate::models::{ConflictLevel, SignalDirection};

/// The fused directional output of all analyzers for one cycle. Derived
/// from the cycle's signals and never persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeDecision {
    pub direction: SignalDirection,
    /// 0-100. Deliberately penalized by disagreement: the denominator
    /// counts every fired signal's weight, losing side included.
    pub confidence: f64,
    pub contributing: Vec<Signal>,
    pub conflict: ConflictLevel,
    /// Analyzers that fired an explicit Hold (diagnostics only).
    pub hold_count: usize,
}

impl CompositeDecision {
    pub fn hold(hold_count: usize) -> Self {
        Self {
            direction: SignalDirection::Hold,
            confidence: 0.0,
            contributing: Vec::new(),
            conflict: ConflictLevel::None,
            hold_count,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.direction == SignalDirection::Hold
    }
}

/// Weighted-vote fusion with conflict detection. Deterministic for
/// identical inputs, including the tie-break path.
pub struct SignalAggregator {
    settings: AggregatorSettings,
}

impl SignalAggregator {
    pub fn new(settings: AggregatorSettings) -> Self {
        Self { settings }
    }

    pub fn aggregate(&self, signals: &[Signal]) -> CompositeDecision {
        let hold_count = signals
            .iter()
            .filter(|s| s.direction == SignalDirection::Hold)
            .count();

        let longs: Vec<&Signal> = signals
            .iter()
            .filter(|s| s.direction == SignalDirection::Long)
            .collect();
        let shorts: Vec<&Signal> = signals
            .iter()
            .filter(|s| s.direction == SignalDirection::Short)
            .collect();

        // Nothing fired a direction: a normal quiet cycle, not an error.
        if longs.is_empty() && shorts.is_empty() {
            return CompositeDecision::hold(hold_count);
        }

        let long_score: f64 = longs.iter().map(|s| s.score()).sum();
        let short_score: f64 = shorts.iter().map(|s| s.score()).sum();
        let long_weight: f64 = longs.iter().map(|s| s.weight).sum();
        let short_weight: f64 = shorts.iter().map(|s| s.weight).sum();

        let direction = self.winning_direction(&longs, &shorts, long_score, short_score);
        let (winning_score, minority_weight, majority_weight) =
            if direction == SignalDirection::Long {
                (long_score, short_weight, long_weight)
            } else {
                (short_score, long_weight, short_weight)
            };

        let conflict = if longs.is_empty() || shorts.is_empty() {
            ConflictLevel::None
        } else if minority_weight
            >= self.settings.strong_conflict_minority_fraction * majority_weight
        {
            ConflictLevel::Strong
        } else {
            ConflictLevel::Weak
        };

        // Denominator spans every fired signal, losing group included, so
        // disagreement drags confidence down even for a strong winner.
        let total_weight = long_weight + short_weight;
        let mut confidence = if total_weight > 0.0 {
            (100.0 * winning_score / total_weight).clamp(0.0, 100.0)
        } else {
            0.0
        };

        if conflict == ConflictLevel::Strong {
            confidence *= 1.0 - self.settings.conflict_penalty;
        }

        let contributing: Vec<Signal> = longs
            .iter()
            .chain(shorts.iter())
            .map(|s| (*s).clone())
            .collect();

        let direction = if confidence < self.settings.min_confidence_threshold {
            SignalDirection::Hold
        } else {
            direction
        };

        CompositeDecision {
            direction,
            confidence,
            contributing,
            conflict,
            hold_count,
        }
    }

    /// Higher group score wins. Ties resolve to the direction of the
    /// highest-priority fired signal, then to the lexically smallest
    /// source id, so identical inputs always produce identical output.
    fn winning_direction(
        &self,
        longs: &[&Signal],
        shorts: &[&Signal],
        long_score: f64,
        short_score: f64,
    ) -> SignalDirection {
        if (long_score - short_score).abs() > f64::EPSILON {
            return if long_score > short_score {
                SignalDirection::Long
            } else {
                SignalDirection::Short
            };
        }

        let best = longs
            .iter()
            .chain(shorts.iter())
            .max_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| b.source.cmp(&a.source))
            })
            .expect("tie-break only runs with at least one fired signal");
        best.direction
    }
}
