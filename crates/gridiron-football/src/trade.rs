// Trade evaluation: value each side, apply positional need, and label the
// result with a recommendation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use gridiron_core::config::TradeSettings;
use gridiron_core::error::{FantasyError, Result};
use gridiron_core::model::{Player, Position, TradeRecord};
use gridiron_core::store::StatStore;

use crate::analysis::recent_points;
use crate::roster::Roster;
use crate::valuation::{self, Valuation, ValuationParams};

/// A player on one side of a trade with the value the evaluator assigned.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPlayer {
    pub player: Player,
    pub valuation: Valuation,
    /// Valuation score, times the need multiplier when `need_boost` is set.
    pub value: f64,
    pub need_boost: bool,
}

impl ScoredPlayer {
    pub fn new(player: Player, valuation: Valuation) -> Self {
        let value = valuation.score;
        ScoredPlayer {
            player,
            valuation,
            value,
            need_boost: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TradeClass {
    Favorable,
    Neutral,
    Unfavorable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recommendation {
    StrongAccept,
    Accept,
    FairTrade,
    Decline,
    StrongDecline,
}

impl Recommendation {
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::StrongAccept => "STRONG ACCEPT",
            Recommendation::Accept => "ACCEPT",
            Recommendation::FairTrade => "FAIR TRADE",
            Recommendation::Decline => "DECLINE",
            Recommendation::StrongDecline => "STRONG DECLINE",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeEvaluation {
    pub given: Vec<ScoredPlayer>,
    pub received: Vec<ScoredPlayer>,
    pub value_given: f64,
    pub value_received: f64,
    /// `None` when the given side is worth nothing.
    pub percent_change: Option<f64>,
    pub class: TradeClass,
    pub recommendation: Recommendation,
    /// Value message first, then positional impact notes.
    pub rationale: Vec<String>,
}

impl TradeEvaluation {
    pub fn reason(&self) -> String {
        self.rationale.join("; ")
    }

    /// Snapshot for the trade history table.
    pub fn to_record(&self) -> TradeRecord {
        TradeRecord {
            id: None,
            created_at: Utc::now(),
            given: self.given.iter().map(|s| s.player.player_id.clone()).collect(),
            received: self
                .received
                .iter()
                .map(|s| s.player.player_id.clone())
                .collect(),
            value_given: self.value_given,
            value_received: self.value_received,
            percent_change: self.percent_change,
            recommendation: self.recommendation.label().to_string(),
            reason: self.reason(),
        }
    }
}

/// Compare two already-scored sides.
///
/// Percent change is relative to the given side. With nothing of value
/// given, the trade is favorable exactly when something of value comes back.
pub fn compare(
    given: Vec<ScoredPlayer>,
    received: Vec<ScoredPlayer>,
    thresholds: &TradeSettings,
) -> TradeEvaluation {
    let value_given: f64 = given.iter().map(|s| s.value).sum();
    let value_received: f64 = received.iter().map(|s| s.value).sum();

    let percent_change = if value_given.abs() < f64::EPSILON {
        None
    } else {
        Some((value_received - value_given) / value_given * 100.0)
    };

    let neutral = thresholds.neutral_band_pct;
    let strong = thresholds.strong_band_pct;

    let (class, recommendation, message) = match percent_change {
        Some(pct) => {
            let class = if pct > neutral {
                TradeClass::Favorable
            } else if pct < -neutral {
                TradeClass::Unfavorable
            } else {
                TradeClass::Neutral
            };
            let (rec, msg) = if pct > strong {
                (Recommendation::StrongAccept, format!("Excellent value gain of {pct:.1}%"))
            } else if pct > neutral {
                (Recommendation::Accept, format!("Good value gain of {pct:.1}%"))
            } else if pct >= -neutral {
                (Recommendation::FairTrade, format!("Roughly even value ({pct:+.1}%)"))
            } else if pct >= -strong {
                (Recommendation::Decline, format!("Value loss of {:.1}%", pct.abs()))
            } else {
                (
                    Recommendation::StrongDecline,
                    format!("Significant value loss of {:.1}%", pct.abs()),
                )
            };
            (class, rec, msg)
        }
        None if value_received > 0.0 => (
            TradeClass::Favorable,
            Recommendation::StrongAccept,
            "Gives up no measurable value".to_string(),
        ),
        None => (
            TradeClass::Neutral,
            Recommendation::FairTrade,
            "Neither side has measurable value".to_string(),
        ),
    };

    TradeEvaluation {
        given,
        received,
        value_given,
        value_received,
        percent_change,
        class,
        recommendation,
        rationale: vec![message],
    }
}

/// Evaluates proposed trades against the stat store and the user's roster.
pub struct TradeEvaluator<'a, S: StatStore> {
    store: &'a S,
    season: i32,
    weeks: usize,
    valuation: ValuationParams,
    thresholds: TradeSettings,
}

impl<'a, S: StatStore> TradeEvaluator<'a, S> {
    pub fn new(
        store: &'a S,
        season: i32,
        weeks: usize,
        valuation: ValuationParams,
        thresholds: TradeSettings,
    ) -> Self {
        TradeEvaluator {
            store,
            season,
            weeks,
            valuation,
            thresholds,
        }
    }

    /// Evaluate giving `given_ids` for `received_ids`.
    pub fn evaluate(
        &self,
        given_ids: &[String],
        received_ids: &[String],
        roster: &Roster,
    ) -> Result<TradeEvaluation> {
        if given_ids.is_empty() || received_ids.is_empty() {
            return Err(FantasyError::InvalidInput(
                "both sides of a trade need at least one player".into(),
            ));
        }
        if let Some(dup) = given_ids.iter().find(|id| received_ids.contains(*id)) {
            return Err(FantasyError::InvalidInput(format!(
                "player {dup} appears on both sides of the trade"
            )));
        }
        for side in [given_ids, received_ids] {
            let mut seen = BTreeSet::new();
            if let Some(dup) = side.iter().find(|id| !seen.insert(id.as_str())) {
                return Err(FantasyError::InvalidInput(format!(
                    "player {dup} is listed twice on one side of the trade"
                )));
            }
        }

        let mut given = self.score_side(given_ids)?;
        let mut received = self.score_side(received_ids)?;
        given.sort_by(|a, b| b.value.total_cmp(&a.value));
        received.sort_by(|a, b| b.value.total_cmp(&a.value));

        // `received` is sorted by value; boost until each position reaches
        // its target depth.
        let mut needs: BTreeSet<Position> = BTreeSet::new();
        let mut boosted: BTreeMap<Position, usize> = BTreeMap::new();
        for scored in &mut received {
            let pos = scored.player.position;
            let filled = boosted.entry(pos).or_insert(0);
            if roster.count_without(pos, given_ids) + *filled < roster.target_depth(pos) {
                scored.value *= self.thresholds.need_multiplier;
                scored.need_boost = true;
                *filled += 1;
                needs.insert(pos);
            }
        }

        // Only a net loss at a position can weaken it.
        let mut weakened: BTreeSet<Position> = BTreeSet::new();
        for scored in &given {
            let pos = scored.player.position;
            let remaining = roster.count_without(pos, given_ids);
            let outgoing = roster.count(pos) - remaining;
            let incoming = received.iter().filter(|r| r.player.position == pos).count();
            if incoming < outgoing && remaining + incoming < roster.target_depth(pos) {
                weakened.insert(pos);
            }
        }

        let mut evaluation = compare(given, received, &self.thresholds);
        evaluation
            .rationale
            .extend(weakened.iter().map(|pos| format!("Weakens {pos} depth")));
        evaluation
            .rationale
            .extend(needs.iter().map(|pos| format!("Addresses {pos} need")));

        info!(
            "Evaluated trade: {:.1} given vs {:.1} received -> {}",
            evaluation.value_given, evaluation.value_received, evaluation.recommendation
        );
        Ok(evaluation)
    }

    fn score_side(&self, ids: &[String]) -> Result<Vec<ScoredPlayer>> {
        ids.iter()
            .map(|id| -> Result<ScoredPlayer> {
                let player = self
                    .store
                    .player(id)?
                    .ok_or_else(|| FantasyError::InvalidInput(format!("unknown player id {id}")))?;
                let samples = recent_points(self.store, id, self.season, self.weeks)?;
                let valuation = valuation::evaluate(&samples, &self.valuation);
                debug!("{} valued at {:.1}", player.name, valuation.score);
                Ok(ScoredPlayer::new(player, valuation))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: &str, position: Position, value: f64) -> ScoredPlayer {
        let valuation = Valuation {
            average: Some(value / 3.0),
            consistency: None,
            trend: valuation::TrendFit {
                trend: valuation::Trend::Stable,
                slope: None,
            },
            score: value,
            sample_count: 1,
            no_data: false,
        };
        ScoredPlayer::new(
            Player {
                player_id: id.into(),
                name: format!("Player {id}"),
                team: "FA".into(),
                position,
            },
            valuation,
        )
    }

    fn thresholds() -> TradeSettings {
        TradeSettings::default()
    }

    #[test]
    fn six_percent_gain_is_favorable() {
        let eval = compare(
            vec![scored("a", Position::RunningBack, 50.0)],
            vec![scored("b", Position::RunningBack, 53.0)],
            &thresholds(),
        );
        assert_eq!(eval.class, TradeClass::Favorable);
        assert_eq!(eval.recommendation, Recommendation::Accept);
        assert!((eval.percent_change.unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn neutral_band_is_inclusive() {
        let eval = compare(
            vec![scored("a", Position::WideReceiver, 40.0)],
            vec![scored("b", Position::WideReceiver, 42.0)],
            &thresholds(),
        );
        assert_eq!(eval.class, TradeClass::Neutral);
        assert_eq!(eval.recommendation, Recommendation::FairTrade);

        let eval = compare(
            vec![scored("a", Position::WideReceiver, 40.0)],
            vec![scored("b", Position::WideReceiver, 38.0)],
            &thresholds(),
        );
        assert_eq!(eval.class, TradeClass::Neutral);
    }

    #[test]
    fn strong_bands() {
        let eval = compare(
            vec![scored("a", Position::TightEnd, 40.0)],
            vec![scored("b", Position::TightEnd, 60.0)],
            &thresholds(),
        );
        assert_eq!(eval.recommendation, Recommendation::StrongAccept);

        let eval = compare(
            vec![scored("a", Position::TightEnd, 60.0)],
            vec![scored("b", Position::TightEnd, 40.0)],
            &thresholds(),
        );
        assert_eq!(eval.class, TradeClass::Unfavorable);
        assert_eq!(eval.recommendation, Recommendation::StrongDecline);

        let eval = compare(
            vec![scored("a", Position::TightEnd, 50.0)],
            vec![scored("b", Position::TightEnd, 45.0)],
            &thresholds(),
        );
        assert_eq!(eval.recommendation, Recommendation::Decline);
    }

    #[test]
    fn sides_are_summed() {
        let eval = compare(
            vec![
                scored("a", Position::RunningBack, 30.0),
                scored("b", Position::WideReceiver, 20.0),
            ],
            vec![scored("c", Position::Quarterback, 45.0)],
            &thresholds(),
        );
        assert!((eval.value_given - 50.0).abs() < 1e-9);
        assert!((eval.value_received - 45.0).abs() < 1e-9);
        assert_eq!(eval.class, TradeClass::Unfavorable);
    }

    #[test]
    fn zero_given_total() {
        let eval = compare(
            vec![scored("a", Position::Kicker, 0.0)],
            vec![scored("b", Position::Kicker, 12.0)],
            &thresholds(),
        );
        assert!(eval.percent_change.is_none());
        assert_eq!(eval.class, TradeClass::Favorable);

        let eval = compare(
            vec![scored("a", Position::Kicker, 0.0)],
            vec![scored("b", Position::Kicker, 0.0)],
            &thresholds(),
        );
        assert_eq!(eval.class, TradeClass::Neutral);
    }

    #[test]
    fn record_carries_ids_and_label() {
        let eval = compare(
            vec![scored("a", Position::RunningBack, 50.0)],
            vec![scored("b", Position::RunningBack, 53.0)],
            &thresholds(),
        );
        let record = eval.to_record();
        assert_eq!(record.given, vec!["a".to_string()]);
        assert_eq!(record.received, vec!["b".to_string()]);
        assert_eq!(record.recommendation, "ACCEPT");
        assert!(record.reason.starts_with("Good value gain of 6.0%"));
        assert!(record.id.is_none());
    }
}
