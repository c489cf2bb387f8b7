// Fantasy point calculation from a weekly box score.

use gridiron_core::model::{ScoringFormat, StatLine};

const PASS_YARD: f64 = 0.04;
const PASS_TD: f64 = 4.0;
const INTERCEPTION: f64 = -2.0;
const RUSH_YARD: f64 = 0.1;
const RUSH_TD: f64 = 6.0;
const REC_YARD: f64 = 0.1;
const REC_TD: f64 = 6.0;
const FUMBLE: f64 = -2.0;

/// Fantasy points for one stat line under `format`, rounded to 2 decimals.
pub fn fantasy_points(line: &StatLine, format: ScoringFormat) -> f64 {
    let points = line.passing_yards * PASS_YARD
        + f64::from(line.passing_tds) * PASS_TD
        + f64::from(line.interceptions) * INTERCEPTION
        + line.rushing_yards * RUSH_YARD
        + f64::from(line.rushing_tds) * RUSH_TD
        + line.receiving_yards * REC_YARD
        + f64::from(line.receiving_tds) * REC_TD
        + f64::from(line.fumbles) * FUMBLE
        + f64::from(line.receptions) * format.reception_points();

    round2(points)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn quarterback_line() {
        // 291 yds, 2 TD, 1 INT, 5 rushing yards.
        let line = StatLine {
            passing_yards: 291.0,
            passing_tds: 2,
            interceptions: 1,
            rushing_yards: 5.0,
            ..StatLine::default()
        };
        assert!(approx_eq(fantasy_points(&line, ScoringFormat::Ppr), 18.14));
    }

    #[test]
    fn receptions_depend_on_format() {
        let line = StatLine {
            receptions: 8,
            receiving_yards: 95.0,
            receiving_tds: 1,
            ..StatLine::default()
        };
        assert!(approx_eq(fantasy_points(&line, ScoringFormat::Ppr), 23.5));
        assert!(approx_eq(fantasy_points(&line, ScoringFormat::HalfPpr), 19.5));
        assert!(approx_eq(fantasy_points(&line, ScoringFormat::Standard), 15.5));
    }

    #[test]
    fn turnovers_can_go_negative() {
        let line = StatLine {
            interceptions: 2,
            fumbles: 1,
            passing_yards: 10.0,
            ..StatLine::default()
        };
        assert!(approx_eq(fantasy_points(&line, ScoringFormat::Ppr), -5.6));
    }

    #[test]
    fn empty_line_scores_zero() {
        assert!(approx_eq(fantasy_points(&StatLine::default(), ScoringFormat::Ppr), 0.0));
    }
}
