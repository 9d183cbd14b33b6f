//! Live match situation consumed by the script and chart stages.

use serde::{Deserialize, Serialize};

/// Snapshot of a limited-overs match in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchData {
    pub match_id: String,
    pub teams: Teams,
    pub current_score: Score,
    #[serde(default)]
    pub recent_overs: Vec<OverSummary>,
    #[serde(default)]
    pub key_moments: Vec<KeyMoment>,
    #[serde(default)]
    pub partnerships: Vec<Partnership>,
    pub run_rate: RunRate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teams {
    pub batting: String,
    pub bowling: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub runs: u32,
    pub wickets: u32,
    /// Overs in cricket notation (17.1 = 17 overs and 1 ball).
    pub overs: f64,
}

/// One completed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverSummary {
    pub over: u32,
    pub runs: u32,
    pub wickets: u32,
    #[serde(default)]
    pub balls: Vec<Ball>,
}

/// Outcome of a single delivery: runs scored, or `"W"` for a wicket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ball {
    Runs(u32),
    Wicket(WicketMarker),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WicketMarker {
    W,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMoment {
    #[serde(rename = "type")]
    pub kind: String,
    pub over: f64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batsman: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bowler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partnership {
    pub batsmen: Vec<String>,
    pub runs: u32,
    pub balls: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunRate {
    pub current: f64,
    pub required: f64,
}

impl MatchData {
    /// Built-in demo situation used when no live feed is wired in.
    pub fn sample() -> Self {
        use Ball::Runs;
        let wicket = Ball::Wicket(WicketMarker::W);

        Self {
            match_id: "RCB_vs_KKR_IPL2024_032".to_string(),
            teams: Teams {
                batting: "Royal Challengers Bengaluru".to_string(),
                bowling: "Kolkata Knight Riders".to_string(),
            },
            current_score: Score {
                runs: 176,
                wickets: 4,
                overs: 17.1,
            },
            recent_overs: vec![
                OverSummary {
                    over: 15,
                    runs: 14,
                    wickets: 0,
                    balls: vec![Runs(1), Runs(6), Runs(1), Runs(1), Runs(0), Runs(5)],
                },
                OverSummary {
                    over: 16,
                    runs: 9,
                    wickets: 0,
                    balls: vec![Runs(1), Runs(1), Runs(4), Runs(1), Runs(0), Runs(2)],
                },
                OverSummary {
                    over: 17,
                    runs: 12,
                    wickets: 1,
                    balls: vec![Runs(6), wicket, Runs(1), Runs(1), Runs(2), Runs(2)],
                },
            ],
            key_moments: vec![
                KeyMoment {
                    kind: "six".to_string(),
                    over: 15.2,
                    description: "Glenn Maxwell hammers Sunil Narine over midwicket for SIX"
                        .to_string(),
                    batsman: Some("Glenn Maxwell".to_string()),
                    bowler: None,
                    runs: Some(6),
                },
                KeyMoment {
                    kind: "boundary".to_string(),
                    over: 16.3,
                    description: "Virat Kohli times it perfectly through covers for FOUR"
                        .to_string(),
                    batsman: Some("Virat Kohli".to_string()),
                    bowler: None,
                    runs: Some(4),
                },
                KeyMoment {
                    kind: "wicket".to_string(),
                    over: 17.2,
                    description: "Maxwell caught at long-on off Andre Russell".to_string(),
                    batsman: Some("Glenn Maxwell".to_string()),
                    bowler: Some("Andre Russell".to_string()),
                    runs: None,
                },
            ],
            partnerships: vec![Partnership {
                batsmen: vec!["Virat Kohli".to_string(), "Glenn Maxwell".to_string()],
                runs: 72,
                balls: 46,
            }],
            run_rate: RunRate {
                current: 10.26,
                required: 9.2,
            },
        }
    }

    /// Runs scored across `recent_overs`.
    pub fn recent_runs(&self) -> u32 {
        self.recent_overs.iter().map(|o| o.runs).sum()
    }

    /// Cumulative run rate after each recent over, `(over, rate)`.
    ///
    /// Only the recent window is known, so the rate is runs in the window
    /// divided by the over number, matching how the run-rate chart reads.
    pub fn cumulative_run_rates(&self) -> Vec<(u32, f64)> {
        let mut total = 0u32;
        self.recent_overs
            .iter()
            .filter(|o| o.over > 0)
            .map(|o| {
                total += o.runs;
                (o.over, total as f64 / o.over as f64)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ball_accepts_wicket_marker() {
        let balls: Vec<Ball> = serde_json::from_str(r#"[6, "W", 1]"#).unwrap();
        assert_eq!(balls[0], Ball::Runs(6));
        assert_eq!(balls[1], Ball::Wicket(WicketMarker::W));
        assert_eq!(serde_json::to_string(&balls).unwrap(), r#"[6,"W",1]"#);
    }

    #[test]
    fn test_sample_recent_runs() {
        assert_eq!(MatchData::sample().recent_runs(), 35);
    }

    #[test]
    fn test_cumulative_run_rates() {
        let rates = MatchData::sample().cumulative_run_rates();
        assert_eq!(rates.len(), 3);
        assert_eq!(rates[0].0, 15);
        assert!((rates[0].1 - 14.0 / 15.0).abs() < 1e-9);
        assert!((rates[2].1 - 35.0 / 17.0).abs() < 1e-9);
    }

    #[test]
    fn test_key_moment_type_field_rename() {
        let json = serde_json::to_value(&MatchData::sample().key_moments[2]).unwrap();
        assert_eq!(json["type"], "wicket");
        assert!(json.get("runs").is_none());
    }
}
