//! Template commentary writer.
//!
//! Fills fixed broadcast-style templates from the match situation. Produces
//! the same three segments for every run: a summary, the latest key moment,
//! and a statistics segment.

use pitchcast_match_model::{format_timestamp, MatchData, Segment, SegmentKind, VisualHint};

/// Planned length of each generated segment, in seconds.
pub const SEGMENT_SECS: u32 = 20;

#[derive(Debug, Clone, Default)]
pub struct TemplateScriptWriter;

impl TemplateScriptWriter {
    pub fn new() -> Self {
        Self
    }

    /// Build the timed segment list for a match.
    pub fn timed_script(&self, data: &MatchData) -> Vec<Segment> {
        let plan = [
            (SegmentKind::Summary, VisualHint::Scoreboard),
            (SegmentKind::KeyMoment, VisualHint::HighlightReplay),
            (SegmentKind::Statistics, VisualHint::Charts),
        ];

        plan.iter()
            .enumerate()
            .map(|(i, (kind, visual))| {
                let index = i as u32;
                Segment {
                    id: index + 1,
                    kind: *kind,
                    timestamp: format_timestamp(index * SEGMENT_SECS),
                    duration_secs: SEGMENT_SECS as f64,
                    script: self.commentary(data, *kind),
                    visual_hint: *visual,
                }
            })
            .collect()
    }

    /// Commentary text for one segment kind.
    pub fn commentary(&self, data: &MatchData, kind: SegmentKind) -> String {
        match kind {
            SegmentKind::Summary => summary(data),
            SegmentKind::KeyMoment => key_moment(data),
            SegmentKind::Statistics => statistics(data),
        }
    }
}

fn summary(data: &MatchData) -> String {
    let score = &data.current_score;
    format!(
        "What a thrilling contest we're witnessing here! {} have posted {} for {} in {} overs. \
         The run rate is ticking along nicely at {}, and with the required rate at {}, \
         this match is beautifully poised. The crowd is on their feet as we head into \
         the crucial middle overs!",
        data.teams.batting,
        score.runs,
        score.wickets,
        score.overs,
        data.run_rate.current,
        data.run_rate.required,
    )
}

fn key_moment(data: &MatchData) -> String {
    match data.key_moments.last() {
        Some(moment) => format!(
            "And that's MASSIVE! What a shot! {} has absolutely smashed that one! {}. \
             The crowd erupts! This is why we love this game!",
            moment.batsman.as_deref().unwrap_or("The batsman"),
            moment.description,
        ),
        None => format!(
            "No fireworks just yet, but {} are building steadily. Every run counts from here!",
            data.teams.batting
        ),
    }
}

fn statistics(data: &MatchData) -> String {
    let recent = format!(
        "In the last {} overs, we've seen {} runs scored. The momentum is shifting!",
        data.recent_overs.len(),
        data.recent_runs()
    );

    match data.partnerships.last() {
        Some(p) if p.batsmen.len() >= 2 => format!(
            "Let's look at the numbers. The current partnership between {} and {} has \
             already added {} runs. They're scoring at over 7 runs per over, putting \
             pressure back on the bowling side. {}",
            p.batsmen[0], p.batsmen[1], p.runs, recent
        ),
        _ => format!("Let's look at the numbers. {recent}"),
    }
}
