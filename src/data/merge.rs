//! Record merger
//!
//! Joins delivery records with their match metadata and aggregates them to
//! one batting line per (player, match). Deliveries referencing a match id
//! with no match record are dropped and counted rather than failing the
//! run. Output is sorted chronologically; the feature pass depends on it.

use std::collections::{HashMap, HashSet};

use crate::{CricError, DeliveryRecord, MatchInfo, PlayerMatchStat, Result};

/// Result of a merge run
#[derive(Debug)]
pub struct MergeOutcome {
    /// One batting line per (player, match), chronological order
    pub stats: Vec<PlayerMatchStat>,
    /// Delivery rows dropped for referencing an unknown match id
    pub dropped_events: usize,
    /// Distinct matches represented in the output
    pub matches: usize,
}

/// Per-batter accumulator while walking one match's deliveries
#[derive(Debug, Default)]
struct BattingLine {
    runs: u32,
    balls: u32,
    /// 1-based order of first appearance within the innings
    position: u8,
}

/// Join deliveries with match metadata and aggregate to batting lines.
pub fn merge_records(
    deliveries: &[DeliveryRecord],
    matches: &[MatchInfo],
) -> Result<MergeOutcome> {
    let venue_fill = VenueFill::from_matches(matches);

    // Match index with missing venues resolved up front
    let mut by_id: HashMap<i64, MatchInfo> = HashMap::with_capacity(matches.len());
    for m in matches {
        let mut m = m.clone();
        if m.venue.is_none() {
            m.venue = Some(venue_fill.resolve(&m.team1));
        }
        by_id.insert(m.id, m);
    }

    // Deliveries arrive in over order within a match; first sort by
    // (match, inning, over, ball) so appearance order is well defined.
    let mut ordered: Vec<&DeliveryRecord> = deliveries.iter().collect();
    ordered.sort_by_key(|d| (d.match_id, d.inning, d.over, d.ball));

    let mut dropped_events = 0usize;
    // (match_id, batter) -> accumulated line; insertion order tracked per innings
    let mut lines: HashMap<(i64, String), BattingLine> = HashMap::new();
    let mut innings_order: HashMap<(i64, u8), u8> = HashMap::new();
    let mut teams: HashMap<(i64, String), (String, String)> = HashMap::new();

    for delivery in ordered {
        if !by_id.contains_key(&delivery.match_id) {
            // Fatal for this row only; the run continues
            log::debug!(
                "Dropping delivery: {}",
                CricError::DataIntegrity(delivery.match_id)
            );
            dropped_events += 1;
            continue;
        }

        let key = (delivery.match_id, delivery.batter.clone());
        let line = lines.entry(key.clone()).or_insert_with(|| {
            let seen = innings_order
                .entry((delivery.match_id, delivery.inning))
                .or_insert(0);
            *seen += 1;
            BattingLine {
                position: (*seen).min(11),
                ..BattingLine::default()
            }
        });

        line.runs += delivery.runs_off_bat;
        if delivery.is_valid_ball() {
            line.balls += 1;
        }
        teams.entry(key).or_insert_with(|| {
            (
                delivery.batting_team.clone(),
                delivery.bowling_team.clone(),
            )
        });
    }

    let mut stats = Vec::with_capacity(lines.len());
    let mut seen_matches: HashSet<i64> = HashSet::new();
    for ((match_id, player), line) in lines {
        // An innings of only wides/no-balls is not a batting line
        if line.balls == 0 {
            continue;
        }
        let info = &by_id[&match_id];
        let (team, opponent) = teams[&(match_id, player.clone())].clone();
        let runs = line.runs as f64;
        seen_matches.insert(match_id);

        stats.push(PlayerMatchStat {
            match_id,
            player,
            team,
            opponent,
            venue: info.venue.clone().unwrap_or_else(|| venue_fill.global.clone()),
            date: info.date,
            runs,
            balls_faced: line.balls,
            strike_rate: runs / line.balls as f64 * 100.0,
            batting_position: line.position,
        });
    }

    stats.sort_by(|a, b| {
        (a.date, a.match_id, a.player.as_str()).cmp(&(b.date, b.match_id, b.player.as_str()))
    });

    if dropped_events > 0 {
        log::warn!(
            "Dropped {} deliveries referencing unknown match ids",
            dropped_events
        );
    }
    log::info!(
        "Merged {} batting lines across {} matches",
        stats.len(),
        seen_matches.len()
    );

    Ok(MergeOutcome {
        stats,
        dropped_events,
        matches: seen_matches.len(),
    })
}

/// Resolves missing venues: most frequent venue for the home team, then
/// the globally most frequent venue.
struct VenueFill {
    by_team: HashMap<String, String>,
    global: String,
}

impl VenueFill {
    fn from_matches(matches: &[MatchInfo]) -> Self {
        let mut team_counts: HashMap<String, HashMap<String, usize>> = HashMap::new();
        let mut global_counts: HashMap<String, usize> = HashMap::new();

        for m in matches {
            let Some(venue) = m.venue.as_deref() else {
                continue;
            };
            *team_counts
                .entry(m.team1.clone())
                .or_default()
                .entry(venue.to_string())
                .or_insert(0) += 1;
            *global_counts.entry(venue.to_string()).or_insert(0) += 1;
        }

        let by_team = team_counts
            .into_iter()
            .filter_map(|(team, counts)| most_frequent(&counts).map(|v| (team, v)))
            .collect();
        let global = most_frequent(&global_counts).unwrap_or_else(|| "Unknown Venue".to_string());

        VenueFill { by_team, global }
    }

    fn resolve(&self, home_team: &str) -> String {
        self.by_team
            .get(home_team)
            .cloned()
            .unwrap_or_else(|| self.global.clone())
    }
}

fn most_frequent(counts: &HashMap<String, usize>) -> Option<String> {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, _)| name.clone())
}
