//! Historical aggregate state
//!
//! `HistoryIndex` accumulates everything the feature computation reads:
//! per-player recent-form windows and career sums, per-venue and
//! per-opponent batting aggregates, and global means. During the training
//! pass a row is computed BEFORE its match is folded in, so every lookup
//! reflects strictly prior matches; at serving time the fully-folded index
//! answers the same lookups over the whole corpus.

use std::collections::{HashMap, VecDeque};

use crate::PlayerMatchStat;

/// Incremental mean over observed values
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningMean {
    sum: f64,
    count: u64,
}

impl RunningMean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// One match's batting line inside a form window
#[derive(Debug, Clone, Copy)]
struct FormPoint {
    runs: f64,
    strike_rate: f64,
    balls: f64,
}

/// Per-player accumulated history
#[derive(Debug, Clone, Default)]
struct PlayerHistory {
    form: VecDeque<FormPoint>,
    career_runs: RunningMean,
    career_strike_rate: RunningMean,
    career_balls: RunningMean,
    position: RunningMean,
}

/// Rolling recent-form averages over a player's form window
#[derive(Debug, Clone, Copy, Default)]
pub struct FormAggregates {
    pub runs_avg: Option<f64>,
    pub strike_rate_avg: Option<f64>,
    pub balls_avg: Option<f64>,
}

/// Batting aggregate for a venue or an opponent
#[derive(Debug, Clone, Copy, Default)]
struct BattingAggregate {
    runs: RunningMean,
    strike_rate: RunningMean,
}

/// All aggregate state the feature computation reads
#[derive(Debug, Clone)]
pub struct HistoryIndex {
    window: usize,
    players: HashMap<String, PlayerHistory>,
    venues: HashMap<String, BattingAggregate>,
    opponents: HashMap<String, BattingAggregate>,
    global_runs: RunningMean,
    global_strike_rate: RunningMean,
    global_balls: RunningMean,
}

impl HistoryIndex {
    pub fn new(window: usize) -> Self {
        HistoryIndex {
            window,
            players: HashMap::new(),
            venues: HashMap::new(),
            opponents: HashMap::new(),
            global_runs: RunningMean::default(),
            global_strike_rate: RunningMean::default(),
            global_balls: RunningMean::default(),
        }
    }

    /// Fold a batting line into the index (call AFTER computing its row)
    pub fn fold(&mut self, stat: &PlayerMatchStat) {
        let player = self.players.entry(key(&stat.player)).or_default();
        player.form.push_back(FormPoint {
            runs: stat.runs,
            strike_rate: stat.strike_rate,
            balls: stat.balls_faced as f64,
        });
        if player.form.len() > self.window {
            player.form.pop_front();
        }
        player.career_runs.push(stat.runs);
        player.career_strike_rate.push(stat.strike_rate);
        player.career_balls.push(stat.balls_faced as f64);
        player.position.push(stat.batting_position as f64);

        let venue = self.venues.entry(key(&stat.venue)).or_default();
        venue.runs.push(stat.runs);
        venue.strike_rate.push(stat.strike_rate);

        let opponent = self.opponents.entry(key(&stat.opponent)).or_default();
        opponent.runs.push(stat.runs);
        opponent.strike_rate.push(stat.strike_rate);

        self.global_runs.push(stat.runs);
        self.global_strike_rate.push(stat.strike_rate);
        self.global_balls.push(stat.balls_faced as f64);
    }

    /// Rolling averages over the player's form window
    pub fn form(&self, player: &str) -> FormAggregates {
        let Some(history) = self.players.get(&key(player)) else {
            return FormAggregates::default();
        };
        if history.form.is_empty() {
            return FormAggregates::default();
        }
        let n = history.form.len() as f64;
        FormAggregates {
            runs_avg: Some(history.form.iter().map(|p| p.runs).sum::<f64>() / n),
            strike_rate_avg: Some(history.form.iter().map(|p| p.strike_rate).sum::<f64>() / n),
            balls_avg: Some(history.form.iter().map(|p| p.balls).sum::<f64>() / n),
        }
    }

    pub fn career_runs(&self, player: &str) -> Option<f64> {
        self.players.get(&key(player))?.career_runs.mean()
    }

    pub fn career_strike_rate(&self, player: &str) -> Option<f64> {
        self.players.get(&key(player))?.career_strike_rate.mean()
    }

    pub fn career_balls(&self, player: &str) -> Option<f64> {
        self.players.get(&key(player))?.career_balls.mean()
    }

    pub fn mean_position(&self, player: &str) -> Option<f64> {
        self.players.get(&key(player))?.position.mean()
    }

    pub fn player_matches(&self, player: &str) -> u64 {
        self.players
            .get(&key(player))
            .map_or(0, |h| h.career_runs.count())
    }

    pub fn venue_runs(&self, venue: &str) -> Option<f64> {
        self.venues.get(&key(venue))?.runs.mean()
    }

    pub fn venue_strike_rate(&self, venue: &str) -> Option<f64> {
        self.venues.get(&key(venue))?.strike_rate.mean()
    }

    pub fn opponent_runs(&self, opponent: &str) -> Option<f64> {
        self.opponents.get(&key(opponent))?.runs.mean()
    }

    pub fn opponent_strike_rate(&self, opponent: &str) -> Option<f64> {
        self.opponents.get(&key(opponent))?.strike_rate.mean()
    }

    pub fn global_runs(&self) -> Option<f64> {
        self.global_runs.mean()
    }

    pub fn global_strike_rate(&self) -> Option<f64> {
        self.global_strike_rate.mean()
    }

    pub fn global_balls(&self) -> Option<f64> {
        self.global_balls.mean()
    }
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}
