//! Feature engineering engine
//!
//! One routine computes a feature row from aggregate state; the training
//! pass calls it per match over an index that holds strictly prior history,
//! and serving calls it over the fully-folded index. Training and serving
//! therefore cannot drift apart: there is no second implementation to
//! drift.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::features::encoding::{CategoryEncoder, EncodingTables};
use crate::features::history::HistoryIndex;
use crate::features::schema::FeatureSchema;
use crate::PlayerMatchStat;

/// Rolling-form window size; slot names encode it
pub const FORM_WINDOW: usize = 5;

/// Middle-order default when a player has no recorded innings
const DEFAULT_BATTING_POSITION: f64 = 6.0;

/// One labeled training example
#[derive(Debug, Clone)]
pub struct LabeledRow {
    pub features: Vec<f64>,
    /// Label: runs scored in this match
    pub runs: f64,
    /// Label: strike rate achieved in this match
    pub strike_rate: f64,
    pub match_id: i64,
    pub player: String,
}

/// Corpus-derived state that is fixed after construction: the schema, the
/// encoding tables, and each team's designated home venue.
#[derive(Debug, Clone)]
struct StaticContext {
    schema: FeatureSchema,
    tables: EncodingTables,
    /// team (normalized) -> its most frequent venue (normalized)
    home_venues: HashMap<String, String>,
}

/// The feature engineering engine: static context plus the historical
/// aggregate index it serves queries from.
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    ctx: StaticContext,
    index: HistoryIndex,
}

impl FeatureEngine {
    /// Build the engine over a chronologically sorted corpus, emitting the
    /// labeled training rows along the way. Each row is computed before its
    /// match is folded into the index, so rolling and venue/opponent
    /// aggregates see strictly prior matches only.
    pub fn fit(stats: &[PlayerMatchStat]) -> (FeatureEngine, Vec<LabeledRow>) {
        let ctx = StaticContext::from_corpus(stats);
        let mut index = HistoryIndex::new(FORM_WINDOW);
        let mut rows = Vec::with_capacity(stats.len());

        for stat in stats {
            let features = compute_features(
                &ctx,
                &index,
                &stat.player,
                &stat.team,
                &stat.opponent,
                &stat.venue,
            );
            rows.push(LabeledRow {
                features,
                runs: stat.runs,
                strike_rate: stat.strike_rate,
                match_id: stat.match_id,
                player: stat.player.clone(),
            });
            index.fold(stat);
        }

        log::info!(
            "Computed {} feature rows ({} players, {} teams, {} venues)",
            rows.len(),
            ctx.tables.players.len(),
            ctx.tables.teams.len(),
            ctx.tables.venues.len(),
        );

        (FeatureEngine { ctx, index }, rows)
    }

    /// Compute the feature row for a hypothetical future fixture, using all
    /// known history. Unknown identities encode as the reserved code and
    /// fall back to global-mean aggregates. Overrides replace the computed
    /// value for any numeric slot; unknown keys are ignored.
    pub fn query_features(
        &self,
        player: &str,
        team: &str,
        opponent: &str,
        venue: &str,
        overrides: &BTreeMap<String, f64>,
    ) -> Vec<f64> {
        let mut row = compute_features(&self.ctx, &self.index, player, team, opponent, venue);

        for (name, value) in overrides {
            if self.ctx.schema.is_overridable(name) {
                if let Some(slot) = self.ctx.schema.slot_index(name) {
                    row[slot] = *value;
                }
            } else {
                log::debug!("Ignoring override for unknown or categorical slot '{}'", name);
            }
        }

        row
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.ctx.schema
    }

    pub fn schema_version(&self) -> &str {
        self.ctx.schema.version()
    }

    /// Career match count for a player (0 when unknown)
    pub fn player_matches(&self, player: &str) -> u64 {
        self.index.player_matches(player)
    }
}

impl StaticContext {
    fn from_corpus(stats: &[PlayerMatchStat]) -> Self {
        let tables = EncodingTables {
            players: CategoryEncoder::fit(stats.iter().map(|s| s.player.as_str())),
            teams: CategoryEncoder::fit(
                stats
                    .iter()
                    .map(|s| s.team.as_str())
                    .chain(stats.iter().map(|s| s.opponent.as_str())),
            ),
            venues: CategoryEncoder::fit(stats.iter().map(|s| s.venue.as_str())),
        };

        StaticContext {
            schema: FeatureSchema::batting(),
            tables,
            home_venues: designated_home_venues(stats),
        }
    }
}

/// The single shared row computation. Everything either training or serving
/// knows about a fixture flows through here.
fn compute_features(
    ctx: &StaticContext,
    index: &HistoryIndex,
    player: &str,
    team: &str,
    opponent: &str,
    venue: &str,
) -> Vec<f64> {
    let form = index.form(player);

    // Fallback ladder: form window, then career mean, then global mean,
    // then zero on a completely empty corpus.
    let runs_last_5 = form
        .runs_avg
        .or_else(|| index.career_runs(player))
        .or_else(|| index.global_runs())
        .unwrap_or(0.0);
    let strike_rate_last_5 = form
        .strike_rate_avg
        .or_else(|| index.career_strike_rate(player))
        .or_else(|| index.global_strike_rate())
        .unwrap_or(0.0);
    let balls_faced_last_5 = form
        .balls_avg
        .or_else(|| index.career_balls(player))
        .or_else(|| index.global_balls())
        .unwrap_or(0.0);

    let venue_avg_runs = index
        .venue_runs(venue)
        .or_else(|| index.global_runs())
        .unwrap_or(0.0);
    let venue_avg_strike_rate = index
        .venue_strike_rate(venue)
        .or_else(|| index.global_strike_rate())
        .unwrap_or(0.0);
    let opponent_avg_runs = index
        .opponent_runs(opponent)
        .or_else(|| index.global_runs())
        .unwrap_or(0.0);
    let opponent_avg_strike_rate = index
        .opponent_strike_rate(opponent)
        .or_else(|| index.global_strike_rate())
        .unwrap_or(0.0);

    let is_home = ctx
        .home_venues
        .get(&normalize(team))
        .map_or(0.0, |home| if *home == normalize(venue) { 1.0 } else { 0.0 });

    let batting_position = index
        .mean_position(player)
        .unwrap_or(DEFAULT_BATTING_POSITION);

    // Order matches FeatureSchema::batting()
    let row = vec![
        ctx.tables.players.encode(player) as f64,
        ctx.tables.teams.encode(team) as f64,
        ctx.tables.teams.encode(opponent) as f64,
        ctx.tables.venues.encode(venue) as f64,
        runs_last_5,
        strike_rate_last_5,
        balls_faced_last_5,
        venue_avg_runs,
        venue_avg_strike_rate,
        opponent_avg_runs,
        opponent_avg_strike_rate,
        is_home,
        batting_position,
    ];
    debug_assert_eq!(row.len(), ctx.schema.len());
    row
}

/// Each team's most frequent venue, counting a venue once per match
fn designated_home_venues(stats: &[PlayerMatchStat]) -> HashMap<String, String> {
    let mut counts: HashMap<String, HashMap<String, usize>> = HashMap::new();
    let mut seen: HashSet<(i64, String)> = HashSet::new();

    for stat in stats {
        let team = normalize(&stat.team);
        if !seen.insert((stat.match_id, team.clone())) {
            continue;
        }
        *counts
            .entry(team)
            .or_default()
            .entry(normalize(&stat.venue))
            .or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter_map(|(team, venues)| {
            venues
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
                .map(|(venue, _)| (team, venue))
        })
        .collect()
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::schema::{
        BATTING_POSITION, IS_HOME, OPPONENT_AVG_RUNS, PLAYER_CODE, RUNS_LAST_5_AVG,
        STRIKE_RATE_LAST_5, VENUE_AVG_RUNS,
    };
    use chrono::NaiveDate;

    fn make_stat(
        match_id: i64,
        day: u32,
        player: &str,
        team: &str,
        opponent: &str,
        venue: &str,
        runs: f64,
    ) -> PlayerMatchStat {
        PlayerMatchStat {
            match_id,
            player: player.to_string(),
            team: team.to_string(),
            opponent: opponent.to_string(),
            venue: venue.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 4, day).unwrap(),
            runs,
            balls_faced: 20,
            strike_rate: runs * 5.0,
            batting_position: 3,
        }
    }

    fn sample_corpus() -> Vec<PlayerMatchStat> {
        vec![
            make_stat(1, 1, "A", "Alpha", "Beta", "Home Ground", 10.0),
            make_stat(1, 1, "B", "Beta", "Alpha", "Home Ground", 40.0),
            make_stat(2, 2, "A", "Alpha", "Beta", "Home Ground", 20.0),
            make_stat(3, 3, "A", "Alpha", "Beta", "Away Ground", 30.0),
            make_stat(4, 4, "A", "Alpha", "Beta", "Home Ground", 40.0),
        ]
    }

    fn slot(engine: &FeatureEngine, name: &str) -> usize {
        engine.schema().slot_index(name).unwrap()
    }

    #[test]
    fn test_training_rows_use_prior_history_only() {
        let corpus = sample_corpus();
        let (engine, rows) = FeatureEngine::fit(&corpus);
        let runs_slot = slot(&engine, RUNS_LAST_5_AVG);

        // First ever row: empty corpus, falls through the ladder to 0
        assert_eq!(rows[0].features[runs_slot], 0.0);
        // A's third innings (row index 3): prior runs 10 and 20
        assert_eq!(rows[3].features[runs_slot], 15.0);
        // A's fourth innings: prior runs 10, 20, 30
        assert_eq!(rows[4].features[runs_slot], 20.0);
    }

    #[test]
    fn test_feature_parity_between_training_and_query() {
        let corpus = sample_corpus();
        let (_, rows) = FeatureEngine::fit(&corpus);

        // Training row for A's fourth innings sees exactly matches 1-3;
        // a query engine built over that prefix must agree slot for slot.
        let (prefix_engine, _) = FeatureEngine::fit(&corpus[..4]);
        let queried = prefix_engine.query_features(
            "A",
            "Alpha",
            "Beta",
            "Home Ground",
            &BTreeMap::new(),
        );

        assert_eq!(rows[4].features, queried);
    }

    #[test]
    fn test_rolling_fallback_ladder() {
        let corpus = sample_corpus();
        let (engine, _) = FeatureEngine::fit(&corpus);
        let runs_slot = slot(&engine, RUNS_LAST_5_AVG);

        // Known player: form window mean
        let known = engine.query_features("A", "Alpha", "Beta", "Home Ground", &BTreeMap::new());
        assert_eq!(known[runs_slot], 25.0); // (10+20+30+40)/4

        // Unknown player: global mean, never undefined
        let unknown =
            engine.query_features("Nobody", "Alpha", "Beta", "Home Ground", &BTreeMap::new());
        assert_eq!(unknown[runs_slot], 28.0); // (10+40+20+30+40)/5
        assert_eq!(unknown[slot(&engine, PLAYER_CODE)], 0.0);
        assert_eq!(
            unknown[slot(&engine, BATTING_POSITION)],
            DEFAULT_BATTING_POSITION
        );
    }

    #[test]
    fn test_unknown_venue_and_opponent_fall_back_to_global() {
        let corpus = sample_corpus();
        let (engine, _) = FeatureEngine::fit(&corpus);

        let row = engine.query_features("A", "Alpha", "Unseen", "Nowhere", &BTreeMap::new());
        assert_eq!(row[slot(&engine, VENUE_AVG_RUNS)], 28.0);
        assert_eq!(row[slot(&engine, OPPONENT_AVG_RUNS)], 28.0);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let corpus = sample_corpus();
        let (engine, _) = FeatureEngine::fit(&corpus);

        let mut overrides = BTreeMap::new();
        overrides.insert(RUNS_LAST_5_AVG.to_string(), 99.0);
        overrides.insert("player_code".to_string(), 42.0); // categorical: ignored
        overrides.insert("no_such_slot".to_string(), 1.0); // unknown: ignored

        let row = engine.query_features("A", "Alpha", "Beta", "Home Ground", &overrides);
        assert_eq!(row[slot(&engine, RUNS_LAST_5_AVG)], 99.0);
        assert_ne!(row[slot(&engine, PLAYER_CODE)], 42.0);
    }

    #[test]
    fn test_home_indicator() {
        let corpus = sample_corpus();
        let (engine, _) = FeatureEngine::fit(&corpus);
        let home_slot = slot(&engine, IS_HOME);

        // Alpha's most frequent venue is Home Ground
        let home = engine.query_features("A", "Alpha", "Beta", "Home Ground", &BTreeMap::new());
        let away = engine.query_features("A", "Alpha", "Beta", "Away Ground", &BTreeMap::new());
        assert_eq!(home[home_slot], 1.0);
        assert_eq!(away[home_slot], 0.0);
    }

    #[test]
    fn test_strike_rate_form_tracks_window() {
        let corpus = sample_corpus();
        let (engine, _) = FeatureEngine::fit(&corpus);
        let sr_slot = slot(&engine, STRIKE_RATE_LAST_5);

        let row = engine.query_features("A", "Alpha", "Beta", "Home Ground", &BTreeMap::new());
        // Strike rates were runs*5: (50+100+150+200)/4
        assert_eq!(row[sr_slot], 125.0);
    }
}
