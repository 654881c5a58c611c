//! CSV ingestion for the deliveries and matches files
//!
//! Rows are deserialized leniently: the public IPL dumps vary in column
//! naming across vintages, and numeric fields are occasionally blank.
//! Missing numerics default to zero; rows with an unparseable date are
//! dropped and counted.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::path::Path;

use crate::{DeliveryRecord, MatchInfo, Result};

/// Raw deliveries row as it appears on disk
#[derive(Debug, Deserialize)]
struct DeliveryRow {
    match_id: i64,
    #[serde(default)]
    inning: Option<u8>,
    batting_team: String,
    bowling_team: String,
    #[serde(default)]
    over: Option<u16>,
    #[serde(default)]
    ball: Option<u16>,
    #[serde(alias = "batsman")]
    batter: String,
    bowler: String,
    #[serde(default, alias = "batsman_runs")]
    batter_runs: Option<f64>,
    #[serde(default)]
    extra_runs: Option<f64>,
    #[serde(default, alias = "wide_runs")]
    wides: Option<f64>,
    #[serde(default, alias = "noball_runs")]
    noballs: Option<f64>,
    #[serde(default)]
    player_dismissed: Option<String>,
}

/// Raw matches row as it appears on disk
#[derive(Debug, Deserialize)]
struct MatchRow {
    id: i64,
    date: String,
    #[serde(default)]
    season: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    venue: Option<String>,
    team1: String,
    team2: String,
    #[serde(default)]
    winner: Option<String>,
}

/// Load and normalize the deliveries file
pub fn load_deliveries<P: AsRef<Path>>(path: P) -> Result<Vec<DeliveryRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path.as_ref())?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let row: DeliveryRow = row?;
        records.push(DeliveryRecord {
            match_id: row.match_id,
            inning: row.inning.unwrap_or(1),
            batting_team: row.batting_team,
            bowling_team: row.bowling_team,
            over: row.over.unwrap_or(0),
            ball: row.ball.unwrap_or(0),
            batter: row.batter,
            bowler: row.bowler,
            runs_off_bat: row.batter_runs.unwrap_or(0.0).max(0.0) as u32,
            extras: row.extra_runs.unwrap_or(0.0).max(0.0) as u32,
            is_wide: row.wides.unwrap_or(0.0) > 0.0,
            is_no_ball: row.noballs.unwrap_or(0.0) > 0.0,
            wicket: row
                .player_dismissed
                .as_deref()
                .map_or(false, |p| !p.trim().is_empty()),
        });
    }

    log::info!("Loaded {} delivery records", records.len());
    Ok(records)
}

/// Load and normalize the matches file
pub fn load_matches<P: AsRef<Path>>(path: P) -> Result<Vec<MatchInfo>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path.as_ref())?;

    let mut matches = Vec::new();
    let mut bad_dates = 0usize;
    for row in reader.deserialize() {
        let row: MatchRow = row?;
        let Some(date) = parse_date(&row.date) else {
            bad_dates += 1;
            continue;
        };

        let season = row
            .season
            .as_deref()
            .and_then(parse_season)
            .or(Some(date.year()));

        matches.push(MatchInfo {
            id: row.id,
            date,
            season,
            city: non_empty(row.city),
            venue: non_empty(row.venue),
            team1: row.team1,
            team2: row.team2,
            winner: non_empty(row.winner),
        });
    }

    if bad_dates > 0 {
        log::warn!("Dropped {} match rows with unparseable dates", bad_dates);
    }
    log::info!("Loaded {} match records", matches.len());
    Ok(matches)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Dates appear as ISO or day-first depending on dataset vintage
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}

/// Seasons appear as "2018" or "2007/08"; keep the leading year
fn parse_season(raw: &str) -> Option<i32> {
    raw.split('/').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let iso = parse_date("2024-04-12").unwrap();
        let day_first = parse_date("12/04/2024").unwrap();
        assert_eq!(iso, day_first);
        assert!(parse_date("not a date").is_none());
    }

    #[test]
    fn test_parse_season() {
        assert_eq!(parse_season("2018"), Some(2018));
        assert_eq!(parse_season("2007/08"), Some(2007));
        assert_eq!(parse_season("abc"), None);
    }
}
