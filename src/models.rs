//! Normalized records every adapter produces and the template builder consumes.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct EntryRecord {
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    /// Always an `https://` url.
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedRecord {
    pub source: &'static str,
    pub title: String,
    pub link: String,
    pub updated_at: DateTime<Utc>,
    pub entries: Vec<EntryRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRef {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Finished,
    Postponed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub match_id: u64,
    pub home_team: TeamRef,
    pub away_team: TeamRef,
    pub kickoff: DateTime<FixedOffset>,
    pub status: Option<MatchStatus>,
    pub score: Option<Score>,
}

impl MatchRecord {
    pub fn is_finished(&self) -> bool {
        self.status == Some(MatchStatus::Finished)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchDay {
    pub date: NaiveDate,
    pub matches: Vec<MatchRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchesByDate {
    pub competition_name: String,
    pub matchday: u32,
    pub days: Vec<MatchDay>,
}

impl MatchesByDate {
    /// Groups matches by local calendar date, days and kickoffs in order.
    pub fn group(competition_name: String, matchday: u32, mut matches: Vec<MatchRecord>) -> Self {
        matches.sort_by_key(|m| (m.kickoff, m.match_id));

        let mut days: Vec<MatchDay> = Vec::new();
        for m in matches {
            let date = m.kickoff.date_naive();
            match days.last_mut() {
                Some(day) if day.date == date => day.matches.push(m),
                _ => days.push(MatchDay { date, matches: vec![m] }),
            }
        }
        Self { competition_name, matchday, days }
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(|d| d.matches.is_empty())
    }

    pub fn match_count(&self) -> usize {
        self.days.iter().map(|d| d.matches.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingRow {
    pub position: u32,
    pub team_id: u32,
    pub team_name: String,
    pub played: u32,
    pub won: u32,
    pub draw: u32,
    pub lost: u32,
    pub goal_difference: i32,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StandingsTable {
    pub competition_name: String,
    pub rows: Vec<StandingRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub name: String,
    pub nationality_flag: String,
    pub position: String,
    pub age: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Roster {
    pub team_id: u32,
    pub team_name: String,
    pub crest_url: String,
    pub players: Vec<RosterEntry>,
}
