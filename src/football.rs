//! football-data.org adapter: fixtures, results, standings and squads.

use crate::consts::{headers, images, League};
use crate::error::FetchError;
use crate::models::{
    MatchRecord, MatchStatus, MatchesByDate, Roster, RosterEntry, Score, StandingRow, StandingsTable,
    TeamRef,
};
use crate::network::{read_json, send};
use crate::utils::{age_on, flag_glyph, normalize_image_url, normalize_team_name};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompetitionResponse {
    current_season: Option<Season>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Season {
    current_matchday: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompetitionRef {
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct MatchesResponse {
    competition: Option<CompetitionRef>,
    matches: Vec<ApiMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMatch {
    id: u64,
    utc_date: DateTime<Utc>,
    status: Option<String>,
    home_team: ApiTeam,
    away_team: ApiTeam,
    score: Option<ApiScore>,
}

#[derive(Debug, Deserialize)]
struct ApiTeam {
    id: Option<u32>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiScore {
    full_time: Option<ApiGoals>,
}

#[derive(Debug, Deserialize)]
struct ApiGoals {
    home: Option<u32>,
    away: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StandingsResponse {
    competition: Option<CompetitionRef>,
    standings: Vec<ApiStanding>,
}

#[derive(Debug, Deserialize)]
struct ApiStanding {
    #[serde(rename = "type")]
    kind: String,
    table: Vec<ApiTableRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTableRow {
    position: u32,
    team: ApiTeam,
    played_games: u32,
    won: u32,
    draw: u32,
    lost: u32,
    points: u32,
    goal_difference: i32,
}

#[derive(Debug, Deserialize)]
pub struct TeamResponse {
    id: u32,
    name: String,
    crest: Option<String>,
    #[serde(default)]
    squad: Vec<ApiPlayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlayer {
    name: String,
    position: Option<String>,
    date_of_birth: Option<String>,
    nationality: Option<String>,
}

pub struct FootballData {
    client: Client,
    base_url: String,
    token: String,
    offset: FixedOffset,
}

impl FootballData {
    pub fn new(client: Client, base_url: &str, token: String, offset: FixedOffset) -> Self {
        Self { client, base_url: base_url.trim_end_matches('/').to_string(), token, offset }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        origin: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header(ACCEPT, headers::ACCEPT_JSON)
            .header(headers::FOOTBALL_DATA_AUTH, &self.token)
            .query(query);
        read_json(origin, send(origin, request).await?).await
    }

    /// Current round of the running season; `1` before the season has one.
    pub async fn current_matchday(&self, league: &League) -> Result<u32, FetchError> {
        let path = format!("/competitions/{}", league.competition_id);
        let body: CompetitionResponse = self.get(league.name, &path, &[]).await?;
        Ok(matchday_of(body))
    }

    async fn matchday(&self, league: &League, matchday: u32) -> Result<MatchesByDate, FetchError> {
        let path = format!("/competitions/{}/matches", league.competition_id);
        let body: MatchesResponse = self
            .get(league.name, &path, &[("matchday", matchday.to_string())])
            .await?;
        Ok(group_matches(body, league, matchday, self.offset))
    }

    /// Every match of the current matchday.
    pub async fn fixtures(&self, league: &League) -> Result<MatchesByDate, FetchError> {
        let matchday = self.current_matchday(league).await?;
        self.matchday(league, matchday).await
    }

    /// Finished matches of the current matchday, or of the previous one when
    /// none have been played yet.
    pub async fn results(&self, league: &League) -> Result<MatchesByDate, FetchError> {
        let matchday = self.current_matchday(league).await?;
        let current = finished_only(self.matchday(league, matchday).await?);
        match previous_matchday(&current) {
            Some(previous) => Ok(finished_only(self.matchday(league, previous).await?)),
            None => Ok(current),
        }
    }

    pub async fn standings(&self, league: &League) -> Result<StandingsTable, FetchError> {
        let path = format!("/competitions/{}/standings", league.competition_id);
        let body: StandingsResponse = self.get(league.name, &path, &[]).await?;
        Ok(to_standings(body, league))
    }

    pub async fn squad(&self, team_id: u32) -> Result<Roster, FetchError> {
        let origin = format!("team {}", team_id);
        let body: TeamResponse = self.get(&origin, &format!("/teams/{}", team_id), &[]).await?;
        Ok(to_roster(body, Utc::now().with_timezone(&self.offset).date_naive()))
    }
}

fn matchday_of(body: CompetitionResponse) -> u32 {
    body.current_season.and_then(|s| s.current_matchday).unwrap_or(1)
}

/// Matchday to show results from when the current one has none finished yet.
fn previous_matchday(current: &MatchesByDate) -> Option<u32> {
    (current.is_empty() && current.matchday > 1).then(|| current.matchday - 1)
}

fn parse_status(raw: Option<&str>) -> Option<MatchStatus> {
    match raw? {
        "SCHEDULED" | "TIMED" => Some(MatchStatus::Scheduled),
        "IN_PLAY" | "PAUSED" | "LIVE" => Some(MatchStatus::Live),
        "FINISHED" | "AWARDED" => Some(MatchStatus::Finished),
        "POSTPONED" | "SUSPENDED" => Some(MatchStatus::Postponed),
        "CANCELLED" => Some(MatchStatus::Cancelled),
        _ => None,
    }
}

fn to_team_ref(team: ApiTeam) -> TeamRef {
    TeamRef {
        id: team.id.unwrap_or(0),
        name: team
            .name
            .map(|n| normalize_team_name(&n))
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "TBD".to_string()),
    }
}

fn to_match(api: ApiMatch, offset: FixedOffset) -> MatchRecord {
    let score = api
        .score
        .and_then(|s| s.full_time)
        .and_then(|g| Some(Score { home: g.home?, away: g.away? }));
    MatchRecord {
        match_id: api.id,
        home_team: to_team_ref(api.home_team),
        away_team: to_team_ref(api.away_team),
        kickoff: api.utc_date.with_timezone(&offset),
        status: parse_status(api.status.as_deref()),
        score,
    }
}

pub fn group_matches(
    body: MatchesResponse,
    league: &League,
    matchday: u32,
    offset: FixedOffset,
) -> MatchesByDate {
    let competition_name = body
        .competition
        .map(|c| c.name)
        .unwrap_or_else(|| league.name.to_string());
    let matches = body.matches.into_iter().map(|m| to_match(m, offset)).collect();
    MatchesByDate::group(competition_name, matchday, matches)
}

fn finished_only(mut grouped: MatchesByDate) -> MatchesByDate {
    for day in &mut grouped.days {
        day.matches.retain(MatchRecord::is_finished);
    }
    grouped.days.retain(|d| !d.matches.is_empty());
    grouped
}

pub fn to_standings(body: StandingsResponse, league: &League) -> StandingsTable {
    let competition_name = body
        .competition
        .map(|c| c.name)
        .unwrap_or_else(|| league.name.to_string());

    let table = body
        .standings
        .into_iter()
        .find(|s| s.kind == "TOTAL")
        .map(|s| s.table)
        .unwrap_or_default();

    let mut rows: Vec<StandingRow> = table
        .into_iter()
        .map(|row| {
            let team = to_team_ref(row.team);
            StandingRow {
                position: row.position,
                team_id: team.id,
                team_name: team.name,
                played: row.played_games,
                won: row.won,
                draw: row.draw,
                lost: row.lost,
                goal_difference: row.goal_difference,
                points: row.points,
            }
        })
        .collect();
    rows.sort_by_key(|r| r.position);

    StandingsTable { competition_name, rows }
}

/// Collapses the API's fine-grained positions into four labels plus a rank.
fn position_label(raw: Option<&str>) -> (u8, String) {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return (4, "Squad".to_string());
    };
    let lower = raw.to_lowercase();
    if lower.contains("goal") {
        (0, "Goalkeeper".to_string())
    } else if lower.contains("mid") {
        (2, "Midfielder".to_string())
    } else if lower.contains("def") || lower.contains("back") {
        (1, "Defender".to_string())
    } else if ["off", "att", "forward", "wing", "striker"].iter().any(|k| lower.contains(k)) {
        (3, "Forward".to_string())
    } else {
        (4, raw.trim().to_string())
    }
}

pub fn to_roster(body: TeamResponse, today: NaiveDate) -> Roster {
    let mut ranked: Vec<(u8, RosterEntry)> = body
        .squad
        .into_iter()
        .map(|p| {
            let (rank, position) = position_label(p.position.as_deref());
            let age = p
                .date_of_birth
                .as_deref()
                .and_then(|raw| raw.get(..10))
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .and_then(|born| age_on(born, today));
            let entry = RosterEntry {
                name: p.name,
                nationality_flag: flag_glyph(p.nationality.as_deref().unwrap_or_default()),
                position,
                age,
            };
            (rank, entry)
        })
        .collect();
    ranked.sort_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| a.name.cmp(&b.name)));

    Roster {
        team_id: body.id,
        team_name: normalize_team_name(&body.name),
        crest_url: normalize_image_url(body.crest.as_deref(), images::DEFAULT_CREST),
        players: ranked.into_iter().map(|(_, entry)| entry).collect(),
    }
}
