//! Command routing and dispatch: token → `Command` → adapters → `Reply`.

use crate::community::CommunityClient;
use crate::config::Config;
use crate::consts::{
    find_team_by_id, messages, League, Source, Team, LEAGUES, NEUTRAL_THEME, SOURCES, TEAMS,
};
use crate::error::{FetchError, UnknownCommand};
use crate::football::FootballData;
use crate::network::{build_client, NewsEngine};
use crate::template::{MatchKind, Reply, TemplateBuilder};
use chrono::Utc;
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;

/// Menu sections reachable through `go=<section>` postbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    News,
    Fixtures,
    Results,
    Standings,
    Teams,
}

impl Section {
    const ALL: [Section; 5] =
        [Section::News, Section::Fixtures, Section::Results, Section::Standings, Section::Teams];

    fn key(self) -> &'static str {
        match self {
            Section::News => "news",
            Section::Fixtures => "fixtures",
            Section::Results => "results",
            Section::Standings => "standings",
            Section::Teams => "teams",
        }
    }
}

/// A club either from the static table or by raw upstream id (e.g. a team
/// tapped in a fixture list that has no key of its own).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TeamTarget {
    Known(&'static Team),
    Id(u32),
}

impl TeamTarget {
    fn team_id(self) -> u32 {
        match self {
            TeamTarget::Known(team) => team.team_id,
            TeamTarget::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Help,
    AllNews,
    News(&'static Source),
    Results(&'static League),
    Fixtures(&'static League),
    Standings(&'static League),
    TeamNews(&'static Team),
    Team(TeamTarget),
    Go(Section),
}

/// Canonical `verb=param` token; also used as postback data.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Help => write!(f, "help"),
            Command::AllNews => write!(f, "allnews"),
            Command::News(source) => write!(f, "news={}", source.key),
            Command::Results(league) => write!(f, "results={}", league.key),
            Command::Fixtures(league) => write!(f, "fixtures={}", league.key),
            Command::Standings(league) => write!(f, "standings={}", league.key),
            Command::TeamNews(team) => write!(f, "teamnews={}", team.key),
            Command::Team(TeamTarget::Known(team)) => write!(f, "team={}", team.key),
            Command::Team(TeamTarget::Id(id)) => write!(f, "team={}", id),
            Command::Go(section) => write!(f, "go={}", section.key()),
        }
    }
}

/// Command routing table
pub mod routes {
    use super::*;
    use crate::consts::{find_league, find_source, find_team};

    /// Splits a token into `(verb, param)`. Accepts `verb=param`, `/verb param`,
    /// `/verb@botname param` and leading `@mentions`.
    fn split(input: &str) -> (String, Option<String>) {
        let text = input
            .split_whitespace()
            .filter(|t| !t.starts_with('@'))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let text = text.trim_start_matches('/');

        let (verb, param) = match text.split_once('=') {
            Some((verb, param)) => (verb, Some(param)),
            None => match text.split_once(' ') {
                Some((verb, param)) => (verb, Some(param)),
                None => (text, None),
            },
        };
        let verb = verb.split('@').next().unwrap_or_default().trim().to_string();
        let param = param.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        (verb, param)
    }

    /// Map a text command or postback payload to a `Command`.
    pub fn resolve_command(input: &str) -> Result<Command, UnknownCommand> {
        let unknown = || UnknownCommand(input.trim().to_string());
        let (verb, param) = split(input);
        let param = param.as_deref();

        let command = match (verb.as_str(), param) {
            ("help" | "start", None) => Command::Help,
            ("allnews", None) | ("news", Some("all")) => Command::AllNews,
            ("news", Some(key)) => Command::News(find_source(key).ok_or_else(unknown)?),
            ("results", Some(key)) => Command::Results(find_league(key).ok_or_else(unknown)?),
            ("fixtures", Some(key)) => Command::Fixtures(find_league(key).ok_or_else(unknown)?),
            ("standings", Some(key)) => Command::Standings(find_league(key).ok_or_else(unknown)?),
            ("teamnews", Some(key)) => Command::TeamNews(find_team(key).ok_or_else(unknown)?),
            ("team", Some(key)) => match find_team(key) {
                Some(team) => Command::Team(TeamTarget::Known(team)),
                None => {
                    let id: u32 = key.parse().map_err(|_| unknown())?;
                    match find_team_by_id(id) {
                        Some(team) => Command::Team(TeamTarget::Known(team)),
                        None => Command::Team(TeamTarget::Id(id)),
                    }
                }
            },
            ("go", Some(key)) => Command::Go(
                Section::ALL.into_iter().find(|s| s.key() == key).ok_or_else(unknown)?,
            ),
            _ => return Err(unknown()),
        };
        Ok(command)
    }
}

/// Help text listing every verb and the keys it accepts.
pub fn build_help_message() -> String {
    let keys = |items: Vec<&str>| items.join(", ");
    format!(
        "⚽ Kickoff Bot\n\n\
         Commands:\n\
         allnews — headlines from every source\n\
         news=<source> — one source ({sources})\n\
         fixtures=<league> — this matchday's fixtures\n\
         results=<league> — latest results\n\
         standings=<league> — league table\n\
         teamnews=<team> — club news\n\
         team=<team> — club squad\n\
         go=<section> — menu ({sections})\n\
         help — this message\n\n\
         Leagues: {leagues}\n\
         Teams: {teams}",
        sources = keys(SOURCES.iter().map(|s| s.key).collect()),
        sections = keys(Section::ALL.iter().map(|s| s.key()).collect()),
        leagues = keys(LEAGUES.iter().map(|l| l.key).collect()),
        teams = keys(TEAMS.iter().map(|t| t.key).collect()),
    )
}

/// Turns a dispatch outcome into the single reply the user gets.
pub fn reply_or_notice(command: Command, result: Result<Reply, FetchError>) -> Reply {
    match result {
        Ok(reply) => reply,
        Err(e) => {
            log::error!("`{}` failed: {}", command, e);
            Reply::Text(messages::FAILURE_NOTICE.to_string())
        }
    }
}

/// Everything a request needs, built once at startup and shared.
pub struct Services {
    pub config: Config,
    pub news: NewsEngine,
    pub football: FootballData,
    pub templates: TemplateBuilder,
}

impl Services {
    pub fn new(config: Config) -> Result<Arc<Self>, reqwest::Error> {
        let client = build_client(config.request_timeout)?;
        let community = CommunityClient::new(
            client.clone(),
            &config.community_api_url,
            config.community_api_key.clone(),
        );
        let football = FootballData::new(
            client.clone(),
            &config.football_data_url,
            config.football_data_token.clone(),
            config.utc_offset,
        );

        Ok(Arc::new(Self {
            news: NewsEngine::new(client, community),
            football,
            templates: TemplateBuilder::new(config.utc_offset),
            config,
        }))
    }

    /// Reply for raw user text or a postback payload. Never fails.
    pub async fn handle_text(&self, input: &str) -> Reply {
        match routes::resolve_command(input) {
            Ok(command) => self.respond(command).await,
            Err(e) => {
                log::info!("{}", e);
                Reply::Text(build_help_message())
            }
        }
    }

    pub async fn respond(&self, command: Command) -> Reply {
        log::info!("dispatching `{}`", command);
        reply_or_notice(command, self.execute(command).await)
    }

    pub async fn execute(&self, command: Command) -> Result<Reply, FetchError> {
        let limit = self.config.news_limit;
        let now = Utc::now();

        let reply = match command {
            Command::Help => Reply::Text(build_help_message()),
            Command::AllNews => self.all_news(limit).await?,
            Command::News(source) => {
                let feed = self.news.fetch(source, limit).await?;
                self.templates.news(&feed, source.theme, now)
            }
            Command::TeamNews(team) => {
                let feed = self.news.fetch_team_news(team, limit).await?;
                self.templates.news(&feed, team.theme, now)
            }
            Command::Fixtures(league) => {
                let matches = self.football.fixtures(league).await?;
                log::debug!("{}: {} fixtures on matchday {}", league.name, matches.match_count(), matches.matchday);
                self.templates.matches(&matches, league.theme, MatchKind::Fixtures)
            }
            Command::Results(league) => {
                let matches = self.football.results(league).await?;
                log::debug!("{}: {} results on matchday {}", league.name, matches.match_count(), matches.matchday);
                self.templates.matches(&matches, league.theme, MatchKind::Results)
            }
            Command::Standings(league) => {
                let table = self.football.standings(league).await?;
                self.templates.standings(&table, league.theme)
            }
            Command::Team(target) => {
                let roster = self.football.squad(target.team_id()).await?;
                let theme = match target {
                    TeamTarget::Known(team) => team.theme,
                    TeamTarget::Id(_) => NEUTRAL_THEME,
                };
                self.templates.roster(&roster, theme)
            }
            Command::Go(section) => self.menu(section),
        };
        Ok(reply)
    }

    /// Every source fetched concurrently. Sources that fail are logged and
    /// left out; only when all of them fail does the command fail.
    async fn all_news(&self, limit: usize) -> Result<Reply, FetchError> {
        let fetches = SOURCES
            .iter()
            .map(|source| async move { (source, self.news.fetch(source, limit).await) });
        let results = join_all(fetches).await;

        let mut feeds = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (source, result) in results {
            match result {
                Ok(feed) => feeds.push((feed, source.theme)),
                Err(e) => {
                    log::warn!("allnews: skipping {}: {}", source, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if feeds.is_empty() => Err(e),
            _ => Ok(self.templates.all_news(&feeds, Utc::now())),
        }
    }

    fn menu(&self, section: Section) -> Reply {
        let buttons: Vec<(String, String)> = match section {
            Section::News => std::iter::once(("All sources".to_string(), Command::AllNews.to_string()))
                .chain(SOURCES.iter().map(|s| (s.name.to_string(), Command::News(s).to_string())))
                .collect(),
            Section::Fixtures => league_buttons(Command::Fixtures),
            Section::Results => league_buttons(Command::Results),
            Section::Standings => league_buttons(Command::Standings),
            Section::Teams => TEAMS
                .iter()
                .flat_map(|t| {
                    [
                        (t.name.to_string(), Command::Team(TeamTarget::Known(t)).to_string()),
                        (format!("{} news", t.name), Command::TeamNews(t).to_string()),
                    ]
                })
                .collect(),
        };
        let title = match section {
            Section::News => "Football News",
            Section::Fixtures => "Fixtures",
            Section::Results => "Results",
            Section::Standings => "Standings",
            Section::Teams => "Teams",
        };
        self.templates.menu(title, "Tap to choose", &buttons, NEUTRAL_THEME)
    }
}

fn league_buttons(to_command: fn(&'static League) -> Command) -> Vec<(String, String)> {
    LEAGUES
        .iter()
        .map(|l| (l.name.to_string(), to_command(l).to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::routes::resolve_command;
    use super::*;
    use crate::consts::{find_league, find_source, find_team};
    use crate::template::{Action, Component};

    fn services() -> Arc<Services> {
        let config = Config::from_lookup(|k| match k {
            "TELOXIDE_TOKEN" => Some("123:abc".to_string()),
            "FOOTBALL_DATA_TOKEN" => Some("fd-token".to_string()),
            _ => None,
        })
        .unwrap();
        Services::new(config).unwrap()
    }

    #[test]
    fn parses_text_and_postback_forms() {
        let bbc = find_source("bbc-sport").unwrap();
        let pl = find_league("pl").unwrap();
        let arsenal = find_team("arsenal").unwrap();

        assert_eq!(resolve_command("news=bbc-sport"), Ok(Command::News(bbc)));
        assert_eq!(resolve_command("NEWS=BBC-Sport"), Ok(Command::News(bbc)));
        assert_eq!(resolve_command("/news bbc-sport"), Ok(Command::News(bbc)));
        assert_eq!(resolve_command("/news@kickoff_bot bbc-sport"), Ok(Command::News(bbc)));
        assert_eq!(resolve_command("@kickoff_bot fixtures=pl"), Ok(Command::Fixtures(pl)));
        assert_eq!(resolve_command("results=pl"), Ok(Command::Results(pl)));
        assert_eq!(resolve_command("standings = pl"), Ok(Command::Standings(pl)));
        assert_eq!(resolve_command("teamnews=arsenal"), Ok(Command::TeamNews(arsenal)));
        assert_eq!(resolve_command("allnews"), Ok(Command::AllNews));
        assert_eq!(resolve_command("news=all"), Ok(Command::AllNews));
        assert_eq!(resolve_command("/start"), Ok(Command::Help));
        assert_eq!(resolve_command("go=teams"), Ok(Command::Go(Section::Teams)));
    }

    #[test]
    fn team_accepts_keys_and_upstream_ids() {
        let arsenal = find_team("arsenal").unwrap();
        assert_eq!(resolve_command("team=arsenal"), Ok(Command::Team(TeamTarget::Known(arsenal))));
        assert_eq!(resolve_command("team=57"), Ok(Command::Team(TeamTarget::Known(arsenal))));
        assert_eq!(resolve_command("team=397"), Ok(Command::Team(TeamTarget::Id(397))));
        assert!(resolve_command("team=atlantis").is_err());
    }

    #[test]
    fn unknown_verbs_and_keys_are_rejected() {
        for input in ["@bot blah", "", "news", "news=cnn", "fixtures=mls", "teamnews=397", "go=nowhere", "help=me"] {
            assert!(resolve_command(input).is_err(), "{:?} should be unknown", input);
        }
        assert_eq!(resolve_command("@bot blah"), Err(UnknownCommand("@bot blah".to_string())));
    }

    #[test]
    fn help_lists_every_verb() {
        let help = build_help_message();
        for verb in ["allnews", "news=", "results=", "fixtures=", "teamnews=", "team=", "standings=", "go=", "help"] {
            assert!(help.contains(verb), "help is missing {}", verb);
        }
        assert!(help.contains("bbc-sport") && help.contains("calcio") && help.contains("realmadrid"));
    }

    #[test]
    fn failures_become_a_generic_notice() {
        let err = FetchError::unavailable("BBC Sport", "HTTP 503");
        let bbc = find_source("bbc-sport").unwrap();
        assert_eq!(
            reply_or_notice(Command::News(bbc), Err(err)),
            Reply::Text(messages::FAILURE_NOTICE.to_string())
        );
    }

    #[tokio::test]
    async fn unknown_command_replies_with_help() {
        assert_eq!(services().handle_text("@bot blah").await, Reply::Text(build_help_message()));
    }

    #[tokio::test]
    async fn menu_postbacks_all_resolve() {
        for section in Section::ALL {
            let reply = services().handle_text(&format!("go={}", section.key())).await;
            let Reply::Cards { carousel, .. } = reply else { panic!("menu should be cards") };
            let datas: Vec<String> = carousel.contents[0]
                .body
                .contents
                .iter()
                .filter_map(|c| match c {
                    Component::Button(b) => match &b.action {
                        Action::Postback { data, .. } => Some(data.clone()),
                        _ => None,
                    },
                    _ => None,
                })
                .collect();
            assert!(!datas.is_empty());
            for data in datas {
                assert!(resolve_command(&data).is_ok(), "{} from go={}", data, section.key());
            }
        }
    }
}
