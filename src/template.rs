//! Card templates: a small flex-style component tree (bubble / carousel) and
//! the builders that turn normalized records into it.

use crate::consts::{find_team_by_id, limits, messages, Theme};
use crate::models::{FeedRecord, MatchRecord, MatchStatus, MatchesByDate, Roster, StandingsTable, TeamRef};
use crate::utils::{format_stamp, relative_time, truncate_text};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Uri { label: String, uri: String },
    Postback { label: String, data: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Component {
    Box(BoxComponent),
    Text(TextComponent),
    Image(ImageComponent),
    Button(ButtonComponent),
    Separator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxComponent {
    pub layout: Layout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spacing: Option<&'static str>,
    pub contents: Vec<Component>,
}

impl BoxComponent {
    pub fn new(layout: Layout, contents: Vec<Component>) -> Self {
        Self { layout, spacing: Some("sm"), contents }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextComponent {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flex: Option<u8>,
    pub wrap: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl TextComponent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: None,
            weight: None,
            color: None,
            align: None,
            flex: None,
            wrap: false,
            action: None,
        }
    }

    pub fn size(mut self, size: &'static str) -> Self { self.size = Some(size); self }
    pub fn bold(mut self) -> Self { self.weight = Some("bold"); self }
    pub fn color(mut self, color: &'static str) -> Self { self.color = Some(color); self }
    pub fn align(mut self, align: &'static str) -> Self { self.align = Some(align); self }
    pub fn flex(mut self, flex: u8) -> Self { self.flex = Some(flex); self }
    pub fn wrap(mut self) -> Self { self.wrap = true; self }
    pub fn action(mut self, action: Option<Action>) -> Self { self.action = action; self }

    pub fn into_component(self) -> Component {
        Component::Text(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageComponent {
    pub url: String,
    pub aspect_mode: &'static str,
    pub aspect_ratio: &'static str,
    pub size: &'static str,
    pub flex: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ButtonComponent {
    pub style: &'static str,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStyle {
    pub background_color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BubbleStyles {
    pub header: BlockStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "bubble")]
pub struct Bubble {
    pub styles: BubbleStyles,
    pub header: BoxComponent,
    pub body: BoxComponent,
}

impl Bubble {
    fn new(theme: Theme, header: Vec<Component>, body: Vec<Component>) -> Self {
        Self {
            styles: BubbleStyles { header: BlockStyle { background_color: theme.header_bg } },
            header: BoxComponent::new(Layout::Vertical, header),
            body: BoxComponent::new(Layout::Vertical, body),
        }
    }

    /// Tappable rows of the body, separators and buttons excluded.
    pub fn rows(&self) -> impl Iterator<Item = &BoxComponent> {
        self.body.contents.iter().filter_map(|c| match c {
            Component::Box(b) => Some(b),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "carousel")]
pub struct Carousel {
    pub contents: Vec<Bubble>,
}

/// Exactly one of these goes out per handled command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Cards { alt_text: String, carousel: Carousel },
}

impl Reply {
    fn cards(alt_text: &str, bubbles: Vec<Bubble>) -> Self {
        Reply::Cards { alt_text: alt_text.to_string(), carousel: Carousel { contents: bubbles } }
    }
}

/// Which kind of match list is being rendered; drives header and empty notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Fixtures,
    Results,
}

impl MatchKind {
    fn label(self) -> &'static str {
        match self {
            MatchKind::Fixtures => "Fixtures",
            MatchKind::Results => "Results",
        }
    }
}

/// Postback that opens a club's detail view.
pub fn team_postback(team: &TeamRef) -> Option<Action> {
    let data = match find_team_by_id(team.id) {
        Some(known) => format!("team={}", known.key),
        None if team.id != 0 => format!("team={}", team.id),
        None => return None,
    };
    Some(Action::Postback { label: team.name.clone(), data })
}

fn separated(rows: Vec<BoxComponent>) -> Vec<Component> {
    let mut out = Vec::with_capacity(rows.len() * 2);
    for (i, row) in rows.into_iter().enumerate() {
        if i > 0 {
            out.push(Component::Separator);
        }
        out.push(Component::Box(row));
    }
    out
}

fn page_suffix(index: usize, total: usize) -> String {
    if total > 1 { format!(" ({}/{})", index + 1, total) } else { String::new() }
}

pub struct TemplateBuilder {
    offset: FixedOffset,
}

impl TemplateBuilder {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    fn header(&self, theme: Theme, title: &str, title_action: Option<Action>, lines: &[String]) -> Vec<Component> {
        let mut header = vec![TextComponent::new(title)
            .bold()
            .size("sm")
            .color(theme.header_text)
            .wrap()
            .action(title_action)
            .into_component()];
        header.extend(
            lines
                .iter()
                .map(|l| TextComponent::new(l.clone()).size("xxs").color(theme.header_text).into_component()),
        );
        header
    }

    pub fn news_bubble(&self, feed: &FeedRecord, theme: Theme, now: DateTime<Utc>) -> Bubble {
        let update_line = format!(
            "{}: {} ({})",
            messages::UPDATE_PREFIX,
            format_stamp(feed.updated_at, self.offset),
            relative_time(feed.updated_at, now)
        );
        let title_action = Some(Action::Uri { label: feed.title.clone(), uri: feed.link.clone() });
        let header = self.header(theme, &feed.title, title_action, &[update_line]);

        let rows = feed
            .entries
            .iter()
            .map(|entry| {
                let open = Action::Uri { label: entry.title.clone(), uri: entry.link.clone() };
                BoxComponent::new(
                    Layout::Horizontal,
                    vec![
                        Component::Image(ImageComponent {
                            url: entry.image_url.clone(),
                            aspect_mode: "cover",
                            aspect_ratio: "4:3",
                            size: "md",
                            flex: 1,
                            action: Some(open.clone()),
                        }),
                        TextComponent::new(truncate_text(&entry.title, limits::MAX_TITLE_CHARS))
                            .size("xxs")
                            .wrap()
                            .flex(2)
                            .action(Some(open))
                            .into_component(),
                    ],
                )
            })
            .collect();

        Bubble::new(theme, header, separated(rows))
    }

    pub fn news(&self, feed: &FeedRecord, theme: Theme, now: DateTime<Utc>) -> Reply {
        if feed.entries.is_empty() {
            return Reply::Text(format!("No News From {}", feed.title));
        }
        Reply::cards("News", vec![self.news_bubble(feed, theme, now)])
    }

    /// One bubble per feed, in the order given; empty feeds are skipped.
    pub fn all_news(&self, feeds: &[(FeedRecord, Theme)], now: DateTime<Utc>) -> Reply {
        let bubbles: Vec<Bubble> = feeds
            .iter()
            .filter(|(feed, _)| !feed.entries.is_empty())
            .map(|(feed, theme)| self.news_bubble(feed, *theme, now))
            .collect();
        if bubbles.is_empty() {
            return Reply::Text("No News Found".to_string());
        }
        Reply::cards("AllNews", bubbles)
    }

    fn match_row(&self, m: &MatchRecord) -> BoxComponent {
        let middle = match (m.status, m.score) {
            (Some(MatchStatus::Finished | MatchStatus::Live), Some(score)) => {
                format!("{} - {}", score.home, score.away)
            }
            (Some(MatchStatus::Postponed), _) => "PP".to_string(),
            (Some(MatchStatus::Cancelled), _) => "CANC".to_string(),
            _ => m.kickoff.format("%H:%M").to_string(),
        };
        BoxComponent::new(
            Layout::Horizontal,
            vec![
                TextComponent::new(m.home_team.name.clone())
                    .size("xs")
                    .align("end")
                    .flex(3)
                    .wrap()
                    .action(team_postback(&m.home_team))
                    .into_component(),
                TextComponent::new(middle).size("xs").bold().align("center").flex(2).into_component(),
                TextComponent::new(m.away_team.name.clone())
                    .size("xs")
                    .align("start")
                    .flex(3)
                    .wrap()
                    .action(team_postback(&m.away_team))
                    .into_component(),
            ],
        )
    }

    pub fn matches(&self, matches: &MatchesByDate, theme: Theme, kind: MatchKind) -> Reply {
        if matches.is_empty() {
            return Reply::Text(format!("No {} In MatchDay {}", kind.label(), matches.matchday));
        }

        let mut bubbles = Vec::new();
        for day in &matches.days {
            let pages: Vec<&[MatchRecord]> = day.matches.chunks(limits::ROWS_PER_CARD).collect();
            for (i, page) in pages.iter().enumerate() {
                let lines = [
                    format!("{} · MatchDay {}", kind.label(), matches.matchday),
                    format!("{}{}", day.date.format("%A %d %B %Y"), page_suffix(i, pages.len())),
                ];
                let header = self.header(theme, &matches.competition_name, None, &lines);
                let rows = page.iter().map(|m| self.match_row(m)).collect();
                bubbles.push(Bubble::new(theme, header, separated(rows)));
            }
        }
        Reply::cards(kind.label(), bubbles)
    }

    pub fn standings(&self, table: &StandingsTable, theme: Theme) -> Reply {
        if table.rows.is_empty() {
            return Reply::Text(format!("No Standings For {}", table.competition_name));
        }

        let bubbles = table
            .rows
            .chunks(limits::ROWS_PER_CARD)
            .map(|page| {
                let first = page.first().map(|r| r.position).unwrap_or_default();
                let last = page.last().map(|r| r.position).unwrap_or_default();
                let lines = [
                    format!("Standings {}-{}", first, last),
                    "#  Team  P  W  D  L  GD  Pts".to_string(),
                ];
                let header = self.header(theme, &table.competition_name, None, &lines);
                let rows = page
                    .iter()
                    .map(|r| {
                        let team = TeamRef { id: r.team_id, name: r.team_name.clone() };
                        let cell = |v: String| TextComponent::new(v).size("xxs").align("end").flex(1).into_component();
                        BoxComponent::new(
                            Layout::Horizontal,
                            vec![
                                cell(r.position.to_string()),
                                TextComponent::new(r.team_name.clone())
                                    .size("xxs")
                                    .flex(5)
                                    .action(team_postback(&team))
                                    .into_component(),
                                cell(r.played.to_string()),
                                cell(r.won.to_string()),
                                cell(r.draw.to_string()),
                                cell(r.lost.to_string()),
                                cell(format!("{:+}", r.goal_difference)),
                                TextComponent::new(r.points.to_string())
                                    .size("xxs")
                                    .bold()
                                    .align("end")
                                    .flex(1)
                                    .into_component(),
                            ],
                        )
                    })
                    .collect();
                Bubble::new(theme, header, separated(rows))
            })
            .collect();
        Reply::cards("Standings", bubbles)
    }

    pub fn roster(&self, roster: &Roster, theme: Theme) -> Reply {
        if roster.players.is_empty() {
            return Reply::Text(format!("No Players Found For {}", roster.team_name));
        }

        let pages: Vec<_> = roster.players.chunks(limits::ROWS_PER_CARD).collect();
        let bubbles = pages
            .iter()
            .enumerate()
            .map(|(i, page)| {
                let lines = [format!("Squad{}", page_suffix(i, pages.len()))];
                let crest = Some(Action::Uri { label: roster.team_name.clone(), uri: roster.crest_url.clone() });
                let header = self.header(theme, &roster.team_name, crest, &lines);
                let rows = page
                    .iter()
                    .map(|p| {
                        BoxComponent::new(
                            Layout::Horizontal,
                            vec![
                                TextComponent::new(p.nationality_flag.clone()).size("xs").flex(1).into_component(),
                                TextComponent::new(p.name.clone()).size("xs").flex(5).wrap().into_component(),
                                TextComponent::new(p.position.clone()).size("xxs").flex(3).into_component(),
                                TextComponent::new(p.age.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string()))
                                    .size("xxs")
                                    .align("end")
                                    .flex(1)
                                    .into_component(),
                            ],
                        )
                    })
                    .collect();
                Bubble::new(theme, header, separated(rows))
            })
            .collect();
        Reply::cards("Team", bubbles)
    }

    /// A bubble of postback buttons, `(label, data)` each.
    pub fn menu(&self, title: &str, subtitle: &str, buttons: &[(String, String)], theme: Theme) -> Reply {
        let header = self.header(theme, title, None, &[subtitle.to_string()]);
        let body = buttons
            .iter()
            .map(|(label, data)| {
                Component::Button(ButtonComponent {
                    style: "link",
                    action: Action::Postback { label: label.clone(), data: data.clone() },
                })
            })
            .collect();
        Reply::cards(title, vec![Bubble::new(theme, header, body)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{find_source, NEUTRAL_THEME};
    use crate::models::{EntryRecord, MatchDay, RosterEntry, Score, StandingRow};
    use chrono::{NaiveDate, TimeZone};

    fn builder() -> TemplateBuilder {
        TemplateBuilder::new(FixedOffset::east_opt(7 * 3600).unwrap())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn feed(entries: usize) -> FeedRecord {
        FeedRecord {
            source: "bbc-sport",
            title: "BBC Sport - Football".into(),
            link: "https://www.bbc.co.uk/sport/football".into(),
            updated_at: now() - chrono::Duration::minutes(25),
            entries: (0..entries)
                .map(|i| EntryRecord {
                    title: format!("Story {}", i),
                    link: format!("https://www.bbc.co.uk/sport/football/{}", i),
                    published_at: now() - chrono::Duration::hours(i as i64),
                    image_url: format!("https://ichef.bbci.co.uk/{}.jpg", i),
                })
                .collect(),
        }
    }

    fn bubbles(reply: &Reply) -> &[Bubble] {
        match reply {
            Reply::Cards { carousel, .. } => &carousel.contents,
            Reply::Text(t) => panic!("expected cards, got text {:?}", t),
        }
    }

    fn header_texts(bubble: &Bubble) -> Vec<&str> {
        bubble
            .header
            .contents
            .iter()
            .filter_map(|c| match c {
                Component::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn news_bubble_has_one_row_per_entry_and_stamped_header() {
        let theme = find_source("bbc-sport").unwrap().theme;
        let reply = builder().news(&feed(5), theme, now());
        let cards = bubbles(&reply);

        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].rows().count(), 5);
        assert_eq!(cards[0].styles.header.background_color, "#FEE63E");

        let header = header_texts(&cards[0]);
        assert_eq!(header[0], "BBC Sport - Football");
        assert_eq!(header[1], "Update: 19 Oct 2026 18:35:00 (25 min ago)");
    }

    #[test]
    fn news_rows_link_image_and_title() {
        let reply = builder().news(&feed(1), NEUTRAL_THEME, now());
        let row = bubbles(&reply)[0].rows().next().unwrap();
        let expected = Some(Action::Uri {
            label: "Story 0".into(),
            uri: "https://www.bbc.co.uk/sport/football/0".into(),
        });

        match (&row.contents[0], &row.contents[1]) {
            (Component::Image(img), Component::Text(text)) => {
                assert_eq!(img.action, expected);
                assert_eq!(text.action, expected);
                assert_eq!(text.text, "Story 0");
            }
            other => panic!("unexpected row layout {:?}", other),
        }
    }

    #[test]
    fn empty_feed_renders_notice() {
        assert_eq!(
            builder().news(&feed(0), NEUTRAL_THEME, now()),
            Reply::Text("No News From BBC Sport - Football".into())
        );
    }

    #[test]
    fn bubble_serializes_to_flex_shape() {
        let reply = builder().news(&feed(2), NEUTRAL_THEME, now());
        let json = serde_json::to_value(&bubbles(&reply)[0]).unwrap();

        assert_eq!(json["type"], "bubble");
        assert_eq!(json["styles"]["header"]["backgroundColor"], "#1A1A1A");
        assert_eq!(json["body"]["contents"][0]["type"], "box");
        assert_eq!(json["body"]["contents"][1]["type"], "separator");
        assert_eq!(json["body"]["contents"][0]["contents"][0]["aspectRatio"], "4:3");
        assert_eq!(json["body"]["contents"][0]["contents"][1]["action"]["type"], "uri");
    }

    fn fixture(id: u64, home: (u32, &str), away: (u32, &str), hour: u32, score: Option<Score>) -> MatchRecord {
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        MatchRecord {
            match_id: id,
            home_team: TeamRef { id: home.0, name: home.1.into() },
            away_team: TeamRef { id: away.0, name: away.1.into() },
            kickoff: tz.with_ymd_and_hms(2026, 10, 18, hour, 0, 0).unwrap(),
            status: Some(if score.is_some() { MatchStatus::Finished } else { MatchStatus::Scheduled }),
            score,
        }
    }

    #[test]
    fn empty_fixtures_say_which_matchday() {
        let empty = MatchesByDate { competition_name: "Premier League".into(), matchday: 1, days: vec![] };
        assert_eq!(
            builder().matches(&empty, NEUTRAL_THEME, MatchKind::Fixtures),
            Reply::Text("No Fixtures In MatchDay 1".into())
        );
        let empty = MatchesByDate { competition_name: "Serie A".into(), matchday: 12, days: vec![] };
        assert_eq!(
            builder().matches(&empty, NEUTRAL_THEME, MatchKind::Results),
            Reply::Text("No Results In MatchDay 12".into())
        );
    }

    #[test]
    fn match_rows_have_three_columns_with_team_postbacks() {
        let matches = MatchesByDate {
            competition_name: "Premier League".into(),
            matchday: 8,
            days: vec![MatchDay {
                date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
                matches: vec![
                    fixture(1, (57, "Arsenal"), (61, "Chelsea"), 21, Some(Score { home: 2, away: 1 })),
                    fixture(2, (397, "Brighton"), (0, "TBD"), 23, None),
                ],
            }],
        };
        let reply = builder().matches(&matches, NEUTRAL_THEME, MatchKind::Fixtures);
        let card = &bubbles(&reply)[0];
        let rows: Vec<&BoxComponent> = card.rows().collect();

        assert_eq!(header_texts(card), vec!["Premier League", "Fixtures · MatchDay 8", "Sunday 18 October 2026"]);
        assert_eq!(rows.len(), 2);
        let texts = |row: &BoxComponent| -> Vec<(String, Option<Action>)> {
            row.contents
                .iter()
                .filter_map(|c| match c {
                    Component::Text(t) => Some((t.text.clone(), t.action.clone())),
                    _ => None,
                })
                .collect()
        };

        let first = texts(rows[0]);
        assert_eq!(first[1].0, "2 - 1");
        assert_eq!(
            first[0].1,
            Some(Action::Postback { label: "Arsenal".into(), data: "team=arsenal".into() })
        );
        let second = texts(rows[1]);
        assert_eq!(second[1].0, "23:00");
        assert_eq!(
            second[0].1,
            Some(Action::Postback { label: "Brighton".into(), data: "team=397".into() })
        );
        assert_eq!(second[2].1, None);
    }

    fn standings_rows(n: u32) -> Vec<StandingRow> {
        (1..=n)
            .map(|position| StandingRow {
                position,
                team_id: 1000 + position,
                team_name: format!("Club {}", position),
                played: 9,
                won: 5,
                draw: 2,
                lost: 2,
                goal_difference: 3,
                points: 17,
            })
            .collect()
    }

    #[test]
    fn standings_are_paged_in_tens_covering_every_row() {
        for n in [1u32, 10, 18, 20, 21] {
            let table = StandingsTable { competition_name: "Premier League".into(), rows: standings_rows(n) };
            let reply = builder().standings(&table, NEUTRAL_THEME);
            let cards = bubbles(&reply);

            assert_eq!(cards.len(), (n as usize).div_ceil(10), "rows {}", n);
            assert!(cards.iter().all(|c| c.rows().count() <= 10));
            let seen: usize = cards.iter().map(|c| c.rows().count()).sum();
            assert_eq!(seen, n as usize);
        }
    }

    #[test]
    fn roster_pages_preserve_every_player() {
        let players: Vec<RosterEntry> = (0..23)
            .map(|i| RosterEntry {
                name: format!("Player {:02}", i),
                nationality_flag: "🇫🇷".into(),
                position: "Midfielder".into(),
                age: Some(20 + i),
            })
            .collect();
        let roster = Roster {
            team_id: 57,
            team_name: "Arsenal".into(),
            crest_url: "https://crests.football-data.org/57.png".into(),
            players: players.clone(),
        };
        let reply = builder().roster(&roster, NEUTRAL_THEME);
        let cards = bubbles(&reply);

        assert_eq!(cards.len(), 3);
        assert_eq!(header_texts(&cards[2]), vec!["Arsenal", "Squad (3/3)"]);

        let names: Vec<String> = cards
            .iter()
            .flat_map(|c| c.rows())
            .filter_map(|row| match &row.contents[1] {
                Component::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect();
        let expected: Vec<String> = players.into_iter().map(|p| p.name).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn empty_roster_and_standings_render_notices() {
        let roster = Roster { team_id: 1, team_name: "Ghosts".into(), crest_url: String::new(), players: vec![] };
        assert_eq!(builder().roster(&roster, NEUTRAL_THEME), Reply::Text("No Players Found For Ghosts".into()));
        let table = StandingsTable { competition_name: "Serie A".into(), rows: vec![] };
        assert_eq!(builder().standings(&table, NEUTRAL_THEME), Reply::Text("No Standings For Serie A".into()));
    }

    #[test]
    fn all_news_skips_empty_feeds() {
        let theme = NEUTRAL_THEME;
        let reply = builder().all_news(&[(feed(3), theme), (feed(0), theme), (feed(2), theme)], now());
        assert_eq!(bubbles(&reply).len(), 2);
        assert_eq!(builder().all_news(&[], now()), Reply::Text("No News Found".into()));
    }
}
