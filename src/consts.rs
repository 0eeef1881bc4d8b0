//! Static lookup tables: news sources, leagues, clubs and their themes.
//! Everything here is `&'static` and immutable after process start.

use serde::Serialize;
use std::fmt;

/// Header colors used when rendering a card for a source, league or club.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub header_bg: &'static str,
    pub header_text: &'static str,
}

impl Theme {
    pub const fn new(header_bg: &'static str, header_text: &'static str) -> Self {
        Self { header_bg, header_text }
    }

    /// Dark text on a light header.
    pub const fn light(header_bg: &'static str) -> Self {
        Self::new(header_bg, "#000000")
    }

    /// White text on a dark header.
    pub const fn dark(header_bg: &'static str) -> Self {
        Self::new(header_bg, "#ffffff")
    }
}

/// Direction of the publish-time ordering a source is presented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    NewestFirst,
    OldestFirst,
}

/// Whether the whole feed is sorted before the limit is applied, or only the
/// first `limit` items as published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortStage {
    BeforeLimit,
    AfterLimit,
}

/// Which entry timestamp counts as the publish time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Published,
    Updated,
}

/// Where the feed's own link comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedLink {
    /// `<image><link>` of the channel.
    ChannelImage,
    /// `<link>` of the channel.
    Channel,
}

/// Where the feed's "last updated" stamp comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatedAt {
    Feed,
    Now,
}

/// How the entry thumbnail is located in an RSS item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRule {
    /// n-th `media:thumbnail` across all media objects.
    MediaThumbnail(usize),
    /// n-th `media:content` / enclosure across all media objects.
    MediaContent(usize),
    /// Same image for every entry.
    Fixed(&'static str),
    /// First `<img src>` in the entry body whose src contains `needle`.
    EmbeddedImage { needle: &'static str },
}

/// Per-source extraction rules for RSS/Atom feeds.
#[derive(Debug, Clone, Copy)]
pub struct RssRules {
    pub image: ImageRule,
    pub date: DateField,
    pub order: Order,
    pub sort: SortStage,
    pub feed_link: FeedLink,
    pub updated: UpdatedAt,
}

/// Source type discriminator for the fetching engine
#[derive(Debug, Clone, Copy)]
pub enum SourceType {
    Rss(RssRules),
    /// Session-token JSON board (see `community`).
    Community,
}

/// News source definition with static lifetime
#[derive(Debug, Clone, Copy)]
pub struct Source {
    pub key: &'static str,
    pub name: &'static str,
    pub url: &'static str,
    pub source_type: SourceType,
    pub theme: Theme,
    pub fallback_image: &'static str,
}

impl Source {
    const fn new(
        key: &'static str,
        name: &'static str,
        url: &'static str,
        source_type: SourceType,
        theme: Theme,
    ) -> Self {
        Self { key, name, url, source_type, theme, fallback_image: images::DEFAULT_NEWS }
    }

    const fn with_fallback(mut self, fallback_image: &'static str) -> Self {
        self.fallback_image = fallback_image;
        self
    }

    pub fn order(&self) -> Order {
        match self.source_type {
            SourceType::Rss(rules) => rules.order,
            SourceType::Community => Order::NewestFirst,
        }
    }
}

impl PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

const BBC_RULES: RssRules = RssRules {
    image: ImageRule::MediaThumbnail(0),
    date: DateField::Published,
    order: Order::NewestFirst,
    sort: SortStage::AfterLimit,
    feed_link: FeedLink::ChannelImage,
    updated: UpdatedAt::Feed,
};

/// Static source registry, in the order `allnews` shows them.
pub static SOURCES: &[Source] = &[
    Source::new(
        "bbc-sport",
        "BBC Sport",
        "http://feeds.bbci.co.uk/sport/football/rss.xml",
        SourceType::Rss(BBC_RULES),
        Theme::light("#FEE63E"),
    ),
    Source::new(
        "sky-sport",
        "Sky Sports",
        "http://www.skysports.com/rss/11095",
        SourceType::Rss(RssRules {
            image: ImageRule::MediaContent(0),
            date: DateField::Published,
            order: Order::NewestFirst,
            sort: SortStage::BeforeLimit,
            feed_link: FeedLink::ChannelImage,
            updated: UpdatedAt::Feed,
        }),
        Theme::dark("#BB0211"),
    ),
    Source::new(
        "guardian",
        "The Guardian",
        "https://www.theguardian.com/football/rss",
        SourceType::Rss(RssRules {
            image: ImageRule::MediaContent(1),
            date: DateField::Updated,
            order: Order::OldestFirst,
            sort: SortStage::AfterLimit,
            feed_link: FeedLink::Channel,
            updated: UpdatedAt::Feed,
        }),
        Theme::dark("#09508D"),
    ),
    Source::new(
        "mirror",
        "Mirror Football",
        "https://www.mirror.co.uk/sport/football/?service=rss",
        SourceType::Rss(RssRules {
            image: ImageRule::MediaContent(0),
            date: DateField::Published,
            order: Order::NewestFirst,
            sort: SortStage::AfterLimit,
            feed_link: FeedLink::Channel,
            updated: UpdatedAt::Feed,
        }),
        Theme::dark("#E80E0D"),
    ),
    Source::new(
        "goal.com",
        "Goal.com",
        "http://www.goal.com/th/feeds/news",
        SourceType::Rss(RssRules {
            image: ImageRule::Fixed(images::GOAL_LOGO),
            date: DateField::Updated,
            order: Order::OldestFirst,
            sort: SortStage::AfterLimit,
            feed_link: FeedLink::Channel,
            updated: UpdatedAt::Feed,
        }),
        Theme::dark("#091F2C"),
    )
    .with_fallback(images::GOAL_LOGO),
    Source::new(
        "shotongoal",
        "Shot On Goal",
        "https://www.shotongoal.com/feed/",
        SourceType::Rss(RssRules {
            image: ImageRule::EmbeddedImage { needle: "shotongoal.com" },
            date: DateField::Published,
            order: Order::NewestFirst,
            sort: SortStage::AfterLimit,
            feed_link: FeedLink::Channel,
            updated: UpdatedAt::Now,
        }),
        Theme::dark("#1A1A1A"),
    ),
    Source::new(
        "soccersuck",
        "SoccerSuck",
        "https://www.soccersuck.com/boards",
        SourceType::Community,
        Theme::light("#197F4D"),
    ),
];

/// Lookup source by key (case-insensitive match)
#[inline]
pub fn find_source(key: &str) -> Option<&'static Source> {
    SOURCES.iter().find(|s| s.key.eq_ignore_ascii_case(key))
}

/// Competition known to the football-data API.
#[derive(Debug, Clone, Copy)]
pub struct League {
    pub key: &'static str,
    pub name: &'static str,
    pub competition_id: u32,
    pub theme: Theme,
}

pub static LEAGUES: &[League] = &[
    League { key: "pl", name: "Premier League", competition_id: 2021, theme: Theme::dark("#37003C") },
    League { key: "ucl", name: "Champions League", competition_id: 2001, theme: Theme::dark("#0E1E5B") },
    League { key: "laliga", name: "La Liga", competition_id: 2014, theme: Theme::dark("#EE8707") },
    League { key: "bundesliga", name: "Bundesliga", competition_id: 2002, theme: Theme::dark("#D20515") },
    League { key: "calcio", name: "Serie A", competition_id: 2019, theme: Theme::dark("#008FD7") },
];

impl PartialEq for League {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[inline]
pub fn find_league(key: &str) -> Option<&'static League> {
    LEAGUES.iter().find(|l| l.key.eq_ignore_ascii_case(key))
}

/// Club with a roster on football-data and a team page on BBC Sport.
#[derive(Debug, Clone, Copy)]
pub struct Team {
    pub key: &'static str,
    pub name: &'static str,
    pub team_id: u32,
    pub bbc_slug: &'static str,
    pub theme: Theme,
}

pub static TEAMS: &[Team] = &[
    Team { key: "arsenal", name: "Arsenal", team_id: 57, bbc_slug: "arsenal", theme: Theme::dark("#EF0107") },
    Team { key: "chelsea", name: "Chelsea", team_id: 61, bbc_slug: "chelsea", theme: Theme::dark("#034694") },
    Team { key: "liverpool", name: "Liverpool", team_id: 64, bbc_slug: "liverpool", theme: Theme::dark("#C8102E") },
    Team { key: "mancity", name: "Manchester City", team_id: 65, bbc_slug: "manchester-city", theme: Theme::light("#6CABDD") },
    Team { key: "manutd", name: "Manchester United", team_id: 66, bbc_slug: "manchester-united", theme: Theme::dark("#DA291C") },
    Team { key: "newcastle", name: "Newcastle United", team_id: 67, bbc_slug: "newcastle-united", theme: Theme::dark("#241F20") },
    Team { key: "tottenham", name: "Tottenham Hotspur", team_id: 73, bbc_slug: "tottenham-hotspur", theme: Theme::dark("#132257") },
    Team { key: "barcelona", name: "Barcelona", team_id: 81, bbc_slug: "barcelona", theme: Theme::dark("#A50044") },
    Team { key: "realmadrid", name: "Real Madrid", team_id: 86, bbc_slug: "real-madrid", theme: Theme::light("#FEBE10") },
    Team { key: "bayern", name: "Bayern Munich", team_id: 5, bbc_slug: "bayern-munich", theme: Theme::dark("#DC052D") },
    Team { key: "juventus", name: "Juventus", team_id: 109, bbc_slug: "juventus", theme: Theme::dark("#000000") },
];

#[inline]
pub fn find_team(key: &str) -> Option<&'static Team> {
    TEAMS.iter().find(|t| t.key.eq_ignore_ascii_case(key))
}

#[inline]
pub fn find_team_by_id(team_id: u32) -> Option<&'static Team> {
    TEAMS.iter().find(|t| t.team_id == team_id)
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Team {
    /// BBC per-club feed, parsed with the BBC Sport rules.
    pub fn feed_url(&self) -> String {
        format!("https://feeds.bbci.co.uk/sport/football/teams/{}/rss.xml", self.bbc_slug)
    }

    pub const fn news_source(&self) -> Source {
        Source::new(self.key, self.name, BBC_TEAMS_URL, SourceType::Rss(BBC_RULES), self.theme)
    }
}

const BBC_TEAMS_URL: &str = "https://www.bbc.com/sport/football/teams";

/// Theme for cards with no source/league/club of their own.
pub const NEUTRAL_THEME: Theme = Theme::dark("#1A1A1A");

pub mod images {
    pub const DEFAULT_NEWS: &str = "https://www.dwsports.com/on/demandware.static/-/\
        Sites-DWS-Master-Catalog/default/dw88d7b256/products/0650288_01.jpeg";
    pub const GOAL_LOGO: &str =
        "https://upload.wikimedia.org/wikipedia/commons/f/f1/Goal-com-logo-eps-vector-image.png";
    pub const DEFAULT_CREST: &str =
        "https://upload.wikimedia.org/wikipedia/commons/d/d3/Soccerball.svg";
}

/// HTTP headers for upstream calls
pub mod headers {
    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    pub const ACCEPT_RSS: &str =
        "application/rss+xml,application/atom+xml,application/xml,text/xml;q=0.9,*/*;q=0.8";
    pub const ACCEPT_JSON: &str = "application/json";
    pub const FOOTBALL_DATA_AUTH: &str = "X-Auth-Token";
    pub const COMMUNITY_SESSION: &str = "X-Session-Token";
}

/// CSS selectors for embedded-HTML parsing
pub mod selectors {
    pub const IMG: &str = "img[src]";
}

/// Limits and thresholds
pub mod limits {
    pub const DEFAULT_NEWS_LIMIT: usize = 5;
    pub const MAX_FEED_LIMIT: usize = 50;
    pub const ROWS_PER_CARD: usize = 10;
    pub const MAX_MESSAGE_LEN: usize = 4000;
    pub const REQUEST_TIMEOUT_SECS: u64 = 15;
    pub const COMMUNITY_PAGE_SIZE: usize = 20;
    pub const COMMUNITY_MAX_PAGES: u32 = 10;
    pub const SESSION_REFRESH_MARGIN_SECS: u64 = 30;
    /// Upper bound on an issued session's lifetime, whatever the board claims.
    pub const MAX_SESSION_TTL_SECS: u64 = 24 * 3600;
    pub const MAX_TITLE_CHARS: usize = 150;
}

/// Fixed user-facing strings
pub mod messages {
    pub const FAILURE_NOTICE: &str =
        "⚠️ Sorry, the football feeds are not answering right now. Please try again in a moment.";
    pub const UPDATE_PREFIX: &str = "Update";
}
