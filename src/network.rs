//! Feed normalizer: fetches a news source and reduces it to a `FeedRecord`.
//!
//! Every RSS/Atom source goes through the same path; what differs per source
//! lives in its `RssRules` (image location, date field, ordering).

use crate::community::CommunityClient;
use crate::consts::{
    headers, selectors, DateField, FeedLink, ImageRule, Order, RssRules, SortStage, Source,
    SourceType, Team, UpdatedAt,
};
use crate::error::FetchError;
use crate::models::{EntryRecord, FeedRecord};
use crate::utils::{clean_text, normalize_image_url};
use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed};
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Response};
use scraper::{Html, Selector};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Shared HTTP client for every upstream, bounded by a per-request timeout.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(headers::USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Sends `request`, mapping transport failures and non-2xx statuses to
/// `UpstreamUnavailable`.
pub async fn send(origin: &str, request: RequestBuilder) -> Result<Response, FetchError> {
    let response = request.send().await.map_err(|e| FetchError::unavailable(origin, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::unavailable(origin, format!("HTTP {}", status)));
    }
    Ok(response)
}

/// Reads a JSON body; shape mismatches are `MalformedFeed`.
pub async fn read_json<T: DeserializeOwned>(origin: &str, response: Response) -> Result<T, FetchError> {
    let body = response.text().await.map_err(|e| FetchError::unavailable(origin, e))?;
    serde_json::from_str(&body).map_err(|e| FetchError::malformed(origin, e))
}

pub struct NewsEngine {
    client: Client,
    community: CommunityClient,
    img_selector: Selector,
}

impl NewsEngine {
    pub fn new(client: Client, community: CommunityClient) -> Self {
        Self {
            client,
            community,
            img_selector: Selector::parse(selectors::IMG).expect("static img selector"),
        }
    }

    /// Latest `limit` entries of `source`, in the source's canonical order.
    pub async fn fetch(&self, source: &Source, limit: usize) -> Result<FeedRecord, FetchError> {
        match source.source_type {
            SourceType::Rss(rules) => self.fetch_rss(source, &rules, source.url, limit).await,
            SourceType::Community => self.community.fetch_posts(source, limit).await,
        }
    }

    /// BBC Sport's per-club feed.
    pub async fn fetch_team_news(&self, team: &Team, limit: usize) -> Result<FeedRecord, FetchError> {
        let source = team.news_source();
        let SourceType::Rss(rules) = source.source_type else {
            return Err(FetchError::malformed(team.name, "team news must be an RSS source"));
        };
        self.fetch_rss(&source, &rules, &team.feed_url(), limit).await
    }

    async fn fetch_rss(
        &self,
        source: &Source,
        rules: &RssRules,
        url: &str,
        limit: usize,
    ) -> Result<FeedRecord, FetchError> {
        let request = self.client.get(url).header(ACCEPT, headers::ACCEPT_RSS);
        let bytes = send(source.name, request)
            .await?
            .bytes()
            .await
            .map_err(|e| FetchError::unavailable(source.name, e))?;
        let feed = feed_rs::parser::parse(&bytes[..]).map_err(|e| FetchError::malformed(source.name, e))?;

        let record = normalize_feed(source, rules, url, feed, limit, Utc::now(), &self.img_selector);
        log::debug!("{}: {} entries", source.name, record.entries.len());
        Ok(record)
    }
}

/// Pure half of the RSS adapter: parsed feed in, normalized record out.
pub fn normalize_feed(
    source: &Source,
    rules: &RssRules,
    feed_url: &str,
    feed: Feed,
    limit: usize,
    now: DateTime<Utc>,
    img_selector: &Selector,
) -> FeedRecord {
    let title = feed
        .title
        .as_ref()
        .map(|t| clean_text(&t.content))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| source.name.to_string());

    let channel_link = feed.links.first().map(|l| l.href.clone());
    let link = match rules.feed_link {
        FeedLink::ChannelImage => feed
            .logo
            .as_ref()
            .and_then(|img| img.link.as_ref())
            .map(|l| l.href.clone())
            .or(channel_link),
        FeedLink::Channel => channel_link,
    }
    .unwrap_or_else(|| feed_url.to_string());

    let updated_at = match rules.updated {
        UpdatedAt::Feed => feed.updated.or(feed.published).unwrap_or(now),
        UpdatedAt::Now => now,
    };

    let mut entries: Vec<EntryRecord> = feed
        .entries
        .into_iter()
        .map(|e| to_entry(e, source, rules, feed_url, updated_at, img_selector))
        .collect();

    match rules.sort {
        SortStage::BeforeLimit => {
            sort_entries(&mut entries, rules.order);
            entries.truncate(limit);
        }
        SortStage::AfterLimit => {
            entries.truncate(limit);
            sort_entries(&mut entries, rules.order);
        }
    }

    FeedRecord { source: source.key, title, link, updated_at, entries }
}

pub fn sort_entries(entries: &mut [EntryRecord], order: Order) {
    match order {
        Order::NewestFirst => entries.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        Order::OldestFirst => entries.sort_by(|a, b| a.published_at.cmp(&b.published_at)),
    }
}

fn to_entry(
    entry: Entry,
    source: &Source,
    rules: &RssRules,
    feed_url: &str,
    feed_time: DateTime<Utc>,
    img_selector: &Selector,
) -> EntryRecord {
    let published_at = match rules.date {
        DateField::Published => entry.published.or(entry.updated),
        DateField::Updated => entry.updated.or(entry.published),
    }
    .unwrap_or(feed_time);

    let raw_image = match rules.image {
        ImageRule::MediaThumbnail(index) => entry
            .media
            .iter()
            .flat_map(|m| m.thumbnails.iter())
            .nth(index)
            .map(|t| t.image.uri.clone()),
        ImageRule::MediaContent(index) => entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .filter_map(|c| c.url.as_ref())
            .nth(index)
            .map(|u| u.to_string()),
        ImageRule::Fixed(url) => Some(url.to_string()),
        ImageRule::EmbeddedImage { needle } => entry
            .content
            .as_ref()
            .and_then(|c| c.body.as_deref())
            .and_then(|html| embedded_image(html, needle, img_selector))
            .or_else(|| {
                entry
                    .summary
                    .as_ref()
                    .and_then(|s| embedded_image(&s.content, needle, img_selector))
            }),
    };

    let title = entry
        .title
        .map(|t| clean_text(&t.content))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    EntryRecord {
        title,
        link: entry.links.first().map(|l| l.href.clone()).unwrap_or_else(|| feed_url.to_string()),
        published_at,
        image_url: normalize_image_url(raw_image.as_deref(), source.fallback_image),
    }
}

/// First `<img src>` in an HTML fragment whose src contains `needle`.
pub fn embedded_image(html: &str, needle: &str, selector: &Selector) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let found = fragment
        .select(selector)
        .filter_map(|img| img.value().attr("src"))
        .find(|src| src.contains(needle))
        .map(str::to_string);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{find_source, images};
    use chrono::TimeZone;

    fn selector() -> Selector {
        Selector::parse(selectors::IMG).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn rules_of(source: &Source) -> RssRules {
        match source.source_type {
            SourceType::Rss(rules) => rules,
            SourceType::Community => panic!("{} is not RSS", source.key),
        }
    }

    fn normalize(key: &str, xml: &str, limit: usize) -> FeedRecord {
        let source = find_source(key).unwrap();
        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        normalize_feed(source, &rules_of(source), source.url, feed, limit, now(), &selector())
    }

    const BBC_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>BBC Sport - Football</title>
    <link>https://www.bbc.co.uk/sport/football</link>
    <image>
      <url>https://news.bbcimg.co.uk/nol/shared/img/bbc_news_120x60.gif</url>
      <title>BBC Sport - Football</title>
      <link>https://www.bbc.co.uk/sport/football?feed</link>
    </image>
    <lastBuildDate>Mon, 19 Oct 2026 10:00:00 GMT</lastBuildDate>
    <item>
      <title>Arsenal beat Chelsea</title>
      <link>https://www.bbc.co.uk/sport/football/1</link>
      <pubDate>Mon, 19 Oct 2026 08:00:00 GMT</pubDate>
      <media:thumbnail width="240" height="135" url="http://ichef.bbci.co.uk/1.jpg"/>
    </item>
    <item>
      <title>Liverpool sign striker</title>
      <link>https://www.bbc.co.uk/sport/football/2</link>
      <pubDate>Mon, 19 Oct 2026 09:30:00 GMT</pubDate>
      <media:thumbnail width="240" height="135" url="http://ichef.bbci.co.uk/2.jpg"/>
    </item>
    <item>
      <title>Spurs &amp; City draw</title>
      <link>https://www.bbc.co.uk/sport/football/3</link>
      <pubDate>Sun, 18 Oct 2026 21:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Newcastle top the table</title>
      <link>https://www.bbc.co.uk/sport/football/4</link>
      <pubDate>Mon, 19 Oct 2026 09:45:00 GMT</pubDate>
      <media:thumbnail width="240" height="135" url="https://ichef.bbci.co.uk/4.jpg"/>
    </item>
  </channel>
</rss>"#;

    const SHOT_ON_GOAL_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Shot On Goal</title>
    <link>https://www.shotongoal.com</link>
    <item>
      <title>Weekend preview</title>
      <link>https://www.shotongoal.com/preview</link>
      <pubDate>Sat, 17 Oct 2026 07:00:00 GMT</pubDate>
      <content:encoded><![CDATA[<p><img src="https://ads.example.com/banner.gif"/><img src="http://www.shotongoal.com/wp-content/preview.jpg"/></p>]]></content:encoded>
    </item>
    <item>
      <title>Match report</title>
      <link>https://www.shotongoal.com/report</link>
      <pubDate>Sun, 18 Oct 2026 07:00:00 GMT</pubDate>
      <content:encoded><![CDATA[<p>No pictures here</p>]]></content:encoded>
    </item>
  </channel>
</rss>"#;

    const GOAL_ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Goal.com Thailand</title>
  <link href="https://www.goal.com/th"/>
  <updated>2026-10-19T10:00:00Z</updated>
  <id>urn:goal:th</id>
  <entry>
    <title>Third</title>
    <link href="https://www.goal.com/th/3"/>
    <id>urn:goal:3</id>
    <updated>2026-10-19T09:00:00Z</updated>
  </entry>
  <entry>
    <title>First</title>
    <link href="https://www.goal.com/th/1"/>
    <id>urn:goal:1</id>
    <updated>2026-10-19T07:00:00Z</updated>
  </entry>
  <entry>
    <title>Second</title>
    <link href="https://www.goal.com/th/2"/>
    <id>urn:goal:2</id>
    <updated>2026-10-19T08:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn bbc_feed_is_limited_then_sorted_newest_first() {
        let record = normalize("bbc-sport", BBC_RSS, 3);

        assert_eq!(record.title, "BBC Sport - Football");
        assert_eq!(record.link, "https://www.bbc.co.uk/sport/football?feed");
        assert_eq!(record.updated_at, Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap());
        assert_eq!(record.entries.len(), 3);

        let titles: Vec<&str> = record.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Liverpool sign striker", "Arsenal beat Chelsea", "Spurs & City draw"]);
    }

    #[test]
    fn entry_count_is_min_of_limit_and_available() {
        for limit in [0, 1, 4, 10] {
            let record = normalize("bbc-sport", BBC_RSS, limit);
            assert_eq!(record.entries.len(), limit.min(4));
        }
    }

    #[test]
    fn every_image_is_https_with_fallback_for_missing_thumbnail() {
        let record = normalize("bbc-sport", BBC_RSS, 10);
        assert!(record.entries.iter().all(|e| e.image_url.starts_with("https://")));

        let draw = record.entries.iter().find(|e| e.title.starts_with("Spurs")).unwrap();
        assert_eq!(draw.image_url, images::DEFAULT_NEWS);
        let first = record.entries.iter().find(|e| e.title.starts_with("Arsenal")).unwrap();
        assert_eq!(first.image_url, "https://ichef.bbci.co.uk/1.jpg");
    }

    #[test]
    fn ordering_is_monotonic_in_declared_direction() {
        let bbc = normalize("bbc-sport", BBC_RSS, 10);
        assert!(bbc.entries.windows(2).all(|w| w[0].published_at >= w[1].published_at));

        let goal = normalize("goal.com", GOAL_ATOM, 10);
        assert!(goal.entries.windows(2).all(|w| w[0].published_at <= w[1].published_at));
        let titles: Vec<&str> = goal.entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
        assert!(goal.entries.iter().all(|e| e.image_url == images::GOAL_LOGO));
    }

    #[test]
    fn embedded_image_matches_source_substring() {
        let record = normalize("shotongoal", SHOT_ON_GOAL_RSS, 5);

        assert_eq!(record.updated_at, now());
        assert_eq!(record.entries[0].title, "Match report");
        assert_eq!(record.entries[0].image_url, images::DEFAULT_NEWS);
        assert_eq!(record.entries[1].image_url, "https://www.shotongoal.com/wp-content/preview.jpg");
    }

    #[test]
    fn embedded_image_skips_foreign_hosts() {
        let html = r#"<div><img src="https://cdn.other.com/a.png"><img alt="no src"></div>"#;
        assert_eq!(embedded_image(html, "shotongoal.com", &selector()), None);
    }
}
