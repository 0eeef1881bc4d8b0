//! Community board adapter (SoccerSuck).
//!
//! The board's JSON API hands out short-lived session tokens in exchange for a
//! client key. Tokens are kept in a `SessionCache` and refreshed shortly before
//! they expire; a rejected token is dropped so the next call logs in again.

use crate::consts::{headers, limits, Source};
use crate::error::FetchError;
use crate::models::{EntryRecord, FeedRecord};
use crate::network::{read_json, send, sort_entries};
use crate::utils::{clean_text, normalize_image_url};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Post timestamps are wall-clock Bangkok time.
const BOARD_OFFSET_SECS: i32 = 7 * 3600;
const BOARD_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A freshly issued credential and how long it stays valid.
#[derive(Debug, Clone)]
pub struct Grant {
    pub token: String,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
struct Session {
    token: String,
    expires_at: Instant,
}

/// Short-lived credential cache with expiry-driven refresh.
///
/// The lock is held across a login so concurrent callers wait for one
/// exchange instead of each starting their own.
pub struct SessionCache {
    slot: Mutex<Option<Session>>,
    margin: Duration,
}

impl SessionCache {
    pub fn new(margin: Duration) -> Self {
        Self { slot: Mutex::new(None), margin }
    }

    /// Returns the cached token, or runs `login` when there is none or it is
    /// within `margin` of expiring.
    pub async fn token_with<F, Fut>(&self, login: F) -> Result<String, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Grant, FetchError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(session) = slot.as_ref() {
            if session.expires_at > Instant::now() + self.margin {
                return Ok(session.token.clone());
            }
        }

        let grant = login().await?;
        let token = grant.token.clone();
        let ttl = grant.ttl.min(Duration::from_secs(limits::MAX_SESSION_TTL_SECS));
        *slot = Some(Session { token: grant.token, expires_at: Instant::now() + ttl });
        Ok(token)
    }

    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    client_key: &'a str,
}

#[derive(Deserialize)]
struct SessionGrant {
    token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct PostsPage {
    pub title: Option<String>,
    pub link: Option<String>,
    pub updated_at: Option<String>,
    pub posts: Vec<Post>,
    pub next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Post {
    pub title: Option<String>,
    pub url: String,
    pub published_at: Option<String>,
    /// Usually a string, sometimes a JSON array or a bracketed string.
    pub thumbnail: Option<serde_json::Value>,
}

pub struct CommunityClient {
    client: Client,
    base_url: String,
    client_key: Option<String>,
    session: SessionCache,
}

impl CommunityClient {
    pub fn new(client: Client, base_url: &str, client_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_key,
            session: SessionCache::new(Duration::from_secs(limits::SESSION_REFRESH_MARGIN_SECS)),
        }
    }

    async fn login(&self, client_key: &str) -> Result<Grant, FetchError> {
        let url = format!("{}/auth/session", self.base_url);
        let request = self
            .client
            .post(&url)
            .header(ACCEPT, headers::ACCEPT_JSON)
            .json(&LoginRequest { client_key });
        let grant: SessionGrant = read_json("community login", send("community login", request).await?).await?;
        log::info!("community session issued, valid for {}s", grant.expires_in);
        Ok(Grant { token: grant.token, ttl: Duration::from_secs(grant.expires_in) })
    }

    /// Newest `limit` posts, following `next_page` until enough are collected.
    pub async fn fetch_posts(&self, source: &Source, limit: usize) -> Result<FeedRecord, FetchError> {
        let client_key = self
            .client_key
            .as_deref()
            .ok_or_else(|| FetchError::unavailable(source.name, "COMMUNITY_API_KEY not configured"))?;
        let token = self.session.token_with(|| self.login(client_key)).await?;

        let mut pages = Vec::new();
        let mut collected = 0;
        let mut page = 1;
        while collected < limit && page <= limits::COMMUNITY_MAX_PAGES {
            let body = self.fetch_page(source, &token, page).await?;
            collected += body.posts.len();
            let next = body.next_page;
            pages.push(body);
            match next {
                Some(n) if n > page => page = n,
                _ => break,
            }
        }

        let offset = FixedOffset::east_opt(BOARD_OFFSET_SECS).expect("static offset");
        Ok(normalize_posts(source, pages, limit, offset, Utc::now()))
    }

    async fn fetch_page(&self, source: &Source, token: &str, page: u32) -> Result<PostsPage, FetchError> {
        let url = format!("{}/posts", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, headers::ACCEPT_JSON)
            .header(headers::COMMUNITY_SESSION, token)
            .query(&[("page", page.to_string()), ("per_page", limits::COMMUNITY_PAGE_SIZE.to_string())])
            .send()
            .await
            .map_err(|e| FetchError::unavailable(source.name, e))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.session.invalidate().await;
            return Err(FetchError::unavailable(source.name, "session token rejected"));
        }
        if !response.status().is_success() {
            return Err(FetchError::unavailable(source.name, format!("HTTP {}", response.status())));
        }
        read_json(source.name, response).await
    }
}

fn parse_board_time(raw: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, BOARD_DATE_FORMAT) {
        return naive.and_local_timezone(offset).single().map(|dt| dt.with_timezone(&Utc));
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

fn thumbnail_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pure half of the adapter: fetched pages in, normalized record out.
pub fn normalize_posts(
    source: &Source,
    pages: Vec<PostsPage>,
    limit: usize,
    offset: FixedOffset,
    now: DateTime<Utc>,
) -> FeedRecord {
    let first = pages.first();
    let title = first
        .and_then(|p| p.title.clone())
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| source.name.to_string());
    let link = first
        .and_then(|p| p.link.clone())
        .unwrap_or_else(|| source.url.to_string());
    let stated_update = first
        .and_then(|p| p.updated_at.as_deref())
        .and_then(|raw| parse_board_time(raw, offset));

    let mut entries: Vec<EntryRecord> = pages
        .into_iter()
        .flat_map(|p| p.posts)
        .map(|post| {
            let raw_image = post.thumbnail.as_ref().map(thumbnail_text);
            EntryRecord {
                title: post
                    .title
                    .map(|t| clean_text(&t))
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Untitled".to_string()),
                published_at: post
                    .published_at
                    .as_deref()
                    .and_then(|raw| parse_board_time(raw, offset))
                    .or(stated_update)
                    .unwrap_or(now),
                image_url: normalize_image_url(raw_image.as_deref(), source.fallback_image),
                link: post.url,
            }
        })
        .collect();

    sort_entries(&mut entries, source.order());
    entries.truncate(limit);

    let updated_at = stated_update
        .or_else(|| entries.iter().map(|e| e.published_at).max())
        .unwrap_or(now);

    FeedRecord { source: source.key, title, link, updated_at, entries }
}
