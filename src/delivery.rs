//! Telegram rendering of card replies: each bubble becomes one HTML message
//! with an inline keyboard for its postbacks and buttons.

use crate::consts::limits;
use crate::template::{Action, Bubble, Component, Reply, TextComponent};
use crate::utils::escape_html;
use reqwest::Url;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

const BUTTONS_PER_ROW: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCard {
    pub text: String,
    pub keyboard: Vec<Vec<InlineKeyboardButton>>,
}

fn button(action: &Action) -> Option<InlineKeyboardButton> {
    match action {
        Action::Postback { label, data } => Some(InlineKeyboardButton::callback(label.clone(), data.clone())),
        Action::Uri { label, uri } => Url::parse(uri)
            .ok()
            .map(|url| InlineKeyboardButton::url(label.clone(), url)),
    }
}

fn inline_text(text: &TextComponent) -> String {
    match &text.action {
        Some(Action::Uri { uri, .. }) => {
            format!("<a href=\"{}\">{}</a>", escape_html(uri), escape_html(&text.text))
        }
        _ => escape_html(&text.text),
    }
}

/// Flattens a bubble: header lines on top, one line per body row, postback
/// actions collected into keyboard buttons in order of appearance.
pub fn render_bubble(bubble: &Bubble) -> RenderedCard {
    let mut lines = Vec::new();
    let mut actions: Vec<&Action> = Vec::new();

    for (i, component) in bubble.header.contents.iter().enumerate() {
        if let Component::Text(t) = component {
            if i == 0 {
                lines.push(format!("<b>{}</b>", inline_text(t)));
            } else {
                lines.push(format!("<i>{}</i>", escape_html(&t.text)));
            }
        }
    }
    lines.push(String::new());

    for component in &bubble.body.contents {
        match component {
            Component::Box(row) => {
                let cells: Vec<String> = row
                    .contents
                    .iter()
                    .filter_map(|c| match c {
                        Component::Text(t) if !t.text.is_empty() => {
                            if let Some(a @ Action::Postback { .. }) = &t.action {
                                actions.push(a);
                            }
                            Some(inline_text(t))
                        }
                        _ => None,
                    })
                    .collect();
                if !cells.is_empty() {
                    lines.push(cells.join(" | "));
                }
            }
            Component::Text(t) => lines.push(inline_text(t)),
            Component::Button(b) => actions.push(&b.action),
            Component::Image(_) | Component::Separator => {}
        }
    }

    let mut seen = Vec::new();
    let buttons: Vec<InlineKeyboardButton> = actions
        .into_iter()
        .filter(|a| {
            if seen.contains(a) {
                false
            } else {
                seen.push(*a);
                true
            }
        })
        .filter_map(button)
        .collect();

    RenderedCard {
        text: lines.join("\n").trim_end().to_string(),
        keyboard: buttons.chunks(BUTTONS_PER_ROW).map(|r| r.to_vec()).collect(),
    }
}

/// Splits on line boundaries so HTML tags, which never span lines, stay intact.
pub fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = start + max_len;
        if end >= text.len() {
            chunks.push(&text[start..]);
            break;
        }
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        if let Some(last_newline) = text[start..end].rfind('\n') {
            let split_idx = start + last_newline + 1;
            if split_idx > start {
                end = split_idx;
            }
        }
        chunks.push(&text[start..end]);
        start = end;
    }
    chunks
}

/// Sends a reply. Cards go out one message per bubble, keyboard on the last chunk.
pub async fn deliver(bot: &Bot, chat_id: ChatId, reply: Reply) -> ResponseResult<()> {
    match reply {
        Reply::Text(text) => {
            for chunk in split_message(&text, limits::MAX_MESSAGE_LEN) {
                bot.send_message(chat_id, chunk).disable_web_page_preview(true).await?;
            }
        }
        Reply::Cards { alt_text, carousel } => {
            let rows: usize = carousel.contents.iter().map(|b| b.rows().count()).sum();
            log::debug!("sending {} card(s), {} rows, for {}", carousel.contents.len(), rows, alt_text);
            for bubble in &carousel.contents {
                let card = render_bubble(bubble);
                let chunks = split_message(&card.text, limits::MAX_MESSAGE_LEN);
                let last = chunks.len().saturating_sub(1);
                for (i, chunk) in chunks.into_iter().enumerate() {
                    let request = bot
                        .send_message(chat_id, chunk)
                        .parse_mode(ParseMode::Html)
                        .disable_web_page_preview(true);
                    if i == last && !card.keyboard.is_empty() {
                        request.reply_markup(InlineKeyboardMarkup::new(card.keyboard.clone())).await?;
                    } else {
                        request.await?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::NEUTRAL_THEME;
    use crate::models::{EntryRecord, FeedRecord, MatchDay, MatchRecord, MatchStatus, MatchesByDate, Score, TeamRef};
    use crate::template::{MatchKind, TemplateBuilder};
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
    use teloxide::types::InlineKeyboardButtonKind;

    fn builder() -> TemplateBuilder {
        TemplateBuilder::new(FixedOffset::east_opt(7 * 3600).unwrap())
    }

    fn first_bubble(reply: Reply) -> Bubble {
        match reply {
            Reply::Cards { carousel, .. } => carousel.contents.into_iter().next().unwrap(),
            Reply::Text(t) => panic!("expected cards, got {:?}", t),
        }
    }

    #[test]
    fn news_rows_become_escaped_links() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let feed = FeedRecord {
            source: "guardian",
            title: "Football | The Guardian".into(),
            link: "https://www.theguardian.com/football".into(),
            updated_at: now,
            entries: vec![EntryRecord {
                title: "Spurs <3 & Arsenal".into(),
                link: "https://www.theguardian.com/football/a?x=1&y=2".into(),
                published_at: now,
                image_url: "https://i.guim.co.uk/a.jpg".into(),
            }],
        };
        let card = render_bubble(&first_bubble(builder().news(&feed, NEUTRAL_THEME, now)));
        let lines: Vec<&str> = card.text.lines().collect();

        assert_eq!(
            lines[0],
            "<b><a href=\"https://www.theguardian.com/football\">Football | The Guardian</a></b>"
        );
        assert!(lines[1].starts_with("<i>Update: 19 Oct 2026 19:00:00"));
        assert_eq!(
            *lines.last().unwrap(),
            "<a href=\"https://www.theguardian.com/football/a?x=1&amp;y=2\">Spurs &lt;3 &amp; Arsenal</a>"
        );
        assert!(card.keyboard.is_empty());
    }

    #[test]
    fn team_postbacks_become_deduplicated_callbacks() {
        let tz = FixedOffset::east_opt(7 * 3600).unwrap();
        let game = |id, home: (u32, &str), away: (u32, &str)| MatchRecord {
            match_id: id,
            home_team: TeamRef { id: home.0, name: home.1.into() },
            away_team: TeamRef { id: away.0, name: away.1.into() },
            kickoff: tz.with_ymd_and_hms(2026, 10, 18, 21, 0, 0).unwrap(),
            status: Some(MatchStatus::Finished),
            score: Some(Score { home: 1, away: 0 }),
        };
        let matches = MatchesByDate {
            competition_name: "Premier League".into(),
            matchday: 8,
            days: vec![MatchDay {
                date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
                matches: vec![game(1, (57, "Arsenal"), (61, "Chelsea")), game(2, (57, "Arsenal"), (64, "Liverpool"))],
            }],
        };
        let card = render_bubble(&first_bubble(builder().matches(&matches, NEUTRAL_THEME, MatchKind::Results)));

        assert!(card.text.contains("Arsenal | 1 - 0 | Chelsea"));
        let callbacks: Vec<String> = card
            .keyboard
            .iter()
            .flatten()
            .map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
                other => panic!("unexpected button {:?}", other),
            })
            .collect();
        assert_eq!(callbacks, vec!["team=arsenal", "team=chelsea", "team=liverpool"]);
        assert_eq!(card.keyboard.len(), 2);
    }

    #[test]
    fn menu_buttons_are_laid_out_in_pairs() {
        let buttons: Vec<(String, String)> =
            (0..5).map(|i| (format!("Item {}", i), format!("go={}", i))).collect();
        let card = render_bubble(&first_bubble(builder().menu("Menu", "Pick", &buttons, NEUTRAL_THEME)));

        assert_eq!(card.text, "<b>Menu</b>\n<i>Pick</i>");
        assert_eq!(card.keyboard.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
    }

    #[test]
    fn split_message_keeps_lines_whole() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(split_message(text, 11), vec!["aaaa\nbbbb\n", "cccc"]);
        assert_eq!(split_message("short", 100), vec!["short"]);
        assert_eq!(split_message("", 10), Vec::<&str>::new());
    }
}
