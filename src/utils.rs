use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Literal sponsor/legal fragments stripped from club names, longest first so
/// `AFC` goes before `FC` and `RCD` before `RC`.
const TEAM_NAME_NOISE: &[&str] = &[
    "& Hove Albion",
    "de Barcelona",
    "La Coruña",
    "de Fútbol",
    "Wanderers",
    "AFC",
    "RCD",
    "FC",
    "CF",
    "RC",
    "SD",
];

pub fn clean_text(text: &str) -> String {
    let no_html = text
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .replace("&nbsp;", " ");

    no_html
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn truncate_text(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars { return s.to_string(); }
    s.chars().take(max_chars).collect::<String>() + "..."
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips sponsor suffixes by literal substring removal. Runs to a fixed
/// point so `normalize_team_name(normalize_team_name(x)) == normalize_team_name(x)`.
pub fn normalize_team_name(name: &str) -> String {
    let mut current = collapse_whitespace(name);
    loop {
        let mut next = current.clone();
        for noise in TEAM_NAME_NOISE {
            next = next.replace(noise, "");
        }
        let next = collapse_whitespace(&next);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)(?:https?:)?//[^\s"'\[\]<>()]+"#).expect("static url pattern")
    })
}

/// Coerces a raw image value into an `https://` url, or returns `fallback`.
///
/// Accepts bracketed or quoted values (`["http://x/a.jpg"]`), protocol-relative
/// urls and plain `http://`.
pub fn normalize_image_url(raw: Option<&str>, fallback: &str) -> String {
    let Some((raw, found)) = raw.and_then(|r| url_pattern().find(r).map(|m| (r, m))) else {
        return fallback.to_string();
    };
    // `//host` glued to another scheme (`ftp://`) or word is not a protocol-relative url
    let glued = raw[..found.start()]
        .chars()
        .next_back()
        .is_some_and(|c| c == ':' || c.is_ascii_alphanumeric());
    if glued {
        return fallback.to_string();
    }
    let url = found.as_str();

    let rest = if url.starts_with("//") {
        &url[2..]
    } else if let Some(idx) = url.find("://") {
        &url[idx + 3..]
    } else {
        return fallback.to_string();
    };

    if rest.is_empty() || rest.starts_with('/') {
        return fallback.to_string();
    }
    format!("https://{}", rest)
}

/// Emoji flag for a nationality as football-data spells it.
pub fn flag_glyph(nationality: &str) -> String {
    match nationality.trim() {
        "England" => return "🏴\u{E0067}\u{E0062}\u{E0065}\u{E006E}\u{E0067}\u{E007F}".to_string(),
        "Scotland" => return "🏴\u{E0067}\u{E0062}\u{E0073}\u{E0063}\u{E0074}\u{E007F}".to_string(),
        "Wales" => return "🏴\u{E0067}\u{E0062}\u{E0077}\u{E006C}\u{E0073}\u{E007F}".to_string(),
        _ => {}
    }

    let code = match nationality.trim() {
        "Albania" => "AL",
        "Algeria" => "DZ",
        "Argentina" => "AR",
        "Australia" => "AU",
        "Austria" => "AT",
        "Belgium" => "BE",
        "Bosnia-Herzegovina" | "Bosnia and Herzegovina" => "BA",
        "Brazil" => "BR",
        "Cameroon" => "CM",
        "Canada" => "CA",
        "Chile" => "CL",
        "Colombia" => "CO",
        "Croatia" => "HR",
        "Czech Republic" | "Czechia" => "CZ",
        "Denmark" => "DK",
        "Ecuador" => "EC",
        "Egypt" => "EG",
        "Finland" => "FI",
        "France" => "FR",
        "Germany" => "DE",
        "Ghana" => "GH",
        "Greece" => "GR",
        "Hungary" => "HU",
        "Iceland" => "IS",
        "Ireland" | "Republic of Ireland" => "IE",
        "Italy" => "IT",
        "Ivory Coast" | "Côte d'Ivoire" => "CI",
        "Jamaica" => "JM",
        "Japan" => "JP",
        "Mali" => "ML",
        "Mexico" => "MX",
        "Morocco" => "MA",
        "Netherlands" => "NL",
        "Nigeria" => "NG",
        "Northern Ireland" => "GB",
        "Norway" => "NO",
        "Paraguay" => "PY",
        "Poland" => "PL",
        "Portugal" => "PT",
        "Romania" => "RO",
        "Senegal" => "SN",
        "Serbia" => "RS",
        "Slovakia" => "SK",
        "Slovenia" => "SI",
        "South Korea" | "Korea Republic" => "KR",
        "Spain" => "ES",
        "Sweden" => "SE",
        "Switzerland" => "CH",
        "Thailand" => "TH",
        "Turkey" | "Türkiye" => "TR",
        "Ukraine" => "UA",
        "United States" | "USA" => "US",
        "Uruguay" => "UY",
        _ => return "🏳".to_string(),
    };

    code.chars()
        .filter_map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect()
}

/// "just now", "12 min ago", "3 h ago", "2 d ago".
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{} min ago", s / 60),
        s if s < 86_400 => format!("{} h ago", s / 3_600),
        s => format!("{} d ago", s / 86_400),
    }
}

pub fn format_stamp(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%d %b %Y %H:%M:%S").to_string()
}

/// Whole years between `born` and `today`.
pub fn age_on(born: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}
