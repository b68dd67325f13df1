use std::sync::LazyLock;

use ::scraper::Selector;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::error::{ChallongeError, Result};
use crate::model::{
    TournamentBracket, TournamentBracketPage, TournamentMetaList, TournamentPageDetails,
    TournamentTargetingKeyValues,
};
use crate::scraper::{select_single, select_text, Html, PageParser};

const START_TIME_FORMAT: &str = "%B %e, %Y at %I:%M %p";

static BRACKET_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#";\s*window\s*\.\s*_initialStoreState\s*\[\s*['"]TournamentStore['"]\s*\]\s*=\s*(?P<json>\{.*?\})\s*;"#,
    )
    .expect("valid regex")
});

static TARGETING_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r";\s*gon\s*\.\s*targetingKeyValues\s*=\s*(?P<json>\{.*?\})\s*;")
        .expect("valid regex")
});

/// Parses Challonge bracket pages.
///
/// The bracket itself is not in the markup: the page assigns it as JSON to
/// `window._initialStoreState['TournamentStore']` in an inline script.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlBracketPageParser;

impl PageParser for HtmlBracketPageParser {
    #[instrument(skip_all, fields(len = text.len()))]
    fn parse(&self, text: &str) -> Result<TournamentBracketPage> {
        let document = Html::parse_document(text);

        let targeting_key_values: TournamentTargetingKeyValues =
            extract_json(&document, &TARGETING_JSON, "targeting key values")?;
        let bracket: TournamentBracket = extract_json(&document, &BRACKET_JSON, "bracket")?;
        let page_content = parse_page_details(&document)?;
        let meta_list = parse_meta_list(&document)?;

        debug!(
            name = %page_content.name,
            groups = bracket.groups.len(),
            rounds = bracket.rounds.len(),
            "parsed bracket page"
        );

        Ok(TournamentBracketPage {
            page_content,
            bracket,
            targeting_key_values,
            meta_list,
        })
    }
}

/// Deserialize the object assigned by the one inline script matching `pattern`.
fn extract_json<T: DeserializeOwned>(
    document: &Html,
    pattern: &Regex,
    context: &'static str,
) -> Result<T> {
    let script_selector = Selector::parse("script")?;
    let found: Vec<String> = document
        .select(&script_selector)
        .filter_map(|script| {
            let source = script.inner_html();
            pattern
                .captures(&source)
                .and_then(|c| c.name("json"))
                .map(|m| m.as_str().to_string())
        })
        .collect();

    match found.as_slice() {
        [json] => {
            serde_json::from_str(json).map_err(|source| ChallongeError::Json { context, source })
        }
        _ => Err(ChallongeError::EmbeddedJson {
            context,
            count: found.len(),
        }),
    }
}

fn parse_page_details(document: &Html) -> Result<TournamentPageDetails> {
    let name_selector = Selector::parse("[data-tournament-name]")?;
    let name = select_single(document, &name_selector, "tournament name")?
        .value()
        .attr("data-tournament-name")
        .unwrap_or_default()
        .to_string();

    let url_selector = Selector::parse("meta[property='og:url']")?;
    let url = select_single(document, &url_selector, "og:url meta tag")?
        .value()
        .attr("content")
        .ok_or(ChallongeError::ElementNotFound {
            context: "og:url content",
        })?
        .to_string();

    Ok(TournamentPageDetails { name, url })
}

fn parse_meta_list(document: &Html) -> Result<TournamentMetaList> {
    let root = document.root_element();

    let game_selector = Selector::parse(".meta-list a")?;
    let game = Some(select_text(&root, &game_selector)).filter(|g| !g.is_empty());

    let start_time_selector = Selector::parse(".meta-list #start-time")?;
    let start_time = parse_start_time(&select_text(&root, &start_time_selector));

    Ok(TournamentMetaList { game, start_time })
}

/// Parse `March 3, 2020 at 7:00 PM -5`; the trailing offset is in hours and
/// may carry minutes (`+05:30`, `+0530`).
fn parse_start_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    let (local, offset) = raw.trim().rsplit_once(char::is_whitespace)?;
    let offset = parse_offset(offset)?;
    let local = NaiveDateTime::parse_from_str(local.trim(), START_TIME_FORMAT).ok()?;
    offset.from_local_datetime(&local).single()
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let (sign, digits) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() > 2 => digits.split_at(digits.len() - 2),
        None => (digits, "0"),
    };
    let seconds = hours.parse::<i32>().ok()? * 3600 + minutes.parse::<i32>().ok()? * 60;
    FixedOffset::east_opt(sign * seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const BRACKET: &str = r#"{"name":"Main","rounds":[{"stage_type":"tournament","number":1}],"matches_by_round":{"1":[{"id":null,"identifier":1,"player1":{"id":10,"display_name":"Ada"},"player2":{"id":11,"display_name":"Bo"}}]},"third_place_match":null,"groups":[]}"#;

    fn page(scripts: &[String], extra: &str) -> String {
        let scripts: String = scripts
            .iter()
            .map(|s| format!("<script>{s}</script>"))
            .collect();
        format!(
            r#"<html><head><meta property="og:url" content="https://challonge.com/cup">{scripts}</head>
            <body><div data-tournament-name="Spring Cup"></div>
            <div class="meta-list"><a href="/games/1">Tekken 8</a><span id="start-time">March 3, 2020 at 7:00 PM -5</span></div>
            {extra}</body></html>"#
        )
    }

    fn scripts() -> Vec<String> {
        vec![
            r#"var gon={};gon.targetingKeyValues={"game":"tekken"};"#.to_string(),
            format!("window._initialStoreState = {{}};window._initialStoreState['TournamentStore'] = {BRACKET};"),
        ]
    }

    #[test]
    fn parses_complete_page() {
        let parsed = HtmlBracketPageParser.parse(&page(&scripts(), "")).unwrap();

        assert_eq!(parsed.page_content.name, "Spring Cup");
        assert_eq!(parsed.page_content.url, "https://challonge.com/cup");
        assert_eq!(parsed.targeting_key_values["game"], "tekken");
        assert_eq!(parsed.bracket.name.as_deref(), Some("Main"));
        assert_eq!(parsed.bracket.matches().count(), 1);
        assert_eq!(parsed.bracket.matches().next().unwrap().id, None);
        assert_eq!(parsed.meta_list.game.as_deref(), Some("Tekken 8"));

        let start = parsed.meta_list.start_time.unwrap();
        assert_eq!((start.year(), start.month(), start.day()), (2020, 3, 3));
        assert_eq!(start.hour(), 19);
        assert_eq!(start.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn missing_bracket_script_is_an_error() {
        let scripts = scripts();
        assert!(matches!(
            HtmlBracketPageParser.parse(&page(&scripts[..1], "")),
            Err(ChallongeError::EmbeddedJson { context: "bracket", count: 0 })
        ));
    }

    #[test]
    fn duplicated_bracket_script_is_an_error() {
        let mut scripts = scripts();
        scripts.push(scripts[1].clone());
        assert!(matches!(
            HtmlBracketPageParser.parse(&page(&scripts, "")),
            Err(ChallongeError::EmbeddedJson { count: 2, .. })
        ));
    }

    #[test]
    fn malformed_bracket_json_is_an_error() {
        let mut scripts = scripts();
        scripts[1] =
            "x;window._initialStoreState['TournamentStore'] = {\"rounds\": 5};".to_string();
        assert!(matches!(
            HtmlBracketPageParser.parse(&page(&scripts, "")),
            Err(ChallongeError::Json { context: "bracket", .. })
        ));
    }

    #[test]
    fn duplicated_tournament_name_is_an_error() {
        let extra = r#"<span data-tournament-name="Other"></span>"#;
        assert!(matches!(
            HtmlBracketPageParser.parse(&page(&scripts(), extra)),
            Err(ChallongeError::AmbiguousElement { count: 2, .. })
        ));
    }

    #[test]
    fn start_time_formats() {
        let t = parse_start_time("January 12, 2021 at 10:30 AM +5:30").unwrap();
        assert_eq!(t.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
        assert_eq!((t.hour(), t.minute()), (10, 30));

        assert!(parse_start_time("January 12, 2021 at 10:30 AM +0100").is_some());
        assert!(parse_start_time("January 12, 2021 at 10:30 AM EST").is_none());
        assert!(parse_start_time("").is_none());
    }

    #[test]
    fn patterns_compile() {
        LazyLock::force(&BRACKET_JSON);
        LazyLock::force(&TARGETING_JSON);
    }
}
