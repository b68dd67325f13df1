pub(crate) mod bracket_page;
pub(crate) mod tournament_list;

use std::borrow::Cow;

pub(crate) use ::scraper::Html;
use ::scraper::{ElementRef, Selector};

use crate::error::{ChallongeError, Result};
use crate::model::TournamentBracketPage;

pub use bracket_page::HtmlBracketPageParser;
pub use tournament_list::parse_tournament_list_page;

/// Turns the text of a bracket page into structured data.
pub trait PageParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<TournamentBracketPage>;
}

/// Decode page bytes as UTF-8, skipping a byte order mark.
pub(crate) fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
}

/// Extract trimmed text content from the first element matching `selector`
/// inside `element`. Returns an empty string if nothing matches.
pub(crate) fn select_text(element: &ElementRef, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(|e| element_text(&e))
        .unwrap_or_default()
}

/// All text below `element`, with surrounding whitespace trimmed.
pub(crate) fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// The only element in `document` matching `selector`.
pub(crate) fn select_single<'a>(
    document: &'a Html,
    selector: &Selector,
    context: &'static str,
) -> Result<ElementRef<'a>> {
    let mut matches = document.select(selector);
    let first = matches
        .next()
        .ok_or(ChallongeError::ElementNotFound { context })?;
    let rest = matches.count();
    if rest > 0 {
        return Err(ChallongeError::AmbiguousElement {
            context,
            count: rest + 1,
        });
    }
    Ok(first)
}
