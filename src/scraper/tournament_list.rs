use std::collections::HashMap;
use std::sync::LazyLock;

use ::scraper::{ElementRef, Selector};
use chrono::NaiveDate;
use itertools::Itertools;
use regex::Regex;
use tracing::{debug, instrument};

use crate::error::{ChallongeError, Result};
use crate::model::{TournamentListItem, TournamentListPage};
use crate::scraper::{element_text, Html};

const CREATED_ON_FORMAT: &str = "%m-%d-%y";

/// Listings show an en dash when a tournament has no game.
const NO_GAME: &str = "–";

static PROGRESS_WIDTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*width\s*:\s*(?P<width>[0-9]+)\s*%\s*;?\s*$")
        .expect("valid regex")
});

static PAGE_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?page=(?P<page>[0-9]+)$").expect("valid regex"));

mod column {
    pub(super) const NAME: &str = "name";
    pub(super) const GAME: &str = "game";
    pub(super) const TYPE: &str = "type";
    pub(super) const PARTICIPANTS: &str = "participants";
    pub(super) const CREATED_ON: &str = "created on";
    pub(super) const PROGRESS: &str = "progress";
}

/// Parse a page of a Challonge tournament listing.
#[instrument(skip_all, fields(len = html.len()))]
pub fn parse_tournament_list_page(html: &str) -> Result<TournamentListPage> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let table_selector = Selector::parse("table")?;
    let header_selector = Selector::parse("thead > tr")?;
    let (table, header) = document
        .select(&table_selector)
        .find_map(|table| table.select(&header_selector).next().map(|h| (table, h)))
        .ok_or(ChallongeError::ElementNotFound {
            context: "tournament table",
        })?;

    let tournaments = parse_rows(&table, &header)?;
    let pages = last_page(&root)?;
    let page = active_page(&root)?.unwrap_or(1);

    debug!(count = tournaments.len(), page, pages, "parsed tournament list");

    Ok(TournamentListPage {
        page,
        pages,
        tournaments,
    })
}

fn parse_rows(table: &ElementRef, header: &ElementRef) -> Result<Vec<TournamentListItem>> {
    let th_selector = Selector::parse("th")?;
    let columns: HashMap<String, usize> = header
        .select(&th_selector)
        .enumerate()
        .map(|(i, th)| (element_text(&th).to_lowercase(), i))
        .collect();

    let row_selector = Selector::parse("tbody > tr")?;
    let td_selector = Selector::parse("td")?;
    table
        .select(&row_selector)
        .map(|row| parse_row(&row.select(&td_selector).collect_vec(), &columns))
        .collect()
}

fn parse_row(cells: &[ElementRef], columns: &HashMap<String, usize>) -> Result<TournamentListItem> {
    let cell = move |name: &'static str| {
        columns
            .get(name)
            .and_then(|&i| cells.get(i))
            .ok_or(ChallongeError::ElementNotFound { context: name })
    };

    let name_cell = cell(column::NAME)?;
    let link_selector = Selector::parse("a")?;
    let url = name_cell
        .select(&link_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .ok_or(ChallongeError::ElementNotFound {
            context: "tournament link",
        })?
        .to_string();

    let game = element_text(cell(column::GAME)?);
    let game = (!game.is_empty() && game != NO_GAME).then_some(game);

    let created_on =
        NaiveDate::parse_from_str(&element_text(cell(column::CREATED_ON)?), CREATED_ON_FORMAT)?;

    let progress_selector = Selector::parse(".progress-bar")?;
    let progress = cell(column::PROGRESS)?
        .select(&progress_selector)
        .next()
        .and_then(|bar| bar.value().attr("style"))
        .and_then(|style| PROGRESS_WIDTH.captures(style))
        .and_then(|c| c.name("width"))
        .ok_or(ChallongeError::ElementNotFound {
            context: "progress bar width",
        })?
        .as_str()
        .parse::<u8>()?;

    Ok(TournamentListItem {
        name: element_text(name_cell),
        url,
        game,
        tournament_type: element_text(cell(column::TYPE)?),
        participants: element_text(cell(column::PARTICIPANTS)?).parse::<u32>()?,
        created_on,
        progress,
    })
}

/// The page a pagination link points at: `/` is page one, otherwise `?page=N`.
fn link_page(element: &ElementRef) -> Result<Option<u32>> {
    let link_selector = Selector::parse("a")?;
    let Some(href) = element
        .select(&link_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
    else {
        return Ok(None);
    };
    if href == "/" {
        return Ok(Some(1));
    }
    match PAGE_QUERY.captures(href).and_then(|c| c.name("page")) {
        Some(page) => Ok(Some(page.as_str().parse::<u32>()?)),
        None => Ok(None),
    }
}

fn last_page(root: &ElementRef) -> Result<u32> {
    let last_selector = Selector::parse(".last")?;
    if let Some(last) = root.select(&last_selector).next() {
        if let Some(page) = link_page(&last)? {
            return Ok(page);
        }
    }

    let page_selector = Selector::parse(".page")?;
    let pages: Vec<Option<u32>> = root
        .select(&page_selector)
        .map(|e| link_page(&e))
        .collect::<Result<_>>()?;
    Ok(pages.into_iter().flatten().max().unwrap_or(1))
}

fn active_page(root: &ElementRef) -> Result<Option<u32>> {
    let active_selector = Selector::parse(".page.active")?;
    match root.select(&active_selector).next() {
        Some(active) => link_page(&active),
        None => Ok(None),
    }
}
