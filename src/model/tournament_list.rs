use chrono::NaiveDate;
use serde::Serialize;

/// One page of a tournament listing table.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentListPage {
    pub page: u32,
    pub pages: u32,
    pub tournaments: Vec<TournamentListItem>,
}

/// A single row of a tournament listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TournamentListItem {
    pub name: String,
    pub url: String,
    pub game: Option<String>,
    pub tournament_type: String,
    pub participants: u32,
    pub created_on: NaiveDate,
    /// Completion percentage, 0 to 100.
    pub progress: u8,
}
