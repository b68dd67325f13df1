use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::EnumString;

/// One node of a bracket tree.
///
/// Leaf nodes carry rounds and matches; a node with `groups` is a
/// multi-stage container whose children are the individual stages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentBracket {
    pub name: Option<String>,
    pub requested_plotter: Option<String>,
    pub tournament: Option<TournamentBracketTournament>,
    #[serde(deserialize_with = "null_as_default")]
    pub rounds: Vec<TournamentBracketRound>,
    pub third_place_match: Option<TournamentBracketMatch>,
    #[serde(deserialize_with = "null_as_default")]
    pub matches_by_round: MatchesByRound,
    #[serde(deserialize_with = "null_as_default")]
    pub groups: Vec<TournamentBracket>,
    pub scorecard_html: Option<String>,
}

/// Tournament-wide settings embedded in the bracket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentBracketTournament {
    pub id: u64,
    pub tournament_id: Option<u64>,
    pub state: Option<String>,
    pub tournament_type: Option<String>,
    pub quick_advance: bool,
    pub hide_seeds: bool,
    pub hide_identifiers: bool,
    pub animated: bool,
    #[serde(rename = "accept_attachements", alias = "accept_attachments")]
    pub accept_attachments: bool,
    pub participant_count_to_advance: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub owner_ids: Vec<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub admin_ids: Vec<u64>,
    pub participants_swappable: bool,
    pub progress_meter: Option<u32>,
    pub group_stage_progress_meter: Option<u32>,
    pub grand_finals_modifier: Option<String>,
    pub predict_the_losers_bracket: Option<bool>,
}

/// A round header of a bracket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentBracketRound {
    pub id: Option<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub stage_type: String,
    pub stage_id: Option<u64>,
    pub number: i32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub best_of: Option<u32>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub group_index: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub title_lines: Vec<String>,
    pub href: Option<String>,
}

/// The kinds of stage a round can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumString, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    #[strum(to_string = "group_stage", serialize = "group stage")]
    GroupStage,
    #[strum(to_string = "tournament")]
    Tournament,
}

/// A single match, including its progression links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentBracketMatch {
    /// Absent for matches that have not been created server-side yet.
    pub id: Option<u64>,
    pub tournament_id: u64,
    pub identifier: u32,
    pub round: i32,
    pub state: MatchState,
    pub underway_at: Option<DateTime<FixedOffset>>,
    pub player1: Option<TournamentBracketPlayer>,
    pub player2: Option<TournamentBracketPlayer>,
    #[serde(rename = "player1_prereq_identifier")]
    pub player1_prerequisite_identifier: Option<u32>,
    #[serde(rename = "player2_prereq_identifier")]
    pub player2_prerequisite_identifier: Option<u32>,
    #[serde(rename = "player1_is_prereq_match_loser")]
    pub player1_is_prerequisite_match_loser: bool,
    #[serde(rename = "player2_is_prereq_match_loser")]
    pub player2_is_prerequisite_match_loser: bool,
    pub player1_placeholder_text: Option<String>,
    pub player2_placeholder_text: Option<String>,
    pub winner_id: Option<u64>,
    pub loser_id: Option<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub scores: Vec<i32>,
    #[serde(deserialize_with = "null_as_default")]
    pub games: Vec<Vec<i32>>,
    #[serde(deserialize_with = "null_as_default")]
    pub editable_by_user_ids: Vec<u64>,
    pub has_attachment: bool,
    pub is_group_match: bool,
    pub md5: Option<String>,
}

/// Progress of a match.
#[derive(
    Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize, EnumString, strum_macros::Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(from = "Option<String>", rename_all = "lowercase")]
pub enum MatchState {
    Pending,
    Open,
    Complete,
    #[default]
    #[strum(disabled)]
    Unknown,
}

impl From<Option<String>> for MatchState {
    fn from(value: Option<String>) -> Self {
        value
            .and_then(|state| state.parse().ok())
            .unwrap_or_default()
    }
}

/// A participant slot in a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentBracketPlayer {
    pub id: u64,
    pub seed: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
    pub portrait_url: Option<String>,
    pub participant_id: Option<u64>,
}

/// Matches keyed by round number, in the order the page listed the rounds.
///
/// Losers' bracket rounds use negative numbers. Slots may be `None` where the
/// page left a hole in the round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchesByRound(Vec<(i32, Vec<Option<TournamentBracketMatch>>)>);

impl MatchesByRound {
    pub fn new(rounds: Vec<(i32, Vec<Option<TournamentBracketMatch>>)>) -> Self {
        Self(rounds)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &[Option<TournamentBracketMatch>])> {
        self.0.iter().map(|(round, matches)| (*round, matches.as_slice()))
    }

    pub fn get(&self, round: i32) -> Option<&[Option<TournamentBracketMatch>]> {
        self.0
            .iter()
            .find(|(r, _)| *r == round)
            .map(|(_, matches)| matches.as_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for MatchesByRound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(round, matches)| (round.to_string(), matches)))
    }
}

impl<'de> Deserialize<'de> for MatchesByRound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RoundsVisitor;

        impl<'de> Visitor<'de> for RoundsVisitor {
            type Value = MatchesByRound;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of round numbers to match lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut rounds = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((round, matches)) =
                    map.next_entry::<String, Option<Vec<Option<TournamentBracketMatch>>>>()?
                {
                    let round = round
                        .trim()
                        .parse::<i32>()
                        .map_err(<A::Error as serde::de::Error>::custom)?;
                    rounds.push((round, matches.unwrap_or_default()));
                }
                Ok(MatchesByRound(rounds))
            }
        }

        deserializer.deserialize_map(RoundsVisitor)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
