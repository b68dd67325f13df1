use itertools::Itertools;

use crate::error::{ChallongeError, Result};
use crate::model::{
    StageType, TournamentBracket, TournamentBracketMatch, TournamentBracketPage,
    TournamentBracketPlayer, TournamentBracketResponse,
};

impl TournamentBracket {
    /// This node followed by every descendant group, depth first.
    ///
    /// Parents come before their children and siblings keep their stored order.
    pub fn brackets(&self) -> impl Iterator<Item = &TournamentBracket> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let bracket = stack.pop()?;
            stack.extend(bracket.groups.iter().rev());
            Some(bracket)
        })
    }

    /// The third place match, then every match by round, skipping empty slots.
    pub fn matches(&self) -> impl Iterator<Item = &TournamentBracketMatch> {
        self.third_place_match.iter().chain(
            self.matches_by_round
                .iter()
                .flat_map(|(_, matches)| matches.iter().flatten()),
        )
    }

    /// Every match of this node and all of its descendant groups.
    pub fn all_matches(&self) -> impl Iterator<Item = &TournamentBracketMatch> {
        self.brackets().flat_map(|b| b.matches())
    }

    /// Whether the tournament has more than one competitive phase.
    ///
    /// Explicit groups are the structural signal; group-stage matches without
    /// any grouping are the other.
    pub fn is_multi_stage(&self) -> bool {
        !self.groups.is_empty() || self.all_matches().any(|m| m.is_group_match)
    }

    /// The one stage type shared by all rounds of this node.
    pub fn single_stage_type(&self) -> Result<&str> {
        let stage_types = self
            .rounds
            .iter()
            .map(|r| r.stage_type.as_str())
            .unique()
            .collect_vec();
        match stage_types.as_slice() {
            [stage_type] => Ok(*stage_type),
            _ => Err(ChallongeError::StageType {
                found: stage_types.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }

    pub fn is_group_stage(&self) -> Result<bool> {
        self.is_stage(StageType::GroupStage)
    }

    pub fn is_tournament(&self) -> Result<bool> {
        self.is_stage(StageType::Tournament)
    }

    fn is_stage(&self, expected: StageType) -> Result<bool> {
        let stage_type = self.single_stage_type()?;
        Ok(stage_type.parse::<StageType>().ok() == Some(expected))
    }
}

/// Both players of every match, without empty slots, once per player id.
///
/// The first occurrence of each id wins and order of first appearance is kept.
pub fn distinct_players<'a, I>(matches: I) -> impl Iterator<Item = &'a TournamentBracketPlayer>
where
    I: IntoIterator<Item = &'a TournamentBracketMatch>,
{
    matches
        .into_iter()
        .flat_map(|m| [m.player1.as_ref(), m.player2.as_ref()])
        .flatten()
        .unique_by(|p| p.id)
}

impl TournamentBracketPage {
    pub fn is_multi_stage(&self) -> bool {
        self.bracket.is_multi_stage()
    }
}

impl TournamentBracketResponse {
    pub fn is_multi_stage(&self) -> bool {
        self.bracket.is_multi_stage()
    }

    /// Distinct players across the whole bracket tree.
    pub fn players(&self) -> Vec<&TournamentBracketPlayer> {
        distinct_players(self.bracket.all_matches()).collect()
    }
}
