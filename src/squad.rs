use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SquadError {
    #[error("invalid formation: {0}")]
    InvalidFormation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub display_name: String,
    /// Uppercase position codes, first occurrence order, no duplicates.
    pub eligible_positions: Vec<String>,
    pub rating: u32,
    #[serde(default)]
    pub secondary_attributes: BTreeMap<String, f64>,
}

impl Player {
    pub fn new(id: u32, display_name: impl Into<String>, positions: &str, rating: u32) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            eligible_positions: parse_positions(positions),
            rating,
            secondary_attributes: BTreeMap::new(),
        }
    }

    pub fn can_play(&self, slot: &Slot) -> bool {
        self.eligible_positions
            .iter()
            .any(|code| slot.eligible_position_codes.iter().any(|c| c == code))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub label: String,
    pub required_count: u32,
    pub eligible_position_codes: Vec<String>,
}

impl Slot {
    pub fn new(label: &str, required_count: u32, codes: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            required_count,
            eligible_position_codes: codes.iter().map(|c| c.trim().to_ascii_uppercase()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Formation {
    pub name: String,
    pub slots: Vec<Slot>,
}

impl Formation {
    pub fn new(name: impl Into<String>, slots: Vec<Slot>) -> Self {
        Self {
            name: name.into(),
            slots,
        }
    }

    pub fn squad_size(&self) -> u64 {
        self.slots.iter().map(|s| u64::from(s.required_count)).sum()
    }

    pub fn validate(&self) -> Result<(), SquadError> {
        if self.slots.is_empty() {
            return Err(SquadError::InvalidFormation(format!(
                "formation '{}' has no slots",
                self.name
            )));
        }
        let mut labels = HashSet::new();
        for slot in &self.slots {
            if slot.required_count == 0 {
                return Err(SquadError::InvalidFormation(format!(
                    "slot '{}' requires no players",
                    slot.label
                )));
            }
            if !labels.insert(slot.label.as_str()) {
                return Err(SquadError::InvalidFormation(format!(
                    "slot label '{}' is declared twice",
                    slot.label
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotPick<'a> {
    pub label: String,
    pub required_count: u32,
    pub players: Vec<&'a Player>,
}

impl SlotPick<'_> {
    pub fn is_filled(&self) -> bool {
        self.players.len() >= self.required_count as usize
    }
}

/// Players chosen per slot, in formation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment<'a> {
    pub slots: Vec<SlotPick<'a>>,
}

impl<'a> Assignment<'a> {
    pub(crate) fn from_picks(
        roster: &'a [Player],
        formation: &Formation,
        picks: &[Vec<usize>],
    ) -> Self {
        let slots = formation
            .slots
            .iter()
            .zip(picks)
            .map(|(slot, idxs)| SlotPick {
                label: slot.label.clone(),
                required_count: slot.required_count,
                players: idxs.iter().filter_map(|&i| roster.get(i)).collect(),
            })
            .collect();
        Self { slots }
    }

    pub fn get(&self, label: &str) -> Option<&[&'a Player]> {
        self.slots
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.players.as_slice())
    }

    pub fn placed(&self) -> impl Iterator<Item = &'a Player> + '_ {
        self.slots.iter().flat_map(|s| s.players.iter().copied())
    }

    pub fn placed_count(&self) -> usize {
        self.slots.iter().map(|s| s.players.len()).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(SlotPick::is_filled)
    }

    pub fn team_rating(&self) -> f64 {
        team_rating(self)
    }
}

/// Fills the formation's slots greedily in declared order. Each slot takes its
/// highest-rated unused eligible players; equal ratings keep roster order.
pub fn select<'a>(roster: &'a [Player], formation: &Formation) -> Result<Assignment<'a>, SquadError> {
    let picks = pick_indices(roster, formation)?;
    Ok(Assignment::from_picks(roster, formation, &picks))
}

pub(crate) fn pick_indices(
    roster: &[Player],
    formation: &Formation,
) -> Result<Vec<Vec<usize>>, SquadError> {
    formation.validate()?;

    let mut used: HashSet<u32> = HashSet::new();
    let mut picks = Vec::with_capacity(formation.slots.len());

    for slot in &formation.slots {
        let mut candidates: Vec<usize> = roster
            .iter()
            .enumerate()
            .filter(|(_, p)| !used.contains(&p.id) && p.can_play(slot))
            .map(|(idx, _)| idx)
            .collect();
        // sort_by is stable, so roster order breaks rating ties.
        candidates.sort_by(|&a, &b| roster[b].rating.cmp(&roster[a].rating));

        let wanted = (slot.required_count as usize).min(candidates.len());
        let mut chosen = Vec::with_capacity(wanted);
        for idx in candidates {
            if chosen.len() >= wanted {
                break;
            }
            // A roster may list the same id twice; the first pick wins.
            if used.insert(roster[idx].id) {
                chosen.push(idx);
            }
        }
        if chosen.len() < slot.required_count as usize {
            log::debug!(
                "slot {} filled {}/{}",
                slot.label,
                chosen.len(),
                slot.required_count
            );
        }
        picks.push(chosen);
    }

    Ok(picks)
}

/// Unweighted mean rating of every placed player, rounded to one decimal
/// (half to even). Zero when nobody was placed.
pub fn team_rating(assignment: &Assignment<'_>) -> f64 {
    let ratings: Vec<f64> = assignment.placed().map(|p| p.rating as f64).collect();
    if ratings.is_empty() {
        return 0.0;
    }
    let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
    (mean * 10.0).round_ties_even() / 10.0
}

pub fn parse_positions(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in raw.split(',') {
        let code = token.trim().to_ascii_uppercase();
        if code.is_empty() || out.contains(&code) {
            continue;
        }
        out.push(code);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_slot(label: &str, codes: &[&str]) -> Formation {
        Formation::new("test", vec![Slot::new(label, 1, codes)])
    }

    #[test]
    fn parse_positions_normalizes_tokens() {
        assert_eq!(parse_positions("lw, ST,LW ,, cf"), vec!["LW", "ST", "CF"]);
        assert!(parse_positions("").is_empty());
    }

    #[test]
    fn eligibility_is_token_match_not_substring() {
        let wing_back = Player::new(1, "Wingback", "LWB", 80);
        assert!(!wing_back.can_play(&Slot::new("LW", 1, &["LW", "LM"])));
        assert!(wing_back.can_play(&Slot::new("LB", 1, &["LB", "LWB"])));
    }

    #[test]
    fn higher_rating_wins_slot() {
        let roster = vec![Player::new(2, "B", "ST,CF", 85), Player::new(1, "A", "ST", 90)];
        let formation = single_slot("ST", &["ST", "CF"]);
        let assignment = select(&roster, &formation).unwrap();
        let st = assignment.get("ST").unwrap();
        assert_eq!(st.len(), 1);
        assert_eq!(st[0].id, 1);
        assert_eq!(team_rating(&assignment), 90.0);
    }

    #[test]
    fn empty_formation_is_rejected() {
        let err = select(&[], &Formation::new("none", Vec::new())).unwrap_err();
        assert!(matches!(err, SquadError::InvalidFormation(_)));
    }

    #[test]
    fn zero_count_slot_is_rejected() {
        let formation = Formation::new("bad", vec![Slot::new("GK", 0, &["GK"])]);
        assert!(formation.validate().is_err());
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let formation = Formation::new(
            "dup",
            vec![Slot::new("CB", 1, &["CB"]), Slot::new("CB", 1, &["CB"])],
        );
        assert!(matches!(
            formation.validate(),
            Err(SquadError::InvalidFormation(_))
        ));
    }

    #[test]
    fn duplicate_roster_ids_are_placed_once() {
        let roster = vec![Player::new(7, "A", "CB", 80), Player::new(7, "A again", "CB", 80)];
        let formation = Formation::new("x", vec![Slot::new("CB", 2, &["CB"])]);
        let assignment = select(&roster, &formation).unwrap();
        assert_eq!(assignment.placed_count(), 1);
        assert!(!assignment.is_complete());
    }

    #[test]
    fn team_rating_rounds_half_to_even() {
        let roster = vec![
            Player::new(1, "A", "CB", 85),
            Player::new(2, "B", "CB", 85),
            Player::new(3, "C", "CB", 85),
            Player::new(4, "D", "CB", 86),
        ];
        let formation = Formation::new("x", vec![Slot::new("CB", 4, &["CB"])]);
        let assignment = select(&roster, &formation).unwrap();
        // mean 85.25
        assert_eq!(assignment.team_rating(), 85.2);
    }
}
