use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::squad::{Formation, Slot};

pub const DEFAULT_FORMATION: &str = "4-3-3";

/// Keeper, back four, three central midfielders, two wingers and a striker.
pub fn four_three_three() -> Formation {
    Formation::new(
        DEFAULT_FORMATION,
        vec![
            Slot::new("GK", 1, &["GK"]),
            Slot::new("LB", 1, &["LB", "LWB"]),
            Slot::new("CB", 2, &["CB"]),
            Slot::new("RB", 1, &["RB", "RWB"]),
            Slot::new("CM", 3, &["CM", "CDM", "CAM"]),
            Slot::new("LW", 1, &["LW", "LM"]),
            Slot::new("ST", 1, &["ST", "CF"]),
            Slot::new("RW", 1, &["RW", "RM"]),
        ],
    )
}

pub fn load_formation(path: &Path) -> Result<Formation> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read formation {}", path.display()))?;
    parse_formation_json(&raw).with_context(|| format!("parse formation {}", path.display()))
}

pub fn parse_formation_json(raw: &str) -> Result<Formation> {
    let mut formation: Formation = serde_json::from_str(raw).context("formation json")?;
    for slot in &mut formation.slots {
        for code in &mut slot.eligible_position_codes {
            *code = code.trim().to_ascii_uppercase();
        }
    }
    formation.validate()?;
    Ok(formation)
}
