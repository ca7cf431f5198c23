use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::squad::{Player, parse_positions};

const UNKNOWN: &str = "Unknown";

const COL_ID: &str = "sofifa_id";
const COL_SHORT_NAME: &str = "short_name";
const COL_POSITIONS: &str = "player_positions";
const COL_OVERALL: &str = "overall";
const COL_LONG_NAME: &str = "long_name";
const COL_CLUB: &str = "club_name";
const COL_YEAR: &str = "year";
const COL_AGE: &str = "age";
const COL_DOB: &str = "dob";
const COL_POTENTIAL: &str = "potential";
const COL_VALUE: &str = "value_eur";
const COL_WAGE: &str = "wage_eur";
const COL_FACE_URL: &str = "player_face_url";

const KNOWN_COLUMNS: &[&str] = &[
    COL_ID,
    COL_SHORT_NAME,
    COL_POSITIONS,
    COL_OVERALL,
    COL_LONG_NAME,
    COL_CLUB,
    COL_YEAR,
    COL_AGE,
    COL_DOB,
    COL_POTENTIAL,
    COL_VALUE,
    COL_WAGE,
    COL_FACE_URL,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PositionCategory {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
    Other,
    Unknown,
}

impl PositionCategory {
    pub fn from_positions(raw: &str) -> Self {
        let s = raw.trim().to_ascii_uppercase();
        if s.is_empty() || s == "UNKNOWN" {
            return PositionCategory::Unknown;
        }
        if s.contains("GK") {
            PositionCategory::Goalkeeper
        } else if contains_any(&s, &["CB", "LB", "RB", "RWB", "LWB"]) {
            PositionCategory::Defender
        } else if contains_any(&s, &["CM", "CDM", "CAM", "LM", "RM"]) {
            PositionCategory::Midfielder
        } else if contains_any(&s, &["ST", "CF", "LW", "RW", "LF", "RF"]) {
            PositionCategory::Forward
        } else {
            PositionCategory::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PositionCategory::Goalkeeper => "Goalkeeper",
            PositionCategory::Defender => "Defender",
            PositionCategory::Midfielder => "Midfielder",
            PositionCategory::Forward => "Forward",
            PositionCategory::Other => "Other",
            PositionCategory::Unknown => "Unknown",
        }
    }
}

/// One player in one season.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub id: u32,
    pub short_name: String,
    pub long_name: String,
    pub club: String,
    pub year: i32,
    pub positions_raw: String,
    pub positions: Vec<String>,
    pub position_category: PositionCategory,
    pub overall: u32,
    pub potential: u32,
    pub age: u32,
    pub dob: Option<NaiveDate>,
    pub calculated_age: Option<i32>,
    pub value_eur: f64,
    pub wage_eur: f64,
    pub face_url: Option<String>,
    /// Indexed by `Dataset::attribute_names`.
    pub attributes: Vec<f64>,
}

impl PlayerRecord {
    pub fn to_player(&self, attribute_names: &[String]) -> Player {
        let mut secondary: BTreeMap<String, f64> = attribute_names
            .iter()
            .cloned()
            .zip(self.attributes.iter().copied())
            .collect();
        secondary.insert(COL_AGE.to_string(), self.age as f64);
        secondary.insert(COL_POTENTIAL.to_string(), self.potential as f64);
        secondary.insert(COL_VALUE.to_string(), self.value_eur);
        secondary.insert(COL_WAGE.to_string(), self.wage_eur);
        Player {
            id: self.id,
            display_name: self.short_name.clone(),
            eligible_positions: self.positions.clone(),
            rating: self.overall,
            secondary_attributes: secondary,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<PlayerRecord>,
    pub attribute_names: Vec<String>,
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let file = File::open(path).with_context(|| format!("open dataset {}", path.display()))?;
    let dataset = parse_dataset(file).with_context(|| format!("parse dataset {}", path.display()))?;
    log::info!(
        "loaded {} player rows ({} numeric attributes) from {}",
        dataset.records.len(),
        dataset.attribute_names.len(),
        path.display()
    );
    Ok(dataset)
}

pub fn parse_dataset<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .context("read csv header")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let col: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, h)| (h.as_str(), idx))
        .collect();
    let required = |name: &str| {
        col.get(name)
            .copied()
            .ok_or_else(|| anyhow!("missing required column '{name}'"))
    };
    let id_idx = required(COL_ID)?;
    let name_idx = required(COL_SHORT_NAME)?;
    let pos_idx = required(COL_POSITIONS)?;
    let overall_idx = required(COL_OVERALL)?;

    let rows = rdr
        .records()
        .enumerate()
        .map(|(line, row)| row.with_context(|| format!("read csv row {}", line + 2)))
        .collect::<Result<Vec<csv::StringRecord>>>()?;

    // Numeric attribute columns are every unknown column whose filled cells all parse.
    let attribute_columns: Vec<usize> = (0..headers.len())
        .filter(|idx| !KNOWN_COLUMNS.contains(&headers[*idx].as_str()))
        .filter(|idx| {
            rows.iter()
                .filter_map(|row| row.get(*idx))
                .filter(|cell| !cell.trim().is_empty())
                .all(|cell| parse_number(cell).is_some())
        })
        .collect();
    let attribute_names = attribute_columns
        .iter()
        .map(|idx| headers[*idx].clone())
        .collect();

    let cell = |row: &csv::StringRecord, name: &str| -> Option<String> {
        let idx = *col.get(name)?;
        let value = row.get(idx)?.trim();
        (!value.is_empty()).then(|| value.to_string())
    };
    let number = |row: &csv::StringRecord, name: &str| -> f64 {
        cell(row, name).and_then(|v| parse_number(&v)).unwrap_or(0.0)
    };

    let mut records = Vec::with_capacity(rows.len());
    for (line, row) in rows.iter().enumerate() {
        let id = row
            .get(id_idx)
            .and_then(parse_number)
            .ok_or_else(|| anyhow!("row {}: bad {COL_ID}", line + 2))? as u32;
        let short_name = row
            .get(name_idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string();
        let positions_raw = row
            .get(pos_idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string();
        let overall = row.get(overall_idx).and_then(parse_number).unwrap_or(0.0) as u32;
        let year = number(row, COL_YEAR) as i32;
        let dob = cell(row, COL_DOB).and_then(|v| parse_dob(&v));
        let calculated_age = dob.filter(|_| year > 0).map(|d| year - d.year());
        let positions = if positions_raw == UNKNOWN {
            Vec::new()
        } else {
            parse_positions(&positions_raw)
        };

        records.push(PlayerRecord {
            id,
            short_name,
            long_name: cell(row, COL_LONG_NAME).unwrap_or_else(|| UNKNOWN.to_string()),
            club: cell(row, COL_CLUB).unwrap_or_else(|| UNKNOWN.to_string()),
            year,
            position_category: PositionCategory::from_positions(&positions_raw),
            positions,
            positions_raw,
            overall,
            potential: number(row, COL_POTENTIAL) as u32,
            age: number(row, COL_AGE) as u32,
            dob,
            calculated_age,
            value_eur: number(row, COL_VALUE),
            wage_eur: number(row, COL_WAGE),
            face_url: cell(row, COL_FACE_URL),
            attributes: attribute_columns
                .iter()
                .map(|idx| row.get(*idx).and_then(parse_number).unwrap_or(0.0))
                .collect(),
        });
    }

    Ok(Dataset {
        records,
        attribute_names,
    })
}

impl Dataset {
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attribute_names.iter().position(|n| n == name)
    }

    /// Looks up a typed column first, then the generic numeric attributes.
    pub fn attribute(&self, record: &PlayerRecord, name: &str) -> Option<f64> {
        match name {
            COL_OVERALL => Some(record.overall as f64),
            COL_POTENTIAL => Some(record.potential as f64),
            COL_AGE => Some(record.age as f64),
            COL_VALUE => Some(record.value_eur),
            COL_WAGE => Some(record.wage_eur),
            _ => self
                .attribute_index(name)
                .and_then(|idx| record.attributes.get(idx).copied()),
        }
    }

    pub fn seasons(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.records.iter().map(|r| r.year).collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        years
    }

    pub fn season(&self, year: i32) -> Vec<&PlayerRecord> {
        self.records.iter().filter(|r| r.year == year).collect()
    }

    pub fn club(&self, year: i32, club: &str) -> Vec<&PlayerRecord> {
        self.records
            .iter()
            .filter(|r| r.year == year && r.club == club)
            .collect()
    }

    /// Clubs in a season with their player counts, biggest squads first.
    pub fn clubs_in_season(&self, year: i32) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for r in self.records.iter().filter(|r| r.year == year) {
            *counts.entry(r.club.as_str()).or_default() += 1;
        }
        let mut out: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(club, n)| (club.to_string(), n))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    pub fn search(&self, term: &str) -> Vec<&PlayerRecord> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.records.iter().collect();
        }
        self.records
            .iter()
            .filter(|r| {
                r.short_name.to_lowercase().contains(&needle)
                    || r.long_name.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn by_category(&self, category: PositionCategory) -> Vec<&PlayerRecord> {
        self.records
            .iter()
            .filter(|r| r.position_category == category)
            .collect()
    }

    pub fn player_history(&self, id: u32) -> Vec<&PlayerRecord> {
        let mut rows: Vec<&PlayerRecord> = self.records.iter().filter(|r| r.id == id).collect();
        rows.sort_by_key(|r| r.year);
        rows
    }

    pub fn roster(&self, records: &[&PlayerRecord]) -> Vec<Player> {
        records
            .iter()
            .map(|r| r.to_player(&self.attribute_names))
            .collect()
    }
}

fn contains_any(haystack: &str, codes: &[&str]) -> bool {
    codes.iter().any(|c| haystack.contains(c))
}

fn parse_number(raw: &str) -> Option<f64> {
    let v = raw.trim().parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

fn parse_dob(raw: &str) -> Option<NaiveDate> {
    let date = raw.split_whitespace().next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}
