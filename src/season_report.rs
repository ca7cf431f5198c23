use serde::Serialize;

use crate::club_report::{TopPlayer, top_by_overall};
use crate::dataset::{Dataset, PlayerRecord};

pub const SEASON_TOP_PLAYERS: usize = 20;
pub const POTENTIAL_GAP_LIMIT: usize = 10;
pub const SCATTER_TOP: usize = 10;

/// How one player's overall rating moved across the seasons on record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareerSummary {
    pub id: u32,
    pub name: String,
    pub years_tracked: usize,
    pub first_year: i32,
    pub first_overall: u32,
    pub current_year: i32,
    pub current_overall: u32,
    pub change: i64,
    pub peak_overall: u32,
    /// Earliest season that reached the peak.
    pub peak_year: i32,
    pub avg_overall: f64,
}

impl CareerSummary {
    /// `history` must be one player's rows in season order, as
    /// `Dataset::player_history` returns them.
    pub fn from_history(history: &[&PlayerRecord]) -> Option<Self> {
        let first = *history.first()?;
        let last = *history.last()?;

        let mut peak = first;
        for r in history.iter().skip(1) {
            if r.overall > peak.overall {
                peak = *r;
            }
        }
        let total: f64 = history.iter().map(|r| r.overall as f64).sum();

        Some(Self {
            id: last.id,
            name: last.short_name.clone(),
            years_tracked: history.len(),
            first_year: first.year,
            first_overall: first.overall,
            current_year: last.year,
            current_overall: last.overall,
            change: i64::from(last.overall) - i64::from(first.overall),
            peak_overall: peak.overall,
            peak_year: peak.year,
            avg_overall: total / history.len() as f64,
        })
    }
}

pub fn career_summary(dataset: &Dataset, id: u32) -> Option<CareerSummary> {
    CareerSummary::from_history(&dataset.player_history(id))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PotentialGap {
    pub id: u32,
    pub name: String,
    pub overall: u32,
    pub potential: u32,
    pub gap: i64,
    pub age: u32,
}

/// Players with the most room to grow (`potential - overall`), largest gap
/// first. Equal gaps keep input order.
pub fn potential_gaps(records: &[&PlayerRecord], n: usize) -> Vec<PotentialGap> {
    let mut gaps: Vec<PotentialGap> = records
        .iter()
        .map(|r| PotentialGap {
            id: r.id,
            name: r.short_name.clone(),
            overall: r.overall,
            potential: r.potential,
            gap: i64::from(r.potential) - i64::from(r.overall),
            age: r.age,
        })
        .collect();
    gaps.sort_by(|a, b| b.gap.cmp(&a.gap));
    gaps.truncate(n);
    gaps
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Earner {
    pub id: u32,
    pub name: String,
    pub amount_eur: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonOverview {
    pub year: i32,
    pub players: usize,
    pub avg_value_eur: f64,
    pub avg_wage_eur: f64,
    pub max_value_eur: f64,
    pub max_wage_eur: f64,
    pub top_by_value: Earner,
    pub top_by_wage: Earner,
    pub top_players: Vec<TopPlayer>,
}

impl SeasonOverview {
    pub fn from_records(year: i32, records: &[&PlayerRecord]) -> Option<Self> {
        let n = records.len() as f64;
        let top_by_value = top_earner(records, |r| r.value_eur)?;
        let top_by_wage = top_earner(records, |r| r.wage_eur)?;
        let top_players = top_by_overall(records, SEASON_TOP_PLAYERS)
            .into_iter()
            .map(|r| TopPlayer {
                id: r.id,
                name: r.short_name.clone(),
                overall: r.overall,
            })
            .collect();

        Some(Self {
            year,
            players: records.len(),
            avg_value_eur: records.iter().map(|r| r.value_eur).sum::<f64>() / n,
            avg_wage_eur: records.iter().map(|r| r.wage_eur).sum::<f64>() / n,
            max_value_eur: top_by_value.amount_eur,
            max_wage_eur: top_by_wage.amount_eur,
            top_by_value,
            top_by_wage,
            top_players,
        })
    }
}

pub fn season_overview(dataset: &Dataset, year: i32) -> Option<SeasonOverview> {
    SeasonOverview::from_records(year, &dataset.season(year))
}

// First record wins on ties.
fn top_earner(records: &[&PlayerRecord], amount: impl Fn(&PlayerRecord) -> f64) -> Option<Earner> {
    let mut best = *records.first()?;
    for r in records.iter().skip(1) {
        if amount(*r) > amount(best) {
            best = *r;
        }
    }
    Some(Earner {
        id: best.id,
        name: best.short_name.clone(),
        amount_eur: amount(best),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub id: u32,
    pub name: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterStats {
    pub x_attribute: String,
    pub y_attribute: String,
    pub points: usize,
    pub mean_x: f64,
    pub mean_y: f64,
    /// Pearson coefficient; `None` below two points or when either side is constant.
    pub correlation: Option<f64>,
    pub top_by_x: Vec<ScatterPoint>,
    pub top_by_y: Vec<ScatterPoint>,
}

/// Summary of two attributes plotted against each other. Records lacking
/// either attribute are left out; `None` when nothing is left.
pub fn scatter_stats(
    dataset: &Dataset,
    records: &[&PlayerRecord],
    x_attribute: &str,
    y_attribute: &str,
    top_n: usize,
) -> Option<ScatterStats> {
    let points: Vec<ScatterPoint> = records
        .iter()
        .filter_map(|r| {
            Some(ScatterPoint {
                id: r.id,
                name: r.short_name.clone(),
                x: dataset.attribute(r, x_attribute)?,
                y: dataset.attribute(r, y_attribute)?,
            })
        })
        .collect();
    if points.is_empty() {
        return None;
    }

    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();

    let mut by_x = points.clone();
    by_x.sort_by(|a, b| b.x.total_cmp(&a.x));
    by_x.truncate(top_n);
    let mut by_y = points;
    by_y.sort_by(|a, b| b.y.total_cmp(&a.y));
    by_y.truncate(top_n);

    Some(ScatterStats {
        x_attribute: x_attribute.to_string(),
        y_attribute: y_attribute.to_string(),
        points: xs.len(),
        mean_x: mean(&xs),
        mean_y: mean(&ys),
        correlation: pearson(&xs, &ys),
        top_by_x: by_x,
        top_by_y: by_y,
    })
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let (mx, my) = (mean(xs), mean(ys));
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}
