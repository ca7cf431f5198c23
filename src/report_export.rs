use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::club_report::{ClubSummary, top_by_overall};
use crate::dataset::PlayerRecord;
use crate::squad::Assignment;

const SQUAD_SHEET_ROWS: usize = 15;

pub struct ExportReport {
    pub summary_rows: usize,
    pub lineup_rows: usize,
    pub squad_rows: usize,
}

pub fn export_club_report(
    path: &Path,
    club: &str,
    year: i32,
    summary: &ClubSummary,
    assignment: &Assignment<'_>,
    squad: &[&PlayerRecord],
) -> Result<ExportReport> {
    let summary_rows = summary_rows(club, year, summary, assignment);
    let lineup_rows = lineup_rows(assignment);
    let squad_rows = squad_rows(squad);

    let mut workbook = Workbook::new();
    add_sheet(&mut workbook, "Summary", &summary_rows)?;
    add_sheet(&mut workbook, "Best XI", &lineup_rows)?;
    add_sheet(&mut workbook, "Squad", &squad_rows)?;
    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;

    log::info!("wrote club report for {club} ({year}) to {}", path.display());
    Ok(ExportReport {
        summary_rows: summary_rows.len().saturating_sub(1),
        lineup_rows: lineup_rows.len().saturating_sub(1),
        squad_rows: squad_rows.len().saturating_sub(1),
    })
}

fn summary_rows(
    club: &str,
    year: i32,
    summary: &ClubSummary,
    assignment: &Assignment<'_>,
) -> Vec<Vec<String>> {
    let profile = summary.age_profile;
    let mut rows = vec![
        vec!["Metric".to_string(), "Value".to_string()],
        vec!["Club".to_string(), club.to_string()],
        vec!["Season".to_string(), year.to_string()],
        vec!["Squad Size".to_string(), summary.squad_size.to_string()],
        vec!["Avg Overall".to_string(), format!("{:.1}", summary.avg_overall)],
        vec!["Avg Age".to_string(), format!("{:.1}", summary.avg_age)],
        vec![
            "Total Value".to_string(),
            format!("€{:.1}M", summary.total_value_eur / 1_000_000.0),
        ],
        vec![
            "Top Player".to_string(),
            format!("{} ({})", summary.top_player.name, summary.top_player.overall),
        ],
        vec![
            "Team Rating".to_string(),
            format!("{:.1}", assignment.team_rating()),
        ],
        vec![
            "Young (< 23)".to_string(),
            share_cell(profile.young, summary.share(profile.young)),
        ],
        vec![
            "Prime (23-29)".to_string(),
            share_cell(profile.prime, summary.share(profile.prime)),
        ],
        vec![
            "Veteran (> 29)".to_string(),
            share_cell(profile.veteran, summary.share(profile.veteran)),
        ],
    ];
    for (category, count) in &summary.depth {
        rows.push(vec![
            category.label().to_string(),
            share_cell(*count, summary.share(*count)),
        ]);
    }
    rows
}

fn share_cell(count: usize, pct: f64) -> String {
    format!("{count} players ({pct:.1}%)")
}

fn lineup_rows(assignment: &Assignment<'_>) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Slot".to_string(),
        "Player ID".to_string(),
        "Player".to_string(),
        "Positions".to_string(),
        "Overall".to_string(),
    ]];
    for slot in &assignment.slots {
        if slot.players.is_empty() {
            rows.push(vec![slot.label.clone(), String::new(), "-".to_string(), String::new(), String::new()]);
            continue;
        }
        for player in &slot.players {
            rows.push(vec![
                slot.label.clone(),
                player.id.to_string(),
                player.display_name.clone(),
                player.eligible_positions.join(", "),
                player.rating.to_string(),
            ]);
        }
    }
    rows
}

fn squad_rows(squad: &[&PlayerRecord]) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Player".to_string(),
        "Overall".to_string(),
        "Potential".to_string(),
        "Age".to_string(),
        "Positions".to_string(),
        "Value".to_string(),
        "Wage".to_string(),
    ]];
    rows.extend(top_by_overall(squad, SQUAD_SHEET_ROWS).into_iter().map(|r| {
        vec![
            r.short_name.clone(),
            r.overall.to_string(),
            r.potential.to_string(),
            r.age.to_string(),
            r.positions_raw.clone(),
            format!("€{:.1}M", r.value_eur / 1_000_000.0),
            format!("€{:.0}K", r.wage_eur / 1_000.0),
        ]
    }));
    rows
}

fn add_sheet(workbook: &mut Workbook, name: &str, rows: &[Vec<String>]) -> Result<()> {
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(name)
        .with_context(|| format!("name sheet {name}"))?;
    write_rows(worksheet, rows)
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formation::four_three_three;
    use crate::squad::{Player, select};

    #[test]
    fn lineup_rows_mark_empty_slots() {
        let roster = vec![Player::new(1, "Keeper", "GK", 80)];
        let formation = four_three_three();
        let assignment = select(&roster, &formation).unwrap();
        let rows = lineup_rows(&assignment);
        // header + GK + seven empty slots
        assert_eq!(rows.len(), 9);
        assert_eq!(rows[1], vec!["GK", "1", "Keeper", "GK", "80"]);
        assert_eq!(rows[2][2], "-");
    }
}
