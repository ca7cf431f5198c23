use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use fifa_insights::cli_args::{has_flag, parse_arg, string_arg};
use fifa_insights::club_report::ClubSummary;
use fifa_insights::config::{AppConfig, init_logging, load_dotenv};
use fifa_insights::dataset::load_dataset;
use fifa_insights::formation::{four_three_three, load_formation};
use fifa_insights::report_export::export_club_report;
use fifa_insights::season_report::{
    POTENTIAL_GAP_LIMIT, PotentialGap, SCATTER_TOP, career_summary, potential_gaps,
    scatter_stats, season_overview,
};
use fifa_insights::squad::{Assignment, Formation, select};

const CLUB_LIST_LIMIT: usize = 20;

#[derive(Serialize)]
struct ClubOutput<'a> {
    club: &'a str,
    year: i32,
    formation: &'a str,
    team_rating: f64,
    summary: &'a ClubSummary,
    lineup: &'a Assignment<'a>,
    potential_gaps: &'a [PotentialGap],
}

fn main() -> Result<()> {
    load_dotenv();
    init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = AppConfig::from_env();
    let dataset_path = string_arg(&args, "--dataset")
        .map(PathBuf::from)
        .unwrap_or(cfg.dataset_path);
    let dataset = load_dataset(&dataset_path)?;

    let year = match parse_arg::<i32>(&args, "--year") {
        Some(year) => year,
        None => *dataset
            .seasons()
            .first()
            .ok_or_else(|| anyhow!("dataset has no seasons"))?,
    };

    if let Some(id) = parse_arg::<u32>(&args, "--player") {
        let career =
            career_summary(&dataset, id).ok_or_else(|| anyhow!("no rows for player {id}"))?;
        if has_flag(&args, "--json") {
            println!("{}", serde_json::to_string_pretty(&career).context("serialize output")?);
        } else {
            println!(
                "{} ({}): {} seasons, {} -> {} ({:+}), peak {} in {}, average {:.1}",
                career.name,
                career.id,
                career.years_tracked,
                career.first_overall,
                career.current_overall,
                career.change,
                career.peak_overall,
                career.peak_year,
                career.avg_overall
            );
        }
        return Ok(());
    }

    let Some(club) = string_arg(&args, "--club") else {
        if let Some(overview) = season_overview(&dataset, year) {
            println!(
                "Season {year}: {} players | Avg value €{:.2}M | Avg wage €{:.2}K",
                overview.players,
                overview.avg_value_eur / 1_000_000.0,
                overview.avg_wage_eur / 1_000.0
            );
            println!(
                "Top value {} (€{:.0}M) | Top wage {} (€{:.0}K)",
                overview.top_by_value.name,
                overview.max_value_eur / 1_000_000.0,
                overview.top_by_wage.name,
                overview.max_wage_eur / 1_000.0
            );
            for (rank, p) in overview.top_players.iter().enumerate() {
                println!("  {:>2}. {:<28} {:>3}", rank + 1, p.name, p.overall);
            }
            println!();
        }
        if let Some(axes) = string_arg(&args, "--scatter")
            && let Some((x, y)) = axes.split_once(',')
        {
            let season = dataset.season(year);
            match scatter_stats(&dataset, &season, x.trim(), y.trim(), SCATTER_TOP) {
                Some(stats) => println!(
                    "{} vs {}: {} points, means {:.2} / {:.2}, correlation {}",
                    stats.x_attribute,
                    stats.y_attribute,
                    stats.points,
                    stats.mean_x,
                    stats.mean_y,
                    stats
                        .correlation
                        .map(|r| format!("{r:.3}"))
                        .unwrap_or_else(|| "n/a".to_string())
                ),
                None => eprintln!("no data for {axes}"),
            }
            println!();
        }
        println!("Clubs in {year} (pass one with --club):");
        for (club, count) in dataset.clubs_in_season(year).into_iter().take(CLUB_LIST_LIMIT) {
            println!("  {club} ({count} players)");
        }
        return Ok(());
    };

    let formation = match string_arg(&args, "--formation") {
        Some(path) => load_formation(&PathBuf::from(path))?,
        None => four_three_three(),
    };

    let records = dataset.club(year, &club);
    let summary = ClubSummary::from_records(&records)
        .ok_or_else(|| anyhow!("no players found for {club} in {year}"))?;
    let roster = dataset.roster(&records);
    let assignment = select(&roster, &formation).context("select best XI")?;
    let gaps = potential_gaps(&records, POTENTIAL_GAP_LIMIT);

    if has_flag(&args, "--json") {
        let out = ClubOutput {
            club: &club,
            year,
            formation: &formation.name,
            team_rating: assignment.team_rating(),
            summary: &summary,
            lineup: &assignment,
            potential_gaps: &gaps,
        };
        println!("{}", serde_json::to_string_pretty(&out).context("serialize output")?);
    } else {
        print_report(&club, year, &formation, &summary, &assignment, &gaps);
    }

    if let Some(path) = string_arg(&args, "--xlsx") {
        let report = export_club_report(
            &PathBuf::from(&path),
            &club,
            year,
            &summary,
            &assignment,
            &records,
        )?;
        eprintln!(
            "Exported {path}: {} summary rows, {} lineup rows, {} squad rows",
            report.summary_rows, report.lineup_rows, report.squad_rows
        );
    }

    Ok(())
}

fn print_report(
    club: &str,
    year: i32,
    formation: &Formation,
    summary: &ClubSummary,
    assignment: &Assignment<'_>,
    gaps: &[PotentialGap],
) {
    println!("{club} ({year})");
    println!(
        "Squad {} | Avg overall {:.1} | Avg age {:.1} | Value €{:.1}M | Top {} ({})",
        summary.squad_size,
        summary.avg_overall,
        summary.avg_age,
        summary.total_value_eur / 1_000_000.0,
        summary.top_player.name,
        summary.top_player.overall
    );
    println!();
    println!("Best XI ({}) - team rating {:.1}", formation.name, assignment.team_rating());
    for slot in &assignment.slots {
        if slot.players.is_empty() {
            println!("  {:<4} -", slot.label);
            continue;
        }
        for player in &slot.players {
            println!(
                "  {:<4} {:<28} {:>3}  {}",
                slot.label,
                player.display_name,
                player.rating,
                player.eligible_positions.join(", ")
            );
        }
    }
    if !assignment.is_complete() {
        println!(
            "  ({} of {} places filled)",
            assignment.placed_count(),
            formation.squad_size()
        );
    }
    println!();
    println!("Most room to grow");
    for gap in gaps {
        println!(
            "  {:<28} {:>3} -> {:>3} ({:+}), age {}",
            gap.name, gap.overall, gap.potential, gap.gap, gap.age
        );
    }
}
