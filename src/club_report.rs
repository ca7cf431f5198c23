use std::collections::HashMap;

use serde::Serialize;

use crate::dataset::{Dataset, PlayerRecord, PositionCategory};

const MIN_PERCENTILE_SAMPLE: usize = 10;

const AGE_GROUPS: &[(&str, u32, u32)] = &[
    ("16-20", 16, 20),
    ("21-25", 20, 25),
    ("26-30", 25, 30),
    ("31-35", 30, 35),
    ("36+", 35, 50),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPlayer {
    pub id: u32,
    pub name: String,
    pub overall: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgeProfile {
    pub young: usize,
    pub prime: usize,
    pub veteran: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClubSummary {
    pub squad_size: usize,
    pub avg_overall: f64,
    pub avg_age: f64,
    pub total_value_eur: f64,
    pub top_player: TopPlayer,
    pub age_profile: AgeProfile,
    pub depth: Vec<(PositionCategory, usize)>,
}

impl ClubSummary {
    pub fn from_records(records: &[&PlayerRecord]) -> Option<Self> {
        let first = records.first()?;
        let n = records.len() as f64;

        let mut top = *first;
        for r in records.iter().skip(1) {
            if r.overall > top.overall {
                top = *r;
            }
        }

        let mut profile = AgeProfile::default();
        for r in records {
            match r.age {
                a if a < 23 => profile.young += 1,
                a if a <= 29 => profile.prime += 1,
                _ => profile.veteran += 1,
            }
        }

        let mut depth_map: HashMap<PositionCategory, usize> = HashMap::new();
        for r in records {
            *depth_map.entry(r.position_category).or_default() += 1;
        }
        let mut depth: Vec<(PositionCategory, usize)> = depth_map.into_iter().collect();
        depth.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        Some(Self {
            squad_size: records.len(),
            avg_overall: records.iter().map(|r| r.overall as f64).sum::<f64>() / n,
            avg_age: records.iter().map(|r| r.age as f64).sum::<f64>() / n,
            total_value_eur: records.iter().map(|r| r.value_eur).sum(),
            top_player: TopPlayer {
                id: top.id,
                name: top.short_name.clone(),
                overall: top.overall,
            },
            age_profile: profile,
            depth,
        })
    }

    pub fn share(&self, count: usize) -> f64 {
        if self.squad_size == 0 {
            return 0.0;
        }
        count as f64 / self.squad_size as f64 * 100.0
    }
}

/// Percent of same-season, same-category players with a strictly lower value.
pub fn attribute_percentile(dataset: &Dataset, record: &PlayerRecord, attribute: &str) -> Option<f64> {
    let value = dataset.attribute(record, attribute)?;
    let peers: Vec<f64> = dataset
        .records
        .iter()
        .filter(|r| r.year == record.year && r.position_category == record.position_category)
        .filter_map(|r| dataset.attribute(r, attribute))
        .collect();
    if peers.len() < MIN_PERCENTILE_SAMPLE {
        return None;
    }
    let below = peers.iter().filter(|v| **v < value).count();
    Some(below as f64 / peers.len() as f64 * 100.0)
}

/// Player counts per age band; bands are right-inclusive and start above 16.
pub fn age_groups(records: &[&PlayerRecord]) -> Vec<(&'static str, usize)> {
    AGE_GROUPS
        .iter()
        .map(|(label, lo, hi)| {
            let n = records.iter().filter(|r| r.age > *lo && r.age <= *hi).count();
            (*label, n)
        })
        .collect()
}

pub fn top_clubs_by_value(records: &[&PlayerRecord], n: usize) -> Vec<(String, f64)> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for r in records {
        *totals.entry(r.club.as_str()).or_default() += r.value_eur;
    }
    let mut out: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(club, v)| (club.to_string(), v))
        .collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out.truncate(n);
    out
}

pub fn top_by_overall<'a>(records: &[&'a PlayerRecord], n: usize) -> Vec<&'a PlayerRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.overall.cmp(&a.overall));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::parse_dataset;

    fn dataset() -> Dataset {
        let mut csv = String::from(
            "sofifa_id,short_name,player_positions,overall,age,value_eur,club_name,year,pace\n",
        );
        for i in 0..12u32 {
            csv.push_str(&format!(
                "{},P{},CB,{},{},{},Club A,2022,{}\n",
                i + 1,
                i + 1,
                60 + i,
                18 + i,
                1_000_000 * (i + 1),
                50 + i
            ));
        }
        csv.push_str("100,Keeper,GK,88,31,5000000,Club B,2022,40\n");
        parse_dataset(csv.as_bytes()).unwrap()
    }

    #[test]
    fn summary_aggregates_club() {
        let ds = dataset();
        let club = ds.club(2022, "Club A");
        let summary = ClubSummary::from_records(&club).unwrap();
        assert_eq!(summary.squad_size, 12);
        assert_eq!(summary.top_player.name, "P12");
        assert!((summary.avg_overall - 65.5).abs() < 1e-9);
        assert_eq!(summary.age_profile, AgeProfile { young: 5, prime: 7, veteran: 0 });
        assert_eq!(summary.depth, vec![(PositionCategory::Defender, 12)]);
        assert_eq!(summary.total_value_eur, 78_000_000.0);
    }

    #[test]
    fn empty_club_has_no_summary() {
        assert!(ClubSummary::from_records(&[]).is_none());
    }

    #[test]
    fn percentile_counts_strictly_lower_peers() {
        let ds = dataset();
        let best = ds.records.iter().find(|r| r.id == 12).unwrap();
        // 11 of 12 defenders are slower.
        let pct = attribute_percentile(&ds, best, "pace").unwrap();
        assert!((pct - 11.0 / 12.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn percentile_needs_ten_peers() {
        let ds = dataset();
        let keeper = ds.records.iter().find(|r| r.id == 100).unwrap();
        assert!(attribute_percentile(&ds, keeper, "pace").is_none());
    }

    #[test]
    fn age_groups_are_right_inclusive() {
        let ds = dataset();
        let all: Vec<&PlayerRecord> = ds.records.iter().collect();
        let groups = age_groups(&all);
        // ages 18..=29 plus 31
        assert_eq!(groups[0], ("16-20", 3));
        assert_eq!(groups[1], ("21-25", 5));
        assert_eq!(groups[2], ("26-30", 4));
        assert_eq!(groups[3], ("31-35", 1));
    }

    #[test]
    fn clubs_rank_by_total_value() {
        let ds = dataset();
        let all: Vec<&PlayerRecord> = ds.records.iter().collect();
        let top = top_clubs_by_value(&all, 1);
        assert_eq!(top, vec![("Club A".to_string(), 78_000_000.0)]);
    }
}
