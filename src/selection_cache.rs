use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};

use crate::squad::{self, Assignment, Formation, Player, SquadError};

type CacheKey = (u64, u64);

/// Memoizes selections per (roster, formation). Only the fields the selector
/// reads are hashed, so secondary attributes can change without a miss.
#[derive(Debug, Default)]
pub struct SelectionCache {
    entries: Mutex<HashMap<CacheKey, Arc<Vec<Vec<usize>>>>>,
}

impl SelectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<'a>(
        &self,
        roster: &'a [Player],
        formation: &Formation,
    ) -> Result<Assignment<'a>, SquadError> {
        let key = (roster_key(roster), formation_key(formation));

        let cached = {
            let guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            guard.get(&key).cloned()
        };
        if let Some(picks) = cached {
            return Ok(Assignment::from_picks(roster, formation, &picks));
        }

        let picks = Arc::new(squad::pick_indices(roster, formation)?);
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(key, Arc::clone(&picks));
        Ok(Assignment::from_picks(roster, formation, &picks))
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

fn roster_key(roster: &[Player]) -> u64 {
    let mut hasher = DefaultHasher::new();
    roster.len().hash(&mut hasher);
    for p in roster {
        p.id.hash(&mut hasher);
        p.rating.hash(&mut hasher);
        p.eligible_positions.hash(&mut hasher);
    }
    hasher.finish()
}

fn formation_key(formation: &Formation) -> u64 {
    let mut hasher = DefaultHasher::new();
    formation.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::formation::four_three_three;

    fn roster() -> Vec<Player> {
        vec![
            Player::new(1, "Keeper", "GK", 82),
            Player::new(2, "Stopper", "CB", 79),
            Player::new(3, "Runner", "ST, LW", 84),
        ]
    }

    #[test]
    fn cached_selection_matches_direct_selection() {
        let cache = SelectionCache::new();
        let roster = roster();
        let formation = four_three_three();
        let direct = squad::select(&roster, &formation).unwrap();
        let first = cache.select(&roster, &formation).unwrap();
        let second = cache.select(&roster, &formation).unwrap();
        assert_eq!(direct, first);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn reordered_roster_is_a_different_entry() {
        let cache = SelectionCache::new();
        let formation = four_three_three();
        let roster = roster();
        let mut reversed = roster.clone();
        reversed.reverse();
        cache.select(&roster, &formation).unwrap();
        cache.select(&reversed, &formation).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn poisoned_lock_keeps_entries_visible() {
        let cache = SelectionCache::new();
        let roster = roster();
        let formation = four_three_three();
        cache.select(&roster, &formation).unwrap();

        let poisoned: std::thread::Result<()> = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache.entries.lock().unwrap();
            panic!("worker died holding the cache lock");
        }));
        assert!(poisoned.is_err());
        assert!(cache.entries.is_poisoned());

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.select(&roster, &formation).unwrap(),
            squad::select(&roster, &formation).unwrap()
        );
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = SelectionCache::new();
        let empty = Formation::new("empty", Vec::new());
        assert!(cache.select(&roster(), &empty).is_err());
        assert!(cache.is_empty());
    }
}
