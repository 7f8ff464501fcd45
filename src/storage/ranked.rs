use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::errors::MinerError;
use crate::types::VocabId;

/// One dumped vocabulary entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedEntry<'a, K> {
    /// Recorded key.
    pub key: &'a K,
    /// First-seen id (starting at 1).
    pub id: VocabId,
    /// Occurrences recorded so far.
    pub count: u64,
}

/// Key -> id table with occurrence counts and frequency rank queries.
///
/// Ids are assigned sequentially in first-seen order starting at 1 and never
/// change. Rank is the 1-based position of a key when all keys are ordered by
/// descending count, ties broken by ascending id.
///
/// Ranks come from an incrementally maintained order: ids are grouped into
/// per-count buckets (kept sorted by id) inside a map ordered by descending
/// count. `record` moves one id between adjacent buckets; `rank` sums the
/// sizes of the buckets with a higher count and binary-searches the key's own
/// bucket. Nothing is cached, so every `rank` reflects all prior `record`s.
#[derive(Clone, Debug)]
pub struct RankedIncrementalIdStorage<K> {
    counts: IndexMap<K, u64>,
    buckets: BTreeMap<Reverse<u64>, Vec<VocabId>>,
}

impl<K> Default for RankedIncrementalIdStorage<K> {
    fn default() -> Self {
        Self {
            counts: IndexMap::new(),
            buckets: BTreeMap::new(),
        }
    }
}

impl<K: Hash + Eq> RankedIncrementalIdStorage<K> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `key` and return its id.
    pub fn record(&mut self, key: K) -> VocabId {
        match self.counts.get_full_mut(&key) {
            Some((idx, _, count)) => {
                let id = idx as VocabId + 1;
                let previous = *count;
                *count += 1;
                self.move_up(id, previous);
                id
            }
            None => {
                let (idx, _) = self.counts.insert_full(key, 1);
                let id = idx as VocabId + 1;
                // A fresh id is the largest issued so far, so it sorts last in its bucket.
                self.buckets.entry(Reverse(1)).or_default().push(id);
                id
            }
        }
    }

    /// 1-based frequency rank of the key holding `id`.
    pub fn rank(&self, id: VocabId) -> Result<usize, MinerError> {
        let count = self.count_of(id)?;
        let above: usize = self
            .buckets
            .range(..Reverse(count))
            .map(|(_, ids)| ids.len())
            .sum();
        let within = self
            .buckets
            .get(&Reverse(count))
            .and_then(|ids| ids.binary_search(&id).ok())
            .ok_or(MinerError::InvalidKey { id })?;
        Ok(above + within + 1)
    }

    /// Id previously assigned to `key`.
    pub fn id(&self, key: &K) -> Option<VocabId> {
        self.counts.get_index_of(key).map(|idx| idx as VocabId + 1)
    }

    /// Occurrences recorded for `key`.
    pub fn count(&self, key: &K) -> Option<u64> {
        self.counts.get(key).copied()
    }

    /// Occurrences recorded for the key holding `id`.
    pub fn count_of(&self, id: VocabId) -> Result<u64, MinerError> {
        self.entry_at(id).map(|(_, count)| count)
    }

    /// Key holding `id`.
    pub fn key(&self, id: VocabId) -> Result<&K, MinerError> {
        self.entry_at(id).map(|(key, _)| key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// All entries in current rank order.
    pub fn ranked_entries(&self) -> Vec<RankedEntry<'_, K>> {
        self.buckets
            .iter()
            .flat_map(|(Reverse(count), ids)| {
                ids.iter().filter_map(move |id| {
                    self.counts
                        .get_index(*id as usize - 1)
                        .map(|(key, _)| RankedEntry {
                            key,
                            id: *id,
                            count: *count,
                        })
                })
            })
            .collect()
    }

    fn entry_at(&self, id: VocabId) -> Result<(&K, u64), MinerError> {
        id.checked_sub(1)
            .and_then(|idx| self.counts.get_index(idx as usize))
            .map(|(key, count)| (key, *count))
            .ok_or(MinerError::InvalidKey { id })
    }

    fn move_up(&mut self, id: VocabId, previous: u64) {
        if let Some(ids) = self.buckets.get_mut(&Reverse(previous)) {
            if let Ok(pos) = ids.binary_search(&id) {
                ids.remove(pos);
            }
            if ids.is_empty() {
                self.buckets.remove(&Reverse(previous));
            }
        }
        let target = self.buckets.entry(Reverse(previous + 1)).or_default();
        if let Err(pos) = target.binary_search(&id) {
            target.insert(pos, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rank computed by sorting every key, used as the reference semantics.
    fn resort_rank<K: Hash + Eq>(table: &RankedIncrementalIdStorage<K>, id: VocabId) -> usize {
        let mut order: Vec<(u64, VocabId)> = (1..=table.len() as VocabId)
            .map(|id| (table.count_of(id).expect("issued"), id))
            .collect();
        order.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        order
            .iter()
            .position(|(_, candidate)| *candidate == id)
            .expect("issued")
            + 1
    }

    #[test]
    fn record_is_idempotent_on_id_and_counts_every_call() {
        let mut table = RankedIncrementalIdStorage::new();
        let first = table.record("alpha");
        let second = table.record("beta");
        assert_eq!((first, second), (1, 2));
        for _ in 0..4 {
            assert_eq!(table.record("alpha"), first);
        }
        assert_eq!(table.count(&"alpha"), Some(5));
        assert_eq!(table.count(&"beta"), Some(1));
        assert_eq!(table.id(&"beta"), Some(2));
        assert_eq!(table.id(&"gamma"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn ties_are_broken_by_first_seen_id() {
        let mut table = RankedIncrementalIdStorage::new();
        for (key, times) in [("A", 5), ("B", 5), ("C", 3)] {
            for _ in 0..times {
                table.record(key);
            }
        }
        let rank_of = |key: &str| table.rank(table.id(&key).expect("id")).expect("rank");
        assert_eq!(rank_of("A"), 1);
        assert_eq!(rank_of("B"), 2);
        assert_eq!(rank_of("C"), 3);
    }

    #[test]
    fn interleaved_recording_order_does_not_change_final_ranks() {
        let mut table = RankedIncrementalIdStorage::new();
        table.record("A");
        table.record("B");
        table.record("C");
        for key in ["C", "C", "B", "A", "B", "A", "B", "A", "A", "B"] {
            table.record(key);
        }
        assert_eq!(table.rank(1).expect("A"), 1);
        assert_eq!(table.rank(2).expect("B"), 2);
        assert_eq!(table.rank(3).expect("C"), 3);
    }

    #[test]
    fn late_frequent_key_overtakes_earlier_keys() {
        let mut table = RankedIncrementalIdStorage::new();
        table.record("early");
        table.record("late");
        assert_eq!(table.rank(2).expect("late"), 2);
        table.record("late");
        assert_eq!(table.rank(2).expect("late"), 1);
        assert_eq!(table.rank(1).expect("early"), 2);
    }

    #[test]
    fn incremental_ranks_match_full_resort_at_every_step() {
        let mut table = RankedIncrementalIdStorage::new();
        let stream = "the cat sat on the mat while the dog sat by the cat and a cat ran";
        for word in stream.split(' ') {
            table.record(word.to_string());
            for id in 1..=table.len() as VocabId {
                assert_eq!(table.rank(id).expect("rank"), resort_rank(&table, id));
            }
        }
    }

    #[test]
    fn ranked_entries_follow_rank_order() {
        let mut table = RankedIncrementalIdStorage::new();
        for key in ["x", "y", "y", "z", "z", "z", "w"] {
            table.record(key);
        }
        let entries: Vec<(&str, VocabId, u64)> = table
            .ranked_entries()
            .into_iter()
            .map(|entry| (*entry.key, entry.id, entry.count))
            .collect();
        assert_eq!(
            entries,
            vec![("z", 3, 3), ("y", 2, 2), ("x", 1, 1), ("w", 4, 1)]
        );
    }

    #[test]
    fn unknown_ids_are_invalid_keys() {
        let mut table = RankedIncrementalIdStorage::new();
        table.record(10_u64);
        assert!(matches!(table.rank(0), Err(MinerError::InvalidKey { id: 0 })));
        assert!(matches!(table.rank(2), Err(MinerError::InvalidKey { id: 2 })));
        assert!(matches!(table.key(5), Err(MinerError::InvalidKey { id: 5 })));
        assert_eq!(*table.key(1).expect("key"), 10);
    }
}
