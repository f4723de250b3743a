use std::collections::VecDeque;

/// Bounded, oldest-first record of the candidate indices that were shown,
/// plus the cursor the user navigates with.
///
/// The cursor (`offset`) counts backwards from the newest entry: 0 shows the
/// most recent pick, `len() - 1` the oldest one still remembered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLedger {
    entries: VecDeque<usize>,
    offset: usize,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I, offset: usize) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut ledger = Self {
            entries: entries.into_iter().collect(),
            offset,
        };
        ledger.clamp_offset();
        ledger
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn entries(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.entries.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.entries.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<usize> {
        self.entries.back().copied()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains(&index)
    }

    /// Candidate index under the cursor.
    pub fn current(&self) -> Option<usize> {
        let len = self.entries.len();
        if len == 0 || self.offset >= len {
            return None;
        }
        self.entries.get(len - 1 - self.offset).copied()
    }

    pub fn push(&mut self, index: usize) {
        self.entries.push_back(index);
    }

    pub fn evict_oldest(&mut self) -> Option<usize> {
        let evicted = self.entries.pop_front();
        self.clamp_offset();
        evicted
    }

    /// Drop oldest entries until at most `max` remain; returns how many went.
    pub fn truncate_oldest(&mut self, max: usize) -> usize {
        let mut evicted = 0;
        while self.entries.len() > max {
            self.entries.pop_front();
            evicted += 1;
        }
        self.clamp_offset();
        evicted
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.offset = 0;
    }

    /// An older entry exists behind the cursor.
    pub fn can_step_back(&self) -> bool {
        self.offset + 1 < self.entries.len()
    }

    /// A newer entry exists in front of the cursor.
    pub fn can_step_forward(&self) -> bool {
        self.offset > 0
    }

    pub fn step_back(&mut self) -> bool {
        if !self.can_step_back() {
            return false;
        }
        self.offset += 1;
        true
    }

    pub fn step_forward(&mut self) -> bool {
        if !self.can_step_forward() {
            return false;
        }
        self.offset -= 1;
        true
    }

    fn clamp_offset(&mut self) {
        self.offset = self.offset.min(self.entries.len().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_follows_offset_from_the_newest_entry() {
        let mut ledger = HistoryLedger::from_entries([4, 7, 9], 0);
        assert_eq!(ledger.current(), Some(9));
        assert!(ledger.step_back());
        assert_eq!(ledger.current(), Some(7));
        assert!(ledger.step_back());
        assert_eq!(ledger.current(), Some(4));
        assert!(!ledger.step_back());
        assert_eq!(ledger.offset(), 2);
        assert!(ledger.step_forward());
        assert!(ledger.step_forward());
        assert!(!ledger.step_forward());
        assert_eq!(ledger.offset(), 0);
    }

    #[test]
    fn empty_ledger_has_no_current_and_no_moves() {
        let mut ledger = HistoryLedger::new();
        assert_eq!(ledger.current(), None);
        assert!(!ledger.step_back());
        assert!(!ledger.step_forward());
    }

    #[test]
    fn eviction_keeps_offset_in_bounds() {
        let mut ledger = HistoryLedger::from_entries([1, 2, 3], 2);
        assert_eq!(ledger.truncate_oldest(1), 2);
        assert_eq!(ledger.to_vec(), vec![3]);
        assert_eq!(ledger.offset(), 0);
        assert_eq!(ledger.current(), Some(3));
    }

    #[test]
    fn from_entries_clamps_out_of_range_offsets() {
        let ledger = HistoryLedger::from_entries([5, 6], 10);
        assert_eq!(ledger.offset(), 1);
        assert_eq!(ledger.current(), Some(5));
    }

    #[test]
    fn clear_resets_cursor() {
        let mut ledger = HistoryLedger::from_entries([0, 1, 2], 1);
        ledger.clear();
        assert!(ledger.is_empty());
        assert_eq!(ledger.offset(), 0);
    }
}
