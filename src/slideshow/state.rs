use std::sync::Arc;

use super::ledger::HistoryLedger;

/// The navigation state as one value: candidate set, history, cursor and the
/// change-token of the listing the candidate set was derived from.
///
/// Operations mutate a clone and hand it back for commit. `has_new_images`
/// marks snapshots whose candidate set was replaced, so committing a pure
/// navigation never touches the candidate set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideshowState {
    pub candidates: Arc<[String]>,
    pub ledger: HistoryLedger,
    pub change_token: Option<String>,
    pub has_new_images: bool,
}

impl SlideshowState {
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Identifier under the cursor, if any.
    pub fn current_id(&self) -> Option<&str> {
        self.ledger
            .current()
            .and_then(|idx| self.candidates.get(idx))
            .map(String::as_str)
    }

    /// Clone for a new operation; the clone starts with `has_new_images` unset.
    pub fn snapshot(&self) -> Self {
        Self {
            candidates: Arc::clone(&self.candidates),
            ledger: self.ledger.clone(),
            change_token: self.change_token.clone(),
            has_new_images: false,
        }
    }

    /// Write a finished snapshot back. Returns true if anything changed.
    pub fn commit(&mut self, snapshot: SlideshowState) -> bool {
        let SlideshowState {
            candidates,
            ledger,
            change_token,
            has_new_images,
        } = snapshot;

        let mut changed = false;
        if has_new_images {
            changed |= !Arc::ptr_eq(&self.candidates, &candidates)
                && self.candidates.as_ref() != candidates.as_ref();
            self.candidates = candidates;
        }
        if self.ledger != ledger {
            self.ledger = ledger;
            changed = true;
        }
        if self.change_token != change_token {
            self.change_token = change_token;
            changed = true;
        }
        changed
    }
}
