use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

use rand::Rng;
use rand::seq::{IteratorRandom, SliceRandom};
use tracing::debug;

use super::host::CandidateListing;
use super::ledger::HistoryLedger;
use super::state::SlideshowState;
use crate::config::{FileTypeFilter, SlideShowMode};
use crate::error::{Result, SlideshowError};

/// Where the image chosen by [`pick_next`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// The cursor moved towards the newest entry; nothing was appended.
    FromHistory(usize),
    /// A new index was appended to the ledger.
    Appended(usize),
}

impl Pick {
    pub fn index(&self) -> usize {
        match *self {
            Pick::FromHistory(idx) | Pick::Appended(idx) => idx,
        }
    }
}

/// Fold a fresh listing into the snapshot.
///
/// An unchanged change-token returns the snapshot as-is. Otherwise the
/// listing is filtered, ordered for `mode`, and replaces the candidate set;
/// the ledger is cleared because its indices refer to the old set.
pub fn refresh<R: Rng + ?Sized>(
    mut state: SlideshowState,
    listing: CandidateListing,
    filter: &FileTypeFilter,
    mode: SlideShowMode,
    rng: &mut R,
) -> SlideshowState {
    if state.change_token.as_deref() == Some(listing.change_token.as_str()) {
        debug!(token = %listing.change_token, "candidate source unchanged");
        return state;
    }

    let CandidateListing {
        items,
        change_token,
    } = listing;
    let raw = items.len();
    let filtered: Vec<String> = items
        .into_iter()
        .filter(|item| filter.matches(item))
        .collect();
    let ordered = order_candidates(filtered, mode, rng);
    debug!(
        raw,
        kept = ordered.len(),
        mode = %mode,
        token = %change_token,
        "candidate set replaced"
    );

    state.candidates = Arc::from(ordered);
    state.ledger.clear();
    state.change_token = Some(change_token);
    state.has_new_images = true;
    state
}

pub fn order_candidates<R: Rng + ?Sized>(
    mut items: Vec<String>,
    mode: SlideShowMode,
    rng: &mut R,
) -> Vec<String> {
    match mode {
        SlideShowMode::NameAscending => items.sort_by(|a, b| natural_cmp(a, b)),
        SlideShowMode::NameDescending => items.sort_by(|a, b| natural_cmp(b, a)),
        SlideShowMode::Random => items.shuffle(rng),
    }
    items
}

/// Choose the next image and record it in `ledger`.
///
/// A cursor that was moved back into history is walked forward instead of
/// picking anything new. Returns the candidate index now under the cursor.
pub fn pick_next<R: Rng + ?Sized>(
    ledger: &mut HistoryLedger,
    candidate_count: usize,
    mode: SlideShowMode,
    max_history: usize,
    rng: &mut R,
) -> Result<Pick> {
    if candidate_count == 0 {
        return Err(SlideshowError::EmptyCandidateSet);
    }

    if ledger.can_step_forward() {
        ledger.step_forward();
        let idx = ledger
            .current()
            .ok_or(SlideshowError::EmptyCandidateSet)?;
        debug!(index = idx, offset = ledger.offset(), "picking from history");
        return Ok(Pick::FromHistory(idx));
    }

    if ledger.len() >= candidate_count {
        // Every candidate is in the ledger; free the oldest one.
        let evicted = ledger.evict_oldest();
        debug!(?evicted, candidates = candidate_count, "history saturated");
    }

    let next = match mode {
        SlideShowMode::NameAscending | SlideShowMode::NameDescending => {
            match ledger.latest() {
                Some(last) if last + 1 < candidate_count => last + 1,
                _ => 0,
            }
        }
        SlideShowMode::Random => pick_random(ledger, candidate_count, rng),
    };
    ledger.push(next);

    let trimmed = ledger.truncate_oldest(max_history.max(1));
    if trimmed > 0 {
        debug!(max_history, "history size limit reached");
    }
    Ok(Pick::Appended(next))
}

fn pick_random<R: Rng + ?Sized>(ledger: &HistoryLedger, candidate_count: usize, rng: &mut R) -> usize {
    if candidate_count == 1 {
        return 0;
    }
    let last = ledger.latest();
    (0..candidate_count)
        .filter(|idx| Some(*idx) != last && !ledger.contains(*idx))
        .choose(rng)
        .unwrap_or_else(|| {
            // Unreachable after the saturation eviction; never repeat the last image.
            let offset = rng.random_range(1..candidate_count);
            (last.unwrap_or(0) + offset) % candidate_count
        })
}

/// Human ordering for file names: case-insensitive, digit runs by value.
///
/// `img2.jpg` sorts before `img10.jpg`; `IMG_1.jpg` and `img_1.JPG` compare equal.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_digits = take_digits(&mut left);
                let r_digits = take_digits(&mut right);
                let ord = compare_numeric(&l_digits, &r_digits);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), Some(r)) => {
                left.next();
                right.next();
                let ord = fold_case(l).cmp(&fold_case(r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn listing(items: &[&str], token: &str) -> CandidateListing {
        CandidateListing {
            items: items.iter().map(|s| s.to_string()).collect(),
            change_token: token.to_string(),
        }
    }

    #[test]
    fn natural_order_compares_numbers_by_value() {
        let mut names = vec!["img10.jpg", "IMG2.jpg", "img1.jpg", "img02b.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["img1.jpg", "IMG2.jpg", "img02b.jpg", "img10.jpg"]);
        assert_eq!(natural_cmp("a.JPG", "A.jpg"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "ab"), Ordering::Less);
    }

    #[test]
    fn refresh_filters_and_orders_new_listings() {
        let mut rng = StdRng::seed_from_u64(1);
        let state = SlideshowState::default();
        let filter = FileTypeFilter::parse("jpg,png").unwrap();
        let next = refresh(
            state,
            listing(&["/p/b.png", "/p/notes.txt", "/p/a10.jpg", "/p/a9.JPG"], "1"),
            &filter,
            SlideShowMode::NameDescending,
            &mut rng,
        );
        assert!(next.has_new_images);
        assert_eq!(next.change_token.as_deref(), Some("1"));
        assert_eq!(
            next.candidates.as_ref(),
            ["/p/b.png", "/p/a10.jpg", "/p/a9.JPG"].map(String::from)
        );
    }

    #[test]
    fn refresh_with_same_token_keeps_state_and_history() {
        let mut rng = StdRng::seed_from_u64(1);
        let filter = FileTypeFilter::default();
        let mut state = refresh(
            SlideshowState::default(),
            listing(&["a.jpg", "b.jpg"], "t1"),
            &filter,
            SlideShowMode::NameAscending,
            &mut rng,
        );
        state.has_new_images = false;
        state.ledger.push(1);

        let again = refresh(
            state.clone(),
            listing(&["z.jpg"], "t1"),
            &filter,
            SlideShowMode::NameAscending,
            &mut rng,
        );
        assert_eq!(again, state);

        let replaced = refresh(
            state,
            listing(&["z.jpg"], "t2"),
            &filter,
            SlideShowMode::NameAscending,
            &mut rng,
        );
        assert!(replaced.ledger.is_empty());
        assert_eq!(replaced.candidate_count(), 1);
    }

    #[test]
    fn random_order_keeps_every_candidate() {
        let mut rng = StdRng::seed_from_u64(42);
        let items: Vec<String> = (0..20).map(|i| format!("{i}.jpg")).collect();
        let mut ordered = order_candidates(items.clone(), SlideShowMode::Random, &mut rng);
        ordered.sort();
        let mut expected = items;
        expected.sort();
        assert_eq!(ordered, expected);
    }

    #[test]
    fn empty_candidate_set_is_an_error() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut ledger = HistoryLedger::new();
        let err = pick_next(&mut ledger, 0, SlideShowMode::Random, 10, &mut rng).unwrap_err();
        assert_eq!(err, SlideshowError::EmptyCandidateSet);
    }

    #[test]
    fn ascending_picks_fill_then_rotate_history() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut ledger = HistoryLedger::new();
        let mut seen = Vec::new();
        for _ in 0..5 {
            pick_next(&mut ledger, 3, SlideShowMode::NameAscending, 3, &mut rng).unwrap();
            seen.push(ledger.to_vec());
        }
        assert_eq!(
            seen,
            vec![
                vec![0],
                vec![0, 1],
                vec![0, 1, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
            ]
        );
    }

    #[test]
    fn sequential_modes_cycle_through_every_index() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut ledger = HistoryLedger::new();
        let shown: Vec<usize> = (0..12)
            .map(|_| {
                pick_next(&mut ledger, 5, SlideShowMode::NameDescending, 2, &mut rng)
                    .unwrap()
                    .index()
            })
            .collect();
        assert_eq!(shown, vec![0, 1, 2, 3, 4, 0, 1, 2, 3, 4, 0, 1]);
    }

    #[test]
    fn single_entry_history_always_has_length_one() {
        let mut rng = StdRng::seed_from_u64(9);
        for mode in [
            SlideShowMode::Random,
            SlideShowMode::NameAscending,
            SlideShowMode::NameDescending,
        ] {
            let mut ledger = HistoryLedger::new();
            for _ in 0..10 {
                pick_next(&mut ledger, 4, mode, 1, &mut rng).unwrap();
                assert_eq!(ledger.len(), 1);
                assert_eq!(ledger.offset(), 0);
            }
        }
    }

    #[test]
    fn random_never_repeats_and_never_duplicates() {
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut ledger = HistoryLedger::new();
            let n = 6;
            let mut previous = None;
            for _ in 0..40 {
                let idx = pick_next(&mut ledger, n, SlideShowMode::Random, 10, &mut rng)
                    .unwrap()
                    .index();
                assert!(idx < n);
                assert_ne!(Some(idx), previous);
                previous = Some(idx);

                let mut entries = ledger.to_vec();
                assert!(entries.len() <= n);
                entries.sort_unstable();
                entries.dedup();
                assert_eq!(entries.len(), ledger.len(), "duplicate in {:?}", ledger);
            }
        }
    }

    #[test]
    fn random_with_one_candidate_terminates() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut ledger = HistoryLedger::new();
        for _ in 0..5 {
            let pick = pick_next(&mut ledger, 1, SlideShowMode::Random, 10, &mut rng).unwrap();
            assert_eq!(pick, Pick::Appended(0));
        }
        assert_eq!(ledger.to_vec(), vec![0]);
    }

    #[test]
    fn history_cursor_is_consumed_before_new_picks() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut ledger = HistoryLedger::from_entries([3, 1, 4], 2);
        assert_eq!(
            pick_next(&mut ledger, 5, SlideShowMode::Random, 10, &mut rng).unwrap(),
            Pick::FromHistory(1)
        );
        assert_eq!(
            pick_next(&mut ledger, 5, SlideShowMode::Random, 10, &mut rng).unwrap(),
            Pick::FromHistory(4)
        );
        assert_eq!(ledger.len(), 3);
        let fresh = pick_next(&mut ledger, 5, SlideShowMode::Random, 10, &mut rng).unwrap();
        assert!(matches!(fresh, Pick::Appended(idx) if idx == 0 || idx == 2));
        assert_eq!(ledger.len(), 4);
    }

    #[test]
    fn history_never_exceeds_the_limit() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut ledger = HistoryLedger::new();
        for step in 0..30 {
            let before = ledger.len();
            pick_next(&mut ledger, 8, SlideShowMode::Random, 4, &mut rng).unwrap();
            assert!(ledger.len() <= 4);
            if step >= 4 {
                assert_eq!(before, ledger.len());
            }
        }
    }
}
