//! Columnar transposition brute force
//!
//! Every read order of every key length from 2 up to the configured maximum
//! is tried. The space is split into `(length, first column)` tasks that
//! worker threads pull from a shared counter; each worker keeps its own
//! best-N list and the lists are merged at the end.
//!
//! ```text
//! len 2:  2 tasks x    1 order
//! len 7:  7 tasks x  720 orders   (5 912 orders in total for 2..=7)
//! len 9:  9 tasks x 40 320 orders (409 112 in total for 2..=9)
//! ```

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Instant;

use triplelock_cipher::Transposition;
use triplelock_core::{AttackResult, Candidate, Error, Result, TransKey, SEARCH_KEY_LEN_CAP};
use triplelock_lang::Scorer;

pub const DEFAULT_MAX_KEY_LEN: usize = 7;
pub const DEFAULT_TOP_N: usize = 10;

pub struct TranspositionBreaker<'s, S: Scorer + ?Sized> {
    scorer: &'s S,
    max_key_len: usize,
    top_n: usize,
    workers: usize,
}

impl<'s, S: Scorer + ?Sized> TranspositionBreaker<'s, S> {
    pub fn new(scorer: &'s S) -> Self {
        Self {
            scorer,
            max_key_len: DEFAULT_MAX_KEY_LEN,
            top_n: DEFAULT_TOP_N,
            workers: num_cpus::get().max(1),
        }
    }

    /// Longest key length searched, clamped to `2..=SEARCH_KEY_LEN_CAP`.
    pub fn with_max_key_len(mut self, max_key_len: usize) -> Self {
        self.max_key_len = max_key_len.clamp(2, SEARCH_KEY_LEN_CAP);
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn max_key_len(&self) -> usize {
        self.max_key_len
    }

    /// Ranked distinct plaintexts, best `top_n` kept.
    ///
    /// Fewer than two characters gives an empty result. A worker that dies
    /// mid-search fails the whole attack rather than leaving a gap in the
    /// ranking.
    pub fn attack(&self, ciphertext: &str) -> Result<AttackResult<TransKey>> {
        let chars: Vec<char> = ciphertext.chars().collect();
        if chars.len() < 2 {
            return Ok(AttackResult::empty());
        }

        let longest = chars.len().min(self.max_key_len);
        let tasks: Vec<(usize, usize)> = (2..=longest)
            .flat_map(|len| (0..len).map(move |first| (len, first)))
            .collect();
        let workers = self.workers.min(tasks.len());

        tracing::info!(
            "Transposition attack: {} chars, key lengths 2..={}, {} workers",
            chars.len(),
            longest,
            workers
        );
        let started = Instant::now();

        let next_task = AtomicUsize::new(0);
        let searched = AtomicUsize::new(0);
        let outcomes: Vec<std::thread::Result<Vec<Ranked>>> = std::thread::scope(|scope| {
            let (chars, tasks) = (&chars, &tasks);
            let (next_task, searched) = (&next_task, &searched);
            let handles: Vec<_> = (0..workers)
                .map(move |_| {
                    scope.spawn(move || {
                        let mut best = TopN::new(self.top_n);
                        let mut buf = Vec::with_capacity(chars.len());
                        let mut text = String::with_capacity(ciphertext.len());
                        let mut count = 0;

                        loop {
                            let idx = next_task.fetch_add(1, AtomicOrdering::Relaxed);
                            let Some(&(len, first)) = tasks.get(idx) else {
                                break;
                            };

                            let mut order: Vec<usize> = std::iter::once(first)
                                .chain((0..len).filter(|&c| c != first))
                                .collect();
                            loop {
                                Transposition::decrypt_chars(&chars, &order, &mut buf);
                                text.clear();
                                text.extend(buf.iter());
                                best.offer(self.scorer.log_prob(&text), &order, &text);
                                count += 1;

                                if !next_permutation(&mut order[1..]) {
                                    break;
                                }
                            }
                        }

                        searched.fetch_add(count, AtomicOrdering::Relaxed);
                        best.items
                    })
                })
                .collect();

            handles.into_iter().map(|h| h.join()).collect()
        });

        let mut merged = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(items) => merged.extend(items),
                Err(_) => {
                    tracing::error!("Transposition worker panicked; abandoning the search");
                    return Err(Error::SearchAborted("a transposition worker panicked".into()));
                }
            }
        }

        merged.sort_by(Ranked::rank_cmp);
        let mut seen = HashSet::new();
        merged.retain(|r| seen.insert(r.plaintext.clone()));
        merged.truncate(self.top_n);

        let candidates = merged
            .into_iter()
            .filter_map(|r| {
                let key = TransKey::from_order(r.order).ok()?;
                let details = self.scorer.details(&r.plaintext);
                Some(Candidate::new(key, r.plaintext, r.log_prob).with_details(details))
            })
            .collect();

        let result = AttackResult::ranked(candidates, searched.into_inner());
        tracing::info!(
            "Transposition attack: {} orders scored in {:?}",
            result.searched,
            started.elapsed()
        );
        Ok(result)
    }
}

/// A scored read order, before it becomes a [`Candidate`].
#[derive(Debug, Clone)]
struct Ranked {
    log_prob: f64,
    order: Vec<usize>,
    plaintext: String,
}

impl Ranked {
    /// Log probability descending, then shorter key, then smaller read order.
    fn rank_cmp(a: &Self, b: &Self) -> Ordering {
        b.log_prob
            .total_cmp(&a.log_prob)
            .then_with(|| a.order.len().cmp(&b.order.len()))
            .then_with(|| a.order.cmp(&b.order))
    }

    fn beats(&self, log_prob: f64, order: &[usize]) -> bool {
        self.log_prob
            .total_cmp(&log_prob)
            .reverse()
            .then_with(|| self.order.len().cmp(&order.len()))
            .then_with(|| self.order.as_slice().cmp(order))
            == Ordering::Less
    }
}

/// Best `cap` distinct plaintexts seen by one worker, kept sorted.
struct TopN {
    cap: usize,
    items: Vec<Ranked>,
}

impl TopN {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            items: Vec::with_capacity(cap + 1),
        }
    }

    fn offer(&mut self, log_prob: f64, order: &[usize], plaintext: &str) {
        if self.items.len() == self.cap {
            if let Some(worst) = self.items.last() {
                if worst.beats(log_prob, order) {
                    return;
                }
            }
        }

        // Same plaintext from another key: keep whichever ranks first
        if let Some(pos) = self.items.iter().position(|r| r.plaintext == plaintext) {
            if self.items[pos].beats(log_prob, order) {
                return;
            }
            self.items.remove(pos);
        }

        let at = self.items.partition_point(|r| r.beats(log_prob, order));
        self.items.insert(
            at,
            Ranked {
                log_prob,
                order: order.to_vec(),
                plaintext: plaintext.to_string(),
            },
        );
        self.items.truncate(self.cap);
    }
}

/// Advance to the next lexicographic permutation. Returns `false` after the last.
fn next_permutation(xs: &mut [usize]) -> bool {
    if xs.len() < 2 {
        return false;
    }
    let Some(i) = (0..xs.len() - 1).rev().find(|&i| xs[i] < xs[i + 1]) else {
        return false;
    };
    let j = (i + 1..xs.len()).rev().find(|&j| xs[j] > xs[i]).unwrap_or(i + 1);
    xs.swap(i, j);
    xs[i + 1..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::unseen;
    use triplelock_core::ScoreDetails;
    use triplelock_lang::english;

    fn encrypt(text: &str, keyword: &str) -> String {
        Transposition::encrypt(text, &TransKey::from_keyword(keyword).unwrap())
    }

    /// Dies on any candidate starting with 'B'.
    struct Faulty;

    impl Scorer for Faulty {
        fn log_prob(&self, text: &str) -> f64 {
            if text.starts_with('B') {
                panic!("scorer fault");
            }
            0.0
        }

        fn details(&self, _text: &str) -> ScoreDetails {
            ScoreDetails::default()
        }
    }

    #[test]
    fn test_next_permutation() {
        let mut xs = vec![0, 1, 2];
        let mut seen = vec![xs.clone()];
        while next_permutation(&mut xs) {
            seen.push(xs.clone());
        }
        assert_eq!(
            seen,
            vec![
                vec![0, 1, 2],
                vec![0, 2, 1],
                vec![1, 0, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
                vec![2, 1, 0],
            ]
        );
        assert!(!next_permutation(&mut []));
    }

    #[test]
    fn test_recovers_zebra() {
        let model = english();
        for text in [
            "ATTACK AT DAWN",
            "HELLO WORLD",
            "defend the east wall of the castle",
            "meet me at the park at noon",
        ] {
            let result = TranspositionBreaker::new(&*model).attack(&encrypt(text, "ZEBRA")).unwrap();
            let best = result.best().unwrap();
            assert_eq!(best.plaintext, text);
        }
    }

    #[test]
    fn test_recovers_text_outside_the_corpus() {
        let model = english();
        for (text, keyword, order) in [
            ("please bring coffee", "ZEBRA", "Len 5 | [4, 2, 1, 3, 0]"),
            ("please bring coffee", "CIPHER", "Len 6 | [0, 4, 3, 1, 2, 5]"),
            ("JOHN LOVES MARY", "KEY", "Len 3 | [1, 0, 2]"),
            ("JOHN LOVES MARY", "ZEBRA", "Len 5 | [4, 2, 1, 3, 0]"),
            ("send more money to the bank", "CIPHER", "Len 6 | [0, 4, 3, 1, 2, 5]"),
            ("the children played in the garden", "ZEBRA", "Len 5 | [4, 2, 1, 3, 0]"),
        ] {
            let result = TranspositionBreaker::new(&*model)
                .attack(&encrypt(unseen(text), keyword))
                .unwrap();
            let best = result.best().unwrap();
            assert_eq!(best.plaintext, text, "key {}", keyword);
            assert_eq!(best.key.to_string(), order);
        }
    }

    #[test]
    fn test_reports_key_in_display_form() {
        let model = english();
        let result = TranspositionBreaker::new(&*model).attack(&encrypt("ATTACK AT DAWN", "ZEBRA")).unwrap();
        let best = result.best().unwrap();
        assert_eq!(best.key.to_string(), "Len 5 | [4, 2, 1, 3, 0]");
        assert!(best.details.segmented);
    }

    #[test]
    fn test_searched_count_and_distinct_plaintexts() {
        let model = english();
        let result = TranspositionBreaker::new(&*model)
            .with_max_key_len(5)
            .with_top_n(20)
            .attack("C TAWT AATNAKD")
            .unwrap();

        // 2! + 3! + 4! + 5!
        assert_eq!(result.searched, 152);
        assert_eq!(result.len(), 20);

        let mut plaintexts: Vec<&str> = result.candidates.iter().map(|c| c.plaintext.as_str()).collect();
        plaintexts.sort();
        plaintexts.dedup();
        assert_eq!(plaintexts.len(), 20);
    }

    #[test]
    fn test_worker_count_does_not_change_ranking() {
        let model = english();
        let ciphertext = encrypt("meet me at the park at noon", "SECRET");
        let single = TranspositionBreaker::new(&*model).with_workers(1).attack(&ciphertext).unwrap();
        let many = TranspositionBreaker::new(&*model).with_workers(8).attack(&ciphertext).unwrap();

        let keys = |r: &AttackResult<TransKey>| r.candidates.iter().map(|c| c.key.clone()).collect::<Vec<_>>();
        assert_eq!(keys(&single), keys(&many));
        assert_eq!(single.searched, many.searched);
    }

    #[test]
    fn test_key_length_bounded_by_text() {
        let model = english();
        let result = TranspositionBreaker::new(&*model).attack("ab").unwrap();
        assert_eq!(result.len(), 2);
        for candidate in &result.candidates {
            assert_eq!(candidate.key.len(), 2);
        }
    }

    #[test]
    fn test_too_short() {
        let model = english();
        assert!(TranspositionBreaker::new(&*model).attack("").unwrap().is_empty());
        assert!(TranspositionBreaker::new(&*model).attack("A").unwrap().is_empty());
    }

    #[test]
    fn test_worker_panic_fails_the_attack() {
        let breaker = TranspositionBreaker::new(&Faulty).with_workers(2);
        assert!(matches!(breaker.attack("ABC"), Err(Error::SearchAborted(_))));
        assert!(breaker.attack("AC").is_ok());
    }

    #[test]
    fn test_max_key_len_is_clamped() {
        let model = english();
        assert_eq!(TranspositionBreaker::new(&*model).with_max_key_len(50).max_key_len(), SEARCH_KEY_LEN_CAP);
        assert_eq!(TranspositionBreaker::new(&*model).with_max_key_len(0).max_key_len(), 2);
    }
}
