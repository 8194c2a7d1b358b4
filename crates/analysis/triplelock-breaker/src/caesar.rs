//! Caesar brute force

use triplelock_cipher::Caesar;
use triplelock_core::{AttackResult, Candidate, ShiftKey};
use triplelock_lang::Scorer;

pub struct CaesarBreaker<'s, S: Scorer + ?Sized> {
    scorer: &'s S,
}

impl<'s, S: Scorer + ?Sized> CaesarBreaker<'s, S> {
    pub fn new(scorer: &'s S) -> Self {
        Self { scorer }
    }

    /// All 26 shifts, ranked. Empty ciphertext gives an empty result.
    pub fn attack(&self, ciphertext: &str) -> AttackResult<ShiftKey> {
        if ciphertext.trim().is_empty() {
            return AttackResult::empty();
        }

        let candidates = Caesar::bruteforce(ciphertext)
            .into_iter()
            .map(|(key, plaintext)| {
                let details = self.scorer.details(&plaintext);
                Candidate::new(key, plaintext, details.log_prob).with_details(details)
            })
            .collect::<Vec<_>>();

        let result = AttackResult::ranked(candidates, 26);
        if let Some(best) = result.best() {
            tracing::debug!("Caesar attack: best shift {} ({:.2})", best.key, best.log_prob);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::unseen;
    use triplelock_lang::english;

    #[test]
    fn test_recovers_every_shift() {
        let model = english();
        let breaker = CaesarBreaker::new(&*model);
        for text in ["HELLO WORLD", "Defend the east wall", "ATTACK AT DAWN"] {
            for shift in [1, 3, 7, 13, 25] {
                let key = ShiftKey::new(shift);
                let result = breaker.attack(&Caesar::encrypt(text, key));
                let best = result.best().unwrap();
                assert_eq!(best.key, key, "{} shifted by {}", text, shift);
                assert_eq!(best.plaintext, text);
            }
        }
    }

    #[test]
    fn test_recovers_text_outside_the_corpus() {
        let model = english();
        let breaker = CaesarBreaker::new(&*model);
        for text in ["please bring coffee", "JOHN LOVES MARY", "send more money to the bank"] {
            for shift in [2, 9, 17] {
                let key = ShiftKey::new(shift);
                let best = breaker.attack(&Caesar::encrypt(unseen(text), key)).candidates.remove(0);
                assert_eq!(best.key, key, "{} shifted by {}", text, shift);
                assert_eq!(best.plaintext, text);
            }
        }
    }

    #[test]
    fn test_full_ranking() {
        let model = english();
        let result = CaesarBreaker::new(&*model).attack("KHOOR ZRUOG");
        assert_eq!(result.len(), 26);
        assert_eq!(result.searched, 26);
        assert!(result
            .candidates
            .windows(2)
            .all(|w| w[0].log_prob >= w[1].log_prob));
        assert!(result.candidates.iter().all(|c| (0.0..=1.0).contains(&c.score)));
        assert_eq!(result.best().unwrap().plaintext, "HELLO WORLD");
        assert!(!result.best().unwrap().details.details.is_empty());
    }

    #[test]
    fn test_no_letters_ties_on_smallest_shift() {
        let model = english();
        let result = CaesarBreaker::new(&*model).attack("12 34");
        let keys: Vec<u8> = result.candidates.iter().take(3).map(|c| c.key.value()).collect();
        assert_eq!(keys, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_ciphertext() {
        let model = english();
        let result = CaesarBreaker::new(&*model).attack("");
        assert!(result.is_empty());
        assert_eq!(result.searched, 0);
    }
}
