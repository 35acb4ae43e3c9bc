//! Which word is shown next.

use rand::Rng;

/// Current position in a word list, advanced sequentially or at random.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordNavigator {
    words: Vec<String>,
    random_order: bool,
    current: usize,
}

impl WordNavigator {
    pub fn new(words: Vec<String>, random_order: bool) -> Self {
        Self {
            words,
            random_order,
            current: 0,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_word(&self) -> Option<&str> {
        self.words.get(self.current).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Swap in a new list. The index is kept when it still fits, else it goes back to 0.
    pub fn set_words(&mut self, words: Vec<String>, random_order: bool) {
        self.words = words;
        self.random_order = random_order;
        if self.current >= self.words.len() {
            self.current = 0;
        }
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }

    /// Move to the next word. Returns the new index, or `None` for an empty list.
    ///
    /// Random order never repeats the current word when there is another to pick.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let len = self.words.len();
        if len == 0 {
            return None;
        }

        if self.random_order {
            if len > 1 {
                let mut next = self.current;
                while next == self.current {
                    next = rng.random_range(0..len);
                }
                self.current = next;
            }
        } else {
            self.current = (self.current + 1) % len;
        }
        Some(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn words(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("w{i}")).collect()
    }

    #[test]
    fn empty_list_never_moves() {
        let mut nav = WordNavigator::new(Vec::new(), false);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(nav.advance(&mut rng), None);
        assert_eq!(nav.current_index(), 0);
        assert_eq!(nav.current_word(), None);

        let mut nav = WordNavigator::new(Vec::new(), true);
        assert_eq!(nav.advance(&mut rng), None);
        assert_eq!(nav.current_index(), 0);
    }

    #[test]
    fn sequential_wraps_around() {
        let mut nav = WordNavigator::new(words(3), false);
        let mut rng = StdRng::seed_from_u64(1);
        let seen: Vec<usize> = (0..7).filter_map(|_| nav.advance(&mut rng)).collect();
        assert_eq!(seen, vec![1, 2, 0, 1, 2, 0, 1]);
    }

    #[test]
    fn random_never_repeats_and_reaches_every_other_index() {
        let len = 5;
        let mut nav = WordNavigator::new(words(len), true);
        let mut rng = StdRng::seed_from_u64(42);
        let mut hits = vec![0usize; len];

        for _ in 0..5000 {
            let before = nav.current_index();
            let after = nav.advance(&mut rng).unwrap();
            assert_ne!(before, after);
            assert!(after < len);
            hits[after] += 1;
        }
        // ~1000 each if unbiased
        for (i, count) in hits.iter().enumerate() {
            assert!(*count > 700, "index {i} hit only {count} times");
        }
    }

    #[test]
    fn random_single_word_stays_put() {
        let mut nav = WordNavigator::new(words(1), true);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(nav.advance(&mut rng), Some(0));
        assert_eq!(nav.current_word(), Some("w0"));
    }

    #[test]
    fn shrinking_the_list_keeps_index_in_range() {
        let mut nav = WordNavigator::new(words(5), false);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..4 {
            nav.advance(&mut rng);
        }
        assert_eq!(nav.current_index(), 4);

        nav.set_words(words(2), false);
        assert_eq!(nav.current_index(), 0);
        nav.set_words(words(3), false);
        assert_eq!(nav.current_index(), 0);
    }
}
