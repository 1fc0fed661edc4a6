//! Which letters to hide in the fill-in-the-blanks stage.

use language_utils::text_cleanup::{is_consonant, is_vowel};
use rand::Rng;
use rand::seq::SliceRandom;

#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BlankStrategy {
    /// Every odd position.
    Alternating,
    /// One contiguous run of positions.
    Clustered,
    /// Between half and 70% of the positions, chosen at random.
    RandomMajority,
    Vowels,
    Consonants,
}

impl BlankStrategy {
    pub const ALL: [BlankStrategy; 5] = [
        BlankStrategy::Alternating,
        BlankStrategy::Clustered,
        BlankStrategy::RandomMajority,
        BlankStrategy::Vowels,
        BlankStrategy::Consonants,
    ];

    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Positions to blank out, sorted ascending. The first letter is always shown.
pub fn generate<R: Rng + ?Sized>(chars: &[char], rng: &mut R) -> Vec<usize> {
    let strategy = BlankStrategy::choose(rng);
    generate_with(strategy, chars, rng)
}

pub fn generate_with<R: Rng + ?Sized>(
    strategy: BlankStrategy,
    chars: &[char],
    rng: &mut R,
) -> Vec<usize> {
    let len = chars.len();
    let mut blanks: Vec<usize> = match strategy {
        BlankStrategy::Alternating => (1..len).step_by(2).collect(),
        BlankStrategy::Clustered => clustered(len, rng),
        BlankStrategy::RandomMajority => random_majority(len, rng),
        BlankStrategy::Vowels => positions_where(chars, is_vowel),
        BlankStrategy::Consonants => positions_where(chars, is_consonant),
    };

    if blanks.is_empty() && len > 1 {
        blanks.push(1);
    }

    let max_blanks = (len * 3).div_ceil(4);
    while blanks.len() > max_blanks && blanks.len() > 2 {
        let victim = rng.gen_range(0..blanks.len());
        blanks.swap_remove(victim);
    }

    blanks.sort_unstable();
    blanks
}

fn positions_where(chars: &[char], predicate: fn(char) -> bool) -> Vec<usize> {
    chars
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, c)| predicate(**c))
        .map(|(i, _)| i)
        .collect()
}

fn clustered<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    if len < 2 {
        return Vec::new();
    }
    let r: f64 = rng.r#gen();
    let start = ((r * (len - 2) as f64).floor() as usize).max(1);
    let size = ((len as f64 * 0.4).floor() as usize).max(2).min(len / 2);
    (start..(start + size).min(len)).collect()
}

fn random_majority<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let r: f64 = rng.r#gen();
    let count = (len as f64 * (0.5 + r * 0.2)).floor() as usize;
    let mut candidates: Vec<usize> = (1..len).collect();
    candidates.shuffle(rng);
    candidates.truncate(count);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    const WORDS: &[&str] = &[
        "cat",
        "an",
        "rhythm",
        "aeiou",
        "February",
        "contemplative",
        "مہمان",
        "تسير السيارة",
        "a-b",
    ];

    #[test]
    fn test_invariants_for_every_strategy() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for word in WORDS {
            let word = chars(word);
            let max = (word.len() * 3).div_ceil(4);
            for strategy in BlankStrategy::ALL {
                for _ in 0..50 {
                    let blanks = generate_with(strategy, &word, &mut rng);
                    assert!(!blanks.is_empty(), "{strategy:?} {word:?}");
                    assert!(!blanks.contains(&0), "{strategy:?} {word:?}");
                    assert!(blanks.len() <= max, "{strategy:?} {word:?} {blanks:?}");
                    assert!(blanks.iter().all(|i| *i < word.len()));
                    assert!(blanks.windows(2).all(|w| w[0] < w[1]), "{blanks:?}");
                }
            }
        }
    }

    #[test]
    fn test_never_blanks_everything() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for word in WORDS {
            let word = chars(word);
            for _ in 0..200 {
                let blanks = generate(&word, &mut rng);
                assert!(blanks.len() < word.len());
                assert!(blanks.len() <= (word.len() * 3).div_ceil(4));
            }
        }
    }

    #[test]
    fn test_alternating() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let blanks = generate_with(BlankStrategy::Alternating, &chars("pattern"), &mut rng);
        assert_eq!(blanks, vec![1, 3, 5]);
    }

    #[test]
    fn test_vowels_skip_first_letter() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let blanks = generate_with(BlankStrategy::Vowels, &chars("academy"), &mut rng);
        assert_eq!(blanks, vec![2, 4]);
    }

    #[test]
    fn test_consonants() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let blanks = generate_with(BlankStrategy::Consonants, &chars("brave"), &mut rng);
        assert_eq!(blanks, vec![1, 3]);
    }

    #[test]
    fn test_no_matching_letters_falls_back_to_second_position() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let blanks = generate_with(BlankStrategy::Vowels, &chars("مہمان"), &mut rng);
        assert_eq!(blanks, vec![1]);
        let blanks = generate_with(BlankStrategy::Consonants, &chars("aeiou"), &mut rng);
        assert_eq!(blanks, vec![1]);
    }

    #[test]
    fn test_clustered_is_contiguous() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let blanks = generate_with(BlankStrategy::Clustered, &chars("furniture"), &mut rng);
            assert_eq!(blanks.len(), 3);
            assert!(blanks.windows(2).all(|w| w[1] == w[0] + 1));
        }
    }

    #[test]
    fn test_too_many_vowels_are_trimmed() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        // every letter after the first is a vowel
        let blanks = generate_with(BlankStrategy::Vowels, &chars("baeiouaei"), &mut rng);
        assert_eq!(blanks.len(), 7);
    }

    #[test]
    fn test_single_letter_word_has_no_blanks() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for strategy in BlankStrategy::ALL {
            assert!(generate_with(strategy, &chars("a"), &mut rng).is_empty());
        }
        assert!(generate(&[], &mut rng).is_empty());
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let word = chars("competition");
        let a: Vec<_> = {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            (0..10).map(|_| generate(&word, &mut rng)).collect()
        };
        let b: Vec<_> = {
            let mut rng = ChaCha8Rng::seed_from_u64(42);
            (0..10).map(|_| generate(&word, &mut rng)).collect()
        };
        assert_eq!(a, b);
    }
}
