//! Property tests for the pipeline building blocks

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use wordmake::models::LeetMode;
use wordmake::services::charset::{DEFAULT_DIGITS, DEFAULT_SYMBOLS, char_len};
use wordmake::services::{Alphabet, Bounds, Deduplicator, FilterEngine, LeetTransformer, SmartRule};

fn word() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9!@#]{0,12}"
}

fn smart_rule() -> SmartRule {
    SmartRule::new(
        Alphabet::parse("digit_alphabet", DEFAULT_DIGITS).unwrap(),
        Alphabet::parse("symbol_alphabet", DEFAULT_SYMBOLS).unwrap(),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn filter_is_idempotent_and_keeps_order(
        words in prop::collection::vec(word(), 0..40),
        min in 0usize..6,
        span in 0usize..8,
    ) {
        let filter = FilterEngine::pass_all()
            .with_length(Bounds::new("length", Some(min), Some(min + span)).unwrap());

        let once = filter.apply(words.clone());
        let twice = filter.apply(once.clone());
        prop_assert_eq!(&once, &twice);

        // Survivors are a subsequence of the input
        let mut rest = words.iter();
        for kept in &once {
            prop_assert!(rest.any(|w| w == kept));
            prop_assert!((min..=min + span).contains(&char_len(kept)));
        }
    }

    #[test]
    fn dedup_keeps_first_occurrences(words in prop::collection::vec("[a-c]{1,2}", 0..60)) {
        let mut dedup = Deduplicator::new(None);
        let unique = dedup.dedupe(words.clone());

        let mut expected: Vec<String> = Vec::new();
        for w in &words {
            if !expected.contains(w) {
                expected.push(w.clone());
            }
        }
        prop_assert_eq!(&unique, &expected);
        prop_assert_eq!(dedup.duplicates() as usize, words.len() - unique.len());
    }

    #[test]
    fn smart_rule_always_satisfied(candidate in word()) {
        let (fixed, changed) = smart_rule().enforce(candidate.clone());
        prop_assert!(SmartRule::satisfied(&fixed));
        prop_assert_eq!(changed, fixed != candidate);
        prop_assert!(fixed.starts_with(&candidate));

        // Same input, same fix
        let (again, _) = smart_rule().enforce(candidate);
        prop_assert_eq!(fixed, again);
    }

    #[test]
    fn leet_variants_are_deterministic_and_length_preserving(
        candidate in "[a-z]{1,16}",
        seed in any::<u64>(),
        max in 1usize..20,
    ) {
        let leet = LeetTransformer::new(LeetMode::Partial, max);
        let first = leet.variants(&candidate, &mut ChaCha8Rng::seed_from_u64(seed));
        let second = leet.variants(&candidate, &mut ChaCha8Rng::seed_from_u64(seed));

        prop_assert_eq!(&first, &second);
        prop_assert!(!first.is_empty());
        prop_assert!(first.len() <= max);
        for variant in &first {
            prop_assert_eq!(char_len(variant), char_len(&candidate));
        }
    }
}
