// tests/integrity_property.rs

use binvisor::integrity::{compute_digest, IntegrityChecker};
use binvisor::types::DigestAlgorithm;
use proptest::prelude::*;

fn algorithms() -> impl Strategy<Value = DigestAlgorithm> {
    prop_oneof![Just(DigestAlgorithm::Blake3), Just(DigestAlgorithm::Sha256)]
}

proptest! {
    #[test]
    fn content_verifies_against_its_own_digest(
        algorithm in algorithms(),
        content in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        let checker = IntegrityChecker::new(algorithm);
        let digest = compute_digest(algorithm, &content);
        prop_assert!(checker.verify(&content, &digest));
    }

    #[test]
    fn any_single_bit_flip_is_detected(
        algorithm in algorithms(),
        content in proptest::collection::vec(any::<u8>(), 1..4096),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let checker = IntegrityChecker::new(algorithm);
        let digest = compute_digest(algorithm, &content);

        let mut mutated = content.clone();
        let i = index.index(mutated.len());
        mutated[i] ^= 1 << bit;

        prop_assert!(!checker.verify(&mutated, &digest));
    }

    #[test]
    fn digest_comparison_is_bytewise(
        content in proptest::collection::vec(any::<u8>(), 0..512),
        bit in 0u8..8,
    ) {
        let checker = IntegrityChecker::new(DigestAlgorithm::Blake3);
        let mut digest = compute_digest(DigestAlgorithm::Blake3, &content);
        digest[0] ^= 1 << bit;
        prop_assert!(!checker.verify(&content, &digest));
    }
}
