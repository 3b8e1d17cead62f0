use rand::seq::SliceRandom;
use rand::Rng;

use crate::constants::naming::DEFAULT_NOUNS_PER_NAME;

const NOUNS: &[&str] = &[
    "anchor", "anvil", "arrow", "badger", "barrel", "beacon", "bell", "birch", "boulder",
    "bridge", "canyon", "cedar", "cinder", "cliff", "cloud", "comet", "copper", "coral",
    "crane", "crystal", "dune", "ember", "falcon", "fern", "flint", "forge", "fox", "glacier",
    "granite", "gull", "harbor", "hawk", "heron", "iron", "island", "ivy", "kettle", "lantern",
    "lark", "maple", "marsh", "meadow", "mesa", "moss", "oak", "otter", "owl", "pebble", "pine",
    "quartz", "raven", "reef", "ridge", "river", "saddle", "sail", "slate", "sparrow", "spruce",
    "stone", "storm", "summit", "thistle", "thunder", "tide", "timber", "valley", "willow",
    "wolf", "wren",
];

/// Name made of `count` random nouns joined by `-`
pub fn generate_name<R: Rng + ?Sized>(rng: &mut R, count: usize) -> String {
    (0..count.max(1))
        .filter_map(|_| NOUNS.choose(rng).copied())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn random_name() -> String {
    generate_name(&mut rand::thread_rng(), DEFAULT_NOUNS_PER_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_name_shape() {
        let name = random_name();
        let parts: Vec<&str> = name.split('-').collect();
        assert_eq!(parts.len(), DEFAULT_NOUNS_PER_NAME);
        assert!(parts.iter().all(|p| NOUNS.contains(p)));
    }

    #[test]
    fn test_seeded_names_repeat() {
        let a = generate_name(&mut StdRng::seed_from_u64(42), 3);
        let b = generate_name(&mut StdRng::seed_from_u64(42), 3);
        assert_eq!(a, b);
    }
}
