use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}

/// Seed for one example, derived from its file, label and position in the file.
pub fn example_seed(seed: u64, file_path: &str, label: &str, ordinal: usize) -> u64 {
    stable_hash_with(|hasher| {
        seed.hash(hasher);
        file_path.hash(hasher);
        label.hash(hasher);
        ordinal.hash(hasher);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_seed_depends_on_every_component() {
        let base = example_seed(1, "a.py", "f", 0);
        assert_eq!(base, example_seed(1, "a.py", "f", 0));
        assert_ne!(base, example_seed(2, "a.py", "f", 0));
        assert_ne!(base, example_seed(1, "b.py", "f", 0));
        assert_ne!(base, example_seed(1, "a.py", "g", 0));
        assert_ne!(base, example_seed(1, "a.py", "f", 1));
    }
}
