use std::hash::BuildHasher;
use std::hash::Hasher;

/// A hasher for keys that already store their hash, the value passed to
/// `write_u64` is the resulting hash. Used for hash tables whose entries
/// cache the hash of the value they refer to.
#[derive(Default)]
pub struct NoHasher {
    hash: u64,
}

impl Hasher for NoHasher {
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        // Only precomputed hashes are expected, but other keys are still hashed consistently.
        for byte in bytes {
            self.hash = self.hash.rotate_left(8) ^ u64::from(*byte);
        }
    }

    fn write_u64(&mut self, value: u64) {
        self.hash = value;
    }
}

/// Creates [NoHasher] instances, which start with the hash zero.
#[derive(Clone, Copy, Default)]
pub struct NoHasherBuilder;

impl BuildHasher for NoHasherBuilder {
    type Hasher = NoHasher;

    fn build_hasher(&self) -> NoHasher {
        NoHasher::default()
    }
}

#[cfg(test)]
mod tests {
    use std::hash::Hash;

    use super::*;

    #[test]
    fn test_precomputed_hash() {
        assert_eq!(NoHasherBuilder.hash_one(0xdead_beef_u64), 0xdead_beef);
        assert_eq!(NoHasherBuilder.build_hasher().finish(), 0);

        let mut hasher = NoHasherBuilder.build_hasher();
        "ab".hash(&mut hasher);
        let first = hasher.finish();

        let mut hasher = NoHasherBuilder.build_hasher();
        "ab".hash(&mut hasher);
        assert_eq!(hasher.finish(), first);
    }
}
