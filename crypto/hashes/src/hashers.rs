use crate::{Hash, HASH_SIZE};

/// Domain separation key for block header hashing
const BLOCK_HASH_DOMAIN: &[u8] = b"ChainstoreBlockHash";

/// Keyed blake2b-256 hasher for block headers.
///
/// Fields must be fed in a fixed order; fixed-width integers are framed
/// little-endian and variable-length fields are length-prefixed so that
/// distinct field sequences can never collide.
#[derive(Clone)]
pub struct BlockHasher(blake2b_simd::State);

impl BlockHasher {
    pub fn new() -> Self {
        Self(blake2b_simd::Params::new().hash_length(HASH_SIZE).key(BLOCK_HASH_DOMAIN).to_state())
    }

    pub fn update<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }

    pub fn update_u64(&mut self, word: u64) -> &mut Self {
        self.0.update(&word.to_le_bytes());
        self
    }

    pub fn update_var_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.update_u64(data.len() as u64);
        self.0.update(data);
        self
    }

    pub fn finalize(self) -> Hash {
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(self.0.finalize().as_bytes());
        Hash::from_bytes(bytes)
    }
}

impl Default for BlockHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::BlockHasher;

    #[test]
    fn test_hasher_determinism() {
        let mut hasher = BlockHasher::new();
        hasher.update_u64(42).update_var_bytes(b"baker");
        let first = hasher.clone().finalize();
        let second = hasher.finalize();
        assert_eq!(first, second);
    }

    #[test]
    fn test_framing_prevents_ambiguity() {
        // "ab" + "c" must not hash like "a" + "bc"
        let mut left = BlockHasher::new();
        left.update_var_bytes(b"ab").update_var_bytes(b"c");
        let mut right = BlockHasher::new();
        right.update_var_bytes(b"a").update_var_bytes(b"bc");
        assert_ne!(left.finalize(), right.finalize());
    }
}
