//! Hash derivation shared by both filters.

use rand::Rng;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use siphasher::sip::SipHasher;
use std::hash::{BuildHasher, Hasher};
use std::{cmp, fmt};

/// The default hash builder for all filters.
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy)]
pub struct SipHasherBuilder {
    k0: u64,
    k1: u64,
    hasher: SipHasher,
}

impl SipHasherBuilder {
    /// Constructs a new `SipHasherBuilder` that uses the thread-local RNG to seed itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::SipHasherBuilder;
    ///
    /// let hash_builder = SipHasherBuilder::from_entropy();
    /// ```
    pub fn from_entropy() -> Self {
        let mut rng = rand::thread_rng();
        Self::from_seed(rng.gen(), rng.gen())
    }

    /// Constructs a new `SipHasherBuilder` that is seeded with the given keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::SipHasherBuilder;
    ///
    /// let hash_builder = SipHasherBuilder::from_seed(0, 0);
    /// ```
    pub fn from_seed(k0: u64, k1: u64) -> Self {
        SipHasherBuilder {
            k0,
            k1,
            hasher: SipHasher::new_with_keys(k0, k1),
        }
    }
}

impl fmt::Debug for SipHasherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SipHasherBuilder")
            .field("k0", &self.k0)
            .field("k1", &self.k1)
            .finish()
    }
}

impl cmp::PartialEq for SipHasherBuilder {
    fn eq(&self, other: &SipHasherBuilder) -> bool {
        self.k0 == other.k0 && self.k1 == other.k1
    }
}

impl BuildHasher for SipHasherBuilder {
    type Hasher = SipHasher;

    #[inline]
    fn build_hasher(&self) -> SipHasher {
        self.hasher
    }
}

/// Derives every hash a filter needs from two base hashes of a key.
///
/// Each key is hashed exactly twice, once per hasher builder. Bloom positions are derived from
/// the pair with the Kirsch-Mitzenmacher scheme, and cuckoo fingerprints and bucket indexes are
/// sliced out of the same pair. A `DoubleHasher` holds no mutable state, so the same value can be
/// copied into any number of filters and they will all agree on every derived hash.
///
/// # Examples
///
/// ```
/// use probabilistic_filters::DoubleHasher;
///
/// let hasher = DoubleHasher::from_seeds(0, 1);
/// assert_eq!(hasher.base_hashes("foo"), hasher.base_hashes(b"foo"));
///
/// let positions: Vec<usize> = hasher.bloom_positions("foo", 3, 100).collect();
/// assert_eq!(positions.len(), 3);
/// assert!(positions.iter().all(|&position| position < 100));
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DoubleHasher<B = SipHasherBuilder> {
    hash_builders: [B; 2],
}

impl DoubleHasher {
    /// Constructs a new `DoubleHasher` with both hasher builders seeded from entropy.
    pub fn new() -> Self {
        Self::with_hashers([
            SipHasherBuilder::from_entropy(),
            SipHasherBuilder::from_entropy(),
        ])
    }

    /// Constructs a new `DoubleHasher` with two fixed seeds. Two derivers built from the same
    /// seeds produce identical hashes.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::DoubleHasher;
    ///
    /// let hasher = DoubleHasher::from_seeds(0, 1);
    /// assert_eq!(hasher, DoubleHasher::from_seeds(0, 1));
    /// ```
    pub fn from_seeds(seed_1: u64, seed_2: u64) -> Self {
        Self::with_hashers([
            SipHasherBuilder::from_seed(seed_1, seed_1),
            SipHasherBuilder::from_seed(seed_2, seed_2),
        ])
    }
}

impl Default for DoubleHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> DoubleHasher<B>
where
    B: BuildHasher,
{
    /// Constructs a new `DoubleHasher` from two hasher builders.
    pub fn with_hashers(hash_builders: [B; 2]) -> Self {
        DoubleHasher { hash_builders }
    }

    /// Returns the two base hashes of `key`.
    pub fn base_hashes<K>(&self, key: K) -> (u64, u64)
    where
        K: AsRef<[u8]>,
    {
        let key = key.as_ref();
        (
            hash(&self.hash_builders[0], key),
            hash(&self.hash_builders[1], key),
        )
    }

    /// Returns an iterator over the `hasher_count` Bloom positions of `key` in `[0, len)`.
    ///
    /// Position `i` is `(h1 + i * h2) mod len`. If `h2` is a multiple of `len` the step is bumped
    /// to `1` so the positions do not all collapse onto `h1 mod len`. The walk visits
    /// `len / gcd(h2 mod len, len)` distinct positions before it cycles, so fewer than
    /// `hasher_count` positions are yielded when the cycle is shorter. Positions never repeat.
    ///
    /// # Panics
    ///
    /// Panics if `len` is 0.
    pub fn bloom_positions<K>(&self, key: K, hasher_count: usize, len: usize) -> BloomPositions
    where
        K: AsRef<[u8]>,
    {
        assert!(len > 0);
        let (h1, h2) = self.base_hashes(key);
        BloomPositions::new(h1, h2, hasher_count, len)
    }

    /// Returns the `fingerprint_bit_count`-bit fingerprint of `key`. The fingerprint is never 0.
    pub fn fingerprint<K>(&self, key: K, fingerprint_bit_count: usize) -> u32
    where
        K: AsRef<[u8]>,
    {
        let (h1, _) = self.base_hashes(key);
        fingerprint_from_hash(h1, fingerprint_bit_count)
    }

    /// Returns the primary bucket index of `key` in a table of `bucket_len` buckets.
    pub fn bucket_index<K>(&self, key: K, bucket_len: usize) -> usize
    where
        K: AsRef<[u8]>,
    {
        let (_, h2) = self.base_hashes(key);
        (h2 % bucket_len as u64) as usize
    }

    /// Returns the alternate bucket index of a fingerprint stored in `bucket_index`.
    ///
    /// The result depends only on the fingerprint and the current index, so a fingerprint can be
    /// relocated without knowing its key. When `bucket_len` is a power of two the mapping is an
    /// involution: the alternate of the alternate is the original index.
    pub fn alt_bucket_index(
        &self,
        fingerprint: u32,
        bucket_index: usize,
        bucket_len: usize,
    ) -> usize {
        ((bucket_index as u64 ^ fingerprint_hash(fingerprint)) % bucket_len as u64) as usize
    }

    /// Returns the fingerprint and both candidate bucket indexes of `key` from a single pair of
    /// base hashes.
    pub fn fingerprint_and_indexes<K>(
        &self,
        key: K,
        fingerprint_bit_count: usize,
        bucket_len: usize,
    ) -> (u32, usize, usize)
    where
        K: AsRef<[u8]>,
    {
        let (h1, h2) = self.base_hashes(key);
        let fingerprint = fingerprint_from_hash(h1, fingerprint_bit_count);
        let index_1 = (h2 % bucket_len as u64) as usize;
        let index_2 = self.alt_bucket_index(fingerprint, index_1, bucket_len);
        (fingerprint, index_1, index_2)
    }

    /// Returns a reference to the hasher builders.
    pub fn hashers(&self) -> &[B; 2] {
        &self.hash_builders
    }
}

fn hash(hash_builder: &impl BuildHasher, bytes: &[u8]) -> u64 {
    let mut hasher = hash_builder.build_hasher();
    hasher.write(bytes);
    hasher.finish()
}

fn fingerprint_from_hash(hash: u64, fingerprint_bit_count: usize) -> u32 {
    debug_assert!(fingerprint_bit_count > 0 && fingerprint_bit_count <= 32);
    let trailing_zeros = 64 - fingerprint_bit_count;
    match hash << trailing_zeros >> trailing_zeros {
        // 0 marks an empty slot
        0 => 1,
        fingerprint => fingerprint as u32,
    }
}

/// SplitMix64 finalizer. Stands in for a third hash evaluation when computing alternate buckets.
fn fingerprint_hash(fingerprint: u32) -> u64 {
    let mut z = u64::from(fingerprint).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// An iterator over the Bloom positions of a key. Created by [`DoubleHasher::bloom_positions`].
#[derive(Clone, Copy, Debug)]
pub struct BloomPositions {
    position: u64,
    step: u64,
    len: u64,
    remaining: usize,
}

impl BloomPositions {
    fn new(h1: u64, h2: u64, hasher_count: usize, len: usize) -> Self {
        let len = len as u64;
        let step = match h2 % len {
            0 => 1,
            step => step,
        };
        // the additive walk returns to its start after `len / gcd` steps
        let cycle_len = len / gcd(step, len);
        BloomPositions {
            position: h1 % len,
            step,
            len,
            remaining: cmp::min(hasher_count as u64, cycle_len) as usize,
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

impl Iterator for BloomPositions {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let ret = self.position;
        // both operands are below `len`, so the sum cannot overflow for any table that fits in
        // memory
        self.position = (self.position + self.step) % self.len;
        Some(ret as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for BloomPositions {}
