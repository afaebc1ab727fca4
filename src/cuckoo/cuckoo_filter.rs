use crate::cuckoo::{DEFAULT_ENTRIES_PER_INDEX, DEFAULT_MAX_KICKS, TARGET_LOAD_FACTOR};
use crate::error::{validate_fpp, validate_item_count, Error, Result};
use crate::bit_array_vec::{BitArrayVec, MAX_BIT_COUNT as MAX_FINGERPRINT_BIT_COUNT};
use crate::{DoubleHasher, SipHasherBuilder};
use log::{debug, trace, warn};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use std::hash::BuildHasher;

/// A space-efficient probabilistic data structure to test for membership in a set. Cuckoo filters
/// also provide the flexibility to remove items.
///
/// A cuckoo filter is based on cuckoo hashing and is essentially a cuckoo hash table storing
/// each keys' fingerprint. Every fingerprint has two candidate buckets, and the alternate bucket
/// can be computed from the fingerprint and its current bucket alone, so a full bucket can make
/// room by moving one of its fingerprints to that fingerprint's other bucket. Insertion performs
/// at most `max_kicks` such displacements before giving up with `Error::FilterFull`, in which case
/// the filter is left untouched.
///
/// Adding the same key twice stores two copies of its fingerprint, and each `remove` deletes one
/// copy. Two keys that share a fingerprint and a candidate bucket are indistinguishable, so
/// removing one of them may delete the other's entry.
///
/// # Examples
///
/// ```
/// use probabilistic_filters::cuckoo::CuckooFilter;
///
/// let mut filter = CuckooFilter::new(100, 0.01)?;
///
/// assert!(!filter.contains("foo"));
/// filter.add("foo")?;
/// assert!(filter.contains("foo"));
///
/// assert!(filter.remove("foo"));
/// assert!(!filter.contains("foo"));
///
/// assert_eq!(filter.len(), 0);
/// assert_eq!(filter.capacity(), 128);
/// assert_eq!(filter.bucket_len(), 32);
/// assert_eq!(filter.fingerprint_bit_count(), 10);
/// # Ok::<(), probabilistic_filters::Error>(())
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(
        crate = "serde_crate",
        bound(
            serialize = "B: Serialize",
            deserialize = "B: Deserialize<'de>, R: SeedableRng"
        )
    )
)]
pub struct CuckooFilter<B = SipHasherBuilder, R = XorShiftRng> {
    max_kicks: usize,
    entries_per_index: usize,
    fingerprint_vec: BitArrayVec,
    hasher: DoubleHasher<B>,
    #[cfg_attr(feature = "serde", serde(skip, default = "SeedableRng::from_entropy"))]
    rng: R,
}

impl CuckooFilter {
    /// Constructs a new, empty `CuckooFilter` sized for `expected_items` items at a maximum false
    /// positive probability of `fpp`. The filter has 4 entries per bucket, allows 500
    /// displacements per insertion, and is seeded from entropy.
    ///
    /// The number of buckets is chosen for a load factor of 0.95 at `expected_items` and rounded
    /// up to the next power of two. The fingerprint bit count is `ceil(log2(2 * 4 / fpp))`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `expected_items` is 0, if `fpp` is not in `(0, 1)`, or
    /// if `fpp` would need fingerprints wider than 32 bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::cuckoo::CuckooFilter;
    ///
    /// let filter = CuckooFilter::new(100, 0.01)?;
    /// assert!(CuckooFilter::new(0, 0.01).is_err());
    /// assert!(CuckooFilter::new(100, 1e-12).is_err());
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn new(expected_items: usize, fpp: f64) -> Result<Self> {
        Self::with_hasher(
            expected_items,
            fpp,
            DoubleHasher::new(),
            XorShiftRng::from_entropy(),
        )
    }

    /// Constructs a new, empty `CuckooFilter` sized for `expected_items` items at a maximum false
    /// positive probability of `fpp`, with `entries_per_index` entries per bucket.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `expected_items` or `entries_per_index` is 0, if `fpp`
    /// is not in `(0, 1)`, or if `fpp` would need fingerprints wider than 32 bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::cuckoo::CuckooFilter;
    ///
    /// let filter = CuckooFilter::from_entries_per_index(100, 0.01, 2)?;
    /// assert_eq!(filter.entries_per_index(), 2);
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn from_entries_per_index(
        expected_items: usize,
        fpp: f64,
        entries_per_index: usize,
    ) -> Result<Self> {
        Self::from_entries_per_index_with_hasher(
            expected_items,
            fpp,
            entries_per_index,
            DoubleHasher::new(),
            XorShiftRng::from_entropy(),
        )
    }
}

impl<B, R> CuckooFilter<B, R>
where
    B: BuildHasher,
    R: Rng,
{
    fn get_fingerprint_bit_count(fpp: f64, entries_per_index: usize) -> Result<usize> {
        let fingerprint_bit_count = (2.0 * entries_per_index as f64 / fpp).log2().ceil() as usize;
        if fingerprint_bit_count > MAX_FINGERPRINT_BIT_COUNT {
            return Err(Error::invalid_parameter(
                "target_fp_rate",
                format!(
                    "{} needs {}-bit fingerprints, at most {} are supported",
                    fpp, fingerprint_bit_count, MAX_FINGERPRINT_BIT_COUNT,
                ),
            ));
        }
        Ok(fingerprint_bit_count.max(1))
    }

    fn get_bucket_len(expected_items: usize, entries_per_index: usize) -> usize {
        (expected_items as f64 / (entries_per_index as f64 * TARGET_LOAD_FACTOR)).ceil() as usize
    }

    /// Constructs a new, empty `CuckooFilter` sized for `expected_items` items at a maximum false
    /// positive probability of `fpp`, with 4 entries per bucket, the given hasher, and the given
    /// random source for choosing displacement victims.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `expected_items` is 0, if `fpp` is not in `(0, 1)`, or
    /// if `fpp` would need fingerprints wider than 32 bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::cuckoo::CuckooFilter;
    /// use probabilistic_filters::DoubleHasher;
    /// use rand::SeedableRng;
    /// use rand_xorshift::XorShiftRng;
    ///
    /// let filter = CuckooFilter::with_hasher(
    ///     100,
    ///     0.01,
    ///     DoubleHasher::from_seeds(0, 1),
    ///     XorShiftRng::seed_from_u64(0),
    /// )?;
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn with_hasher(
        expected_items: usize,
        fpp: f64,
        hasher: DoubleHasher<B>,
        rng: R,
    ) -> Result<Self> {
        Self::from_entries_per_index_with_hasher(
            expected_items,
            fpp,
            DEFAULT_ENTRIES_PER_INDEX,
            hasher,
            rng,
        )
    }

    /// Constructs a new, empty `CuckooFilter` sized for `expected_items` items at a maximum false
    /// positive probability of `fpp`, with `entries_per_index` entries per bucket, the given
    /// hasher, and the given random source.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `expected_items` or `entries_per_index` is 0, if `fpp`
    /// is not in `(0, 1)`, or if `fpp` would need fingerprints wider than 32 bits.
    pub fn from_entries_per_index_with_hasher(
        expected_items: usize,
        fpp: f64,
        entries_per_index: usize,
        hasher: DoubleHasher<B>,
        rng: R,
    ) -> Result<Self> {
        validate_item_count(expected_items)?;
        validate_fpp(fpp)?;
        if entries_per_index == 0 {
            return Err(Error::invalid_parameter(
                "entries_per_index",
                "must be greater than 0",
            ));
        }
        let fingerprint_bit_count = Self::get_fingerprint_bit_count(fpp, entries_per_index)?;
        let bucket_len = Self::get_bucket_len(expected_items, entries_per_index);
        Self::from_parameters_with_hasher(
            bucket_len,
            entries_per_index,
            fingerprint_bit_count,
            hasher,
            rng,
        )
    }

    /// Constructs a new, empty `CuckooFilter` with `bucket_len` buckets of `entries_per_index`
    /// entries, each holding a `fingerprint_bit_count`-bit fingerprint. This method provides no
    /// guarantees on the false positive probability of the cuckoo filter.
    ///
    /// The number of buckets will be rounded up to the next power of two.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `bucket_len` or `entries_per_index` is 0, or if
    /// `fingerprint_bit_count` is not in `[1, 32]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::cuckoo::CuckooFilter;
    /// use probabilistic_filters::DoubleHasher;
    /// use rand::SeedableRng;
    /// use rand_xorshift::XorShiftRng;
    ///
    /// let filter = CuckooFilter::from_parameters_with_hasher(
    ///     5,
    ///     2,
    ///     8,
    ///     DoubleHasher::from_seeds(0, 1),
    ///     XorShiftRng::seed_from_u64(0),
    /// )?;
    /// assert_eq!(filter.bucket_len(), 8);
    /// assert_eq!(filter.capacity(), 16);
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn from_parameters_with_hasher(
        bucket_len: usize,
        entries_per_index: usize,
        fingerprint_bit_count: usize,
        hasher: DoubleHasher<B>,
        rng: R,
    ) -> Result<Self> {
        if bucket_len == 0 {
            return Err(Error::invalid_parameter(
                "bucket_len",
                "must be greater than 0",
            ));
        }
        if entries_per_index == 0 {
            return Err(Error::invalid_parameter(
                "entries_per_index",
                "must be greater than 0",
            ));
        }
        if fingerprint_bit_count == 0 || fingerprint_bit_count > MAX_FINGERPRINT_BIT_COUNT {
            return Err(Error::invalid_parameter(
                "fingerprint_bit_count",
                format!(
                    "{} is not in [1, {}]",
                    fingerprint_bit_count, MAX_FINGERPRINT_BIT_COUNT,
                ),
            ));
        }

        let bucket_len = bucket_len.next_power_of_two();
        debug!(
            "cuckoo filter: {} buckets of {} entries, {}-bit fingerprints",
            bucket_len, entries_per_index, fingerprint_bit_count,
        );
        Ok(CuckooFilter {
            max_kicks: DEFAULT_MAX_KICKS,
            entries_per_index,
            fingerprint_vec: BitArrayVec::new(
                fingerprint_bit_count,
                bucket_len * entries_per_index,
            ),
            hasher,
            rng,
        })
    }

    /// Sets the maximum number of displacements per insertion.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::cuckoo::CuckooFilter;
    ///
    /// let filter = CuckooFilter::new(100, 0.01)?.with_max_kicks(100);
    /// assert_eq!(filter.max_kicks(), 100);
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn with_max_kicks(mut self, max_kicks: usize) -> Self {
        self.max_kicks = max_kicks;
        self
    }

    #[inline]
    fn get_vec_index(&self, index: usize, bucket_index: usize) -> usize {
        index * self.entries_per_index + bucket_index
    }

    fn get_fingerprint_and_indexes<K>(&self, key: K) -> (u32, usize, usize)
    where
        K: AsRef<[u8]>,
    {
        self.hasher
            .fingerprint_and_indexes(key, self.fingerprint_bit_count(), self.bucket_len())
    }

    fn insert_fingerprint(&mut self, fingerprint: u32, index: usize) -> bool {
        for bucket_index in 0..self.entries_per_index {
            let vec_index = self.get_vec_index(index, bucket_index);
            if self.fingerprint_vec.get(vec_index) == 0 {
                self.fingerprint_vec.set(vec_index, fingerprint);
                return true;
            }
        }
        false
    }

    fn contains_fingerprint(&self, fingerprint: u32, index: usize) -> bool {
        (0..self.entries_per_index).any(|bucket_index| {
            self.fingerprint_vec
                .get(self.get_vec_index(index, bucket_index))
                == fingerprint
        })
    }

    /// Inserts an item into the cuckoo filter.
    ///
    /// # Errors
    ///
    /// Returns `Error::FilterFull` if no free entry was found within `max_kicks` displacements.
    /// Every displacement is undone before returning, so the filter is unchanged and the item is
    /// not inserted.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::cuckoo::CuckooFilter;
    /// use probabilistic_filters::Error;
    ///
    /// let mut filter = CuckooFilter::new(100, 0.01)?;
    /// filter.add("foo")?;
    ///
    /// // a single bucket of 4 entries
    /// let mut full = CuckooFilter::new(1, 0.01)?.with_max_kicks(0);
    /// for _ in 0..4 {
    ///     full.add("foo")?;
    /// }
    /// assert_eq!(full.add("foo"), Err(Error::FilterFull { max_kicks: 0 }));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn add<K>(&mut self, key: K) -> Result<()>
    where
        K: AsRef<[u8]>,
    {
        let (mut fingerprint, index_1, index_2) = self.get_fingerprint_and_indexes(key);
        if self.insert_fingerprint(fingerprint, index_1)
            || self.insert_fingerprint(fingerprint, index_2)
        {
            return Ok(());
        }

        // both buckets are full, so start displacing entries
        let bucket_len = self.bucket_len();
        let mut index = if self.rng.gen::<bool>() {
            index_1
        } else {
            index_2
        };
        let mut displaced = Vec::new();

        for _ in 0..self.max_kicks {
            let bucket_index = self.rng.gen_range(0, self.entries_per_index);
            let vec_index = self.get_vec_index(index, bucket_index);
            let evicted = self.fingerprint_vec.get(vec_index);
            self.fingerprint_vec.set(vec_index, fingerprint);
            displaced.push(vec_index);

            fingerprint = evicted;
            index = self.hasher.alt_bucket_index(fingerprint, index, bucket_len);
            trace!(
                "cuckoo filter: displaced fingerprint {:#x} to bucket {}",
                fingerprint,
                index,
            );
            if self.insert_fingerprint(fingerprint, index) {
                return Ok(());
            }
        }

        // undo the displacement chain so no resident fingerprint is lost
        for vec_index in displaced.into_iter().rev() {
            let prev_fingerprint = self.fingerprint_vec.get(vec_index);
            self.fingerprint_vec.set(vec_index, fingerprint);
            fingerprint = prev_fingerprint;
        }
        warn!(
            "cuckoo filter: insert failed after {} displacements at load factor {:.3}",
            self.max_kicks,
            self.current_load_factor(),
        );
        Err(Error::FilterFull {
            max_kicks: self.max_kicks,
        })
    }

    /// Removes one copy of an item from the cuckoo filter. Returns `false`, leaving the filter
    /// unchanged, if the item's fingerprint is in neither of its buckets.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::cuckoo::CuckooFilter;
    ///
    /// let mut filter = CuckooFilter::new(100, 0.01)?;
    ///
    /// filter.add("foo")?;
    /// assert!(filter.contains("foo"));
    ///
    /// assert!(filter.remove("foo"));
    /// assert!(!filter.contains("foo"));
    /// assert!(!filter.remove("foo"));
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn remove<K>(&mut self, key: K) -> bool
    where
        K: AsRef<[u8]>,
    {
        let (fingerprint, index_1, index_2) = self.get_fingerprint_and_indexes(key);
        for &index in &[index_1, index_2] {
            for bucket_index in 0..self.entries_per_index {
                let vec_index = self.get_vec_index(index, bucket_index);
                if self.fingerprint_vec.get(vec_index) == fingerprint {
                    self.fingerprint_vec.set(vec_index, 0);
                    return true;
                }
            }
        }
        false
    }

    /// Checks if an item is possibly in the cuckoo filter.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::cuckoo::CuckooFilter;
    ///
    /// let mut filter = CuckooFilter::new(100, 0.01)?;
    ///
    /// filter.add("foo")?;
    /// assert!(filter.contains("foo"));
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn contains<K>(&self, key: K) -> bool
    where
        K: AsRef<[u8]>,
    {
        let (fingerprint, index_1, index_2) = self.get_fingerprint_and_indexes(key);
        self.contains_fingerprint(fingerprint, index_1)
            || self.contains_fingerprint(fingerprint, index_2)
    }

    /// Clears the cuckoo filter, removing all elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::cuckoo::CuckooFilter;
    ///
    /// let mut filter = CuckooFilter::new(100, 0.01)?;
    ///
    /// filter.add("foo")?;
    /// filter.clear();
    ///
    /// assert!(!filter.contains("foo"));
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn clear(&mut self) {
        self.fingerprint_vec.clear();
    }

    /// Returns the number of occupied entries in the cuckoo filter.
    pub fn len(&self) -> usize {
        self.fingerprint_vec.occupied_len()
    }

    /// Returns `true` if there are no occupied entries in the cuckoo filter.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the total number of entries in the cuckoo filter.
    pub fn capacity(&self) -> usize {
        self.fingerprint_vec.capacity()
    }

    /// Returns the number of buckets in the cuckoo filter.
    pub fn bucket_len(&self) -> usize {
        self.fingerprint_vec.capacity() / self.entries_per_index
    }

    /// Returns the number of entries per bucket in the cuckoo filter.
    pub fn entries_per_index(&self) -> usize {
        self.entries_per_index
    }

    /// Returns the number of bits in each item fingerprint.
    pub fn fingerprint_bit_count(&self) -> usize {
        self.fingerprint_vec.bit_count()
    }

    /// Returns the maximum number of displacements per insertion.
    pub fn max_kicks(&self) -> usize {
        self.max_kicks
    }

    /// Returns the fraction of entries that are occupied.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::cuckoo::CuckooFilter;
    ///
    /// let mut filter = CuckooFilter::new(100, 0.01)?;
    /// filter.add("foo")?;
    ///
    /// assert!((filter.current_load_factor() - 1.0 / 128.0).abs() < std::f64::EPSILON);
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn current_load_factor(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    /// Returns the estimated false positive probability of the cuckoo filter. This value will
    /// increase as more items are added.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::cuckoo::CuckooFilter;
    ///
    /// let mut filter = CuckooFilter::new(100, 0.01)?;
    /// assert!(filter.estimated_fpp() < std::f64::EPSILON);
    ///
    /// filter.add("foo")?;
    /// assert!(filter.estimated_fpp() > std::f64::EPSILON);
    /// assert!(filter.estimated_fpp() < 0.01);
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn estimated_fpp(&self) -> f64 {
        let fingerprints_count = 2.0f64.powi(self.fingerprint_bit_count() as i32);
        let single_fpp = (fingerprints_count - 2.0) / (fingerprints_count - 1.0);
        1.0 - single_fpp.powf(2.0 * self.entries_per_index as f64 * self.current_load_factor())
    }

    /// Returns a reference to the cuckoo filter's hasher builders.
    pub fn hashers(&self) -> &[B; 2] {
        self.hasher.hashers()
    }
}

impl<B, R> PartialEq for CuckooFilter<B, R>
where
    B: PartialEq,
{
    fn eq(&self, other: &CuckooFilter<B, R>) -> bool {
        self.max_kicks == other.max_kicks
            && self.entries_per_index == other.entries_per_index
            && self.fingerprint_vec == other.fingerprint_vec
            && self.hasher == other.hasher
    }
}

#[cfg(test)]
mod tests {
    use super::CuckooFilter;
    use crate::util::tests::double_hasher;
    use crate::{DoubleHasher, Error, SipHasherBuilder};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};
    use std::thread;

    fn rng() -> XorShiftRng {
        XorShiftRng::seed_from_u64(0)
    }

    fn filter(expected_items: usize, fpp: f64) -> CuckooFilter {
        CuckooFilter::with_hasher(expected_items, fpp, double_hasher(), rng()).unwrap()
    }

    fn filter_from_parameters(
        bucket_len: usize,
        entries_per_index: usize,
        fingerprint_bit_count: usize,
    ) -> CuckooFilter {
        CuckooFilter::from_parameters_with_hasher(
            bucket_len,
            entries_per_index,
            fingerprint_bit_count,
            double_hasher(),
            rng(),
        )
        .unwrap()
    }

    fn bucket(filter: &CuckooFilter, index: usize) -> Vec<u32> {
        (0..filter.entries_per_index())
            .map(|bucket_index| {
                filter
                    .fingerprint_vec
                    .get(filter.get_vec_index(index, bucket_index))
            })
            .filter(|fingerprint| *fingerprint != 0)
            .collect()
    }

    #[test]
    fn test_new() {
        let filter = filter(100, 0.01);
        assert_eq!(filter.len(), 0);
        assert!(filter.is_empty());
        assert_eq!(filter.capacity(), 128);
        assert_eq!(filter.bucket_len(), 32);
        assert_eq!(filter.fingerprint_bit_count(), 10);
        assert_eq!(filter.entries_per_index(), 4);
        assert_eq!(filter.max_kicks(), 500);
    }

    #[test]
    fn test_from_entries_per_index() {
        let filter = CuckooFilter::from_entries_per_index_with_hasher(
            100,
            0.01,
            2,
            double_hasher(),
            rng(),
        )
        .unwrap();
        assert_eq!(filter.capacity(), 128);
        assert_eq!(filter.bucket_len(), 64);
        assert_eq!(filter.fingerprint_bit_count(), 9);
        assert_eq!(filter.entries_per_index(), 2);
    }

    #[test]
    fn test_from_parameters() {
        let filter = filter_from_parameters(4, 2, 8);
        assert_eq!(filter.capacity(), 8);
        assert_eq!(filter.bucket_len(), 4);
        assert_eq!(filter.fingerprint_bit_count(), 8);
        assert_eq!(filter.entries_per_index(), 2);

        let filter = filter_from_parameters(100, 4, 16);
        assert_eq!(filter.bucket_len(), 128);
        assert_eq!(filter.capacity(), 512);
    }

    #[test]
    fn test_invalid_parameters() {
        let invalid_parameter = |result: Result<CuckooFilter, Error>| match result {
            Err(Error::InvalidParameter { name, .. }) => name,
            _ => panic!("expected an invalid parameter error"),
        };

        assert_eq!(
            invalid_parameter(CuckooFilter::with_hasher(0, 0.01, double_hasher(), rng())),
            "expected_items",
        );
        for fpp in &[0.0, 1.0, -0.1, 2.0, 1e-12] {
            assert_eq!(
                invalid_parameter(CuckooFilter::with_hasher(100, *fpp, double_hasher(), rng())),
                "target_fp_rate",
            );
        }
        assert_eq!(
            invalid_parameter(CuckooFilter::from_entries_per_index_with_hasher(
                100,
                0.01,
                0,
                double_hasher(),
                rng(),
            )),
            "entries_per_index",
        );
        assert_eq!(
            invalid_parameter(CuckooFilter::from_parameters_with_hasher(
                0,
                4,
                8,
                double_hasher(),
                rng(),
            )),
            "bucket_len",
        );
        for fingerprint_bit_count in &[0, 33] {
            assert_eq!(
                invalid_parameter(CuckooFilter::from_parameters_with_hasher(
                    4,
                    4,
                    *fingerprint_bit_count,
                    double_hasher(),
                    rng(),
                )),
                "fingerprint_bit_count",
            );
        }
    }

    #[test]
    fn test_add() {
        let mut filter = filter(100, 0.01);
        filter.add("foo").unwrap();
        assert_eq!(filter.len(), 1);
        assert!(!filter.is_empty());
        assert!(filter.contains("foo"));
    }

    #[test]
    fn test_add_small_table() {
        let mut filter = filter_from_parameters(4, 2, 8);
        let keys = ["a", "b", "c", "d", "e"];
        for (i, key) in keys.iter().enumerate() {
            filter.add(key).unwrap();
            assert!(filter.contains(key));
            assert_eq!(filter.len(), i + 1);
        }
        for key in &keys {
            assert!(filter.contains(key));
        }

        // "e" finds its primary bucket full and falls back to its alternate
        assert_eq!(bucket(&filter, 0), Vec::<u32>::new());
        assert_eq!(bucket(&filter, 1), vec![228, 142]);
        assert_eq!(bucket(&filter, 2), vec![73, 217]);
        assert_eq!(bucket(&filter, 3), vec![20]);
    }

    #[test]
    fn test_add_duplicates() {
        let mut filter = filter(100, 0.01);
        filter.add("foo").unwrap();
        filter.add("foo").unwrap();
        assert_eq!(filter.len(), 2);

        assert!(filter.remove("foo"));
        assert!(filter.contains("foo"));
        assert!(filter.remove("foo"));
        assert!(!filter.contains("foo"));
    }

    #[test]
    fn test_add_duplicates_until_full() {
        let mut filter = filter(100, 0.01);
        let mut added = 0;
        while filter.add("foo").is_ok() {
            added += 1;
            assert!(added <= 8);
        }

        // both candidate buckets hold only copies of "foo", or a single bucket if they coincide
        assert!(added == 4 || added == 8);
        assert_eq!(filter.len(), added);
        assert!(filter.contains("foo"));
    }

    #[test]
    fn test_filter_full_rolls_back() {
        let mut filter = filter_from_parameters(1, 1, 8);
        filter.add("a").unwrap();
        let snapshot = filter.fingerprint_vec.clone();

        assert_eq!(filter.add("b"), Err(Error::FilterFull { max_kicks: 500 }));
        assert_eq!(filter.fingerprint_vec, snapshot);
        assert_eq!(filter.len(), 1);
        assert!(filter.contains("a"));
        assert!(!filter.contains("b"));
    }

    #[test]
    fn test_zero_max_kicks() {
        let mut filter = filter_from_parameters(1, 2, 8).with_max_kicks(0);
        filter.add("a").unwrap();
        filter.add("b").unwrap();
        assert_eq!(filter.add("c"), Err(Error::FilterFull { max_kicks: 0 }));
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn test_fill_until_full() {
        let mut filter = filter_from_parameters(256, 4, 16);
        let mut inserted = Vec::new();
        for i in 0u32.. {
            let key = i.to_le_bytes();
            let snapshot = filter.fingerprint_vec.clone();
            match filter.add(key) {
                Ok(()) => inserted.push(key),
                Err(err) => {
                    assert_eq!(err, Error::FilterFull { max_kicks: 500 });
                    assert_eq!(filter.fingerprint_vec, snapshot);
                    break;
                }
            }
        }

        assert_eq!(filter.len(), inserted.len());
        assert!(filter.current_load_factor() > 0.85);
        for key in &inserted {
            assert!(filter.contains(key));
        }

        // every resident fingerprint sits in a candidate bucket of some inserted key with that
        // fingerprint
        let mut candidates: HashMap<u32, Vec<(usize, usize)>> = HashMap::new();
        for key in &inserted {
            let (fingerprint, index_1, index_2) = filter.get_fingerprint_and_indexes(key);
            candidates
                .entry(fingerprint)
                .or_default()
                .push((index_1, index_2));
        }
        for index in 0..filter.bucket_len() {
            for fingerprint in bucket(&filter, index) {
                assert!(candidates[&fingerprint]
                    .iter()
                    .any(|&(index_1, index_2)| index == index_1 || index == index_2));
            }
        }
    }

    #[test]
    fn test_remove() {
        let mut filter = filter(100, 0.01);
        filter.add("foo").unwrap();
        assert!(filter.remove("foo"));

        assert_eq!(filter.len(), 0);
        assert!(filter.is_empty());
        assert!(!filter.contains("foo"));
    }

    #[test]
    fn test_remove_absent() {
        let mut filter = filter(100, 0.01);
        for i in 0..50u32 {
            filter.add(i.to_le_bytes()).unwrap();
        }
        let snapshot = filter.fingerprint_vec.clone();

        let absent = (50..1000u32)
            .map(|i| i.to_le_bytes())
            .find(|key| !filter.contains(key))
            .unwrap();
        assert!(!filter.remove(absent));
        assert_eq!(filter.fingerprint_vec, snapshot);
    }

    #[test]
    fn test_remove_all() {
        let mut filter = filter_from_parameters(2, 2, 8);

        filter.add("foobar").unwrap();
        filter.add("barfoo").unwrap();
        assert!(filter.remove("foobar"));
        assert!(filter.remove("barfoo"));

        assert!(filter.is_empty());
        assert!(!filter.contains("foobar"));
        assert!(!filter.contains("barfoo"));
    }

    #[test]
    fn test_clear() {
        let mut filter = filter(100, 0.01);
        for key in &["foobar", "barfoo", "baz", "qux"] {
            filter.add(key).unwrap();
        }

        filter.clear();

        assert!(filter.is_empty());
        for key in &["foobar", "barfoo", "baz", "qux"] {
            assert!(!filter.contains(key));
        }
    }

    #[test]
    fn test_false_positive_rate() {
        // 3891 items fill 1024 buckets of 4 to the 0.95 target load
        let mut filter = filter(3891, 0.01);
        assert_eq!(filter.capacity(), 4096);
        for i in 0..3891u32 {
            filter.add(i.to_le_bytes()).unwrap();
        }
        assert!(filter.current_load_factor() > 0.949);
        for i in 0..3891u32 {
            assert!(filter.contains(i.to_le_bytes()));
        }

        let false_positives = (10_000..20_000u32)
            .filter(|i| filter.contains(i.to_le_bytes()))
            .count();
        assert!(false_positives < 200, "{} false positives", false_positives);
    }

    #[test]
    fn test_estimated_fpp() {
        let mut filter = filter(100, 0.01);
        assert!(filter.estimated_fpp() < std::f64::EPSILON);

        filter.add("foo").unwrap();

        let expected_fpp = 1.0 - ((2f64.powi(10) - 2.0) / (2f64.powi(10) - 1.0)).powf(8.0 / 128.0);
        assert!((filter.estimated_fpp() - expected_fpp).abs() < std::f64::EPSILON);
    }

    #[test]
    fn test_shared_hasher() {
        let hasher = DoubleHasher::from_seeds(7, 11);
        let mut filter_1 = CuckooFilter::with_hasher(100, 0.01, hasher, rng()).unwrap();
        let mut filter_2 = CuckooFilter::with_hasher(100, 0.01, hasher, rng()).unwrap();
        filter_1.add("foo").unwrap();
        filter_2.add("foo").unwrap();
        assert_eq!(filter_1, filter_2);
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CuckooFilter<SipHasherBuilder, XorShiftRng>>();
    }

    #[test]
    fn test_shared_readers() {
        let filter = Arc::new(RwLock::new(filter(1000, 0.01)));
        for i in 0..500u32 {
            filter.write().unwrap().add(i.to_le_bytes()).unwrap();
        }

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let filter = Arc::clone(&filter);
                thread::spawn(move || {
                    (0..500u32).all(|i| filter.read().unwrap().contains(i.to_le_bytes()))
                })
            })
            .collect();
        for i in 500..1000u32 {
            filter.write().unwrap().add(i.to_le_bytes()).unwrap();
        }

        for reader in readers {
            assert!(reader.join().unwrap());
        }
        assert_eq!(filter.read().unwrap().len(), 1000);
    }

    proptest! {
        #[test]
        fn prop_no_false_negatives(
            keys in prop::collection::hash_set(any::<Vec<u8>>(), 0..200),
        ) {
            let mut filter = filter(1000, 0.01);
            for key in &keys {
                prop_assert!(filter.add(key).is_ok());
            }
            for key in &keys {
                prop_assert!(filter.contains(key));
            }
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_ser_de() {
        let mut filter = CuckooFilter::new(100, 0.01).unwrap();
        filter.add("foo").unwrap();

        let serialized_filter = bincode::serialize(&filter).unwrap();
        let de_filter: CuckooFilter = bincode::deserialize(&serialized_filter).unwrap();

        assert!(de_filter.contains("foo"));
        assert_eq!(filter, de_filter);
    }
}
