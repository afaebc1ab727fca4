use crate::bit_array_vec::BitArrayVec;
use crate::bloom::DEFAULT_BITS_PER_COUNTER;
use crate::error::{validate_fpp, validate_item_count, Error, Result};
use crate::{DoubleHasher, SipHasherBuilder};
use log::{debug, warn};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use std::hash::BuildHasher;

/// A space-efficient probabilistic data structure to test for membership in a multiset, with the
/// ability to remove items and to estimate how many times an item was added.
///
/// A counting Bloom filter replaces each bit of a Bloom filter with a small saturating counter.
/// Adding an item increments the `K` counters it hashes to, removing it decrements them, and an
/// item is possibly present if all of its `K` counters are non-zero. Like the plain Bloom filter,
/// `K` positions are simulated from two hash functions.
///
/// Counters saturate at `2^bits_per_counter - 1` and never wrap. A saturated counter can no longer
/// track removals, which raises the false positive probability; `saturated_len` reports how many
/// counters are stuck. Removing an item that was never added can decrement counters shared with
/// other items and cause false negatives for them. Decrements of counters already at zero are
/// ignored and tallied in `underflow_count`.
///
/// Counters are packed `bits_per_counter` bits apiece, so the default 4-bit counters take half a
/// byte each.
///
/// # Examples
///
/// ```
/// use probabilistic_filters::bloom::CountingBloomFilter;
///
/// let mut filter = CountingBloomFilter::new(100, 0.01)?;
///
/// assert!(!filter.contains("foo"));
/// filter.add("foo");
/// filter.add("foo");
/// assert!(filter.contains("foo"));
/// assert_eq!(filter.estimate_count("foo"), 2);
///
/// filter.remove("foo");
/// assert_eq!(filter.estimate_count("foo"), 1);
///
/// assert_eq!(filter.capacity(), 959);
/// assert_eq!(filter.hasher_count(), 7);
/// # Ok::<(), probabilistic_filters::Error>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize, Serialize),
    serde(crate = "serde_crate")
)]
pub struct CountingBloomFilter<B = SipHasherBuilder> {
    counters: BitArrayVec,
    counter_max: u8,
    bits_per_counter: usize,
    hasher: DoubleHasher<B>,
    hasher_count: usize,
    underflow_count: usize,
}

impl CountingBloomFilter {
    /// Constructs a new, empty `CountingBloomFilter` sized for `expected_items` distinct items at a
    /// maximum false positive probability of `fpp`, with 4-bit counters.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `expected_items` is 0 or if `fpp` is not in `(0, 1)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    ///
    /// let filter = CountingBloomFilter::new(10, 0.01)?;
    /// assert!(CountingBloomFilter::new(0, 0.01).is_err());
    /// assert!(CountingBloomFilter::new(10, 1.0).is_err());
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn new(expected_items: usize, fpp: f64) -> Result<Self> {
        Self::with_hasher(expected_items, fpp, DoubleHasher::new())
    }

    /// Constructs a new, empty `CountingBloomFilter` sized for `expected_items` distinct items at a
    /// maximum false positive probability of `fpp`, with `bits_per_counter`-bit counters.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `expected_items` is 0, if `fpp` is not in `(0, 1)`, or
    /// if `bits_per_counter` is not in `[1, 8]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    ///
    /// let filter = CountingBloomFilter::from_bits_per_counter(10, 0.01, 8)?;
    /// assert_eq!(filter.counter_max(), 255);
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn from_bits_per_counter(
        expected_items: usize,
        fpp: f64,
        bits_per_counter: usize,
    ) -> Result<Self> {
        Self::from_bits_per_counter_with_hasher(
            expected_items,
            fpp,
            bits_per_counter,
            DoubleHasher::new(),
        )
    }
}

impl<B> CountingBloomFilter<B>
where
    B: BuildHasher,
{
    fn get_counter_count(expected_items: usize, fpp: f64) -> usize {
        (-(expected_items as f64) * fpp.ln() / 2f64.ln().powi(2)).ceil() as usize
    }

    fn get_hasher_count(counter_count: usize, expected_items: usize) -> usize {
        let hasher_count =
            ((counter_count as f64) / (expected_items as f64) * 2f64.ln()).ceil() as usize;
        hasher_count.max(1)
    }

    /// Constructs a new, empty `CountingBloomFilter` sized for `expected_items` distinct items at a
    /// maximum false positive probability of `fpp`, with 4-bit counters and the given hasher.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `expected_items` is 0 or if `fpp` is not in `(0, 1)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    /// use probabilistic_filters::DoubleHasher;
    ///
    /// let filter = CountingBloomFilter::with_hasher(10, 0.01, DoubleHasher::from_seeds(0, 1))?;
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn with_hasher(expected_items: usize, fpp: f64, hasher: DoubleHasher<B>) -> Result<Self> {
        Self::from_bits_per_counter_with_hasher(
            expected_items,
            fpp,
            DEFAULT_BITS_PER_COUNTER,
            hasher,
        )
    }

    /// Constructs a new, empty `CountingBloomFilter` sized for `expected_items` distinct items at a
    /// maximum false positive probability of `fpp`, with `bits_per_counter`-bit counters and the
    /// given hasher.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `expected_items` is 0, if `fpp` is not in `(0, 1)`, or
    /// if `bits_per_counter` is not in `[1, 8]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    /// use probabilistic_filters::DoubleHasher;
    ///
    /// let filter = CountingBloomFilter::from_bits_per_counter_with_hasher(
    ///     10,
    ///     0.01,
    ///     2,
    ///     DoubleHasher::from_seeds(0, 1),
    /// )?;
    /// assert_eq!(filter.counter_max(), 3);
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn from_bits_per_counter_with_hasher(
        expected_items: usize,
        fpp: f64,
        bits_per_counter: usize,
        hasher: DoubleHasher<B>,
    ) -> Result<Self> {
        validate_item_count(expected_items)?;
        validate_fpp(fpp)?;
        let counter_count = Self::get_counter_count(expected_items, fpp);
        let hasher_count = Self::get_hasher_count(counter_count, expected_items);
        Self::from_parameters_with_hasher(counter_count, hasher_count, bits_per_counter, hasher)
    }

    /// Constructs a new, empty `CountingBloomFilter` with exactly `counter_count` counters of
    /// `bits_per_counter` bits, touching `hasher_count` counters per item. This method provides no
    /// guarantees on the false positive probability of the filter.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `counter_count` or `hasher_count` is 0, or if
    /// `bits_per_counter` is not in `[1, 8]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    /// use probabilistic_filters::DoubleHasher;
    ///
    /// let filter = CountingBloomFilter::from_parameters_with_hasher(
    ///     1024,
    ///     3,
    ///     4,
    ///     DoubleHasher::from_seeds(0, 1),
    /// )?;
    /// assert_eq!(filter.capacity(), 1024);
    /// assert_eq!(filter.hasher_count(), 3);
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn from_parameters_with_hasher(
        counter_count: usize,
        hasher_count: usize,
        bits_per_counter: usize,
        hasher: DoubleHasher<B>,
    ) -> Result<Self> {
        if counter_count == 0 {
            return Err(Error::invalid_parameter(
                "counter_count",
                "must be greater than 0",
            ));
        }
        if hasher_count == 0 {
            return Err(Error::invalid_parameter(
                "hasher_count",
                "must be greater than 0",
            ));
        }
        if bits_per_counter == 0 || bits_per_counter > 8 {
            return Err(Error::invalid_parameter(
                "bits_per_counter",
                format!("{} is not in [1, 8]", bits_per_counter),
            ));
        }

        debug!(
            "counting bloom filter: {} counters of {} bits, {} hashes",
            counter_count, bits_per_counter, hasher_count,
        );
        Ok(CountingBloomFilter {
            counters: BitArrayVec::new(bits_per_counter, counter_count),
            counter_max: (u16::pow(2, bits_per_counter as u32) - 1) as u8,
            bits_per_counter,
            hasher,
            hasher_count,
            underflow_count: 0,
        })
    }

    /// Adds an item to the filter, incrementing each of its counters. Counters that are already
    /// saturated stay saturated.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    ///
    /// let mut filter = CountingBloomFilter::new(10, 0.01)?;
    /// filter.add("foo");
    /// assert!(filter.contains("foo"));
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn add<K>(&mut self, key: K)
    where
        K: AsRef<[u8]>,
    {
        let counter_max = u32::from(self.counter_max);
        let mut saturated = false;
        for position in self
            .hasher
            .bloom_positions(key, self.hasher_count, self.capacity())
        {
            let counter = self.counters.get(position);
            if counter == counter_max {
                saturated = true;
            } else {
                self.counters.set(position, counter + 1);
            }
        }
        if saturated {
            debug!("counting bloom filter: add hit a saturated counter");
        }
    }

    /// Removes one occurrence of an item from the filter, decrementing each of its counters.
    ///
    /// Returns `false` if any of the item's counters was already zero, meaning the item was not
    /// present. Counters at zero are left at zero and the remaining counters are still
    /// decremented, so removing an item that was never added may introduce false negatives for
    /// other items.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    ///
    /// let mut filter = CountingBloomFilter::new(10, 0.01)?;
    ///
    /// filter.add("foo");
    /// assert!(filter.remove("foo"));
    /// assert!(!filter.contains("foo"));
    /// assert!(!filter.remove("foo"));
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn remove<K>(&mut self, key: K) -> bool
    where
        K: AsRef<[u8]>,
    {
        let mut underflowed = false;
        for position in self
            .hasher
            .bloom_positions(key, self.hasher_count, self.capacity())
        {
            match self.counters.get(position) {
                0 => underflowed = true,
                counter => self.counters.set(position, counter - 1),
            }
        }
        if underflowed {
            self.underflow_count += 1;
            warn!(
                "counting bloom filter: removed an item with a zero counter ({} so far)",
                self.underflow_count,
            );
        }
        !underflowed
    }

    /// Checks if an item is possibly in the filter.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    ///
    /// let mut filter = CountingBloomFilter::new(10, 0.01)?;
    ///
    /// assert!(!filter.contains("foo"));
    /// filter.add("foo");
    /// assert!(filter.contains("foo"));
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn contains<K>(&self, key: K) -> bool
    where
        K: AsRef<[u8]>,
    {
        self.hasher
            .bloom_positions(key, self.hasher_count, self.capacity())
            .all(|position| self.counters.get(position) > 0)
    }

    /// Returns an upper bound on the number of times an item was added, net of removals. The
    /// estimate is the minimum of the item's counters, so it never underestimates unless counters
    /// were decremented by removals of other items.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    ///
    /// let mut filter = CountingBloomFilter::new(10, 0.01)?;
    ///
    /// assert_eq!(filter.estimate_count("foo"), 0);
    /// filter.add("foo");
    /// filter.add("foo");
    /// filter.add("foo");
    /// assert_eq!(filter.estimate_count("foo"), 3);
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn estimate_count<K>(&self, key: K) -> usize
    where
        K: AsRef<[u8]>,
    {
        self.hasher
            .bloom_positions(key, self.hasher_count, self.capacity())
            .map(|position| self.counters.get(position) as usize)
            .min()
            .unwrap_or(0)
    }

    /// Clears the filter, resetting every counter and the underflow tally.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    ///
    /// let mut filter = CountingBloomFilter::new(10, 0.01)?;
    ///
    /// filter.add("foo");
    /// filter.clear();
    ///
    /// assert!(!filter.contains("foo"));
    /// assert!(filter.is_empty());
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn clear(&mut self) {
        self.counters.clear();
        self.underflow_count = 0;
    }

    /// Returns `true` if every counter is zero.
    pub fn is_empty(&self) -> bool {
        self.counters.occupied_len() == 0
    }

    /// Returns the number of counters in the filter.
    pub fn capacity(&self) -> usize {
        self.counters.capacity()
    }

    /// Returns the number of counters touched per item.
    pub fn hasher_count(&self) -> usize {
        self.hasher_count
    }

    /// Returns the width of each counter in bits.
    pub fn bits_per_counter(&self) -> usize {
        self.bits_per_counter
    }

    /// Returns the value at which counters saturate.
    pub fn counter_max(&self) -> u8 {
        self.counter_max
    }

    /// Returns the number of non-zero counters.
    pub fn count_nonzero(&self) -> usize {
        self.counters.occupied_len()
    }

    /// Returns the number of saturated counters.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    ///
    /// let mut filter = CountingBloomFilter::from_bits_per_counter(10, 0.01, 1)?;
    /// assert_eq!(filter.saturated_len(), 0);
    ///
    /// filter.add("foo");
    /// assert_eq!(filter.saturated_len(), filter.count_nonzero());
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn saturated_len(&self) -> usize {
        let counter_max = u32::from(self.counter_max);
        self.counters
            .iter()
            .filter(|counter| *counter == counter_max)
            .count()
    }

    /// Returns the number of removals that found one of their counters already at zero.
    pub fn underflow_count(&self) -> usize {
        self.underflow_count
    }

    /// Returns the fraction of counters that are non-zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    ///
    /// let mut filter = CountingBloomFilter::new(100, 0.01)?;
    /// assert!(filter.current_load_factor() < std::f64::EPSILON);
    ///
    /// filter.add("foo");
    /// assert!(filter.current_load_factor() > 0.0);
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn current_load_factor(&self) -> f64 {
        self.count_nonzero() as f64 / self.capacity() as f64
    }

    /// Returns the estimated false positive probability of the filter. This value will increase
    /// as more items are added.
    ///
    /// # Examples
    ///
    /// ```
    /// use probabilistic_filters::bloom::CountingBloomFilter;
    ///
    /// let mut filter = CountingBloomFilter::new(100, 0.01)?;
    /// assert!(filter.estimated_fpp() < std::f64::EPSILON);
    ///
    /// filter.add("foo");
    /// assert!(filter.estimated_fpp() > std::f64::EPSILON);
    /// assert!(filter.estimated_fpp() < 0.01);
    /// # Ok::<(), probabilistic_filters::Error>(())
    /// ```
    pub fn estimated_fpp(&self) -> f64 {
        self.current_load_factor().powi(self.hasher_count as i32)
    }

    /// Returns a reference to the filter's hasher builders.
    pub fn hashers(&self) -> &[B; 2] {
        self.hasher.hashers()
    }
}
