//! Space-efficient probabilistic data structure for approximate membership and frequency queries
//! in a multiset, with the ability to remove items.

mod counting_bloom_filter;

const DEFAULT_BITS_PER_COUNTER: usize = 4;

pub use self::counting_bloom_filter::CountingBloomFilter;
