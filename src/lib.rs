//! # probabilistic-filters
//!
//! `probabilistic-filters` contains two approximate membership filters that support deletion: a
//! counting Bloom filter and a cuckoo filter. Both answer "possibly present" or "definitely
//! absent" in constant expected time using a fixed amount of memory sized up front from an
//! expected item count and a target false positive probability.
//!
//! Keys are byte strings. Every key is hashed exactly twice with SipHash-2-4, and all further
//! positions and fingerprints are derived from those two hashes by a [`DoubleHasher`]. Two
//! filters sharing a `DoubleHasher` place the same key identically.
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! probabilistic-filters = "*"
//! ```
//!
//! ```rust
//! use probabilistic_filters::bloom::CountingBloomFilter;
//! use probabilistic_filters::cuckoo::CuckooFilter;
//!
//! let mut bloom = CountingBloomFilter::new(1000, 0.01)?;
//! bloom.add("foo");
//! assert!(bloom.contains("foo"));
//!
//! let mut cuckoo = CuckooFilter::new(1000, 0.01)?;
//! cuckoo.add("foo")?;
//! assert!(cuckoo.contains("foo"));
//! # Ok::<(), probabilistic_filters::Error>(())
//! ```
//!
//! Filters are `Send` and `Sync`. Queries take `&self` and updates take `&mut self`, so a filter
//! shared between threads goes behind a `RwLock`.
//!
//! With the `serde` feature enabled, both filters implement `Serialize` and `Deserialize`.
//!
//! ## References
//!
//!  - [Cuckoo Filter: Practically Better Than Bloom](https://dl.acm.org/citation.cfm?id=2674994)
//!  > Fan, Bin, Dave G. Andersen, Michael Kaminsky, and Michael D. Mitzenmacher. 2014. “Cuckoo Filter: Practically Better Than Bloom.” In *Proceedings of the 10th Acm International on Conference on Emerging Networking Experiments and Technologies*, 75–88. CoNEXT ’14. New York, NY, USA: ACM. doi:[10.1145/2674005.2674994](https://doi.org/10.1145/2674005.2674994).
//!  - [Summary Cache: A Scalable Wide-Area Web Cache Sharing Protocol](https://dl.acm.org/citation.cfm?id=343572)
//!  > Fan, Li, Pei Cao, Jussara Almeida, and Andrei Z. Broder. 2000. “Summary Cache: A Scalable Wide-Area Web Cache Sharing Protocol.” *IEEE/ACM Trans. Netw.* 8 (3). Piscataway, NJ, USA: IEEE Press: 281–93. doi:[10.1109/90.851975](https://doi.org/10.1109/90.851975).
//!  - [Less hashing, same performance: Building a better Bloom filter](https://dl.acm.org/citation.cfm?id=1400125)
//!  > Kirsch, Adam, and Michael Mitzenmacher. 2008. “Less Hashing, Same Performance: Building a Better Bloom Filter.” *Random Struct. Algorithms* 33 (2). New York, NY, USA: John Wiley & Sons, Inc.: 187–218. doi:[10.1002/rsa.v33:2](https://doi.org/10.1002/rsa.v33:2).

#![warn(missing_docs)]

mod bit_array_vec;
pub mod bloom;
pub mod cuckoo;
mod error;
mod util;

pub use crate::error::{Error, Result};
pub use crate::util::{BloomPositions, DoubleHasher, SipHasherBuilder};
