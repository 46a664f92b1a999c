//! # CacheModel
//!
//! CacheModel is a library for functional set associative cache modelling, aimed at design space
//! exploration rather than cycle accuracy
//!
//! Given a stream of addresses it reports hits, misses, miss rate and average access time for a
//! configurable size, associativity, line size, replacement policy and timing model. Only line
//! metadata is tracked, never payload bytes
//!
//! Caches, main memory, and stacks of caches all implement [`storage::StorageLevel`], so they can
//! be composed into hierarchies of any depth

/// Contains the set associative cache and its statistics
pub mod cache;

/// Contains the configuration error raised by every constructor
pub mod error;

/// Contains definitions for the JSON configuration format
pub mod config;

/// Contains the multi-level hierarchy, and its serialisable results
pub mod hierarchy;

/// Contains the terminal main memory level
pub mod memory;

/// Contains the replacement policies and the victim selection rules
pub mod replacement_policies;

/// Contains the storage level trait shared by caches, memory and hierarchies
pub mod storage;

/// Contains the memory timing model and miss pricing
pub mod timing;

/// Contains synthetic trace generators
pub mod trace;

#[cfg(test)]
mod test;
