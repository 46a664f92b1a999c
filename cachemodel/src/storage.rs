/// The outcome of one access to a storage level
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Access {
    pub hit: bool,
    /// Cycles this level (and anything below it, on a miss) took to service the access
    pub latency: u64,
}

impl Access {
    pub fn hit(latency: u64) -> Self {
        Self { hit: true, latency }
    }

    pub fn miss(latency: u64) -> Self {
        Self { hit: false, latency }
    }
}

/// A generic trait for anything that can service a memory access: a single cache, the backing
/// memory, or a whole hierarchy of caches
///
/// Callers only ever see this contract, so levels can be stacked to any depth without a level
/// knowing the concrete type of what sits beneath it. Implementations are single threaded and
/// unsynchronised; callers must serialise accesses to one instance
pub trait StorageLevel {
    /// Services an access to the line containing `address`, updating any internal state
    ///
    /// Any 64-bit address is valid and this never fails
    ///
    /// # Arguments
    ///
    /// * `address`: The byte address. Only the line it falls in matters
    ///
    /// returns: Access
    fn access(&mut self, address: u64) -> Access;

    /// Zeroes the statistics of this level. Caches also flush every line
    fn reset_stats(&mut self);
}

impl<S: StorageLevel + ?Sized> StorageLevel for Box<S> {
    fn access(&mut self, address: u64) -> Access {
        (**self).access(address)
    }

    fn reset_stats(&mut self) {
        (**self).reset_stats()
    }
}
