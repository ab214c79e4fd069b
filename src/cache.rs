use crate::config::CacheParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheAccess {
    pub hit: bool,
    pub penalty: u64,
}
impl CacheAccess {
    fn hit() -> Self {
        Self { hit: true, penalty: 0 }
    }

    fn miss(penalty: u64) -> Self {
        Self { hit: false, penalty }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheBlock {
    pub tag: i64,
    pub last_access: u64,
}

// Fully associative, capacity cache_size / block_size blocks. Blocks in the
// vec are valid; absence is the invalid state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataCache {
    blocks: Vec<CacheBlock>,
}
impl DataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self) -> &[CacheBlock] {
        &self.blocks
    }

    pub fn lookup(&mut self, addr: i64, cycle: u64, params: &CacheParams) -> CacheAccess {
        if !params.enabled {
            return CacheAccess::hit();
        }

        let tag = addr.div_euclid(params.block_size());

        if let Some(block) = self.blocks.iter_mut().find(|b| b.tag == tag) {
            block.last_access = cycle;
            return CacheAccess::hit();
        }

        let capacity = params.capacity();
        if capacity == 0 {
            return CacheAccess::miss(params.miss_penalty);
        }

        if self.blocks.len() >= capacity {
            // LRU victim: smallest last_access, ties by insertion order
            let victim = self
                .blocks
                .iter()
                .enumerate()
                .min_by_key(|(idx, b)| (b.last_access, *idx))
                .map(|(idx, _)| idx)
                .unwrap();
            self.blocks.remove(victim);
        }

        self.blocks.push(CacheBlock {
            tag,
            last_access: cycle,
        });
        CacheAccess::miss(params.miss_penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> CacheParams {
        CacheParams {
            enabled: true,
            block_size: 4,
            cache_size: 8,
            miss_penalty: 10,
        }
    }

    #[test]
    fn miss_then_hit_within_block() {
        let mut cache = DataCache::new();
        assert_eq!(cache.lookup(0, 1, &params()), CacheAccess::miss(10));
        assert_eq!(cache.lookup(3, 2, &params()), CacheAccess::hit());
        assert_eq!(cache.blocks().len(), 1);
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = DataCache::new();
        // capacity 2: tags 0 and 1 fill the set, tag 2 evicts tag 0.
        cache.lookup(0, 1, &params());
        cache.lookup(4, 2, &params());
        cache.lookup(8, 3, &params());

        let tags: Vec<i64> = cache.blocks().iter().map(|b| b.tag).collect();
        assert_eq!(tags, [1, 2]);
        assert_eq!(cache.lookup(0, 4, &params()), CacheAccess::miss(10));
    }

    #[test]
    fn hit_refreshes_lru_order() {
        let mut cache = DataCache::new();
        cache.lookup(0, 1, &params());
        cache.lookup(4, 2, &params());
        cache.lookup(0, 3, &params()); // tag 0 is now the most recent
        cache.lookup(8, 4, &params()); // evicts tag 1

        let tags: Vec<i64> = cache.blocks().iter().map(|b| b.tag).collect();
        assert_eq!(tags, [0, 2]);
    }

    #[test]
    fn eviction_tie_breaks_by_insertion_order() {
        let mut cache = DataCache::new();
        cache.lookup(0, 1, &params());
        cache.lookup(4, 1, &params()); // same last_access as tag 0
        cache.lookup(8, 2, &params()); // evicts tag 0, the earlier insertion

        let tags: Vec<i64> = cache.blocks().iter().map(|b| b.tag).collect();
        assert_eq!(tags, [1, 2]);
    }

    #[test]
    fn disabled_cache_always_hits_and_stays_empty() {
        let mut cache = DataCache::new();
        let disabled = CacheParams {
            enabled: false,
            ..params()
        };
        assert_eq!(cache.lookup(0, 1, &disabled), CacheAccess::hit());
        assert_eq!(cache.lookup(100, 2, &disabled), CacheAccess::hit());
        assert!(cache.blocks().is_empty());
    }

    #[test]
    fn capacity_never_exceeded() {
        let mut cache = DataCache::new();
        for i in 0..10 {
            cache.lookup(i * 4, i as u64, &params());
        }
        assert!(cache.blocks().len() <= params().capacity());
    }
}
