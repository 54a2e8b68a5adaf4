//! Cache statistics

/// Statistics for cache operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of fresh hits
    pub hits: u64,
    /// Number of misses
    pub misses: u64,
    /// Number of stale hits (served stale while refreshing)
    pub stale_hits: u64,
    /// Number of write operations
    pub writes: u64,
    /// Number of delete operations
    pub deletes: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Number of failed backend operations
    pub failures: u64,
    /// Current number of entries
    pub size: usize,
}

impl CacheStats {
    /// Hit ratio (0.0 to 1.0), stale hits count as hits
    pub fn hit_ratio(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            (self.hits + self.stale_hits) as f64 / total as f64
        }
    }

    /// Miss ratio (0.0 to 1.0)
    pub fn miss_ratio(&self) -> f64 {
        if self.total_requests() == 0 {
            0.0
        } else {
            1.0 - self.hit_ratio()
        }
    }

    /// Total lookups
    pub fn total_requests(&self) -> u64 {
        self.hits + self.stale_hits + self.misses
    }

    /// Merge stats from another instance
    pub fn merge(&mut self, other: &CacheStats) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.stale_hits += other.stale_hits;
        self.writes += other.writes;
        self.deletes += other.deletes;
        self.evictions += other.evictions;
        self.failures += other.failures;
        self.size = other.size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stats() {
        let stats = CacheStats::default();
        assert_eq!(stats.total_requests(), 0);
        assert_eq!(stats.hit_ratio(), 0.0);
        assert_eq!(stats.miss_ratio(), 0.0);
    }

    #[test]
    fn test_hit_ratio_counts_stale() {
        let stats = CacheStats {
            hits: 60,
            stale_hits: 20,
            misses: 20,
            ..Default::default()
        };
        assert_eq!(stats.total_requests(), 100);
        assert!((stats.hit_ratio() - 0.8).abs() < f64::EPSILON);
        assert!((stats.miss_ratio() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_merge() {
        let mut a = CacheStats {
            hits: 1,
            failures: 2,
            size: 3,
            ..Default::default()
        };
        let b = CacheStats {
            hits: 4,
            failures: 1,
            size: 10,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.hits, 5);
        assert_eq!(a.failures, 3);
        assert_eq!(a.size, 10);
    }
}
