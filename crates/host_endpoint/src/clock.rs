//! Host clock helpers

use contracts::Clock;

/// Clock running `offset_ms` ahead of `inner`
///
/// Lets a host on the same machine as the device pretend to have its own,
/// unsynchronized clock.
#[derive(Debug, Clone)]
pub struct SkewedClock<K> {
    inner: K,
    offset_ms: i64,
}

impl<K: Clock> SkewedClock<K> {
    pub fn new(inner: K, offset_ms: i64) -> Self {
        Self { inner, offset_ms }
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }
}

impl<K: Clock> Clock for SkewedClock<K> {
    #[inline]
    fn now_ms(&self) -> i64 {
        self.inner.now_ms() + self.offset_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ManualClock;

    #[test]
    fn test_skew_follows_inner_clock() {
        let base = ManualClock::new(1_000);
        let skewed = SkewedClock::new(base.clone(), 250);
        assert_eq!(skewed.now_ms(), 1_250);
        base.advance(40);
        assert_eq!(skewed.now_ms(), 1_290);

        let behind = SkewedClock::new(base, -1_290);
        assert_eq!(behind.now_ms(), -250);
    }
}
