use crate::types::Usage;

/// Holds the latest token-usage snapshot reported during a session.
///
/// Snapshots replace each other wholesale; nothing is merged or summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageAggregator {
    current: Option<Usage>,
}

impl UsageAggregator {
    /// Creates an aggregator holding no snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the held snapshot.
    pub fn update(&mut self, snapshot: Usage) {
        self.current = Some(snapshot);
    }

    /// The latest snapshot, or `None` if no chunk supplied one this session.
    pub fn current(&self) -> Option<Usage> {
        self.current
    }

    /// Forgets the held snapshot.
    pub fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        assert_eq!(UsageAggregator::new().current(), None);
    }

    #[test]
    fn update_overwrites_instead_of_merging() {
        let mut usage = UsageAggregator::new();
        usage.update(Usage::new(3, 2));
        usage.update(Usage::total(8));
        // The prompt/completion counts of the first snapshot are gone.
        assert_eq!(usage.current(), Some(Usage::total(8)));
    }

    #[test]
    fn reset_clears() {
        let mut usage = UsageAggregator::new();
        usage.update(Usage::total(5));
        usage.reset();
        assert_eq!(usage.current(), None);
    }
}
