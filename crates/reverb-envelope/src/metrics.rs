//! Accumulation counters for an envelope collection.
//!
//! [`EnvelopeMetrics`] tracks how many eigenverb pairings were rendered,
//! skipped, or rejected since the collection was created or last reset.

/// Counters maintained by an [`EnvelopeCollection`](crate::EnvelopeCollection).
///
/// A "contribution" here is one (source beam, receiver beam, frequency)
/// rendering of an eigenverb pair, except `rejected`, which counts whole
/// eigenverb pairs refused on numeric grounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvelopeMetrics {
    /// Contributions whose Gaussian was added to the envelope.
    pub rendered: u64,
    /// Contributions skipped because their energy did not exceed the
    /// threshold.
    pub below_threshold: u64,
    /// Eigenverb pairs rejected for an invalid footprint, duration, or
    /// energy.
    pub rejected: u64,
    /// Total number of time bins written.
    pub bins_written: u64,
}

impl EnvelopeMetrics {
    /// Add another set of counters into this one.
    pub fn merge(&mut self, other: &EnvelopeMetrics) {
        self.rendered += other.rendered;
        self.below_threshold += other.below_threshold;
        self.rejected += other.rejected;
        self.bins_written += other.bins_written;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = EnvelopeMetrics::default();
        assert_eq!(m.rendered, 0);
        assert_eq!(m.below_threshold, 0);
        assert_eq!(m.rejected, 0);
        assert_eq!(m.bins_written, 0);
    }

    #[test]
    fn merge_adds_counters() {
        let mut a = EnvelopeMetrics {
            rendered: 1,
            below_threshold: 2,
            rejected: 3,
            bins_written: 4,
        };
        a.merge(&a.clone());
        assert_eq!(
            a,
            EnvelopeMetrics {
                rendered: 2,
                below_threshold: 4,
                rejected: 6,
                bins_written: 8,
            }
        );
    }
}
