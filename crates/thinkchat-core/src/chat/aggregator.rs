//! Streaming response aggregation.
//!
//! Folds incremental text fragments into a single assistant reply. No reply
//! entry exists until the first fragment arrives, so a stream that ends
//! without producing text leaves the conversation untouched.

/// Accumulates text fragments for one streamed assistant turn.
#[derive(Debug, Default)]
pub struct ResponseAggregator {
    text: Option<String>,
}

impl ResponseAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a fragment into the reply.
    ///
    /// Returns `true` when this fragment is the first one, i.e. the caller
    /// should create the assistant's conversation entry now.
    pub fn push_fragment(&mut self, fragment: &str) -> bool {
        match &mut self.text {
            Some(text) => {
                text.push_str(fragment);
                false
            }
            None => {
                self.text = Some(fragment.to_string());
                true
            }
        }
    }

    /// The reply accumulated so far, if any fragment has arrived.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    #[must_use]
    pub fn has_started(&self) -> bool {
        self.text.is_some()
    }

    /// Consumes the aggregator, yielding the full reply.
    ///
    /// `None` means the stream completed without a single fragment.
    #[must_use]
    pub fn finish(self) -> Option<String> {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_fold_in_arrival_order() {
        let mut aggregator = ResponseAggregator::new();
        assert!(aggregator.push_fragment("Hel"));
        assert!(!aggregator.push_fragment("lo, "));
        assert!(!aggregator.push_fragment("world"));
        assert_eq!(aggregator.finish().as_deref(), Some("Hello, world"));
    }

    #[test]
    fn only_the_first_fragment_requests_an_entry() {
        let mut aggregator = ResponseAggregator::new();
        assert!(!aggregator.has_started());
        assert!(aggregator.push_fragment(""));
        assert!(aggregator.has_started());
        assert!(!aggregator.push_fragment("more"));
    }

    #[test]
    fn finishing_without_fragments_yields_none() {
        let aggregator = ResponseAggregator::new();
        assert_eq!(aggregator.finish(), None);
    }
}
