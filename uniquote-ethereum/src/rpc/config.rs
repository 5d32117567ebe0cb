/// Configuration for splitting large multicall batches into several `eth_call` requests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MulticallBatchingConfig {
    /// Every context goes out as a single `aggregate3` call.
    #[default]
    Unbounded,
    /// Contexts with more calls are split into chunks that are sent concurrently.
    Chunked {
        /// Maximum number of calls per `aggregate3` request.
        max_calls_per_request: usize,
    },
}

impl MulticallBatchingConfig {
    /// Returns the chunk size if chunking is enabled, `None` otherwise. A chunk size of zero is
    /// treated as one.
    pub fn max_calls_per_request(&self) -> Option<usize> {
        match self {
            Self::Chunked { max_calls_per_request } => Some((*max_calls_per_request).max(1)),
            Self::Unbounded => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_max_calls_per_request_unbounded() {
        assert_eq!(MulticallBatchingConfig::Unbounded.max_calls_per_request(), None);
    }

    #[rstest]
    #[case::regular(50, 50)]
    #[case::zero_is_one(0, 1)]
    fn test_max_calls_per_request_chunked(#[case] configured: usize, #[case] expected: usize) {
        let config = MulticallBatchingConfig::Chunked { max_calls_per_request: configured };
        assert_eq!(config.max_calls_per_request(), Some(expected));
    }
}
