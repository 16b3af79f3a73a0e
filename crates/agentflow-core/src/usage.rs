use serde::{Deserialize, Serialize};

/// Token accounting for a single LLM call, or the running total across a run.
///
/// `total` is always recomputed from `prompt + completion`; there is no path
/// that lets the two drift apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    #[must_use]
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Accumulate another call's usage into this running total.
    pub fn add(&mut self, other: TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens = self.prompt_tokens + self.completion_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_keeps_total_consistent() {
        let mut acc = TokenUsage::new(10, 20);
        acc.add(TokenUsage::new(5, 7));
        assert_eq!(acc.prompt_tokens, 15);
        assert_eq!(acc.completion_tokens, 27);
        assert_eq!(acc.total_tokens, 42);
    }

    proptest::proptest! {
        #[test]
        fn total_always_equals_sum(a_p in 0u64..10_000, a_c in 0u64..10_000, b_p in 0u64..10_000, b_c in 0u64..10_000) {
            let mut acc = TokenUsage::new(a_p, a_c);
            acc.add(TokenUsage::new(b_p, b_c));
            proptest::prop_assert_eq!(acc.total_tokens, acc.prompt_tokens + acc.completion_tokens);
        }
    }
}
