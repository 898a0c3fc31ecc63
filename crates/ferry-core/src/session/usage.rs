use serde::{Deserialize, Serialize};

/// Token and cost counters.
///
/// Counters only ever grow: a session spans many turns and every report is a
/// delta for the call that produced it. `context_window` is a property of the
/// current model, so the latest report wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u64>,
}

impl Usage {
    pub fn input(tokens: u64) -> Self {
        Self {
            input_tokens: tokens,
            ..Self::default()
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.output_tokens)
            .saturating_add(self.cache_read_tokens)
            .saturating_add(self.cache_creation_tokens)
    }

    pub fn accumulate(&mut self, delta: &Usage) {
        self.input_tokens = self.input_tokens.saturating_add(delta.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(delta.output_tokens);
        self.cache_read_tokens = self.cache_read_tokens.saturating_add(delta.cache_read_tokens);
        self.cache_creation_tokens = self
            .cache_creation_tokens
            .saturating_add(delta.cache_creation_tokens);
        if delta.cost_usd.is_finite() && delta.cost_usd > 0.0 {
            self.cost_usd += delta.cost_usd;
        }
        if delta.context_window.is_some() {
            self.context_window = delta.context_window;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_adds_counters() {
        let mut usage = Usage::input(100);
        usage.accumulate(&Usage::input(50));
        assert_eq!(usage.input_tokens, 150);
        assert_eq!(usage.total_tokens(), 150);
    }

    #[test]
    fn context_window_is_latest_wins() {
        let mut usage = Usage::default();
        usage.accumulate(&Usage {
            context_window: Some(200_000),
            ..Usage::default()
        });
        usage.accumulate(&Usage::input(10));
        assert_eq!(usage.context_window, Some(200_000));
        usage.accumulate(&Usage {
            context_window: Some(1_000_000),
            ..Usage::default()
        });
        assert_eq!(usage.context_window, Some(1_000_000));
    }

    #[test]
    fn non_finite_cost_is_ignored() {
        let mut usage = Usage {
            cost_usd: 0.5,
            ..Usage::default()
        };
        usage.accumulate(&Usage {
            cost_usd: f64::NAN,
            ..Usage::default()
        });
        assert!((usage.cost_usd - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn decodes_partial_reports() {
        let usage: Usage = serde_json::from_str(r#"{"inputTokens": 12}"#).unwrap();
        assert_eq!(usage, Usage::input(12));
    }
}
