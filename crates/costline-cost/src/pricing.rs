//! Model price table.
//!
//! Rates are USD per million tokens. Lookup is a case-insensitive substring
//! match on the tier keyword; anything unrecognized is priced as Sonnet.

use crate::models::TokenCounts;

/// Model pricing in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rates {
    pub input_per_million: f64,
    pub output_per_million: f64,
    pub cache_read_per_million: f64,
    pub cache_write_per_million: f64,
}

impl Rates {
    pub const fn new(input: f64, output: f64, cache_write: f64, cache_read: f64) -> Self {
        Self {
            input_per_million: input,
            output_per_million: output,
            cache_read_per_million: cache_read,
            cache_write_per_million: cache_write,
        }
    }

    /// Calculate cost from token counts.
    pub fn cost(&self, tokens: &TokenCounts) -> f64 {
        (tokens.input as f64 * self.input_per_million / 1_000_000.0)
            + (tokens.output as f64 * self.output_per_million / 1_000_000.0)
            + (tokens.cache_read as f64 * self.cache_read_per_million / 1_000_000.0)
            + (tokens.cache_write as f64 * self.cache_write_per_million / 1_000_000.0)
    }
}

/// Opus 4.x
pub const OPUS: Rates = Rates::new(15.0, 75.0, 18.75, 1.50);

/// Sonnet 4.x, also the fallback tier
pub const SONNET: Rates = Rates::new(3.0, 15.0, 3.75, 0.30);

/// Haiku 4.x
pub const HAIKU: Rates = Rates::new(0.80, 4.0, 1.0, 0.08);

/// Price tier of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Opus,
    Sonnet,
    Haiku,
}

impl Tier {
    /// Classify a model identifier.
    pub fn of(model: &str) -> Self {
        let model = model.to_lowercase();
        if model.contains("opus") {
            Tier::Opus
        } else if model.contains("haiku") {
            Tier::Haiku
        } else {
            Tier::Sonnet
        }
    }

    pub fn rates(self) -> Rates {
        match self {
            Tier::Opus => OPUS,
            Tier::Sonnet => SONNET,
            Tier::Haiku => HAIKU,
        }
    }
}

/// Rates for a model identifier. Never fails.
pub fn rate_for(model: &str) -> Rates {
    Tier::of(model).rates()
}
