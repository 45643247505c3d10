//! Price table: load once from a configuration blob, match model ids against
//! an ordered list of regexes, compute cost in fixed-precision decimal.
//!
//! `spec.md` §4.A: "Re-architect as a precompiled ordered list; no global
//! mutable state besides an immutable post-load cache." `PriceTable` is built
//! once at bootstrap and held behind an `Arc`; nothing here mutates after
//! construction.

use aigw_common::Money;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum PriceTableError {
    #[error("invalid regex {pattern:?} at models[{index}]: {source}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Raw, deserializable shape of the price table configuration blob
/// (`spec.md` §4.A: `defaults.{prompt_per_1k, completion_per_1k}` plus an
/// ordered `models[]` list).
#[derive(Debug, Clone, Deserialize)]
pub struct PriceTableConfig {
    pub defaults: RateConfig,
    #[serde(default)]
    pub models: Vec<ModelRuleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateConfig {
    pub prompt_per_1k: Decimal,
    pub completion_per_1k: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelRuleConfig {
    #[serde(rename = "match")]
    pub pattern: String,
    #[serde(default)]
    pub prompt_per_1k: Option<Decimal>,
    #[serde(default)]
    pub completion_per_1k: Option<Decimal>,
}

#[derive(Debug, Clone)]
struct ModelRule {
    pattern: Regex,
    prompt_per_1k: Option<Decimal>,
    completion_per_1k: Option<Decimal>,
}

/// Precompiled, immutable price table. First full-string regex match wins;
/// absent rate fields inherit `defaults`.
#[derive(Debug, Clone)]
pub struct PriceTable {
    defaults: RateConfig,
    rules: Vec<ModelRule>,
}

impl PriceTable {
    pub fn load(config: PriceTableConfig) -> Result<Self, PriceTableError> {
        let mut rules = Vec::with_capacity(config.models.len());
        for (index, rule) in config.models.into_iter().enumerate() {
            // Anchor to a full-string match: "first full-match wins" (spec.md 4.A).
            let anchored = format!("^(?:{})$", rule.pattern);
            let pattern =
                Regex::new(&anchored).map_err(|source| PriceTableError::InvalidPattern {
                    index,
                    pattern: rule.pattern.clone(),
                    source,
                })?;
            rules.push(ModelRule {
                pattern,
                prompt_per_1k: rule.prompt_per_1k,
                completion_per_1k: rule.completion_per_1k,
            });
        }
        Ok(Self {
            defaults: config.defaults,
            rules,
        })
    }

    fn rates_for(&self, model: &str) -> (Decimal, Decimal) {
        for rule in &self.rules {
            if rule.pattern.is_match(model) {
                return (
                    rule.prompt_per_1k.unwrap_or(self.defaults.prompt_per_1k),
                    rule.completion_per_1k
                        .unwrap_or(self.defaults.completion_per_1k),
                );
            }
        }
        (self.defaults.prompt_per_1k, self.defaults.completion_per_1k)
    }

    /// `cost(model, pt, ct) = (pt/1000)*prompt_rate + (ct/1000)*completion_rate`.
    /// Returns `None` ("unknown") only when both token counts are absent.
    pub fn cost(
        &self,
        model: &str,
        prompt_tokens: Option<u64>,
        completion_tokens: Option<u64>,
    ) -> Option<Money> {
        if prompt_tokens.is_none() && completion_tokens.is_none() {
            return None;
        }
        let (prompt_rate, completion_rate) = self.rates_for(model);
        let pt = Decimal::from(prompt_tokens.unwrap_or(0));
        let ct = Decimal::from(completion_tokens.unwrap_or(0));
        let thousand = Decimal::from(1000u32);
        let cost = (pt / thousand) * prompt_rate + (ct / thousand) * completion_rate;
        Some(cost.round_dp(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn table() -> PriceTable {
        let config = PriceTableConfig {
            defaults: RateConfig {
                prompt_per_1k: dec!(1.0000),
                completion_per_1k: dec!(2.0000),
            },
            models: vec![ModelRuleConfig {
                pattern: "gpt-4o(-.*)?".to_string(),
                prompt_per_1k: Some(dec!(5.0000)),
                completion_per_1k: Some(dec!(15.0000)),
            }],
        };
        PriceTable::load(config).unwrap()
    }

    #[test]
    fn unknown_model_falls_back_to_defaults() {
        let t = table();
        let cost = t.cost("some-unlisted-model", Some(1000), Some(1000)).unwrap();
        assert_eq!(cost, dec!(3.0000));
    }

    #[test]
    fn matched_model_uses_its_own_rates() {
        let t = table();
        let cost = t.cost("gpt-4o-mini", Some(1000), Some(1000)).unwrap();
        assert_eq!(cost, dec!(20.0000));
    }

    #[test]
    fn cost_is_exact_decimal_for_fractional_thousands() {
        let t = table();
        // 123 prompt tokens, 456 completion tokens against defaults.
        let cost = t.cost("unlisted", Some(123), Some(456)).unwrap();
        let expected = (dec!(123) / dec!(1000)) * dec!(1.0000)
            + (dec!(456) / dec!(1000)) * dec!(2.0000);
        assert_eq!(cost, expected.round_dp(4));
    }

    #[test]
    fn both_token_counts_absent_is_unknown() {
        let t = table();
        assert_eq!(t.cost("gpt-4o", None, None), None);
    }

    #[test]
    fn one_token_count_present_is_known() {
        let t = table();
        assert!(t.cost("gpt-4o", Some(10), None).is_some());
        assert!(t.cost("gpt-4o", None, Some(10)).is_some());
    }

    #[test]
    fn full_string_match_required_not_substring() {
        let t = table();
        // "xgpt-4ox" should NOT match the gpt-4o rule because it's anchored.
        let cost = t.cost("xgpt-4ox", Some(1000), Some(1000)).unwrap();
        assert_eq!(cost, dec!(3.0000)); // falls back to defaults
    }

    #[test]
    fn first_match_wins_when_multiple_rules_could_match() {
        let config = PriceTableConfig {
            defaults: RateConfig {
                prompt_per_1k: dec!(1.0000),
                completion_per_1k: dec!(1.0000),
            },
            models: vec![
                ModelRuleConfig {
                    pattern: "gpt-4.*".to_string(),
                    prompt_per_1k: Some(dec!(9.0000)),
                    completion_per_1k: Some(dec!(9.0000)),
                },
                ModelRuleConfig {
                    pattern: "gpt-4o".to_string(),
                    prompt_per_1k: Some(dec!(1.0000)),
                    completion_per_1k: Some(dec!(1.0000)),
                },
            ],
        };
        let t = PriceTable::load(config).unwrap();
        let cost = t.cost("gpt-4o", Some(1000), Some(0)).unwrap();
        assert_eq!(cost, dec!(9.0000));
    }

    #[test]
    fn invalid_pattern_is_rejected_at_load() {
        let config = PriceTableConfig {
            defaults: RateConfig {
                prompt_per_1k: dec!(1.0000),
                completion_per_1k: dec!(1.0000),
            },
            models: vec![ModelRuleConfig {
                pattern: "(".to_string(),
                prompt_per_1k: None,
                completion_per_1k: None,
            }],
        };
        assert!(PriceTable::load(config).is_err());
    }
}
