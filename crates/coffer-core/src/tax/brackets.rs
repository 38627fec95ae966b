//! Progressive bracket tables

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One band of a progressive table; `max` is `None` for the top band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    pub rate: f64,
}

/// Ordered, contiguous bracket list covering [0, inf)
#[derive(Debug, Clone, PartialEq)]
pub struct BracketTable {
    brackets: Vec<TaxBracket>,
}

impl BracketTable {
    /// Build a table, rejecting gaps, overlaps and a bounded top band
    pub fn new(name: &str, brackets: Vec<TaxBracket>) -> Result<Self> {
        let invalid = |msg: String| Error::Config(format!("Bracket table {}: {}", name, msg));

        let first = brackets
            .first()
            .ok_or_else(|| invalid("table is empty".to_string()))?;
        if first.min != 0.0 {
            return Err(invalid(format!("first bracket starts at {}", first.min)));
        }

        for (i, bracket) in brackets.iter().enumerate() {
            if !(0.0..=1.0).contains(&bracket.rate) {
                return Err(invalid(format!("rate {} outside [0,1]", bracket.rate)));
            }
            let is_last = i + 1 == brackets.len();
            match (bracket.max, is_last) {
                (None, true) => {}
                (None, false) => {
                    return Err(invalid(format!(
                        "bracket starting at {} is unbounded but not last",
                        bracket.min
                    )))
                }
                (Some(_), true) => {
                    return Err(invalid("top bracket must be unbounded".to_string()))
                }
                (Some(max), false) => {
                    if max <= bracket.min {
                        return Err(invalid(format!(
                            "bracket [{}, {}) is empty or inverted",
                            bracket.min, max
                        )));
                    }
                    let next = brackets[i + 1].min;
                    if next != max {
                        return Err(invalid(format!(
                            "bracket ending at {} is followed by one starting at {}",
                            max, next
                        )));
                    }
                }
            }
        }

        Ok(Self { brackets })
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Tax on an already-adjusted income; zero for zero or negative income
    pub fn evaluate(&self, income: f64) -> f64 {
        if !income.is_finite() || income <= 0.0 {
            return 0.0;
        }
        let mut tax = 0.0;
        for bracket in &self.brackets {
            if income <= bracket.min {
                break;
            }
            let upper = bracket.max.map_or(income, |max| income.min(max));
            tax += (upper - bracket.min) * bracket.rate;
        }
        tax.max(0.0)
    }

    /// Rate applied to the next unit of income
    pub fn marginal_rate(&self, income: f64) -> f64 {
        self.brackets
            .iter()
            .rev()
            .find(|b| income >= b.min)
            .map_or(0.0, |b| b.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bracket(min: f64, max: Option<f64>, rate: f64) -> TaxBracket {
        TaxBracket { min, max, rate }
    }

    fn sample() -> BracketTable {
        BracketTable::new(
            "sample",
            vec![
                bracket(0.0, Some(10000.0), 0.10),
                bracket(10000.0, Some(40000.0), 0.20),
                bracket(40000.0, None, 0.30),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_evaluate_progressive() {
        let table = sample();
        assert_eq!(table.evaluate(0.0), 0.0);
        assert!((table.evaluate(5000.0) - 500.0).abs() < 1e-9);
        assert!((table.evaluate(10000.0) - 1000.0).abs() < 1e-9);
        assert!((table.evaluate(50000.0) - (1000.0 + 6000.0 + 3000.0)).abs() < 1e-9);
    }

    #[test]
    fn test_negative_income_clamped() {
        assert_eq!(sample().evaluate(-25000.0), 0.0);
        assert_eq!(sample().evaluate(f64::NAN), 0.0);
    }

    #[test]
    fn test_marginal_rate() {
        let table = sample();
        assert_eq!(table.marginal_rate(0.0), 0.10);
        assert_eq!(table.marginal_rate(10000.0), 0.20);
        assert_eq!(table.marginal_rate(1_000_000.0), 0.30);
    }

    #[test]
    fn test_rejects_gap() {
        let result = BracketTable::new(
            "gap",
            vec![bracket(0.0, Some(100.0), 0.1), bracket(200.0, None, 0.2)],
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_overlap_and_bounded_top() {
        let overlap = BracketTable::new(
            "overlap",
            vec![bracket(0.0, Some(100.0), 0.1), bracket(50.0, None, 0.2)],
        );
        assert!(overlap.is_err());

        let bounded = BracketTable::new("bounded", vec![bracket(0.0, Some(100.0), 0.1)]);
        assert!(bounded.is_err());

        let nonzero = BracketTable::new("nonzero", vec![bracket(10.0, None, 0.1)]);
        assert!(nonzero.is_err());

        assert!(BracketTable::new("empty", vec![]).is_err());
    }
}
