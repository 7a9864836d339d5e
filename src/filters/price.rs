use serde::{Deserialize, Serialize};

use super::{check_range, push_range, Clause, Field, Op};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceFilter {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_price_per_sqft: Option<f64>,
    pub max_price_per_sqft: Option<f64>,
}

impl PriceFilter {
    pub(crate) fn active_count(&self) -> usize {
        [self.min_price, self.max_price, self.min_price_per_sqft, self.max_price_per_sqft]
            .iter()
            .filter(|v| v.is_some())
            .count()
    }

    pub(crate) fn validate(&self, errors: &mut Vec<String>) {
        check_range(errors, "price", self.min_price, self.max_price);
        check_range(errors, "price per sqft", self.min_price_per_sqft, self.max_price_per_sqft);
    }
}

pub fn build_price_filter(filter: &PriceFilter) -> Vec<Clause> {
    let mut clauses = Vec::new();
    push_range(&mut clauses, Field::Price, filter.min_price, filter.max_price);

    // Price per sqft is not stored; the store computes it per document.
    let ratios = [(Op::Gte, filter.min_price_per_sqft), (Op::Lte, filter.max_price_per_sqft)];
    for (op, bound) in ratios {
        if let Some(value) = bound {
            clauses.push(Clause::Ratio {
                numerator: Field::Price,
                denominator: Field::LivingArea,
                op,
                value,
            });
        }
    }

    clauses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_per_sqft_is_a_computed_ratio() {
        let filter = PriceFilter {
            max_price_per_sqft: Some(300.0),
            ..Default::default()
        };
        assert_eq!(
            build_price_filter(&filter),
            vec![Clause::Ratio {
                numerator: Field::Price,
                denominator: Field::LivingArea,
                op: Op::Lte,
                value: 300.0,
            }]
        );
    }

    #[test]
    fn empty_price_filter_adds_nothing() {
        assert!(build_price_filter(&PriceFilter::default()).is_empty());
    }
}
