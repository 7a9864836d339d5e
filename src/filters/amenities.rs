use serde::{Deserialize, Serialize};

use super::{Clause, Field, Op};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmenityFilter {
    pub pool: Option<bool>,
    pub spa: Option<bool>,
    pub view: Option<bool>,
    pub gated_community: Option<bool>,
    pub senior_community: Option<bool>,
    pub min_garage: Option<u32>,
    /// `Some(false)` means "no HOA": fee is 0, null, or was never recorded.
    pub has_hoa: Option<bool>,
    /// Listings without an HOA always satisfy a fee ceiling.
    pub max_hoa_fee: Option<f64>,
}

impl AmenityFilter {
    pub(crate) fn active_count(&self) -> usize {
        [
            self.pool.is_some(),
            self.spa.is_some(),
            self.view.is_some(),
            self.gated_community.is_some(),
            self.senior_community.is_some(),
            self.min_garage.is_some(),
            self.has_hoa.is_some(),
            self.max_hoa_fee.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    pub(crate) fn validate(&self, errors: &mut Vec<String>) {
        if let Some(fee) = self.max_hoa_fee {
            if fee < 0.0 {
                errors.push(format!("HOA fee ceiling must not be negative (got {fee})"));
            }
        }
    }
}

/// The three ways a document can say "no HOA".
fn no_hoa() -> Vec<Clause> {
    vec![
        Clause::eq(Field::HoaFee, 0.0),
        Clause::IsNull(Field::HoaFee),
        Clause::eq(Field::HoaFeePresent, false),
    ]
}

pub fn build_amenity_filter(filter: &AmenityFilter) -> Vec<Clause> {
    let mut clauses = Vec::new();

    let flags = [
        (Field::Pool, filter.pool),
        (Field::Spa, filter.spa),
        (Field::View, filter.view),
        (Field::GatedCommunity, filter.gated_community),
        (Field::SeniorCommunity, filter.senior_community),
    ];
    for (field, wanted) in flags {
        if let Some(wanted) = wanted {
            clauses.push(Clause::eq(field, wanted));
        }
    }

    if let Some(min) = filter.min_garage {
        clauses.push(Clause::gte(Field::GarageSpaces, min));
    }

    match filter.has_hoa {
        Some(false) => clauses.push(Clause::Any(no_hoa())),
        Some(true) => {
            clauses.push(Clause::eq(Field::HoaFeePresent, true));
            clauses.push(Clause::cmp(Field::HoaFee, Op::Gt, 0.0));
        }
        None => {}
    }

    if let Some(max) = filter.max_hoa_fee {
        let mut within = no_hoa();
        within.push(Clause::lte(Field::HoaFee, max));
        clauses.push(Clause::Any(within));
    }

    clauses
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_hoa_is_one_disjunction_of_three_representations() {
        let filter = AmenityFilter {
            has_hoa: Some(false),
            ..Default::default()
        };
        let clauses = build_amenity_filter(&filter);
        assert_eq!(clauses.len(), 1);
        match &clauses[0] {
            Clause::Any(parts) => assert_eq!(parts.len(), 3),
            other => panic!("expected disjunction, got {other:?}"),
        }
    }

    #[test]
    fn flags_and_garage() {
        let filter = AmenityFilter {
            pool: Some(true),
            min_garage: Some(2),
            ..Default::default()
        };
        assert_eq!(
            build_amenity_filter(&filter),
            vec![Clause::eq(Field::Pool, true), Clause::gte(Field::GarageSpaces, 2u32)]
        );
    }

    #[test]
    fn negative_fee_ceiling_is_invalid() {
        let filter = AmenityFilter {
            max_hoa_fee: Some(-1.0),
            ..Default::default()
        };
        let mut errors = Vec::new();
        filter.validate(&mut errors);
        assert_eq!(errors.len(), 1);
    }
}
