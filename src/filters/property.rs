use serde::{Deserialize, Serialize};

use super::{check_range, push_range, Clause, Field, Op};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyFilter {
    pub property_type: Option<String>,
    pub property_sub_type: Option<String>,
    pub min_beds: Option<u32>,
    pub max_beds: Option<u32>,
    pub min_baths: Option<f64>,
    pub max_baths: Option<f64>,
    pub min_sqft: Option<f64>,
    pub max_sqft: Option<f64>,
    pub min_lot_sqft: Option<f64>,
    pub max_lot_sqft: Option<f64>,
    pub min_year_built: Option<u32>,
    pub max_year_built: Option<u32>,
}

impl PropertyFilter {
    pub(crate) fn active_count(&self) -> usize {
        [
            self.property_type.is_some(),
            self.property_sub_type.is_some(),
            self.min_beds.is_some(),
            self.max_beds.is_some(),
            self.min_baths.is_some(),
            self.max_baths.is_some(),
            self.min_sqft.is_some(),
            self.max_sqft.is_some(),
            self.min_lot_sqft.is_some(),
            self.max_lot_sqft.is_some(),
            self.min_year_built.is_some(),
            self.max_year_built.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    pub(crate) fn validate(&self, errors: &mut Vec<String>) {
        check_range(errors, "beds", self.min_beds, self.max_beds);
        check_range(errors, "baths", self.min_baths, self.max_baths);
        check_range(errors, "living area", self.min_sqft, self.max_sqft);
        check_range(errors, "lot size", self.min_lot_sqft, self.max_lot_sqft);
        check_range(errors, "year built", self.min_year_built, self.max_year_built);
    }
}

pub fn build_property_filter(filter: &PropertyFilter) -> Vec<Clause> {
    let mut clauses = Vec::new();

    let kinds = [
        (Field::PropertyType, filter.property_type.as_deref()),
        (Field::PropertySubType, filter.property_sub_type.as_deref()),
    ];
    for (field, value) in kinds {
        if let Some(value) = value.map(str::trim).filter(|s| !s.is_empty()) {
            clauses.push(Clause::cmp(field, Op::EqNoCase, value));
        }
    }

    // Feeds disagree on the bedroom field name; either one may satisfy the range.
    if filter.min_beds.is_some() || filter.max_beds.is_some() {
        let alternatives = [Field::BedroomsTotal, Field::BedsTotal]
            .into_iter()
            .map(|field| {
                let mut range = Vec::new();
                push_range(&mut range, field, filter.min_beds, filter.max_beds);
                Clause::All(range)
            })
            .collect();
        clauses.push(Clause::Any(alternatives));
    }

    push_range(&mut clauses, Field::Bathrooms, filter.min_baths, filter.max_baths);
    push_range(&mut clauses, Field::LivingArea, filter.min_sqft, filter.max_sqft);
    push_range(&mut clauses, Field::LotSize, filter.min_lot_sqft, filter.max_lot_sqft);
    push_range(&mut clauses, Field::YearBuilt, filter.min_year_built, filter.max_year_built);

    clauses
}
