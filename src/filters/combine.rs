use serde::{Deserialize, Serialize};
use tracing::debug;

use super::amenities::build_amenity_filter;
use super::location::build_location_filter;
use super::price::build_price_filter;
use super::property::build_property_filter;
use super::time::build_time_filter;
use super::{Clause, Field, FilterSet, Op, Query, Value};
use crate::config::NON_SALE_PROPERTY_TYPES;

/// Clauses every query carries: for-sale listing types with a positive price.
pub fn base_clauses() -> Vec<Clause> {
    vec![
        Clause::Any(vec![
            Clause::IsNull(Field::PropertyType),
            Clause::In {
                field: Field::PropertyType,
                values: NON_SALE_PROPERTY_TYPES.iter().copied().map(Value::from).collect(),
                negated: true,
            },
        ]),
        Clause::cmp(Field::Price, Op::Gt, 0.0),
    ]
}

/// Fold every dimension into one conjunction.
///
/// Dimensions are concatenated, never merged by key, so each dimension's OR
/// clauses stay independent: `(beds A OR beds B) AND (no-HOA representations)`.
pub fn combine(filters: &FilterSet) -> Query {
    let mut query = Query::default().and(base_clauses());

    if let Some(location) = &filters.location {
        query = query.and(build_location_filter(location));
        query.near = location.geo_radius();
    }
    if let Some(property) = &filters.property {
        query = query.and(build_property_filter(property));
    }
    if let Some(price) = &filters.price {
        query = query.and(build_price_filter(price));
    }
    if let Some(amenities) = &filters.amenities {
        query = query.and(build_amenity_filter(amenities));
    }
    if let Some(time) = &filters.time {
        query = query.and(build_time_filter(time));
    }

    debug!(
        clauses = query.clauses.len(),
        or_clauses = query.or_clause_count(),
        radius = query.near.is_some(),
        "combined filters: {:?}",
        query.clauses,
    );
    query
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl FilterValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Report inconsistent filters. Nothing is corrected; callers decide.
pub fn validate_filters(filters: &FilterSet) -> FilterValidation {
    let mut result = FilterValidation::default();

    match &filters.location {
        Some(location) => {
            let geo_parts = [
                location.latitude.is_some(),
                location.longitude.is_some(),
                location.radius_miles.is_some(),
            ];
            let set = geo_parts.iter().filter(|p| **p).count();
            if set > 0 && set < 3 {
                let message = "radius search requires latitude, longitude and radius together";
                result.errors.push(message.to_string());
            }
            if let Some(radius) = location.radius_miles {
                if radius <= 0.0 {
                    result.errors.push(format!("radius must be positive (got {radius})"));
                }
            }
            if let Some(lat) = location.latitude {
                if !(-90.0..=90.0).contains(&lat) {
                    result.errors.push(format!("latitude out of range (got {lat})"));
                }
            }
            if !location.has_any() && set == 0 {
                result.warnings.push("no location filter; searching all markets".to_string());
            }
        }
        None => result.warnings.push("no location filter; searching all markets".to_string()),
    }

    if let Some(property) = &filters.property {
        property.validate(&mut result.errors);
    }
    if let Some(price) = &filters.price {
        price.validate(&mut result.errors);
    }
    if let Some(amenities) = &filters.amenities {
        amenities.validate(&mut result.errors);
    }

    result
}
