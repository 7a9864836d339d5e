use serde::{Deserialize, Serialize};

use super::{Clause, Field, Op, Value};
use crate::config::{EARTH_RADIUS_MILES, MILES_PER_DEGREE_LAT};

/// Where to search. Set fields are ANDed; in practice callers set one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationFilter {
    pub city: Option<String>,
    pub subdivision: Option<String>,
    pub zip: Option<String>,
    pub county: Option<String>,
    /// Restrict to listings ingested from these MLS feeds.
    pub mls_sources: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_miles: Option<f64>,
}

impl LocationFilter {
    pub fn city(name: impl Into<String>) -> Self {
        Self {
            city: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn subdivision(name: impl Into<String>) -> Self {
        Self {
            subdivision: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn zip(code: impl Into<String>) -> Self {
        Self {
            zip: Some(code.into()),
            ..Self::default()
        }
    }

    pub fn county(name: impl Into<String>) -> Self {
        Self {
            county: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn radius(latitude: f64, longitude: f64, radius_miles: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            radius_miles: Some(radius_miles),
            ..Self::default()
        }
    }

    /// `place` on top of `self`: names come from `place`, feeds and radius
    /// from whichever side sets them, `place` first.
    pub fn overlaid_with(&self, place: LocationFilter) -> Self {
        let anchor = if place.geo_radius().is_some() {
            &place
        } else {
            self
        };
        let (latitude, longitude, radius_miles) =
            (anchor.latitude, anchor.longitude, anchor.radius_miles);
        let mls_sources = if place.mls_sources.is_empty() {
            self.mls_sources.clone()
        } else {
            place.mls_sources
        };
        Self {
            city: place.city,
            subdivision: place.subdivision,
            zip: place.zip,
            county: place.county,
            mls_sources,
            latitude,
            longitude,
            radius_miles,
        }
    }

    /// The radius search, if all three parts are present.
    pub fn geo_radius(&self) -> Option<GeoRadius> {
        Some(GeoRadius {
            latitude: self.latitude?,
            longitude: self.longitude?,
            radius_miles: self.radius_miles?,
        })
    }

    pub fn has_any(&self) -> bool {
        self.active_count() > 0
    }

    pub(crate) fn active_count(&self) -> usize {
        [&self.city, &self.subdivision, &self.zip, &self.county]
            .iter()
            .filter(|v| non_blank(v.as_deref()).is_some())
            .count()
            + usize::from(!self.mls_sources.is_empty())
            + usize::from(self.geo_radius().is_some())
    }

    /// Human label for logs and monitoring.
    pub fn label(&self) -> Option<String> {
        if let Some(v) = non_blank(self.city.as_deref()) {
            return Some(v.to_string());
        }
        if let Some(v) = non_blank(self.subdivision.as_deref()) {
            return Some(v.to_string());
        }
        if let Some(v) = non_blank(self.zip.as_deref()) {
            return Some(v.to_string());
        }
        if let Some(v) = non_blank(self.county.as_deref()) {
            return Some(format!("{v} County"));
        }
        self.geo_radius()
            .map(|g| format!("{:.4},{:.4} ({} mi)", g.latitude, g.longitude, g.radius_miles))
    }
}

pub fn build_location_filter(filter: &LocationFilter) -> Vec<Clause> {
    let mut clauses = Vec::new();

    let text_fields = [
        (Field::City, filter.city.as_deref()),
        (Field::Subdivision, filter.subdivision.as_deref()),
        (Field::County, filter.county.as_deref()),
    ];
    for (field, value) in text_fields {
        if let Some(value) = non_blank(value) {
            clauses.push(Clause::cmp(field, Op::EqNoCase, value));
        }
    }
    if let Some(zip) = non_blank(filter.zip.as_deref()) {
        clauses.push(Clause::eq(Field::PostalCode, zip));
    }

    let sources: Vec<Value> = filter
        .mls_sources
        .iter()
        .filter_map(|s| non_blank(Some(s)))
        .map(Value::from)
        .collect();
    if !sources.is_empty() {
        clauses.push(Clause::In {
            field: Field::MlsSource,
            values: sources,
            negated: false,
        });
    }

    if let Some(geo) = filter.geo_radius() {
        let bbox = BoundingBox::around(geo.latitude, geo.longitude, geo.radius_miles);
        clauses.push(Clause::gte(Field::Latitude, bbox.min_lat));
        clauses.push(Clause::lte(Field::Latitude, bbox.max_lat));
        clauses.push(Clause::gte(Field::Longitude, bbox.min_lng));
        clauses.push(Clause::lte(Field::Longitude, bbox.max_lng));
    }

    clauses
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRadius {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_miles: f64,
}

impl GeoRadius {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        haversine_miles(self.latitude, self.longitude, latitude, longitude) <= self.radius_miles
    }
}

/// Axis-aligned box used as the index-friendly first pass of a radius search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// 69 miles per degree of latitude; longitude degrees scaled by cos(latitude).
    pub fn around(latitude: f64, longitude: f64, radius_miles: f64) -> Self {
        let lat_delta = radius_miles / MILES_PER_DEGREE_LAT;
        let cos_lat = latitude.to_radians().cos().abs().max(1e-6);
        let lng_delta = radius_miles / (MILES_PER_DEGREE_LAT * cos_lat);
        Self {
            min_lat: latitude - lat_delta,
            max_lat: latitude + lat_delta,
            min_lng: longitude - lng_delta,
            max_lng: longitude + lng_delta,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&latitude)
            && (self.min_lng..=self.max_lng).contains(&longitude)
    }
}

pub fn haversine_miles(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * a.sqrt().atan2((1.0 - a).sqrt())
}
