use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::stats::percent_change;
use crate::config::comparison_thresholds::*;
use crate::types::MarketStats;

/// One metric seen from both locations. `difference` is `a - b`;
/// `percent_difference` is relative to `b` and None when `b` is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub a: f64,
    pub b: f64,
    pub difference: f64,
    pub percent_difference: Option<f64>,
}

impl MetricDelta {
    pub fn new(a: f64, b: f64) -> Self {
        let difference = a - b;
        Self {
            a,
            b,
            difference: if difference.is_finite() {
                difference
            } else {
                0.0
            },
            percent_difference: percent_change(b, a),
        }
    }

    /// Both sides carry data.
    fn comparable(&self) -> bool {
        self.a > 0.0 && self.b > 0.0
    }

    /// Gap between the two sides relative to the smaller one, so it reads the
    /// same whichever side is `a`. None unless both sides carry data.
    fn gap_pct(&self) -> Option<f64> {
        if !self.comparable() {
            return None;
        }
        percent_change(self.a.min(self.b), self.a.max(self.b))
    }

    /// Names ordered larger side first.
    fn ranked<'a>(&self, name_a: &'a str, name_b: &'a str) -> (&'a str, &'a str) {
        if self.a >= self.b {
            (name_a, name_b)
        } else {
            (name_b, name_a)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub location_a: String,
    pub location_b: String,
    pub stats_a: MarketStats,
    pub stats_b: MarketStats,
    pub average_price: MetricDelta,
    pub median_price: MetricDelta,
    pub inventory: MetricDelta,
    pub price_per_sqft: MetricDelta,
    pub days_on_market: MetricDelta,
    pub insights: Vec<String>,
}

pub fn compare_locations(
    name_a: &str,
    stats_a: &MarketStats,
    name_b: &str,
    stats_b: &MarketStats,
) -> ComparisonResult {
    let average_price = MetricDelta::new(stats_a.avg_price, stats_b.avg_price);
    let median_price = MetricDelta::new(stats_a.median_price, stats_b.median_price);
    let inventory = MetricDelta::new(stats_a.total_count as f64, stats_b.total_count as f64);
    let price_per_sqft =
        MetricDelta::new(stats_a.avg_price_per_sqft, stats_b.avg_price_per_sqft);
    let days_on_market =
        MetricDelta::new(stats_a.avg_days_on_market, stats_b.avg_days_on_market);

    let mut insights = Vec::new();

    if let Some(pct) = average_price.gap_pct().filter(|p| *p > PRICE_PCT) {
        let (more, less) = average_price.ranked(name_a, name_b);
        insights.push(format!("{more} is {pct:.1}% more expensive than {less} on average."));
    }

    if price_per_sqft.gap_pct().is_some_and(|p| p > PRICE_PER_SQFT_PCT) {
        let (higher, lower) = price_per_sqft.ranked(name_a, name_b);
        insights.push(format!(
            "{higher} costs more per square foot (${:.0} vs ${:.0}) than {lower}.",
            price_per_sqft.a.max(price_per_sqft.b),
            price_per_sqft.a.min(price_per_sqft.b),
        ));
    }

    if inventory.gap_pct().is_some_and(|p| p > INVENTORY_PCT) {
        let (bigger, smaller) = inventory.ranked(name_a, name_b);
        insights.push(format!(
            "{bigger} has more inventory ({:.0} vs {:.0} listings) than {smaller}.",
            inventory.a.max(inventory.b),
            inventory.a.min(inventory.b),
        ));
    }

    if days_on_market.comparable() && days_on_market.difference.abs() > DOM_DAYS {
        let (slower, faster) = days_on_market.ranked(name_a, name_b);
        insights.push(format!(
            "Homes in {faster} sell about {:.0} days faster than in {slower}.",
            days_on_market.difference.abs()
        ));
    }

    if insights.is_empty() {
        let (first, second) = if name_a.to_lowercase() <= name_b.to_lowercase() {
            (name_a, name_b)
        } else {
            (name_b, name_a)
        };
        insights.push(format!("{first} and {second} have broadly similar market conditions."));
    }

    ComparisonResult {
        location_a: name_a.to_string(),
        location_b: name_b.to_string(),
        stats_a: stats_a.clone(),
        stats_b: stats_b.clone(),
        average_price,
        median_price,
        inventory,
        price_per_sqft,
        days_on_market,
        insights,
    }
}

/// Dimensions a buyer cares about most; each flagged one counts double.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WinnerPreferences {
    pub affordability: bool,
    pub inventory: bool,
    pub speed: bool,
    pub value: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerDecision {
    pub winner: String,
    pub score_a: u32,
    pub score_b: u32,
    /// True when the scores were equal and the tie-break rule decided.
    pub tie: bool,
}

/// Score both locations. Lower price, more inventory, faster sales and lower
/// price per sqft each earn a point (two when preferred). Dimensions where
/// either side lacks data score nothing. A tie goes to the name that sorts
/// first, so swapping the arguments never changes the winner.
pub fn determine_winner(
    comparison: &ComparisonResult,
    preferences: &WinnerPreferences,
) -> WinnerDecision {
    let mut score_a = 0u32;
    let mut score_b = 0u32;

    let dimensions = [
        (&comparison.average_price, preferences.affordability, Ordering::Less),
        (&comparison.inventory, preferences.inventory, Ordering::Greater),
        (&comparison.days_on_market, preferences.speed, Ordering::Less),
        (&comparison.price_per_sqft, preferences.value, Ordering::Less),
    ];

    for (delta, preferred, better) in dimensions {
        if !delta.comparable() {
            continue;
        }
        let points = if preferred { 2 } else { 1 };
        match delta.a.partial_cmp(&delta.b) {
            Some(ord) if ord == better => score_a += points,
            Some(Ordering::Equal) | None => {}
            Some(_) => score_b += points,
        }
    }

    let tie = score_a == score_b;
    let a_wins = match score_a.cmp(&score_b) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => {
            let a = comparison.location_a.to_lowercase();
            let b = comparison.location_b.to_lowercase();
            a <= b
        }
    };

    WinnerDecision {
        winner: if a_wins {
            comparison.location_a.clone()
        } else {
            comparison.location_b.clone()
        },
        score_a,
        score_b,
        tie,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(count: u64, avg_price: f64, ppsf: f64, dom: f64) -> MarketStats {
        MarketStats {
            total_count: count,
            avg_price,
            median_price: avg_price * 0.95,
            avg_price_per_sqft: ppsf,
            avg_days_on_market: dom,
            ..MarketStats::default()
        }
    }

    #[test]
    fn deltas_are_anti_symmetric_and_winner_is_stable() {
        let a = stats(120, 650_000.0, 320.0, 35.0);
        let b = stats(80, 520_000.0, 280.0, 52.0);
        let ab = compare_locations("Palm Desert", &a, "Indio", &b);
        let ba = compare_locations("Indio", &b, "Palm Desert", &a);

        for (x, y) in [
            (&ab.average_price, &ba.average_price),
            (&ab.median_price, &ba.median_price),
            (&ab.inventory, &ba.inventory),
            (&ab.price_per_sqft, &ba.price_per_sqft),
            (&ab.days_on_market, &ba.days_on_market),
        ] {
            assert_eq!(x.difference, -y.difference);
            let (px, py) = (x.percent_difference.unwrap(), y.percent_difference.unwrap());
            assert_eq!(px.signum(), -py.signum());
        }

        let sorted = |insights: &[String]| {
            let mut insights = insights.to_vec();
            insights.sort();
            insights
        };
        assert_eq!(sorted(&ab.insights), sorted(&ba.insights));

        // 11% dearer and 30% more stock: material from either side.
        let x = stats(130, 111_000.0, 0.0, 0.0);
        let y = stats(100, 100_000.0, 0.0, 0.0);
        let xy = compare_locations("A", &x, "B", &y);
        let yx = compare_locations("B", &y, "A", &x);
        assert_eq!(xy.insights.len(), 2, "{:?}", xy.insights);
        assert_eq!(sorted(&xy.insights), sorted(&yx.insights));

        let prefs = WinnerPreferences::default();
        assert_eq!(determine_winner(&ab, &prefs).winner, determine_winner(&ba, &prefs).winner);
    }

    #[test]
    fn sub_threshold_differences_produce_no_directional_insight() {
        let a = stats(100, 500_000.0, 300.0, 30.0);
        let b = stats(110, 520_000.0, 310.0, 35.0);
        let result = compare_locations("A", &a, "B", &b);
        let expected = vec!["A and B have broadly similar market conditions.".to_string()];
        assert_eq!(result.insights, expected);
    }

    #[test]
    fn material_differences_produce_insights() {
        let a = stats(200, 700_000.0, 400.0, 20.0);
        let b = stats(100, 500_000.0, 300.0, 45.0);
        let result = compare_locations("Rancho Mirage", &a, "Cathedral City", &b);
        assert_eq!(result.insights.len(), 4, "{:?}", result.insights);
        assert!(result.insights[0].starts_with("Rancho Mirage is 40.0% more expensive"));
        assert!(result.insights[3].contains("25 days faster"));
    }

    #[test]
    fn empty_side_yields_no_directional_insight() {
        let full = stats(10, 500_000.0, 300.0, 30.0);
        let empty = MarketStats::default();
        let expected = vec!["Empty and Full have broadly similar market conditions.".to_string()];
        assert_eq!(compare_locations("Empty", &empty, "Full", &full).insights, expected);
        assert_eq!(compare_locations("Full", &full, "Empty", &empty).insights, expected);
    }

    #[test]
    fn zero_denominator_is_guarded() {
        let a = stats(10, 500_000.0, 300.0, 30.0);
        let empty = MarketStats::default();
        let result = compare_locations("A", &a, "Empty", &empty);
        assert_eq!(result.average_price.percent_difference, None);
        assert_eq!(result.inventory.difference, 10.0);
    }

    #[test]
    fn preferences_double_the_weight() {
        // A: cheaper. B: more inventory, faster, cheaper per sqft.
        let a = stats(50, 400_000.0, 350.0, 60.0);
        let b = stats(90, 600_000.0, 300.0, 30.0);
        let cmp = compare_locations("A", &a, "B", &b);

        let neutral = determine_winner(&cmp, &WinnerPreferences::default());
        assert_eq!((neutral.score_a, neutral.score_b), (1, 3));
        assert_eq!(neutral.winner, "B");

        let budget = WinnerPreferences {
            affordability: true,
            ..Default::default()
        };
        let decision = determine_winner(&cmp, &budget);
        assert_eq!((decision.score_a, decision.score_b), (2, 3));
    }

    #[test]
    fn ties_resolve_by_name_regardless_of_order() {
        let a = stats(50, 400_000.0, 350.0, 30.0);
        let b = stats(90, 600_000.0, 300.0, 60.0);
        // A: cheaper + faster; B: more inventory + cheaper per sqft -> 2:2
        let prefs = WinnerPreferences::default();
        let ab = determine_winner(&compare_locations("Indio", &a, "Coachella", &b), &prefs);
        let ba = determine_winner(&compare_locations("Coachella", &b, "Indio", &a), &prefs);
        assert!(ab.tie && ba.tie);
        assert_eq!(ab.winner, "Coachella");
        assert_eq!(ba.winner, "Coachella");
    }
}
