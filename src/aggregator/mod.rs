//! Store-facing aggregators. Each one validates and combines filters, runs a
//! bounded query against one collection, and returns typed results. Empty
//! matches are never errors.

pub mod active;
pub mod closed;
pub mod market_stats;

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite};
use tracing::debug;

use crate::db::sql::push_predicate;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::filters::{validate_filters, Clause, FilterSet, GeoRadius};
use crate::types::{Collection, ListingQueryOptions, Located};

pub use active::ActiveListings;
pub use closed::ClosedListings;
pub use market_stats::MarketStatsAggregator;

/// Reject inconsistent filters before any store call.
pub(crate) fn ensure_valid(filters: &FilterSet) -> Result<()> {
    let validation = validate_filters(filters);
    for warning in &validation.warnings {
        debug!(warning = %warning, "filter warning");
    }
    if validation.is_valid() {
        Ok(())
    } else {
        Err(AppError::Validation(validation.errors))
    }
}

/// A resolved page request.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Page {
    pub limit: u32,
    pub skip: u32,
}

impl Page {
    pub fn new(options: &ListingQueryOptions, limit: u32) -> Self {
        Self {
            limit,
            skip: options.skip.unwrap_or(0),
        }
    }
}

/// SELECT `projection` rows matching `clauses`, sorted and paged.
///
/// With a radius, paging happens after the exact-distance post-filter so a
/// page is never short because of bounding-box corners.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn select_rows<R, T>(
    store: &Store,
    op: &'static str,
    collection: Collection,
    projection: &str,
    clauses: &[Clause],
    near: Option<GeoRadius>,
    options: &ListingQueryOptions,
    page: Page,
) -> Result<Vec<T>>
where
    R: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
    T: From<R> + Located,
{
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
    builder.push(projection);
    builder.push(" FROM ");
    builder.push(collection.table());
    builder.push(" WHERE ");
    push_predicate(&mut builder, clauses, collection);
    builder.push(" ORDER BY ");
    builder.push(options.sort.unwrap_or_default().order_by(collection));
    if near.is_none() {
        builder.push(" LIMIT ");
        builder.push_bind(i64::from(page.limit));
        builder.push(" OFFSET ");
        builder.push_bind(i64::from(page.skip));
    }
    debug!(op, sql = builder.sql(), "select");

    let rows: Vec<R> = store
        .bounded(op, builder.build_query_as::<R>().fetch_all(store.pool()))
        .await?;
    let items = rows.into_iter().map(T::from);

    Ok(match near {
        Some(geo) => items
            .filter(|item| within(&geo, item))
            .skip(page.skip as usize)
            .take(page.limit as usize)
            .collect(),
        None => items.collect(),
    })
}

/// Count rows matching `clauses`, honouring the exact radius when set.
pub(crate) async fn count_rows(
    store: &Store,
    op: &'static str,
    collection: Collection,
    clauses: &[Clause],
    near: Option<GeoRadius>,
) -> Result<u64> {
    let projection = if near.is_some() {
        "latitude, longitude"
    } else {
        "COUNT(*)"
    };
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
    builder.push(projection);
    builder.push(" FROM ");
    builder.push(collection.table());
    builder.push(" WHERE ");
    push_predicate(&mut builder, clauses, collection);

    match near {
        Some(geo) => {
            let points = store
                .bounded(
                    op,
                    builder
                        .build_query_as::<(Option<f64>, Option<f64>)>()
                        .fetch_all(store.pool()),
                )
                .await?;
            Ok(points
                .into_iter()
                .filter(|point| matches!(*point, (Some(lat), Some(lng)) if geo.contains(lat, lng)))
                .count() as u64)
        }
        None => {
            let count = store
                .bounded(op, builder.build_query_scalar::<i64>().fetch_one(store.pool()))
                .await?;
            Ok(count.max(0) as u64)
        }
    }
}

fn within<T: Located>(geo: &GeoRadius, item: &T) -> bool {
    item.position().is_some_and(|(lat, lng)| geo.contains(lat, lng))
}
