//! Compiles the store-agnostic [`Clause`] tree into a parameterised SQLite
//! predicate. Every value is bound; only `Field` supplies identifiers.

use sqlx::{QueryBuilder, Sqlite};

use crate::filters::{Clause, Op, Value};
use crate::types::Collection;

/// Push `clauses` as one conjunction. An empty list compiles to `1 = 1`.
pub fn push_predicate<'args>(
    builder: &mut QueryBuilder<'args, Sqlite>,
    clauses: &[Clause],
    collection: Collection,
) {
    push_joined(builder, clauses, collection, " AND ", "1 = 1");
}

fn push_joined<'args>(
    builder: &mut QueryBuilder<'args, Sqlite>,
    clauses: &[Clause],
    collection: Collection,
    separator: &str,
    empty: &str,
) {
    if clauses.is_empty() {
        builder.push(empty);
        return;
    }
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            builder.push(separator);
        }
        builder.push("(");
        push_clause(builder, clause, collection);
        builder.push(")");
    }
}

fn push_clause<'args>(
    builder: &mut QueryBuilder<'args, Sqlite>,
    clause: &Clause,
    collection: Collection,
) {
    match clause {
        Clause::Compare { field, op, value } => {
            builder.push(field.column(collection));
            builder.push(" ");
            builder.push(op.symbol());
            builder.push(" ");
            push_value(builder, value);
            if *op == Op::EqNoCase {
                builder.push(" COLLATE NOCASE");
            }
        }
        Clause::In {
            field,
            values,
            negated,
        } => {
            if values.is_empty() {
                // IN () matches nothing; NOT IN () matches everything.
                builder.push(if *negated { "1 = 1" } else { "1 = 0" });
                return;
            }
            builder.push(field.column(collection));
            builder.push(if *negated { " NOT IN (" } else { " IN (" });
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                push_value(builder, value);
            }
            builder.push(")");
        }
        Clause::IsNull(field) => {
            builder.push(field.column(collection));
            builder.push(" IS NULL");
        }
        Clause::NotNull(field) => {
            builder.push(field.column(collection));
            builder.push(" IS NOT NULL");
        }
        Clause::Ratio {
            numerator,
            denominator,
            op,
            value,
        } => {
            let den = denominator.column(collection);
            builder.push(den);
            builder.push(" > 0 AND ");
            builder.push(numerator.column(collection));
            builder.push(" / ");
            builder.push(den);
            builder.push(" ");
            builder.push(op.symbol());
            builder.push(" ");
            builder.push_bind(*value);
        }
        Clause::Any(parts) => push_joined(builder, parts, collection, " OR ", "1 = 0"),
        Clause::All(parts) => push_joined(builder, parts, collection, " AND ", "1 = 1"),
    }
}

fn push_value<'args>(builder: &mut QueryBuilder<'args, Sqlite>, value: &Value) {
    match value {
        Value::Int(v) => builder.push_bind(*v),
        Value::Real(v) => builder.push_bind(*v),
        Value::Text(v) => builder.push_bind(v.clone()),
        Value::Bool(v) => builder.push_bind(*v),
        // Dates are stored as ISO-8601 text and compare lexicographically.
        Value::Date(v) => builder.push_bind(v.to_string()),
    };
}
