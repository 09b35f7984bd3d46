// Translates a parsed ListQuery into SQL
// Column names come only from entity field whitelists, values are always bound

use sqlx::{Postgres, QueryBuilder};

use crate::domain::entity::FieldKind;
use crate::domain::query::{Condition, FilterValue, ListQuery};

/// SQL column for a JSON field name: `maxGroupSize` -> `max_group_size`,
/// references `tour`/`user` -> `tour_id`/`user_id`
pub fn column_name(field: &str) -> String {
    match field {
        "tour" => "tour_id".to_string(),
        "user" => "user_id".to_string(),
        _ => {
            let mut column = String::with_capacity(field.len() + 4);
            for c in field.chars() {
                if c.is_ascii_uppercase() {
                    column.push('_');
                    column.push(c.to_ascii_lowercase());
                } else {
                    column.push(c);
                }
            }
            column
        }
    }
}

fn push_column(builder: &mut QueryBuilder<'_, Postgres>, name: &str, kind: FieldKind) {
    let column = column_name(name);
    if kind == FieldKind::Number {
        builder.push(format!("({})::float8", column));
    } else {
        builder.push(column);
    }
}

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Number(n) => builder.push_bind(*n),
        FilterValue::Text(s) => builder.push_bind(s.clone()),
        FilterValue::Timestamp(ts) => builder.push_bind(*ts),
        FilterValue::Bool(b) => builder.push_bind(*b),
        FilterValue::Id(id) => builder.push_bind(*id),
    };
}

/// Appends ` AND <condition>` for every filter; the caller opens the WHERE clause
pub fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
    for filter in &query.filters {
        builder.push(" AND ");
        push_column(builder, filter.field.name, filter.field.kind);
        match &filter.condition {
            Condition::Compare(comparison, value) => {
                builder.push(comparison.sql_operator());
                push_value(builder, value);
            }
            Condition::AnyOf(values) => {
                builder.push(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        builder.push(", ");
                    }
                    push_value(builder, value);
                }
                builder.push(")");
            }
        }
    }
}

/// Appends ORDER BY (with an id tiebreak), LIMIT and OFFSET
pub fn push_order_and_page(builder: &mut QueryBuilder<'_, Postgres>, query: &ListQuery) {
    builder.push(" ORDER BY ");
    for key in &query.sort {
        push_column(builder, key.field.name, key.field.kind);
        builder.push(if key.descending {
            " DESC NULLS LAST, "
        } else {
            " ASC NULLS FIRST, "
        });
    }
    builder.push("id ASC LIMIT ");
    builder.push_bind(i64::from(query.limit));
    builder.push(" OFFSET ");
    builder.push_bind(offset_param(query));
}

/// OFFSET bind value; pages beyond `i64::MAX` rows saturate to an empty result
fn offset_param(query: &ListQuery) -> i64 {
    i64::try_from(query.offset()).unwrap_or(i64::MAX)
}
