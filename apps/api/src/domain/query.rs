// List query features: filtering, sorting, field projection and pagination
// Parsed from query-string pairs against an entity's field whitelist

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::entity::{Field, FieldKind};
use super::errors::DomainError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 100;
pub const DEFAULT_SORT: &str = "-createdAt";

const RESERVED_PARAMS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Fields whose repeated query parameters are kept as "any of" instead of last-wins
pub const REPEATABLE_FIELDS: [&str; 6] = [
    "duration",
    "ratingsQuantity",
    "ratingsAverage",
    "maxGroupSize",
    "difficulty",
    "price",
];

/// A typed filter operand
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Number(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Bool(bool),
    Id(Uuid),
}

impl FilterValue {
    /// Reads a raw query-string value according to the field's kind
    pub fn parse(field: &Field, raw: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::invalid_value(field.name, raw);
        match field.kind {
            FieldKind::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FilterValue::Number)
                .ok_or_else(invalid),
            FieldKind::Text => Ok(FilterValue::Text(raw.to_string())),
            FieldKind::Timestamp => parse_timestamp(raw)
                .map(FilterValue::Timestamp)
                .ok_or_else(invalid),
            FieldKind::Bool => match raw {
                "true" => Ok(FilterValue::Bool(true)),
                "false" => Ok(FilterValue::Bool(false)),
                _ => Err(invalid()),
            },
            FieldKind::Id => Uuid::parse_str(raw.trim())
                .map(FilterValue::Id)
                .map_err(|_| invalid()),
        }
    }

    /// Orders a serialized document value against this operand
    fn compare_json(&self, value: &Value) -> Option<Ordering> {
        match self {
            FilterValue::Number(expected) => value.as_f64()?.partial_cmp(expected),
            FilterValue::Text(expected) => Some(value.as_str()?.cmp(expected.as_str())),
            FilterValue::Timestamp(expected) => {
                let actual = DateTime::parse_from_rfc3339(value.as_str()?).ok()?;
                Some(actual.with_timezone(&Utc).cmp(expected))
            }
            FilterValue::Bool(expected) => Some(value.as_bool()?.cmp(expected)),
            FilterValue::Id(expected) => {
                let actual = Uuid::parse_str(value.as_str()?).ok()?;
                Some(actual.cmp(expected))
            }
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    fn from_operator(operator: &str) -> Option<Self> {
        match operator {
            "gt" => Some(Comparison::Gt),
            "gte" => Some(Comparison::Gte),
            "lt" => Some(Comparison::Lt),
            "lte" => Some(Comparison::Lte),
            "eq" => Some(Comparison::Eq),
            _ => None,
        }
    }

    pub fn sql_operator(&self) -> &'static str {
        match self {
            Comparison::Eq => " = ",
            Comparison::Gt => " > ",
            Comparison::Gte => " >= ",
            Comparison::Lt => " < ",
            Comparison::Lte => " <= ",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Gte => ordering != Ordering::Less,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Lte => ordering != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare(Comparison, FilterValue),
    AnyOf(Vec<FilterValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: Field,
    pub condition: Condition,
}

impl Filter {
    fn matches(&self, document: &Value) -> bool {
        let value = match document.get(self.field.name) {
            Some(value) if !value.is_null() => value,
            _ => return false,
        };
        match &self.condition {
            Condition::Compare(comparison, expected) => expected
                .compare_json(value)
                .map(|ordering| comparison.holds(ordering))
                .unwrap_or(false),
            Condition::AnyOf(candidates) => candidates
                .iter()
                .any(|candidate| candidate.compare_json(value) == Some(Ordering::Equal)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: Field,
    pub descending: bool,
}

/// Which document fields a response keeps
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    All,
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    fn parse(raw: &str) -> Self {
        let names: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return Projection::All;
        }
        if names.iter().all(|name| name.starts_with('-')) {
            Projection::Exclude(names.iter().map(|n| n[1..].to_string()).collect())
        } else {
            Projection::Include(
                names
                    .iter()
                    .filter(|name| !name.starts_with('-'))
                    .map(|name| name.to_string())
                    .collect(),
            )
        }
    }

    /// Applies the projection to a serialized document; `id` is always kept
    pub fn apply(&self, document: Value) -> Value {
        match (self, document) {
            (Projection::Include(keep), Value::Object(map)) => Value::Object(
                map.into_iter()
                    .filter(|(key, _)| key == "id" || keep.iter().any(|k| k == key))
                    .collect(),
            ),
            (Projection::Exclude(drop), Value::Object(map)) => Value::Object(
                map.into_iter()
                    .filter(|(key, _)| key == "id" || !drop.iter().any(|k| k == key))
                    .collect(),
            ),
            (_, document) => document,
        }
    }
}

/// A parsed list request
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub page: u32,
    pub limit: u32,
}

impl ListQuery {
    /// Unfiltered query with default sort and pagination
    pub fn new(fields: &[Field]) -> Self {
        Self {
            filters: Vec::new(),
            sort: parse_sort(DEFAULT_SORT, fields).unwrap_or_default(),
            projection: Projection::All,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Every matching item in default order, for pages that show the whole catalogue
    pub fn unpaged(fields: &[Field]) -> Self {
        Self {
            limit: u32::MAX,
            ..Self::new(fields)
        }
    }

    /// Parses query-string pairs in request order
    ///
    /// Repeated parameters keep their last value, except equality filters on
    /// [`REPEATABLE_FIELDS`] which match any of the given values.
    pub fn parse(params: &[(String, String)], fields: &[Field]) -> Result<Self, DomainError> {
        let mut query = ListQuery::new(fields);

        let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
        for (key, value) in params {
            match grouped.iter_mut().find(|(k, _)| *k == key.as_str()) {
                Some((_, values)) => values.push(value.as_str()),
                None => grouped.push((key.as_str(), vec![value.as_str()])),
            }
        }

        for (key, values) in grouped {
            let last = values.last().copied().unwrap_or_default();
            match key {
                "page" => query.page = parse_positive("page", last)?,
                "limit" => query.limit = parse_positive("limit", last)?,
                "sort" => query.sort = parse_sort(last, fields)?,
                "fields" => query.projection = Projection::parse(last),
                _ => query.filters.push(parse_filter(key, &values, fields)?),
            }
        }

        Ok(query)
    }

    /// Adds an equality filter that callers cannot override, e.g. a parent id
    pub fn scoped(mut self, field: Field, value: FilterValue) -> Self {
        self.filters.retain(|filter| filter.field.name != field.name);
        self.filters.push(Filter {
            field,
            condition: Condition::Compare(Comparison::Eq, value),
        });
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(document))
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for key in &self.sort {
            let ordering = compare_field(key.field.kind, a.get(key.field.name), b.get(key.field.name));
            let ordering = if key.descending { ordering.reverse() } else { ordering };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        compare_field(FieldKind::Id, a.get("id"), b.get("id"))
    }

    /// Filters, sorts and paginates already-loaded items
    pub fn apply<T: Serialize>(&self, items: Vec<T>) -> Vec<T> {
        let mut documents: Vec<(Value, T)> = items
            .into_iter()
            .map(|item| (serde_json::to_value(&item).unwrap_or(Value::Null), item))
            .filter(|(document, _)| self.matches(document))
            .collect();

        documents.sort_by(|(a, _), (b, _)| self.compare(a, b));

        documents
            .into_iter()
            .skip(usize::try_from(self.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(self.limit).unwrap_or(usize::MAX))
            .map(|(_, item)| item)
            .collect()
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<u32, DomainError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| DomainError::invalid_value(name, raw))
}

fn find_field(name: &str, fields: &[Field]) -> Result<Field, DomainError> {
    fields
        .iter()
        .find(|field| field.name == name)
        .copied()
        .ok_or_else(|| DomainError::UnknownField(name.to_string()))
}

fn parse_sort(raw: &str, fields: &[Field]) -> Result<Vec<SortKey>, DomainError> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            let (name, descending) = match name.strip_prefix('-') {
                Some(rest) => (rest, true),
                None => (name, false),
            };
            find_field(name, fields).map(|field| SortKey { field, descending })
        })
        .collect()
}

/// Splits `price[gte]` into `("price", Some("gte"))`
fn split_operator(key: &str) -> (&str, Option<&str>) {
    match key.find('[') {
        Some(open) if key.ends_with(']') => (&key[..open], Some(&key[open + 1..key.len() - 1])),
        _ => (key, None),
    }
}

fn parse_filter(key: &str, values: &[&str], fields: &[Field]) -> Result<Filter, DomainError> {
    let (name, operator) = split_operator(key);
    let field = find_field(name, fields)?;

    let comparison = match operator {
        Some(op) => Comparison::from_operator(op)
            .ok_or_else(|| DomainError::UnknownField(key.to_string()))?,
        None => Comparison::Eq,
    };

    if comparison == Comparison::Eq && values.len() > 1 && REPEATABLE_FIELDS.contains(&name) {
        let candidates = values
            .iter()
            .map(|raw| FilterValue::parse(&field, raw))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Filter {
            field,
            condition: Condition::AnyOf(candidates),
        });
    }

    let last = values.last().copied().unwrap_or_default();
    Ok(Filter {
        field,
        condition: Condition::Compare(comparison, FilterValue::parse(&field, last)?),
    })
}

/// Missing values order before present ones, as in document stores
fn compare_field(kind: FieldKind, a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match kind {
            FieldKind::Number => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
            FieldKind::Bool => a.as_bool().cmp(&b.as_bool()),
            FieldKind::Timestamp => {
                let parse = |v: &Value| {
                    v.as_str()
                        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                };
                parse(a).cmp(&parse(b))
            }
            FieldKind::Text | FieldKind::Id => a.as_str().cmp(&b.as_str()),
        },
    }
}
