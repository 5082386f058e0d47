//! Listing query composition shared by every catalog (offers, companies, schools, articles).
//!
//! A catalog describes itself once as a [`ListingSpec`]: which criteria map to which
//! column and how they filter, which columns the free-text keyword searches, and how
//! results are ordered. [`compose`] turns user criteria into a [`ListingQuery`], which
//! renders to a parameterised `sqlx::QueryBuilder`.

use std::collections::BTreeMap;

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

/// How a single criterion restricts its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// `column = value`
    Exact,
    /// `column ILIKE '%value%'`
    Contains,
    /// `column = true`, only when the criterion is set to a truthy value.
    Flag,
    /// `column && ARRAY[...]` over a comma-separated criterion.
    Overlaps,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldFilter {
    pub criterion: &'static str,
    pub column: &'static str,
    pub kind: FilterKind,
}

impl FieldFilter {
    pub const fn new(criterion: &'static str, column: &'static str, kind: FilterKind) -> Self {
        Self {
            criterion,
            column,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl SortKey {
    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            direction: SortDirection::Desc,
        }
    }

    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            direction: SortDirection::Asc,
        }
    }
}

/// Static description of a searchable catalog table.
#[derive(Debug)]
pub struct ListingSpec {
    pub table: &'static str,
    /// Boolean columns that must be true for a row to be listed at all.
    pub visible_when: &'static [&'static str],
    pub fields: &'static [FieldFilter],
    pub keyword_columns: &'static [&'static str],
    pub order: &'static [SortKey],
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Bool(bool),
    Uuid(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Eq {
        column: &'static str,
        value: FilterValue,
    },
    ILike {
        column: &'static str,
        pattern: String,
    },
    /// OR-combination of its members.
    AnyOf(Vec<Clause>),
    Overlaps {
        column: &'static str,
        values: Vec<String>,
    },
}

/// User-supplied criteria, keyed by the criterion names a [`ListingSpec`] declares.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    values: BTreeMap<&'static str, String>,
    keyword: Option<String>,
    limit: Option<i64>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a criterion; blank values are ignored.
    pub fn with(mut self, criterion: &'static str, value: Option<&str>) -> Self {
        if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.values.insert(criterion, v.to_string());
        }
        self
    }

    pub fn flag(self, criterion: &'static str, set: Option<bool>) -> Self {
        match set {
            Some(true) => self.with(criterion, Some("true")),
            _ => self,
        }
    }

    pub fn keyword(mut self, keyword: Option<&str>) -> Self {
        self.keyword = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from);
        self
    }

    pub fn limit(mut self, limit: Option<i64>) -> Self {
        self.limit = limit.filter(|l| *l > 0);
        self
    }
}

/// A composed listing query: visibility clauses, user filters, order and limit.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub table: &'static str,
    pub visibility: Vec<Clause>,
    pub filters: Vec<Clause>,
    pub order: Vec<SortKey>,
    pub limit: Option<i64>,
}

/// Composes a listing query from a catalog spec and user criteria.
///
/// Criteria are applied in the order the spec declares its fields, followed by the
/// keyword clause. With no active criterion the result is the unfiltered "get all" query.
pub fn compose(spec: &ListingSpec, criteria: &Criteria) -> ListingQuery {
    let mut filters = Vec::new();

    for field in spec.fields {
        let Some(value) = criteria.values.get(field.criterion) else {
            continue;
        };
        match field.kind {
            FilterKind::Exact => filters.push(Clause::Eq {
                column: field.column,
                value: FilterValue::Text(value.clone()),
            }),
            FilterKind::Contains => filters.push(Clause::ILike {
                column: field.column,
                pattern: contains_pattern(value),
            }),
            FilterKind::Flag => {
                if is_truthy(value) {
                    filters.push(Clause::Eq {
                        column: field.column,
                        value: FilterValue::Bool(true),
                    });
                }
            }
            FilterKind::Overlaps => {
                let values: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                if !values.is_empty() {
                    filters.push(Clause::Overlaps {
                        column: field.column,
                        values,
                    });
                }
            }
        }
    }

    if let Some(keyword) = &criteria.keyword {
        if !spec.keyword_columns.is_empty() {
            let pattern = contains_pattern(keyword);
            filters.push(Clause::AnyOf(
                spec.keyword_columns
                    .iter()
                    .map(|column| Clause::ILike {
                        column: *column,
                        pattern: pattern.clone(),
                    })
                    .collect(),
            ));
        }
    }

    ListingQuery {
        table: spec.table,
        visibility: visibility_clauses(spec),
        filters,
        order: spec.order.to_vec(),
        limit: criteria.limit,
    }
}

/// Single-row lookup among the visible rows of a catalog.
pub fn lookup(spec: &ListingSpec, column: &'static str, value: FilterValue) -> ListingQuery {
    ListingQuery {
        table: spec.table,
        visibility: visibility_clauses(spec),
        filters: vec![Clause::Eq { column, value }],
        order: Vec::new(),
        limit: Some(1),
    }
}

fn visibility_clauses(spec: &ListingSpec) -> Vec<Clause> {
    spec.visible_when
        .iter()
        .map(|column| Clause::Eq {
            column: *column,
            value: FilterValue::Bool(true),
        })
        .collect()
}

impl ListingQuery {
    /// True when at least one user criterion contributed a clause.
    pub fn is_filtered(&self) -> bool {
        !self.filters.is_empty()
    }

    pub fn with_filter(mut self, clause: Clause) -> Self {
        self.filters.push(clause);
        self
    }

    /// Renders the query with every value bound as a parameter.
    pub fn build(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT * FROM {}", self.table));

        for (i, clause) in self.visibility.iter().chain(&self.filters).enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            push_clause(&mut qb, clause);
        }

        for (i, key) in self.order.iter().enumerate() {
            qb.push(if i == 0 { " ORDER BY " } else { ", " });
            qb.push(key.column);
            qb.push(match key.direction {
                SortDirection::Asc => " ASC",
                SortDirection::Desc => " DESC",
            });
        }

        if let Some(limit) = self.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }

        qb
    }

    pub async fn fetch_all<T>(&self, pool: &PgPool) -> Result<Vec<T>, AppError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut qb = self.build();
        let rows = qb.build_query_as::<T>().fetch_all(pool).await?;
        debug!(
            table = self.table,
            filtered = self.is_filtered(),
            rows = rows.len(),
            "listing query"
        );
        Ok(rows)
    }

    pub async fn fetch_optional<T>(&self, pool: &PgPool) -> Result<Option<T>, AppError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut qb = self.build();
        Ok(qb.build_query_as::<T>().fetch_optional(pool).await?)
    }
}

fn push_clause(qb: &mut QueryBuilder<'static, Postgres>, clause: &Clause) {
    match clause {
        Clause::Eq { column, value } => {
            qb.push(*column);
            qb.push(" = ");
            match value {
                FilterValue::Text(v) => qb.push_bind(v.clone()),
                FilterValue::Bool(v) => qb.push_bind(*v),
                FilterValue::Uuid(v) => qb.push_bind(*v),
            };
        }
        Clause::ILike { column, pattern } => {
            qb.push(*column);
            qb.push(" ILIKE ");
            qb.push_bind(pattern.clone());
        }
        Clause::AnyOf(members) => {
            qb.push("(");
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_clause(qb, member);
            }
            qb.push(")");
        }
        Clause::Overlaps { column, values } => {
            qb.push(*column);
            qb.push(" && ");
            qb.push_bind(values.clone());
        }
    }
}

/// `%value%` with LIKE wildcards in the user input escaped.
pub fn contains_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for c in value.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
