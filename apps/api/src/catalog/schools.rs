use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::catalog::query::{
    compose, lookup, Criteria, FieldFilter, FilterKind, FilterValue, ListingQuery, ListingSpec,
    SortKey,
};
use crate::errors::AppError;

/// Active schools, partners first, then alphabetical.
pub const SCHOOLS: ListingSpec = ListingSpec {
    table: "schools",
    visible_when: &["is_active"],
    fields: &[
        FieldFilter::new("city", "city", FilterKind::Contains),
        FieldFilter::new("type", "type", FilterKind::Exact),
        FieldFilter::new("partners_only", "is_partner", FilterKind::Flag),
    ],
    keyword_columns: &["name", "description"],
    order: &[SortKey::desc("is_partner"), SortKey::asc("name")],
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct School {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub cover_image_url: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub school_type: String,
    pub city: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub website_url: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub programs: Vec<String>,
    pub student_count: Option<i32>,
    pub is_partner: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolFilters {
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub school_type: Option<String>,
    pub search: Option<String>,
    pub partners_only: Option<bool>,
}

impl SchoolFilters {
    pub fn to_query(&self) -> ListingQuery {
        let criteria = Criteria::new()
            .with("city", self.city.as_deref())
            .with("type", self.school_type.as_deref())
            .flag("partners_only", self.partners_only)
            .keyword(self.search.as_deref());
        compose(&SCHOOLS, &criteria)
    }
}

pub async fn search(pool: &PgPool, filters: &SchoolFilters) -> Result<Vec<School>, AppError> {
    filters.to_query().fetch_all(pool).await
}

pub async fn get_by_slug(pool: &PgPool, slug: &str) -> Result<Option<School>, AppError> {
    lookup(&SCHOOLS, "slug", FilterValue::Text(slug.to_string()))
        .fetch_optional(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::query::Clause;

    #[test]
    fn test_partners_only_filters_on_is_partner() {
        let filters = SchoolFilters {
            partners_only: Some(true),
            ..SchoolFilters::default()
        };
        assert_eq!(
            filters.to_query().filters,
            vec![Clause::Eq {
                column: "is_partner",
                value: FilterValue::Bool(true)
            }]
        );
    }

    #[test]
    fn test_type_is_exact_and_city_is_substring() {
        let filters = SchoolFilters {
            city: Some("agadir".into()),
            school_type: Some("Université".into()),
            ..SchoolFilters::default()
        };
        assert_eq!(
            filters.to_query().build().sql(),
            "SELECT * FROM schools WHERE is_active = $1 AND city ILIKE $2 AND type = $3 \
             ORDER BY is_partner DESC, name ASC"
        );
    }

    #[test]
    fn test_query_string_deserializes_camel_case() {
        let filters: SchoolFilters =
            serde_json::from_value(serde_json::json!({"partnersOnly": true, "type": "BTS"}))
                .unwrap();
        assert_eq!(filters.partners_only, Some(true));
        assert_eq!(filters.school_type.as_deref(), Some("BTS"));
    }
}
