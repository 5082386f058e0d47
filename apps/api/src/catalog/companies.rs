use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::catalog::query::{
    compose, lookup, Criteria, FieldFilter, FilterKind, FilterValue, ListingQuery, ListingSpec,
    SortKey,
};
use crate::errors::AppError;

/// Active companies, verified first, then by number of open offers.
pub const COMPANIES: ListingSpec = ListingSpec {
    table: "companies",
    visible_when: &["is_active"],
    fields: &[
        FieldFilter::new("city", "city", FilterKind::Contains),
        FieldFilter::new("sector", "sector", FilterKind::Contains),
    ],
    keyword_columns: &["name", "description", "sector"],
    order: &[
        SortKey::desc("is_verified"),
        SortKey::desc("active_offers_count"),
    ],
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub sector: String,
    pub city: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub website_url: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub company_size: Option<String>,
    pub founded_year: Option<i32>,
    pub linkedin_url: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub active_offers_count: i32,
    pub total_hires: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompanyFilters {
    pub city: Option<String>,
    pub sector: Option<String>,
    pub search: Option<String>,
}

impl CompanyFilters {
    pub fn to_query(&self) -> ListingQuery {
        let criteria = Criteria::new()
            .with("city", self.city.as_deref())
            .with("sector", self.sector.as_deref())
            .keyword(self.search.as_deref());
        compose(&COMPANIES, &criteria)
    }
}

pub async fn search(pool: &PgPool, filters: &CompanyFilters) -> Result<Vec<Company>, AppError> {
    filters.to_query().fetch_all(pool).await
}

pub async fn get_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Company>, AppError> {
    lookup(&COMPANIES, "slug", FilterValue::Text(slug.to_string()))
        .fetch_optional(pool)
        .await
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyStats {
    pub total_companies: i64,
    pub sectors: BTreeMap<String, i64>,
}

pub async fn stats(pool: &PgPool) -> Result<CompanyStats, AppError> {
    let sectors: Vec<String> =
        sqlx::query_scalar("SELECT sector FROM companies WHERE is_active = TRUE")
            .fetch_all(pool)
            .await?;
    Ok(sector_histogram(sectors))
}

fn sector_histogram(sectors: Vec<String>) -> CompanyStats {
    let total_companies = sectors.len() as i64;
    let mut histogram = BTreeMap::new();
    for sector in sectors {
        *histogram.entry(sector).or_insert(0) += 1;
    }
    CompanyStats {
        total_companies,
        sectors: histogram,
    }
}
