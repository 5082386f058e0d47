//! Job offers: search, lookup, statistics and the employer publish path.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::catalog::query::{
    compose, lookup, Clause, Criteria, FieldFilter, FilterKind, FilterValue, ListingQuery,
    ListingSpec, SortKey,
};
use crate::errors::AppError;

pub const OFFERS: ListingSpec = ListingSpec {
    table: "job_offers",
    visible_when: &[],
    fields: &[
        FieldFilter::new("city", "ville", FilterKind::Contains),
        FieldFilter::new("contract_type", "type_contrat", FilterKind::Exact),
        FieldFilter::new("job_title", "emploi_metier", FilterKind::Contains),
        FieldFilter::new("skills", "required_skills", FilterKind::Overlaps),
    ],
    keyword_columns: &["emploi_metier", "full_description", "raison_sociale"],
    order: &[SortKey::desc("created_at")],
};

pub const DEFAULT_RECENT_LIMIT: i64 = 10;
pub const MAX_RECENT_LIMIT: i64 = 50;
const TOP_TITLES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobOffer {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub ville: String,
    pub ref_offre: String,
    pub type_contrat: String,
    pub raison_sociale: String,
    pub date_offre: NaiveDate,
    pub nbre_postes: i32,
    pub emploi_metier: String,
    pub full_description: String,
    pub seo_keywords: Vec<String>,
    pub meta_description: Option<String>,
    pub suggested_salary_range: Option<String>,
    pub required_skills: Vec<String>,
    pub publisher_email: Option<String>,
}

/// Query-string filters accepted by the offers listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferFilters {
    pub city: Option<String>,
    pub contract_type: Option<String>,
    pub job_title: Option<String>,
    pub keywords: Option<String>,
    /// Comma-separated list; matches offers requiring any of them.
    pub skills: Option<String>,
    pub limit: Option<i64>,
}

impl OfferFilters {
    pub fn to_query(&self) -> ListingQuery {
        let criteria = Criteria::new()
            .with("city", self.city.as_deref())
            .with("contract_type", self.contract_type.as_deref())
            .with("job_title", self.job_title.as_deref())
            .with("skills", self.skills.as_deref())
            .keyword(self.keywords.as_deref())
            .limit(self.limit);
        compose(&OFFERS, &criteria)
    }
}

pub async fn search(pool: &PgPool, filters: &OfferFilters) -> Result<Vec<JobOffer>, AppError> {
    filters.to_query().fetch_all(pool).await
}

pub async fn recent(pool: &PgPool, limit: Option<i64>) -> Result<Vec<JobOffer>, AppError> {
    let limit = limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    compose(&OFFERS, &Criteria::new().limit(Some(limit)))
        .fetch_all(pool)
        .await
}

pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<JobOffer>, AppError> {
    lookup(&OFFERS, "id", FilterValue::Uuid(id))
        .fetch_optional(pool)
        .await
}

pub async fn published_by(pool: &PgPool, email: &str) -> Result<Vec<JobOffer>, AppError> {
    compose(&OFFERS, &Criteria::new())
        .with_filter(Clause::Eq {
            column: "publisher_email",
            value: FilterValue::Text(email.to_string()),
        })
        .fetch_all(pool)
        .await
}

// ────────────────────────────────────────────────────────────────────────────
// Statistics
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CountBucket {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferStats {
    pub total_offers: i64,
    pub contract_stats: Vec<CountBucket>,
    pub city_stats: Vec<CountBucket>,
    pub job_title_stats: Vec<CountBucket>,
}

#[derive(Debug, FromRow)]
struct OfferFacets {
    type_contrat: String,
    ville: String,
    emploi_metier: String,
}

pub async fn stats(pool: &PgPool) -> Result<OfferStats, AppError> {
    let rows = sqlx::query_as::<_, OfferFacets>(
        "SELECT type_contrat, ville, emploi_metier FROM job_offers",
    )
    .fetch_all(pool)
    .await?;

    Ok(OfferStats {
        total_offers: rows.len() as i64,
        contract_stats: count_by(rows.iter().map(|r| r.type_contrat.as_str()), None),
        city_stats: count_by(rows.iter().map(|r| r.ville.as_str()), None),
        job_title_stats: count_by(rows.iter().map(|r| r.emploi_metier.as_str()), Some(TOP_TITLES)),
    })
}

/// Counts occurrences, most frequent first; ties keep alphabetical order.
pub fn count_by<'a>(values: impl Iterator<Item = &'a str>, top: Option<usize>) -> Vec<CountBucket> {
    let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let mut buckets: Vec<CountBucket> = counts
        .into_iter()
        .map(|(label, count)| CountBucket {
            label: label.to_string(),
            count,
        })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    if let Some(top) = top {
        buckets.truncate(top);
    }
    buckets
}

// ────────────────────────────────────────────────────────────────────────────
// Publish
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublishOfferRequest {
    #[serde(default)]
    pub emploi_metier: String,
    #[serde(default)]
    pub raison_sociale: String,
    #[serde(default)]
    pub ville: String,
    #[serde(default)]
    pub type_contrat: String,
    pub nbre_postes: Option<i32>,
    #[serde(default)]
    pub full_description: String,
    /// Comma-separated, as typed in the publish form.
    pub required_skills: Option<String>,
    pub suggested_salary_range: Option<String>,
}

/// Insert-ready offer after validation and normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOffer {
    pub emploi_metier: String,
    pub raison_sociale: String,
    pub ville: String,
    pub type_contrat: String,
    pub nbre_postes: i32,
    pub full_description: String,
    pub required_skills: Vec<String>,
    pub suggested_salary_range: Option<String>,
    pub date_offre: NaiveDate,
    pub ref_offre: String,
}

impl PublishOfferRequest {
    pub fn prepare(self, now: DateTime<Utc>) -> Result<NewOffer, AppError> {
        let required = [
            ("emploi_metier", &self.emploi_metier),
            ("ville", &self.ville),
            ("type_contrat", &self.type_contrat),
            ("full_description", &self.full_description),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let required_skills = self
            .required_skills
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(NewOffer {
            emploi_metier: self.emploi_metier.trim().to_string(),
            raison_sociale: self.raison_sociale.trim().to_string(),
            ville: self.ville.trim().to_string(),
            type_contrat: self.type_contrat.trim().to_string(),
            nbre_postes: self.nbre_postes.filter(|n| *n > 0).unwrap_or(1),
            full_description: self.full_description.trim().to_string(),
            required_skills,
            suggested_salary_range: self
                .suggested_salary_range
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            date_offre: now.date_naive(),
            ref_offre: format!("OFF-{}", now.timestamp_millis()),
        })
    }
}

pub async fn publish(
    pool: &PgPool,
    publisher_email: &str,
    offer: NewOffer,
) -> Result<JobOffer, AppError> {
    let row = sqlx::query_as::<_, JobOffer>(
        r#"
        INSERT INTO job_offers
            (emploi_metier, raison_sociale, ville, type_contrat, nbre_postes,
             full_description, required_skills, suggested_salary_range,
             date_offre, ref_offre, publisher_email)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(&offer.emploi_metier)
    .bind(&offer.raison_sociale)
    .bind(&offer.ville)
    .bind(&offer.type_contrat)
    .bind(offer.nbre_postes)
    .bind(&offer.full_description)
    .bind(&offer.required_skills)
    .bind(&offer.suggested_salary_range)
    .bind(offer.date_offre)
    .bind(&offer.ref_offre)
    .bind(publisher_email)
    .fetch_one(pool)
    .await?;

    info!("Published offer {} ({}) for {publisher_email}", row.id, row.ref_offre);
    Ok(row)
}
