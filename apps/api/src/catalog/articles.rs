use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::warn;

use crate::catalog::query::{
    compose, lookup, Criteria, FieldFilter, FilterKind, FilterValue, ListingQuery, ListingSpec,
    SortKey,
};
use crate::errors::AppError;

pub const ARTICLES: ListingSpec = ListingSpec {
    table: "articles",
    visible_when: &["is_published"],
    fields: &[
        FieldFilter::new("category", "category", FilterKind::Exact),
        FieldFilter::new("featured", "is_featured", FilterKind::Flag),
    ],
    keyword_columns: &["title", "excerpt", "content"],
    order: &[SortKey::desc("published_at")],
};

const FEATURED_LIMIT: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image_url: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub author_name: String,
    pub author_avatar_url: Option<String>,
    pub read_time_minutes: i32,
    pub is_published: bool,
    pub is_featured: bool,
    pub views_count: i32,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArticleFilters {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ArticleFilters {
    pub fn to_query(&self) -> ListingQuery {
        let criteria = Criteria::new()
            .with("category", self.category.as_deref())
            .keyword(self.search.as_deref());
        compose(&ARTICLES, &criteria)
    }
}

fn featured_query() -> ListingQuery {
    compose(
        &ARTICLES,
        &Criteria::new()
            .flag("featured", Some(true))
            .limit(Some(FEATURED_LIMIT)),
    )
}

pub async fn search(pool: &PgPool, filters: &ArticleFilters) -> Result<Vec<Article>, AppError> {
    filters.to_query().fetch_all(pool).await
}

pub async fn featured(pool: &PgPool) -> Result<Vec<Article>, AppError> {
    featured_query().fetch_all(pool).await
}

/// Looks up a published article and bumps its view counter.
/// The counter update is best-effort: its failure never fails the lookup.
pub async fn get_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Article>, AppError> {
    let article: Option<Article> = lookup(&ARTICLES, "slug", FilterValue::Text(slug.to_string()))
        .fetch_optional(pool)
        .await?;

    if let Some(article) = &article {
        let result = sqlx::query("UPDATE articles SET views_count = views_count + 1 WHERE id = $1")
            .bind(article.id)
            .execute(pool)
            .await;
        if let Err(error) = result {
            warn!(%error, article_id = article.id, "failed to increment article views");
        }
    }

    Ok(article)
}

pub async fn categories(pool: &PgPool) -> Result<Vec<String>, AppError> {
    Ok(sqlx::query_scalar(
        "SELECT DISTINCT category FROM articles WHERE is_published = TRUE ORDER BY category",
    )
    .fetch_all(pool)
    .await?)
}
