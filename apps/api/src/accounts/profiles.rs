use serde_json::{Map, Value};
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;

/// Keys that must never reach the profile store.
const SECRET_KEYS: &[&str] = &["password", "confirmPassword", "confirm_password"];

/// Returns the stored profile details, or an empty object when none exist.
pub async fn fetch(pool: &PgPool, email: &str) -> Result<Value, AppError> {
    let details: Option<Value> =
        sqlx::query_scalar("SELECT details FROM profiles WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;
    Ok(details.unwrap_or_else(|| Value::Object(Map::new())))
}

/// Merges `details` into the stored profile (shallow, incoming keys win) and
/// returns the merged document.
pub async fn upsert(pool: &PgPool, email: &str, details: Value) -> Result<Value, AppError> {
    let details = Value::Object(sanitize_details(details)?);

    let merged: Value = sqlx::query_scalar(
        r#"
        INSERT INTO profiles (email, details)
        VALUES ($1, $2)
        ON CONFLICT (email) DO UPDATE
            SET details = profiles.details || EXCLUDED.details,
                updated_at = NOW()
        RETURNING details
        "#,
    )
    .bind(email)
    .bind(&details)
    .fetch_one(pool)
    .await?;

    info!("Saved profile for {email}");
    Ok(merged)
}

/// Requires a JSON object and drops credential fields and nulls.
pub fn sanitize_details(details: Value) -> Result<Map<String, Value>, AppError> {
    let Value::Object(mut map) = details else {
        return Err(AppError::Validation(
            "profile details must be a JSON object".to_string(),
        ));
    };
    for key in SECRET_KEYS {
        map.remove(*key);
    }
    map.retain(|_, v| !v.is_null());
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_strips_passwords_and_nulls() {
        let map = sanitize_details(json!({
            "firstName": "Salma",
            "password": "hunter22",
            "confirmPassword": "hunter22",
            "cvUrl": null,
            "city": "Tiznit"
        }))
        .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["firstName"], "Salma");
        assert_eq!(map["city"], "Tiznit");
    }

    #[test]
    fn test_sanitize_rejects_non_objects() {
        assert!(matches!(
            sanitize_details(json!(["firstName"])),
            Err(AppError::Validation(_))
        ));
    }
}
