//! Client-side validation, run before any network call.

use serde_json::{Map, Value};

use crate::error::PortalError;
use crate::session::Role;

pub const MIN_PASSWORD_LEN: usize = 6;

const SECRET_KEYS: [&str; 3] = ["password", "confirmPassword", "confirm_password"];

#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
    /// Profile fields gathered at sign-up, typed or extracted from a document.
    pub details: Option<Map<String, Value>>,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<(), PortalError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(PortalError::Validation(
                "Adresse e-mail invalide.".to_string(),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(PortalError::Validation(format!(
                "Le mot de passe doit contenir au moins {MIN_PASSWORD_LEN} caractères."
            )));
        }
        if self.password != self.confirm_password {
            return Err(PortalError::Validation(
                "Les mots de passe ne correspondent pas.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }

    /// Details to start the session with, minus any credentials. `None` when
    /// nothing but credentials was supplied.
    pub fn profile_details(&self) -> Option<Map<String, Value>> {
        self.details
            .clone()
            .map(strip_secrets)
            .filter(|details| !details.is_empty())
    }
}

/// Removes credentials and null values from a detail blob.
pub fn strip_secrets(mut details: Map<String, Value>) -> Map<String, Value> {
    for key in SECRET_KEYS {
        details.remove(key);
    }
    details.retain(|_, value| !value.is_null());
    details
}

/// Required fields of the profile editor: the name (the company name for
/// employers) and the city.
pub fn validate_profile(role: Role, details: &Map<String, Value>) -> Result<(), PortalError> {
    let filled = |key: &str| {
        details
            .get(key)
            .and_then(Value::as_str)
            .is_some_and(|v| !v.trim().is_empty())
    };

    if !filled("firstName") {
        let message = match role {
            Role::Candidate => "Le prénom est obligatoire.",
            Role::Employer => "Le nom de l'entreprise est obligatoire.",
        };
        return Err(PortalError::Validation(message.to_string()));
    }
    if !filled("city") {
        return Err(PortalError::Validation("La ville est obligatoire.".to_string()));
    }
    Ok(())
}
