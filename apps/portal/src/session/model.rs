use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "student")]
    Candidate,
    #[serde(alias = "company")]
    Employer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Employer => "employer",
        }
    }
}

/// The signed-in user as held in memory. `details` is the opaque profile blob;
/// it is never written to the local cache.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSession {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub profile_complete: bool,
    pub details: Map<String, Value>,
}

impl UserSession {
    /// Display name: the profile's `firstName` when present, otherwise the
    /// local part of the e-mail.
    pub fn display_name(email: &str, details: Option<&Map<String, Value>>) -> String {
        details
            .and_then(|d| d.get("firstName"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string())
    }

    pub fn projection(&self) -> CachedSession {
        CachedSession {
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            profile_complete: self.profile_complete,
        }
    }
}

/// Reduced projection persisted to the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSession {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub profile_complete: bool,
}

impl From<CachedSession> for UserSession {
    fn from(cached: CachedSession) -> Self {
        UserSession {
            email: cached.email,
            name: cached.name,
            role: cached.role,
            profile_complete: cached.profile_complete,
            details: Map::new(),
        }
    }
}

/// Who the auth provider says is signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    /// Role stored as user metadata at sign-up; absent for accounts created elsewhere.
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_display_name_prefers_first_name() {
        let details = json!({ "firstName": "Atlas Agro" });
        assert_eq!(
            UserSession::display_name("rh@atlas.ma", details.as_object()),
            "Atlas Agro"
        );
        assert_eq!(UserSession::display_name("rh@atlas.ma", None), "rh");
        let blank = json!({ "firstName": "  " });
        assert_eq!(UserSession::display_name("rh@atlas.ma", blank.as_object()), "rh");
    }

    #[test]
    fn test_role_accepts_legacy_names() {
        let role: Role = serde_json::from_value(json!("company")).unwrap();
        assert_eq!(role, Role::Employer);
        let role: Role = serde_json::from_value(json!("student")).unwrap();
        assert_eq!(role, Role::Candidate);
        assert_eq!(serde_json::to_value(Role::Employer).unwrap(), json!("employer"));
    }

    #[test]
    fn test_projection_drops_details() {
        let session = UserSession {
            email: "amine@mail.ma".into(),
            name: "Amine".into(),
            role: Role::Candidate,
            profile_complete: true,
            details: json!({ "city": "Agadir" }).as_object().cloned().unwrap(),
        };
        let cached = serde_json::to_value(session.projection()).unwrap();
        assert_eq!(
            cached,
            json!({
                "email": "amine@mail.ma",
                "name": "Amine",
                "role": "candidate",
                "profileComplete": true
            })
        );
    }
}
