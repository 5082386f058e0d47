//! Route table of the portal. Protected routes redirect to the login page when
//! nobody is signed in.

use reqwest::Url;

use crate::api::Catalog;
use crate::session::UserSession;

pub const LOGIN_PATH: &str = "/connexion";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    /// Listing page; the query string is passed through as search criteria.
    Listing {
        catalog: Catalog,
        criteria: Vec<(String, String)>,
    },
    OfferDetail(String),
    Login,
    Register,
    Dashboard,
    ProfileEditor,
    Pricing,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Render(Route),
    Redirect(&'static str),
}

impl Route {
    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Dashboard | Route::ProfileEditor)
    }
}

pub fn resolve(target: &str, session: Option<&UserSession>) -> Resolution {
    let (path, criteria) = split_target(target);

    let route = match path.as_str() {
        "/" => Route::Home,
        "/offres" => listing(Catalog::Offers, criteria),
        "/entreprises" => listing(Catalog::Companies, criteria),
        "/ecoles" => listing(Catalog::Schools, criteria),
        "/conseils" => listing(Catalog::Articles, criteria),
        "/connexion" => Route::Login,
        "/inscription" => Route::Register,
        "/dashboard" => Route::Dashboard,
        "/profil" => Route::ProfileEditor,
        "/tarifs" => Route::Pricing,
        "/finaliser-profil" => return Resolution::Redirect("/dashboard"),
        other => match other.strip_prefix("/offres/") {
            Some(id) if !id.is_empty() && !id.contains('/') => Route::OfferDetail(id.to_string()),
            _ => Route::NotFound,
        },
    };

    if route.is_protected() && session.is_none() {
        return Resolution::Redirect(LOGIN_PATH);
    }
    Resolution::Render(route)
}

/// Resolves `target`, following redirects until a page renders.
pub fn navigate(target: &str, session: Option<&UserSession>) -> (String, Route) {
    let mut current = target.to_string();
    // The table has no redirect longer than two hops.
    for _ in 0..4 {
        match resolve(&current, session) {
            Resolution::Render(route) => return (current, route),
            Resolution::Redirect(to) => current = to.to_string(),
        }
    }
    (current, Route::NotFound)
}

fn listing(catalog: Catalog, criteria: Vec<(String, String)>) -> Route {
    Route::Listing { catalog, criteria }
}

/// Splits a portal path into its normalised path and decoded, non-empty
/// query pairs.
fn split_target(target: &str) -> (String, Vec<(String, String)>) {
    let target = target.trim();
    let target = if target.starts_with('/') {
        target.to_string()
    } else {
        format!("/{target}")
    };

    match Url::parse(&format!("http://portal.local{target}")) {
        Ok(url) => {
            let path = match url.path().trim_end_matches('/') {
                "" => "/".to_string(),
                path => path.to_string(),
            };
            let criteria = url
                .query_pairs()
                .filter(|(_, v)| !v.trim().is_empty())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            (path, criteria)
        }
        Err(_) => (target, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;
    use crate::session::Role;

    fn session() -> UserSession {
        UserSession {
            email: "amine@mail.ma".into(),
            name: "amine".into(),
            role: Role::Candidate,
            profile_complete: false,
            details: Map::new(),
        }
    }

    #[test]
    fn test_protected_routes_redirect_without_session() {
        assert_eq!(resolve("/dashboard", None), Resolution::Redirect("/connexion"));
        assert_eq!(resolve("/profil", None), Resolution::Redirect("/connexion"));
        assert_eq!(
            resolve("/dashboard", Some(&session())),
            Resolution::Render(Route::Dashboard)
        );
    }

    #[test]
    fn test_incomplete_profile_still_reaches_dashboard() {
        let session = session();
        assert!(!session.profile_complete);
        assert_eq!(
            resolve("/dashboard/", Some(&session)),
            Resolution::Render(Route::Dashboard)
        );
    }

    #[test]
    fn test_listing_passes_query_string_through() {
        assert_eq!(
            resolve("/offres?city=Agadir&contractType=Stage&keywords=", None),
            Resolution::Render(Route::Listing {
                catalog: Catalog::Offers,
                criteria: vec![
                    ("city".into(), "Agadir".into()),
                    ("contractType".into(), "Stage".into()),
                ],
            })
        );
        assert_eq!(
            resolve("/conseils?search=entretien%20d%27embauche", None),
            Resolution::Render(Route::Listing {
                catalog: Catalog::Articles,
                criteria: vec![("search".into(), "entretien d'embauche".into())],
            })
        );
    }

    #[test]
    fn test_offer_detail_and_unknown_paths() {
        assert_eq!(
            resolve("/offres/42", None),
            Resolution::Render(Route::OfferDetail("42".into()))
        );
        assert_eq!(resolve("/offres/42/edit", None), Resolution::Render(Route::NotFound));
        assert_eq!(resolve("/nulle-part", None), Resolution::Render(Route::NotFound));
        assert_eq!(resolve("", None), Resolution::Render(Route::Home));
    }

    #[test]
    fn test_legacy_path_follows_redirects() {
        assert_eq!(
            resolve("/finaliser-profil", None),
            Resolution::Redirect("/dashboard")
        );
        assert_eq!(
            navigate("/finaliser-profil", None),
            ("/connexion".to_string(), Route::Login)
        );
        assert_eq!(
            navigate("/finaliser-profil", Some(&session())),
            ("/dashboard".to_string(), Route::Dashboard)
        );
    }
}
