//! Command handlers: each CLI command drives the session manager and the API
//! client, then prints the result.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::api::{
    ApiClient, Application, Article, Catalog, Company, DocumentKind, JobOffer, NewOffer, School,
    UploadCategory,
};
use crate::auth::SupabaseAuth;
use crate::cli::{Cli, Commands, ProfileArgs, PublishArgs, RegisterArgs, UploadKind};
use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::forms::{validate_profile, RegistrationForm};
use crate::navigation::{navigate, Route};
use crate::session::{FileSessionCache, Role, SessionManager, UserSession};

pub async fn run(cli: Cli, config: PortalConfig) -> Result<()> {
    let api_url = cli.api_url.clone().unwrap_or_else(|| config.api_url.clone());
    let api = Arc::new(ApiClient::new(&api_url));
    let auth = Arc::new(SupabaseAuth::new(
        &config.supabase_url,
        config.supabase_anon_key.clone(),
        config.auth_token_path(),
    ));
    let cache = Arc::new(FileSessionCache::new(config.session_cache_path()));

    let session = SessionManager::new(cache, auth, api.clone());
    session.hydrate().await;

    dispatch(cli.command, &api, &session).await
}

async fn dispatch(command: Commands, api: &ApiClient, session: &SessionManager) -> Result<()> {
    match command {
        Commands::Register(args) => register(args, api, session).await,
        Commands::Login { email, password } => {
            let user = session.sign_in(&email, &password).await?;
            print_session(&user);
            Ok(())
        }
        Commands::Logout => {
            session.logout().await;
            println!("Déconnecté.");
            Ok(())
        }
        Commands::Whoami => {
            match session.current().await {
                Some(user) => print_session(&user),
                None => println!("Non connecté."),
            }
            Ok(())
        }
        Commands::Refresh => {
            if !session.is_authenticated().await {
                return Err(PortalError::NotAuthenticated.into());
            }
            session.refresh_user().await;
            if let Some(user) = session.current().await {
                print_session(&user);
            }
            Ok(())
        }
        Commands::CompleteProfile(args) => complete_profile(args, session).await,
        Commands::ResetPassword { email } => {
            session.request_password_reset(&email).await?;
            println!("E-mail de réinitialisation envoyé à {email}.");
            Ok(())
        }
        Commands::Offers(args) => {
            print_offers(&api.search::<JobOffer>(Catalog::Offers, &args.criteria()).await?);
            Ok(())
        }
        Commands::Offer { id, summary } => show_offer(api, id, summary).await,
        Commands::Companies(args) => {
            print_companies(&api.search::<Company>(Catalog::Companies, &args.criteria()).await?);
            Ok(())
        }
        Commands::Schools(args) => {
            print_schools(&api.search::<School>(Catalog::Schools, &args.criteria()).await?);
            Ok(())
        }
        Commands::Articles(args) => {
            print_articles(&api.search::<Article>(Catalog::Articles, &args.criteria()).await?);
            Ok(())
        }
        Commands::Apply {
            offer_id,
            company_id,
        } => {
            let user = require_session(session).await?;
            let application = api
                .apply(&user.email, offer_id, company_id.as_deref(), "")
                .await?;
            println!(
                "Candidature envoyée pour « {} » ({}).",
                application.offer_title, application.status
            );
            Ok(())
        }
        Commands::Applications => {
            let user = require_session(session).await?;
            print_applications(&api.applications(&user.email).await?);
            Ok(())
        }
        Commands::Publish(args) => publish(args, api, session).await,
        Commands::MyJobs => {
            let user = require_employer(session).await?;
            print_offers(&api.employer_jobs(&user.email).await?);
            Ok(())
        }
        Commands::Upload { path, category } => {
            let user = session.current().await;
            let category = match category {
                UploadKind::Cv => UploadCategory::Cv,
                UploadKind::CompanyDoc => UploadCategory::CompanyDoc,
            };
            let target = upload_file(api, user.as_ref().map(|u| u.email.as_str()), &path, category)
                .await?;
            println!("Fichier disponible : {}", target);
            Ok(())
        }
        Commands::Advice { query } => {
            println!("{}", api.advice(&query.join(" ")).await?);
            Ok(())
        }
        Commands::Open { path } => open(&path, api, session).await,
    }
}

async fn require_session(session: &SessionManager) -> Result<UserSession, PortalError> {
    session.current().await.ok_or(PortalError::NotAuthenticated)
}

async fn require_employer(session: &SessionManager) -> Result<UserSession, PortalError> {
    let user = require_session(session).await?;
    if user.role != Role::Employer {
        return Err(PortalError::Validation(
            "Cette action est réservée aux recruteurs.".to_string(),
        ));
    }
    Ok(user)
}

async fn register(args: RegisterArgs, api: &ApiClient, session: &SessionManager) -> Result<()> {
    let email = args.email.trim().to_lowercase();
    let mut details = Map::new();

    if let Some(path) = &args.document {
        let (kind, category) = match args.role {
            Role::Candidate => (DocumentKind::Resume, UploadCategory::Cv),
            Role::Employer => (DocumentKind::Company, UploadCategory::CompanyDoc),
        };
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        let mime_type = mime_for_path(path)?;

        // Extraction only pre-fills the form; registration goes on without it.
        match api.extract_document(kind, mime_type, &bytes).await {
            Ok(fields) => details.extend(fields.into_iter().filter(|(_, v)| !is_blank(v))),
            Err(error) => warn!(%error, "document analysis failed; continuing without it"),
        }
        match upload_file(api, Some(email.as_str()), path, category).await {
            Ok(url) => {
                details.insert("documentUrl".to_string(), Value::String(url));
            }
            Err(error) => warn!(%error, "document upload failed; continuing without it"),
        }
    }
    if let Some(first_name) = args.first_name {
        details.insert("firstName".to_string(), Value::String(first_name));
    }
    if let Some(city) = args.city {
        details.insert("city".to_string(), Value::String(city));
    }
    if !details.is_empty() {
        details.insert("email".to_string(), Value::String(email.clone()));
    }

    let user = session
        .register(RegistrationForm {
            email,
            password: args.password,
            confirm_password: args.confirm_password,
            role: args.role,
            details: (!details.is_empty()).then_some(details),
        })
        .await?;
    print_session(&user);
    if !user.profile_complete {
        println!("Profil incomplet : lancez `portal complete-profile`.");
    }
    Ok(())
}

async fn complete_profile(args: ProfileArgs, session: &SessionManager) -> Result<()> {
    let user = require_session(session).await?;

    let mut details = Map::new();
    if let Some(first_name) = args.first_name {
        details.insert("firstName".to_string(), Value::String(first_name));
    }
    if let Some(city) = args.city {
        details.insert("city".to_string(), Value::String(city));
    }
    for (key, value) in args.fields {
        details.insert(key, Value::String(value));
    }

    // Required fields may already be on the session from registration.
    let mut merged = user.details.clone();
    merged.extend(details.clone());
    validate_profile(user.role, &merged)?;

    let user = session.complete_profile(details).await?;
    print_session(&user);
    Ok(())
}

async fn publish(args: PublishArgs, api: &ApiClient, session: &SessionManager) -> Result<()> {
    let user = require_employer(session).await?;
    let company = args.company.unwrap_or_else(|| {
        user.details
            .get("firstName")
            .and_then(Value::as_str)
            .unwrap_or(&user.name)
            .to_string()
    });

    let offer = api
        .publish_offer(
            &user.email,
            &NewOffer {
                emploi_metier: args.title,
                raison_sociale: company,
                ville: args.city,
                type_contrat: args.contract_type,
                nbre_postes: args.positions,
                full_description: args.description,
                required_skills: args.skills,
                suggested_salary_range: args.salary,
            },
        )
        .await?;
    println!("Offre publiée : {} ({})", offer.emploi_metier, offer.id);
    Ok(())
}

async fn show_offer(api: &ApiClient, id: Uuid, summary: bool) -> Result<()> {
    let Some(offer) = api.offer(id).await? else {
        println!("Offre introuvable.");
        return Ok(());
    };
    print_offers(std::slice::from_ref(&offer));
    println!();
    if summary {
        println!("{}", api.offer_summary(id).await?);
    } else {
        println!("{}", offer.full_description);
    }
    Ok(())
}

async fn open(path: &str, api: &ApiClient, session: &SessionManager) -> Result<()> {
    let user = session.current().await;
    let (resolved, route) = navigate(path, user.as_ref());
    if resolved != path {
        println!("→ {resolved}");
    }

    match route {
        Route::Home => println!("Souss-Massa Emploi : offres, entreprises, écoles et conseils."),
        Route::Listing { catalog, criteria } => match catalog {
            Catalog::Offers => print_offers(&api.search::<JobOffer>(catalog, &criteria).await?),
            Catalog::Companies => print_companies(&api.search::<Company>(catalog, &criteria).await?),
            Catalog::Schools => print_schools(&api.search::<School>(catalog, &criteria).await?),
            Catalog::Articles => print_articles(&api.search::<Article>(catalog, &criteria).await?),
        },
        Route::OfferDetail(id) => match Uuid::parse_str(&id) {
            Ok(id) => show_offer(api, id, false).await?,
            Err(_) => println!("Offre introuvable."),
        },
        Route::Login => println!("Connexion : portal login --email <e-mail> --password <mot de passe>"),
        Route::Register => println!("Inscription : portal register --email <e-mail> ..."),
        Route::Dashboard => {
            // Protected: a session is guaranteed here.
            if let Some(user) = user {
                print_session(&user);
                match user.role {
                    Role::Candidate => print_applications(&api.applications(&user.email).await?),
                    Role::Employer => print_offers(&api.employer_jobs(&user.email).await?),
                }
            }
        }
        Route::ProfileEditor => {
            if let Some(user) = user {
                println!("{}", serde_json::to_string_pretty(&user.details)?);
            }
        }
        Route::Pricing => println!("Tarifs : publication d'offres gratuite pendant le lancement."),
        Route::NotFound => println!("Page introuvable."),
    }
    Ok(())
}

/// Uploads a local file and returns its public URL.
async fn upload_file(
    api: &ApiClient,
    email: Option<&str>,
    path: &Path,
    category: UploadCategory,
) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("could not read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");
    let target = api
        .upload(email, file_name, mime_for_path(path)?, category, bytes)
        .await?;
    Ok(target.public_url)
}

/// MIME type from the file extension, limited to what document analysis accepts.
fn mime_for_path(path: &Path) -> Result<&'static str, PortalError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => Ok("application/pdf"),
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        "txt" => Ok("text/plain"),
        _ => Err(PortalError::Validation(format!(
            "Format non pris en charge : {} (PDF, PNG, JPEG, WEBP ou TXT).",
            path.display()
        ))),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn print_session(user: &UserSession) {
    println!(
        "{} <{}> [{}] profil {}",
        user.name,
        user.email,
        user.role.as_str(),
        if user.profile_complete { "complet" } else { "incomplet" }
    );
}

fn print_offers(offers: &[JobOffer]) {
    if offers.is_empty() {
        println!("Aucune offre ne correspond à votre recherche.");
        return;
    }
    for offer in offers {
        println!(
            "{}  {} · {} · {} · {} · {} poste(s) ({})",
            offer.id,
            offer.emploi_metier,
            offer.raison_sociale,
            offer.ville,
            offer.type_contrat,
            offer.nbre_postes,
            offer.date_offre
        );
        if !offer.required_skills.is_empty() {
            println!("    compétences : {}", offer.required_skills.join(", "));
        }
        if let Some(salary) = &offer.suggested_salary_range {
            println!("    salaire : {salary}");
        }
    }
}

fn print_companies(companies: &[Company]) {
    if companies.is_empty() {
        println!("Aucune entreprise trouvée.");
    }
    for company in companies {
        println!(
            "{}{}  {} · {} · {} offre(s) [{}]",
            company.name,
            if company.is_verified { " ✓" } else { "" },
            company.sector,
            company.city,
            company.active_offers_count,
            company.slug
        );
    }
}

fn print_schools(schools: &[School]) {
    if schools.is_empty() {
        println!("Aucune école trouvée.");
    }
    for school in schools {
        println!(
            "{}{}  {} · {} [{}]",
            school.name,
            if school.is_partner { " (partenaire)" } else { "" },
            school.school_type,
            school.city,
            school.slug
        );
    }
}

fn print_articles(articles: &[Article]) {
    if articles.is_empty() {
        println!("Aucun article trouvé.");
    }
    for article in articles {
        println!(
            "{}  [{}] {} min [{}]",
            article.title, article.category, article.read_time_minutes, article.slug
        );
        if let Some(excerpt) = &article.excerpt {
            println!("    {excerpt}");
        }
    }
}

fn print_applications(applications: &[Application]) {
    if applications.is_empty() {
        println!("Aucune candidature pour le moment.");
    }
    for application in applications {
        println!(
            "{}  {} · {} · {} (offre {})",
            application.submitted_at.format("%Y-%m-%d"),
            application.offer_title,
            application.status,
            application.id,
            application.job_offer_id
        );
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("cv.PDF")).unwrap(), "application/pdf");
        assert_eq!(mime_for_path(Path::new("scan.jpeg")).unwrap(), "image/jpeg");
        assert!(matches!(
            mime_for_path(&PathBuf::from("cv.docx")),
            Err(PortalError::Validation(_))
        ));
        assert!(mime_for_path(Path::new("README")).is_err());
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&json!(null)));
        assert!(is_blank(&json!("  ")));
        assert!(!is_blank(&json!("Agadir")));
        assert!(!is_blank(&json!(0)));
    }
}
