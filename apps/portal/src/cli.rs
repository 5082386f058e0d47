use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::session::Role;

/// Top-level CLI parser for the `portal` binary.
#[derive(Debug, Parser)]
#[command(name = "portal", version, about = "Souss-Massa job board client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Job board API base URL (overrides PORTAL_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create an account, optionally pre-filled from a CV or company document
    Register(RegisterArgs),
    /// Sign in with e-mail and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out locally and remotely
    Logout,
    /// Show the current session
    Whoami,
    /// Pull the stored profile into the session
    Refresh,
    /// Fill in the required profile fields
    CompleteProfile(ProfileArgs),
    /// Send a password reset e-mail
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    /// Search job offers
    Offers(OfferArgs),
    /// Show one offer
    Offer {
        id: Uuid,
        /// Add an AI summary
        #[arg(long)]
        summary: bool,
    },
    /// Search companies
    Companies(CompanyArgs),
    /// Search schools
    Schools(SchoolArgs),
    /// Search career articles
    Articles(ArticleArgs),
    /// Apply to an offer
    Apply {
        offer_id: Uuid,
        #[arg(long)]
        company_id: Option<String>,
    },
    /// List my applications
    Applications,
    /// Publish a job offer (employers)
    Publish(PublishArgs),
    /// List offers I published (employers)
    MyJobs,
    /// Upload a CV or company document to storage
    Upload {
        path: PathBuf,
        #[arg(long, value_enum)]
        category: UploadKind,
    },
    /// Ask the career assistant
    Advice {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Resolve a portal path the way the web app would, e.g. "/offres?city=Agadir"
    Open { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UploadKind {
    Cv,
    CompanyDoc,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub confirm_password: String,
    #[arg(long, value_enum, default_value = "candidate")]
    pub role: Role,
    /// First name, or company name for employers
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    /// CV (candidates) or company document (employers) to extract details from
    #[arg(long)]
    pub document: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// First name, or company name for employers
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    /// Extra profile field, repeatable: --field school=ENCG
    #[arg(long = "field", value_parser = parse_key_value)]
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Default, Args)]
pub struct OfferArgs {
    #[arg(long)]
    pub keywords: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub contract_type: Option<String>,
    #[arg(long)]
    pub job_title: Option<String>,
    /// Comma-separated skills
    #[arg(long)]
    pub skills: Option<String>,
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Args)]
pub struct CompanyArgs {
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub sector: Option<String>,
}

#[derive(Debug, Default, Args)]
pub struct SchoolArgs {
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long = "type")]
    pub school_type: Option<String>,
    #[arg(long)]
    pub partners_only: bool,
}

#[derive(Debug, Default, Args)]
pub struct ArticleArgs {
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Debug, Args)]
pub struct PublishArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub city: String,
    #[arg(long)]
    pub contract_type: String,
    #[arg(long)]
    pub description: String,
    /// Defaults to the profile's company name
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub positions: Option<i32>,
    /// Comma-separated skills
    #[arg(long)]
    pub skills: Option<String>,
    #[arg(long)]
    pub salary: Option<String>,
}

/// Query-string pairs for the non-blank criteria.
fn criteria(pairs: &[(&str, Option<&str>)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .filter_map(|&(key, value)| {
            let value = value?.trim();
            (!value.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

impl OfferArgs {
    pub fn criteria(&self) -> Vec<(String, String)> {
        let limit = self.limit.map(|l| l.to_string());
        criteria(&[
            ("keywords", self.keywords.as_deref()),
            ("city", self.city.as_deref()),
            ("contractType", self.contract_type.as_deref()),
            ("jobTitle", self.job_title.as_deref()),
            ("skills", self.skills.as_deref()),
            ("limit", limit.as_deref()),
        ])
    }
}

impl CompanyArgs {
    pub fn criteria(&self) -> Vec<(String, String)> {
        criteria(&[
            ("search", self.search.as_deref()),
            ("city", self.city.as_deref()),
            ("sector", self.sector.as_deref()),
        ])
    }
}

impl SchoolArgs {
    pub fn criteria(&self) -> Vec<(String, String)> {
        criteria(&[
            ("search", self.search.as_deref()),
            ("city", self.city.as_deref()),
            ("type", self.school_type.as_deref()),
            ("partnersOnly", self.partners_only.then_some("true")),
        ])
    }
}

impl ArticleArgs {
    pub fn criteria(&self) -> Vec<(String, String)> {
        criteria(&[
            ("search", self.search.as_deref()),
            ("category", self.category.as_deref()),
        ])
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn offers_criteria_skip_blank_values() {
        let cli = Cli::try_parse_from([
            "portal",
            "offers",
            "--city",
            "Agadir",
            "--contract-type",
            "Stage",
            "--keywords",
            "  ",
        ])
        .expect("cli should parse");
        let Commands::Offers(args) = cli.command else {
            panic!("expected offers command");
        };
        assert_eq!(
            args.criteria(),
            vec![
                ("city".to_string(), "Agadir".to_string()),
                ("contractType".to_string(), "Stage".to_string()),
            ]
        );
    }

    #[test]
    fn school_flag_only_sent_when_set() {
        assert!(SchoolArgs::default().criteria().is_empty());
        let args = SchoolArgs {
            partners_only: true,
            ..SchoolArgs::default()
        };
        assert_eq!(
            args.criteria(),
            vec![("partnersOnly".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn register_parses_role_and_global_flags() {
        let cli = Cli::try_parse_from([
            "portal",
            "--api-url",
            "http://api.local",
            "register",
            "--email",
            "rh@atlas.ma",
            "--password",
            "secret1",
            "--confirm-password",
            "secret1",
            "--role",
            "employer",
        ])
        .expect("cli should parse");
        assert_eq!(cli.api_url.as_deref(), Some("http://api.local"));
        let Commands::Register(args) = cli.command else {
            panic!("expected register command");
        };
        assert_eq!(args.role, Role::Employer);
        assert!(args.document.is_none());
    }

    #[test]
    fn profile_fields_parse_as_pairs() {
        let cli = Cli::try_parse_from([
            "portal",
            "complete-profile",
            "--city",
            "Agadir",
            "--field",
            "school=ENCG Agadir",
        ])
        .expect("cli should parse");
        let Commands::CompleteProfile(args) = cli.command else {
            panic!("expected complete-profile command");
        };
        assert_eq!(
            args.fields,
            vec![("school".to_string(), "ENCG Agadir".to_string())]
        );
        assert!(parse_key_value("novalue").is_err());
    }
}
