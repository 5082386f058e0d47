use serde_json::{json, Value};

use crate::llm_client::prompts::{NO_INVENTION_INSTRUCTION, REGION_CONTEXT};

/// Education levels offered by the profile form; extraction is constrained to them.
pub const EDUCATION_LEVELS: &[&str] = &[
    "Bac+2",
    "Bac+3 (Licence)",
    "Bac+5 (Master/Ingénieur)",
    "Doctorat",
];

pub fn resume_instruction() -> String {
    format!(
        "Analyse this CV and extract the fields of the JSON schema. \
         For educationLevel choose one of: {levels}. \
         For city, prefer a Moroccan city. \
         For experienceYears, return a whole number of years. \
         For skills, return a comma-separated list. {NO_INVENTION_INSTRUCTION}",
        levels = EDUCATION_LEVELS.join(", ")
    )
}

pub fn company_instruction() -> String {
    format!(
        "Analyse this company document (brochure, trade register extract or profile) and \
         extract: the company name (firstName), business sector (companySector), city, \
         contact email, phone and a short description. {NO_INVENTION_INSTRUCTION}"
    )
}

pub fn resume_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "firstName": { "type": "STRING" },
            "lastName": { "type": "STRING" },
            "email": { "type": "STRING" },
            "phone": { "type": "STRING" },
            "city": { "type": "STRING" },
            "educationLevel": { "type": "STRING" },
            "experienceYears": { "type": "NUMBER" },
            "skills": { "type": "STRING" },
            "description": { "type": "STRING" },
            "school": { "type": "STRING" }
        }
    })
}

pub fn company_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "firstName": { "type": "STRING" },
            "companySector": { "type": "STRING" },
            "city": { "type": "STRING" },
            "email": { "type": "STRING" },
            "phone": { "type": "STRING" },
            "description": { "type": "STRING" }
        }
    })
}

pub fn advice_prompt(query: &str) -> String {
    format!(
        "{REGION_CONTEXT}\n\
         Answer the following question from a student or young graduate, encouraging and practical. \
         Focus on the economic dynamism of Agadir and its region when relevant.\n\
         Question: {query}"
    )
}

pub fn offer_summary_prompt(title: &str, description: &str) -> String {
    format!(
        "{REGION_CONTEXT}\n\
         Summarise this job offer in 3 key points.\n\
         Title: {title}\n\
         Description: {description}"
    )
}
