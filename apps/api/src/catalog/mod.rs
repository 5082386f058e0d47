// Public listings: job offers, companies, schools and career articles.
// All filtering goes through `query::compose`; each catalog only declares its `ListingSpec`.

pub mod articles;
pub mod companies;
pub mod handlers;
pub mod offers;
pub mod query;
pub mod schools;
