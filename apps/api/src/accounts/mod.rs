// Caller-scoped data: candidate/employer profiles, applications, employer job listings.
// Every handler here requires a `CurrentUser`.

pub mod applications;
pub mod handlers;
pub mod profiles;
