// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// Regional framing prepended to every user-facing answer.
pub const REGION_CONTEXT: &str = "\
    You are a recruitment expert for the Souss-Massa region of Morocco, writing for the \
    SoussMassa-RH job board. Answer in French unless the question is in another language.";

/// Instruction appended to extraction prompts: absent data must stay empty, never invented.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    If a field is not present in the document, return an empty string for it. \
    Do NOT infer or invent values.";
