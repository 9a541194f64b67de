// Generator port plus its two backends.
// LLM calls go through llm_client; nothing here talks to Anthropic directly.

pub mod generator;
pub mod llm;
pub mod prompts;
pub mod remote;

pub use generator::ProfileGenerator;
pub use llm::LlmProfileGenerator;
pub use remote::GenerationServiceClient;
