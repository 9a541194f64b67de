//! `ProfileGenerator` backed directly by Claude through [`LlmClient`].
//!
//! Produces values in the same shapes the remote generation service returns,
//! so the coordinator validates both backends the same way.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::generation::generator::{
    FieldRegenerationRequest, GenerateCvRequest, GeneratedCv, GenerationError, ProfileGenerator,
    TailorRequest,
};
use crate::generation::prompts::{
    EXPERIENCE_ITEM_INSTRUCTION, EXPERIENCE_LIST_INSTRUCTION, REGENERATE_PROMPT_TEMPLATE,
    SKILLS_INSTRUCTION, SUMMARY_INSTRUCTION, SUMMARY_PROMPT_TEMPLATE, TAILOR_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::{CV_WRITER_SYSTEM, GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::llm_client::LlmClient;
use crate::regeneration::target::RegenerableField;

#[derive(Debug, Deserialize)]
struct RegeneratedValue {
    value: Value,
}

pub struct LlmProfileGenerator {
    llm: LlmClient,
}

impl LlmProfileGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ProfileGenerator for LlmProfileGenerator {
    fn backend(&self) -> &'static str {
        "anthropic"
    }

    async fn regenerate_field(
        &self,
        request: &FieldRegenerationRequest,
    ) -> Result<Value, GenerationError> {
        let prompt = build_regenerate_prompt(request);
        let system = format!("{CV_WRITER_SYSTEM} {JSON_ONLY_SYSTEM}");
        let reply: RegeneratedValue = self.llm.call_json(&prompt, &system).await?;
        Ok(reply.value)
    }

    async fn tailor(&self, request: &TailorRequest) -> Result<Value, GenerationError> {
        let document_json = serde_json::to_string_pretty(&request.current_document)
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        let prompt = TAILOR_PROMPT_TEMPLATE
            .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
            .replace("{job_title}", &request.job_title)
            .replace("{document_json}", &document_json);
        let system = format!("{CV_WRITER_SYSTEM} {JSON_ONLY_SYSTEM}");
        Ok(self.llm.call_json(&prompt, &system).await?)
    }

    async fn generate_cv(
        &self,
        request: &GenerateCvRequest,
    ) -> Result<GeneratedCv, GenerationError> {
        let prompt = SUMMARY_PROMPT_TEMPLATE
            .replace("{title}", &request.title)
            .replace("{skills}", &request.skills)
            .replace("{experience_text}", &request.experience_text);
        let summary = self.llm.call_text(&prompt, CV_WRITER_SYSTEM).await?;
        Ok(GeneratedCv::Summary(summary))
    }
}

fn build_regenerate_prompt(request: &FieldRegenerationRequest) -> String {
    let field_instruction = match (request.field_key, request.index) {
        (RegenerableField::Summary, _) => SUMMARY_INSTRUCTION,
        (RegenerableField::Skills, _) => SKILLS_INSTRUCTION,
        (RegenerableField::Experience, Some(_)) => EXPERIENCE_ITEM_INSTRUCTION,
        (RegenerableField::Experience, None) => EXPERIENCE_LIST_INSTRUCTION,
    };
    let current_json =
        serde_json::to_string_pretty(&request.current).unwrap_or_else(|_| request.current.to_string());

    REGENERATE_PROMPT_TEMPLATE
        .replace("{grounding_instruction}", GROUNDING_INSTRUCTION)
        .replace("{field_instruction}", field_instruction)
        .replace("{current_json}", &current_json)
        .replace("{full_name}", &request.context.full_name)
        .replace("{title}", &request.context.title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::generator::GenerationContext;
    use serde_json::json;

    fn request(field_key: RegenerableField, index: Option<usize>, current: Value) -> FieldRegenerationRequest {
        FieldRegenerationRequest {
            session_id: "s".into(),
            field_key,
            index,
            current,
            context: GenerationContext {
                full_name: "Ada Lovelace".into(),
                title: "Data Engineer".into(),
                phone: String::new(),
            },
        }
    }

    #[test]
    fn test_item_prompt_asks_for_description_only() {
        let prompt = build_regenerate_prompt(&request(
            RegenerableField::Experience,
            Some(0),
            json!({"title": "Analyst", "company": "Acme", "years": "2019", "description": "did things"}),
        ));
        assert!(prompt.contains(EXPERIENCE_ITEM_INSTRUCTION));
        assert!(prompt.contains("did things"));
        assert!(prompt.contains("Data Engineer"));
        assert!(!prompt.contains("{current_json}"));
    }

    #[test]
    fn test_skills_prompt_carries_current_list() {
        let prompt = build_regenerate_prompt(&request(
            RegenerableField::Skills,
            None,
            json!(["rust", "Rust", "SQL"]),
        ));
        assert!(prompt.contains(SKILLS_INSTRUCTION));
        assert!(prompt.contains("\"SQL\""));
        assert!(prompt.contains("Ada Lovelace"));
    }
}
