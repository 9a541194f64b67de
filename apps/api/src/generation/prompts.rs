// Prompt templates for the LLM-backed profile generator.
// Placeholders in `{braces}` are substituted with `str::replace` before sending.

/// Field regeneration: the model must answer `{"value": ...}`.
/// Replace: {grounding_instruction}, {field_instruction}, {current_json},
///          {full_name}, {title}
pub const REGENERATE_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

Candidate: {full_name}
Target job title: {title}

CURRENT VALUE:
{current_json}

TASK:
{field_instruction}

Return a JSON object with exactly one key:
{"value": <the rewritten value>}"#;

pub const SUMMARY_INSTRUCTION: &str = "Rewrite this professional summary in 3 to 5 sentences. \
    Open with the candidate's role and experience level, highlight one or two achievements, \
    and close with the most relevant skills. `value` must be a single string.";

pub const SKILLS_INSTRUCTION: &str = "Rewrite this skills list so it is deduplicated, uses the \
    canonical spelling of each technology, and is ordered by relevance to the target job title. \
    Keep between 5 and 15 entries. `value` must be an array of strings.";

pub const EXPERIENCE_ITEM_INSTRUCTION: &str = "Rewrite the `description` of this single \
    position as two or three achievement-focused sentences with strong action verbs. \
    `value` must be a single string holding only the new description.";

pub const EXPERIENCE_LIST_INSTRUCTION: &str = "Rewrite the `description` of every position \
    as two or three achievement-focused sentences. Keep the same number of positions in the \
    same order. `value` must be an array of objects with the keys \
    `title`, `company`, `years` and `description`.";

/// Whole-document tailoring. The model returns the complete document.
/// Replace: {grounding_instruction}, {job_title}, {document_json}
pub const TAILOR_PROMPT_TEMPLATE: &str = r#"{grounding_instruction}

Tailor the following CV for the job title "{job_title}".
Reword the summary, reorder and prune skills, and sharpen experience
descriptions towards that role. Keep every field present.

CV (JSON):
{document_json}

Return the tailored CV as a JSON object with exactly the same keys and
value types as the input."#;

/// Summary generation, plain text output.
/// Replace: {title}, {skills}, {experience_text}
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"Generate a highly professional, concise and impactful CV summary for a job application.

Target Job Title: {title}
Key Skills: {skills}
Relevant Experience: {experience_text}

The summary must be 3 to 5 sentences, tailored to the target job title.
Sentence 1 states the role and quantifies the experience level; the middle
sentences highlight the most significant achievements; the closing sentence
names the most relevant skills and the candidate's value proposition.

Return the summary only, without headings or introductory text."#;
