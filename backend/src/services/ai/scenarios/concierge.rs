//! Free-form concierge queries.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::services::ai::models::{AiFeature, FallbackDefaults};
use crate::services::ai::prompt::{optional_line, schema_section};
use crate::services::ai::service::FeatureRequest;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConciergeRequest {
    #[validate(length(min = 1, message = "query is required"))]
    pub query: String,
    #[serde(default)]
    pub context: ConciergeContext,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConciergeContext {
    pub destination: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
    pub travelers: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConciergeReply {
    pub response: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub needs_more_info: bool,
    #[serde(default)]
    pub clarifying_questions: Vec<String>,
    #[serde(default)]
    pub actionable: bool,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

impl ConciergeContext {
    fn lines(&self) -> Vec<String> {
        [
            optional_line("Destination", self.destination.as_deref()),
            optional_line("Check-in", self.check_in.as_deref()),
            optional_line("Check-out", self.check_out.as_deref()),
            optional_line("Travelers", self.travelers),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

impl FeatureRequest for ConciergeRequest {
    type Response = ConciergeReply;

    fn feature(&self) -> AiFeature {
        AiFeature::Concierge
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["response"]
    }

    fn build_prompt(&self, _defaults: &FallbackDefaults) -> String {
        let schema = r#"{
  "response": "your helpful response",
  "suggestions": ["suggestion1", "suggestion2"],
  "needsMoreInfo": false,
  "clarifyingQuestions": ["question1", "question2"],
  "actionable": true,
  "nextSteps": ["step1", "step2"]
}"#;

        let context = self.context.lines();
        let context = if context.is_empty() { "No booking context provided.".to_string() } else { context.join("\n") };

        format!(
            "You are WayStay's AI Concierge. Help the user with their travel query.\n\n\
User Query: \"{query}\"\n\n\
Context:\n{context}\n\n\
Provide helpful, accurate, and friendly assistance. If you need more information, ask clarifying questions.{schema}",
            query = self.query,
            schema = schema_section(schema),
        )
    }

    fn fallback(&self, raw: &str, _defaults: &FallbackDefaults) -> ConciergeReply {
        ConciergeReply {
            response: raw.trim().to_string(),
            suggestions: Vec::new(),
            needs_more_info: false,
            clarifying_questions: Vec::new(),
            actionable: true,
            next_steps: Vec::new(),
        }
    }
}
