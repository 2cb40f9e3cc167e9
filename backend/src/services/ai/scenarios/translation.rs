//! Translation and cultural-context checks.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::services::ai::models::{AiFeature, FallbackDefaults};
use crate::services::ai::prompt::{schema_section, text_only_instruction};
use crate::services::ai::service::FeatureRequest;

/// Translation returns plain text, so it is not a [`FeatureRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    #[validate(length(min = 1, message = "text is required"))]
    pub text: String,
    #[validate(length(min = 1, message = "target language is required"))]
    pub target_language: String,
    #[serde(default = "default_source_language")]
    pub source_language: String,
}

fn default_source_language() -> String {
    "auto".to_string()
}

impl TranslationRequest {
    pub fn build_prompt(&self) -> String {
        let target = &self.target_language;
        let source_hint = if self.source_language.eq_ignore_ascii_case("auto") {
            String::new()
        } else {
            format!(" from {}", self.source_language)
        };

        format!(
            "Translate the following text{source_hint} to {target}:\n\n\
\"{text}\"\n\n\
{only}\n\
If the source language is not {target}, translate it.\n\
If it's already in {target}, return the original text.\n",
            text = self.text,
            only = text_only_instruction(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CulturalContextRequest {
    #[validate(length(min = 1, message = "text is required"))]
    pub text: String,
    #[validate(length(min = 1, message = "target country is required"))]
    pub target_country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CulturalContext {
    pub is_appropriate: bool,
    pub cultural_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_alternative: Option<String>,
    #[serde(default)]
    pub etiquette_tips: Vec<String>,
}

impl FeatureRequest for CulturalContextRequest {
    type Response = CulturalContext;

    fn feature(&self) -> AiFeature {
        AiFeature::CulturalContext
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["isAppropriate", "culturalNotes"]
    }

    fn build_prompt(&self, _defaults: &FallbackDefaults) -> String {
        let schema = r#"{
  "isAppropriate": true,
  "culturalNotes": "explanation",
  "suggestedAlternative": "alternative text if needed",
  "etiquetteTips": ["tip1", "tip2"]
}"#;

        format!(
            "Provide cultural context for this message when communicating in {country}:\n\n\
\"{text}\"\n\n\
Explain:\n\
1. Cultural appropriateness\n\
2. Any potential misunderstandings\n\
3. Suggested polite alternatives if needed\n\
4. Cultural etiquette tips{schema}",
            country = self.target_country,
            text = self.text,
            schema = schema_section(schema),
        )
    }

    fn fallback(&self, raw: &str, _defaults: &FallbackDefaults) -> CulturalContext {
        CulturalContext {
            is_appropriate: true,
            cultural_notes: raw.trim().to_string(),
            suggested_alternative: None,
            etiquette_tips: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_prompt() {
        let req = TranslationRequest {
            text: "Hello, how are you?".into(),
            target_language: "French".into(),
            source_language: "auto".into(),
        };
        let prompt = req.build_prompt();
        assert!(prompt.starts_with("Translate the following text to French:"));
        assert!(prompt.contains("\"Hello, how are you?\""));

        let req = TranslationRequest { source_language: "English".into(), ..req };
        assert!(req.build_prompt().starts_with("Translate the following text from English to French:"));
    }

    #[test]
    fn test_cultural_fallback() {
        let req = CulturalContextRequest { text: "Hi".into(), target_country: "Japan".into() };
        let out = req.fallback("Bowing is customary.", &FallbackDefaults::default());
        assert!(out.is_appropriate);
        assert_eq!(out.cultural_notes, "Bowing is customary.");
    }
}
