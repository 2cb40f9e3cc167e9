//! Destination safety analysis.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use validator::Validate;

use crate::services::ai::models::{AiFeature, FallbackDefaults};
use crate::services::ai::prompt::schema_section;
use crate::services::ai::service::FeatureRequest;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SafetyRequest {
    #[validate(length(min = 1, message = "location is required"))]
    pub location: String,
    #[serde(default = "default_time_of_travel")]
    pub time_of_travel: String,
}

fn default_time_of_travel() -> String {
    "unspecified".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SafetyReport {
    /// 1 (avoid) to 10 (very safe)
    pub overall_safety_score: f64,
    /// `very-safe`, `safe`, `moderate`, `caution` or `avoid`
    pub safety_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crime_analysis: Option<CrimeAnalysis>,
    #[serde(default)]
    pub safest_areas: Vec<String>,
    #[serde(default)]
    pub areas_to_avoid: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transportation_safety: Option<String>,
    #[serde(default)]
    pub health_considerations: Vec<String>,
    /// Phone numbers come back as strings or numbers.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub emergency_contacts: BTreeMap<String, Value>,
    #[serde(default)]
    pub safety_tips: Vec<String>,
    #[serde(default)]
    pub best_practices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrimeAnalysis {
    pub petty_theft: Option<String>,
    pub violent_crime: Option<String>,
    pub scams: Option<String>,
    pub trends: Option<String>,
}

impl FeatureRequest for SafetyRequest {
    type Response = SafetyReport;

    fn feature(&self) -> AiFeature {
        AiFeature::Safety
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["overallSafetyScore", "safetyLevel"]
    }

    fn build_prompt(&self, _defaults: &FallbackDefaults) -> String {
        let schema = r#"{
  "overallSafetyScore": 7,
  "safetyLevel": "very-safe/safe/moderate/caution/avoid",
  "crimeAnalysis": {
    "pettyTheft": "low/medium/high",
    "violentCrime": "low/medium/high",
    "scams": "low/medium/high",
    "trends": "description"
  },
  "safestAreas": ["area1", "area2"],
  "areasToAvoid": ["area1", "area2"],
  "transportationSafety": "assessment",
  "healthConsiderations": ["consideration1", "consideration2"],
  "emergencyContacts": {
    "police": "number",
    "medical": "number",
    "embassy": "number"
  },
  "safetyTips": ["tip1", "tip2"],
  "bestPractices": ["practice1", "practice2"]
}"#;

        format!(
            "Analyze the safety of this location for travelers:\n\n\
Location: {location}\n\
Travel Time: {when}\n\n\
Provide a comprehensive safety assessment including:\n\
1. Overall safety rating (1-10)\n\
2. Crime statistics and trends\n\
3. Areas to avoid\n\
4. Safe areas for tourists\n\
5. Transportation safety\n\
6. Health and medical considerations\n\
7. Natural disaster risks\n\
8. Political stability\n\
9. Safety tips for travelers{schema}",
            location = self.location,
            when = self.time_of_travel,
            schema = schema_section(schema),
        )
    }

    fn fallback(&self, raw: &str, _defaults: &FallbackDefaults) -> SafetyReport {
        SafetyReport {
            overall_safety_score: 7.0,
            safety_level: "safe".to_string(),
            crime_analysis: None,
            safest_areas: Vec::new(),
            areas_to_avoid: Vec::new(),
            transportation_safety: None,
            health_considerations: Vec::new(),
            emergency_contacts: BTreeMap::new(),
            safety_tips: vec![raw.trim().to_string()],
            best_practices: Vec::new(),
        }
    }
}
