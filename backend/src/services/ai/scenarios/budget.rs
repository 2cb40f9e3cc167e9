//! Trip budget estimation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use validator::Validate;

use crate::services::ai::models::{AiFeature, FallbackDefaults};
use crate::services::ai::prompt::{join_or, schema_section};
use crate::services::ai::service::FeatureRequest;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRequest {
    #[validate(length(min = 1, message = "destination is required"))]
    pub destination: String,
    #[validate(range(min = 1, message = "duration must be at least one day"))]
    pub duration: u32,
    #[validate(range(min = 1, message = "at least one traveler is required"))]
    pub travelers: u32,
    #[serde(default = "default_accommodation_type")]
    pub accommodation_type: String,
    #[serde(default = "default_travel_style")]
    pub travel_style: String,
    #[serde(default)]
    pub activities: Vec<String>,
}

fn default_accommodation_type() -> String {
    "hotel".to_string()
}

fn default_travel_style() -> String {
    "moderate".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPlan {
    pub total_estimated_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_average: Option<f64>,
    pub breakdown: BTreeMap<String, CostItem>,
    #[serde(default)]
    pub hidden_costs: Vec<String>,
    #[serde(default)]
    pub saving_tips: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_optimization: Option<BudgetOptimization>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CostItem {
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetOptimization {
    #[serde(default)]
    pub cheaper_alternatives: Vec<String>,
    #[serde(default)]
    pub free_activities: Vec<String>,
}

impl FeatureRequest for BudgetRequest {
    type Response = BudgetPlan;

    fn feature(&self) -> AiFeature {
        AiFeature::Budget
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["totalEstimatedCost", "breakdown"]
    }

    fn build_prompt(&self, _defaults: &FallbackDefaults) -> String {
        let schema = r#"{
  "totalEstimatedCost": 0,
  "dailyAverage": 0,
  "breakdown": {
    "accommodation": {"amount": 0, "details": "description"},
    "flights": {"amount": 0, "details": "description"},
    "food": {"amount": 0, "details": "description"},
    "activities": {"amount": 0, "details": "description"},
    "transportation": {"amount": 0, "details": "description"},
    "insurance": {"amount": 0, "details": "description"},
    "visaFees": {"amount": 0, "details": "description"},
    "shopping": {"amount": 0, "details": "description"},
    "emergency": {"amount": 0, "details": "description"},
    "miscellaneous": {"amount": 0, "details": "description"}
  },
  "hiddenCosts": ["cost1", "cost2"],
  "savingTips": ["tip1", "tip2"],
  "budgetOptimization": {
    "cheaperAlternatives": ["alternative1", "alternative2"],
    "freeActivities": ["activity1", "activity2"]
  }
}"#;

        format!(
            "Calculate a comprehensive trip budget for:\n\n\
Destination: {dest}\n\
Duration: {days} days\n\
Travelers: {travelers} people\n\
Accommodation Type: {acc}\n\
Travel Style: {style}\n\
Planned Activities: {acts}\n\n\
Include ALL costs:\n\
- Accommodation (with taxes and fees)\n\
- Flights/transportation\n\
- Food and dining\n\
- Activities and entertainment\n\
- Local transportation\n\
- Travel insurance\n\
- Visa fees (if applicable)\n\
- Shopping and souvenirs\n\
- Emergency fund\n\
- Tips and service charges\n\
- Currency exchange fees\n\
- Communication (roaming/local SIM)\n\n\
All amounts are numbers in USD.{schema}",
            dest = self.destination,
            days = self.duration,
            travelers = self.travelers,
            acc = self.accommodation_type,
            style = self.travel_style,
            acts = join_or(&self.activities, "none specified"),
            schema = schema_section(schema),
        )
    }

    fn fallback(&self, _raw: &str, defaults: &FallbackDefaults) -> BudgetPlan {
        let days = self.duration.max(1) as f64;
        let total = (defaults.daily_rate_per_traveler * days * self.travelers.max(1) as f64).round();

        let breakdown = defaults
            .shares()
            .into_iter()
            .map(|(name, share)| {
                let item = CostItem {
                    amount: (total * share).round(),
                    details: Some(format!("Estimated at {:.0}% of the total budget", share * 100.0)),
                };
                (name.to_string(), item)
            })
            .collect();

        BudgetPlan {
            total_estimated_cost: total,
            daily_average: Some((total / days).round()),
            breakdown,
            hidden_costs: Vec::new(),
            saving_tips: Vec::new(),
            budget_optimization: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week_in_lisbon() -> BudgetRequest {
        BudgetRequest {
            destination: "Lisbon".into(),
            duration: 7,
            travelers: 2,
            accommodation_type: "hotel".into(),
            travel_style: "budget".into(),
            activities: vec!["surfing".into()],
        }
    }

    #[test]
    fn test_fallback_is_derived_from_request() {
        let plan = week_in_lisbon().fallback("", &FallbackDefaults::default());
        assert_eq!(plan.total_estimated_cost, 2100.0);
        assert_eq!(plan.daily_average, Some(300.0));
        for key in ["accommodation", "food", "activities", "transportation"] {
            assert!(plan.breakdown.contains_key(key), "missing {key}");
        }
        assert_eq!(plan.breakdown["accommodation"].amount, 840.0);
    }

    #[test]
    fn test_fallback_follows_configured_rate() {
        let defaults = FallbackDefaults { daily_rate_per_traveler: 100.0, ..Default::default() };
        let plan = week_in_lisbon().fallback("", &defaults);
        assert_eq!(plan.total_estimated_cost, 1400.0);
    }

    #[test]
    fn test_prompt_embeds_parameters() {
        let prompt = week_in_lisbon().build_prompt(&FallbackDefaults::default());
        assert!(prompt.contains("Destination: Lisbon"));
        assert!(prompt.contains("Duration: 7 days"));
        assert!(prompt.contains("Travelers: 2 people"));
        assert!(prompt.contains("Planned Activities: surfing"));
    }
}
