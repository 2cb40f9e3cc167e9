//! Trip itinerary and mood-based accommodation recommendations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use validator::Validate;

use crate::services::ai::models::{AiFeature, FallbackDefaults};
use crate::services::ai::prompt::{dollars, join_or, schema_section};
use crate::services::ai::service::FeatureRequest;

// ============================================================================
// Itinerary
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryRequest {
    #[validate(length(min = 1, message = "destination is required"))]
    pub destination: String,
    #[validate(range(min = 1, message = "duration must be at least one day"))]
    pub duration: u32,
    #[validate(range(min = 0.0, message = "budget cannot be negative"))]
    pub budget: f64,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default = "default_travel_style")]
    pub travel_style: String,
    #[validate(range(min = 1, message = "group size must be at least one"))]
    #[serde(default = "default_group_size")]
    pub group_size: u32,
}

fn default_travel_style() -> String {
    "moderate".to_string()
}

fn default_group_size() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryPlan {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_estimated_cost: Option<f64>,
    pub daily_itinerary: Vec<DayPlan>,
    #[serde(default)]
    pub accommodation_recommendations: Vec<AccommodationSuggestion>,
    #[serde(default)]
    pub budget_breakdown: BTreeMap<String, f64>,
    #[serde(default)]
    pub cultural_tips: Vec<String>,
    #[serde(default)]
    pub safety_advice: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub day: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub activities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accommodation_suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_daily_cost: Option<f64>,
    #[serde(default)]
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccommodationSuggestion {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ItineraryRequest {
    fn daily_cost(&self) -> f64 {
        (self.budget / self.duration.max(1) as f64).round()
    }
}

impl FeatureRequest for ItineraryRequest {
    type Response = ItineraryPlan;

    fn feature(&self) -> AiFeature {
        AiFeature::Itinerary
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["summary", "dailyItinerary"]
    }

    fn build_prompt(&self, defaults: &FallbackDefaults) -> String {
        let interests = join_or(&self.interests, "general sightseeing");
        let split = defaults.split(self.budget);
        let share = |k: &str| split.get(k).copied().unwrap_or_default();

        let schema = format!(
            r#"{{
  "summary": "Brief trip description",
  "totalEstimatedCost": {budget},
  "dailyItinerary": [
    {{
      "day": 1,
      "title": "Day 1 title",
      "activities": ["Activity 1", "Activity 2", "Activity 3"],
      "accommodationSuggestion": "Hotel recommendation",
      "estimatedDailyCost": {daily},
      "tips": ["Practical tip 1", "Practical tip 2"]
    }}
  ],
  "accommodationRecommendations": [
    {{
      "name": "Hotel Name",
      "type": "hotel/hostel/apartment",
      "priceRange": "$X-$Y per night",
      "features": ["Feature 1", "Feature 2"],
      "location": "Area description"
    }}
  ],
  "budgetBreakdown": {{
    "accommodation": {acc},
    "food": {food},
    "activities": {act},
    "transportation": {trans}
  }},
  "culturalTips": ["Cultural tip 1", "Cultural tip 2", "Cultural tip 3"],
  "safetyAdvice": ["Safety tip 1", "Safety tip 2", "Safety tip 3"]
}}"#,
            budget = self.budget,
            daily = dollars(self.daily_cost()),
            acc = dollars(share("accommodation")),
            food = dollars(share("food")),
            act = dollars(share("activities")),
            trans = dollars(share("transportation")),
        );

        format!(
            "You are a professional travel planner. Create a detailed travel itinerary in valid JSON format.\n\n\
TRIP REQUIREMENTS:\n\
- Destination: {dest}\n\
- Duration: {days} days\n\
- Total Budget: ${budget} USD\n\
- Interests: {interests}\n\
- Travel Style: {style}\n\
- Group Size: {group} people{schema}\n\
Create {days} days in dailyItinerary. Focus on {interests} interests. Budget must total ${budget}.\n",
            dest = self.destination,
            days = self.duration,
            budget = self.budget,
            style = self.travel_style,
            group = self.group_size,
            schema = schema_section(&schema),
        )
    }

    fn fallback(&self, _raw: &str, defaults: &FallbackDefaults) -> ItineraryPlan {
        ItineraryPlan {
            summary: format!(
                "A {}-day trip to {} for {} travelers with a budget of ${}.",
                self.duration,
                self.destination,
                self.group_size,
                self.budget
            ),
            total_estimated_cost: Some(self.budget),
            daily_itinerary: vec![DayPlan {
                day: 1,
                title: "Arrival Day".to_string(),
                activities: vec![
                    "Check into accommodation".to_string(),
                    "Explore nearby area".to_string(),
                    "Welcome dinner".to_string(),
                ],
                accommodation_suggestion: None,
                estimated_daily_cost: Some(self.daily_cost()),
                tips: Vec::new(),
            }],
            accommodation_recommendations: Vec::new(),
            budget_breakdown: defaults.split(self.budget),
            cultural_tips: vec![
                "Research local customs and etiquette".to_string(),
                "Learn basic phrases in the local language".to_string(),
                "Respect local traditions and dress codes".to_string(),
            ],
            safety_advice: vec![
                "Keep copies of important documents".to_string(),
                "Stay aware of your surroundings".to_string(),
                "Have emergency contacts readily available".to_string(),
            ],
        }
    }
}

// ============================================================================
// Mood-based recommendations
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoodRequest {
    #[validate(length(min = 1, message = "mood is required"))]
    pub mood: String,
    #[validate(length(min = 1, message = "destination is required"))]
    pub destination: String,
    #[serde(default)]
    pub preferences: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoodRecommendations {
    pub recommendations: Vec<MoodMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_analysis: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoodMatch {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_match: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atmosphere: Option<String>,
    #[serde(default)]
    pub key_features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perfect_for: Option<String>,
}

impl FeatureRequest for MoodRequest {
    type Response = MoodRecommendations;

    fn feature(&self) -> AiFeature {
        AiFeature::MoodRecommendations
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["recommendations"]
    }

    fn build_prompt(&self, _defaults: &FallbackDefaults) -> String {
        let schema = r#"{
  "recommendations": [
    {
      "name": "property name",
      "type": "accommodation type",
      "moodMatch": "explanation of how it matches the mood",
      "atmosphere": "description of atmosphere",
      "keyFeatures": ["feature1", "feature2"],
      "priceRange": "price range",
      "location": "area description",
      "perfectFor": "why it's perfect for this mood"
    }
  ],
  "moodAnalysis": "explanation of the mood and what type of accommodation would suit it"
}"#;

        format!(
            "Based on the mood \"{mood}\" and destination \"{dest}\", recommend accommodations that would match this emotional state.\n\n\
User preferences: {prefs}\n\n\
Consider factors like:\n\
- Atmosphere and ambiance\n\
- Location characteristics\n\
- Property features that enhance the mood\n\
- Activities nearby that align with the mood\n\n\
Provide 5 accommodation recommendations.{schema}",
            mood = self.mood,
            dest = self.destination,
            prefs = join_or(&self.preferences, "none specified"),
            schema = schema_section(schema),
        )
    }

    fn fallback(&self, raw: &str, _defaults: &FallbackDefaults) -> MoodRecommendations {
        MoodRecommendations { recommendations: Vec::new(), mood_analysis: Some(raw.trim().to_string()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paris() -> ItineraryRequest {
        ItineraryRequest {
            destination: "Paris".into(),
            duration: 3,
            budget: 1500.0,
            interests: vec!["culture".into(), "food".into()],
            travel_style: "moderate".into(),
            group_size: 2,
        }
    }

    #[test]
    fn test_budget_is_echoed_unrounded() {
        let request = ItineraryRequest { budget: 1500.75, ..paris() };
        let prompt = request.build_prompt(&FallbackDefaults::default());
        assert!(prompt.contains("Total Budget: $1500.75 USD"));
        assert!(prompt.contains("Budget must total $1500.75."));

        let plan = request.fallback("", &FallbackDefaults::default());
        assert_eq!(plan.summary, "A 3-day trip to Paris for 2 travelers with a budget of $1500.75.");
    }

    #[test]
    fn test_prompt_embeds_parameters() {
        let prompt = paris().build_prompt(&FallbackDefaults::default());
        assert!(prompt.contains("Destination: Paris"));
        assert!(prompt.contains("Duration: 3 days"));
        assert!(prompt.contains("Total Budget: $1500 USD"));
        assert!(prompt.contains("Interests: culture, food"));
        assert!(prompt.contains("Group Size: 2 people"));
        assert!(prompt.contains("\"estimatedDailyCost\": 500"));
        assert!(prompt.contains("\"accommodation\": 600"));
        assert!(prompt.contains("Return ONLY valid JSON"));
    }

    #[test]
    fn test_fallback_values() {
        let plan = paris().fallback("not json", &FallbackDefaults::default());
        assert_eq!(plan.summary, "A 3-day trip to Paris for 2 travelers with a budget of $1500.");
        assert_eq!(plan.total_estimated_cost, Some(1500.0));
        assert_eq!(plan.daily_itinerary.len(), 1);
        assert_eq!(plan.daily_itinerary[0].title, "Arrival Day");
        assert_eq!(plan.daily_itinerary[0].estimated_daily_cost, Some(500.0));
        assert_eq!(plan.budget_breakdown["food"], 450.0);
        assert_eq!(plan.cultural_tips.len(), 3);
        assert_eq!(plan.safety_advice.len(), 3);
    }

    #[test]
    fn test_validation() {
        let mut req = paris();
        assert!(req.validate().is_ok());
        req.duration = 0;
        assert!(req.validate().is_err());

        let mut req = paris();
        req.destination.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_request_defaults_from_json() {
        let req: ItineraryRequest =
            serde_json::from_str(r#"{"destination":"Lisbon","duration":4,"budget":800}"#).unwrap();
        assert_eq!(req.travel_style, "moderate");
        assert_eq!(req.group_size, 1);
        assert!(req.interests.is_empty());
    }

    #[test]
    fn test_mood_fallback_keeps_text() {
        let req = MoodRequest { mood: "calm".into(), destination: "Kyoto".into(), preferences: vec![] };
        let out = req.fallback("  Try a ryokan.  ", &FallbackDefaults::default());
        assert!(out.recommendations.is_empty());
        assert_eq!(out.mood_analysis.as_deref(), Some("Try a ryokan."));
    }
}
