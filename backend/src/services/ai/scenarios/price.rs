//! Accommodation price trend prediction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::services::ai::models::{AiFeature, FallbackDefaults};
use crate::services::ai::prompt::{join_or, schema_section};
use crate::services::ai::service::FeatureRequest;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PricePredictionRequest {
    #[validate(length(min = 1, message = "destination is required"))]
    pub destination: String,
    #[validate(length(min = 1, message = "at least one date is required"))]
    pub dates: Vec<String>,
    #[serde(default = "default_property_type")]
    pub property_type: String,
}

fn default_property_type() -> String {
    "hotel".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceForecast {
    /// `increasing`, `decreasing` or `stable`
    pub current_price_trend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_booking_time: Option<String>,
    /// Models answer with either a number or a string like "+12%".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub price_change_percentage: Option<Value>,
    /// Ordered by period, earliest first.
    #[serde(default)]
    pub price_forecast: Vec<ForecastPoint>,
    #[serde(default)]
    pub factors: Vec<String>,
    pub recommendations: BookingAdvice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasonal_insights: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub period: String,
    /// Nightly price in USD.
    #[serde(default)]
    pub price: f64,
    /// Percent change against the current price.
    #[serde(default)]
    pub change: f64,
    /// 0-100
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingAdvice {
    #[serde(default)]
    pub should_book_now: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_drop: Option<bool>,
    #[serde(default)]
    pub alternative_dates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl FeatureRequest for PricePredictionRequest {
    type Response = PriceForecast;

    fn feature(&self) -> AiFeature {
        AiFeature::PricePrediction
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["currentPriceTrend", "recommendations"]
    }

    fn build_prompt(&self, _defaults: &FallbackDefaults) -> String {
        let schema = r#"{
  "currentPriceTrend": "increasing/decreasing/stable",
  "bestBookingTime": "when to book for best prices",
  "priceChangePercentage": "estimated percentage change",
  "priceForecast": [
    {"period": "time period", "price": 150, "change": 5, "confidence": 80}
  ],
  "factors": ["factor1", "factor2"],
  "recommendations": {
    "shouldBookNow": true,
    "waitForDrop": false,
    "alternativeDates": ["date1", "date2"],
    "reasoning": "explanation"
  },
  "seasonalInsights": "seasonal pricing information"
}"#;

        format!(
            "Analyze and predict price changes for {kind} accommodations in {dest} for the following dates: {dates}.\n\n\
Consider factors like:\n\
- Seasonal trends\n\
- Local events and holidays\n\
- Historical booking patterns\n\
- Market demand indicators\n\
- Weather patterns\n\n\
List priceForecast entries in chronological order.{schema}",
            kind = self.property_type,
            dest = self.destination,
            dates = join_or(&self.dates, "flexible"),
            schema = schema_section(schema),
        )
    }

    fn fallback(&self, raw: &str, defaults: &FallbackDefaults) -> PriceForecast {
        let price_forecast = self
            .dates
            .iter()
            .map(|date| ForecastPoint {
                period: date.clone(),
                price: defaults.daily_rate_per_traveler,
                change: 0.0,
                confidence: 0.0,
            })
            .collect();

        PriceForecast {
            current_price_trend: "stable".to_string(),
            best_booking_time: Some("Book within the next 2 weeks".to_string()),
            price_change_percentage: None,
            price_forecast,
            factors: Vec::new(),
            recommendations: BookingAdvice {
                should_book_now: true,
                wait_for_drop: None,
                alternative_dates: Vec::new(),
                reasoning: Some(raw.trim().to_string()),
            },
            seasonal_insights: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai::models::Normalized;
    use crate::services::ai::normalize;

    #[test]
    fn test_prompt_lists_dates() {
        let req = PricePredictionRequest {
            destination: "Barcelona".into(),
            dates: vec!["2026-07-01".into(), "2026-07-08".into()],
            property_type: "apartment".into(),
        };
        let prompt = req.build_prompt(&FallbackDefaults::default());
        assert!(prompt.contains("apartment accommodations in Barcelona"));
        assert!(prompt.contains("2026-07-01, 2026-07-08"));
    }

    #[test]
    fn test_accepts_numeric_percentage() {
        let forecast: PriceForecast = serde_json::from_str(
            r#"{"currentPriceTrend":"increasing","priceChangePercentage":12.5,
                "recommendations":{"shouldBookNow":true}}"#,
        )
        .unwrap();
        assert_eq!(forecast.price_change_percentage, Some(serde_json::json!(12.5)));
    }

    #[test]
    fn test_forecast_points_survive_normalization() {
        let req = PricePredictionRequest {
            destination: "Barcelona".into(),
            dates: vec!["2026-07-01".into()],
            property_type: "hotel".into(),
        };
        let raw = r#"{"currentPriceTrend":"increasing",
            "priceForecast":[
                {"period":"Week 1","price":180,"change":4.5,"confidence":85},
                {"period":"Week 2","price":195,"change":8,"confidence":70}
            ],
            "recommendations":{"shouldBookNow":true}}"#;
        let defaults = FallbackDefaults::default();

        let out = normalize(raw, req.required_fields(), |raw| req.fallback(raw, &defaults));
        let Normalized::Parsed { data } = out else { panic!("expected parsed result") };
        assert_eq!(data.price_forecast.len(), 2);
        assert_eq!(data.price_forecast[0].period, "Week 1");
        assert_eq!(data.price_forecast[1].price, 195.0);

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["priceForecast"][0]["confidence"], 85.0);
    }

    #[test]
    fn test_fallback_has_stable_point_per_date() {
        let req = PricePredictionRequest {
            destination: "Rome".into(),
            dates: vec!["2026-05-01".into(), "2026-05-08".into()],
            property_type: "hotel".into(),
        };
        let forecast = req.fallback("no json here", &FallbackDefaults::default());
        assert_eq!(forecast.current_price_trend, "stable");
        assert_eq!(forecast.price_forecast.len(), 2);
        assert_eq!(forecast.price_forecast[1].period, "2026-05-08");
        assert_eq!(forecast.price_forecast[0].price, 150.0);
        assert_eq!(forecast.price_forecast[0].change, 0.0);
        assert!(req.build_prompt(&FallbackDefaults::default()).contains("\"priceForecast\""));
    }

    #[test]
    fn test_empty_dates_rejected() {
        let req = PricePredictionRequest { destination: "Rome".into(), dates: vec![], property_type: "hotel".into() };
        assert!(req.validate().is_err());
    }
}
