//! AI Feature Services
//!
//! Every travel feature (itinerary, translation, pricing, budget, concierge,
//! safety, ...) is the same pipeline over a different request type.
//!
//! # Architecture
//! ```text
//! ┌────────────────┐   build_prompt   ┌──────────────────┐
//! │ FeatureRequest │ ───────────────▶ │ GenerativeClient │  ← Trait (Gemini)
//! └────────────────┘                  └────────┬─────────┘
//!                                              │ Completion
//!                                              ▼
//!                   Normalized<T>     ┌──────────────────┐
//!                 ◀────────────────── │    normalizer    │  parsed | fallback
//!                                     └──────────────────┘
//! ```
//!
//! Client failures are categorized (`classify`) and propagated; parse
//! failures never are. `RequestTracker` keeps one in-flight call per
//! (client, feature) pair.

mod classify;
mod client;
mod harness;
mod models;
mod normalizer;
mod prompt;
mod scenarios;
mod service;
mod state;

pub use classify::{FailureSignal, classify, classify_message};
pub use client::{GeminiClient, GenerativeClient, strip_model_prefix};
pub use harness::{FeatureCheck, SelfTestReport, run_all_features};
pub use models::*;
pub use normalizer::{FALLBACK_NOTE, extract_json_candidate, normalize, strip_code_fences};
pub use scenarios::*;
pub use service::{AiService, AiServiceImpl, FeatureRequest, PROBE_PROMPT, ProbeAttempt, ProbeReport};
pub use state::{FeatureState, PendingGuard, RequestState, RequestTracker};

#[cfg(test)]
mod tests;
