//! Feature scenarios: one request type per AI capability, each carrying its
//! prompt, required fields and fallback.

pub mod budget;
pub mod concierge;
pub mod itinerary;
pub mod price;
pub mod safety;
pub mod translation;

pub use budget::*;
pub use concierge::*;
pub use itinerary::*;
pub use price::*;
pub use safety::*;
pub use translation::*;
