//! Per-serving nutrition facts for foods named in a conversation.

#![deny(unused_imports)]
#![deny(unused_variables)]

pub mod facts;
pub mod fatsecret;
pub mod service;

pub use facts::{format_summary, NutritionFacts};
pub use fatsecret::FatSecretClient;
pub use service::NutritionService;

#[derive(Debug, thiserror::Error)]
pub enum NutritionError {
    #[error("could not obtain an access token: {0}")]
    Token(String),
    #[error("request failed: {0}")]
    Http(String),
    #[error("no food found for '{0}'")]
    NotFound(String),
    #[error("'{0}' has no serving data")]
    NoServings(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Nutrition source seam; [`FatSecretClient`] is the production implementation.
pub trait NutritionLookup: Send + Sync {
    fn lookup(&self, food: &str) -> Result<NutritionFacts, NutritionError>;
}
