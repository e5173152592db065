use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::facts::NutritionFacts;
use crate::{NutritionError, NutritionLookup};

/// Caching front for a [`NutritionLookup`]. Only successful lookups are
/// cached, keyed by the trimmed, lowercased food name.
pub struct NutritionService {
    lookup: Arc<dyn NutritionLookup>,
    cache: DashMap<String, NutritionFacts>,
}

impl NutritionService {
    pub fn new(lookup: Arc<dyn NutritionLookup>) -> Self {
        Self { lookup, cache: DashMap::new() }
    }

    pub fn facts(&self, food: &str) -> Result<NutritionFacts, NutritionError> {
        let key = food.trim().to_lowercase();
        if key.is_empty() {
            return Err(NutritionError::NotFound(food.to_string()));
        }
        if let Some(hit) = self.cache.get(&key) {
            debug!(food = %key, "nutrition cache hit");
            return Ok(hit.value().clone());
        }
        let facts = self.lookup.lookup(food.trim())?;
        self.cache.insert(key, facts.clone());
        Ok(facts)
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
