use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use medrag_nutrition::{format_summary, NutritionError, NutritionFacts, NutritionLookup, NutritionService};

#[derive(Default)]
struct CountingLookup {
    calls: AtomicUsize,
}

impl NutritionLookup for CountingLookup {
    fn lookup(&self, food: &str) -> Result<NutritionFacts, NutritionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if food.eq_ignore_ascii_case("unobtainium") {
            return Err(NutritionError::NotFound(food.to_string()));
        }
        Ok(NutritionFacts { food_name: food.to_string(), calories: Some(52.0), ..NutritionFacts::default() })
    }
}

#[test]
fn repeated_lookups_hit_the_cache() {
    let lookup = Arc::new(CountingLookup::default());
    let service = NutritionService::new(lookup.clone());

    let first = service.facts("Apple").expect("facts");
    let second = service.facts("  apple ").expect("facts");
    assert_eq!(first, second);
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.cached(), 1);
    assert!(format_summary(&first).contains("🔥 卡路里: 52 kcal"));
}

#[test]
fn failures_are_not_cached() {
    let lookup = Arc::new(CountingLookup::default());
    let service = NutritionService::new(lookup.clone());

    assert!(matches!(service.facts("unobtainium"), Err(NutritionError::NotFound(_))));
    assert!(service.facts("unobtainium").is_err());
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    assert_eq!(service.cached(), 0);
    assert!(service.facts("   ").is_err());
    assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
}
