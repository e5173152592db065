use serde::{Deserialize, Serialize};

/// Facts for the first listed serving of a food. Missing values stay `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub food_name: String,
    pub serving_size: Option<String>,
    /// kcal
    pub calories: Option<f64>,
    /// grams
    pub carbohydrate: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub sugar: Option<f64>,
    pub fiber: Option<f64>,
    /// milligrams
    pub sodium: Option<f64>,
}

fn show(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{v:.0}"),
        Some(v) => format!("{v}"),
        None => "N/A".to_string(),
    }
}

/// Plain-text nutrition card.
pub fn format_summary(facts: &NutritionFacts) -> String {
    let mut lines = vec![format!("📊 {} 的完整營養資訊", facts.food_name)];
    if let Some(serving) = &facts.serving_size {
        lines.push(format!("🍽️ 份量: {serving}"));
    }
    lines.extend([
        format!("🔥 卡路里: {} kcal", show(facts.calories)),
        format!("🍞 碳水化合物: {} g", show(facts.carbohydrate)),
        format!("🍬 糖分: {} g", show(facts.sugar)),
        format!("🍗 蛋白質: {} g", show(facts.protein)),
        format!("🥑 脂肪: {} g", show(facts.fat)),
        format!("🌾 纖維: {} g", show(facts.fiber)),
        format!("🧂 鈉: {} mg", show(facts.sodium)),
    ]);
    lines.join("\n")
}
