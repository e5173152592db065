//! FatSecret platform API client (OAuth2 client credentials).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use medrag_core::config::NutritionSettings;
use medrag_core::error::Error;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::facts::NutritionFacts;
use crate::{NutritionError, NutritionLookup};

const SEARCH_RESULTS: &str = "10";
/// Renew tokens this long before the server-side expiry.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

pub struct FatSecretClient {
    client_id: String,
    client_secret: String,
    token_url: String,
    api_url: String,
    client: Client,
    token: Mutex<Option<(String, Instant)>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// One row of a `foods.search.v3` result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FoodHit {
    pub food_id: String,
    pub food_name: String,
    #[serde(default)]
    pub food_type: Option<String>,
}

impl FatSecretClient {
    pub fn new(settings: &NutritionSettings) -> Result<Self> {
        let (Some(client_id), Some(client_secret)) = (settings.client_id.clone(), settings.client_secret.clone()) else {
            let reason = "nutrition.client_id and nutrition.client_secret must be set";
            return Err(Error::InvalidConfig(reason.into()).into());
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("failed to build FatSecret HTTP client")?;
        Ok(Self {
            client_id,
            client_secret,
            token_url: settings.token_url.clone(),
            api_url: settings.api_url.clone(),
            client,
            token: Mutex::new(None),
        })
    }

    fn access_token(&self) -> Result<String, NutritionError> {
        if let Ok(guard) = self.token.lock() {
            if let Some((token, expires)) = guard.as_ref() {
                if Instant::now() < *expires {
                    return Ok(token.clone());
                }
            }
        }
        let resp = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "premier")])
            .send()
            .map_err(|e| NutritionError::Token(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(NutritionError::Token(format!("{status}: {body}")));
        }
        let parsed: TokenResponse = resp.json().map_err(|e| NutritionError::Token(e.to_string()))?;
        let ttl = Duration::from_secs(parsed.expires_in).saturating_sub(TOKEN_MARGIN);
        if let Ok(mut guard) = self.token.lock() {
            *guard = Some((parsed.access_token.clone(), Instant::now() + ttl));
        }
        info!("obtained FatSecret access token");
        Ok(parsed.access_token)
    }

    fn call(&self, token: &str, params: &[(&str, &str)]) -> Result<Value, NutritionError> {
        let resp = self
            .client
            .get(&self.api_url)
            .bearer_auth(token)
            .query(params)
            .send()
            .map_err(|e| NutritionError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(NutritionError::Http(format!("{status}: {body}")));
        }
        resp.json().map_err(|e| NutritionError::Decode(e.to_string()))
    }
}

impl NutritionLookup for FatSecretClient {
    fn lookup(&self, food: &str) -> Result<NutritionFacts, NutritionError> {
        let token = self.access_token()?;
        let search = self.call(
            &token,
            &[
                ("method", "foods.search.v3"),
                ("search_expression", food),
                ("format", "json"),
                ("max_results", SEARCH_RESULTS),
            ],
        )?;
        let hits = search_hits(&search)?;
        let chosen = select_food(&hits, food).ok_or_else(|| NutritionError::NotFound(food.to_string()))?;
        debug!(query = food, food_id = %chosen.food_id, name = %chosen.food_name, "selected food");

        let details =
            self.call(&token, &[("method", "food.get.v2"), ("food_id", chosen.food_id.as_str()), ("format", "json")])?;
        parse_food_details(&details, &chosen.food_name)
    }
}

/// The API returns a single object instead of a one-element list.
fn one_or_many(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(v @ Value::Object(_)) => vec![v],
        _ => Vec::new(),
    }
}

pub fn search_hits(body: &Value) -> Result<Vec<FoodHit>, NutritionError> {
    one_or_many(body.pointer("/foods_search/results/food"))
        .into_iter()
        .map(|v| {
            let mut v = v.clone();
            // ids arrive as strings or numbers depending on the endpoint version
            if let Some(id) = v.get("food_id").and_then(Value::as_u64) {
                v["food_id"] = Value::String(id.to_string());
            }
            serde_json::from_value(v).map_err(|e| NutritionError::Decode(e.to_string()))
        })
        .collect()
}

/// Prefer generic foods (brands only when nothing generic matched), then an
/// exact case-insensitive name match, else the shortest name.
pub fn select_food<'a>(hits: &'a [FoodHit], query: &str) -> Option<&'a FoodHit> {
    let generic: Vec<&FoodHit> = hits.iter().filter(|h| h.food_type.as_deref() == Some("Generic")).collect();
    let pool: Vec<&FoodHit> = if generic.is_empty() {
        if !hits.is_empty() {
            warn!(query, "only branded foods found");
        }
        hits.iter().collect()
    } else {
        generic
    };
    let query = query.trim().to_lowercase();
    pool.iter()
        .find(|h| h.food_name.to_lowercase() == query)
        .or_else(|| pool.iter().min_by_key(|h| h.food_name.chars().count()))
        .copied()
}

fn number(serving: &Value, key: &str) -> Option<f64> {
    match serving.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Facts for the first serving of a `food.get.v2` response.
pub fn parse_food_details(body: &Value, food_name: &str) -> Result<NutritionFacts, NutritionError> {
    let servings = one_or_many(body.pointer("/food/servings/serving"));
    let serving = servings.first().ok_or_else(|| NutritionError::NoServings(food_name.to_string()))?;
    Ok(NutritionFacts {
        food_name: food_name.to_string(),
        serving_size: serving.get("serving_description").and_then(Value::as_str).map(str::to_string),
        calories: number(serving, "calories"),
        carbohydrate: number(serving, "carbohydrate"),
        protein: number(serving, "protein"),
        fat: number(serving, "fat"),
        sugar: number(serving, "sugar"),
        fiber: number(serving, "fiber"),
        sodium: number(serving, "sodium"),
    })
}
