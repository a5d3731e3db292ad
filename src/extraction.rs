//! Document extraction through the Gemini `generateContent` endpoint.
//!
//! Every failure (missing key, transport error, bad status, unparsable answer)
//! is logged and turned into `None`. Callers report that as a normal failure.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex_lite::Regex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use static_init::dynamic;

use crate::{
    constants::{GEMINI_HOST, GEMINI_MODEL},
    data_types::{Category, DietaryFlags, MealType},
};

const MARITIME_CALORIE_GUIDELINES: &str = "
Use the following Maritime Nutrition Guidelines for calorie estimation. Assume standard portion sizes as defined below:

MEAT & FISH (Per 100g / Standard Portion):
- Beef (roast): 280 Kcal/100g (Portion ~107g = 300 Kcal)
- Chicken: 200 Kcal/100g (Portion ~110g = 220 Kcal)
- Pork: 290 Kcal/100g (Portion ~110g = 320 Kcal)
- Bacon (fried): 500 Kcal/100g (2 rashers = 250 Kcal)
- Sausage (pork fried): 320 Kcal/100g (Portion ~78g = 250 Kcal)
- Salmon (fresh): 180 Kcal/100g (Portion ~122g = 220 Kcal)
- Ham: 240 Kcal/100g
- Lamb (roast): 300 Kcal/100g

STARCHES & GRAINS (Per 100g / Standard Portion):
- Rice (white boiled): 140 Kcal/100g (Portion ~300g = 420 Kcal)
- Pasta (boiled): 110 Kcal/100g (Portion ~300g = 330 Kcal)
- Potatoes (boiled): 70 Kcal/100g (Portion ~300g = 210 Kcal)
- Bread (white thick slice): 240 Kcal/100g (1 slice ~40g = 96 Kcal)
- Noodles (boiled): 70 Kcal/100g (Portion ~250g = 175 Kcal)

DAIRY & EGGS:
- Eggs: 150 Kcal/100g (1 average egg ~60g = 90 Kcal)
- Cheese (average): 440 Kcal/100g (Portion ~25g = 110 Kcal)
- Milk (whole): 70 Kcal/100g
- Yogurt (natural): 60 Kcal/100g (1 small pot = 90 Kcal)

FRUIT & VEG (Per 100g):
- Apple: 44 Kcal
- Banana: 65 Kcal (1 medium ~165g = 107 Kcal)
- Broccoli: 32 Kcal
- Peas: 148 Kcal
- Carrots/Mixed Veg: ~35-50 Kcal

NOTE: A complete hot meal (main + side + dessert) typically delivers ~885 Kcal (30-35% of daily need).
";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExtractedItem {
    pub name: String,
    pub category: Category,
    pub estimated_calories: u32,
    #[serde(default)]
    pub dietary_flags: DietaryFlags,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExtractedMenu {
    pub meal_type: Option<MealType>,
    pub items: Vec<ExtractedItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub name: String,
    pub rank: String,
    #[serde(default)]
    pub crew_id: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExtractedRoster {
    pub crew_members: Vec<RosterEntry>,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize, Debug)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize, Debug)]
struct Part {
    text: Option<String>,
}

fn menu_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "meal_type": { "type": "STRING", "enum": ["Breakfast", "Lunch", "Dinner"] },
            "items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "category": {
                            "type": "STRING",
                            "enum": ["main", "side", "dessert", "beverage", "fruit"]
                        },
                        "estimated_calories": { "type": "INTEGER" },
                        "dietary_flags": {
                            "type": "OBJECT",
                            "properties": {
                                "contains_pork": { "type": "BOOLEAN" },
                                "contains_beef": { "type": "BOOLEAN" },
                                "contains_shellfish": { "type": "BOOLEAN" },
                                "vegetarian": { "type": "BOOLEAN" },
                                "halal_compliant": { "type": "BOOLEAN" }
                            },
                            "required": ["contains_pork", "contains_beef", "vegetarian", "halal_compliant"]
                        }
                    },
                    "required": ["name", "category", "estimated_calories", "dietary_flags"]
                }
            }
        },
        "required": ["meal_type", "items"]
    })
}

fn roster_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "crew_members": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "rank": { "type": "STRING" },
                        "crew_id": { "type": "STRING" },
                        "nationality": { "type": "STRING" }
                    },
                    "required": ["name", "rank"]
                }
            }
        },
        "required": ["crew_members"]
    })
}

fn menu_prompt() -> String {
    format!(
        "Analyze this menu image. Extract items and flag dietary restrictions.\n\n\
        ESTIMATE CALORIES based strictly on these Maritime Guidelines:\n{}\n\
        If an item is not listed, estimate using similar ingredients based on standard maritime serving sizes.",
        MARITIME_CALORIE_GUIDELINES
    )
}

const ROSTER_PROMPT: &str = "Extract crew roster information from this document image.";

/// Parses the model's answer, accepting a ```json fence around it.
pub fn parse_response<T: DeserializeOwned>(text: &str) -> Option<T> {
    #[dynamic]
    static FENCE: Regex = Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").unwrap();

    let body = match FENCE.captures(text) {
        Some(caps) => caps.get(1).map_or(text, |m| m.as_str()),
        None => text.trim(),
    };

    match serde_json::from_str(body) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("Extraction answer is not the expected JSON: {}", e);
            log::debug!("Raw answer: '{}'", text);
            None
        }
    }
}

fn first_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .find_map(|part| part.text)
}

pub struct Extractor {
    client: reqwest::Client,
    host: String,
    model: String,
    api_key: Option<String>,
}

impl Extractor {
    pub fn new(api_key: Option<String>, model: Option<String>, host: Option<String>) -> Extractor {
        Extractor {
            client: reqwest::Client::new(),
            host: host
                .unwrap_or_else(|| GEMINI_HOST.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| GEMINI_MODEL.to_string()),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    /// Extractor without an API key. Every call yields `None`.
    pub fn unconfigured() -> Extractor {
        Extractor::new(None, None, None)
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn analyze_menu(&self, image: &[u8]) -> Option<ExtractedMenu> {
        let text = self.generate(image, &menu_prompt(), menu_schema()).await?;
        parse_response(&text)
    }

    pub async fn analyze_roster(&self, image: &[u8]) -> Option<ExtractedRoster> {
        let text = self.generate(image, ROSTER_PROMPT, roster_schema()).await?;
        parse_response(&text)
    }

    async fn generate(&self, image: &[u8], prompt: &str, schema: Value) -> Option<String> {
        let Some(api_key) = &self.api_key else {
            log::warn!("Gemini API key is unconfigured, cannot analyze documents");
            return None;
        };

        let body = json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": "image/jpeg", "data": STANDARD.encode(image) } },
                    { "text": prompt }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        });

        log::info!(
            "Extraction query to {} ({} byte image)",
            self.model,
            image.len()
        );

        let res = self
            .client
            .post(format!("{}/models/{}:generateContent", self.host, self.model))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(e) => {
                log::warn!("Gemini API unavailable: {}", e);
                return None;
            }
        };

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            log::warn!("Gemini API returned {}: {}", status, detail);
            return None;
        }

        match res.json::<GenerateResponse>().await {
            Ok(parsed) => {
                let text = first_text(parsed);
                if text.is_none() {
                    log::warn!("Gemini API returned no candidates");
                }
                text
            }
            Err(e) => {
                log::warn!("Gemini API response unreadable: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MENU_ANSWER: &str = r#"{
        "meal_type": "Dinner",
        "items": [
            {
                "name": "Grilled Beef Steak",
                "category": "main",
                "estimated_calories": 650,
                "dietary_flags": {
                    "contains_pork": false,
                    "contains_beef": true,
                    "vegetarian": false,
                    "halal_compliant": false
                }
            }
        ]
    }"#;

    #[test]
    fn plain_json_answer() {
        let menu: ExtractedMenu = parse_response(MENU_ANSWER).unwrap();
        assert_eq!(menu.meal_type, Some(MealType::Dinner));
        assert_eq!(menu.items[0].category, Category::Main);
        assert!(menu.items[0].dietary_flags.contains_beef);
        // omitted by the schema's required list
        assert!(!menu.items[0].dietary_flags.contains_shellfish);
    }

    #[test]
    fn fenced_answer() {
        let fenced = format!("```json\n{}\n```\n", MENU_ANSWER);
        let menu: ExtractedMenu = parse_response(&fenced).unwrap();
        assert_eq!(menu.items.len(), 1);
    }

    #[test]
    fn roster_with_missing_ids() {
        let roster: ExtractedRoster = parse_response(
            r#"{"crew_members": [
                {"name": "Juan Dela Cruz", "rank": "OS", "crew_id": "P1234567"},
                {"name": "Ivan Petrov", "rank": "3/E", "nationality": "Bulgarian"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(roster.crew_members[0].crew_id.as_deref(), Some("P1234567"));
        assert!(roster.crew_members[1].crew_id.is_none());
    }

    #[test]
    fn garbage_is_no_result() {
        assert!(parse_response::<ExtractedRoster>("I could not read the image.").is_none());
        assert!(parse_response::<ExtractedMenu>(r#"{"meal_type": "Brunch", "items": []}"#).is_none());
    }

    #[test]
    fn candidate_text_is_picked() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{}"}], "role": "model"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_text(response).as_deref(), Some("{}"));

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(first_text(empty).is_none());
    }

    #[tokio::test]
    async fn unconfigured_extractor_yields_nothing() {
        let extractor = Extractor::new(Some("  ".into()), None, None);
        assert!(!extractor.is_configured());
        assert!(extractor.analyze_menu(b"\xff\xd8").await.is_none());
    }
}
