use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    /// Serving window shown to the crew.
    pub fn timing(self) -> &'static str {
        match self {
            MealType::Breakfast => "0630 to 0800",
            MealType::Lunch => "1130 to 1230",
            MealType::Dinner => "1830 to 1930",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
        }
    }

    pub fn parse(s: &str) -> Option<MealType> {
        match s.to_ascii_lowercase().as_str() {
            "breakfast" => Some(MealType::Breakfast),
            "lunch" => Some(MealType::Lunch),
            "dinner" => Some(MealType::Dinner),
            _ => None,
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Main,
    Side,
    Dessert,
    Beverage,
    Fruit,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Main => "main",
            Category::Side => "side",
            Category::Dessert => "dessert",
            Category::Beverage => "beverage",
            Category::Fruit => "fruit",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        match s {
            "main" => Some(Category::Main),
            "side" => Some(Category::Side),
            "dessert" => Some(Category::Dessert),
            "beverage" => Some(Category::Beverage),
            "fruit" => Some(Category::Fruit),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DietaryFlags {
    #[serde(default)]
    pub contains_pork: bool,
    #[serde(default)]
    pub contains_beef: bool,
    #[serde(default)]
    pub contains_shellfish: bool,
    #[serde(default)]
    pub vegetarian: bool,
    #[serde(default)]
    pub halal_compliant: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub item_id: String,
    pub name: String,
    pub category: Category,
    pub estimated_calories: u32,
    pub dietary_flags: DietaryFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Menu {
    pub menu_id: String,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub items: Vec<MenuItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<MenuItem>,
}

impl Menu {
    pub fn total_calories(&self) -> u32 {
        self.items.iter().map(|item| item.estimated_calories).sum()
    }

    pub fn is_high_calorie(&self) -> bool {
        self.total_calories() > crate::constants::HIGH_CALORIE_THRESHOLD
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Delicious,
    Average,
    Bad,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Delicious => "delicious",
            Mood::Average => "average",
            Mood::Bad => "bad",
        }
    }

    pub fn parse(s: &str) -> Option<Mood> {
        match s {
            "delicious" => Some(Mood::Delicious),
            "average" => Some(Mood::Average),
            "bad" => Some(Mood::Bad),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Rating {
    pub rating_id: String,
    pub user_id: String,
    pub item_id: String,
    pub menu_id: String,
    pub stars: u8,
    pub emoji: Mood,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}
