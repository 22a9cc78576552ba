//! Typed food metadata.
//!
//! The food database is a JSON object keyed by classifier label. Each value is
//! a [`FoodEntry`] carrying Vietnamese text and optional English variants. The
//! schema is strict: unknown fields or an unknown region abort startup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Response language.
///
/// Vietnamese is the catalog's primary language; English fields fall back to
/// Vietnamese when a translation is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Language {
    #[default]
    Vn,
    En,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VN" | "VI" => Ok(Language::Vn),
            "EN" => Ok(Language::En),
            other => Err(format!("Unsupported language '{other}', expected VN or EN")),
        }
    }
}

/// Request-facing conversion: a blank value (`?lang=`) means the default.
impl TryFrom<String> for Language {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Ok(Language::default());
        }
        value.parse()
    }
}

/// Geographic origin of a dish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    North,
    Central,
    South,
    Nationwide,
}

impl Region {
    pub fn as_str(self) -> &'static str {
        match self {
            Region::North => "north",
            Region::Central => "central",
            Region::South => "south",
            Region::Nationwide => "nationwide",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north" => Ok(Region::North),
            "central" => Ok(Region::Central),
            "south" => Ok(Region::South),
            "nationwide" => Ok(Region::Nationwide),
            other => Err(format!(
                "Unknown region '{other}', expected all, north, central, south or nationwide"
            )),
        }
    }
}

/// One dish as stored in the food database file.
///
/// # JSON Example
///
/// ```json
/// "pho": {
///   "name_en": "Pho",
///   "region": "north",
///   "description_vn": "Món nước truyền thống...",
///   "description_en": "Traditional noodle soup...",
///   "ingredients_vn": "Bánh phở, thịt bò, hành",
///   "ingredients_en": "Rice noodles, beef, scallions",
///   "related": ["bun_bo_hue", "hu_tieu"]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FoodEntry {
    #[serde(default)]
    pub name_en: Option<String>,

    pub region: Region,

    pub description_vn: String,

    #[serde(default)]
    pub description_en: Option<String>,

    pub ingredients_vn: String,

    #[serde(default)]
    pub ingredients_en: Option<String>,

    #[serde(default)]
    pub related: Vec<String>,
}

/// Food metadata localized for one language, as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodInfo {
    pub name: String,
    pub region: Region,
    pub description: String,
    pub ingredients: String,
    pub related: Vec<String>,
}

/// A search hit: the catalog key plus the localized metadata.
#[derive(Debug, Clone, Serialize)]
pub struct FoodListing {
    pub id: String,

    #[serde(flatten)]
    pub info: FoodInfo,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    12
}

/// Query string for `GET /api/foods/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,

    /// `all` (or absent) disables the region filter
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default = "default_page")]
    pub page: usize,

    #[serde(default = "default_per_page")]
    pub per_page: usize,

    #[serde(default)]
    pub lang: Language,
}

/// Query string carrying only the response language.
#[derive(Debug, Deserialize)]
pub struct LanguageQuery {
    #[serde(default)]
    pub lang: Language,
}

/// Pagination block of a search response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Response body for `GET /api/foods/search`.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub foods: Vec<FoodListing>,
    pub pagination: Pagination,
}

/// Response body for `GET /api/food/{name}`.
#[derive(Debug, Serialize)]
pub struct FoodResponse {
    pub success: bool,
    pub food: FoodInfo,
}
