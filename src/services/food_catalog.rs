//! Food metadata catalog.
//!
//! Loaded once at startup from the food database file and shared read-only.
//! Entries keep the order they have in the file, which is also the order
//! search results are returned in.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserializer;
use serde::de::{self, MapAccess, Visitor};

use crate::error::{AppError, AppResult};
use crate::models::food::{
    FoodEntry, FoodInfo, FoodListing, Language, Pagination, Region, SearchQuery,
};

const MAX_PER_PAGE: usize = 100;

/// Startup failures while loading the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("cannot read food database {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid food database: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("food database is empty")]
    Empty,
}

#[derive(Debug)]
pub struct FoodCatalog {
    entries: Vec<(String, FoodEntry)>,
}

/// Deserializes a JSON object into key/value pairs in document order,
/// rejecting duplicate keys.
struct OrderedEntries;

impl<'de> Visitor<'de> for OrderedEntries {
    type Value = Vec<(String, FoodEntry)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping food labels to food entries")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));

        while let Some(key) = map.next_key::<String>()? {
            if !seen.insert(key.clone()) {
                return Err(de::Error::custom(format!("duplicate food label '{key}'")));
            }
            let entry: FoodEntry = map.next_value()?;
            entries.push((key, entry));
        }
        Ok(entries)
    }
}

impl FoodCatalog {
    /// Load and validate the catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let mut de = serde_json::Deserializer::from_str(raw);
        let entries = (&mut de).deserialize_map(OrderedEntries)?;
        de.end()?;

        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Localized metadata for `name`, or `None` if the label is unknown.
    pub fn lookup(&self, name: &str, lang: Language) -> Option<FoodInfo> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(key, entry)| localize(key, entry, lang))
    }

    /// Filter, then paginate.
    ///
    /// The region filter runs first; then the case-insensitive search term
    /// must occur in the label or the localized description. `page` is
    /// clamped into `1..=total_pages`.
    pub fn search(&self, query: &SearchQuery) -> AppResult<(Vec<FoodListing>, Pagination)> {
        let region = match query.region.as_deref().map(str::trim) {
            None | Some("") | Some("all") => None,
            Some(value) => Some(value.parse::<Region>().map_err(AppError::Validation)?),
        };
        let term = query.search.trim().to_lowercase();
        let per_page = query.per_page.clamp(1, MAX_PER_PAGE);

        let matches: Vec<FoodListing> = self
            .entries
            .iter()
            .filter(|(_, entry)| region.is_none_or(|r| entry.region == r))
            .map(|(key, entry)| FoodListing {
                id: key.clone(),
                info: localize(key, entry, query.lang),
            })
            .filter(|listing| {
                term.is_empty()
                    || listing.id.to_lowercase().contains(&term)
                    || listing.info.description.to_lowercase().contains(&term)
            })
            .collect();

        let total = matches.len();
        let total_pages = total.div_ceil(per_page).max(1);
        let page = query.page.clamp(1, total_pages);

        let foods = matches
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();

        Ok((
            foods,
            Pagination {
                page,
                per_page,
                total,
                total_pages,
                has_next: page < total_pages,
                has_prev: page > 1,
            },
        ))
    }
}

fn localize(key: &str, entry: &FoodEntry, lang: Language) -> FoodInfo {
    match lang {
        Language::Vn => FoodInfo {
            name: key.to_string(),
            region: entry.region,
            description: entry.description_vn.clone(),
            ingredients: entry.ingredients_vn.clone(),
            related: entry.related.clone(),
        },
        Language::En => FoodInfo {
            name: entry.name_en.clone().unwrap_or_else(|| key.to_string()),
            region: entry.region,
            description: entry
                .description_en
                .clone()
                .unwrap_or_else(|| entry.description_vn.clone()),
            ingredients: entry
                .ingredients_en
                .clone()
                .unwrap_or_else(|| entry.ingredients_vn.clone()),
            related: entry.related.clone(),
        },
    }
}
