//! Classifier output and the prediction response body.

use serde::{Deserialize, Serialize};

use crate::models::food::FoodInfo;

/// Ranked answer from the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Most likely label
    pub label: String,

    /// Probability of `label` in percent (0-100)
    pub confidence: f64,

    /// Next most likely labels, best first
    pub alternatives: Vec<String>,
}

/// One scored label as returned by the inference endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    pub probability: f64,
}

/// Body returned by the inference endpoint.
///
/// ```json
/// { "predictions": [ { "label": "pho", "probability": 0.93 } ] }
/// ```
#[derive(Debug, Deserialize)]
pub struct InferenceResponse {
    pub predictions: Vec<ScoredLabel>,
}

/// Response body for `POST /api/predict`.
///
/// ```json
/// {
///   "success": true,
///   "food_name": "pho",
///   "confidence": 93.1,
///   "food_info": { "name": "pho", "region": "north", ... },
///   "related": ["bun_bo_hue", "hu_tieu", "mi_quang"]
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub food_name: String,
    pub confidence: f64,
    pub food_info: FoodInfo,

    /// Runner-up labels from the classifier
    pub related: Vec<String>,
}
