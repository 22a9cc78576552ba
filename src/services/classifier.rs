//! Classification backend.
//!
//! The model itself runs out of process. [`Classifier`] is the seam the
//! prediction pipeline talks to; [`HttpClassifier`] binds it to an inference
//! endpoint that accepts a JPEG body and answers with scored labels.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::models::prediction::{Classification, InferenceResponse, ScoredLabel};
use crate::services::imaging::DecodedImage;

/// Classifier failures. Never shown to clients.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference endpoint returned no predictions")]
    NoPredictions,

    #[error("inference endpoint returned an invalid probability {0}")]
    InvalidProbability(f64),
}

/// Anything that can label a decoded image.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Rank labels for `image` and keep the best `top_k`.
    async fn classify(
        &self,
        image: &DecodedImage,
        top_k: usize,
    ) -> Result<Classification, ClassifierError>;
}

/// Client for a remote inference endpoint.
///
/// Holds one connection pool for the lifetime of the process.
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClassifierError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        image: &DecodedImage,
        top_k: usize,
    ) -> Result<Classification, ClassifierError> {
        let response: InferenceResponse = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "image/jpeg")
            .body(image.jpeg.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(
            candidates = response.predictions.len(),
            width = image.width(),
            height = image.height(),
            "inference response received"
        );
        rank(response.predictions, top_k)
    }
}

/// Sort scored labels best first and fold the top `top_k` into a
/// [`Classification`]. Confidence is reported in percent.
pub fn rank(mut scored: Vec<ScoredLabel>, top_k: usize) -> Result<Classification, ClassifierError> {
    if let Some(bad) = scored
        .iter()
        .find(|s| !(0.0..=1.0).contains(&s.probability))
    {
        return Err(ClassifierError::InvalidProbability(bad.probability));
    }

    scored.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    scored.truncate(top_k.max(1));

    let mut ranked = scored.into_iter();
    let best = ranked.next().ok_or(ClassifierError::NoPredictions)?;

    Ok(Classification {
        label: best.label,
        confidence: best.probability * 100.0,
        alternatives: ranked.map(|s| s.label).collect(),
    })
}
