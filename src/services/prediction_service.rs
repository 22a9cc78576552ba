//! Classification pipeline.
//!
//! # Process
//!
//! 1. Decode the upload on the blocking pool
//! 2. Classify, bounded by the configured timeout (never retried)
//! 3. Look up the winning label in the food catalog
//! 4. For signed-in callers, append the result to their history
//!
//! History is only written once steps 2 and 3 succeed, and a failed append
//! never fails the prediction.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::food::Language;
use crate::models::prediction::PredictionResponse;
use crate::services::classifier::Classifier;
use crate::services::food_catalog::FoodCatalog;
use crate::services::history_store::HistoryStore;
use crate::services::imaging;

/// Number of ranked labels requested from the classifier.
pub const TOP_K: usize = 4;

pub struct PredictionService {
    classifier: Arc<dyn Classifier>,
    catalog: Arc<FoodCatalog>,
    history: Arc<HistoryStore>,
    timeout: Duration,
}

impl PredictionService {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        catalog: Arc<FoodCatalog>,
        history: Arc<HistoryStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            catalog,
            history,
            timeout,
        }
    }

    /// Classify `upload` and describe the result in `lang`.
    ///
    /// `username` is the resolved caller, `None` for anonymous requests.
    pub async fn predict(
        &self,
        upload: Bytes,
        lang: Language,
        username: Option<&str>,
    ) -> AppResult<PredictionResponse> {
        let image = imaging::decode_blocking(upload).await?;

        let classification =
            match tokio::time::timeout(self.timeout, self.classifier.classify(&image, TOP_K)).await
            {
                Ok(Ok(classification)) => classification,
                Ok(Err(e)) => return Err(AppError::ClassificationFailed(e.to_string())),
                Err(_) => {
                    return Err(AppError::ClassificationFailed(format!(
                        "classifier timed out after {:?}",
                        self.timeout
                    )));
                }
            };

        let food_info = self
            .catalog
            .lookup(&classification.label, lang)
            .ok_or_else(|| AppError::FoodInfoMissing(classification.label.clone()))?;

        if let Some(username) = username {
            let snapshot = image.snapshot_base64();
            if let Err(e) = self
                .history
                .append(
                    username,
                    &classification.label,
                    classification.confidence,
                    Some(snapshot),
                )
                .await
            {
                warn!(username = %username, error = %e, "failed to save prediction history");
            }
        }

        info!(
            food = %classification.label,
            confidence = classification.confidence,
            authenticated = username.is_some(),
            "prediction served"
        );

        Ok(PredictionResponse {
            success: true,
            food_name: classification.label,
            confidence: classification.confidence,
            food_info,
            related: classification.alternatives,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::models::prediction::Classification;
    use crate::services::classifier::ClassifierError;
    use crate::services::imaging::DecodedImage;
    use crate::services::imaging::tests::png_bytes;

    const CATALOG: &str = r#"{
        "pho": {
            "name_en": "Pho",
            "region": "north",
            "description_vn": "Món nước",
            "description_en": "Noodle soup",
            "ingredients_vn": "Bánh phở",
            "related": ["bun_cha"]
        }
    }"#;

    enum Behaviour {
        Answer(&'static str),
        Fail,
        Hang,
    }

    struct StubClassifier(Behaviour);

    #[async_trait]
    impl Classifier for StubClassifier {
        async fn classify(
            &self,
            _image: &DecodedImage,
            _top_k: usize,
        ) -> Result<Classification, ClassifierError> {
            match self.0 {
                Behaviour::Answer(label) => Ok(Classification {
                    label: label.to_string(),
                    confidence: 93.5,
                    alternatives: vec!["bun_cha".into(), "hu_tieu".into(), "mi_quang".into()],
                }),
                Behaviour::Fail => Err(ClassifierError::NoPredictions),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(ClassifierError::NoPredictions)
                }
            }
        }
    }

    fn build(dir: &tempfile::TempDir, behaviour: Behaviour) -> (PredictionService, Arc<HistoryStore>) {
        let history = Arc::new(HistoryStore::new(dir.path().join("history")));
        let service = PredictionService::new(
            Arc::new(StubClassifier(behaviour)),
            Arc::new(FoodCatalog::from_json(CATALOG).unwrap()),
            history.clone(),
            Duration::from_millis(50),
        );
        (service, history)
    }

    fn upload() -> Bytes {
        Bytes::from(png_bytes(8, 8))
    }

    #[tokio::test]
    async fn signed_in_prediction_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let (service, history) = build(&dir, Behaviour::Answer("pho"));

        let response = service
            .predict(upload(), Language::En, Some("alice"))
            .await
            .unwrap();
        assert_eq!(response.food_name, "pho");
        assert_eq!(response.food_info.name, "Pho");
        assert_eq!(response.related.len(), 3);

        let records = history.list_recent("alice", 10).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].food_name, "pho");
        assert!(records[0].image_base64.is_some());
    }

    #[tokio::test]
    async fn anonymous_prediction_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = build(&dir, Behaviour::Answer("pho"));

        service.predict(upload(), Language::Vn, None).await.unwrap();
        assert!(!dir.path().join("history").exists());
    }

    #[tokio::test]
    async fn undecodable_upload_is_invalid_image() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = build(&dir, Behaviour::Answer("pho"));

        let result = service
            .predict(Bytes::from_static(b"nope"), Language::Vn, Some("alice"))
            .await;
        assert!(matches!(result, Err(AppError::InvalidImage(_))));
    }

    #[tokio::test]
    async fn failures_write_no_history() {
        let dir = tempfile::tempdir().unwrap();

        for behaviour in [Behaviour::Fail, Behaviour::Hang] {
            let (service, history) = build(&dir, behaviour);
            let result = service.predict(upload(), Language::Vn, Some("alice")).await;
            assert!(matches!(result, Err(AppError::ClassificationFailed(_))));
            assert!(history.list_recent("alice", 10).await.is_empty());
        }

        let (service, history) = build(&dir, Behaviour::Answer("pizza"));
        let result = service.predict(upload(), Language::Vn, Some("alice")).await;
        assert!(matches!(result, Err(AppError::FoodInfoMissing(label)) if label == "pizza"));
        assert!(history.list_recent("alice", 10).await.is_empty());
    }
}
