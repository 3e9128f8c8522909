use crate::{
    clients::ImageService,
    error::GenerationError,
    logger,
    models::{
        Dish, GenerationParams, ImageOutcome, ImagePreset, ImageRequest, ImageResult, MAX_DISHES,
    },
};
use std::sync::Arc;
use std::time::Duration;

/// Pause between consecutive image calls, a courtesy to the upstream rate limit.
pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_secs(1);

/// Draws one picture per dish, one call at a time.
///
/// A failure on a single dish is recorded in its slot and never aborts the
/// batch; the only batch-level errors are an empty input and a missing backend.
#[derive(Clone)]
pub struct ImageBatchGenerator {
    backend: Option<Arc<dyn ImageService>>,
    preset: ImagePreset,
    delay: Duration,
}

impl ImageBatchGenerator {
    pub fn new(backend: Option<Arc<dyn ImageService>>, preset: ImagePreset) -> Self {
        Self {
            backend,
            preset,
            delay: DEFAULT_ITEM_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn preset(&self) -> ImagePreset {
        self.preset
    }

    pub async fn generate(&self, dishes: &[Dish]) -> Result<ImageResult, GenerationError> {
        if dishes.is_empty() {
            return Err(GenerationError::InvalidInput);
        }
        let backend = self
            .backend
            .as_deref()
            .ok_or(GenerationError::BackendUnavailable)?;

        let batch = &dishes[..dishes.len().min(MAX_DISHES)];
        let params = self.preset.params();
        let mut results = Vec::with_capacity(batch.len());

        for (index, dish) in batch.iter().enumerate() {
            let outcome = self.generate_one(backend, dish, &params).await;
            if let ImageOutcome::Failed(reason) = &outcome {
                log::error!("Error generating image for {:?}: {}", dish.name, reason);
            }
            results.push(outcome);

            if index + 1 < batch.len() && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        let ready = results.iter().filter(|r| r.is_ready()).count();
        log::info!("Generated {}/{} dish images", ready, results.len());
        Ok(results)
    }

    async fn generate_one(
        &self,
        backend: &dyn ImageService,
        dish: &Dish,
        params: &GenerationParams,
    ) -> ImageOutcome {
        if dish.name.trim().is_empty() {
            return ImageOutcome::Failed("dish has no name".into());
        }

        let request = ImageRequest {
            prompt: self.preset.prompt_for(dish),
            params: params.clone(),
        };

        let _timer = logger::timer(&format!("image for {}", dish.name));
        match backend.generate(&request).await {
            Ok(urls) => match urls.into_iter().next() {
                Some(url) => ImageOutcome::Ready(url),
                None => ImageOutcome::Failed("image service returned no URLs".into()),
            },
            Err(e) => ImageOutcome::Failed(e.to_string()),
        }
    }
}
