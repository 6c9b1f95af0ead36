//! In-memory capabilities for exercising the HTTP and WebSocket surface

use async_trait::async_trait;
use easel_canvas::{
    CanvasConfig, CanvasOrchestrator, EntityId, GeneratedImage, ImageGenerator, ImageStore,
    Result, SaveRequest, SavedImage, VariationResult, VARIATION_SLOTS,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Generator that always succeeds
#[derive(Default)]
pub struct StubGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl ImageGenerator for StubGenerator {
    async fn generate_image(&self, prompt: &str, _size: u32) -> Result<GeneratedImage> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedImage::new(
            format!("gen-{n}"),
            format!("https://img.test/gen-{n}.png"),
            prompt,
        ))
    }

    async fn generate_variations(
        &self,
        prompt: &str,
        _parent_id: &EntityId,
        _size: u32,
    ) -> Vec<VariationResult> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        (0..VARIATION_SLOTS)
            .map(|i| {
                VariationResult::success(GeneratedImage::new(
                    format!("var-{n}-{i}"),
                    format!("https://img.test/var-{n}-{i}.png"),
                    format!("{prompt} #{i}"),
                ))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Store keeping saved images in memory, newest first
#[derive(Clone, Default)]
pub struct StubStore {
    saved: Arc<Mutex<Vec<(SavedImage, String)>>>,
}

impl StubStore {
    /// Sources passed to `save_image`, newest first
    pub fn saved_sources(&self) -> Vec<String> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(_, src)| src.clone())
            .collect()
    }
}

#[async_trait]
impl ImageStore for StubStore {
    async fn save_image(&self, request: SaveRequest) -> Result<()> {
        let image = SavedImage {
            url: format!("/media/{}.png", request.id),
            id: request.id,
            prompt: request.prompt,
        };
        let mut saved = self.saved.lock().unwrap();
        saved.retain(|(existing, _)| existing.id != image.id);
        saved.insert(0, (image, request.src));
        Ok(())
    }

    async fn list_saved_images(&self) -> Vec<SavedImage> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(image, _)| image.clone())
            .collect()
    }
}

pub fn canvas(generator: StubGenerator, store: StubStore) -> Arc<CanvasOrchestrator> {
    Arc::new(CanvasOrchestrator::new(
        CanvasConfig::default(),
        Arc::new(generator),
        Arc::new(store),
    ))
}
