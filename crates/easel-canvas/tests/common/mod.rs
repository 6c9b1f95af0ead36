//! Scripted capability doubles shared by the orchestrator tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

use easel_canvas::{
    CanvasConfig, CanvasEvent, CanvasOrchestrator, EntityId, Error, GeneratedImage, IdGenerator,
    ImageGenerator, ImageStore, Result, SaveRequest, SavedImage, VariationResult,
};

/// Generator answering from scripted queues.
///
/// When gated, every call waits for [`MockGenerator::release`] before
/// answering. `started` is notified as each call begins.
pub struct MockGenerator {
    images: Mutex<VecDeque<Result<GeneratedImage>>>,
    variations: Mutex<VecDeque<Vec<VariationResult>>>,
    gate: Option<Semaphore>,
    pub started: Notify,
    pub image_calls: AtomicUsize,
    pub variation_calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            images: Mutex::new(VecDeque::new()),
            variations: Mutex::new(VecDeque::new()),
            gate: None,
            started: Notify::new(),
            image_calls: AtomicUsize::new(0),
            variation_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub fn with_image(self, result: Result<GeneratedImage>) -> Self {
        self.images.lock().unwrap().push_back(result);
        self
    }

    pub fn with_variations(self, results: Vec<VariationResult>) -> Self {
        self.variations.lock().unwrap().push_back(results);
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    async fn wait_gate(&self) {
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl ImageGenerator for MockGenerator {
    async fn generate_image(&self, prompt: &str, _size: u32) -> Result<GeneratedImage> {
        let n = self.image_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.wait_gate().await;
        self.images
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(GeneratedImage::new(
                    format!("gen-{n}"),
                    format!("https://img.test/gen-{n}.png"),
                    prompt,
                ))
            })
    }

    async fn generate_variations(
        &self,
        prompt: &str,
        _parent_id: &EntityId,
        _size: u32,
    ) -> Vec<VariationResult> {
        self.variation_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        self.variations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                (0..4)
                    .map(|i| {
                        VariationResult::success(GeneratedImage::new(
                            format!("var-{i}"),
                            format!("https://img.test/var-{i}.png"),
                            format!("{prompt}, variant {i}"),
                        ))
                    })
                    .collect()
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// In-memory store, newest first
#[derive(Default)]
pub struct MockStore {
    saved: Mutex<Vec<SavedImage>>,
    pub fail_saves: AtomicBool,
}

impl MockStore {
    pub fn with_saved(saved: Vec<SavedImage>) -> Self {
        Self {
            saved: Mutex::new(saved),
            fail_saves: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ImageStore for MockStore {
    async fn save_image(&self, request: SaveRequest) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::upstream("disk full"));
        }
        let mut saved = self.saved.lock().unwrap();
        saved.retain(|s| s.id != request.id);
        saved.insert(
            0,
            SavedImage {
                url: format!("/media/{}.png", request.id),
                id: request.id,
                prompt: request.prompt,
            },
        );
        Ok(())
    }

    async fn list_saved_images(&self) -> Vec<SavedImage> {
        self.saved.lock().unwrap().clone()
    }
}

/// Id generator handing out scripted ids
pub struct ScriptedIds(Mutex<VecDeque<Result<EntityId>>>);

impl ScriptedIds {
    pub fn new(ids: impl IntoIterator<Item = Result<EntityId>>) -> Self {
        Self(Mutex::new(ids.into_iter().collect()))
    }
}

#[async_trait]
impl IdGenerator for ScriptedIds {
    async fn new_id(&self) -> Result<EntityId> {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::IdGeneration("exhausted".to_string())))
    }
}

pub fn saved(id: &str, prompt: &str) -> SavedImage {
    SavedImage {
        id: EntityId::from(id),
        prompt: prompt.to_string(),
        url: format!("/media/{id}.png"),
    }
}

pub fn orchestrator(generator: Arc<MockGenerator>, store: Arc<MockStore>) -> CanvasOrchestrator {
    CanvasOrchestrator::new(CanvasConfig::default(), generator, store)
}

/// Wait for the first event matching `pred`
pub async fn wait_for(
    events: &mut tokio::sync::broadcast::Receiver<CanvasEvent>,
    pred: impl Fn(&CanvasEvent) -> bool,
) -> CanvasEvent {
    loop {
        let event = events.recv().await.unwrap();
        if pred(&event) {
            return event;
        }
    }
}
