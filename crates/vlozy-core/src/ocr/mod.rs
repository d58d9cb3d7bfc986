//! Region recognition: the OCR capability and the adapter around it.
//!
//! The recognition engine is an opaque capability ([`TextRecognizer`]).
//! A process builds one [`SharedRecognizer`], which constructs the engine
//! lazily on first use and serializes calls so that at most one
//! recognition runs at a time. The [`RecognitionAdapter`] feeds it cropped
//! regions and normalizes the returned fragments into a single string.

pub mod normalize;
mod region;

#[cfg(feature = "native")]
mod pure_engine;

pub use normalize::{join_fragments, normalize_fragments, repair_decimal_separator};
pub use region::RegionExtractor;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use std::sync::Arc;
use std::time::Instant;

use image::{DynamicImage, GrayImage};
use parking_lot::Mutex;
use tracing::{info, trace, warn};

use crate::error::OcrError;

/// An OCR engine: given a raster image, returns text fragments in reading order.
pub trait TextRecognizer: Send {
    /// Engine identifier, used in logs.
    fn name(&self) -> &str;

    /// Recognize the text in `image`.
    fn recognize(&mut self, image: &DynamicImage) -> Result<Vec<String>, OcrError>;
}

type EngineFactory = Box<dyn FnOnce() -> Result<Box<dyn TextRecognizer>, OcrError> + Send>;

enum EngineSlot {
    Pending(EngineFactory),
    Ready(Box<dyn TextRecognizer>),
    Failed(String),
}

/// Process-wide recognition engine, built once and used by one caller at a time.
pub struct SharedRecognizer {
    slot: Mutex<EngineSlot>,
}

impl SharedRecognizer {
    /// Defer engine construction until the first recognition request.
    ///
    /// If `factory` fails, every later call fails with
    /// [`OcrError::EngineUnavailable`] carrying the original message.
    pub fn lazy<F>(factory: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn TextRecognizer>, OcrError> + Send + 'static,
    {
        Self {
            slot: Mutex::new(EngineSlot::Pending(Box::new(factory))),
        }
    }

    /// Wrap an already constructed engine.
    pub fn from_engine<R: TextRecognizer + 'static>(engine: R) -> Self {
        Self {
            slot: Mutex::new(EngineSlot::Ready(Box::new(engine))),
        }
    }

    /// Whether construction has been attempted.
    pub fn is_initialized(&self) -> bool {
        !matches!(*self.slot.lock(), EngineSlot::Pending(_))
    }

    /// Run the engine on `image`, holding the engine lock for the whole call.
    pub fn recognize(&self, image: &DynamicImage) -> Result<Vec<String>, OcrError> {
        let mut slot = self.slot.lock();

        if matches!(*slot, EngineSlot::Pending(_)) {
            let pending = std::mem::replace(&mut *slot, EngineSlot::Failed(String::new()));
            if let EngineSlot::Pending(factory) = pending {
                *slot = initialize(factory);
            }
        }

        match &mut *slot {
            EngineSlot::Ready(engine) => engine.recognize(image),
            EngineSlot::Failed(reason) => Err(OcrError::EngineUnavailable(reason.clone())),
            EngineSlot::Pending(_) => Err(OcrError::EngineUnavailable(
                "engine was not initialized".to_string(),
            )),
        }
    }
}

fn initialize(factory: EngineFactory) -> EngineSlot {
    let start = Instant::now();
    match factory() {
        Ok(engine) => {
            info!(
                "Initialized recognition engine '{}' in {}ms",
                engine.name(),
                start.elapsed().as_millis()
            );
            EngineSlot::Ready(engine)
        }
        Err(e) => {
            warn!("Recognition engine failed to initialize: {}", e);
            EngineSlot::Failed(e.to_string())
        }
    }
}

/// Uniform recognition contract over the shared engine.
#[derive(Clone)]
pub struct RecognitionAdapter {
    engine: Arc<SharedRecognizer>,
}

impl RecognitionAdapter {
    pub fn new(engine: Arc<SharedRecognizer>) -> Self {
        Self { engine }
    }

    /// Recognize a prepared region and return normalized text.
    ///
    /// Takes ownership of the region so its buffer is released as soon as
    /// recognition completes.
    pub fn recognize(&self, region: GrayImage) -> Result<String, OcrError> {
        if region.width() == 0 || region.height() == 0 {
            return Err(OcrError::InvalidImage(format!(
                "empty region {}x{}",
                region.width(),
                region.height()
            )));
        }

        let image = DynamicImage::ImageLuma8(region);
        let fragments = self.engine.recognize(&image)?;
        trace!("Engine returned {} fragments", fragments.len());

        Ok(normalize_fragments(&fragments))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Returns the same fragments for every call.
    pub(crate) struct FixedRecognizer(pub Vec<&'static str>);

    impl TextRecognizer for FixedRecognizer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&mut self, _image: &DynamicImage) -> Result<Vec<String>, OcrError> {
            Ok(self.0.iter().map(|s| s.to_string()).collect())
        }
    }

    /// Records the widest concurrency it ever observed.
    struct OverlapCounter {
        in_flight: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
    }

    impl TextRecognizer for OverlapCounter {
        fn name(&self) -> &str {
            "overlap"
        }

        fn recognize(&mut self, _image: &DynamicImage) -> Result<Vec<String>, OcrError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    fn region() -> GrayImage {
        GrayImage::from_pixel(8, 8, image::Luma([255]))
    }

    #[test]
    fn test_adapter_joins_and_repairs() {
        let engine = Arc::new(SharedRecognizer::from_engine(FixedRecognizer(vec![
            "Total", "12", "34",
        ])));
        let adapter = RecognitionAdapter::new(engine);
        assert_eq!(adapter.recognize(region()).unwrap(), "Total 12.34");
    }

    #[test]
    fn test_lazy_factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let engine = SharedRecognizer::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FixedRecognizer(vec!["x"])) as Box<dyn TextRecognizer>)
        });

        assert!(!engine.is_initialized());
        let image = DynamicImage::ImageLuma8(region());
        engine.recognize(&image).unwrap();
        engine.recognize(&image).unwrap();

        assert!(engine.is_initialized());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_factory_reports_unavailable() {
        let engine = SharedRecognizer::lazy(|| Err(OcrError::ModelLoad("det.onnx missing".into())));
        let image = DynamicImage::ImageLuma8(region());

        for _ in 0..2 {
            match engine.recognize(&image) {
                Err(OcrError::EngineUnavailable(msg)) => assert!(msg.contains("det.onnx")),
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[test]
    fn test_empty_region_rejected() {
        let engine = Arc::new(SharedRecognizer::from_engine(FixedRecognizer(vec![])));
        let adapter = RecognitionAdapter::new(engine);
        assert!(matches!(
            adapter.recognize(GrayImage::new(0, 4)),
            Err(OcrError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_at_most_one_call_in_flight() {
        let max_seen = Arc::new(AtomicUsize::new(0));
        let engine = Arc::new(SharedRecognizer::from_engine(OverlapCounter {
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_seen: max_seen.clone(),
        }));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let adapter = RecognitionAdapter::new(engine.clone());
                std::thread::spawn(move || {
                    for _ in 0..3 {
                        adapter.recognize(region()).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
