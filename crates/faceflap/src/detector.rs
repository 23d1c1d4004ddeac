//! Face detection interface and the background detection worker.
//!
//! The landmark model itself is not part of this crate. Anything that can turn an [`Image`] into
//! [`LandmarkGroups`] can be plugged in by implementing [`FaceDetector`].

use std::{path::Path, sync::Arc};

use faceflap_image::Image;
use pawawwewism::{promise, Promise, PromiseHandle, Worker};

use crate::{
    landmark::LandmarkGroups,
    timer::{FpsCounter, Timer},
    Error, Result,
};

/// A single-face landmark detector.
pub trait FaceDetector: Send + 'static {
    /// Prepares the detector for use (for example, by loading model weights).
    ///
    /// Called once, before the first call to [`FaceDetector::detect`].
    fn init(&mut self) -> Result<()>;

    /// Detects the landmarks of the most prominent face in `image`.
    ///
    /// Returns `Ok(None)` if no face was found.
    fn detect(&mut self, image: &Image) -> Result<Option<LandmarkGroups>>;
}

/// A [`FaceDetector`] that reports the same landmarks for every image.
///
/// Useful when the landmarks are known in advance, or were computed by an external tool.
#[derive(Debug, Clone)]
pub struct StaticLandmarks {
    landmarks: Option<LandmarkGroups>,
}

impl StaticLandmarks {
    pub fn new(landmarks: LandmarkGroups) -> Self {
        Self {
            landmarks: Some(landmarks),
        }
    }

    /// Creates a detector that never finds a face.
    pub fn empty() -> Self {
        Self { landmarks: None }
    }

    /// Loads landmarks from a JSON file (see [`LandmarkGroups::from_json`]).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        LandmarkGroups::load(path).map(Self::new)
    }
}

impl FaceDetector for StaticLandmarks {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn detect(&mut self, _image: &Image) -> Result<Option<LandmarkGroups>> {
        Ok(self.landmarks.clone())
    }
}

struct DetectionJob {
    image: Arc<Image>,
    landmarks: Promise<Result<Option<LandmarkGroups>>>,
}

/// Runs a [`FaceDetector`] on a background thread.
pub struct DetectorWorker {
    worker: Worker<DetectionJob>,
}

impl DetectorWorker {
    /// Initializes `detector` and moves it to a new worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DetectionUnavailable`] if the detector fails to initialize or the thread
    /// can not be spawned.
    pub fn spawn<D: FaceDetector>(mut detector: D) -> Result<Self> {
        detector.init().map_err(|e| match e {
            Error::DetectionUnavailable(_) => e,
            e => Error::DetectionUnavailable(e.to_string()),
        })?;

        let t_detect = Timer::new("detect");
        let mut fps = FpsCounter::new("face detector");
        let worker = Worker::builder()
            .name("face detector")
            .spawn(move |DetectionJob { image, landmarks }| {
                let result = t_detect.time(|| detector.detect(&image));
                if let Err(e) = &result {
                    log::warn!("face detection failed: {e}");
                }
                landmarks.fulfill(result);
                fps.tick_with([&t_detect]);
            })
            .map_err(|e| Error::DetectionUnavailable(format!("failed to spawn worker: {e}")))?;

        Ok(Self { worker })
    }

    /// Submits an image for detection.
    ///
    /// Blocks until the worker has finished the previous job.
    pub fn submit(&mut self, image: Arc<Image>) -> PendingDetection {
        let (landmarks, handle) = promise();
        self.worker.send(DetectionJob { image, landmarks });
        PendingDetection { handle }
    }
}

/// A detection result that will become available later.
pub struct PendingDetection {
    handle: PromiseHandle<Result<Option<LandmarkGroups>>>,
}

impl PendingDetection {
    /// Blocks until the detection has finished.
    pub fn wait(self) -> Result<Option<LandmarkGroups>> {
        match self.handle.block() {
            Ok(result) => result,
            Err(_) => Err(Error::DetectionUnavailable(
                "face detector worker has stopped".into(),
            )),
        }
    }
}
