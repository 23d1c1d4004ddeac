//! Per-frame orchestration.
//!
//! A frame is rendered in two steps. [`RenderPipeline::begin_frame`] takes the current frame of
//! the [`SourceController`] and hands it to the face detector, which runs on its own thread.
//! [`RenderPipeline::finish_frame`] waits for the landmarks, draws the frame and the selected
//! effect onto the render canvas, and presents the result on the [`DisplaySurface`].
//!
//! Only one frame can be in flight at a time. If the source changes while a frame is in flight,
//! the frame is discarded when it finishes.

use std::sync::Arc;

use faceflap_image::{draw, Canvas, Color, Image, Resolution};

use crate::{
    detector::{DetectorWorker, FaceDetector, PendingDetection},
    display::DisplaySurface,
    effect::{EffectController, EffectType},
    face::{ExtractorConfig, Face, FaceExtractor},
    flaps::FlapConfig,
    landmark::LandmarkGroups,
    notice::{NoticeKind, Notices},
    source::{SourceController, SourceMode},
    timer::{FpsCounter, Timer},
    Error, Result,
};

/// Configuration for a [`RenderPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    container: Resolution,
    effect: EffectType,
    extractor: ExtractorConfig,
    flaps: FlapConfig,
    debug_landmarks: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            container: Resolution::RES_720P,
            effect: EffectType::default(),
            extractor: ExtractorConfig::default(),
            flaps: FlapConfig::default(),
            debug_landmarks: false,
        }
    }
}

impl PipelineOptions {
    /// Sets the size of the container the display surface fits frames into.
    pub fn container(mut self, res: Resolution) -> Self {
        self.container = res;
        self
    }

    /// Sets the initially selected effect.
    pub fn effect(mut self, effect: EffectType) -> Self {
        self.effect = effect;
        self
    }

    pub fn extractor(mut self, config: ExtractorConfig) -> Self {
        self.extractor = config;
        self
    }

    pub fn flaps(mut self, config: FlapConfig) -> Self {
        self.flaps = config;
        self
    }

    /// Draws the detected landmarks on top of the effect.
    pub fn debug_landmarks(mut self, enable: bool) -> Self {
        self.debug_landmarks = enable;
        self
    }
}

/// What happened to a frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// The frame was drawn and presented. `face` is the face the effect was drawn for, if any.
    Drawn { face: Option<Face> },
    /// The source changed while the frame was in flight, so it was discarded.
    Stale,
}

struct InFlight {
    frame: Arc<Image>,
    generation: u64,
    mode: SourceMode,
    detection: Option<PendingDetection>,
}

/// Renders frames from a [`SourceController`] with the selected effect.
pub struct RenderPipeline {
    canvas: Canvas,
    display: DisplaySurface,
    effects: EffectController,
    extractor: FaceExtractor,
    detector: Option<DetectorWorker>,
    notices: Notices,
    options: PipelineOptions,
    in_flight: Option<InFlight>,
    fps: FpsCounter,
    t_detect: Timer,
    t_draw: Timer,
    t_present: Timer,
}

impl RenderPipeline {
    /// Creates a pipeline without a face detector.
    ///
    /// Until [`RenderPipeline::attach_detector`] succeeds, effects that need landmarks are replaced
    /// with the unmodified frame.
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            canvas: Canvas::new(0, 0),
            display: DisplaySurface::new(options.container),
            effects: EffectController::new(options.effect),
            extractor: FaceExtractor::new(options.extractor),
            detector: None,
            notices: Notices::new(),
            options,
            in_flight: None,
            fps: FpsCounter::new("render"),
            t_detect: Timer::new("detect"),
            t_draw: Timer::new("draw"),
            t_present: Timer::new("present"),
        }
    }

    /// Initializes `detector` and starts using it for effects that need landmarks.
    ///
    /// # Errors
    ///
    /// If the detector can not be initialized, [`Error::DetectionUnavailable`] is returned and
    /// reported as a notice. The pipeline keeps working without the effect.
    pub fn attach_detector<D: FaceDetector>(&mut self, detector: D) -> Result<()> {
        match DetectorWorker::spawn(detector) {
            Ok(worker) => {
                self.detector = Some(worker);
                self.effects.init_face_flaps(self.options.flaps);
                self.notices.dismiss(NoticeKind::DetectionUnavailable);
                Ok(())
            }
            Err(e) => {
                log::error!("{e}");
                self.notices.report(&e);
                Err(e)
            }
        }
    }

    pub fn effects(&self) -> &EffectController {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectController {
        &mut self.effects
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut Notices {
        &mut self.notices
    }

    /// Returns the canvas the last frame was rendered to, at source resolution.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn display(&self) -> &DisplaySurface {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut DisplaySurface {
        &mut self.display
    }

    pub fn is_frame_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts processing the current frame of `sources`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameInFlight`] if the previous frame has not been finished.
    pub fn begin_frame(&mut self, sources: &SourceController) -> Result<()> {
        if self.in_flight.is_some() {
            return Err(Error::FrameInFlight);
        }

        let frame = Arc::new(sources.current_frame().clone());
        let detection = match &mut self.detector {
            Some(detector) if self.effects.current().needs_landmarks() => {
                Some(detector.submit(frame.clone()))
            }
            _ => None,
        };
        self.in_flight = Some(InFlight {
            frame,
            generation: sources.generation(),
            mode: sources.mode(),
            detection,
        });
        Ok(())
    }

    /// Finishes the frame started by [`RenderPipeline::begin_frame`].
    ///
    /// Per-frame problems (no face, malformed landmarks) only cause the effect to be skipped. If
    /// no frame is in flight, this returns [`FrameOutcome::Stale`].
    pub fn finish_frame(&mut self, sources: &SourceController) -> Result<FrameOutcome> {
        let Some(InFlight {
            frame,
            generation,
            mode,
            detection,
        }) = self.in_flight.take()
        else {
            log::warn!("`finish_frame` called without a frame in flight");
            return Ok(FrameOutcome::Stale);
        };

        let landmarks = match detection {
            Some(pending) => match self.t_detect.time(|| pending.wait()) {
                Ok(landmarks) => landmarks,
                Err(e) => {
                    self.detection_failed(e);
                    None
                }
            },
            None => None,
        };

        if sources.generation() != generation {
            log::debug!(
                "discarding frame of generation {} (now {})",
                generation,
                sources.generation()
            );
            return Ok(FrameOutcome::Stale);
        }

        let face = landmarks
            .as_ref()
            .and_then(|landmarks| match self.extractor.extract(landmarks) {
                Ok(face) => Some(face),
                Err(e) => {
                    log::warn!("{e}");
                    None
                }
            });
        self.update_face_notice(mode, face.is_some());

        let draw_guard = self.t_draw.start();
        self.canvas.resize(frame.resolution());
        self.canvas.clear(Color::NONE);
        self.canvas.draw_image(&frame, 0.0, 0.0);
        self.effects
            .current()
            .draw(&mut self.canvas, face.as_ref(), &frame);
        if self.options.debug_landmarks {
            if let Some(landmarks) = &landmarks {
                draw_landmarks(self.canvas.image_mut(), landmarks);
            }
        }
        drop(draw_guard);

        self.t_present.time(|| {
            self.display.present(self.canvas.image());
            self.notices.draw(self.display.image_mut());
        });

        self.fps
            .tick_with([&self.t_detect, &self.t_draw, &self.t_present]);
        Ok(FrameOutcome::Drawn { face })
    }

    /// Renders the current frame of `sources`.
    pub fn render_frame(&mut self, sources: &SourceController) -> Result<FrameOutcome> {
        self.begin_frame(sources)?;
        self.finish_frame(sources)
    }

    fn detection_failed(&mut self, error: Error) {
        match error {
            Error::DetectionUnavailable(_) => {
                log::error!("{error}; continuing without face detection");
                self.detector = None;
                self.notices.report(&error);
            }
            e => log::warn!("face detection failed: {e}"),
        }
    }

    /// In still modes, tells the user when there is no face to apply the effect to.
    fn update_face_notice(&mut self, mode: SourceMode, found: bool) {
        let wants_face = self.detector.is_some() && self.effects.current().needs_landmarks();
        if wants_face && !found && mode != SourceMode::Camera {
            self.notices.report(&Error::NoFaceDetected);
        } else {
            self.notices.dismiss(NoticeKind::NoFace);
        }
    }
}

/// Visualizes landmark groups.
fn draw_landmarks(image: &mut Image, landmarks: &LandmarkGroups) {
    for (name, points) in landmarks.groups() {
        let closed = matches!(name, "left eye" | "right eye" | "mouth");
        draw::polyline(image, points.iter().copied())
            .color(Color::CYAN)
            .closed(closed);
        for p in points {
            draw::marker(image, *p)
                .color(Color::MAGENTA)
                .size(3);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        detector::StaticLandmarks,
        source::{Camera, SourceController},
        test,
    };

    use super::*;

    struct FrameCamera;

    impl Camera for FrameCamera {
        fn resolution(&self) -> Resolution {
            Resolution::new(400, 400)
        }

        fn play(&mut self) {}

        fn pause(&mut self) {}

        fn read(&mut self) -> Result<Image> {
            Ok(test::frame())
        }

        fn release(&mut self) {}
    }

    fn sources() -> SourceController {
        let mut sources = SourceController::new(|| Ok(Box::new(FrameCamera) as Box<dyn Camera>));
        sources.switch_to_camera().unwrap();
        sources.advance().unwrap();
        sources
    }

    fn pipeline(detector: StaticLandmarks) -> RenderPipeline {
        let mut pipeline =
            RenderPipeline::new(PipelineOptions::default().container(Resolution::new(200, 200)));
        pipeline.attach_detector(detector).unwrap();
        pipeline
    }

    #[test]
    fn draws_face_flaps() {
        let sources = sources();
        let mut pipeline = pipeline(StaticLandmarks::new(test::face()));

        let FrameOutcome::Drawn { face } = pipeline.render_frame(&sources).unwrap() else {
            panic!("frame was discarded");
        };
        assert!(face.is_some());

        let out = pipeline.canvas().image();
        assert_eq!(out.resolution(), Resolution::new(400, 400));
        assert_eq!(out.get(200, 118), Color::RED);
        assert_eq!(out.get(5, 5), Color::BLUE);
        assert_eq!(pipeline.canvas().depth(), 0);

        assert_eq!(
            pipeline.display().image().resolution(),
            Resolution::new(200, 200)
        );
    }

    #[test]
    fn without_detector_frame_is_unmodified() {
        let sources = sources();
        let mut pipeline = RenderPipeline::new(PipelineOptions::default());
        let FrameOutcome::Drawn { face } = pipeline.render_frame(&sources).unwrap() else {
            panic!("frame was discarded");
        };
        assert!(face.is_none());
        assert_eq!(pipeline.canvas().image(), &test::frame());
    }

    #[test]
    fn one_frame_in_flight() {
        let sources = sources();
        let mut pipeline = pipeline(StaticLandmarks::new(test::face()));
        pipeline.begin_frame(&sources).unwrap();
        assert!(matches!(
            pipeline.begin_frame(&sources),
            Err(Error::FrameInFlight)
        ));
        assert!(pipeline.is_frame_in_flight());
        pipeline.finish_frame(&sources).unwrap();
        assert!(!pipeline.is_frame_in_flight());
    }

    #[test]
    fn stale_frames_are_discarded() {
        let mut sources = sources();
        let mut pipeline = pipeline(StaticLandmarks::new(test::face()));
        pipeline.begin_frame(&sources).unwrap();
        sources.capture_frame().unwrap();
        assert!(matches!(
            pipeline.finish_frame(&sources).unwrap(),
            FrameOutcome::Stale
        ));
        // Nothing was drawn.
        assert!(pipeline.canvas().image().is_empty());
    }

    #[test]
    fn no_face_in_still() {
        let mut sources = sources();
        let mut pipeline = pipeline(StaticLandmarks::empty());

        pipeline.render_frame(&sources).unwrap();
        assert!(!pipeline.notices().is_active(NoticeKind::NoFace));

        sources.capture_frame().unwrap();
        pipeline.render_frame(&sources).unwrap();
        assert!(pipeline.notices().is_active(NoticeKind::NoFace));
        assert_eq!(pipeline.canvas().image(), &test::frame());
    }

    #[test]
    fn debug_overlay() {
        let sources = sources();
        let mut pipeline = RenderPipeline::new(
            PipelineOptions::default()
                .effect(EffectType::None)
                .debug_landmarks(true),
        );
        pipeline
            .attach_detector(StaticLandmarks::new(test::face()))
            .unwrap();
        pipeline.render_frame(&sources).unwrap();
        // The no-op effect doesn't need landmarks, so none are drawn.
        assert_eq!(pipeline.canvas().image(), &test::frame());

        pipeline.effects_mut().switch_to(EffectType::Flaps);
        pipeline.render_frame(&sources).unwrap();
        assert_eq!(pipeline.canvas().image().get(100, 150), Color::MAGENTA);
    }
}
