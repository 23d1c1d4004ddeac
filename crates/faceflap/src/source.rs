//! Frame sources and the source mode state machine.
//!
//! A [`Source`] provides the frame that effects are drawn onto. The [`SourceController`] decides
//! which source is current: the live camera, a still captured from it, or an image loaded from
//! disk.

use std::{
    fmt, mem,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use faceflap_image::{Color, Image, Resolution};

use crate::{AcquisitionFailure, Error, Result};

/// A camera device.
///
/// Implementations do not need to guard against repeated calls to [`Camera::release`]; the
/// [`CameraSource`] owning the camera calls it exactly once.
pub trait Camera {
    /// Returns the resolution of the frames returned by [`Camera::read`].
    fn resolution(&self) -> Resolution;

    /// Resumes delivering frames.
    fn play(&mut self);

    /// Stops delivering frames. The device stays acquired.
    fn pause(&mut self);

    /// Reads the next frame, blocking until it is available.
    fn read(&mut self) -> Result<Image>;

    /// Releases the device so that other applications can use it.
    fn release(&mut self);
}

/// Opens the camera used by a [`SourceController`].
pub type CameraOpener = Box<dyn FnMut() -> Result<Box<dyn Camera>>>;

/// Counts acquisitions and releases of source resources.
#[derive(Debug, Default)]
pub struct ResourceStats {
    cameras_acquired: AtomicUsize,
    cameras_released: AtomicUsize,
    stills_captured: AtomicUsize,
    stills_released: AtomicUsize,
}

impl ResourceStats {
    pub fn cameras_acquired(&self) -> usize {
        self.cameras_acquired.load(Ordering::Relaxed)
    }

    pub fn cameras_released(&self) -> usize {
        self.cameras_released.load(Ordering::Relaxed)
    }

    pub fn stills_captured(&self) -> usize {
        self.stills_captured.load(Ordering::Relaxed)
    }

    pub fn stills_released(&self) -> usize {
        self.stills_released.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
enum ResourceKind {
    Camera,
    Still,
}

/// Records the acquisition of a resource and, once, its release.
#[derive(Debug)]
struct Lease {
    stats: Arc<ResourceStats>,
    kind: ResourceKind,
    released: bool,
}

impl Lease {
    fn acquire(stats: &Arc<ResourceStats>, kind: ResourceKind) -> Self {
        let counter = match kind {
            ResourceKind::Camera => &stats.cameras_acquired,
            ResourceKind::Still => &stats.stills_captured,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Self {
            stats: stats.clone(),
            kind,
            released: false,
        }
    }

    /// Marks the resource as released. Returns `false` if it already was.
    fn release(&mut self) -> bool {
        if mem::replace(&mut self.released, true) {
            return false;
        }
        let counter = match self.kind {
            ResourceKind::Camera => &self.stats.cameras_released,
            ResourceKind::Still => &self.stats.stills_released,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        true
    }
}

/// A live camera, along with its most recent frame.
///
/// The camera is released when [`CameraSource::release`] is called or when the source is
/// dropped, whichever happens first.
pub struct CameraSource {
    camera: Box<dyn Camera>,
    frame: Image,
    lease: Lease,
}

impl CameraSource {
    fn new(camera: Box<dyn Camera>, stats: &Arc<ResourceStats>) -> Self {
        let res = camera.resolution();
        Self {
            camera,
            frame: Image::filled(res.width(), res.height(), Color::BLACK),
            lease: Lease::acquire(stats, ResourceKind::Camera),
        }
    }

    pub fn frame(&self) -> &Image {
        &self.frame
    }

    pub fn resolution(&self) -> Resolution {
        self.frame.resolution()
    }

    /// Reads a new frame from the camera.
    ///
    /// On error, the previous frame is kept.
    pub fn update(&mut self) -> Result<()> {
        if self.lease.released {
            return Err(Error::acquisition(
                AcquisitionFailure::Other,
                "camera has been released",
            ));
        }
        self.frame = self.camera.read()?;
        Ok(())
    }

    fn play(&mut self) {
        if !self.lease.released {
            self.camera.play();
        }
    }

    fn pause(&mut self) {
        if !self.lease.released {
            self.camera.pause();
        }
    }

    /// Releases the camera. Does nothing if it was already released.
    pub fn release(&mut self) {
        if self.lease.release() {
            log::debug!("releasing camera");
            self.camera.release();
        }
    }

    pub fn is_released(&self) -> bool {
        self.lease.released
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for CameraSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraSource")
            .field("resolution", &self.resolution())
            .field("released", &self.lease.released)
            .finish()
    }
}

/// A still image: a captured camera frame, a loaded file, or the blank placeholder.
#[derive(Debug)]
pub struct ImageSource {
    image: Image,
    lease: Option<Lease>,
}

impl ImageSource {
    /// Creates an image source whose resources are not tracked.
    pub fn new(image: Image) -> Self {
        Self { image, lease: None }
    }

    fn tracked(image: Image, stats: &Arc<ResourceStats>) -> Self {
        Self {
            image,
            lease: Some(Lease::acquire(stats, ResourceKind::Still)),
        }
    }

    pub fn frame(&self) -> &Image {
        &self.image
    }

    pub fn resolution(&self) -> Resolution {
        self.image.resolution()
    }

    /// Frees the image data. Does nothing if it was already released.
    pub fn release(&mut self) {
        if let Some(lease) = &mut self.lease {
            if lease.release() {
                log::trace!("releasing still image ({})", self.image.resolution());
            }
        }
        self.image = Image::new(0, 0);
    }
}

impl Drop for ImageSource {
    fn drop(&mut self) {
        if let Some(lease) = &mut self.lease {
            lease.release();
        }
    }
}

/// The source of the frames effects are drawn onto.
#[derive(Debug)]
pub enum Source {
    Camera(CameraSource),
    Image(ImageSource),
    /// Placeholder shown while no other source is available.
    Blank(ImageSource),
}

impl Source {
    pub fn frame(&self) -> &Image {
        match self {
            Source::Camera(camera) => camera.frame(),
            Source::Image(image) | Source::Blank(image) => image.frame(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.frame().resolution()
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Source::Blank(_))
    }
}

/// Which kind of source the user has chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Live camera frames.
    Camera,
    /// A still frame captured from the camera.
    CameraFrame,
    /// An image loaded from disk.
    LocalImage,
}

/// Identifies the state of a [`SourceController`] at some point in time.
///
/// Work that started before a mode change (such as loading an image) can use a ticket to check
/// whether its result is still wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Owns the frame sources and switches between them.
///
/// Modes move from [`SourceMode::Camera`] to [`SourceMode::CameraFrame`] or
/// [`SourceMode::LocalImage`] and back. When a source stops being current, it is paused (camera)
/// or released (stills). A camera is acquired the first time it is needed and kept until
/// [`SourceController::reload_camera`] is called or the controller is dropped.
///
/// Every mode change increments the controller's *generation*.
pub struct SourceController {
    mode: SourceMode,
    current: Source,
    /// The camera, while another source is current.
    parked_camera: Option<CameraSource>,
    open_camera: CameraOpener,
    blank_resolution: Resolution,
    generation: u64,
    stats: Arc<ResourceStats>,
}

impl SourceController {
    /// Creates a controller showing a blank frame.
    ///
    /// `open_camera` is invoked whenever a camera needs to be acquired. Call
    /// [`SourceController::switch_to_camera`] to start it.
    pub fn new<F>(open_camera: F) -> Self
    where
        F: FnMut() -> Result<Box<dyn Camera>> + 'static,
    {
        let blank_resolution = Resolution::new(640, 480);
        Self {
            mode: SourceMode::Camera,
            current: blank(blank_resolution),
            parked_camera: None,
            open_camera: Box::new(open_camera),
            blank_resolution,
            generation: 0,
            stats: Arc::default(),
        }
    }

    /// Sets the size of the placeholder frame shown when no camera is available.
    pub fn with_blank_resolution(mut self, res: Resolution) -> Self {
        self.blank_resolution = res;
        if self.current.is_blank() {
            self.current = blank(res);
        }
        self
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    pub fn current(&self) -> &Source {
        &self.current
    }

    pub fn current_frame(&self) -> &Image {
        self.current.frame()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ticket(&self) -> Ticket {
        Ticket(self.generation)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    pub fn stats(&self) -> Arc<ResourceStats> {
        self.stats.clone()
    }

    /// Reads a new frame from the camera, if it is the current source.
    pub fn advance(&mut self) -> Result<()> {
        match &mut self.current {
            Source::Camera(camera) => camera.update(),
            Source::Image(_) | Source::Blank(_) => Ok(()),
        }
    }

    /// Switches to the live camera, acquiring it if necessary.
    ///
    /// # Errors
    ///
    /// If the camera can not be acquired, a [`Error::SourceAcquisition`] error is returned and a
    /// blank frame is shown instead.
    pub fn switch_to_camera(&mut self) -> Result<()> {
        if matches!(self.current, Source::Camera(_)) {
            return Ok(());
        }

        let camera = match self.parked_camera.take() {
            Some(camera) => camera,
            None => match self.acquire_camera() {
                Ok(camera) => camera,
                Err(e) => {
                    log::error!("{e}");
                    let blank = blank(self.blank_resolution);
                    self.transition(SourceMode::Camera, blank);
                    return Err(e);
                }
            },
        };
        self.transition(SourceMode::Camera, Source::Camera(camera));
        Ok(())
    }

    /// Freezes the most recent camera frame.
    pub fn capture_frame(&mut self) -> Result<()> {
        let Source::Camera(camera) = &self.current else {
            return Err(Error::acquisition(
                AcquisitionFailure::NoDevice,
                "no camera is active",
            ));
        };
        let still = ImageSource::tracked(camera.frame().clone(), &self.stats);
        self.transition(SourceMode::CameraFrame, Source::Image(still));
        Ok(())
    }

    /// Shows `image` instead of the camera.
    ///
    /// `ticket` should be obtained before the image started loading. If the controller changed
    /// modes since then, the image is dropped and `false` is returned.
    pub fn load_local_image(&mut self, ticket: Ticket, image: Image) -> bool {
        if !self.is_current(ticket) {
            log::debug!(
                "discarding image loaded for generation {}, now at {}",
                ticket.0,
                self.generation
            );
            return false;
        }
        let still = ImageSource::tracked(image, &self.stats);
        self.transition(SourceMode::LocalImage, Source::Image(still));
        true
    }

    /// Releases the camera and acquires it again.
    ///
    /// This is how the user recovers from a camera that was in use or inaccessible.
    pub fn reload_camera(&mut self) -> Result<()> {
        if let Some(mut camera) = self.parked_camera.take() {
            camera.release();
        }
        if matches!(self.current, Source::Camera(_)) {
            let blank = blank(self.blank_resolution);
            if let Source::Camera(mut camera) = mem::replace(&mut self.current, blank) {
                camera.release();
            }
        }
        self.switch_to_camera()
    }

    fn acquire_camera(&mut self) -> Result<CameraSource> {
        let camera = (self.open_camera)().map_err(|e| match e {
            Error::SourceAcquisition { .. } => e,
            Error::Io(io) => Error::acquisition(AcquisitionFailure::from_io(&io), io),
            e => Error::acquisition(AcquisitionFailure::Other, e),
        })?;
        log::info!("acquired camera ({})", camera.resolution());
        Ok(CameraSource::new(camera, &self.stats))
    }

    /// Replaces the current source, running the exit hook of the old source and the entry hook of
    /// the new one.
    fn transition(&mut self, mode: SourceMode, incoming: Source) {
        match mem::replace(&mut self.current, incoming) {
            Source::Camera(mut camera) => {
                camera.pause();
                self.parked_camera = Some(camera);
            }
            Source::Image(mut still) => still.release(),
            Source::Blank(_) => {}
        }
        if let Source::Camera(camera) = &mut self.current {
            camera.play();
        }

        self.generation += 1;
        log::debug!(
            "source mode {:?} -> {:?} (generation {})",
            self.mode,
            mode,
            self.generation
        );
        self.mode = mode;
    }
}

fn blank(res: Resolution) -> Source {
    Source::Blank(ImageSource::new(Image::filled(
        res.width(),
        res.height(),
        Color::BLACK,
    )))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Calls {
        play: usize,
        pause: usize,
        release: usize,
    }

    struct FakeCamera {
        calls: Arc<Mutex<Calls>>,
        next: u8,
    }

    impl Camera for FakeCamera {
        fn resolution(&self) -> Resolution {
            Resolution::new(4, 2)
        }

        fn play(&mut self) {
            self.calls.lock().unwrap().play += 1;
        }

        fn pause(&mut self) {
            self.calls.lock().unwrap().pause += 1;
        }

        fn read(&mut self) -> Result<Image> {
            self.next += 1;
            Ok(Image::filled(4, 2, Color::rgb(self.next, 0, 0)))
        }

        fn release(&mut self) {
            self.calls.lock().unwrap().release += 1;
        }
    }

    fn controller() -> (SourceController, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let c = calls.clone();
        let controller = SourceController::new(move || {
            Ok(Box::new(FakeCamera {
                calls: c.clone(),
                next: 0,
            }) as Box<dyn Camera>)
        });
        (controller, calls)
    }

    #[test]
    fn camera_frame_round_trip() {
        let (mut ctrl, calls) = controller();
        assert!(ctrl.current().is_blank());

        ctrl.switch_to_camera().unwrap();
        ctrl.advance().unwrap();
        assert_eq!(ctrl.current_frame().get(0, 0).r(), 1);
        let gen = ctrl.generation();

        ctrl.capture_frame().unwrap();
        assert_eq!(ctrl.mode(), SourceMode::CameraFrame);
        assert_eq!(ctrl.generation(), gen + 1);
        assert_eq!(calls.lock().unwrap().pause, 1);
        // The still does not change while the camera is paused.
        ctrl.advance().unwrap();
        assert_eq!(ctrl.current_frame().get(0, 0).r(), 1);

        ctrl.switch_to_camera().unwrap();
        assert_eq!(ctrl.mode(), SourceMode::Camera);
        assert_eq!(calls.lock().unwrap().play, 2);

        let stats = ctrl.stats();
        assert_eq!(stats.stills_captured(), 1);
        assert_eq!(stats.stills_released(), 1);
        assert_eq!(stats.cameras_acquired(), 1);
        assert_eq!(stats.cameras_released(), 0);

        drop(ctrl);
        assert_eq!(stats.cameras_released(), 1);
        assert_eq!(calls.lock().unwrap().release, 1);
    }

    #[test]
    fn capture_requires_camera() {
        let (mut ctrl, _) = controller();
        assert!(matches!(
            ctrl.capture_frame(),
            Err(Error::SourceAcquisition { .. })
        ));
    }

    #[test]
    fn stale_local_image() {
        let (mut ctrl, _) = controller();
        ctrl.switch_to_camera().unwrap();

        let ticket = ctrl.ticket();
        ctrl.capture_frame().unwrap();
        assert!(!ctrl.load_local_image(ticket, Image::new(3, 3)));
        assert_eq!(ctrl.mode(), SourceMode::CameraFrame);

        let ticket = ctrl.ticket();
        assert!(ctrl.load_local_image(ticket, Image::new(3, 3)));
        assert_eq!(ctrl.mode(), SourceMode::LocalImage);
        assert_eq!(ctrl.current().resolution(), Resolution::new(3, 3));

        let stats = ctrl.stats();
        assert_eq!(stats.stills_captured(), 2);
        // The captured frame was released when the local image replaced it.
        assert_eq!(stats.stills_released(), 1);
        drop(ctrl);
        assert_eq!(stats.stills_released(), 2);
    }

    #[test]
    fn acquisition_failure_shows_blank() {
        let mut ctrl = SourceController::new(|| {
            Err(Error::Io(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            )))
        })
        .with_blank_resolution(Resolution::new(8, 8));

        let err = ctrl.switch_to_camera().unwrap_err();
        assert!(matches!(
            err,
            Error::SourceAcquisition {
                kind: AcquisitionFailure::PermissionDenied,
                ..
            }
        ));
        assert!(ctrl.current().is_blank());
        assert_eq!(ctrl.mode(), SourceMode::Camera);
        assert_eq!(ctrl.current().resolution(), Resolution::new(8, 8));
        assert_eq!(ctrl.current_frame().get(0, 0), Color::BLACK);
        assert_eq!(ctrl.stats().cameras_acquired(), 0);
    }

    #[test]
    fn reload_releases_once() {
        let (mut ctrl, calls) = controller();
        ctrl.switch_to_camera().unwrap();
        ctrl.reload_camera().unwrap();
        assert_eq!(ctrl.stats().cameras_acquired(), 2);
        assert_eq!(ctrl.stats().cameras_released(), 1);
        assert_eq!(calls.lock().unwrap().release, 1);

        // Reloading while a still is shown releases the parked camera.
        ctrl.capture_frame().unwrap();
        ctrl.reload_camera().unwrap();
        assert_eq!(ctrl.mode(), SourceMode::Camera);
        assert_eq!(ctrl.stats().cameras_released(), 2);
        assert_eq!(ctrl.stats().stills_released(), 1);
    }

    #[test]
    fn camera_source_release_is_idempotent() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let stats = Arc::new(ResourceStats::default());
        let mut source = CameraSource::new(
            Box::new(FakeCamera {
                calls: calls.clone(),
                next: 0,
            }),
            &stats,
        );
        source.release();
        source.release();
        assert!(source.is_released());
        assert!(source.update().is_err());
        drop(source);
        assert_eq!(calls.lock().unwrap().release, 1);
        assert_eq!(stats.cameras_released(), 1);
    }
}
