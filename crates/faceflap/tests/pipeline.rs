use std::{
    f32::consts::PI,
    io,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use faceflap::{
    detector::StaticLandmarks,
    image::{Color, Image, Resolution},
    landmark::LandmarkGroups,
    linalg::point,
    loader::ImageLoader,
    notice::NoticeKind,
    pipeline::{FrameOutcome, PipelineOptions, RenderPipeline},
    source::{Camera, SourceController, SourceMode},
    AcquisitionFailure, Error,
};

/// Camera yielding solid green frames, counting releases.
struct GreenCamera {
    releases: Arc<AtomicUsize>,
}

impl Camera for GreenCamera {
    fn resolution(&self) -> Resolution {
        Resolution::new(320, 240)
    }

    fn play(&mut self) {}

    fn pause(&mut self) {}

    fn read(&mut self) -> faceflap::Result<Image> {
        Ok(Image::filled(320, 240, Color::GREEN))
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

fn green_sources() -> (SourceController, Arc<AtomicUsize>) {
    let releases = Arc::new(AtomicUsize::new(0));
    let r = releases.clone();
    let sources = SourceController::new(move || {
        Ok(Box::new(GreenCamera {
            releases: r.clone(),
        }) as Box<dyn Camera>)
    });
    (sources, releases)
}

/// An upright face in a 400x400 frame, eyes at y=150 and the mouth at y=225.
fn landmarks() -> LandmarkGroups {
    let ellipse = |cx: f32, cy: f32, rx: f32, ry: f32, n: usize| {
        (0..n).map(move |i| {
            let t = i as f32 / n as f32 * 2.0 * PI;
            point(cx + rx * t.cos(), cy + ry * t.sin())
        })
    };
    let mut points = Vec::new();
    points.extend((0..17).map(|i| {
        let t = i as f32 / 16.0 * PI;
        point(200.0 - 100.0 * t.cos(), 150.0 + 120.0 * t.sin())
    }));
    points.extend((0..10).map(|i| point(140.0 + i as f32 * 13.0, 130.0)));
    points.extend((0..4).map(|i| point(200.0, 160.0 + i as f32 * 10.0)));
    points.extend((0..5).map(|i| point(190.0 + i as f32 * 5.0, 200.0)));
    points.extend(ellipse(160.0, 150.0, 15.0, 6.0, 6));
    points.extend(ellipse(240.0, 150.0, 15.0, 6.0, 6));
    points.extend(ellipse(200.0, 225.0, 30.0, 10.0, 12));
    points.extend(ellipse(200.0, 225.0, 20.0, 4.0, 8));
    LandmarkGroups::from_68(&points).unwrap()
}

fn photo() -> Image {
    let mut image = Image::filled(400, 400, Color::BLUE);
    for y in 140..160 {
        for x in 140..260 {
            image.set(x, y, Color::RED);
        }
    }
    image
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("faceflap-it-{}-{}", std::process::id(), name))
}

#[test]
fn photo_with_face_flaps() {
    let path = temp_path("photo.png");
    photo().save(&path).unwrap();

    let (mut sources, _) = green_sources();
    let ticket = sources.ticket();
    let image = ImageLoader::new()
        .load(&path)
        .wait_timeout(Duration::from_secs(10))
        .unwrap();
    std::fs::remove_file(&path).ok();
    assert!(sources.load_local_image(ticket, image));
    assert_eq!(sources.mode(), SourceMode::LocalImage);

    let mut pipeline =
        RenderPipeline::new(PipelineOptions::default().container(Resolution::new(200, 100)));
    pipeline
        .attach_detector(StaticLandmarks::new(landmarks()))
        .unwrap();

    let FrameOutcome::Drawn { face: Some(face) } = pipeline.render_frame(&sources).unwrap() else {
        panic!("expected a face");
    };
    approx::assert_abs_diff_eq!(face.eyes.angle, 0.0, epsilon = 1e-4);

    let out = pipeline.canvas().image();
    assert_ne!(out, &photo(), "flaps were not drawn");
    // Outside the head, the photo is unchanged.
    assert_eq!(out.get(2, 2), Color::BLUE);
    assert_eq!(out.get(397, 397), Color::BLUE);
    assert_eq!(pipeline.canvas().depth(), 0);

    assert_eq!(
        pipeline.display().image().resolution(),
        Resolution::new(100, 100)
    );
    assert!(pipeline.notices().active().is_empty());
}

#[test]
fn switching_source_discards_frame_in_flight() {
    let (mut sources, _) = green_sources();
    sources.switch_to_camera().unwrap();
    sources.advance().unwrap();

    let mut pipeline = RenderPipeline::new(PipelineOptions::default());
    pipeline.attach_detector(StaticLandmarks::empty()).unwrap();

    let ticket = sources.ticket();
    pipeline.begin_frame(&sources).unwrap();
    assert!(sources.load_local_image(ticket, photo()));
    assert!(matches!(
        pipeline.finish_frame(&sources).unwrap(),
        FrameOutcome::Stale
    ));
    assert!(pipeline.display().image().is_empty());

    // The next frame shows the photo, without a face.
    assert!(matches!(
        pipeline.render_frame(&sources).unwrap(),
        FrameOutcome::Drawn { face: None }
    ));
    assert_eq!(pipeline.canvas().image(), &photo());
    assert!(pipeline.notices().is_active(NoticeKind::NoFace));

    // Going back to the live camera clears the notice.
    sources.switch_to_camera().unwrap();
    sources.advance().unwrap();
    pipeline.render_frame(&sources).unwrap();
    assert!(!pipeline.notices().is_active(NoticeKind::NoFace));
    assert_eq!(pipeline.canvas().image().get(10, 10), Color::GREEN);
}

#[test]
fn resources_are_released() {
    let (mut sources, releases) = green_sources();
    let stats = sources.stats();

    sources.switch_to_camera().unwrap();
    sources.capture_frame().unwrap();
    sources.switch_to_camera().unwrap();
    let ticket = sources.ticket();
    assert!(sources.load_local_image(ticket, photo()));
    sources.switch_to_camera().unwrap();

    assert_eq!(stats.stills_captured(), 2);
    assert_eq!(stats.stills_released(), 2);
    assert_eq!(stats.cameras_acquired(), 1);
    assert_eq!(releases.load(Ordering::SeqCst), 0);

    sources.reload_camera().unwrap();
    assert_eq!(stats.cameras_acquired(), 2);
    assert_eq!(stats.cameras_released(), 1);
    assert_eq!(releases.load(Ordering::SeqCst), 1);

    drop(sources);
    assert_eq!(stats.cameras_released(), 2);
    assert_eq!(releases.load(Ordering::SeqCst), 2);
}

#[test]
fn unavailable_camera() {
    let mut sources = SourceController::new(|| {
        Err(Error::Io(io::Error::from(io::ErrorKind::PermissionDenied)))
    });
    let err = sources.switch_to_camera().unwrap_err();
    assert!(
        matches!(
            err,
            Error::SourceAcquisition {
                kind: AcquisitionFailure::PermissionDenied,
                ..
            }
        ),
        "{err}"
    );
    assert!(sources.current().is_blank());

    let mut pipeline = RenderPipeline::new(PipelineOptions::default());
    assert!(pipeline.notices_mut().report(&err));
    pipeline.render_frame(&sources).unwrap();

    let shown = pipeline.display().image();
    assert_eq!(shown.resolution(), Resolution::new(960, 720));
    assert_eq!(shown.get(900, 700), Color::BLACK);
    assert!(shown.data().chunks(4).any(|pix| pix == [255, 255, 0, 255]));
}
