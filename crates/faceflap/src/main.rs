use std::{ffi::OsString, path::PathBuf, process, time::Duration};

use anyhow::Context;
use faceflap::{
    detector::StaticLandmarks,
    flaps::FlapConfig,
    image::Resolution,
    loader::ImageLoader,
    pipeline::{FrameOutcome, PipelineOptions, RenderPipeline},
    source::{Camera, SourceController},
    webcam::{Webcam, WebcamOptions},
    AcquisitionFailure, Error,
};

const USAGE: &str = "usage: faceflap <image> <landmarks.json> <output.png> [WIDTHxHEIGHT]
       faceflap --webcam <landmarks.json> <output.png> [WIDTHxHEIGHT]";

/// Frames to skip before capturing, while the webcam adjusts its exposure.
const WARMUP_FRAMES: usize = 15;
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

enum Input {
    Image(PathBuf),
    Webcam,
}

struct Args {
    input: Input,
    landmarks: PathBuf,
    output: PathBuf,
    container: Option<Resolution>,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<OsString> = std::env::args_os().skip(1).collect();
    let (input, rest) = match args.split_first() {
        Some((flag, rest)) if flag == "--webcam" => (Input::Webcam, rest),
        Some((path, rest)) => (Input::Image(path.into()), rest),
        None => usage(),
    };
    let (landmarks, output, container) = match rest {
        [landmarks, output] => (landmarks, output, None),
        [landmarks, output, res] => {
            let res = res.to_string_lossy();
            let res = res
                .parse::<Resolution>()
                .with_context(|| format!("invalid output size '{res}'"))?;
            (landmarks, output, Some(res))
        }
        _ => usage(),
    };
    Ok(Args {
        input,
        landmarks: landmarks.into(),
        output: output.into(),
        container,
    })
}

fn usage() -> ! {
    eprintln!("{USAGE}");
    process::exit(1);
}

fn main() -> anyhow::Result<()> {
    faceflap::init_logger!();

    let args = parse_args()?;

    let mut sources = match &args.input {
        Input::Image(_) => SourceController::new(|| {
            Err(Error::acquisition(
                AcquisitionFailure::NoDevice,
                "no camera in image mode",
            ))
        }),
        Input::Webcam => SourceController::new(|| {
            Webcam::open(WebcamOptions::default()).map(|cam| Box::new(cam) as Box<dyn Camera>)
        }),
    };

    match &args.input {
        Input::Image(path) => {
            let ticket = sources.ticket();
            let image = ImageLoader::new()
                .max_resolution(Resolution::RES_1080P)
                .load(path)
                .wait_timeout(LOAD_TIMEOUT)?;
            if !sources.load_local_image(ticket, image) {
                anyhow::bail!("source changed while loading {}", path.display());
            }
        }
        Input::Webcam => {
            sources.switch_to_camera()?;
            for _ in 0..WARMUP_FRAMES {
                sources.advance()?;
            }
            sources.capture_frame()?;
        }
    }

    let container = args
        .container
        .unwrap_or_else(|| sources.current_frame().resolution());
    let mut pipeline = RenderPipeline::new(
        PipelineOptions::default()
            .container(container)
            .flaps(FlapConfig::from_env()),
    );
    let detector = StaticLandmarks::load(&args.landmarks)?;
    pipeline.attach_detector(detector)?;

    match pipeline.render_frame(&sources)? {
        FrameOutcome::Drawn { face: Some(face) } => {
            log::info!(
                "eyes at {:?} (angle {:.1}°), mouth at {:?}",
                face.eyes.center,
                face.eyes.angle.to_degrees(),
                face.mouth.center,
            );
        }
        FrameOutcome::Drawn { face: None } => log::warn!("no face in input, output is unmodified"),
        FrameOutcome::Stale => anyhow::bail!("source changed while rendering"),
    }
    for notice in pipeline.notices().active() {
        log::warn!("{}", notice.message);
    }

    pipeline
        .display()
        .image()
        .save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    log::info!("wrote {}", args.output.display());

    Ok(())
}
