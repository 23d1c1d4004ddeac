//! V4L2 webcam access.
//!
//! Only V4L2 `VIDEO_CAPTURE` devices yielding JFIF JPEG or Motion JPEG frames are supported.

use std::{env, io};

use anyhow::{bail, Context};
use faceflap_image::{Image, Resolution};
use linuxvideo::{
    format::{FrameIntervals, FrameSizes, PixFormat, Pixelformat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device, Fract,
};

use crate::{
    source::Camera,
    timer::Timer,
    AcquisitionFailure, Error, Result,
};

const ENV_VAR_WEBCAM_NAME: &str = "FACEFLAP_WEBCAM_NAME";

/// Options for [`Webcam::open`].
#[derive(Debug, Clone)]
pub struct WebcamOptions {
    name: Option<String>,
    resolution: Resolution,
    fps: u32,
}

impl Default for WebcamOptions {
    fn default() -> Self {
        Self {
            name: None,
            resolution: Resolution::RES_720P,
            fps: 30,
        }
    }
}

impl WebcamOptions {
    /// Sets the name of the webcam device to open.
    ///
    /// Takes precedence over `FACEFLAP_WEBCAM_NAME`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the desired resolution.
    ///
    /// The smallest supported resolution at least this large is selected. If there is none, the
    /// largest one is used.
    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the desired minimum frame rate.
    ///
    /// Resolution is sacrificed for frame rate.
    pub fn fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    resolution: Resolution,
    fps: f32,
}

/// Picks the index of the best candidate format.
fn pick_format(candidates: &[Candidate], want: Resolution, fps: u32) -> Option<usize> {
    let fast_enough = |c: &Candidate| c.fps.round() >= fps as f32;
    let large_enough = |c: &Candidate| {
        c.resolution.width() >= want.width() && c.resolution.height() >= want.height()
    };
    let indexed = || candidates.iter().enumerate();
    let any_fast = candidates.iter().any(fast_enough);
    let eligible = || indexed().filter(move |(_, c)| !any_fast || fast_enough(*c));

    let smallest_large = eligible()
        .filter(|(_, c)| large_enough(*c))
        .min_by(|(_, a), (_, b)| {
            a.resolution
                .num_pixels()
                .cmp(&b.resolution.num_pixels())
                .then(b.fps.total_cmp(&a.fps))
        });
    let largest = || {
        eligible().max_by(|(_, a), (_, b)| {
            a.resolution
                .num_pixels()
                .cmp(&b.resolution.num_pixels())
                .then(a.fps.total_cmp(&b.fps))
        })
    };
    smallest_large.or_else(largest).map(|(i, _)| i)
}

fn negotiate_format(
    device: &Device,
    options: &WebcamOptions,
) -> anyhow::Result<(PixFormat, Fract)> {
    let mut pixel_format = None;
    for format in device.formats(BufType::VIDEO_CAPTURE) {
        let format = format?.pixelformat();
        if format == Pixelformat::JPEG || format == Pixelformat::MJPG {
            pixel_format = Some(format);
            break;
        }
    }
    let Some(pixel_format) = pixel_format else {
        bail!("no JPEG pixel format");
    };

    let FrameSizes::Discrete(sizes) = device.frame_sizes(pixel_format)? else {
        bail!("stepwise or continuous resolutions are not supported");
    };
    let mut intervals = Vec::new();
    let mut candidates = Vec::new();
    for size in sizes {
        let FrameIntervals::Discrete(rates) =
            device.frame_intervals(pixel_format, size.width(), size.height())?
        else {
            bail!("stepwise or continuous frame rates are not supported");
        };
        for rate in rates {
            let interval = *rate.fract();
            intervals.push(interval);
            candidates.push(Candidate {
                resolution: Resolution::new(size.width(), size.height()),
                fps: 1.0 / interval.as_f32(),
            });
        }
    }

    let i = pick_format(&candidates, options.resolution, options.fps)
        .context("device reports no frame formats")?;
    let res = candidates[i].resolution;
    log::debug!("negotiated {:?} from {} candidates", candidates[i], candidates.len());
    Ok((
        PixFormat::new(res.width(), res.height(), pixel_format),
        intervals[i],
    ))
}

/// A V4L2 webcam.
pub struct Webcam {
    /// `None` after the device has been released.
    stream: Option<ReadStream>,
    resolution: Resolution,
    paused: bool,
    last: Image,
    t_dequeue: Timer,
    t_decode: Timer,
}

impl Webcam {
    /// Opens the first supported webcam.
    ///
    /// This can block for a significant amount of time while the webcam initializes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceAcquisition`], classified by the most specific failure encountered
    /// (a device that is busy or inaccessible is reported over a missing device).
    pub fn open(options: WebcamOptions) -> Result<Self> {
        let name = options
            .name
            .clone()
            .or_else(|| env::var(ENV_VAR_WEBCAM_NAME).ok());
        if let Some(name) = &name {
            log::debug!("looking for webcam '{}'", name);
        }

        let mut failure: Option<(AcquisitionFailure, anyhow::Error)> = None;
        let devices = linuxvideo::list()
            .map_err(|e| Error::acquisition(AcquisitionFailure::from_io(&e), e))?;
        for res in devices {
            let opened = res
                .map_err(anyhow::Error::from)
                .and_then(|dev| Self::open_device(dev, name.as_deref(), &options));
            match opened {
                Ok(Some(webcam)) => return Ok(webcam),
                Ok(None) => {}
                Err(e) => {
                    let kind = match e.downcast_ref::<io::Error>() {
                        Some(io) => AcquisitionFailure::from_io(io),
                        None => AcquisitionFailure::NoDevice,
                    };
                    log::debug!("{kind}: {e:#}");
                    let more_specific = failure
                        .as_ref()
                        .map_or(true, |(k, _)| *k == AcquisitionFailure::NoDevice);
                    if more_specific {
                        failure = Some((kind, e));
                    }
                }
            }
        }

        Err(match failure {
            Some((kind, e)) => Error::acquisition(kind, format!("{e:#}")),
            None => Error::acquisition(
                AcquisitionFailure::NoDevice,
                "no supported webcam device found",
            ),
        })
    }

    fn open_device(
        dev: Device,
        name: Option<&str>,
        options: &WebcamOptions,
    ) -> anyhow::Result<Option<Self>> {
        let caps = dev.capabilities()?;
        if name.map_or(false, |name| caps.card() != name) {
            return Ok(None);
        }
        let path = dev.path()?;
        if !caps
            .device_capabilities()
            .contains(CapabilityFlags::VIDEO_CAPTURE)
        {
            log::trace!("{} ({}) can not capture video", caps.card(), path.display());
            return Ok(None);
        }

        let (pixfmt, interval) = negotiate_format(&dev, options)
            .with_context(|| format!("{} ({})", caps.card(), path.display()))?;
        let capture = dev.video_capture(pixfmt)?;
        let format = capture.format();
        let resolution = Resolution::new(format.width(), format.height());
        let actual = capture.set_frame_interval(interval)?;

        log::info!(
            "opened {} ({}), {} @ {:.1}Hz",
            caps.card(),
            path.display(),
            resolution,
            1.0 / actual.as_f32(),
        );

        Ok(Some(Self {
            stream: Some(capture.into_stream(2)?),
            resolution,
            paused: false,
            last: Image::new(resolution.width(), resolution.height()),
            t_dequeue: Timer::new("dequeue"),
            t_decode: Timer::new("decode"),
        }))
    }

    /// Returns profiling timers for frame dequeuing and decoding.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_dequeue, &self.t_decode].into_iter()
    }
}

impl Camera for Webcam {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    /// Returns the next frame, or the last one while paused.
    ///
    /// Frames that fail to decode are replaced with a transparent image.
    fn read(&mut self) -> Result<Image> {
        if self.paused {
            return Ok(self.last.clone());
        }
        let Some(stream) = &mut self.stream else {
            return Err(Error::acquisition(
                AcquisitionFailure::Other,
                "webcam has been released",
            ));
        };

        let dequeue_guard = self.t_dequeue.start();
        let t_decode = &self.t_decode;
        let res = self.resolution;
        let image = stream.dequeue(|buf| {
            drop(dequeue_guard);
            // Corrupted MJPG frames happen occasionally (USB transfer errors). Skipping them would
            // double the latency, so a blank frame is returned instead.
            Ok(t_decode
                .time(|| Image::decode_jpeg(&buf))
                .unwrap_or_else(|e| {
                    log::error!("webcam decode error: {}", e);
                    Image::new(res.width(), res.height())
                }))
        })?;
        self.last = image.clone();
        Ok(image)
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            log::info!("webcam released");
        }
    }
}
