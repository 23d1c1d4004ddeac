//! Loading image files in the background.

use std::{
    io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, TryRecvError},
        Arc,
    },
    thread,
    time::Duration,
};

use faceflap_image::{Image, Resolution};

use crate::{Error, Result};

/// Decodes image files on a background thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageLoader {
    max_resolution: Option<Resolution>,
}

impl ImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Downscales loaded images that do not fit within `res`, preserving their aspect ratio.
    pub fn max_resolution(mut self, res: Resolution) -> Self {
        self.max_resolution = Some(res);
        self
    }

    /// Starts loading the image at `path`.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> PendingImage {
        let path = path.as_ref().to_path_buf();
        let (sender, receiver) = mpsc::sync_channel(1);
        let cancelled = Arc::new(AtomicBool::new(false));

        let max_resolution = self.max_resolution;
        let flag = cancelled.clone();
        let thread_path = path.clone();
        let spawned = thread::Builder::new()
            .name("image loader".into())
            .spawn(move || {
                if flag.load(Ordering::Relaxed) {
                    return;
                }
                let result = decode(&thread_path, max_resolution);
                // The receiver is gone if the load was abandoned.
                sender.send(result).ok();
            });
        if let Err(e) = spawned {
            log::error!("failed to spawn image loader thread: {e}");
            let (sender, receiver) = mpsc::sync_channel(1);
            sender.send(Err(Error::Io(e))).ok();
            return PendingImage::new(path, receiver, cancelled);
        }

        PendingImage::new(path, receiver, cancelled)
    }
}

fn decode(path: &Path, max_resolution: Option<Resolution>) -> Result<Image> {
    let image = Image::load(path).map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("loaded {} ({})", path.display(), image.resolution());

    Ok(match max_resolution {
        Some(max) if !image.resolution().fits_in(max) => {
            let res = image.resolution().fit_within(max);
            log::debug!("downscaling {} -> {}", image.resolution(), res);
            image.resized(res)
        }
        _ => image,
    })
}

/// An image that is being loaded.
///
/// Dropping a [`PendingImage`] abandons the load.
pub struct PendingImage {
    path: PathBuf,
    receiver: Receiver<Result<Image>>,
    cancelled: Arc<AtomicBool>,
}

impl PendingImage {
    fn new(path: PathBuf, receiver: Receiver<Result<Image>>, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            path,
            receiver,
            cancelled,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cancels the load.
    ///
    /// Decoding that is already in progress runs to completion, but its result is discarded.
    pub fn cancel(&self) {
        log::debug!("cancelling load of {}", self.path.display());
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns the result, if loading has finished.
    ///
    /// Returns `None` while the image is still loading. A result is only returned once; after
    /// that, this keeps returning an error.
    pub fn poll(&mut self) -> Option<Result<Image>> {
        if self.is_cancelled() {
            return Some(Err(Error::Cancelled));
        }
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(stopped())),
        }
    }

    /// Blocks until the image is loaded, or `timeout` has passed.
    ///
    /// On timeout, the load is cancelled and [`Error::Timeout`] is returned.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Image> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(_) if self.is_cancelled() => Err(Error::Cancelled),
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "loading {} timed out after {:?}",
                    self.path.display(),
                    timeout
                );
                self.cancel();
                Err(Error::Timeout)
            }
            Err(RecvTimeoutError::Disconnected) => Err(stopped()),
        }
    }

    /// Blocks until the image is loaded.
    pub fn wait(self) -> Result<Image> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.receiver.recv() {
            Ok(_) if self.is_cancelled() => Err(Error::Cancelled),
            Ok(result) => result,
            Err(_) => Err(stopped()),
        }
    }
}

fn stopped() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::Other,
        "image loader thread stopped without a result",
    ))
}
