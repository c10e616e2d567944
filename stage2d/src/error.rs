use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the image loader.
///
/// These never abort a frame: the handle that hit them moves to
/// [`ImageStatus::Failed`](crate::assets::ImageStatus::Failed) and stays undrawable.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("image source is empty")]
    EmptySource,
    #[error("failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("no image cached under alias \"{0}\"")]
    UnknownAlias(String),
    #[error("image loader thread for {0} stopped before reporting a result")]
    LoaderGone(String),
}

/// Failures of the windowed host that drives the scheduler.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] winit::error::EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] winit::error::OsError),
    #[error("failed to create presentation surface: {0}")]
    CreateSurface(#[source] pixels::Error),
    #[error("failed to resize presentation surface: {0}")]
    ResizeSurface(#[source] pixels::TextureError),
    #[error("failed to present frame: {0}")]
    Present(#[source] pixels::Error),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] winit::error::EventLoopError),
}
