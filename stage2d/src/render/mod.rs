mod canvas;
mod compositor;
mod raster;

pub use canvas::{Canvas, Color, DrawCall, RecordingCanvas, Rect};
pub use compositor::{Compositor, DebugOverlays, BORDER_STROKE, GRID_STROKE, HIGHLIGHT_FILL};
pub use raster::RasterCanvas;
