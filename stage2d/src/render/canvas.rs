use image::RgbaImage;

use crate::math::Vec2;

/// 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgb(0, 0, 0).with_alpha(0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const PURPLE: Self = Self::rgb(128, 0, 128);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// CSS-style constructor with a fractional alpha in `0.0..=1.0`.
    pub fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Self::rgb(r, g, b).with_alpha((alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Rectangle in canvas pixels (Y down).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self::new(origin.x, origin.y, size.x, size.y)
    }

    /// Same rectangle with every component rounded to whole pixels.
    pub fn rounded(self) -> Self {
        Self::new(
            self.x.round(),
            self.y.round(),
            self.width.round(),
            self.height.round(),
        )
    }
}

/// 2D drawing surface the compositor renders into.
///
/// Modelled on an immediate-mode canvas context: style setters change state used by the
/// following fill/stroke calls, and lines are accumulated into a path until `stroke`.
pub trait Canvas {
    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);

    fn clear_rect(&mut self, rect: Rect);

    fn fill_rect(&mut self, rect: Rect);

    fn stroke_rect(&mut self, rect: Rect);

    /// Draw `image` scaled to fill `dest`.
    fn draw_image(&mut self, image: &RgbaImage, dest: Rect);

    fn set_fill_style(&mut self, color: Color);

    fn set_stroke_style(&mut self, color: Color);

    fn set_line_width(&mut self, width: f32);

    /// Start a new, empty path.
    fn begin_path(&mut self);

    fn move_to(&mut self, x: f32, y: f32);

    fn line_to(&mut self, x: f32, y: f32);

    /// Stroke every segment of the current path.
    fn stroke(&mut self);
}

/// One recorded drawing operation.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Clear(Rect),
    Fill {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
        line_width: f32,
    },
    Image {
        image_size: (u32, u32),
        dest: Rect,
    },
    Line {
        from: Vec2,
        to: Vec2,
        color: Color,
        line_width: f32,
    },
}

/// Canvas that records drawing operations instead of producing pixels.
///
/// Useful for checking what a frame draws, and in which order, without a window.
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    fill: Color,
    stroke: Color,
    line_width: f32,
    path: Vec<(Vec2, Vec2)>,
    cursor: Option<Vec2>,
    calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            path: Vec::new(),
            cursor: None,
            calls: Vec::new(),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Destination rectangles of every image drawn, in draw order.
    pub fn images(&self) -> Vec<Rect> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Image { dest, .. } => Some(*dest),
                _ => None,
            })
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn reset(&mut self) {
        self.calls.clear();
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.calls.push(DrawCall::Clear(rect));
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.calls.push(DrawCall::Fill {
            rect,
            color: self.fill,
        });
    }

    fn stroke_rect(&mut self, rect: Rect) {
        self.calls.push(DrawCall::StrokeRect {
            rect,
            color: self.stroke,
            line_width: self.line_width,
        });
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect) {
        self.calls.push(DrawCall::Image {
            image_size: image.dimensions(),
            dest,
        });
    }

    fn set_fill_style(&mut self, color: Color) {
        self.fill = color;
    }

    fn set_stroke_style(&mut self, color: Color) {
        self.stroke = color;
    }

    fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
    }

    fn begin_path(&mut self) {
        self.path.clear();
        self.cursor = None;
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.cursor = Some(Vec2::new(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let to = Vec2::new(x, y);
        if let Some(from) = self.cursor {
            self.path.push((from, to));
        }
        self.cursor = Some(to);
    }

    fn stroke(&mut self) {
        for &(from, to) in &self.path {
            self.calls.push(DrawCall::Line {
                from,
                to,
                color: self.stroke,
                line_width: self.line_width,
            });
        }
    }
}
