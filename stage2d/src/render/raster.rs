use image::{Rgba, RgbaImage};

use super::canvas::{Canvas, Color, Rect};
use crate::math::Vec2;

/// Software [`Canvas`] backed by an RGBA image buffer.
///
/// Fills, strokes and images are alpha-blended source-over. Images are scaled with
/// nearest-neighbour sampling.
pub struct RasterCanvas {
    pixels: RgbaImage,
    fill: Color,
    stroke: Color,
    line_width: f32,
    path: Vec<(Vec2, Vec2)>,
    cursor: Option<Vec2>,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            path: Vec::new(),
            cursor: None,
        }
    }

    /// Replace the buffer with a blank one of the new size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.pixels.dimensions() != (width, height) {
            self.pixels = RgbaImage::new(width, height);
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.pixels.width() && y < self.pixels.height() {
            let Rgba([r, g, b, a]) = *self.pixels.get_pixel(x, y);
            Some(Color { r, g, b, a })
        } else {
            None
        }
    }

    /// Copy the buffer into an RGBA8 frame of the same size, e.g. a presentation surface.
    pub fn copy_to(&self, frame: &mut [u8]) {
        let raw = self.pixels.as_raw();
        let len = raw.len().min(frame.len());
        frame[..len].copy_from_slice(&raw[..len]);
    }

    fn span(start: f32, len: f32, limit: u32) -> Option<(u32, u32)> {
        if len <= 0.0 {
            return None;
        }
        let from = start.round().max(0.0);
        let to = (start + len).round().min(limit as f32);
        (from < to).then_some((from as u32, to as u32))
    }

    fn blend_rect(&mut self, rect: Rect, color: Color) {
        let (width, height) = self.pixels.dimensions();
        let (Some((x0, x1)), Some((y0, y1))) = (
            Self::span(rect.x, rect.width, width),
            Self::span(rect.y, rect.height, height),
        ) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                blend(self.pixels.get_pixel_mut(x, y), color.to_array());
            }
        }
    }

    fn stroke_segment(&mut self, from: Vec2, to: Vec2) {
        let half = self.line_width / 2.0;
        let delta = to - from;
        let steps = delta.x.abs().max(delta.y.abs()).ceil().max(1.0) as u32;
        let color = self.stroke;

        if delta.x == 0.0 || delta.y == 0.0 {
            let left = from.x.min(to.x) - half;
            let top = from.y.min(to.y) - half;
            let rect = Rect::new(
                left,
                top,
                delta.x.abs() + self.line_width,
                delta.y.abs() + self.line_width,
            );
            self.blend_rect(rect, color);
            return;
        }

        for i in 0..=steps {
            let point = from + delta * (i as f32 / steps as f32);
            let rect = Rect::new(point.x - half, point.y - half, self.line_width, self.line_width);
            self.blend_rect(rect, color);
        }
    }
}

fn blend(dst: &mut Rgba<u8>, src: [u8; 4]) {
    let alpha = src[3] as f32 / 255.0;
    if alpha <= 0.0 {
        return;
    }
    if alpha >= 1.0 {
        dst.0 = src;
        return;
    }
    let dst_alpha = dst.0[3] as f32 / 255.0;
    for channel in 0..3 {
        let mixed = src[channel] as f32 * alpha + dst.0[channel] as f32 * (1.0 - alpha);
        dst.0[channel] = mixed.round() as u8;
    }
    dst.0[3] = ((alpha + dst_alpha * (1.0 - alpha)) * 255.0).round() as u8;
}

impl Canvas for RasterCanvas {
    fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn clear_rect(&mut self, rect: Rect) {
        let (width, height) = self.pixels.dimensions();
        let (Some((x0, x1)), Some((y0, y1))) = (
            Self::span(rect.x, rect.width, width),
            Self::span(rect.y, rect.height, height),
        ) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.pixels.put_pixel(x, y, Rgba(Color::TRANSPARENT.to_array()));
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.blend_rect(rect, self.fill);
    }

    fn stroke_rect(&mut self, rect: Rect) {
        let width = self.line_width;
        let half = width / 2.0;
        let color = self.stroke;
        // Centered on the outline, like a canvas context.
        self.blend_rect(Rect::new(rect.x - half, rect.y - half, rect.width + width, width), color);
        self.blend_rect(
            Rect::new(rect.x - half, rect.y + rect.height - half, rect.width + width, width),
            color,
        );
        self.blend_rect(Rect::new(rect.x - half, rect.y + half, width, rect.height - width), color);
        self.blend_rect(
            Rect::new(rect.x + rect.width - half, rect.y + half, width, rect.height - width),
            color,
        );
    }

    fn draw_image(&mut self, image: &RgbaImage, dest: Rect) {
        let (src_width, src_height) = image.dimensions();
        if src_width == 0 || src_height == 0 {
            return;
        }
        let (width, height) = self.pixels.dimensions();
        let (Some((x0, x1)), Some((y0, y1))) = (
            Self::span(dest.x, dest.width, width),
            Self::span(dest.y, dest.height, height),
        ) else {
            return;
        };

        for y in y0..y1 {
            let v = ((y as f32 + 0.5 - dest.y) / dest.height * src_height as f32).floor();
            let sy = (v.max(0.0) as u32).min(src_height - 1);
            for x in x0..x1 {
                let u = ((x as f32 + 0.5 - dest.x) / dest.width * src_width as f32).floor();
                let sx = (u.max(0.0) as u32).min(src_width - 1);
                let texel = image.get_pixel(sx, sy).0;
                blend(self.pixels.get_pixel_mut(x, y), texel);
            }
        }
    }

    fn set_fill_style(&mut self, color: Color) {
        self.fill = color;
    }

    fn set_stroke_style(&mut self, color: Color) {
        self.stroke = color;
    }

    fn set_line_width(&mut self, width: f32) {
        self.line_width = width.max(0.0);
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
        let segments = std::mem::take(&mut self.path);
        for &(from, to) in &segments {
            self.stroke_segment(from, to);
        }
        self.path = segments;
    }
}
