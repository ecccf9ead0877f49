use crate::annotations::detection::DetectionCandidate;
use crate::annotations::point::Point;
use crate::annotations::rectangle::Rectangle;
use crate::error::ConfigurationError;
use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const BOX_COLOR: Rgb<u8> = Rgb([255, 4, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const BOX_THICKNESS: i32 = 3;
const MARKER_SIZE: i32 = 20;
const MARKER_THICKNESS: i32 = 2;
// Text is measured at this size, the background and the drawn text are 1.5 times larger.
const LABEL_MEASURE_SCALE: f32 = 16.0;
const LABEL_DRAW_FACTOR: f32 = 1.5;
// Rough glyph proportions used when no font is loaded.
const ESTIMATED_CHAR_WIDTH: f32 = 0.5;
const ESTIMATED_TEXT_HEIGHT: f32 = 0.7;
const ESTIMATED_DESCENT: f32 = 0.2;

static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Size of a rendered label in pixels. `baseline` is how far glyphs reach below the text line.
#[derive(Clone, Copy, Debug, PartialEq)]
struct TextExtent {
    width: i32,
    height: i32,
    baseline: i32,
}

/// Marks the winning detection on an image: outline, label and centre cross.
///
/// The default annotator renders labels with the bundled DejaVu Sans. Without a font the label
/// background is still drawn, sized from an estimate of the text extent, but no glyphs.
pub struct Annotator {
    font: Option<FontArc>,
}

impl Default for Annotator {
    fn default() -> Self {
        match FontArc::try_from_slice(BUNDLED_FONT) {
            Ok(font) => Annotator::new(Some(font)),
            Err(err) => {
                warn!("Bundled label font is unusable ({}), labels will have no text", err);
                Annotator::new(None)
            }
        }
    }
}

impl Annotator {
    pub fn new(font: Option<FontArc>) -> Self {
        Annotator { font }
    }

    pub fn from_font_file(path: &Path) -> Result<Self, ConfigurationError> {
        let bytes = fs::read(path).map_err(|source| ConfigurationError::FontRead {
            path: path.to_path_buf(),
            source,
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|_| ConfigurationError::InvalidFont {
            path: path.to_path_buf(),
        })?;
        Ok(Annotator::new(Some(font)))
    }

    /// Draws the detection onto `image` and returns the centre of its box.
    ///
    /// Boxes partly or entirely outside the image, or with no area, are clipped rather than
    /// rejected.
    pub fn annotate(
        &self,
        image: &mut RgbImage,
        class_name: Option<&str>,
        candidate: &DetectionCandidate,
    ) -> Point {
        let rect = &candidate.rect;
        draw_box_outline(image, rect);

        let label = format_label(class_name, candidate.confidence);
        self.draw_label(image, &label, rect);

        let center = rect.center();
        draw_cross_marker(image, center);
        debug!("Annotated {} at {}", label, center);
        center
    }

    fn draw_label(&self, image: &mut RgbImage, label: &str, rect: &Rectangle) {
        let extent = self.measure(label);
        let box_top = rect.top().max(extent.height);
        let background_width = (LABEL_DRAW_FACTOR * extent.width as f32).round() as i32;
        let background_height = (LABEL_DRAW_FACTOR * extent.height as f32).round() as i32;
        let (image_width, image_height) = (image.width() as i32, image.height() as i32);
        // Keeps the origin near the image so far off boxes cannot overflow the drawing code.
        let x = rect.left().clamp(-background_width, image_width);
        let y = (box_top - background_height).clamp(-background_height, image_height);

        let filled_height = background_height + extent.baseline;
        if background_width > 0 && filled_height > 0 {
            let background =
                Rect::at(x, y).of_size(background_width as u32, filled_height as u32);
            draw_filled_rect_mut(image, background, BOX_COLOR);
        }
        if let Some(font) = &self.font {
            let scale = PxScale::from(LABEL_MEASURE_SCALE * LABEL_DRAW_FACTOR);
            draw_text_mut(image, TEXT_COLOR, x, y, scale, font, label);
        }
    }

    fn measure(&self, label: &str) -> TextExtent {
        let scale = PxScale::from(LABEL_MEASURE_SCALE);
        match &self.font {
            Some(font) => {
                let (width, height) = text_size(scale, font, label);
                let descent = font.as_scaled(scale).descent();
                TextExtent {
                    width: width as i32,
                    height: height as i32,
                    baseline: (-descent).ceil().max(0.0) as i32,
                }
            }
            None => TextExtent {
                width: (label.chars().count() as f32 * LABEL_MEASURE_SCALE * ESTIMATED_CHAR_WIDTH)
                    as i32,
                height: (LABEL_MEASURE_SCALE * ESTIMATED_TEXT_HEIGHT) as i32,
                baseline: (LABEL_MEASURE_SCALE * ESTIMATED_DESCENT) as i32,
            },
        }
    }
}

/// `"<class_name>:<confidence>"` with two decimals, or just the confidence without a name.
pub fn format_label(class_name: Option<&str>, confidence: f32) -> String {
    match class_name {
        Some(name) => format!("{}:{:.2}", name, confidence),
        None => format!("{:.2}", confidence),
    }
}

fn draw_box_outline(image: &mut RgbImage, rect: &Rectangle) {
    let pad = BOX_THICKNESS + 1;
    let (image_width, image_height) = (image.width() as i32, image.height() as i32);
    let clamp_x = |x: i32| x.clamp(-pad, image_width + pad) as f32;
    let clamp_y = |y: i32| y.clamp(-pad, image_height + pad) as f32;
    let half = BOX_THICKNESS / 2;
    for offset in -half..=half {
        let left = clamp_x(rect.left().saturating_sub(offset));
        let right = clamp_x(rect.right().saturating_add(offset));
        let top = clamp_y(rect.top().saturating_sub(offset));
        let bottom = clamp_y(rect.bottom().saturating_add(offset));
        draw_line_segment_mut(image, (left, top), (right, top), BOX_COLOR);
        draw_line_segment_mut(image, (right, top), (right, bottom), BOX_COLOR);
        draw_line_segment_mut(image, (right, bottom), (left, bottom), BOX_COLOR);
        draw_line_segment_mut(image, (left, bottom), (left, top), BOX_COLOR);
    }
}

fn draw_cross_marker(image: &mut RgbImage, center: Point) {
    let pad = MARKER_SIZE;
    let (image_width, image_height) = (image.width() as i32, image.height() as i32);
    let clamp_x = |x: i32| x.clamp(-pad, image_width + pad) as f32;
    let clamp_y = |y: i32| y.clamp(-pad, image_height + pad) as f32;
    let reach = MARKER_SIZE / 2;
    for offset in 0..MARKER_THICKNESS {
        let row = clamp_y(center.y.saturating_add(offset));
        draw_line_segment_mut(
            image,
            (clamp_x(center.x.saturating_sub(reach)), row),
            (clamp_x(center.x.saturating_add(reach)), row),
            BOX_COLOR,
        );
        let column = clamp_x(center.x.saturating_add(offset));
        draw_line_segment_mut(
            image,
            (column, clamp_y(center.y.saturating_sub(reach))),
            (column, clamp_y(center.y.saturating_add(reach))),
            BOX_COLOR,
        );
    }
}
