//! Bounding-box and label annotation.
//!
//! Pure drawing: rectangles and `"{label} {confidence:.2f}"` text rendered
//! onto a frame in detection order. Deterministic for identical inputs.

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::warn;

use framescan_models::Detection;

/// Box outline thickness in pixels.
const BOX_THICKNESS: i32 = 2;

/// Label text height in pixels.
const LABEL_HEIGHT: u32 = 16;

/// Fixed annotation palette; a detection's color is keyed by its label so the
/// same class always gets the same color.
const PALETTE: &[[u8; 3]] = &[
    [230, 57, 70],
    [29, 53, 87],
    [42, 157, 143],
    [233, 196, 106],
    [244, 162, 97],
    [38, 70, 83],
    [106, 76, 147],
    [25, 130, 196],
    [138, 201, 38],
    [255, 89, 94],
];

/// Candidate font locations tried in order when no explicit path is given.
const FONT_SEARCH_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
];

/// Draws detection boxes and labels onto frames.
///
/// Loaded once at startup and shared; annotation itself is stateless.
pub struct FrameAnnotator {
    font: Option<FontVec>,
}

impl FrameAnnotator {
    /// Create an annotator, loading the label font from `font_path` or, when
    /// unset, from known system locations. Without a font the annotator still
    /// draws boxes and logs a warning once.
    pub fn from_config(font_path: Option<&Path>) -> Self {
        let font = match font_path {
            Some(path) => load_font(path),
            None => FONT_SEARCH_PATHS.iter().find_map(|p| load_font(Path::new(p))),
        };

        if font.is_none() {
            warn!("No label font found, annotating with boxes only");
        }

        Self { font }
    }

    /// Create an annotator with an already-loaded font (or none).
    pub fn with_font(font: Option<FontVec>) -> Self {
        Self { font }
    }

    /// Annotate a copy of the frame, leaving the input untouched.
    pub fn annotate(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut annotated = image.clone();
        self.annotate_mut(&mut annotated, detections);
        annotated
    }

    /// Annotate the frame in place. Used on the single-image path where the
    /// decoded upload is not needed afterwards.
    pub fn annotate_mut(&self, image: &mut RgbImage, detections: &[Detection]) {
        for detection in detections {
            self.draw_detection(image, detection);
        }
    }

    fn draw_detection(&self, image: &mut RgbImage, detection: &Detection) {
        let color = class_color(&detection.label);
        let bbox = detection.bbox.clamp(image.width(), image.height());
        if !bbox.is_valid() {
            return;
        }

        let x = bbox.x1 as i32;
        let y = bbox.y1 as i32;
        let w = bbox.width().max(1.0) as u32;
        let h = bbox.height().max(1.0) as u32;

        // Nested hollow rects give the outline its thickness.
        for t in 0..BOX_THICKNESS {
            let inner_w = w.saturating_sub(2 * t as u32);
            let inner_h = h.saturating_sub(2 * t as u32);
            if inner_w == 0 || inner_h == 0 {
                break;
            }
            let rect = Rect::at(x + t, y + t).of_size(inner_w, inner_h);
            draw_hollow_rect_mut(image, rect, color);
        }

        if let Some(font) = &self.font {
            let text = detection.display_label();
            // Label tab above the box, clamped into the frame at the top edge.
            let label_w = (text.len() as u32 * (LABEL_HEIGHT / 2)).min(image.width());
            let label_y = (y - LABEL_HEIGHT as i32).max(0);
            let background = Rect::at(x, label_y).of_size(label_w.max(1), LABEL_HEIGHT);
            draw_filled_rect_mut(image, background, color);
            draw_text_mut(
                image,
                Rgb([255, 255, 255]),
                x + 2,
                label_y + 1,
                PxScale::from(LABEL_HEIGHT as f32 - 2.0),
                font,
                &text,
            );
        }
    }
}

/// Stable palette color for a class label.
fn class_color(label: &str) -> Rgb<u8> {
    let hash = label
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    Rgb(PALETTE[hash % PALETTE.len()])
}

fn load_font(path: &Path) -> Option<FontVec> {
    let bytes = std::fs::read(path).ok()?;
    FontVec::try_from_vec(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use framescan_models::BoundingBox;

    fn blank(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([0, 0, 0]))
    }

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new("person", 0.9, BoundingBox::new(x1, y1, x2, y2))
    }

    #[test]
    fn test_annotate_returns_new_buffer() {
        let annotator = FrameAnnotator::with_font(None);
        let original = blank(64, 64);
        let annotated = annotator.annotate(&original, &[detection(10.0, 10.0, 50.0, 50.0)]);

        assert_ne!(original, annotated);
        // Input untouched
        assert_eq!(original, blank(64, 64));
    }

    #[test]
    fn test_annotate_draws_box_border() {
        let annotator = FrameAnnotator::with_font(None);
        let image = blank(64, 64);
        let annotated = annotator.annotate(&image, &[detection(10.0, 10.0, 50.0, 50.0)]);

        let expected = class_color("person");
        assert_eq!(*annotated.get_pixel(10, 10), expected);
        assert_eq!(*annotated.get_pixel(30, 10), expected);
        // Interior untouched
        assert_eq!(*annotated.get_pixel(30, 30), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_annotate_deterministic() {
        let annotator = FrameAnnotator::with_font(None);
        let image = blank(64, 64);
        let dets = vec![detection(5.0, 5.0, 30.0, 30.0), detection(20.0, 20.0, 60.0, 60.0)];

        let a = annotator.annotate(&image, &dets);
        let b = annotator.annotate(&image, &dets);
        assert_eq!(a, b);
    }

    #[test]
    fn test_annotate_no_detections_is_identity() {
        let annotator = FrameAnnotator::with_font(None);
        let image = blank(32, 32);
        let annotated = annotator.annotate(&image, &[]);
        assert_eq!(image, annotated);
    }

    #[test]
    fn test_annotate_clamps_out_of_frame_box() {
        let annotator = FrameAnnotator::with_font(None);
        let image = blank(32, 32);
        // Must not panic on a box hanging over the edge
        let annotated = annotator.annotate(&image, &[detection(-10.0, -10.0, 100.0, 100.0)]);
        assert_ne!(image, annotated);
    }

    #[test]
    fn test_class_color_is_stable() {
        assert_eq!(class_color("person"), class_color("person"));
    }

    #[test]
    fn test_annotate_mut_in_place() {
        let annotator = FrameAnnotator::with_font(None);
        let mut image = blank(64, 64);
        annotator.annotate_mut(&mut image, &[detection(10.0, 10.0, 50.0, 50.0)]);
        assert_eq!(*image.get_pixel(10, 10), class_color("person"));
    }
}
