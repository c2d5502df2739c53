//! Box and caption rendering for the preview.
//!
//! Pure drawing onto a copy of the frame: the caption `class (confidence)`
//! sits 10 px above the box's top-left corner, box and text in green.

use image::{Rgb, RgbImage};

use crate::detect::Detection;
use crate::frame::Frame;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 2;
const CAPTION_OFFSET: i32 = 10;
const GLYPH_WIDTH: i32 = 5;
const GLYPH_HEIGHT: i32 = 7;
const GLYPH_ADVANCE: i32 = GLYPH_WIDTH + 1;

/// Return a copy of `frame` with `detection` drawn on it.
pub fn annotate(frame: &Frame, detection: &Detection) -> Frame {
    let mut image = frame.to_image();
    draw_detection(&mut image, detection);
    Frame::from_image(image)
}

pub fn draw_detection(image: &mut RgbImage, detection: &Detection) {
    let bbox = detection.bounding_box();
    for inset in 0..BOX_THICKNESS {
        draw_rectangle(
            image,
            bbox.left.saturating_add(inset),
            bbox.top.saturating_add(inset),
            bbox.right.saturating_sub(inset),
            bbox.bottom.saturating_sub(inset),
            BOX_COLOR,
        );
    }

    // Bottom of the caption sits CAPTION_OFFSET above the box; keep it on screen.
    let text_x = bbox.left.max(0);
    let text_y = bbox
        .top
        .saturating_sub(CAPTION_OFFSET + GLYPH_HEIGHT)
        .max(0);
    draw_text(image, text_x, text_y, &detection.caption(), BOX_COLOR);
}

/// One-pixel outline. Edge loops are clipped to the image before iterating.
fn draw_rectangle(image: &mut RgbImage, left: i32, top: i32, right: i32, bottom: i32, color: Rgb<u8>) {
    if left > right || top > bottom {
        return;
    }
    let max_x = image.width() as i32 - 1;
    let max_y = image.height() as i32 - 1;
    for x in left.max(0)..=right.min(max_x) {
        put(image, x, top, color);
        put(image, x, bottom, color);
    }
    for y in top.max(0)..=bottom.min(max_y) {
        put(image, left, y, color);
        put(image, right, y, color);
    }
}

fn draw_text(image: &mut RgbImage, mut x: i32, y: i32, text: &str, color: Rgb<u8>) {
    let max_x = image.width() as i32;
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if x >= max_x {
            break;
        }
        if let Some(rows) = glyph(ch) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                        put(image, x + col, y.saturating_add(row as i32), color);
                    }
                }
            }
        }
        x += GLYPH_ADVANCE;
    }
}

fn put(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

/// 5x7 bitmap glyphs, one byte per row, MSB-left in the low five bits.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x1E, 0x10, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x1E, 0x10, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x19, 0x15, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x0E, 0x01, 0x01, 0x11, 0x0E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x1B, 0x11],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1E, 0x01, 0x01, 0x0E, 0x01, 0x01, 0x1E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        ' ' => [0x00; 7],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> Frame {
        Frame::from_rgb(vec![0u8; (width * height * 3) as usize], width, height).unwrap()
    }

    fn detection() -> Detection {
        Detection {
            class: "plastic".to_string(),
            confidence: 0.92,
            x: 100,
            y: 100,
            width: 50,
            height: 50,
        }
    }

    #[test]
    fn box_corners_are_drawn() {
        let annotated = annotate(&blank(200, 200), &detection()).to_image();
        assert_eq!(*annotated.get_pixel(75, 75), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(125, 125), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(76, 100), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(100, 100), Rgb([0, 0, 0]));
    }

    #[test]
    fn caption_sits_above_box() {
        let annotated = annotate(&blank(200, 200), &detection()).to_image();
        let caption_rows = 58..65;
        let lit = caption_rows
            .flat_map(|y| (75..160).map(move |x| (x, y)))
            .filter(|(x, y)| *annotated.get_pixel(*x, *y) == BOX_COLOR)
            .count();
        assert!(lit > 0, "caption pixels expected above the box");
    }

    #[test]
    fn boxes_past_the_edge_are_clipped() {
        let mut d = detection();
        d.x = 5;
        d.y = 5;
        let annotated = annotate(&blank(32, 32), &d);
        assert_eq!(annotated.width, 32);
        assert_eq!(annotated.height, 32);
    }

    #[test]
    fn huge_boxes_draw_only_visible_edges() {
        let mut d = detection();
        d.x = 0;
        d.y = 0;
        d.width = 1_000_000_000;
        d.height = 1_000_000_000;
        let started = std::time::Instant::now();
        let annotated = annotate(&blank(16, 16), &d).to_image();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        // All four edges are off screen; only the caption lands in the top rows.
        assert!((8..16).all(|y| (0..16).all(|x| *annotated.get_pixel(x, y) == Rgb([0, 0, 0]))));
    }

    #[test]
    fn out_of_range_service_coordinates_do_not_panic() {
        let result = crate::infer::parse_predictions(
            r#"{"predictions": [{"x": 3000000000.0, "y": -3000000000.0,
                "width": 10, "height": 10, "class": "metal", "confidence": 0.5}]}"#,
        )
        .unwrap();
        let best = result.best().unwrap();
        assert_eq!(best.x, i32::MAX);
        let annotated = annotate(&blank(16, 16), best);
        assert_eq!(annotated.width, 16);
    }

    #[test]
    fn caption_is_drawn_without_a_backdrop() {
        let gray = Frame::from_rgb(vec![200u8; 200 * 200 * 3], 200, 200).unwrap();
        let annotated = annotate(&gray, &detection()).to_image();
        // Column 80 is the gap after the first glyph.
        assert_eq!(*annotated.get_pixel(80, 60), Rgb([200, 200, 200]));
        assert_eq!(*annotated.get_pixel(74, 57), Rgb([200, 200, 200]));
    }

    #[test]
    fn source_frame_is_untouched() {
        let frame = blank(200, 200);
        let _ = annotate(&frame, &detection());
        assert!(frame.pixels().iter().all(|b| *b == 0));
    }
}
