//! Built-in page painter used when the pdfium library is not available.
//!
//! Walks the first page's content stream with `lopdf` and paints what it can
//! resolve without fonts: filled and stroked paths (as their bounding boxes) and
//! text runs (as solid bars of the run's size). The result is a low-detail thumbnail
//! that still follows the page layout and colours.

use anyhow::{Context, Result};
use image::{imageops, Rgba, RgbaImage};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use tracing::warn;

/// 8.5" x 11" in PDF points.
const US_LETTER_PT: (f32, f32) = (612.0, 792.0);

/// Guards against cyclic `Parent` links in malformed page trees.
const MAX_TREE_DEPTH: usize = 32;

/// Rough glyph box relative to the font size.
const GLYPH_ADVANCE: f32 = 0.5;
const GLYPH_ASCENT: f32 = 0.7;
const GLYPH_DESCENT: f32 = 0.2;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Visible page area in points plus its quarter-turn rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub x0: f32,
    pub y0: f32,
    pub width: f32,
    pub height: f32,
    /// One of 0, 90, 180, 270.
    pub rotate: i64,
}

/// Reads the MediaBox (inherited through the page tree) and `Rotate` of a page.
/// Falls back to US letter when no usable MediaBox exists.
pub fn page_geometry(document: &Document, page_id: ObjectId) -> PageGeometry {
    let rotate = inherited(document, page_id, b"Rotate")
        .and_then(|r| r.as_i64().ok())
        .map(|r| r.rem_euclid(360) / 90 * 90)
        .unwrap_or(0);

    match inherited(document, page_id, b"MediaBox").and_then(|rect| rect_bounds(document, rect)) {
        Some((x0, y0, width, height)) => PageGeometry {
            x0,
            y0,
            width,
            height,
            rotate,
        },
        None => {
            warn!("First page has no usable MediaBox, assuming US letter");
            PageGeometry {
                x0: 0.0,
                y0: 0.0,
                width: US_LETTER_PT.0,
                height: US_LETTER_PT.1,
                rotate,
            }
        }
    }
}

fn inherited<'a>(document: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        let parent = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
        dict = document.get_dictionary(parent).ok()?;
    }
    None
}

fn rect_bounds(document: &Document, rect: &Object) -> Option<(f32, f32, f32, f32)> {
    let rect = match rect {
        Object::Reference(id) => document.get_object(*id).ok()?,
        other => other,
    };
    let values = rect
        .as_array()
        .ok()?
        .iter()
        .map(Object::as_float)
        .collect::<Result<Vec<f32>, _>>()
        .ok()?;
    let [ax, ay, bx, by] = values.as_slice() else {
        return None;
    };
    let (w, h) = ((bx - ax).abs(), (by - ay).abs());
    (w > 0.0 && h > 0.0).then_some((ax.min(*bx), ay.min(*by), w, h))
}

/// Scales a page so its longest side is `max_dimension` pixels.
pub fn scaled_dimensions(width_pt: f32, height_pt: f32, max_dimension: u32) -> (u32, u32) {
    let scale = max_dimension as f32 / width_pt.max(height_pt);
    let width = (width_pt * scale).round().max(1.0) as u32;
    let height = (height_pt * scale).round().max(1.0) as u32;
    (width, height)
}

/// Paints the first page of `document` with its longest displayed side at `max_dimension`.
pub fn paint_first_page(document: &Document, max_dimension: u32) -> Result<RgbaImage> {
    let pages = document.get_pages();
    let (_, &page_id) = pages.iter().next().context("PDF has no pages")?;
    let geometry = page_geometry(document, page_id);

    let (width, height) = scaled_dimensions(geometry.width, geometry.height, max_dimension);
    let mut painter = Painter::new(geometry, width, height);

    match document
        .get_page_content(page_id)
        .map_err(anyhow::Error::from)
        .and_then(|raw| Content::decode(&raw).map_err(anyhow::Error::from))
    {
        Ok(content) => {
            for op in &content.operations {
                painter.apply(&op.operator, &op.operands);
            }
        }
        Err(e) => warn!("Could not decode first page content, preview shows an empty page: {e:#}"),
    }

    Ok(match geometry.rotate {
        90 => imageops::rotate90(&painter.canvas),
        180 => imageops::rotate180(&painter.canvas),
        270 => imageops::rotate270(&painter.canvas),
        _ => painter.canvas,
    })
}

/// Affine matrix `[a b c d e f]` as used by PDF.
type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m` applied first, then `n`.
fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn transform(m: &Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Axis-aligned box in page space.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
}

impl Bounds {
    fn point(x: f32, y: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn extend(&mut self, x: f32, y: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Bounding box of the user-space rectangle `(x0,y0)-(x1,y1)` under `m`.
    fn of_rect(m: &Matrix, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        let (px, py) = transform(m, x0, y0);
        let mut bounds = Bounds::point(px, py);
        for (x, y) in [(x1, y0), (x0, y1), (x1, y1)] {
            let (px, py) = transform(m, x, y);
            bounds.extend(px, py);
        }
        bounds
    }
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    fill: Rgba<u8>,
    stroke: Rgba<u8>,
    line_width: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            fill: BLACK,
            stroke: BLACK,
            line_width: 1.0,
        }
    }
}

struct Painter {
    canvas: RgbaImage,
    geometry: PageGeometry,
    scale: f32,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    /// Completed and open subpaths, already in page space.
    path: Vec<Bounds>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font_size: f32,
    leading: f32,
}

impl Painter {
    fn new(geometry: PageGeometry, width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(width, height, WHITE),
            scale: width as f32 / geometry.width,
            geometry,
            state: GraphicsState::default(),
            saved: Vec::new(),
            path: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font_size: 12.0,
            leading: 0.0,
        }
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        let nums: Vec<f32> = operands.iter().filter_map(|o| o.as_float().ok()).collect();

        match (operator, nums.as_slice()) {
            ("q", _) => self.saved.push(self.state),
            ("Q", _) => {
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
            ("cm", &[a, b, c, d, e, f]) => self.state.ctm = multiply(&[a, b, c, d, e, f], &self.state.ctm),
            ("w", &[width]) => self.state.line_width = width,

            ("g", &[gray]) => self.state.fill = gray_color(gray),
            ("G", &[gray]) => self.state.stroke = gray_color(gray),
            ("rg", &[r, g, b]) => self.state.fill = rgb_color(r, g, b),
            ("RG", &[r, g, b]) => self.state.stroke = rgb_color(r, g, b),
            ("k", &[c, m, y, k]) => self.state.fill = cmyk_color(c, m, y, k),
            ("K", &[c, m, y, k]) => self.state.stroke = cmyk_color(c, m, y, k),
            ("sc" | "scn", values) => {
                if let Some(color) = color_from(values) {
                    self.state.fill = color;
                }
            }
            ("SC" | "SCN", values) => {
                if let Some(color) = color_from(values) {
                    self.state.stroke = color;
                }
            }

            ("re", &[x, y, w, h]) => {
                let bounds = Bounds::of_rect(&self.state.ctm, x, y, x + w, y + h);
                self.path.push(bounds);
            }
            ("m", &[x, y]) => {
                let (px, py) = transform(&self.state.ctm, x, y);
                self.path.push(Bounds::point(px, py));
            }
            ("l" | "c" | "v" | "y", points) => {
                for pair in points.chunks_exact(2) {
                    let (px, py) = transform(&self.state.ctm, pair[0], pair[1]);
                    match self.path.last_mut() {
                        Some(bounds) => bounds.extend(px, py),
                        None => self.path.push(Bounds::point(px, py)),
                    }
                }
            }
            ("f" | "F" | "f*", _) => self.fill_path(),
            ("S" | "s", _) => self.stroke_path(),
            ("B" | "B*" | "b" | "b*", _) => {
                let path = self.path.clone();
                self.fill_path();
                self.path = path;
                self.stroke_path();
            }
            ("n", _) => self.path.clear(),

            ("BT", _) => {
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            ("Tf", &[size]) => self.font_size = size,
            ("TL", &[leading]) => self.leading = leading,
            ("Td", &[tx, ty]) => self.next_line(tx, ty),
            ("TD", &[tx, ty]) => {
                self.leading = -ty;
                self.next_line(tx, ty);
            }
            ("Tm", &[a, b, c, d, e, f]) => {
                self.text_matrix = [a, b, c, d, e, f];
                self.line_matrix = self.text_matrix;
            }
            ("T*", _) => self.next_line(0.0, -self.leading),
            ("Tj", _) => self.show_text(operands),
            ("TJ", _) => {
                if let Some(Ok(items)) = operands.first().map(Object::as_array) {
                    self.show_text(items);
                }
            }
            ("'", _) => {
                self.next_line(0.0, -self.leading);
                self.show_text(operands);
            }
            ("\"", _) => {
                self.next_line(0.0, -self.leading);
                self.show_text(operands.get(2..).unwrap_or_default());
            }
            _ => {}
        }
    }

    fn next_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// Paints each string operand as a bar and advances the text position past it.
    fn show_text(&mut self, operands: &[Object]) {
        let glyphs: usize = operands
            .iter()
            .map(|o| match o {
                Object::String(bytes, _) => bytes.len(),
                _ => 0,
            })
            .sum();
        if glyphs == 0 {
            return;
        }

        let size = self.font_size.abs();
        let advance = glyphs as f32 * GLYPH_ADVANCE * size;
        let to_page = multiply(&self.text_matrix, &self.state.ctm);
        let bounds = Bounds::of_rect(
            &to_page,
            0.0,
            -GLYPH_DESCENT * size,
            advance,
            GLYPH_ASCENT * size,
        );
        self.fill_bounds(bounds, self.state.fill);

        self.text_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, advance, 0.0], &self.text_matrix);
    }

    fn fill_path(&mut self) {
        for bounds in std::mem::take(&mut self.path) {
            self.fill_bounds(bounds, self.state.fill);
        }
    }

    fn stroke_path(&mut self) {
        let half = (self.state.line_width / 2.0).max(0.5 / self.scale);
        for b in std::mem::take(&mut self.path) {
            let edges = [
                (b.min_x - half, b.min_y - half, b.max_x + half, b.min_y + half),
                (b.min_x - half, b.max_y - half, b.max_x + half, b.max_y + half),
                (b.min_x - half, b.min_y - half, b.min_x + half, b.max_y + half),
                (b.max_x - half, b.min_y - half, b.max_x + half, b.max_y + half),
            ];
            for (x0, y0, x1, y1) in edges {
                let edge = Bounds {
                    min_x: x0,
                    min_y: y0,
                    max_x: x1,
                    max_y: y1,
                };
                self.fill_bounds(edge, self.state.stroke);
            }
        }
    }

    /// Fills a page-space box, flipping y so the page top is row 0.
    fn fill_bounds(&mut self, bounds: Bounds, color: Rgba<u8>) {
        let (width, height) = self.canvas.dimensions();
        let to_px = |v: f32, limit: u32| (v * self.scale).round().clamp(0.0, limit as f32) as u32;

        let x0 = to_px(bounds.min_x - self.geometry.x0, width);
        let x1 = to_px(bounds.max_x - self.geometry.x0, width);
        let top = self.geometry.y0 + self.geometry.height;
        let y0 = to_px(top - bounds.max_y, height);
        let y1 = to_px(top - bounds.min_y, height);

        // Hairlines still get one pixel.
        let x1 = if x1 == x0 && x0 < width { x0 + 1 } else { x1 };
        let y1 = if y1 == y0 && y0 < height { y0 + 1 } else { y1 };

        for y in y0..y1 {
            for x in x0..x1 {
                self.canvas.put_pixel(x, y, color);
            }
        }
    }
}

fn channel(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn gray_color(gray: f32) -> Rgba<u8> {
    let v = channel(gray);
    Rgba([v, v, v, 255])
}

fn rgb_color(r: f32, g: f32, b: f32) -> Rgba<u8> {
    Rgba([channel(r), channel(g), channel(b), 255])
}

fn cmyk_color(c: f32, m: f32, y: f32, k: f32) -> Rgba<u8> {
    let k = 1.0 - k.clamp(0.0, 1.0);
    rgb_color((1.0 - c) * k, (1.0 - m) * k, (1.0 - y) * k)
}

/// `sc`/`scn` operands; the component count picks the colour space.
fn color_from(values: &[f32]) -> Option<Rgba<u8>> {
    match *values {
        [gray] => Some(gray_color(gray)),
        [r, g, b] => Some(rgb_color(r, g, b)),
        [c, m, y, k] => Some(cmyk_color(c, m, y, k)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::pdf::tests::build_pdf_with_content;

    fn paint(content: &[u8], media_box: [i64; 4], max_dimension: u32) -> RgbaImage {
        let bytes = build_pdf_with_content(1, media_box, false, content);
        let document = Document::load_mem(&bytes).unwrap();
        paint_first_page(&document, max_dimension).unwrap()
    }

    fn is_dark(pixel: &Rgba<u8>) -> bool {
        pixel.0[..3].iter().all(|&c| c < 64)
    }

    #[test]
    fn test_scaled_dimensions_letter() {
        assert_eq!(scaled_dimensions(612.0, 792.0, 1600), (1236, 1600));
    }

    #[test]
    fn test_scaled_dimensions_landscape() {
        assert_eq!(scaled_dimensions(842.0, 595.0, 842), (842, 595));
    }

    #[test]
    fn test_filled_page_is_painted() {
        let image = paint(b"0 0 0 rg 0 0 612 792 re f", [0, 0, 612, 792], 400);
        assert!(is_dark(image.get_pixel(image.width() / 2, image.height() / 2)));
    }

    #[test]
    fn test_empty_content_stays_white() {
        let image = paint(b"", [0, 0, 612, 792], 400);
        assert!(image.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn test_fill_colour_is_used() {
        let image = paint(b"1 0 0 rg 100 100 200 200 re f", [0, 0, 400, 400], 400);
        assert_eq!(*image.get_pixel(200, 200), Rgba([255, 0, 0, 255]));
        assert_eq!(*image.get_pixel(50, 50), WHITE);
    }

    #[test]
    fn test_text_is_painted_near_its_position() {
        // Top-left of a 400pt square page, 20pt text.
        let image = paint(b"BT /F1 20 Tf 20 360 Td (Hello) Tj ET", [0, 0, 400, 400], 400);
        let dark_rows: Vec<u32> = (0..image.height())
            .filter(|&y| (0..image.width()).any(|x| is_dark(image.get_pixel(x, y))))
            .collect();
        assert!(!dark_rows.is_empty());
        assert!(dark_rows.iter().all(|&y| y < 60));
        assert!(is_dark(image.get_pixel(30, 30)));
        assert_eq!(*image.get_pixel(300, 30), WHITE);
    }

    #[test]
    fn test_saved_state_restores_transform() {
        let image = paint(
            b"q 1 0 0 1 200 0 cm Q 0 g 0 0 100 100 re f",
            [0, 0, 400, 400],
            400,
        );
        assert!(is_dark(image.get_pixel(50, 350)));
        assert_eq!(*image.get_pixel(250, 350), WHITE);
    }

    #[test]
    fn test_offset_media_box_maps_to_origin() {
        let image = paint(b"0 g 100 100 50 50 re f", [100, 100, 300, 300], 200);
        assert!(is_dark(image.get_pixel(10, 190)));
    }

    #[test]
    fn test_rotated_page_swaps_dimensions() {
        let mut bytes = build_pdf_with_content(1, [0, 0, 200, 100], false, b"");
        let mut document = Document::load_mem(&bytes).unwrap();
        let page_id = *document.get_pages().values().next().unwrap();
        document
            .get_dictionary_mut(page_id)
            .unwrap()
            .set("Rotate", 90i64);
        bytes.clear();
        document.save_to(&mut bytes).unwrap();

        let document = Document::load_mem(&bytes).unwrap();
        let image = paint_first_page(&document, 100).unwrap();
        assert_eq!(image.dimensions(), (50, 100));
    }
}
