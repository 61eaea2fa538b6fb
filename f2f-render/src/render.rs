use ab_glyph::{Font, FontArc, Glyph, PxScale, ScaleFont, point};
use anyhow::{Context, Result, anyhow};
use bytemuck::{cast_slice, cast_slice_mut};
use f2f_timing::{HighPrecisionTimer, Timer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tiny_skia::{Color, ColorU8, Paint, Pixmap, PremultipliedColorU8, Rect, Transform};
use tracing::debug;

const MESSAGE_PX: f32 = 36.0;
const HINT_PX: f32 = 20.0;
const CLOCK_PX: f32 = 64.0;
const PANEL_PADDING: f32 = 40.0;
const LINE_GAP: f32 = 24.0;

/// Modal content drawn over the surface image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Overlay {
    #[default]
    None,
    /// Instruction waiting to be dismissed.
    Message(String),
    /// Conversation timer: quadrant label over an `MM:SS` clock.
    Timer { label: String, clock: String },
}

const DEFAULT_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// The bundled DejaVu Sans face.
pub fn default_font() -> Result<FontArc> {
    FontArc::try_from_slice(DEFAULT_FONT).map_err(|e| anyhow!("bundled font: {e}"))
}

pub fn load_font(path: &Path) -> Result<FontArc> {
    let bytes = std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
    FontArc::try_from_vec(bytes).map_err(|e| anyhow!("invalid font {}: {e}", path.display()))
}

pub fn render_text_pixmap<F: Font>(text: &str, font_size: f32, font: &F, color: Color) -> Pixmap {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);

    // 1) Layout with baseline at ascent
    let mut pen_x = 0.0f32;
    let mut glyphs = Vec::<Glyph>::new();
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev) = glyphs.last() {
            pen_x += sf.kern(prev.id, id);
        }
        glyphs.push(Glyph {
            id,
            scale,
            position: point(pen_x, sf.ascent()),
        });
        pen_x += sf.h_advance(id);
    }

    // 2) Union pixel bounds from outlined glyphs
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    let outlines: Vec<_> = glyphs
        .iter()
        .filter_map(|g| font.outline_glyph(g.clone()))
        .collect();
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    let blank = || Pixmap::new(1, 1).unwrap_or_else(|| unreachable!("1x1 pixmap"));
    if outlines.is_empty() {
        return blank();
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let Some(mut pm) = Pixmap::new(w, h) else {
        return blank();
    };

    // 3) Rasterize coverage as premultiplied color
    let stride = w as usize;
    let dst = pm.pixels_mut();
    let cu = color.to_color_u8();

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let i = iy as usize * stride + ix as usize;

            let a = (cov * cu.alpha() as f32 / 255.0).clamp(0.0, 1.0);
            let sa = (a * 255.0) as u8;
            // Overlapping glyph edges keep the stronger coverage.
            if sa <= dst[i].alpha() {
                return;
            }
            if let Some(px) = PremultipliedColorU8::from_rgba(
                (cu.red() as f32 * a) as u8,
                (cu.green() as f32 * a) as u8,
                (cu.blue() as f32 * a) as u8,
                sa,
            ) {
                dst[i] = px;
            }
        });
    }

    pm
}

pub struct FrameStats {
    pub image: Duration,
    pub overlay: Duration,
    pub copy: Duration,
    pub total: Duration,
}

#[derive(Hash, Eq, PartialEq, Clone)]
struct TextKey {
    text: String,
    size_bits: u32,
    rgba: [u8; 4],
}

/// Software renderer for one full-screen surface.
///
/// Images are stretched to the surface size on first use and cached per
/// path. Overlay text is rasterised once per text, size and colour.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),

    font: FontArc,
    background: Color,

    images: HashMap<PathBuf, Pixmap>,
    text_cache: HashMap<TextKey, Pixmap>,

    canvas: Pixmap,
    timer: HighPrecisionTimer,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, font: FontArc) -> Result<Self> {
        let canvas = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("cannot allocate {width}x{height} canvas"))?;

        Ok(SkiaRenderer {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            font,
            background: Color::from_rgba8(128, 128, 128, 255),
            images: HashMap::new(),
            text_cache: HashMap::new(),
            canvas,
            timer: HighPrecisionTimer::new(),
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        if (new_width, new_height) == (self.width, self.height) {
            return Ok(());
        }
        self.canvas = Pixmap::new(new_width, new_height)
            .ok_or_else(|| anyhow!("cannot allocate {new_width}x{new_height} canvas"))?;
        self.width = new_width;
        self.height = new_height;
        self.center = (new_width as f32 / 2.0, new_height as f32 / 2.0);
        // Cached images were scaled for the old size.
        self.images.clear();
        Ok(())
    }

    /// Loads and scales an image ahead of time so the first frame showing it
    /// does not stall.
    pub fn preload(&mut self, path: &Path) -> Result<()> {
        if !self.images.contains_key(path) {
            let pixmap = load_scaled(path, self.width, self.height)?;
            debug!("cached {} at {}x{}", path.display(), self.width, self.height);
            self.images.insert(path.to_path_buf(), pixmap);
        }
        Ok(())
    }

    pub fn render_frame(
        &mut self,
        image: Option<&Path>,
        overlay: &Overlay,
        frame_buffer: &mut [u8],
    ) -> Result<FrameStats> {
        let t_image = {
            let t = self.timer.now();
            self.draw_image(image)?;
            self.timer.elapsed(t)
        };

        let t_overlay = {
            let t = self.timer.now();
            self.draw_overlay(overlay);
            self.timer.elapsed(t)
        };

        let t_copy = {
            let t = self.timer.now();
            let data = self.canvas.data();
            if frame_buffer.len() != data.len() {
                return Err(anyhow!(
                    "frame buffer is {} bytes, canvas is {}",
                    frame_buffer.len(),
                    data.len()
                ));
            }
            frame_buffer.copy_from_slice(data);
            self.timer.elapsed(t)
        };

        Ok(FrameStats {
            image: t_image,
            overlay: t_overlay,
            copy: t_copy,
            total: t_image + t_overlay + t_copy,
        })
    }

    fn draw_image(&mut self, image: Option<&Path>) -> Result<()> {
        let Some(path) = image else {
            self.canvas.fill(self.background);
            return Ok(());
        };
        self.preload(path)?;
        if let Some(pixmap) = self.images.get(path) {
            self.canvas.data_mut().copy_from_slice(pixmap.data());
        }
        Ok(())
    }

    fn draw_overlay(&mut self, overlay: &Overlay) {
        let white = Color::WHITE;
        let grey = Color::from_rgba8(190, 190, 190, 255);
        let lines: Vec<(String, f32, Color)> = match overlay {
            Overlay::None => return,
            Overlay::Message(text) => vec![
                (text.clone(), MESSAGE_PX, white),
                ("Press SPACE or click to continue".to_string(), HINT_PX, grey),
            ],
            Overlay::Timer { label, clock } => vec![
                (label.clone(), MESSAGE_PX, white),
                (clock.clone(), CLOCK_PX, white),
            ],
        };

        let pixmaps: Vec<Pixmap> = lines
            .iter()
            .map(|(text, size, color)| self.text(text, *size, *color))
            .collect();

        let text_w = pixmaps.iter().map(|p| p.width() as f32).fold(0.0, f32::max);
        let text_h: f32 = pixmaps.iter().map(|p| p.height() as f32).sum::<f32>()
            + LINE_GAP * pixmaps.len().saturating_sub(1) as f32;
        let panel_w = (text_w + 2.0 * PANEL_PADDING).max(self.width as f32 * 0.3);
        let panel_h = (text_h + 2.0 * PANEL_PADDING).max(self.height as f32 * 0.2);

        let mut paint = Paint::default();
        paint.set_color(Color::from_rgba8(24, 24, 24, 235));
        if let Some(panel) = Rect::from_xywh(
            self.center.0 - panel_w / 2.0,
            self.center.1 - panel_h / 2.0,
            panel_w,
            panel_h,
        ) {
            self.canvas
                .fill_rect(panel, &paint, Transform::identity(), None);
        }

        let mut y = self.center.1 - text_h / 2.0;
        for pm in &pixmaps {
            let h = pm.height() as f32;
            self.blit_text(pm, (self.center.0, y + h / 2.0));
            y += h + LINE_GAP;
        }
    }

    fn text(&mut self, text: &str, size: f32, color: Color) -> Pixmap {
        let c = color.to_color_u8();
        let key = TextKey {
            text: text.to_string(),
            size_bits: size.to_bits(),
            rgba: [c.red(), c.green(), c.blue(), c.alpha()],
        };
        let font = &self.font;
        self.text_cache
            .entry(key)
            .or_insert_with(|| render_text_pixmap(text, size, font, color))
            .clone()
    }

    /// Alpha-blends a premultiplied pixmap centered at `pos`, clipped to the canvas.
    fn blit_text(&mut self, pm: &Pixmap, pos: (f32, f32)) {
        let (w, h) = (pm.width() as i32, pm.height() as i32);
        let (cw, ch) = (self.width as i32, self.height as i32);

        let x = (pos.0 - w as f32 * 0.5) as i32;
        let y = (pos.1 - h as f32 * 0.5) as i32;

        // Cull fully off-screen
        if x + w <= 0 || y + h <= 0 || x >= cw || y >= ch {
            return;
        }

        let dst_x = x.max(0) as usize;
        let dst_y = y.max(0) as usize;
        let src_x = (-x).max(0) as usize;
        let src_y = (-y).max(0) as usize;
        let copy_w = (w as usize - src_x).min(cw as usize - dst_x);
        let copy_h = (h as usize - src_y).min(ch as usize - dst_y);

        let src_u32: &[u32] = cast_slice(pm.data());
        let dst_u32: &mut [u32] = cast_slice_mut(self.canvas.data_mut());

        for row in 0..copy_h {
            let src_row = (src_y + row) * w as usize + src_x;
            let dst_row = (dst_y + row) * cw as usize + dst_x;

            for i in 0..copy_w {
                let s = src_u32[src_row + i];
                let sa = s >> 24;
                if sa == 0 {
                    continue;
                }
                let d = dst_u32[dst_row + i];
                let inv = 255 - sa;

                let blend = |shift: u32| {
                    let sc = (s >> shift) & 0xFF;
                    let dc = (d >> shift) & 0xFF;
                    (sc + (dc * inv + 127) / 255).min(255)
                };

                dst_u32[dst_row + i] =
                    (blend(24) << 24) | (blend(16) << 16) | (blend(8) << 8) | blend(0);
            }
        }
    }
}

/// Decodes an image and stretches it to exactly `width`x`height`.
fn load_scaled(path: &Path, width: u32, height: u32) -> Result<Pixmap> {
    let rgba = image::open(path)
        .with_context(|| format!("loading image {}", path.display()))?
        .resize_exact(width, height, image::imageops::FilterType::Triangle)
        .into_rgba8();

    let mut pixmap =
        Pixmap::new(width, height).ok_or_else(|| anyhow!("cannot allocate {width}x{height}"))?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}
