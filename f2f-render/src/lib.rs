pub mod render;

pub use ab_glyph::FontArc;

pub use render::{
    FrameStats, Overlay, SkiaRenderer, default_font, load_font, render_text_pixmap,
};
