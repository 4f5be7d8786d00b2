//! # Cake Studio Renderer
//!
//! CPU compositing and output pipeline for Cake Studio projects, built on
//! tiny-skia.
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────────────┐
//! │  Project   │──▶│  Compositor  │──▶│  PNG / JPEG          │
//! │  (layers)  │   │  (+FontBook) │   ├──────────────────────┤
//! └────────────┘   └──────┬───────┘   │  PDF / print view    │
//!                         │           └──────────────────────┘
//!                         ▼                      ▲
//!                  ┌──────────────┐              │
//!                  │  Print pass  │──────────────┘
//!                  │  bleed/marks │
//!                  └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod composite;
pub mod error;
pub mod export;
pub mod print;
pub mod text;

pub use composite::{new_surface, render_project_to_surface, Compositor};
pub use error::{RenderError, RenderResult};
pub use export::{
    crop_surface, encode_jpeg, encode_png, flatten, physical_size, print_view_html, ExportBlob,
    ExportConfig, ExportFormat, OutputKind, ProjectExporter, CONTENT_JPEG_QUALITY,
    PRINT_JPEG_QUALITY,
};
#[cfg(feature = "pdf")]
pub use export::encode_pdf;
pub use print::{render_for_print, soft_proof, PrintOptions, PrintSurface, CROP_MARK_LENGTH};
pub use text::{rasterize_text, FontBook, TextRaster};

/// Renderer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
