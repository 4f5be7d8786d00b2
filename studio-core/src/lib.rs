//! # Cake Studio Core
//!
//! Design-canvas logic for the Custom Cake Studio editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 studio-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Project         │  Editor                  │
//! │  - Layers        │  - Active tool           │
//! │  - Masks         │  - Pointer dispatch      │
//! │  - Print setup   │  - Undo / redo           │
//! ├─────────────────────────────────────────────┤
//! │  Selection       │  Region-grow worker      │
//! │  - Polygons      │  - Flood fill            │
//! │  - Clip masks    │  - Contour tracing       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Rendering and export live in `studio-renderer`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod color;
pub mod editor;
pub mod error;
pub mod event;
pub mod grid;
pub mod history;
pub mod layer;
pub mod pixels;
pub mod print;
pub mod project;
pub mod region;
pub mod selection;
pub mod state;
pub mod tools;
pub mod units;
pub mod worker;

pub use color::Color;
pub use editor::Editor;
pub use error::{StudioError, StudioResult};
pub use event::{Modifiers, PointerEvent};
pub use grid::{compute_grid_points, snap_to_grid, CanvasDims, GridCache, GridConfig, GridPoint, GridShape};
pub use history::{History, DEFAULT_HISTORY_DEPTH};
pub use layer::{
    BlendMode, Layer, LayerId, LayerKind, LayerMask, RasterLayer, RasterSource, ShapeGeometry, ShapeLayer,
    StrokeStyle, TextAlign, TextLayer, Transform,
};
pub use pixels::{AlphaBuffer, PixelBuffer};
pub use print::{find_preset, PixelRect, PrintPreset, PrintSettings, PRINT_PRESETS};
pub use project::{LayerPatch, Project};
pub use selection::{Point, Polygon, RegionOp, Selection, SelectionMode, SelectionRegion};
pub use state::{CropFrame, PaintSettings, ShapeKind, Snapshot, StudioState, Viewport};
pub use tools::{Tool, ToolContext, ToolKind};
pub use units::{convert, to_pixels, Unit};
pub use worker::{GrowTicket, RegionGrowRequest, RegionGrowResponse, RegionGrowWorker};

/// Studio core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
