//! Coordinate mapping, spatial indexing and glyph hit testing for interactive Iced plots.
//!
//! - Linear, log, categorical and composed scales over a shared arena of ranges
//! - Multi-level categorical axes with group padding
//! - Packed spatial index per glyph, for sub-linear point, span, box and lasso hits
//! - Selection and hover bookkeeping across filtered views of a data source
//! - Level-of-detail painting while the user pans and zooms
//!
//! Quick start:
//!
//! ```no_run
//! # use iced::{Point, Rectangle, Size, time::Instant};
//! # use iced_glyph::*;
//! let mut plot = PlotBuilder::new()
//!     .with_frame(Rectangle::new(Point::ORIGIN, Size::new(600.0, 400.0)))
//!     .build()?;
//! let source = ColumnDataSource::new()
//!     .with_column("x", (0..100).map(|i| i as f64).collect::<Vec<_>>())?
//!     .with_column("y", (0..100).map(|i| (i as f64).sqrt()).collect::<Vec<_>>())?;
//! let source = plot.add_source(source);
//! let renderer = GlyphRenderer::new(Scatter::new("x", "y"), plot.coordinates())
//!     .with_visuals(Visuals::filled(Color::from_rgb(0.2, 0.6, 1.0)));
//! plot.add_renderer(source, renderer)?;
//! plot.sync()?;
//!
//! let mut list = DisplayList::new();
//! plot.paint(&mut list, Instant::now());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! With the `canvas` feature, [`DisplayList::draw`] replays a recording onto an iced canvas
//! frame.
pub mod bbox;
pub mod cds_view;
pub mod context;
pub mod dataspec;
pub mod factor;
pub mod factor_range;
pub mod geometry;
pub mod glyphs;
pub mod index;
pub mod plot;
pub mod range;
pub mod renderer;
pub mod scale;
pub mod selection;
pub mod signal;
pub mod source;
pub mod spatial;
pub mod tools;
pub mod transform;
pub mod visuals;

// Iced re-exports.
pub use iced::Color;

// Re-exports of public types.
pub use cds_view::{CdsView, Filter};
pub use context::{Context2d, DisplayList, DrawCommand};
pub use dataspec::{NumberSpec, RaggedSpec};
pub use factor::{Factor, FactorError, FactorMapper, FactorPadding, FactorValue};
pub use factor_range::{FactorRange, FactorRangeConfig};
pub use geometry::{Direction, Geometry, GeometryKind};
pub use glyphs::{
    Glyph, GlyphError, GlyphId, GlyphView, Line, MarkerType, MultiLine, Patches, RectGlyph,
    Scatter, SpatialUnits,
};
pub use index::{FullIndex, SubsetIndex};
pub use plot::{Plot, PlotBuilder, PlotError, SourceId};
pub use range::{
    Bounds, DataRange1d, Follow, Interval, PaddingUnits, Range, Range1d, RangeId, Ranges,
    ScaleHint,
};
pub use renderer::{GlyphRenderer, LodPolicy, RenderState, RendererId, VariantStyle};
pub use scale::{CoordinateMapper, Scale, ScaleError, ScaleKind};
pub use selection::{Selection, SelectionMode};
pub use source::{Cell, Column, ColumnDataSource, DataError, SourceEvent};
pub use spatial::{IndexBox, SpatialIndex};
pub use tools::{BoxSelect, Dimensions, HoverMode, InteractionClock, LassoSelect};
pub use transform::{CoordinateMapping, CoordinateSystem, CoordinateTransform, Frame};
pub use visuals::{FillVisuals, LineDash, LineVisuals, Visuals};
