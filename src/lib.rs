//! Low-latency ink rendering: pointer samples in, minimal damaged draws out.
//!
//! A [`StrokeRenderer`] turns confirmed and predicted pointer samples into line or sprite
//! geometry, tracks which part of the surface changed, and each frame draws only that part with
//! the prediction appended for exactly one frame.

pub(crate) mod util;

pub mod brush;
pub mod buffer;
pub mod config;
pub mod damage;
mod error;
pub mod events;
pub mod geom;
pub mod geometry;
mod renderer;
pub mod sample;
pub mod target;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use brush::BrushMode;
pub use buffer::GrowableBuffer;
pub use config::RendererConfig;
pub use damage::DamageTracker;
pub use error::*;
pub use events::{StrokeEvent, StrokeEventSender};
pub use geom::{DamageRect, DamageRegion, ScissorRect};
pub use geometry::{GeometryAccumulator, LineVertex, PreparedDraw};
pub use renderer::*;
pub use sample::{PointerSample, Sample, SampleKind};
pub use target::{DrawBatch, DrawTarget, RecordingTarget};
