//! A wgpu backend for [`DrawTarget`](crate::DrawTarget).

mod context;
pub use context::*;

mod painter;
pub use painter::*;

mod target;
pub use target::*;
