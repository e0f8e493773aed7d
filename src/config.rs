use glam::{UVec2, Vec3};

use crate::brush::BrushMode;

/// Construction-time settings for a [`StrokeRenderer`](crate::StrokeRenderer).
///
/// ```
/// let config = stylus_ink::RendererConfig::builder()
/// 	.brush(stylus_ink::BrushMode::sprite())
/// 	.surface(glam::uvec2(640, 480))
/// 	.build();
/// assert_eq!(config.min_sample_spacing, 2.0);
/// ```
#[derive(Debug, Clone, bon::Builder)]
pub struct RendererConfig {
	#[builder(default)]
	pub brush: BrushMode,

	#[builder(default = Vec3::ZERO)]
	pub color: Vec3,

	/// Confirmed samples closer than this (Manhattan distance, in pixels) to the previous one are
	/// dropped.
	#[builder(default = 2.0)]
	pub min_sample_spacing: f32,

	#[builder(default = true)]
	pub filter_close_samples: bool,

	/// Initial size of each geometry buffer, in points.
	#[builder(default = 1024)]
	pub initial_capacity: usize,

	/// Growth limit of each geometry buffer, in bytes.
	#[builder(default = isize::MAX as usize)]
	pub buffer_limit: usize,

	#[builder(default = 256)]
	pub event_capacity: usize,

	pub surface: Option<UVec2>,
}

impl Default for RendererConfig {
	fn default() -> Self {
		Self::builder().build()
	}
}
