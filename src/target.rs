use glam::{Vec2, Vec4};

use crate::geom::ScissorRect;
use crate::geometry::LineVertex;

/// Geometry ready to hand to a graphics API. Every buffer is a byte view in native order.
#[derive(Debug, Clone, Copy)]
pub enum DrawBatch<'a> {
	/// A line list: every two vertices form one segment, `width` canvas units wide.
	Lines {
		vertices: &'a [u8],
		vertex_count: u32,
		width: f32,
	},
	/// Indexed textured quads, two triangles each.
	Sprites {
		positions: &'a [u8],
		tex_coords: &'a [u8],
		colors: &'a [u8],
		indices: &'a [u8],
		index_count: u32,
	},
}

impl DrawBatch<'_> {
	/// Number of lines or triangles the batch draws.
	pub fn primitive_count(&self) -> u32 {
		match *self {
			Self::Lines { vertex_count, .. } => vertex_count / 2,
			Self::Sprites { index_count, .. } => index_count / 3,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.primitive_count() == 0
	}

	pub fn to_recorded(&self) -> RecordedBatch {
		match *self {
			Self::Lines {
				vertices, width, ..
			} => RecordedBatch::Lines {
				vertices: bytemuck::pod_collect_to_vec(vertices),
				width,
			},
			Self::Sprites {
				positions,
				tex_coords,
				colors,
				indices,
				..
			} => RecordedBatch::Sprites {
				positions: bytemuck::pod_collect_to_vec(positions),
				tex_coords: bytemuck::pod_collect_to_vec(tex_coords),
				colors: bytemuck::pod_collect_to_vec(colors),
				indices: bytemuck::pod_collect_to_vec(indices),
			},
		}
	}
}

/// The rendering collaborator: a clip primitive and a draw call.
pub trait DrawTarget {
	/// Restricts subsequent draws to `scissor`.
	fn set_scissor(&mut self, scissor: ScissorRect);

	fn draw(&mut self, batch: &DrawBatch<'_>) -> anyhow::Result<()>;
}

impl<T: DrawTarget + ?Sized> DrawTarget for &mut T {
	fn set_scissor(&mut self, scissor: ScissorRect) {
		(**self).set_scissor(scissor)
	}

	fn draw(&mut self, batch: &DrawBatch<'_>) -> anyhow::Result<()> {
		(**self).draw(batch)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedBatch {
	Lines {
		vertices: Vec<LineVertex>,
		width: f32,
	},
	Sprites {
		positions: Vec<Vec2>,
		tex_coords: Vec<Vec2>,
		colors: Vec<Vec4>,
		indices: Vec<u32>,
	},
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
	pub scissor: Option<ScissorRect>,
	pub batch: RecordedBatch,
}

/// A target that keeps a copy of everything drawn to it. Used headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingTarget {
	scissor: Option<ScissorRect>,
	draws: Vec<RecordedDraw>,
	failures_pending: usize,
}

impl RecordingTarget {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn draws(&self) -> &[RecordedDraw] {
		&self.draws
	}

	pub fn last_draw(&self) -> Option<&RecordedDraw> {
		self.draws.last()
	}

	pub fn scissor(&self) -> Option<ScissorRect> {
		self.scissor
	}

	/// Makes the next `count` draws fail.
	pub fn fail_next_draws(&mut self, count: usize) {
		self.failures_pending = count;
	}

	pub fn clear(&mut self) {
		self.draws.clear();
	}
}

impl DrawTarget for RecordingTarget {
	fn set_scissor(&mut self, scissor: ScissorRect) {
		self.scissor = Some(scissor);
	}

	fn draw(&mut self, batch: &DrawBatch<'_>) -> anyhow::Result<()> {
		if self.failures_pending > 0 {
			self.failures_pending -= 1;
			anyhow::bail!("injected draw failure");
		}
		self.draws.push(RecordedDraw {
			scissor: self.scissor,
			batch: batch.to_recorded(),
		});
		Ok(())
	}
}
