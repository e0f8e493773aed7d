use std::mem::size_of;

use glam::{vec2, Vec2, Vec3, Vec4};
use itertools::Itertools;

use crate::brush::{BrushMode, DEFAULT_SPRITE_SIZE};
use crate::buffer::GrowableBuffer;
use crate::geom::DamageRect;
use crate::sample::Sample;
use crate::target::DrawBatch;
use crate::InkError;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
	pub position: Vec2,
	pub color: Vec3,
}

static_assertions::const_assert_eq!(size_of::<LineVertex>(), 20);

impl LineVertex {
	pub fn new(position: Vec2, color: Vec3) -> Self {
		Self { position, color }
	}
}

pub const QUAD_TEX_COORDS: [Vec2; 4] = [
	Vec2::new(0.0, 0.0),
	Vec2::new(1.0, 0.0),
	Vec2::new(1.0, 1.0),
	Vec2::new(0.0, 1.0),
];

const QUAD_INDEX_PATTERN: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// The indices of the `quad`-th quad.
pub fn quad_indices(quad: u32) -> [u32; 6] {
	QUAD_INDEX_PATTERN.map(|i| 4 * quad + i)
}

/// Corners of a square of edge `size` centered on `center`, in winding order.
pub fn quad_corners(center: Vec2, size: f32) -> [Vec2; 4] {
	let d = size / 2.0;
	[
		center + vec2(-d, -d),
		center + vec2(d, -d),
		center + vec2(d, d),
		center + vec2(-d, d),
	]
}

// Per-primitive byte footprint of each buffer, used to size initial allocations.
const LINE_BYTES_PER_POINT: usize = 2 * size_of::<LineVertex>();
const POSITION_BYTES_PER_POINT: usize = 4 * size_of::<Vec2>();
const TEX_COORD_BYTES_PER_POINT: usize = 4 * size_of::<Vec2>();
const COLOR_BYTES_PER_POINT: usize = 4 * size_of::<[f32; 4]>();
const INDEX_BYTES_PER_POINT: usize = 6 * size_of::<u32>();

/// Every cursor that must move together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mark {
	line_vertices: usize,
	quad_positions: usize,
	quad_tex_coords: usize,
	quad_colors: usize,
	quad_indices: usize,
	point_count: u32,
	// Queued predicted samples at the time of the mark.
	predicted: usize,
}

/// Counts reported by [`GeometryAccumulator::prepare_draw_with_prediction`], in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedDraw {
	pub committed: u32,
	pub total: u32,
}

impl PreparedDraw {
	pub fn predicted(&self) -> u32 {
		self.total - self.committed
	}
}

/// Turns samples into line and sprite geometry.
///
/// Confirmed samples are written to both families so that the shared point counter stays valid
/// for quad indexing and either family can be drawn at any time. Predicted samples are queued and
/// only materialized, for the active family, between
/// [`prepare_draw_with_prediction`](Self::prepare_draw_with_prediction) and
/// [`rollback_prediction`](Self::rollback_prediction).
#[derive(Debug)]
pub struct GeometryAccumulator {
	line_vertices: GrowableBuffer,
	quad_positions: GrowableBuffer,
	quad_tex_coords: GrowableBuffer,
	quad_colors: GrowableBuffer,
	quad_indices: GrowableBuffer,

	point_count: u32,
	previous: Option<LineVertex>,
	predicted: Vec<Sample>,
	applied: Option<Mark>,
	corrected_rollbacks: u64,

	mode: BrushMode,
	sprite_size: f32,
}

impl Default for GeometryAccumulator {
	fn default() -> Self {
		Self::new(BrushMode::default(), 1024, isize::MAX as usize)
	}
}

impl GeometryAccumulator {
	/// `initial_capacity` is in points; `limit` caps every buffer, in bytes.
	pub fn new(mode: BrushMode, initial_capacity: usize, limit: usize) -> Self {
		let buffer = |bytes_per_point: usize| {
			GrowableBuffer::with_limit(initial_capacity.saturating_mul(bytes_per_point), limit)
		};
		let mut accumulator = Self {
			line_vertices: buffer(LINE_BYTES_PER_POINT),
			quad_positions: buffer(POSITION_BYTES_PER_POINT),
			quad_tex_coords: buffer(TEX_COORD_BYTES_PER_POINT),
			quad_colors: buffer(COLOR_BYTES_PER_POINT),
			quad_indices: buffer(INDEX_BYTES_PER_POINT),
			point_count: 0,
			previous: None,
			predicted: Vec::new(),
			applied: None,
			corrected_rollbacks: 0,
			mode,
			sprite_size: DEFAULT_SPRITE_SIZE,
		};
		accumulator.set_mode(mode);
		accumulator
	}

	pub fn mode(&self) -> BrushMode {
		self.mode
	}

	/// Changes the family handed to the draw call. A sprite mode also resizes every quad to its
	/// size.
	pub fn set_mode(&mut self, mode: BrushMode) {
		self.mode = mode;
		if let BrushMode::Sprite { size } = mode {
			self.set_sprite_size(size);
		}
	}

	/// Resizes every committed quad, and those built from now on, to `size`.
	pub fn set_sprite_size(&mut self, size: f32) {
		if size == self.sprite_size {
			return;
		}
		self.sprite_size = size;
		self.resize_quads();
	}

	// Quad centers are the endpoints of the committed line segments.
	fn resize_quads(&mut self) {
		let size = self.sprite_size;
		let quads = self.quad_positions.position() / size_of::<[Vec2; 4]>();
		let corners = self
			.line_vertices()
			.chunks_exact(2)
			.take(quads)
			.flat_map(|segment| quad_corners(segment[1].position, size))
			.collect_vec();
		let bytes: &[u8] = bytemuck::cast_slice(&corners);
		self.quad_positions.snapshot_mut()[..bytes.len()].copy_from_slice(bytes);
	}

	pub fn point_count(&self) -> u32 {
		self.point_count
	}

	pub fn line_vertex_count(&self) -> u32 {
		(self.line_vertices.position() / size_of::<LineVertex>()) as u32
	}

	pub fn index_count(&self) -> u32 {
		(self.quad_indices.position() / size_of::<u32>()) as u32
	}

	pub fn predicted_len(&self) -> usize {
		self.predicted.len()
	}

	/// True between a prepare and its rollback.
	pub fn is_prediction_applied(&self) -> bool {
		self.applied.is_some()
	}

	/// Number of times a prepare had to undo a prediction nobody rolled back.
	pub fn corrected_rollbacks(&self) -> u64 {
		self.corrected_rollbacks
	}

	/// The last confirmed point of the current stroke, if one is in progress.
	pub fn last_point(&self) -> Option<Vec2> {
		self.previous.map(|v| v.position)
	}

	/// Total allocated bytes across all buffers.
	pub fn capacity(&self) -> usize {
		self.buffers().map(GrowableBuffer::capacity).sum()
	}

	pub fn line_vertices(&self) -> Vec<LineVertex> {
		bytemuck::pod_collect_to_vec(self.line_vertices.snapshot())
	}

	pub fn quad_positions(&self) -> Vec<Vec2> {
		bytemuck::pod_collect_to_vec(self.quad_positions.snapshot())
	}

	pub fn quad_index_list(&self) -> Vec<u32> {
		bytemuck::pod_collect_to_vec(self.quad_indices.snapshot())
	}

	/// Integer bounds of every point currently in the buffers.
	pub fn content_bounds(&self) -> Option<DamageRect> {
		self
			.line_vertices()
			.into_iter()
			.map(|v| DamageRect::from_point(v.position))
			.reduce(DamageRect::union)
	}

	fn buffers(&self) -> impl Iterator<Item = &GrowableBuffer> {
		[
			&self.line_vertices,
			&self.quad_positions,
			&self.quad_tex_coords,
			&self.quad_colors,
			&self.quad_indices,
		]
		.into_iter()
	}

	fn mark(&self) -> Mark {
		Mark {
			line_vertices: self.line_vertices.position(),
			quad_positions: self.quad_positions.position(),
			quad_tex_coords: self.quad_tex_coords.position(),
			quad_colors: self.quad_colors.position(),
			quad_indices: self.quad_indices.position(),
			point_count: self.point_count,
			predicted: self.predicted.len(),
		}
	}

	fn restore(&mut self, mark: Mark) {
		self.line_vertices.set_position(mark.line_vertices);
		self.quad_positions.set_position(mark.quad_positions);
		self.quad_tex_coords.set_position(mark.quad_tex_coords);
		self.quad_colors.set_position(mark.quad_colors);
		self.quad_indices.set_position(mark.quad_indices);
		self.point_count = mark.point_count;
	}

	pub fn begin_stroke(&mut self) {
		self.previous = None;
		self.predicted.clear();
	}

	pub fn end_stroke(&mut self) {
		self.previous = None;
	}

	pub fn add_confirmed(&mut self, sample: Sample) -> Result<(), InkError> {
		debug_assert!(!self.is_prediction_applied(), "confirmed sample added during a draw");
		let mark = self.mark();
		let vertex = LineVertex::new(sample.position, sample.color);
		let start = self.previous.unwrap_or(vertex);
		let result = self
			.line_vertices
			.append_pod(&[start, vertex])
			.and_then(|()| self.push_quad(&sample));
		match result {
			Ok(()) => {
				self.previous = Some(vertex);
				self.point_count += 1;
				Ok(())
			}
			Err(error) => {
				self.restore(mark);
				Err(error)
			}
		}
	}

	pub fn add_predicted(&mut self, sample: Sample) {
		self.predicted.push(sample);
	}

	pub fn clear_prediction(&mut self) {
		self.predicted.clear();
	}

	fn push_quad(&mut self, sample: &Sample) -> Result<(), InkError> {
		let color: Vec4 = sample.color.extend(1.0);
		self
			.quad_positions
			.append_pod(&quad_corners(sample.position, self.sprite_size))?;
		self.quad_tex_coords.append_pod(&QUAD_TEX_COORDS)?;
		self.quad_colors.append_pod(&[color.to_array(); 4])?;
		self.quad_indices.append_pod(&quad_indices(self.point_count))
	}

	fn push_predicted(&mut self) -> Result<(), InkError> {
		let predicted = std::mem::take(&mut self.predicted);
		let result = self.push_predicted_samples(&predicted);
		self.predicted = predicted;
		result
	}

	fn push_predicted_samples(&mut self, predicted: &[Sample]) -> Result<(), InkError> {
		match self.mode {
			BrushMode::Line { .. } => {
				let vertices = predicted
					.iter()
					.map(|s| LineVertex::new(s.position, s.color))
					.collect_vec();
				let Some(&first) = vertices.first() else {
					return Ok(());
				};
				let start = self.previous.unwrap_or(first);
				let segments = std::iter::once(start)
					.chain(vertices)
					.tuple_windows()
					.flat_map(|(a, b)| [a, b])
					.collect_vec();
				self.line_vertices.append_pod(&segments)?;
				self.point_count += predicted.len() as u32;
			}
			BrushMode::Sprite { .. } => {
				for sample in predicted {
					self.push_quad(sample)?;
					self.point_count += 1;
				}
			}
		}
		Ok(())
	}

	/// Appends the queued prediction after the committed geometry. The previous prediction must
	/// have been rolled back; in debug builds a missing rollback panics, otherwise it is forced
	/// here and counted.
	pub fn prepare_draw_with_prediction(&mut self) -> Result<PreparedDraw, InkError> {
		if let Some(mark) = self.applied.take() {
			if cfg!(debug_assertions) {
				panic!("{}", InkError::PredictionRollbackSkipped);
			}
			tracing::error!("{}; forcing it", InkError::PredictionRollbackSkipped);
			self.restore(mark);
			// What that prepare drew has had its frame.
			let drawn = mark.predicted.min(self.predicted.len());
			self.predicted.drain(..drawn);
			self.corrected_rollbacks += 1;
		}

		let mark = self.mark();
		if let Err(error) = self.push_predicted() {
			self.restore(mark);
			return Err(error);
		}
		self.applied = Some(mark);
		Ok(PreparedDraw {
			committed: mark.point_count,
			total: self.point_count,
		})
	}

	/// Drops the predicted geometry and the queued prediction. Safe to call without a prepare.
	pub fn rollback_prediction(&mut self) {
		if let Some(mark) = self.applied.take() {
			self.restore(mark);
		}
		self.predicted.clear();
	}

	/// Prepares, hands the batch to `draw`, and rolls back whatever `draw` returns.
	pub fn draw_with_prediction<R>(
		&mut self,
		draw: impl FnOnce(&DrawBatch<'_>) -> R,
	) -> Result<R, InkError> {
		if let Err(error) = self.prepare_draw_with_prediction() {
			self.predicted.clear();
			return Err(error);
		}
		let result = draw(&self.batch());
		self.rollback_prediction();
		Ok(result)
	}

	/// Drops all geometry. Memory is kept for reuse.
	pub fn clear(&mut self) {
		self.applied = None;
		self.restore(Mark {
			line_vertices: 0,
			quad_positions: 0,
			quad_tex_coords: 0,
			quad_colors: 0,
			quad_indices: 0,
			point_count: 0,
			predicted: 0,
		});
		self.predicted.clear();
	}

	/// The active family's geometry as it stands.
	pub fn batch(&self) -> DrawBatch<'_> {
		match self.mode {
			BrushMode::Line { width } => DrawBatch::Lines {
				vertices: self.line_vertices.snapshot(),
				vertex_count: self.line_vertex_count(),
				width,
			},
			BrushMode::Sprite { .. } => DrawBatch::Sprites {
				positions: self.quad_positions.snapshot(),
				tex_coords: self.quad_tex_coords.snapshot(),
				colors: self.quad_colors.snapshot(),
				indices: self.quad_indices.snapshot(),
				index_count: self.index_count(),
			},
		}
	}
}
