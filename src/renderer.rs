use glam::{Affine2, UVec2, Vec2, Vec3};

use crate::brush::BrushMode;
use crate::config::RendererConfig;
use crate::damage::DamageTracker;
use crate::error::ErrorCounters;
use crate::events::{event_queue, StrokeEvent, StrokeEventReceiver, StrokeEventSender};
use crate::geom::{DamageRect, DamageRegion};
use crate::geometry::GeometryAccumulator;
use crate::sample::{are_points_close, PointerSample, Sample};
use crate::target::DrawTarget;
use crate::util::ResultExt;
use crate::InkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum StrokeState {
	#[display("idle")]
	Idle,
	#[display("stroke active")]
	StrokeActive,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RendererStats {
	pub frames_drawn: u64,
	/// Frames that had damage but drew nothing, because the damage was off-surface or the draw
	/// failed.
	pub frames_skipped: u64,
	pub errors: ErrorCounters,
}

/// Drives strokes from pointer samples to draw calls.
///
/// Samples arrive in screen space. Geometry is stored in canvas space, mapped through the inverse
/// of the view transform, while damage stays in screen space where the scissor is applied.
#[derive(Debug)]
pub struct StrokeRenderer {
	geometry: GeometryAccumulator,
	confirmed_damage: DamageTracker,
	// Accumulates for the whole stroke so every region a prediction has ever covered is repainted.
	prediction_damage: DamageTracker,
	previous_prediction: DamageRegion,

	state: StrokeState,
	last_point: Option<Vec2>,
	mode: BrushMode,
	color: Vec3,
	min_sample_spacing: f32,
	filter_close_samples: bool,
	surface: Option<UVec2>,
	view: Affine2,
	canvas_from_screen: Affine2,

	events: Option<StrokeEventReceiver>,
	stats: RendererStats,
}

impl Default for StrokeRenderer {
	fn default() -> Self {
		Self::new(RendererConfig::default())
	}
}

impl StrokeRenderer {
	pub fn new(config: RendererConfig) -> Self {
		let margin = config.brush.damage_margin();
		Self {
			geometry: GeometryAccumulator::new(
				config.brush,
				config.initial_capacity,
				config.buffer_limit,
			),
			confirmed_damage: DamageTracker::new(margin),
			prediction_damage: DamageTracker::new(margin),
			previous_prediction: DamageRegion::Empty,
			state: StrokeState::Idle,
			last_point: None,
			mode: config.brush,
			color: config.color.clamp(Vec3::ZERO, Vec3::ONE),
			min_sample_spacing: config.min_sample_spacing,
			filter_close_samples: config.filter_close_samples,
			surface: config.surface,
			view: Affine2::IDENTITY,
			canvas_from_screen: Affine2::IDENTITY,
			events: None,
			stats: RendererStats::default(),
		}
	}

	/// A renderer fed through a bounded queue, and the only handle that can feed it. Queued events
	/// are applied at the start of each [`render_frame`](Self::render_frame).
	pub fn channel(config: RendererConfig) -> (StrokeEventSender, Self) {
		let (sender, receiver) = event_queue(config.event_capacity);
		let mut renderer = Self::new(config);
		renderer.events = Some(receiver);
		(sender, renderer)
	}

	pub fn state(&self) -> StrokeState {
		self.state
	}

	pub fn brush_mode(&self) -> BrushMode {
		self.mode
	}

	pub fn brush_color(&self) -> Vec3 {
		self.color
	}

	pub fn surface(&self) -> Option<UVec2> {
		self.surface
	}

	pub fn view_transform(&self) -> Affine2 {
		self.view
	}

	pub fn geometry(&self) -> &GeometryAccumulator {
		&self.geometry
	}

	pub fn committed_count(&self) -> u32 {
		self.geometry.point_count()
	}

	pub fn stats(&self) -> RendererStats {
		let mut stats = self.stats;
		stats.errors.rollbacks_forced += self.geometry.corrected_rollbacks();
		stats
	}

	fn record(&mut self, error: &InkError) {
		self.stats.errors.record(error);
	}

	fn invalid_transition(&mut self, operation: &'static str) {
		let error = InkError::InvalidStateTransition {
			operation,
			state: self.state,
		};
		tracing::warn!("{error}");
		self.record(&error);
	}

	fn view_scale(&self) -> f32 {
		let m = self.view.matrix2;
		m.x_axis.length().max(m.y_axis.length())
	}

	fn update_margins(&mut self) {
		let margin = self.mode.damage_margin_at_scale(self.view_scale());
		self.confirmed_damage.set_margin(margin);
		self.prediction_damage.set_margin(margin);
	}

	/// Screen-space bounds of a canvas-space rectangle.
	fn to_screen(&self, rect: DamageRect) -> DamageRect {
		let (min, max) = (rect.min.as_vec2(), rect.max.as_vec2());
		[min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)]
			.map(|corner| DamageRect::from_point(self.view.transform_point2(corner)))
			.into_iter()
			.reduce(DamageRect::union)
			.unwrap_or(rect)
	}

	/// Marks everything drawn so far as damaged. `extra_margin` widens the region for content that
	/// was drawn with a bigger brush than the current one.
	fn damage_content(&mut self, extra_margin: i32) {
		if let Some(surface) = self.surface {
			self.confirmed_damage.add_rect(DamageRect::from_size(surface));
		} else if let Some(bounds) = self.geometry.content_bounds() {
			let bounds = self.to_screen(bounds).padded(extra_margin.max(0));
			self.confirmed_damage.add_rect(bounds);
		}
	}

	fn commit(&mut self, sample: PointerSample) -> Result<(), InkError> {
		let canvas = self.canvas_from_screen.transform_point2(sample.position);
		if let Err(error) = self.geometry.add_confirmed(Sample::confirmed(canvas, self.color)) {
			self.record(&error);
			return Err(error);
		}
		// The new segment spans from the previous point.
		if let Some(last) = self.last_point {
			self.confirmed_damage.add_point(last);
		}
		self.confirmed_damage.add_point(sample.position);
		self.last_point = Some(sample.position);
		Ok(())
	}

	/// Starts a stroke at `sample`. A stroke that is still active is cancelled first, so a lost
	/// pointer-up cannot wedge the surface.
	pub fn begin_stroke(&mut self, sample: impl Into<PointerSample>) -> Result<(), InkError> {
		if self.state == StrokeState::StrokeActive {
			self.invalid_transition("begin_stroke");
			self.cancel_stroke();
		}
		tracing::debug!("begin stroke");
		self.state = StrokeState::StrokeActive;
		self.last_point = None;
		self.geometry.begin_stroke();
		self.commit(sample.into())
	}

	/// Adds confirmed samples, skipping those too close to the last one to be visible.
	pub fn add_samples(
		&mut self,
		samples: impl IntoIterator<Item = PointerSample>,
	) -> Result<(), InkError> {
		let mut samples = samples.into_iter().peekable();
		if samples.peek().is_none() {
			return Ok(());
		}
		if self.state == StrokeState::Idle {
			self.invalid_transition("add_samples");
			return Ok(());
		}
		for sample in samples {
			let too_close = self.filter_close_samples
				&& self
					.last_point
					.is_some_and(|last| are_points_close(last, sample.position, self.min_sample_spacing));
			if too_close {
				tracing::trace!(position = ?sample.position, "skipped close sample");
				continue;
			}
			self.commit(sample)?;
		}
		Ok(())
	}

	/// Adds the final sample, unfiltered, and finishes the stroke.
	pub fn end_stroke(&mut self, sample: impl Into<PointerSample>) -> Result<(), InkError> {
		if self.state == StrokeState::Idle {
			self.invalid_transition("end_stroke");
			return Ok(());
		}
		let result = self.commit(sample.into());
		self.finish_stroke();
		tracing::debug!(points = self.geometry.point_count(), "end stroke");
		result
	}

	/// Finishes the stroke without a final sample. What was committed stays.
	pub fn cancel_stroke(&mut self) {
		if self.state == StrokeState::Idle {
			self.invalid_transition("cancel_stroke");
			return;
		}
		self.finish_stroke();
		tracing::debug!("cancel stroke");
	}

	fn finish_stroke(&mut self) {
		self.geometry.end_stroke();
		self.geometry.clear_prediction();
		self.prediction_damage.reset();
		self.last_point = None;
		self.state = StrokeState::Idle;
	}

	/// Queues predicted samples for the next frame only. Ignored while no stroke is active.
	pub fn add_prediction(&mut self, samples: impl IntoIterator<Item = PointerSample>) {
		if self.state == StrokeState::Idle {
			tracing::trace!("ignored prediction while idle");
			return;
		}
		let mut samples = samples.into_iter().peekable();
		if samples.peek().is_none() {
			return;
		}
		// The first predicted segment starts at the last committed point.
		if let Some(last) = self.last_point {
			self.prediction_damage.add_point(last);
		}
		for sample in samples {
			let canvas = self.canvas_from_screen.transform_point2(sample.position);
			self.geometry.add_predicted(Sample::predicted(canvas, self.color));
			self.prediction_damage.add_point(sample.position);
		}
	}

	pub fn set_brush_mode(&mut self, mode: BrushMode) {
		if mode == self.mode {
			return;
		}
		tracing::debug!(%mode, "set brush mode");
		let previous_margin = self.confirmed_damage.margin();
		self.mode = mode;
		self.geometry.set_mode(mode);
		self.update_margins();
		// Every stroke is redrawn in the new brush.
		self.damage_content(previous_margin - self.confirmed_damage.margin());
	}

	/// Sets the color of samples added from now on.
	pub fn set_brush_color(&mut self, color: Vec3) {
		self.color = color.clamp(Vec3::ZERO, Vec3::ONE);
	}

	/// Removes all committed geometry. An active stroke stays active and keeps chaining from its
	/// last point.
	pub fn clear_all(&mut self) {
		if let Some(bounds) = self.geometry.content_bounds() {
			let bounds = self.to_screen(bounds);
			self.confirmed_damage.add_rect(bounds);
		}
		self.geometry.clear();
		tracing::debug!("cleared");
	}

	/// Damages the whole surface, or everything drawn if the surface size is unknown.
	pub fn redraw_all(&mut self) {
		self.damage_content(0);
	}

	pub fn resize(&mut self, size: UVec2) {
		tracing::info!(width = size.x, height = size.y, "resize");
		self.surface = Some(size);
		self.redraw_all();
	}

	/// Sets the canvas-to-screen transform. Singular transforms are ignored.
	pub fn set_view_transform(&mut self, view: Affine2) {
		let determinant = view.matrix2.determinant();
		if !view.is_finite() || determinant == 0.0 || !determinant.is_finite() {
			tracing::warn!(?view, "ignored singular view transform");
			return;
		}
		// Both where the content was and where it will be.
		self.redraw_all();
		self.view = view;
		self.canvas_from_screen = view.inverse();
		self.update_margins();
		self.redraw_all();
	}

	pub fn apply(&mut self, event: StrokeEvent) {
		tracing::trace!(?event, "apply");
		match event {
			StrokeEvent::BeginStroke(sample) => {
				self.begin_stroke(sample).ok_or_log();
			}
			StrokeEvent::AddSamples(samples) => {
				self.add_samples(samples).ok_or_log();
			}
			StrokeEvent::EndStroke(sample) => {
				self.end_stroke(sample).ok_or_log();
			}
			StrokeEvent::CancelStroke => self.cancel_stroke(),
			StrokeEvent::AddPrediction(samples) => self.add_prediction(samples),
			StrokeEvent::SetBrushMode(mode) => self.set_brush_mode(mode),
			StrokeEvent::SetBrushColor(color) => self.set_brush_color(color),
			StrokeEvent::ClearAll => self.clear_all(),
			StrokeEvent::RedrawAll => self.redraw_all(),
			StrokeEvent::Resize(size) => self.resize(size),
			StrokeEvent::SetViewTransform(view) => self.set_view_transform(view),
		}
	}

	/// Applies every queued event. Returns how many there were.
	pub fn apply_pending_events(&mut self) -> usize {
		let Some(events) = self.events.take() else {
			return 0;
		};
		let mut count = 0;
		for event in events.drain() {
			self.apply(event);
			count += 1;
		}
		self.events = Some(events);
		count
	}

	/// The region the next frame will repaint: new confirmed geometry, every region predictions
	/// have covered this stroke, and the prediction drawn last frame.
	pub fn compute_damage_rect(&self) -> DamageRegion {
		self
			.confirmed_damage
			.export_padded()
			.union(self.prediction_damage.export_padded())
			.union(self.previous_prediction)
	}

	/// Draws the damaged region with the pending prediction included, then forgets the prediction.
	///
	/// On failure nothing is considered drawn and the damage carries over to the next frame.
	pub fn render_frame(&mut self, target: &mut impl DrawTarget) -> Result<DamageRegion, InkError> {
		self.apply_pending_events();

		let damage = self.compute_damage_rect();
		let Some(rect) = damage.rect() else {
			self.geometry.rollback_prediction();
			return Ok(DamageRegion::Empty);
		};
		let Some(scissor) = rect.clamp(self.surface) else {
			tracing::trace!(?rect, "damage is off-surface");
			self.geometry.rollback_prediction();
			self.finish_frame();
			self.stats.frames_skipped += 1;
			return Ok(damage);
		};

		target.set_scissor(scissor);
		let result = match self.geometry.draw_with_prediction(|batch| target.draw(batch)) {
			Ok(Ok(())) => Ok(()),
			Ok(Err(error)) => Err(InkError::Draw(error)),
			Err(error) => Err(error),
		};
		if let Err(error) = result {
			tracing::error!(?rect, "frame not drawn: {error}");
			self.record(&error);
			self.stats.frames_skipped += 1;
			return Err(error);
		}

		self.finish_frame();
		self.stats.frames_drawn += 1;
		tracing::trace!(?scissor, "drew frame");
		Ok(damage)
	}

	fn finish_frame(&mut self) {
		self.confirmed_damage.reset();
		self.previous_prediction = self.prediction_damage.export_padded();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::target::{RecordedBatch, RecordingTarget};
	use crate::test::*;
	use glam::{ivec2, uvec2, vec2, vec3};

	#[test]
	fn idle_operations_are_counted_no_ops() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		renderer.add_samples([PointerSample::new(1.0, 1.0)])?;
		renderer.end_stroke((1.0, 1.0))?;
		renderer.cancel_stroke();
		renderer.add_prediction([PointerSample::new(1.0, 1.0)]);
		assert_eq!(renderer.committed_count(), 0);
		assert_eq!(renderer.stats().errors.invalid_transitions, 3);
		assert_eq!(renderer.compute_damage_rect(), DamageRegion::Empty);
		Ok(())
	}

	#[test]
	fn empty_lists_are_no_ops() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		renderer.add_samples(Vec::new())?;
		renderer.begin_stroke((0.0, 0.0))?;
		renderer.add_samples(Vec::new())?;
		renderer.add_prediction(Vec::new());
		assert_eq!(renderer.committed_count(), 1);
		assert_eq!(renderer.stats().errors.total(), 0);
		Ok(())
	}

	#[test]
	fn begin_while_active_restarts() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		renderer.begin_stroke((0.0, 0.0))?;
		renderer.add_samples([PointerSample::new(10.0, 0.0)])?;
		renderer.begin_stroke((50.0, 50.0))?;
		assert_eq!(renderer.state(), StrokeState::StrokeActive);
		assert_eq!(renderer.stats().errors.invalid_transitions, 1);
		let vertices = renderer.geometry().line_vertices();
		assert_eq!(vertices[4].position, vec2(50.0, 50.0));
		assert_eq!(vertices[5].position, vec2(50.0, 50.0));
		Ok(())
	}

	#[test]
	fn close_samples_are_filtered() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		renderer.begin_stroke((0.0, 0.0))?;
		renderer.add_samples(points(&[(0.5, 0.5), (1.0, 0.9), (3.0, 0.0), (3.5, 0.0)]))?;
		assert_eq!(renderer.committed_count(), 2);
		// The final sample is never filtered.
		renderer.end_stroke((3.6, 0.0))?;
		assert_eq!(renderer.committed_count(), 3);
		Ok(())
	}

	#[test]
	fn filter_can_be_disabled() -> anyhow::Result<()> {
		let config = RendererConfig::builder().filter_close_samples(false).build();
		let mut renderer = StrokeRenderer::new(config);
		renderer.begin_stroke((0.0, 0.0))?;
		renderer.add_samples(points(&[(0.5, 0.5), (1.0, 0.9)]))?;
		assert_eq!(renderer.committed_count(), 3);
		Ok(())
	}

	#[test]
	fn render_consumes_confirmed_damage() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		let mut target = RecordingTarget::new();
		renderer.begin_stroke((10.0, 10.0))?;
		let damage = renderer.render_frame(&mut target)?;
		assert_eq!(damage, DamageRegion::Rect(DamageRect::new(ivec2(7, 7), ivec2(13, 13))));
		assert_eq!(renderer.render_frame(&mut target)?, DamageRegion::Empty);
		assert_eq!(target.draws().len(), 1);
		assert_eq!(renderer.stats().frames_drawn, 1);
		Ok(())
	}

	#[test]
	fn colors_are_stamped_at_commit() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		renderer.set_brush_color(vec3(1.0, 0.0, 0.0));
		renderer.begin_stroke((0.0, 0.0))?;
		renderer.set_brush_color(vec3(0.0, 0.0, 2.0));
		renderer.add_samples(points(&[(5.0, 0.0)]))?;
		let colors = renderer.geometry().line_vertices().iter().map(|v| v.color).collect::<Vec<_>>();
		assert_eq!(colors[..2], [vec3(1.0, 0.0, 0.0); 2]);
		assert_eq!(colors[3], vec3(0.0, 0.0, 1.0));
		Ok(())
	}

	#[test]
	fn brush_switch_repaints_everything() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		let mut target = RecordingTarget::new();
		renderer.begin_stroke((100.0, 100.0))?;
		renderer.end_stroke((120.0, 100.0))?;
		renderer.render_frame(&mut target)?;

		renderer.set_brush_mode(BrushMode::sprite());
		let damage = renderer.render_frame(&mut target)?;
		assert_eq!(damage, DamageRegion::Rect(DamageRect::new(ivec2(49, 49), ivec2(171, 151))));
		assert!(matches!(
			target.last_draw().map(|d| &d.batch),
			Some(RecordedBatch::Sprites { .. })
		));

		// Back to lines: the old sprites are still on screen and must be covered.
		renderer.set_brush_mode(BrushMode::line());
		let damage = renderer.render_frame(&mut target)?;
		assert_eq!(damage, DamageRegion::Rect(DamageRect::new(ivec2(49, 49), ivec2(171, 151))));
		Ok(())
	}

	#[test]
	fn clear_all_damages_old_content() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		let mut target = RecordingTarget::new();
		renderer.begin_stroke((0.0, 0.0))?;
		renderer.end_stroke((40.0, 20.0))?;
		renderer.render_frame(&mut target)?;
		renderer.clear_all();
		assert_eq!(renderer.committed_count(), 0);
		let damage = renderer.render_frame(&mut target)?;
		assert_eq!(damage, DamageRegion::Rect(DamageRect::new(ivec2(-3, -3), ivec2(43, 23))));
		assert_eq!(
			target.last_draw().map(|d| d.batch.clone()),
			Some(RecordedBatch::Lines {
				vertices: vec![],
				width: 3.5
			})
		);
		Ok(())
	}

	#[test]
	fn resize_clamps_scissor_and_repaints() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		let mut target = RecordingTarget::new();
		renderer.resize(uvec2(64, 32));
		renderer.render_frame(&mut target)?;
		assert_eq!(target.scissor(), Some(crate::ScissorRect::full(uvec2(64, 32))));

		renderer.begin_stroke((60.0, 1.0))?;
		renderer.render_frame(&mut target)?;
		assert_eq!(
			target.scissor(),
			Some(crate::ScissorRect {
				x: 57,
				y: 0,
				width: 6,
				height: 4
			})
		);

		// The segment leaving the surface is still clipped and drawn.
		renderer.add_samples(points(&[(500.0, 500.0)]))?;
		let draws = target.draws().len();
		renderer.render_frame(&mut target)?;
		assert_eq!(target.draws().len(), draws + 1);
		// Entirely off-surface: nothing is drawn but the damage is consumed.
		renderer.cancel_stroke();
		renderer.begin_stroke((900.0, 900.0))?;
		renderer.render_frame(&mut target)?;
		assert_eq!(target.draws().len(), draws + 1);
		assert_eq!(renderer.stats().frames_skipped, 1);
		assert_eq!(renderer.compute_damage_rect(), DamageRegion::Empty);
		Ok(())
	}

	#[test]
	fn view_transform_maps_geometry_and_damage() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		let mut target = RecordingTarget::new();
		renderer.set_view_transform(Affine2::from_scale_angle_translation(
			Vec2::splat(2.0),
			0.0,
			vec2(100.0, 0.0),
		));
		assert_eq!(renderer.compute_damage_rect(), DamageRegion::Empty);

		renderer.begin_stroke((110.0, 20.0))?;
		let vertices = renderer.geometry().line_vertices();
		assert_eq!(vertices[0].position, vec2(5.0, 10.0));

		// The line footprint doubles on screen.
		let damage = renderer.render_frame(&mut target)?;
		assert_eq!(damage, DamageRegion::Rect(DamageRect::new(ivec2(105, 15), ivec2(115, 25))));
		Ok(())
	}

	#[test]
	fn singular_view_transform_is_ignored() {
		let mut renderer = StrokeRenderer::default();
		renderer.set_view_transform(Affine2::from_scale(Vec2::new(0.0, 1.0)));
		assert_eq!(renderer.view_transform(), Affine2::IDENTITY);
	}

	#[test]
	fn draw_failure_keeps_damage() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		let mut target = RecordingTarget::new();
		renderer.begin_stroke((10.0, 10.0))?;
		renderer.add_prediction(points(&[(20.0, 10.0)]));
		target.fail_next_draws(1);
		let expected = renderer.compute_damage_rect();
		assert!(matches!(renderer.render_frame(&mut target), Err(InkError::Draw(_))));
		assert!(!renderer.geometry().is_prediction_applied());
		assert_eq!(renderer.geometry().predicted_len(), 0);
		assert_eq!(renderer.stats().errors.draw_failures, 1);
		assert_eq!(renderer.render_frame(&mut target)?, expected);
		Ok(())
	}

	#[test]
	fn capacity_exceeded_is_surfaced_and_recoverable() -> anyhow::Result<()> {
		let config = RendererConfig::builder().initial_capacity(1).buffer_limit(64).build();
		let mut renderer = StrokeRenderer::new(config);
		let mut target = RecordingTarget::new();
		renderer.begin_stroke((0.0, 0.0))?;
		let result = renderer.add_samples(points(&[(10.0, 0.0)]));
		assert!(matches!(result, Err(InkError::CapacityExceeded { .. })));
		assert_eq!(renderer.committed_count(), 1);
		assert_eq!(renderer.stats().errors.capacity_exceeded, 1);

		// Later frames still work.
		let damage = renderer.render_frame(&mut target)?;
		assert!(damage.contains(vec2(0.0, 0.0)));
		assert!(!damage.contains(vec2(10.0, 0.0)));
		Ok(())
	}

	#[test]
	fn prediction_over_capacity_aborts_the_draw() -> anyhow::Result<()> {
		// Room for two committed points in every buffer, but not for two more line segments.
		let config = RendererConfig::builder().initial_capacity(1).buffer_limit(128).build();
		let mut renderer = StrokeRenderer::new(config);
		let mut target = RecordingTarget::new();
		renderer.begin_stroke((0.0, 0.0))?;
		renderer.add_samples(points(&[(10.0, 0.0)]))?;
		renderer.add_prediction(points(&[(20.0, 0.0), (30.0, 0.0)]));
		let expected = renderer.compute_damage_rect();

		let result = renderer.render_frame(&mut target);
		assert!(matches!(result, Err(InkError::CapacityExceeded { .. })));
		assert!(target.draws().is_empty());
		assert!(!renderer.geometry().is_prediction_applied());
		assert_eq!(renderer.geometry().predicted_len(), 0);
		assert_eq!(renderer.geometry().line_vertex_count(), 4);
		assert_eq!(renderer.stats().errors.capacity_exceeded, 1);
		assert_eq!(renderer.stats().frames_skipped, 1);

		// The damage carries over and the next frame draws the committed stroke alone.
		assert_eq!(renderer.compute_damage_rect(), expected);
		assert_eq!(renderer.render_frame(&mut target)?, expected);
		match &target.last_draw().ok_or(anyhow::anyhow!("nothing drawn"))?.batch {
			RecordedBatch::Lines { vertices, .. } => assert_eq!(vertices.len(), 4),
			other => anyhow::bail!("unexpected batch {other:?}"),
		}
		Ok(())
	}

	#[test]
	fn smaller_sprite_after_line_stays_inside_damage() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		let mut target = RecordingTarget::new();
		renderer.begin_stroke((100.0, 100.0))?;
		renderer.end_stroke((120.0, 100.0))?;
		renderer.render_frame(&mut target)?;

		renderer.set_brush_mode(BrushMode::Sprite { size: 10.0 });
		let damage = renderer.render_frame(&mut target)?;
		let positions = match &target.last_draw().ok_or(anyhow::anyhow!("nothing drawn"))?.batch {
			RecordedBatch::Sprites { positions, .. } => positions.clone(),
			other => anyhow::bail!("unexpected batch {other:?}"),
		};
		assert_eq!(positions.len(), 8);
		for corner in positions {
			assert!(damage.contains(corner), "{corner} outside {damage:?}");
		}
		Ok(())
	}

	#[test]
	fn far_samples_do_not_overflow_damage() -> anyhow::Result<()> {
		let mut renderer = StrokeRenderer::default();
		let mut target = RecordingTarget::new();
		renderer.begin_stroke((3.0e9, 0.0))?;
		renderer.add_prediction(points(&[(-3.0e9, 5.0e9)]));
		let damage = renderer.compute_damage_rect();
		let rect = damage.rect().ok_or(anyhow::anyhow!("no damage"))?;
		assert!(rect.min.x < rect.max.x && rect.min.y < rect.max.y);
		assert_eq!(renderer.render_frame(&mut target)?, damage);
		assert_eq!(renderer.stats().frames_drawn, 1);
		Ok(())
	}

	#[test]
	fn queued_capacity_failure_is_reported_once() {
		let config = RendererConfig::builder().initial_capacity(1).buffer_limit(64).build();
		let mut renderer = StrokeRenderer::new(config);
		renderer.apply(StrokeEvent::BeginStroke(PointerSample::new(0.0, 0.0)));
		renderer.apply(StrokeEvent::AddSamples(points(&[(10.0, 0.0)])));
		assert_eq!(renderer.committed_count(), 1);
		assert_eq!(renderer.stats().errors.capacity_exceeded, 1);
		assert_eq!(renderer.stats().errors.total(), 1);
	}

	#[test]
	fn apply_matches_direct_calls() {
		let mut renderer = StrokeRenderer::default();
		renderer.apply(StrokeEvent::SetBrushColor(vec3(0.0, 1.0, 0.0)));
		renderer.apply(StrokeEvent::BeginStroke(PointerSample::new(1.0, 2.0)));
		renderer.apply(StrokeEvent::EndStroke(PointerSample::new(10.0, 2.0)));
		renderer.apply(StrokeEvent::EndStroke(PointerSample::new(10.0, 2.0)));
		assert_eq!(renderer.committed_count(), 2);
		assert_eq!(renderer.state(), StrokeState::Idle);
		assert_eq!(renderer.stats().errors.invalid_transitions, 1);
		assert_eq!(renderer.brush_color(), vec3(0.0, 1.0, 0.0));
	}
}
