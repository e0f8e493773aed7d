use glam::{uvec2, UVec2};

use super::{InkPainter, WgpuContext};
use crate::geom::{DamageRect, ScissorRect};
use crate::target::{DrawBatch, DrawTarget};

/// Draws ink into a texture view of known size.
#[derive(Debug)]
pub struct GpuInkTarget<'a> {
	context: &'a WgpuContext,
	painter: &'a mut InkPainter,
	view: &'a wgpu::TextureView,
	size: UVec2,
	// `None` once the scissor has been clipped away entirely.
	scissor: Option<ScissorRect>,
}

impl<'a> GpuInkTarget<'a> {
	pub fn new(
		context: &'a WgpuContext,
		painter: &'a mut InkPainter,
		view: &'a wgpu::TextureView,
		size: UVec2,
	) -> Self {
		Self {
			context,
			painter,
			view,
			size,
			scissor: Some(ScissorRect::full(size)),
		}
	}

	pub fn for_texture(
		context: &'a WgpuContext,
		painter: &'a mut InkPainter,
		view: &'a wgpu::TextureView,
		texture: &wgpu::Texture,
	) -> Self {
		Self::new(context, painter, view, uvec2(texture.width(), texture.height()))
	}
}

impl DrawTarget for GpuInkTarget<'_> {
	fn set_scissor(&mut self, scissor: ScissorRect) {
		// wgpu rejects scissor rectangles that leave the attachment.
		let min = uvec2(scissor.x, scissor.y).as_ivec2();
		let max = min + uvec2(scissor.width, scissor.height).as_ivec2();
		self.scissor = DamageRect::new(min, max).clamp(Some(self.size));
	}

	fn draw(&mut self, batch: &DrawBatch<'_>) -> anyhow::Result<()> {
		let Some(scissor) = self.scissor else {
			tracing::trace!("scissor lies outside the target");
			return Ok(());
		};
		self.painter.paint(
			self.context.device(),
			self.context.queue(),
			self.view,
			Some(scissor),
			batch,
		);
		Ok(())
	}
}
