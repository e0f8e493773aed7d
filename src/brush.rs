/// Default line width, in pixels.
pub const DEFAULT_LINE_WIDTH: f32 = 3.5;

/// Default sprite edge length, in pixels.
pub const DEFAULT_SPRITE_SIZE: f32 = 100.0;

/// The brush family. Both families share accumulation and damage tracking and differ only in the
/// primitives they generate.
#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display)]
pub enum BrushMode {
	/// Segments drawn as a line list.
	#[display("line({width}px)")]
	Line { width: f32 },
	/// Textured square quads centered on each sample.
	#[display("sprite({size}px)")]
	Sprite { size: f32 },
}

impl Default for BrushMode {
	fn default() -> Self {
		Self::line()
	}
}

impl BrushMode {
	pub fn line() -> Self {
		Self::Line {
			width: DEFAULT_LINE_WIDTH,
		}
	}

	pub fn sprite() -> Self {
		Self::Sprite {
			size: DEFAULT_SPRITE_SIZE,
		}
	}

	pub fn is_sprite(&self) -> bool {
		matches!(self, Self::Sprite { .. })
	}

	/// The visual extent of one dab, in pixels.
	pub fn footprint(&self) -> f32 {
		match *self {
			Self::Line { width } => width,
			Self::Sprite { size } => size,
		}
	}

	/// Padding that must be added around raw sample bounds so every pixel the brush touches,
	/// including anti-aliasing, falls inside the damage rectangle.
	pub fn damage_margin(&self) -> i32 {
		self.damage_margin_at_scale(1.0)
	}

	/// [`damage_margin`](Self::damage_margin) for a brush drawn magnified by `scale`.
	pub fn damage_margin_at_scale(&self, scale: f32) -> i32 {
		(self.footprint().max(0.0) * scale / 2.0).ceil() as i32 + 1
	}
}
