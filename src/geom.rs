use glam::{IVec2, UVec2, Vec2};

// Points are clamped to this many pixels from the origin, leaving headroom for margins.
const COORDINATE_LIMIT: f32 = (1 << 30) as f32;

/// An axis-aligned integer rectangle in surface pixels. Bounds are inclusive of `min` and extend
/// to `max`, so a single point has zero extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DamageRect {
	pub min: IVec2,
	pub max: IVec2,
}

impl DamageRect {
	pub fn new(min: IVec2, max: IVec2) -> Self {
		debug_assert!(min.x <= max.x && min.y <= max.y);
		Self { min, max }
	}

	/// The whole surface.
	pub fn from_size(size: UVec2) -> Self {
		Self::new(IVec2::ZERO, size.as_ivec2())
	}

	/// The smallest integer rectangle enclosing `point`, clamped to `±2^30`.
	pub fn from_point(point: Vec2) -> Self {
		let point = point.clamp(Vec2::splat(-COORDINATE_LIMIT), Vec2::splat(COORDINATE_LIMIT));
		Self::new(point.floor().as_ivec2(), point.ceil().as_ivec2())
	}

	pub fn expanded_to_contain(self, point: Vec2) -> Self {
		self.union(Self::from_point(point))
	}

	pub fn union(self, other: Self) -> Self {
		Self::new(self.min.min(other.min), self.max.max(other.max))
	}

	pub fn padded(self, margin: i32) -> Self {
		let margin = IVec2::splat(margin);
		Self::new(self.min.saturating_sub(margin), self.max.saturating_add(margin))
	}

	pub fn width(&self) -> i32 {
		self.max.x.saturating_sub(self.min.x)
	}

	pub fn height(&self) -> i32 {
		self.max.y.saturating_sub(self.min.y)
	}

	pub fn contains(&self, point: Vec2) -> bool {
		!(point.x < self.min.x as f32)
			&& !(point.y < self.min.y as f32)
			&& !(point.x > self.max.x as f32)
			&& !(point.y > self.max.y as f32)
	}

	pub fn contains_rect(&self, other: &Self) -> bool {
		self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
	}

	/// Clips to the surface, returning `None` if nothing visible remains. Without a surface size
	/// only the negative half-planes are clipped.
	pub fn clamp(self, surface: Option<UVec2>) -> Option<ScissorRect> {
		let upper = surface.map_or(IVec2::MAX, |s| s.as_ivec2());
		let min = self.min.clamp(IVec2::ZERO, upper);
		let max = self.max.clamp(IVec2::ZERO, upper);
		if max.x <= min.x || max.y <= min.y {
			return None;
		}
		Some(ScissorRect {
			x: min.x as u32,
			y: min.y as u32,
			width: (max.x - min.x) as u32,
			height: (max.y - min.y) as u32,
		})
	}
}

/// The region of the surface that must be redrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DamageRegion {
	#[default]
	Empty,
	Rect(DamageRect),
}

impl DamageRegion {
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}

	pub fn rect(&self) -> Option<DamageRect> {
		match self {
			Self::Empty => None,
			Self::Rect(rect) => Some(*rect),
		}
	}

	pub fn union(self, other: Self) -> Self {
		match (self, other) {
			(Self::Empty, other) => other,
			(this, Self::Empty) => this,
			(Self::Rect(a), Self::Rect(b)) => Self::Rect(a.union(b)),
		}
	}

	pub fn contains(&self, point: Vec2) -> bool {
		self.rect().is_some_and(|r| r.contains(point))
	}

	/// True if every pixel of `other` is also in `self`. The empty region is contained in
	/// everything.
	pub fn contains_region(&self, other: &Self) -> bool {
		match (self, other) {
			(_, Self::Empty) => true,
			(Self::Empty, Self::Rect(_)) => false,
			(Self::Rect(a), Self::Rect(b)) => a.contains_rect(b),
		}
	}
}

impl From<DamageRect> for DamageRegion {
	fn from(rect: DamageRect) -> Self {
		Self::Rect(rect)
	}
}

impl From<Option<DamageRect>> for DamageRegion {
	fn from(rect: Option<DamageRect>) -> Self {
		rect.map_or(Self::Empty, Self::Rect)
	}
}

/// A clip rectangle in the form graphics APIs take it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScissorRect {
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32,
}

impl ScissorRect {
	pub fn full(size: UVec2) -> Self {
		Self {
			x: 0,
			y: 0,
			width: size.x,
			height: size.y,
		}
	}
}
