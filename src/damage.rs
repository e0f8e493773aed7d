use glam::Vec2;

use crate::geom::{DamageRect, DamageRegion};

/// Accumulates the bounding box of everything touched since the last reset.
///
/// Raw bounds only ever grow; the brush margin is applied when exporting so that switching
/// brushes mid-frame pads the whole region consistently.
#[derive(Debug, Clone, Default)]
pub struct DamageTracker {
	bounds: Option<DamageRect>,
	margin: i32,
}

impl DamageTracker {
	pub fn new(margin: i32) -> Self {
		Self {
			bounds: None,
			margin,
		}
	}

	pub fn margin(&self) -> i32 {
		self.margin
	}

	pub fn set_margin(&mut self, margin: i32) {
		self.margin = margin;
	}

	pub fn is_empty(&self) -> bool {
		self.bounds.is_none()
	}

	/// Unpadded bounds.
	pub fn bounds(&self) -> Option<DamageRect> {
		self.bounds
	}

	pub fn add_point(&mut self, point: Vec2) {
		let rect = DamageRect::from_point(point);
		self.bounds = Some(match self.bounds {
			None => rect,
			Some(bounds) => bounds.union(rect),
		});
	}

	pub fn add_points(&mut self, points: impl IntoIterator<Item = Vec2>) {
		for point in points {
			self.add_point(point);
		}
	}

	/// Unions in a rectangle that needs no further padding. It is stored raw, so it comes back
	/// out of [`export_padded`](Self::export_padded) grown by the margin like everything else.
	pub fn add_rect(&mut self, rect: DamageRect) {
		self.bounds = Some(match self.bounds {
			None => rect,
			Some(bounds) => bounds.union(rect),
		});
	}

	pub fn export_padded(&self) -> DamageRegion {
		self.bounds.map(|b| b.padded(self.margin)).into()
	}

	pub fn reset(&mut self) {
		self.bounds = None;
	}
}
