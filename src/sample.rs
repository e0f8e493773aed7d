use glam::{Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum SampleKind {
	#[display("confirmed")]
	Confirmed,
	#[display("predicted")]
	Predicted,
}

/// One observation, already stamped with the brush color it will be drawn in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
	pub position: Vec2,
	pub color: Vec3,
	pub kind: SampleKind,
}

impl Sample {
	pub fn confirmed(position: Vec2, color: Vec3) -> Self {
		Self {
			position,
			color,
			kind: SampleKind::Confirmed,
		}
	}

	pub fn predicted(position: Vec2, color: Vec3) -> Self {
		Self {
			position,
			color,
			kind: SampleKind::Predicted,
		}
	}

	pub fn is_predicted(&self) -> bool {
		self.kind == SampleKind::Predicted
	}
}

/// A pointer sample as delivered by the input system. Pressure and time are carried through but
/// the renderer only draws flat, fixed-size ink.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct PointerSample {
	pub position: Vec2,
	pub pressure: f32,
	pub t: f32,
}

impl PointerSample {
	pub fn new(x: f32, y: f32) -> Self {
		Self {
			position: Vec2::new(x, y),
			pressure: 1.0,
			t: 0.0,
		}
	}
}

impl From<Vec2> for PointerSample {
	fn from(position: Vec2) -> Self {
		Self {
			position,
			pressure: 1.0,
			t: 0.0,
		}
	}
}

impl From<(f32, f32)> for PointerSample {
	fn from((x, y): (f32, f32)) -> Self {
		Self::new(x, y)
	}
}

/// Returns true if `b` is close enough to `a` that drawing it would only smear the previous dab.
/// Uses the Manhattan distance; the exact distance is not needed.
pub fn are_points_close(a: Vec2, b: Vec2, spacing: f32) -> bool {
	let d = (a - b).abs();
	d.x + d.y < spacing
}

#[cfg(test)]
mod tests {
	use super::*;
	use glam::vec2;

	#[test]
	fn close_points() {
		assert!(are_points_close(vec2(0.0, 0.0), vec2(0.5, 0.5), 2.0));
		assert!(are_points_close(vec2(3.0, 3.0), vec2(2.0, 3.9), 2.0));
		assert!(!are_points_close(vec2(0.0, 0.0), vec2(1.0, 1.0), 2.0));
		assert!(!are_points_close(vec2(0.0, 0.0), vec2(0.0, -2.5), 2.0));
	}

	#[test]
	fn pointer_sample_conversions() {
		let sample: PointerSample = (1.0, 2.0).into();
		assert_eq!(sample.position, vec2(1.0, 2.0));
		assert_eq!(PointerSample::from(vec2(1.0, 2.0)), sample);
	}
}
