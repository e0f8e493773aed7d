use crate::InkError;

const DEFAULT_INITIAL_CAPACITY: usize = 1024;

/// An append-only byte store with a movable write cursor.
///
/// The cursor (`position`) is independent of the allocated capacity. Rewinding the cursor is how
/// geometry is "deleted": the bytes past the cursor stay in memory and are overwritten by the next
/// append. Capacity only ever grows, doubling until a write fits.
#[derive(Debug, Clone)]
pub struct GrowableBuffer {
	// `bytes.len()` is the capacity; everything past `position` is stale.
	bytes: Vec<u8>,
	position: usize,
	limit: usize,
}

impl Default for GrowableBuffer {
	fn default() -> Self {
		Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
	}
}

impl GrowableBuffer {
	pub fn with_capacity(capacity: usize) -> Self {
		Self::with_limit(capacity, isize::MAX as usize)
	}

	/// Creates a buffer that refuses to grow beyond `limit` bytes.
	pub fn with_limit(capacity: usize, limit: usize) -> Self {
		let capacity = capacity.min(limit);
		Self {
			bytes: vec![0; capacity],
			position: 0,
			limit,
		}
	}

	pub fn capacity(&self) -> usize {
		self.bytes.len()
	}

	pub fn limit(&self) -> usize {
		self.limit
	}

	pub fn position(&self) -> usize {
		self.position
	}

	pub fn is_empty(&self) -> bool {
		self.position == 0
	}

	/// Moves the write cursor. Moving it backwards discards everything after it in O(1).
	pub fn set_position(&mut self, position: usize) {
		assert!(
			position <= self.capacity(),
			"cursor {position} past capacity {}",
			self.capacity()
		);
		self.position = position;
	}

	/// Ensures at least `additional` bytes can be written at the cursor without reallocating.
	pub fn reserve(&mut self, additional: usize) -> Result<(), InkError> {
		let limit = self.limit;
		let capacity_exceeded = move |required| InkError::CapacityExceeded { required, limit };
		let required = self
			.position
			.checked_add(additional)
			.ok_or(capacity_exceeded(usize::MAX))?;
		if required <= self.capacity() {
			return Ok(());
		}
		if required > limit {
			Err(capacity_exceeded(required))?;
		}

		let mut capacity = self.capacity().max(1);
		while capacity < required {
			capacity = capacity.saturating_mul(2);
		}
		let capacity = capacity.min(limit);

		let additional = capacity - self.bytes.len();
		self
			.bytes
			.try_reserve_exact(additional)
			.map_err(|_| capacity_exceeded(capacity))?;
		self.bytes.resize(capacity, 0);
		tracing::trace!(capacity, "grew buffer");
		Ok(())
	}

	pub fn append(&mut self, bytes: &[u8]) -> Result<(), InkError> {
		self.reserve(bytes.len())?;
		let end = self.position + bytes.len();
		self.bytes[self.position..end].copy_from_slice(bytes);
		self.position = end;
		Ok(())
	}

	/// Appends plain-old-data values in native byte order.
	pub fn append_pod<T: bytemuck::NoUninit>(&mut self, values: &[T]) -> Result<(), InkError> {
		self.append(bytemuck::cast_slice(values))
	}

	/// The bytes written so far, `[0, position)`.
	pub fn snapshot(&self) -> &[u8] {
		&self.bytes[..self.position]
	}

	/// The bytes written so far, for rewriting in place.
	pub fn snapshot_mut(&mut self) -> &mut [u8] {
		&mut self.bytes[..self.position]
	}
}
