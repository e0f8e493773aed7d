use crate::events::StrokeEvent;

#[derive(Debug, thiserror::Error)]
pub enum InkError {
	#[error("buffer capacity exceeded: {required} bytes required, limit is {limit}")]
	CapacityExceeded { required: usize, limit: usize },

	#[error("`{operation}` is not valid while {state}")]
	InvalidStateTransition {
		operation: &'static str,
		state: crate::StrokeState,
	},

	#[error("prediction was not rolled back before the next draw")]
	PredictionRollbackSkipped,

	#[error("stroke event queue is full")]
	QueueFull(StrokeEvent),

	#[error("stroke event queue is disconnected")]
	Disconnected,

	#[error("draw target failed: {0}")]
	Draw(#[source] anyhow::Error),
}

static_assertions::assert_impl_all!(InkError: std::error::Error, Send, Sync);

/// Running totals of every error the renderer recovered from or surfaced. Nothing is dropped
/// without bumping one of these.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCounters {
	pub capacity_exceeded: u64,
	pub invalid_transitions: u64,
	pub rollbacks_forced: u64,
	pub draw_failures: u64,
}

impl ErrorCounters {
	pub fn record(&mut self, error: &InkError) {
		match error {
			InkError::CapacityExceeded { .. } => self.capacity_exceeded += 1,
			InkError::InvalidStateTransition { .. } => self.invalid_transitions += 1,
			InkError::PredictionRollbackSkipped => self.rollbacks_forced += 1,
			InkError::Draw(_) => self.draw_failures += 1,
			// Queue errors are reported to the producer, which owns the event.
			InkError::QueueFull(_) | InkError::Disconnected => {}
		}
	}

	pub fn total(&self) -> u64 {
		self.capacity_exceeded + self.invalid_transitions + self.rollbacks_forced + self.draw_failures
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn record_counts_by_kind() {
		let mut counters = ErrorCounters::default();
		counters.record(&InkError::CapacityExceeded {
			required: 10,
			limit: 8,
		});
		counters.record(&InkError::InvalidStateTransition {
			operation: "add_samples",
			state: crate::StrokeState::Idle,
		});
		counters.record(&InkError::PredictionRollbackSkipped);
		counters.record(&InkError::Disconnected);
		assert_eq!(counters.capacity_exceeded, 1);
		assert_eq!(counters.invalid_transitions, 1);
		assert_eq!(counters.rollbacks_forced, 1);
		assert_eq!(counters.total(), 3);
	}

	#[test]
	fn messages() {
		let error = InkError::InvalidStateTransition {
			operation: "end_stroke",
			state: crate::StrokeState::Idle,
		};
		assert_eq!(error.to_string(), "`end_stroke` is not valid while idle");
	}
}
