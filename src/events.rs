use std::sync::mpsc;

use glam::{Affine2, UVec2, Vec3};

use crate::brush::BrushMode;
use crate::sample::PointerSample;
use crate::InkError;

/// Everything a producer can ask of the renderer, in the order it should happen.
#[derive(Debug, Clone, PartialEq)]
pub enum StrokeEvent {
	BeginStroke(PointerSample),
	AddSamples(Vec<PointerSample>),
	EndStroke(PointerSample),
	CancelStroke,
	AddPrediction(Vec<PointerSample>),
	SetBrushMode(BrushMode),
	SetBrushColor(Vec3),
	ClearAll,
	RedrawAll,
	Resize(UVec2),
	SetViewTransform(Affine2),
}

/// The producer side of the renderer's bounded event queue.
///
/// There is exactly one of these per renderer; it can move to the input thread but cannot be
/// cloned.
#[derive(Debug)]
pub struct StrokeEventSender(mpsc::SyncSender<StrokeEvent>);

static_assertions::assert_impl_all!(StrokeEventSender: Send);
static_assertions::assert_not_impl_any!(StrokeEventSender: Clone);

impl StrokeEventSender {
	/// Queues `event` without blocking. A full queue hands the event back.
	pub fn send(&self, event: StrokeEvent) -> Result<(), InkError> {
		self.0.try_send(event).map_err(|error| match error {
			mpsc::TrySendError::Full(event) => InkError::QueueFull(event),
			mpsc::TrySendError::Disconnected(_) => InkError::Disconnected,
		})
	}

	pub fn begin_stroke(&self, sample: impl Into<PointerSample>) -> Result<(), InkError> {
		self.send(StrokeEvent::BeginStroke(sample.into()))
	}

	pub fn add_samples(
		&self,
		samples: impl IntoIterator<Item = PointerSample>,
	) -> Result<(), InkError> {
		self.send(StrokeEvent::AddSamples(samples.into_iter().collect()))
	}

	pub fn end_stroke(&self, sample: impl Into<PointerSample>) -> Result<(), InkError> {
		self.send(StrokeEvent::EndStroke(sample.into()))
	}

	pub fn cancel_stroke(&self) -> Result<(), InkError> {
		self.send(StrokeEvent::CancelStroke)
	}

	pub fn add_prediction(
		&self,
		samples: impl IntoIterator<Item = PointerSample>,
	) -> Result<(), InkError> {
		self.send(StrokeEvent::AddPrediction(samples.into_iter().collect()))
	}
}

#[derive(Debug)]
pub(crate) struct StrokeEventReceiver(mpsc::Receiver<StrokeEvent>);

impl StrokeEventReceiver {
	/// Everything queued so far, without waiting for more.
	pub fn drain(&self) -> impl Iterator<Item = StrokeEvent> + '_ {
		self.0.try_iter()
	}
}

/// A zero capacity would make every non-blocking send fail, so the queue holds at least one event.
pub(crate) fn event_queue(capacity: usize) -> (StrokeEventSender, StrokeEventReceiver) {
	let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
	(StrokeEventSender(sender), StrokeEventReceiver(receiver))
}
