use std::thread;
use std::time::Duration;

use glam::{uvec2, vec2, vec3, Vec2};
use itertools::Itertools;
use stylus_ink::{
	BrushMode, InkError, PointerSample, RecordingTarget, RendererConfig, StrokeEvent,
	StrokeEventSender, StrokeRenderer,
};

fn configure_tracing() -> anyhow::Result<()> {
	let max_level = if cfg!(debug_assertions) {
		tracing::Level::TRACE
	} else {
		tracing::Level::INFO
	};
	tracing::subscriber::set_global_default(
		tracing_subscriber::FmtSubscriber::builder()
			.with_max_level(max_level)
			.finish(),
	)?;
	Ok(())
}

fn configure_logging() -> anyhow::Result<()> {
	configure_tracing()?;

	// Redirect `log` to `tracing`, for dependencies such as `wgpu`.
	#[cfg(feature = "log")]
	tracing_log::LogTracer::init()?;

	Ok(())
}

/// Sends `event`, waiting for the renderer to make room if the queue is full.
fn send(sender: &StrokeEventSender, mut event: StrokeEvent) -> Result<(), InkError> {
	loop {
		match sender.send(event) {
			Err(InkError::QueueFull(returned)) => {
				event = returned;
				thread::sleep(Duration::from_millis(1));
			}
			result => return result,
		}
	}
}

/// A wavy stroke across the surface.
fn stroke_path(row: f32) -> impl Iterator<Item = Vec2> {
	(0..120).map(move |i| {
		let t = i as f32 / 119.0;
		vec2(50.0 + 700.0 * t, row + 40.0 * (t * 12.0).sin())
	})
}

/// Plays two strokes into the queue the way a pointer driver would: batches of confirmed
/// samples, each followed by a short linear prediction.
fn produce(sender: StrokeEventSender) -> Result<(), InkError> {
	send(&sender, StrokeEvent::Resize(uvec2(800, 600)))?;
	let strokes = [
		(BrushMode::line(), vec3(0.1, 0.1, 0.1), 200.0),
		(BrushMode::Sprite { size: 24.0 }, vec3(0.2, 0.3, 0.9), 400.0),
	];
	for (brush, color, row) in strokes {
		send(&sender, StrokeEvent::SetBrushMode(brush))?;
		send(&sender, StrokeEvent::SetBrushColor(color))?;

		let path = stroke_path(row).collect_vec();
		let [first, middle @ .., last] = path.as_slice() else {
			continue;
		};
		send(&sender, StrokeEvent::BeginStroke((*first).into()))?;
		for batch in middle.chunks(4) {
			send(
				&sender,
				StrokeEvent::AddSamples(batch.iter().copied().map(PointerSample::from).collect()),
			)?;
			if let [.., a, b] = batch {
				let step = *b - *a;
				let predicted = (1..=2).map(|k| PointerSample::from(*b + step * k as f32));
				send(&sender, StrokeEvent::AddPrediction(predicted.collect()))?;
			}
			thread::sleep(Duration::from_millis(4));
		}
		send(&sender, StrokeEvent::EndStroke((*last).into()))?;
	}
	Ok(())
}

fn main() {
	if let Err(error) = configure_logging() {
		// We can technically continue without logging.
		eprintln!("{error}");
	}

	let (sender, mut renderer) = StrokeRenderer::channel(RendererConfig::default());
	let producer = thread::spawn(move || produce(sender));

	let mut target = RecordingTarget::new();
	for frame in 0u64.. {
		let finished = producer.is_finished();
		match renderer.render_frame(&mut target) {
			Ok(damage) => {
				if let Some(rect) = damage.rect() {
					tracing::info!(frame, min = %rect.min, max = %rect.max, "frame");
				}
			}
			Err(error) => tracing::error!(frame, "{error}"),
		}
		if finished {
			break;
		}
		thread::sleep(Duration::from_millis(8));
	}

	match producer.join() {
		Ok(Ok(())) => {}
		Ok(Err(error)) => tracing::error!("producer stopped: {error}"),
		Err(_) => tracing::error!("producer panicked"),
	}

	let stats = renderer.stats();
	tracing::info!(
		frames_drawn = stats.frames_drawn,
		frames_skipped = stats.frames_skipped,
		errors = stats.errors.total(),
		points = renderer.committed_count(),
		"done"
	);
}
