#[derive(Clone, Debug, thiserror::Error)]
pub enum WgpuContextError {
	#[error("no suitable graphics adapter")]
	NoAdapter,

	#[error("request device error {0}")]
	RequestDevice(String),
}

static_assertions::assert_impl_all!(WgpuContextError: std::error::Error, Send, Sync);

impl From<wgpu::RequestDeviceError> for WgpuContextError {
	fn from(value: wgpu::RequestDeviceError) -> Self {
		WgpuContextError::RequestDevice(format!("{}", value))
	}
}

/// The handles every GPU operation needs. The ink pipeline uses only core features, so any adapter
/// will do.
#[derive(Debug)]
pub struct WgpuContext {
	instance: wgpu::Instance,
	adapter: wgpu::Adapter,
	device: wgpu::Device,
	queue: wgpu::Queue,
}

impl WgpuContext {
	#[tracing::instrument(err)]
	pub async fn new() -> Result<Self, WgpuContextError> {
		let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
			flags: wgpu::InstanceFlags::from_build_config().with_env(),
			..Default::default()
		});

		let adapter = instance
			.request_adapter(&wgpu::RequestAdapterOptions {
				power_preference: wgpu::PowerPreference::LowPower,
				..Default::default()
			})
			.await
			.ok_or(WgpuContextError::NoAdapter)?;
		tracing::info!(adapter = ?adapter.get_info(), "selected adapter");

		let (device, queue) = adapter
			.request_device(
				&wgpu::DeviceDescriptor {
					label: Some("stylus-ink"),
					required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
					..Default::default()
				},
				None,
			)
			.await?;

		Ok(Self {
			instance,
			adapter,
			device,
			queue,
		})
	}

	pub fn instance(&self) -> &wgpu::Instance {
		&self.instance
	}

	pub fn adapter(&self) -> &wgpu::Adapter {
		&self.adapter
	}

	pub fn device(&self) -> &wgpu::Device {
		&self.device
	}

	pub fn queue(&self) -> &wgpu::Queue {
		&self.queue
	}
}
