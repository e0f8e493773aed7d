use std::mem::size_of;

use bon::builder;
use glam::{Affine2, Mat4, UVec2, Vec2, Vec4};
use wgpu::util::DeviceExt;

use crate::geom::ScissorRect;
use crate::geometry::{quad_corners, LineVertex};
use crate::target::DrawBatch;

const SHADER: &str = include_str!("ink.wgsl");

const SPRITE_TEXTURE_SIZE: u32 = 64;
const MIN_BUFFER_SIZE: u64 = 256;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
	transform: Mat4,
	background: Vec4,
}

static_assertions::const_assert_eq!(size_of::<Globals>(), 80);

/// Maps canvas coordinates to clip space for a surface of `size` pixels, y pointing down.
pub fn canvas_to_clip(size: UVec2, view: Affine2) -> Mat4 {
	let size = size.max(UVec2::ONE).as_vec2();
	let projection = Mat4::orthographic_rh(0.0, size.x, size.y, 0.0, -1.0, 1.0);
	let view = Mat4::from_cols(
		view.matrix2.x_axis.extend(0.0).extend(0.0),
		view.matrix2.y_axis.extend(0.0).extend(0.0),
		Vec4::Z,
		view.translation.extend(0.0).extend(1.0),
	);
	projection * view
}

pub fn uniform_samples(size: u32) -> impl Iterator<Item = f32> {
	let scale = 1.0 / (size as f32 - 1.0);
	(0..size).map(move |i| scale * i as f32)
}

pub fn centered_uniform_samples(size: u32) -> impl Iterator<Item = f32> {
	uniform_samples(size).map(|x| 2.0 * x - 1.0)
}

/// One row of the soft round dab, coverage in `[0, 1]`.
pub fn generate_sprite_row(y: f32, width: u32) -> impl Iterator<Item = f32> {
	centered_uniform_samples(width).map(move |x| (1.0 - (x * x + y * y)).clamp(0.0, 1.0))
}

/// Expands each segment of a line list into two triangles `width` wide, butt-ended. A zero-length
/// segment becomes a square dab.
pub fn line_triangles(vertices: &[LineVertex], width: f32) -> Vec<LineVertex> {
	let half = width / 2.0;
	vertices
		.chunks_exact(2)
		.flat_map(|segment| {
			let (a, b) = (segment[0], segment[1]);
			let [p0, p1, p2, p3] = match (b.position - a.position).try_normalize() {
				Some(direction) => {
					let offset = direction.perp() * half;
					[
						a.position - offset,
						a.position + offset,
						b.position + offset,
						b.position - offset,
					]
				}
				None => quad_corners(a.position, width),
			};
			[
				LineVertex::new(p0, a.color),
				LineVertex::new(p1, a.color),
				LineVertex::new(p2, b.color),
				LineVertex::new(p2, b.color),
				LineVertex::new(p3, b.color),
				LineVertex::new(p0, a.color),
			]
		})
		.collect()
}

fn create_sprite_texture(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::TextureView {
	let size = SPRITE_TEXTURE_SIZE;
	let data: Vec<u8> = centered_uniform_samples(size)
		.flat_map(move |y| generate_sprite_row(y, size))
		.map(|coverage| (coverage * 255.0).round() as u8)
		.collect();
	let format = wgpu::TextureFormat::R8Unorm;
	let texture = device.create_texture_with_data(
		queue,
		&wgpu::TextureDescriptor {
			label: Some("ink::sprite"),
			size: wgpu::Extent3d {
				width: size,
				height: size,
				depth_or_array_layers: 1,
			},
			mip_level_count: 1,
			sample_count: 1,
			dimension: wgpu::TextureDimension::D2,
			format,
			usage: wgpu::TextureUsages::TEXTURE_BINDING,
			view_formats: &[format],
		},
		wgpu::util::TextureDataOrder::default(),
		&data,
	);
	texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_sprite_sampler(device: &wgpu::Device) -> wgpu::Sampler {
	let address_mode = wgpu::AddressMode::ClampToEdge;
	device.create_sampler(&wgpu::SamplerDescriptor {
		label: Some("ink::sprite"),
		address_mode_u: address_mode,
		address_mode_v: address_mode,
		address_mode_w: address_mode,
		mag_filter: wgpu::FilterMode::Linear,
		min_filter: wgpu::FilterMode::Linear,
		..Default::default()
	})
}

fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
	device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
		label: Some("ink"),
		entries: &[
			wgpu::BindGroupLayoutEntry {
				binding: 0,
				visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
				ty: wgpu::BindingType::Buffer {
					ty: wgpu::BufferBindingType::Uniform,
					has_dynamic_offset: false,
					min_binding_size: wgpu::BufferSize::new(size_of::<Globals>() as u64),
				},
				count: None,
			},
			wgpu::BindGroupLayoutEntry {
				binding: 1,
				visibility: wgpu::ShaderStages::FRAGMENT,
				ty: wgpu::BindingType::Texture {
					sample_type: wgpu::TextureSampleType::Float { filterable: true },
					view_dimension: wgpu::TextureViewDimension::D2,
					multisampled: false,
				},
				count: None,
			},
			wgpu::BindGroupLayoutEntry {
				binding: 2,
				visibility: wgpu::ShaderStages::FRAGMENT,
				ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
				count: None,
			},
		],
	})
}

#[builder(finish_fn = create)]
fn render_pipeline<'a>(
	#[builder(finish_fn)] device: &wgpu::Device,
	label: &str,
	layout: &wgpu::PipelineLayout,
	module: &wgpu::ShaderModule,
	vertex_entry_point: &str,
	fragment_entry_point: &str,
	#[builder(default = &[])] buffers: &'a [wgpu::VertexBufferLayout<'a>],
	topology: wgpu::PrimitiveTopology,
	format: wgpu::TextureFormat,
	blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
	device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
		label: Some(label),
		layout: Some(layout),
		vertex: wgpu::VertexState {
			module,
			entry_point: vertex_entry_point,
			compilation_options: Default::default(),
			buffers,
		},
		fragment: Some(wgpu::FragmentState {
			module,
			entry_point: fragment_entry_point,
			compilation_options: Default::default(),
			targets: &[Some(wgpu::ColorTargetState {
				format,
				blend,
				write_mask: wgpu::ColorWrites::ALL,
			})],
		}),
		primitive: wgpu::PrimitiveState {
			topology,
			..Default::default()
		},
		depth_stencil: None,
		multisample: wgpu::MultisampleState::default(),
		multiview: None,
		cache: None,
	})
}

/// A GPU buffer that is re-created at the next power of two when an upload does not fit.
#[derive(Debug)]
struct GpuBuffer {
	label: &'static str,
	usage: wgpu::BufferUsages,
	buffer: wgpu::Buffer,
	len: u64,
}

impl GpuBuffer {
	fn new(device: &wgpu::Device, label: &'static str, usage: wgpu::BufferUsages) -> Self {
		let usage = usage | wgpu::BufferUsages::COPY_DST;
		Self {
			label,
			usage,
			buffer: Self::create(device, label, usage, MIN_BUFFER_SIZE),
			len: 0,
		}
	}

	fn create(
		device: &wgpu::Device,
		label: &str,
		usage: wgpu::BufferUsages,
		size: u64,
	) -> wgpu::Buffer {
		device.create_buffer(&wgpu::BufferDescriptor {
			label: Some(label),
			size,
			usage,
			mapped_at_creation: false,
		})
	}

	fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[u8]) {
		let len = data.len() as u64;
		if len > self.buffer.size() {
			let size = len.next_power_of_two();
			tracing::debug!(label = self.label, size, "grew gpu buffer");
			self.buffer = Self::create(device, self.label, self.usage, size);
		}
		if len > 0 {
			queue.write_buffer(&self.buffer, 0, data);
		}
		self.len = len;
	}

	fn slice(&self) -> wgpu::BufferSlice<'_> {
		self.buffer.slice(..self.len)
	}
}

/// The pipelines and buffers that turn a [`DrawBatch`] into pixels.
#[derive(Debug)]
pub struct InkPainter {
	line_pipeline: wgpu::RenderPipeline,
	sprite_pipeline: wgpu::RenderPipeline,
	background_pipeline: wgpu::RenderPipeline,
	bind_group: wgpu::BindGroup,
	globals_buffer: wgpu::Buffer,
	globals: Globals,

	line_vertices: GpuBuffer,
	sprite_positions: GpuBuffer,
	sprite_tex_coords: GpuBuffer,
	sprite_colors: GpuBuffer,
	sprite_indices: GpuBuffer,
}

impl InkPainter {
	pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
		let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
			label: Some("ink"),
			source: wgpu::ShaderSource::Wgsl(SHADER.into()),
		});
		let bind_group_layout = create_bind_group_layout(device);
		let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
			label: Some("ink"),
			bind_group_layouts: &[&bind_group_layout],
			push_constant_ranges: &[],
		});

		const LINE_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
			wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x3];
		let line_pipeline = render_pipeline()
			.label("ink::line")
			.layout(&layout)
			.module(&module)
			.vertex_entry_point("vs_line")
			.fragment_entry_point("fs_line")
			.buffers(&[wgpu::VertexBufferLayout {
				array_stride: size_of::<LineVertex>() as u64,
				step_mode: wgpu::VertexStepMode::Vertex,
				attributes: &LINE_ATTRIBUTES,
			}])
			.topology(wgpu::PrimitiveTopology::TriangleList)
			.format(format)
			.blend(wgpu::BlendState::ALPHA_BLENDING)
			.create(device);

		let sprite_pipeline = render_pipeline()
			.label("ink::sprite")
			.layout(&layout)
			.module(&module)
			.vertex_entry_point("vs_sprite")
			.fragment_entry_point("fs_sprite")
			.buffers(&[
				wgpu::VertexBufferLayout {
					array_stride: size_of::<Vec2>() as u64,
					step_mode: wgpu::VertexStepMode::Vertex,
					attributes: &wgpu::vertex_attr_array![0 => Float32x2],
				},
				wgpu::VertexBufferLayout {
					array_stride: size_of::<Vec2>() as u64,
					step_mode: wgpu::VertexStepMode::Vertex,
					attributes: &wgpu::vertex_attr_array![1 => Float32x2],
				},
				wgpu::VertexBufferLayout {
					array_stride: size_of::<[f32; 4]>() as u64,
					step_mode: wgpu::VertexStepMode::Vertex,
					attributes: &wgpu::vertex_attr_array![2 => Float32x4],
				},
			])
			.topology(wgpu::PrimitiveTopology::TriangleList)
			.format(format)
			.blend(wgpu::BlendState::ALPHA_BLENDING)
			.create(device);

		let background_pipeline = render_pipeline()
			.label("ink::background")
			.layout(&layout)
			.module(&module)
			.vertex_entry_point("vs_background")
			.fragment_entry_point("fs_background")
			.topology(wgpu::PrimitiveTopology::TriangleList)
			.format(format)
			.create(device);

		let globals = Globals {
			transform: Mat4::IDENTITY,
			background: Vec4::ONE,
		};
		let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
			label: Some("ink::globals"),
			contents: bytemuck::bytes_of(&globals),
			usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
		});
		let sprite_texture = create_sprite_texture(device, queue);
		let sprite_sampler = create_sprite_sampler(device);
		let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
			label: Some("ink"),
			layout: &bind_group_layout,
			entries: &[
				wgpu::BindGroupEntry {
					binding: 0,
					resource: globals_buffer.as_entire_binding(),
				},
				wgpu::BindGroupEntry {
					binding: 1,
					resource: wgpu::BindingResource::TextureView(&sprite_texture),
				},
				wgpu::BindGroupEntry {
					binding: 2,
					resource: wgpu::BindingResource::Sampler(&sprite_sampler),
				},
			],
		});

		let vertex = wgpu::BufferUsages::VERTEX;
		Self {
			line_pipeline,
			sprite_pipeline,
			background_pipeline,
			bind_group,
			globals_buffer,
			globals,
			line_vertices: GpuBuffer::new(device, "ink::line_vertices", vertex),
			sprite_positions: GpuBuffer::new(device, "ink::sprite_positions", vertex),
			sprite_tex_coords: GpuBuffer::new(device, "ink::sprite_tex_coords", vertex),
			sprite_colors: GpuBuffer::new(device, "ink::sprite_colors", vertex),
			sprite_indices: GpuBuffer::new(device, "ink::sprite_indices", wgpu::BufferUsages::INDEX),
		}
	}

	/// Sets the canvas-to-screen transform and the surface size it projects onto.
	pub fn set_view(&mut self, queue: &wgpu::Queue, size: UVec2, view: Affine2) {
		self.globals.transform = canvas_to_clip(size, view);
		queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&self.globals));
	}

	/// The color the damaged region is reset to before ink is drawn.
	pub fn set_background(&mut self, queue: &wgpu::Queue, color: Vec4) {
		self.globals.background = color;
		queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&self.globals));
	}

	/// Repaints the background inside `scissor`, then draws `batch` over it.
	pub fn paint(
		&mut self,
		device: &wgpu::Device,
		queue: &wgpu::Queue,
		view: &wgpu::TextureView,
		scissor: Option<ScissorRect>,
		batch: &DrawBatch<'_>,
	) {
		let count = match *batch {
			DrawBatch::Lines {
				vertices, width, ..
			} => {
				// There is no line width state, so segments become quads.
				let triangles = line_triangles(&bytemuck::pod_collect_to_vec(vertices), width);
				self
					.line_vertices
					.upload(device, queue, bytemuck::cast_slice(&triangles));
				triangles.len() as u32
			}
			DrawBatch::Sprites {
				positions,
				tex_coords,
				colors,
				indices,
				index_count,
			} => {
				self.sprite_positions.upload(device, queue, positions);
				self.sprite_tex_coords.upload(device, queue, tex_coords);
				self.sprite_colors.upload(device, queue, colors);
				self.sprite_indices.upload(device, queue, indices);
				index_count
			}
		};

		let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
			label: Some("ink"),
		});
		{
			let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
				label: Some("ink"),
				color_attachments: &[Some(wgpu::RenderPassColorAttachment {
					view,
					resolve_target: None,
					ops: wgpu::Operations {
						load: wgpu::LoadOp::Load,
						store: wgpu::StoreOp::Store,
					},
				})],
				..Default::default()
			});
			if let Some(scissor) = scissor {
				pass.set_scissor_rect(scissor.x, scissor.y, scissor.width, scissor.height);
			}
			pass.set_bind_group(0, &self.bind_group, &[]);

			pass.set_pipeline(&self.background_pipeline);
			pass.draw(0..3, 0..1);

			if count > 0 {
				match batch {
					DrawBatch::Lines { .. } => {
						pass.set_pipeline(&self.line_pipeline);
						pass.set_vertex_buffer(0, self.line_vertices.slice());
						pass.draw(0..count, 0..1);
					}
					DrawBatch::Sprites { .. } => {
						pass.set_pipeline(&self.sprite_pipeline);
						pass.set_vertex_buffer(0, self.sprite_positions.slice());
						pass.set_vertex_buffer(1, self.sprite_tex_coords.slice());
						pass.set_vertex_buffer(2, self.sprite_colors.slice());
						pass.set_index_buffer(self.sprite_indices.slice(), wgpu::IndexFormat::Uint32);
						pass.draw_indexed(0..count, 0, 0..1);
					}
				}
			}
		}
		queue.submit([encoder.finish()]);
	}
}
