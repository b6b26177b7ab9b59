//! Compiled programs. Built once at startup against the shared bind group layout.

use wgpu::{
    BindGroupLayout, ComputePipeline, Device, FragmentState, MultisampleState,
    PipelineLayoutDescriptor, PrimitiveState, RenderPipeline, RenderPipelineDescriptor,
    TextureFormat, VertexBufferLayout, VertexState,
};

use crate::{
    error::SetupError,
    rendering::Vertex,
    shaders::{self, ShaderSource},
};

pub struct PipelineSet {
    compute: ComputePipeline,
    render: RenderPipeline,
}

impl PipelineSet {
    pub fn new(
        device: &Device,
        layout: &BindGroupLayout,
        surface_format: TextureFormat,
        sources: &dyn ShaderSource,
        work_group_size: u32,
    ) -> Result<Self, SetupError> {
        let compute_program = shaders::compute_program(&sources.compute_source()?, work_group_size);
        let render_program = sources.render_source()?;

        let compute = compile_compute_pipeline(device, &compute_program, layout)?;
        let render = compile_render_pipeline(
            device,
            &render_program,
            Vertex::layout(),
            layout,
            surface_format,
        )?;
        log::info!("pipelines compiled (work group {work_group_size}x{work_group_size})");

        Ok(Self { compute, render })
    }

    pub fn compute(&self) -> &ComputePipeline {
        &self.compute
    }

    pub fn render(&self) -> &RenderPipeline {
        &self.render
    }
}

fn pipeline_layout(device: &Device, label: &str, layout: &BindGroupLayout) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    })
}

pub fn compile_compute_pipeline(
    device: &Device,
    program: &str,
    layout: &BindGroupLayout,
) -> Result<ComputePipeline, SetupError> {
    shaders::validate_wgsl("cell update", program)?;
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("cell update shader"),
        source: wgpu::ShaderSource::Wgsl(program.into()),
    });
    let layout = pipeline_layout(device, "cell update pipeline layout", layout);

    Ok(device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("cell update pipeline"),
        layout: Some(&layout),
        module: &module,
        entry_point: Some("compute_main"),
        compilation_options: Default::default(),
        cache: None,
    }))
}

pub fn compile_render_pipeline(
    device: &Device,
    program: &str,
    vertex_layout: VertexBufferLayout<'static>,
    layout: &BindGroupLayout,
    format: TextureFormat,
) -> Result<RenderPipeline, SetupError> {
    shaders::validate_wgsl("cell render", program)?;
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("cell render shader"),
        source: wgpu::ShaderSource::Wgsl(program.into()),
    });
    let layout = pipeline_layout(device, "cell render pipeline layout", layout);

    Ok(device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("cell render pipeline"),
        layout: Some(&layout),
        vertex: VertexState {
            module: &module,
            entry_point: Some("vertex_main"),
            buffers: &[vertex_layout],
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &module,
            entry_point: Some("fragment_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    }))
}
