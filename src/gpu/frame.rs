//! Encoding one frame with wgpu.

use wgpu::{
    CommandEncoder, CommandEncoderDescriptor, Device, IndexFormat, LoadOp, Operations, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, StoreOp, SurfaceTexture, TextureView,
    TextureViewDescriptor,
};

use crate::{
    gpu::{pipelines::PipelineSet, resources::ResourceSet, surface::DisplaySurface},
    rendering::CLEAR_COLOR,
    sim::{Workgroups, binding::Parity, orchestrator::FrameBackend},
};

struct PendingFrame {
    output: SurfaceTexture,
    view: TextureView,
    encoder: CommandEncoder,
}

/// Borrows everything a frame needs for the duration of one submission.
pub struct GpuFrame<'a> {
    device: &'a Device,
    queue: &'a Queue,
    surface: &'a DisplaySurface,
    resources: &'a ResourceSet,
    pipelines: &'a PipelineSet,
    pending: Option<PendingFrame>,
}

impl<'a> GpuFrame<'a> {
    pub fn new(
        device: &'a Device,
        queue: &'a Queue,
        surface: &'a DisplaySurface,
        resources: &'a ResourceSet,
        pipelines: &'a PipelineSet,
    ) -> Self {
        Self {
            device,
            queue,
            surface,
            resources,
            pipelines,
            pending: None,
        }
    }

    fn pending(&mut self, pass: &str) -> Option<&mut PendingFrame> {
        if self.pending.is_none() {
            log::error!("{pass} pass encoded without an acquired target");
        }
        self.pending.as_mut()
    }
}

impl FrameBackend for GpuFrame<'_> {
    type Error = wgpu::SurfaceError;

    fn acquire_target(&mut self) -> Result<(), Self::Error> {
        let output = self.surface.acquire()?;
        let view = output
            .texture
            .create_view(&TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("render and compute encoder"),
            });
        self.pending = Some(PendingFrame {
            output,
            view,
            encoder,
        });
        Ok(())
    }

    fn encode_render(&mut self, binding: Parity, instances: u32) {
        let resources = self.resources;
        let pipelines = self.pipelines;
        let Some(frame) = self.pending("render") else {
            return;
        };

        let mut render_pass = frame.encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("cell render pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(CLEAR_COLOR.as_wgpu()),
                    store: StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(pipelines.render());
        render_pass.set_vertex_buffer(0, resources.vertex_buffer().slice(..));
        render_pass.set_index_buffer(resources.index_buffer().slice(..), IndexFormat::Uint32);
        render_pass.set_bind_group(0, resources.binding(binding), &[]);
        render_pass.draw_indexed(0..resources.index_count(), 0, 0..instances);
    }

    fn encode_compute(&mut self, binding: Parity, workgroups: Workgroups) {
        let resources = self.resources;
        let pipelines = self.pipelines;
        let Some(frame) = self.pending("compute") else {
            return;
        };

        encode_compute_pass(&mut frame.encoder, resources, pipelines, binding, workgroups);
    }

    fn submit(&mut self) {
        let Some(frame) = self.pending.take() else {
            log::error!("submit without an acquired target");
            return;
        };
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.output.present();
    }
}

/// Record one generation update: read the buffer in `binding`'s read slot and
/// write its write slot.
pub fn encode_compute_pass(
    encoder: &mut CommandEncoder,
    resources: &ResourceSet,
    pipelines: &PipelineSet,
    binding: Parity,
    workgroups: Workgroups,
) {
    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("cell update compute pass"),
        ..Default::default()
    });
    pass.set_pipeline(pipelines.compute());
    pass.set_bind_group(0, resources.binding(binding), &[]);
    pass.dispatch_workgroups(workgroups.per_axis, workgroups.per_axis, 1);
}
