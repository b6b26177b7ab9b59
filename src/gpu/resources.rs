//! Every buffer the simulation uses, and the two bind groups over them.

use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, Buffer, BufferUsages, Device, Limits, Queue, ShaderStages,
    util::{BufferInitDescriptor, DeviceExt},
};

use crate::{
    error::SetupError,
    rendering::{GridUniforms, Quad},
    sim::{
        GridState,
        binding::{BindingConfiguration, BindingPair, Parity},
    },
};

/// Owns the geometry, uniform and cell-state buffers.
///
/// Pipelines and frames only ever borrow from here. The binding configurations
/// are created once in [`ResourceSet::new`] and never rebuilt.
pub struct ResourceSet {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
    cells_a: Buffer,
    cells_b: Buffer,
    layout: BindGroupLayout,
    bindings: BindingPair<BindGroup>,
}

impl ResourceSet {
    pub fn new(device: &Device, queue: &Queue, grid: &GridState) -> Result<Self, SetupError> {
        let quad = Quad::new();
        let vertex_buffer = create_static_buffer(
            device,
            "quad vertex buffer",
            bytemuck::cast_slice(&quad.vertices),
            BufferUsages::VERTEX,
        )?;
        let index_buffer = create_static_buffer(
            device,
            "quad index buffer",
            bytemuck::cast_slice(&quad.indices),
            BufferUsages::INDEX,
        )?;
        let uniforms = create_static_buffer(
            device,
            "grid uniforms",
            bytemuck::bytes_of(&GridUniforms::new(grid.grid_size)),
            BufferUsages::UNIFORM,
        )?;

        let cells_a = create_storage_buffer(device, "cell state A", grid.buffer_size())?;
        let cells_b = create_storage_buffer(device, "cell state B", grid.buffer_size())?;
        queue.write_buffer(&cells_a, 0, bytemuck::cast_slice(&grid.buffer_a));
        queue.write_buffer(&cells_b, 0, bytemuck::cast_slice(&grid.buffer_b));

        let layout = create_binding_layout(device);
        let bindings = build_binding_configurations(device, &layout, &uniforms, &cells_a, &cells_b);

        log::info!(
            "allocated {} cells ({} bytes per state buffer)",
            grid.cell_count(),
            grid.buffer_size()
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: quad.index_count(),
            cells_a,
            cells_b,
            layout,
            bindings,
        })
    }

    pub fn vertex_buffer(&self) -> &Buffer {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &Buffer {
        &self.index_buffer
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// The layout both pipelines are built against
    pub fn layout(&self) -> &BindGroupLayout {
        &self.layout
    }

    pub fn binding(&self, parity: Parity) -> &BindGroup {
        self.bindings.get(parity)
    }

    /// Buffers A and B, in that order. Both allow `COPY_SRC` for readback.
    pub fn cell_buffers(&self) -> (&Buffer, &Buffer) {
        (&self.cells_a, &self.cells_b)
    }
}

/// Upload immutable data into a new buffer.
pub fn create_static_buffer(
    device: &Device,
    label: &'static str,
    contents: &[u8],
    usage: BufferUsages,
) -> Result<Buffer, SetupError> {
    check_buffer_size(label, contents.len() as u64, device.limits().max_buffer_size)?;
    Ok(device.create_buffer_init(&BufferInitDescriptor {
        label: Some(label),
        contents,
        usage,
    }))
}

/// Allocate a zeroed storage buffer that can be bound in either slot.
pub fn create_storage_buffer(
    device: &Device,
    label: &'static str,
    size: u64,
) -> Result<Buffer, SetupError> {
    check_buffer_size(label, size, storage_limit(&device.limits()))?;
    Ok(device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    }))
}

/// Bytes one cell-state buffer of a `grid_size` grid needs, if the device can
/// bind a buffer that large. Checked before any cell memory is allocated.
pub fn check_grid_fits(grid_size: u32, limits: &Limits) -> Result<u64, SetupError> {
    let limit = storage_limit(limits);
    let size = u64::from(grid_size)
        .checked_mul(u64::from(grid_size))
        .and_then(|cells| cells.checked_mul(std::mem::size_of::<u32>() as u64))
        .unwrap_or(u64::MAX);
    check_buffer_size("cell state", size, limit)?;
    Ok(size)
}

fn storage_limit(limits: &Limits) -> u64 {
    limits
        .max_buffer_size
        .min(u64::from(limits.max_storage_buffer_binding_size))
}

pub fn check_buffer_size(label: &'static str, size: u64, limit: u64) -> Result<(), SetupError> {
    if size > limit {
        return Err(SetupError::BufferTooLarge { label, size, limit });
    }
    Ok(())
}

/// Slot 0: uniforms, slot 1: read-only cells, slot 2: writable cells (compute only).
fn create_binding_layout(device: &Device) -> BindGroupLayout {
    let visible_everywhere = ShaderStages::VERTEX | ShaderStages::FRAGMENT | ShaderStages::COMPUTE;
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("cells bind group layout"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: visible_everywhere,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: visible_everywhere,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 2,
                visibility: ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

fn build_binding_configurations(
    device: &Device,
    layout: &BindGroupLayout,
    uniforms: &Buffer,
    cells_a: &Buffer,
    cells_b: &Buffer,
) -> BindingPair<BindGroup> {
    let labels = ["cells bind group (A -> B)", "cells bind group (B -> A)"];
    let mut labels = labels.into_iter();
    BindingPair::ping_pong(uniforms, cells_a, cells_b).map(
        |BindingConfiguration {
             uniforms,
             read,
             write,
         }| {
            device.create_bind_group(&BindGroupDescriptor {
                label: labels.next(),
                layout,
                entries: &[
                    BindGroupEntry {
                        binding: 0,
                        resource: uniforms.as_entire_binding(),
                    },
                    BindGroupEntry {
                        binding: 1,
                        resource: read.as_entire_binding(),
                    },
                    BindGroupEntry {
                        binding: 2,
                        resource: write.as_entire_binding(),
                    },
                ],
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_within_limit() {
        assert!(check_buffer_size("cells", 4096, 4096).is_ok());
        assert!(check_buffer_size("cells", 0, 4096).is_ok());
    }

    #[test]
    fn test_size_over_limit() {
        let err = check_buffer_size("cells", 4097, 4096).unwrap_err();
        assert!(matches!(
            err,
            SetupError::BufferTooLarge {
                label: "cells",
                size: 4097,
                limit: 4096
            }
        ));
    }

    #[test]
    fn test_grid_fits_default_limits() {
        let limits = Limits::downlevel_defaults();
        assert_eq!(check_grid_fits(32, &limits).unwrap(), 32 * 32 * 4);
        assert_eq!(check_grid_fits(4100, &limits).unwrap(), 4100 * 4100 * 4);
    }

    #[test]
    fn test_oversized_grid_is_rejected_before_allocation() {
        let limits = Limits::downlevel_defaults();
        let err = check_grid_fits(1_048_576, &limits).unwrap_err();
        assert!(matches!(
            err,
            SetupError::BufferTooLarge {
                label: "cell state",
                size: 4_398_046_511_104,
                ..
            }
        ));
    }

    #[test]
    fn test_grid_size_overflow_is_rejected() {
        let limits = Limits {
            max_buffer_size: u64::MAX,
            max_storage_buffer_binding_size: u32::MAX,
            ..Limits::default()
        };
        let err = check_grid_fits(u32::MAX, &limits).unwrap_err();
        assert!(matches!(err, SetupError::BufferTooLarge { size: u64::MAX, .. }));
    }

    #[test]
    fn test_huge_grid_exceeds_default_binding_limit() {
        let limits = wgpu::Limits::downlevel_defaults();
        let grid_size: u64 = 8192;
        let bytes = grid_size * grid_size * 4;
        assert!(
            check_buffer_size("cells", bytes, limits.max_storage_buffer_binding_size as u64)
                .is_err()
        );
    }
}
