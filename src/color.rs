//! RGBA → LAB color conversion with Gaussian pre-blur and channel scaling
//! (spec §4.2).
//!
//! This is the one pipeline stage dispatched as a real GPU compute kernel
//! (see `DESIGN.md` for why the others run on the CPU): it is embarrassingly
//! parallel per pixel, with no iteration-dependent reduction, so it is safe
//! to hand to the device without sacrificing the byte-identical
//! reproducibility spec §9 demands of the rest of the pipeline.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::{IconLayerError, Result};
use crate::gpu::shaders::{COLOR_CONVERT_BLUR, COLOR_CONVERT_BLUR_SRC};
use crate::gpu::GpuResources;
use crate::types::{AlphaBuffer, LabBuffer, LabColor, RgbaBuffer};

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Params {
    width: u32,
    height: u32,
    lightness_scale: f32,
    green_axis_scale: f32,
}

const WORKGROUP_SIZE: u32 = 8;

fn div_ceil_u32(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

/// Run the color-convert + blur kernel on `input`, returning the LAB buffer
/// and the extracted alpha buffer (spec §4.2).
pub(crate) async fn convert(
    gpu: &Arc<GpuResources>,
    input: &RgbaBuffer,
    lightness_scale: f64,
    green_axis_scale: f64,
) -> Result<(LabBuffer, AlphaBuffer)> {
    let width = input.width;
    let height = input.height;
    let pixel_count = input.pixel_count();

    let packed: Vec<u32> = input
        .data
        .chunks_exact(4)
        .map(|p| u32::from_le_bytes([p[0], p[1], p[2], p[3]]))
        .collect();

    let shader = gpu.shader(COLOR_CONVERT_BLUR, COLOR_CONVERT_BLUR_SRC)?;

    let device = &gpu.device;
    let queue = &gpu.queue;

    let params = Params {
        width,
        height,
        lightness_scale: lightness_scale as f32,
        green_axis_scale: green_axis_scale as f32,
    };
    let params_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("color-convert-params"),
        contents: bytemuck::bytes_of(&params),
        usage: wgpu::BufferUsages::UNIFORM,
    });

    let src_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("color-convert-src"),
        contents: bytemuck::cast_slice(&packed),
        usage: wgpu::BufferUsages::STORAGE,
    });

    let lab_size = (pixel_count * 3 * std::mem::size_of::<f32>()) as u64;
    let alpha_size = (pixel_count * std::mem::size_of::<f32>()) as u64;

    let out_lab = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("color-convert-out-lab"),
        size: lab_size,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });
    let out_alpha = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("color-convert-out-alpha"),
        size: alpha_size,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });

    let staging_lab = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("color-convert-staging-lab"),
        size: lab_size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let staging_alpha = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("color-convert-staging-alpha"),
        size: alpha_size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("color-convert-bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("color-convert-bg"),
        layout: &bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params_buf.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: src_buf.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: out_lab.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: out_alpha.as_entire_binding(),
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("color-convert-layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("color-convert-pipeline"),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: "main",
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("color-convert-encoder"),
    });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("color-convert-pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(
            div_ceil_u32(width, WORKGROUP_SIZE),
            div_ceil_u32(height, WORKGROUP_SIZE),
            1,
        );
    }
    encoder.copy_buffer_to_buffer(&out_lab, 0, &staging_lab, 0, lab_size);
    encoder.copy_buffer_to_buffer(&out_alpha, 0, &staging_alpha, 0, alpha_size);

    // Command buffer is committed; the caller awaits completion before
    // reading results (spec §4.1 "operation execution model").
    queue.submit(std::iter::once(encoder.finish()));

    let lab_slice = staging_lab.slice(..);
    let alpha_slice = staging_alpha.slice(..);
    let (lab_tx, lab_rx) = tokio::sync::oneshot::channel();
    let (alpha_tx, alpha_rx) = tokio::sync::oneshot::channel();
    lab_slice.map_async(wgpu::MapMode::Read, move |res| {
        let _ = lab_tx.send(res);
    });
    alpha_slice.map_async(wgpu::MapMode::Read, move |res| {
        let _ = alpha_tx.send(res);
    });
    device.poll(wgpu::Maintain::Wait);

    lab_rx
        .await
        .map_err(|_| IconLayerError::ExecutionFailed("gpu buffer map channel dropped".into()))?
        .map_err(|e| IconLayerError::ExecutionFailed(format!("failed to map lab buffer: {e}")))?;
    alpha_rx
        .await
        .map_err(|_| IconLayerError::ExecutionFailed("gpu buffer map channel dropped".into()))?
        .map_err(|e| IconLayerError::ExecutionFailed(format!("failed to map alpha buffer: {e}")))?;

    let lab_data: Vec<f32> = bytemuck::cast_slice(&lab_slice.get_mapped_range()).to_vec();
    let alpha_data: Vec<f32> = bytemuck::cast_slice(&alpha_slice.get_mapped_range()).to_vec();
    staging_lab.unmap();
    staging_alpha.unmap();

    let lab = LabBuffer {
        width,
        height,
        data: lab_data
            .chunks_exact(3)
            .map(|c| LabColor::new(f64::from(c[0]), f64::from(c[1]), f64::from(c[2])))
            .collect(),
    };
    let alpha = AlphaBuffer {
        width,
        height,
        data: alpha_data,
    };

    Ok((lab, alpha))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_pixels_little_endian() {
        let packed = u32::from_le_bytes([10, 20, 30, 255]);
        assert_eq!(packed & 0xFF, 10);
        assert_eq!((packed >> 8) & 0xFF, 20);
        assert_eq!((packed >> 16) & 0xFF, 30);
        assert_eq!((packed >> 24) & 0xFF, 255);
    }

    #[test]
    fn div_ceil_rounds_up() {
        assert_eq!(div_ceil_u32(9, 8), 2);
        assert_eq!(div_ceil_u32(8, 8), 1);
        assert_eq!(div_ceil_u32(0, 8), 0);
    }
}
