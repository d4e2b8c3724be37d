//! Blocking buffer readback and upload.
//!
//! Readback copies a storage buffer into a fresh staging buffer, submits,
//! and waits for the map. Meant for tests, frame export and inspection, not
//! for every frame of an interactive host.

use std::sync::mpsc;

use bytemuck::Pod;

use crate::error::GpuError;

/// Wait for a buffer map operation to complete.
pub fn await_buffer_map(
    rx: mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>,
) -> Result<(), GpuError> {
    match rx.recv() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            log::error!("Buffer map failed: {:?}", e);
            Err(GpuError::BufferMapping(e.to_string()))
        }
        Err(_) => {
            log::error!("Buffer map channel disconnected - possible device lost");
            Err(GpuError::BufferMapping("map callback dropped".to_string()))
        }
    }
}

/// Copy the first `count` elements of `src` back to host memory.
///
/// `src` must have been created with `COPY_SRC`.
pub fn read_buffer<T: Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    src: &wgpu::Buffer,
    count: usize,
) -> Result<Vec<T>, GpuError> {
    let byte_size = (count * std::mem::size_of::<T>()) as u64;
    if byte_size == 0 {
        return Ok(Vec::new());
    }

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size: byte_size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(src, 0, &staging, 0, byte_size);
    queue.submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    await_buffer_map(rx)?;

    let data = {
        let mapped = slice.get_mapped_range();
        bytemuck::cast_slice::<u8, T>(&mapped).to_vec()
    };
    staging.unmap();
    Ok(data)
}

/// Overwrite the start of `dst` with `data`. Takes effect before the next
/// submission.
pub fn write_buffer<T: Pod>(queue: &wgpu::Queue, dst: &wgpu::Buffer, data: &[T]) {
    if !data.is_empty() {
        queue.write_buffer(dst, 0, bytemuck::cast_slice(data));
    }
}
