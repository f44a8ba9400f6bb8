// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use edgefirst_jpu::buffer::{BufferPool, StageBuffer};
use edgefirst_jpu::memory::DmaMemory;
use serial_test::serial;
use std::{error::Error, sync::Arc, thread};

#[test]
#[serial]
#[ignore = "buffer tests require the CMA DMA heap (run with --include-ignored to enable)"]
fn test_memory_rounding() -> Result<(), Box<dyn Error>> {
    let mem = DmaMemory::new(100)?;
    assert_eq!(mem.len(), 4096);
    let mem = DmaMemory::new(4096)?;
    assert_eq!(mem.len(), 4096);
    let mem = DmaMemory::new(4097)?;
    assert_eq!(mem.len(), 8192);
    Ok(())
}

#[test]
#[serial]
#[ignore = "buffer tests require the CMA DMA heap (run with --include-ignored to enable)"]
fn test_memory_mapping() -> Result<(), Box<dyn Error>> {
    let mem = DmaMemory::new(8192)?;
    let mut mapped = mem.mmap()?;
    mapped.as_slice_mut().fill(0xA5);
    assert!(mapped.as_slice().iter().all(|b| *b == 0xA5));
    Ok(())
}

#[test]
#[serial]
#[ignore = "buffer tests require the CMA DMA heap (run with --include-ignored to enable)"]
fn test_stage_buffer_states() -> Result<(), Box<dyn Error>> {
    let buffer = StageBuffer::new(4096)?;
    assert_eq!(buffer.used(), 0);
    assert!(buffer.try_claim());
    assert!(!buffer.try_claim());
    buffer.set_used(1000)?;
    assert_eq!(buffer.used(), 1000);
    assert!(buffer.set_used(buffer.capacity() + 1).is_err());
    buffer.mark_empty();
    assert_eq!(buffer.used(), 0);
    assert!(buffer.try_claim());
    Ok(())
}

#[test]
#[serial]
#[ignore = "buffer tests require the CMA DMA heap (run with --include-ignored to enable)"]
fn test_stage_buffer_handoff() -> Result<(), Box<dyn Error>> {
    let buffer = Arc::new(StageBuffer::new(4096)?);
    let producer = Arc::clone(&buffer);
    let worker = thread::spawn(move || {
        producer.set_used(512).unwrap();
        producer.mark_filled();
    });
    buffer.wait_until_filled();
    assert_eq!(buffer.used(), 512);
    worker.join().unwrap();
    buffer.mark_empty();
    buffer.wait_until_empty();
    Ok(())
}

#[test]
#[serial]
#[ignore = "buffer tests require the CMA DMA heap (run with --include-ignored to enable)"]
fn test_pool_acquire_release() -> Result<(), Box<dyn Error>> {
    let pool = BufferPool::new(2, 4096)?;
    assert_eq!(pool.len(), 2);

    let first = pool.acquire().expect("first buffer");
    let second = pool.acquire().expect("second buffer");
    assert!(pool.acquire().is_none());

    first.mark_empty();
    let third = pool.acquire().expect("recycled buffer");
    assert_eq!(
        third.memory().raw_fd(),
        pool.get(0).expect("pool entry").memory().raw_fd()
    );

    second.mark_empty();
    third.mark_empty();
    Ok(())
}
