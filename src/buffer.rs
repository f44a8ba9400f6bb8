// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Staging buffers for encoder input and output.
//!
//! A [`StageBuffer`] pairs a DMA region with a fill-state machine so a
//! producer (camera capture, file reader) and the encoder can hand frames
//! back and forth without copying. [`BufferPool`] is an owned registry of
//! staging buffers with a fixed capacity; buffers are claimed from the pool
//! and return to it when marked empty, and everything is released when the
//! pool goes out of scope.

use crate::memory::DmaMemory;
use std::{
    error::Error,
    io,
    sync::{Arc, Condvar, Mutex},
};
use tracing::debug;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FillState {
    Empty,
    Busy,
    Filled,
}

struct StageState {
    fill: FillState,
    used: usize,
}

/// DMA-backed staging buffer with fill-state tracking.
pub struct StageBuffer {
    memory: DmaMemory,
    state: Mutex<StageState>,
    cond: Condvar,
}

impl StageBuffer {
    /// Allocates a staging buffer of at least `capacity` bytes.
    pub fn new(capacity: usize) -> Result<Self, Box<dyn Error>> {
        let memory = DmaMemory::new(capacity)?;
        Ok(Self {
            memory,
            state: Mutex::new(StageState {
                fill: FillState::Empty,
                used: 0,
            }),
            cond: Condvar::new(),
        })
    }

    /// Backing DMA region.
    pub fn memory(&self) -> &DmaMemory {
        &self.memory
    }

    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    /// Number of valid bytes in the buffer.
    pub fn used(&self) -> usize {
        self.state.lock().unwrap().used
    }

    /// Records the number of valid bytes in the buffer.
    pub fn set_used(&self, used: usize) -> io::Result<()> {
        if used > self.capacity() {
            return Err(io::Error::from(io::ErrorKind::InvalidInput));
        }
        self.state.lock().unwrap().used = used;
        Ok(())
    }

    /// Claims the buffer if it is empty.
    pub fn try_claim(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.fill == FillState::Empty {
            state.fill = FillState::Busy;
            true
        } else {
            false
        }
    }

    /// Marks the buffer as owned by the hardware or a producer.
    pub fn mark_busy(&self) {
        self.state.lock().unwrap().fill = FillState::Busy;
    }

    /// Marks the buffer as holding valid data and wakes waiters.
    pub fn mark_filled(&self) {
        let mut state = self.state.lock().unwrap();
        state.fill = FillState::Filled;
        self.cond.notify_all();
    }

    /// Marks the buffer as reusable and wakes waiters.
    pub fn mark_empty(&self) {
        let mut state = self.state.lock().unwrap();
        state.fill = FillState::Empty;
        state.used = 0;
        self.cond.notify_all();
    }

    /// Blocks until the buffer holds valid data.
    pub fn wait_until_filled(&self) {
        let mut state = self.state.lock().unwrap();
        while state.fill != FillState::Filled {
            state = self.cond.wait(state).unwrap();
        }
    }

    /// Blocks until the buffer is reusable.
    pub fn wait_until_empty(&self) {
        let mut state = self.state.lock().unwrap();
        while state.fill != FillState::Empty {
            state = self.cond.wait(state).unwrap();
        }
    }
}

/// Owned, fixed-capacity registry of staging buffers.
pub struct BufferPool {
    buffers: Vec<Arc<StageBuffer>>,
}

impl BufferPool {
    /// Allocates `count` staging buffers of `capacity` bytes each.
    pub fn new(count: usize, capacity: usize) -> Result<Self, Box<dyn Error>> {
        let mut buffers = Vec::with_capacity(count);
        for _ in 0..count {
            buffers.push(Arc::new(StageBuffer::new(capacity)?));
        }
        debug!("buffer pool: {} x {} bytes", count, capacity);
        Ok(Self { buffers })
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<StageBuffer>> {
        self.buffers.get(index)
    }

    /// Claims the first empty buffer, marking it busy.
    pub fn acquire(&self) -> Option<Arc<StageBuffer>> {
        self.buffers
            .iter()
            .find(|buffer| buffer.try_claim())
            .cloned()
    }
}
