// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! DMA memory allocation for encoder buffers.
//!
//! The encoder reads and writes physically contiguous memory, so buffers
//! are allocated from the CMA DMA heap at page granularity. The returned
//! file descriptor backs the buffer descriptors handed to the driver, and
//! the region can be mapped for CPU access to stage input frames or
//! collect encoded output.

use core::fmt;
use dma_buf::DmaBuf;
use dma_heap::{Heap, HeapKind};
use libc::{dup, mmap, munmap, MAP_SHARED, PROT_READ, PROT_WRITE};
use std::{
    error::Error,
    ffi::c_void,
    io,
    os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd},
    ptr::null_mut,
    slice::{from_raw_parts, from_raw_parts_mut},
};
use tracing::{debug, warn};

const PAGE_SIZE: usize = 4096;

const fn page_round(len: usize) -> usize {
    (len + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// Physically contiguous DMA memory region.
///
/// The backing file descriptor is what the encoder buffer descriptors
/// reference; the region is freed when the last descriptor and this handle
/// are gone.
#[derive(Debug)]
pub struct DmaMemory {
    fd: OwnedFd,
    len: usize,
}

impl DmaMemory {
    /// Allocates `len` bytes of CMA memory, rounded up to page granularity.
    ///
    /// # Errors
    ///
    /// Returns an error if the DMA heap is not accessible or the
    /// allocation fails (out of contiguous memory).
    pub fn new(len: usize) -> Result<Self, Box<dyn Error>> {
        let len = page_round(len);
        let heap = Heap::new(HeapKind::Cma)?;
        let fd = heap.allocate(len)?;
        debug!("dma alloc fd {:?} size {}", fd, len);
        Ok(Self { fd, len })
    }

    /// Allocated size, page rounded.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    pub fn raw_fd(&self) -> i32 {
        self.fd.as_raw_fd()
    }

    /// Exports the region as a DMA-BUF handle for sync-managed CPU access.
    pub fn dmabuf(&self) -> DmaBuf {
        unsafe { DmaBuf::from_raw_fd(dup(self.fd.as_raw_fd())) }
    }

    /// Maps the region for direct CPU access.
    ///
    /// # Errors
    ///
    /// Returns an error if the mapping fails.
    pub fn mmap(&self) -> io::Result<MappedMemory> {
        let ptr = unsafe {
            mmap(
                null_mut(),
                self.len,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                self.fd.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(MappedMemory {
            mmap: ptr.cast::<u8>(),
            len: self.len,
        })
    }
}

impl fmt::Display for DmaMemory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} bytes fd:{:?}", self.len, self.fd)
    }
}

/// Memory-mapped view of a [`DmaMemory`] region.
///
/// Provides a CPU-accessible view of the DMA region. The mapping is
/// unmapped when dropped.
///
/// # Safety
///
/// While the API is safe, concurrent access from hardware and CPU can lead
/// to race conditions. Ensure hardware operations complete before CPU
/// access.
pub struct MappedMemory {
    mmap: *mut u8,
    len: usize,
}

impl MappedMemory {
    pub fn as_slice(&self) -> &[u8] {
        unsafe { from_raw_parts(self.mmap, self.len) }
    }

    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        unsafe { from_raw_parts_mut(self.mmap, self.len) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for MappedMemory {
    fn drop(&mut self) {
        if unsafe { munmap(self.mmap.cast::<c_void>(), self.len) } != 0 {
            warn!("unmap failed!");
        }
    }
}
