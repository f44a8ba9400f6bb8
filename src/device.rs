// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Character device interface to the JPU kernel driver.
//!
//! The driver exposes a small fixed set of requests: reset, hardware
//! version query, command sequence submission, start, stop, one blocking
//! get and one unblock per queue, and buffer enqueue for the input and
//! output queues. Request codes and record layouts are a fixed contract
//! with the driver and must match it exactly.

use crate::hw::{self, CommandSeq, HwCmd};
use std::{
    ffi::CString,
    io,
    mem::size_of,
    os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd},
    ptr::null_mut,
};
use tracing::debug;

/// Default encoder device node.
pub const JPU_DEVICE: &str = "/dev/jpu0";

const JPU_IOC_MAGIC: u32 = b'j' as u32;

// _IOW request encoding; the driver takes every argument by pointer.
const fn iow(nr: u32) -> libc::c_ulong {
    ((1u32 << 30) | ((size_of::<*mut libc::c_void>() as u32) << 16) | (JPU_IOC_MAGIC << 8) | nr)
        as libc::c_ulong
}

const JPU_GET_HW_VERSION: libc::c_ulong = iow(1);
const JPU_RESET: libc::c_ulong = iow(2);
const JPU_STOP: libc::c_ulong = iow(3);
const JPU_START: libc::c_ulong = iow(4);
const JPU_INPUT_BUF_ENQUEUE: libc::c_ulong = iow(5);
const JPU_INPUT_GET: libc::c_ulong = iow(6);
const JPU_INPUT_GET_UNBLOCK: libc::c_ulong = iow(7);
const JPU_OUTPUT_BUF_ENQUEUE: libc::c_ulong = iow(8);
const JPU_OUTPUT_GET: libc::c_ulong = iow(9);
const JPU_OUTPUT_GET_UNBLOCK: libc::c_ulong = iow(10);
const JPU_EVT_GET: libc::c_ulong = iow(11);
const JPU_EVT_GET_UNBLOCK: libc::c_ulong = iow(12);
const JPU_HW_CMDS: libc::c_ulong = iow(13);

// Control record for reset and the event queue, in the driver layout.
#[repr(C)]
struct RawCtrlCmd {
    kind: u32,
    len: u32,
    value: *mut libc::c_void,
}

// Buffer descriptor in the driver layout.
#[repr(C)]
struct RawBuf {
    kind: u32,
    fd: libc::c_int,
    vaddr: *mut libc::c_void,
    y_off: u32,
    y_len: u32,
    framedone_len: u32,
    cbcr_off: u32,
    cbcr_len: u32,
    num_mcu_rows: u32,
}

/// Hardware event delivered on the event queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    pub kind: u32,
    pub len: u32,
}

/// Encoder buffer descriptor.
///
/// Describes one DMA-backed frame buffer: the luma and chroma plane windows
/// inside the backing memory, the MCU row count covered by the buffer, and
/// the backing file descriptor. `framedone_len` reports the number of bytes
/// produced when the descriptor comes back on the output queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferDesc {
    pub kind: u32,
    pub fd: RawFd,
    pub vaddr: usize,
    pub y_off: u32,
    pub y_len: u32,
    pub framedone_len: u32,
    pub cbcr_off: u32,
    pub cbcr_len: u32,
    pub num_mcu_rows: u32,
}

impl BufferDesc {
    fn to_raw(self) -> RawBuf {
        RawBuf {
            kind: self.kind,
            fd: self.fd,
            vaddr: self.vaddr as *mut libc::c_void,
            y_off: self.y_off,
            y_len: self.y_len,
            framedone_len: self.framedone_len,
            cbcr_off: self.cbcr_off,
            cbcr_len: self.cbcr_len,
            num_mcu_rows: self.num_mcu_rows,
        }
    }

    fn from_raw(raw: &RawBuf) -> Self {
        Self {
            kind: raw.kind,
            fd: raw.fd,
            vaddr: raw.vaddr as usize,
            y_off: raw.y_off,
            y_len: raw.y_len,
            framedone_len: raw.framedone_len,
            cbcr_off: raw.cbcr_off,
            cbcr_len: raw.cbcr_len,
            num_mcu_rows: raw.num_mcu_rows,
        }
    }
}

/// Open handle to the encoder device.
///
/// The kernel serializes concurrent requests on one handle, so the handle
/// may be shared between the control thread and the queue worker threads
/// without a userspace lock.
#[derive(Debug)]
pub struct Device {
    fd: OwnedFd,
}

impl Device {
    /// Opens the encoder device read-write.
    pub fn open(path: &str) -> io::Result<Self> {
        let cpath = CString::new(path).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        let fd = unsafe { libc::open(cpath.as_ptr(), libc::O_RDWR) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        debug!("open {path}: fd = {fd}");
        Ok(Self {
            fd: unsafe { OwnedFd::from_raw_fd(fd) },
        })
    }

    fn request(&self, code: libc::c_ulong, arg: *mut libc::c_void) -> io::Result<()> {
        let rc = unsafe { libc::ioctl(self.fd.as_raw_fd(), code, arg) };
        if rc < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn request_bare(&self, code: libc::c_ulong) -> io::Result<()> {
        self.request(code, null_mut())
    }

    /// Resets the encoder into the given operating mode.
    pub fn reset(&self, mode: u32) -> io::Result<()> {
        let mut ctrl = RawCtrlCmd {
            kind: mode,
            len: 0,
            value: null_mut(),
        };
        self.request(JPU_RESET, &mut ctrl as *mut RawCtrlCmd as *mut libc::c_void)
    }

    /// Reads the hardware version register.
    pub fn hw_version(&self) -> io::Result<u32> {
        let mut cmd = hw::version_query();
        self.request(
            JPU_GET_HW_VERSION,
            &mut cmd as *mut HwCmd as *mut libc::c_void,
        )?;
        Ok(cmd.data)
    }

    fn submit_as(&self, code: libc::c_ulong, seq: &CommandSeq) -> io::Result<()> {
        let mut wire = seq.to_wire();
        self.request(code, wire.as_mut_ptr() as *mut libc::c_void)
    }

    /// Submits a command sequence for verbatim execution.
    pub fn submit(&self, seq: &CommandSeq) -> io::Result<()> {
        self.submit_as(JPU_HW_CMDS, seq)
    }

    /// Submits a start sequence through the start request.
    pub fn start(&self, seq: &CommandSeq) -> io::Result<()> {
        self.submit_as(JPU_START, seq)
    }

    /// Submits a stop sequence through the stop request.
    pub fn stop(&self, seq: &CommandSeq) -> io::Result<()> {
        self.submit_as(JPU_STOP, seq)
    }

    /// Blocks until the driver delivers the next hardware event.
    pub fn event_get(&self) -> io::Result<Event> {
        let mut ctrl = RawCtrlCmd {
            kind: 0,
            len: 0,
            value: null_mut(),
        };
        self.request(JPU_EVT_GET, &mut ctrl as *mut RawCtrlCmd as *mut libc::c_void)?;
        Ok(Event {
            kind: ctrl.kind,
            len: ctrl.len,
        })
    }

    /// Blocks until the driver returns a consumed input buffer.
    pub fn input_get(&self) -> io::Result<BufferDesc> {
        let mut raw = BufferDesc::default().to_raw();
        self.request(JPU_INPUT_GET, &mut raw as *mut RawBuf as *mut libc::c_void)?;
        Ok(BufferDesc::from_raw(&raw))
    }

    /// Blocks until the driver returns a filled output buffer.
    pub fn output_get(&self) -> io::Result<BufferDesc> {
        let mut raw = BufferDesc::default().to_raw();
        self.request(JPU_OUTPUT_GET, &mut raw as *mut RawBuf as *mut libc::c_void)?;
        Ok(BufferDesc::from_raw(&raw))
    }

    /// Wakes a thread parked in [`event_get`](Self::event_get).
    pub fn event_unblock(&self) -> io::Result<()> {
        self.request_bare(JPU_EVT_GET_UNBLOCK)
    }

    /// Wakes a thread parked in [`input_get`](Self::input_get).
    pub fn input_unblock(&self) -> io::Result<()> {
        self.request_bare(JPU_INPUT_GET_UNBLOCK)
    }

    /// Wakes a thread parked in [`output_get`](Self::output_get).
    pub fn output_unblock(&self) -> io::Result<()> {
        self.request_bare(JPU_OUTPUT_GET_UNBLOCK)
    }

    /// Hands an input buffer to the driver, returning the raw submission
    /// result.
    pub fn input_enqueue(&self, desc: &BufferDesc) -> io::Result<()> {
        let mut raw = desc.to_raw();
        let ret = self.request(
            JPU_INPUT_BUF_ENQUEUE,
            &mut raw as *mut RawBuf as *mut libc::c_void,
        );
        debug!(
            "input buf {:#x} enqueue {}: {:?}",
            desc.vaddr, desc.y_len, ret
        );
        ret
    }

    /// Hands an output buffer to the driver, returning the raw submission
    /// result.
    pub fn output_enqueue(&self, desc: &BufferDesc) -> io::Result<()> {
        let mut raw = desc.to_raw();
        let ret = self.request(
            JPU_OUTPUT_BUF_ENQUEUE,
            &mut raw as *mut RawBuf as *mut libc::c_void,
        );
        debug!(
            "output buf {:#x} enqueue {}: {:?}",
            desc.vaddr, desc.y_len, ret
        );
        ret
    }
}
