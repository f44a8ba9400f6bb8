// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # EdgeFirst JPU Encoder Control Library
//!
//! This library provides userspace control of the JPU hardware JPEG encoder
//! block through its kernel character device. It translates encode
//! configuration (frame geometry, pixel format, quantization tables, Huffman
//! tables, quality, target size) into the register command sequences the
//! kernel driver executes verbatim, and runs the worker threads that drain
//! the hardware event, input and output queues.
//!
//! ## Features
//!
//! - **Register Command Compiler**: Builders for every configuration step of
//!   the encoder block, producing bit-exact command sequences for the driver.
//! - **Session Management**: Device lifecycle with per-queue worker threads
//!   delivering events and completed buffers to caller callbacks.
//! - **Table Generation**: JPEG quality scaling of quantization matrices and
//!   canonical Huffman code generation in the hardware's lookup layout.
//! - **DMA Buffer Management**: CMA-backed buffer allocation and staging for
//!   zero-copy encoder input/output.
//!
//! ## Example
//!
//! ```no_run
//! use edgefirst_jpu::hw::{HwConfig, InputConfig, InputFormat, OpConfig, OpMode};
//! use edgefirst_jpu::session::{Callbacks, Session};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let callbacks = Callbacks {
//!     output: Some(Box::new(|buf| println!("encoded {} bytes", buf.framedone_len))),
//!     ..Default::default()
//! };
//! let session = Session::new("/dev/jpu0", callbacks)?;
//!
//! let input = InputConfig {
//!     format: InputFormat::H2V2,
//!     params: [0, 0, 0],
//!     width_mcus: 120,
//!     height_mcus: 68,
//! };
//! let op = OpConfig { mode: OpMode::Offline, variant: 0 };
//! session.configure(&input, [0, 0], &HwConfig::default(), &op)?;
//! session.encode()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Requirements
//!
//! - **Linux**: Kernel with the JPU encoder driver and DMA heap support
//! - **Hardware**: SoC with the JPU JPEG encoder block (`/dev/jpu0`)
//!
//! ## Safety
//!
//! This library uses `unsafe` code for the ioctl interface to the kernel
//! driver and for DMA buffer mapping. All unsafe operations are isolated to
//! the `device` and `memory` modules and wrapped with safe APIs.

pub mod buffer;
pub mod device;
pub mod huffman;
pub mod hw;
pub mod memory;
pub mod params;
pub mod session;
