// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use edgefirst_jpu::{
    device::BufferDesc,
    hw::{HwConfig, InputConfig, InputFormat, OpConfig, OpMode, QuantTables},
    memory::DmaMemory,
    params::{scale_quant_matrix, CHROMA_QUANT_BASE, LUMA_QUANT_BASE},
    session::{Callbacks, Session},
};
use serial_test::serial;
use std::{
    error::Error,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc,
    },
    time::Duration,
};

#[test]
#[serial]
fn test_open_failure() {
    let session = Session::new("/dev/jpu-does-not-exist", Callbacks::default());
    assert!(session.is_err());
}

#[test]
#[serial]
fn test_no_callbacks() -> Result<(), Box<dyn Error>> {
    // no worker threads are started and teardown has nothing to join
    let session = Session::new("/dev/null", Callbacks::default())?;
    assert_eq!(session.input_format(), None);
    Ok(())
}

/// The start-up barrier consumes the first ready signal of the single
/// started worker; with a handle that rejects the get request the callback
/// is never invoked and teardown still joins cleanly.
#[test]
#[serial]
fn test_single_worker_handshake() -> Result<(), Box<dyn Error>> {
    let events = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&events);
    let callbacks = Callbacks {
        event: Some(Box::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        })),
        ..Default::default()
    };
    let session = Session::new("/dev/null", callbacks)?;
    drop(session);
    assert_eq!(events.load(Ordering::Relaxed), 0);
    Ok(())
}

#[test]
#[serial]
fn test_all_workers_handshake() -> Result<(), Box<dyn Error>> {
    let callbacks = Callbacks {
        event: Some(Box::new(|_| {})),
        input: Some(Box::new(|_| {})),
        output: Some(Box::new(|_| {})),
    };
    let session = Session::new("/dev/null", callbacks)?;
    drop(session);
    Ok(())
}

#[test]
#[serial]
#[ignore = "encoder test requires hardware (run with --include-ignored to enable)"]
fn test_encode() -> Result<(), Box<dyn Error>> {
    let (width, height) = (640u32, 480u32);
    let (width_mcus, height_mcus) = (width.div_ceil(16), height.div_ceil(16));

    let input_mem = DmaMemory::new((width * height * 3 / 2) as usize)?;
    let output_mem = DmaMemory::new((width * height) as usize)?;
    input_mem.mmap()?.as_slice_mut().fill(0x80);

    let (done_tx, done_rx) = mpsc::channel();
    let callbacks = Callbacks {
        event: Some(Box::new(|event| println!("event {}", event.kind))),
        input: Some(Box::new(|_| {})),
        output: Some(Box::new(move |buf| {
            let _ = done_tx.send(buf);
        })),
    };
    let session = Session::new("/dev/jpu0", callbacks)?;

    let input = InputConfig {
        format: InputFormat::H2V2,
        params: [0, 0, 0],
        width_mcus,
        height_mcus,
    };
    let op = OpConfig {
        mode: OpMode::Offline,
        variant: 0,
    };
    let config = HwConfig {
        restart_marker: 0,
        quant: Some(QuantTables {
            luma: scale_quant_matrix(&LUMA_QUANT_BASE, 75),
            chroma: scale_quant_matrix(&CHROMA_QUANT_BASE, 75),
        }),
        ..Default::default()
    };
    session.configure(&input, [0, 0], &config, &op)?;
    assert_eq!(session.input_format(), Some(InputFormat::H2V2));

    session.enqueue_output(&BufferDesc {
        fd: output_mem.raw_fd(),
        y_len: output_mem.len() as u32,
        num_mcu_rows: height_mcus,
        ..Default::default()
    })?;
    session.enqueue_input(&BufferDesc {
        fd: input_mem.raw_fd(),
        y_len: width * height,
        cbcr_off: width * height,
        cbcr_len: width * height / 2,
        num_mcu_rows: height_mcus,
        ..Default::default()
    })?;

    session.encode()?;
    let done = done_rx.recv_timeout(Duration::from_secs(10))?;
    assert!(done.framedone_len > 0);
    session.stop(false)?;
    Ok(())
}
