// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Encoder session lifecycle and queue worker threads.
//!
//! A session owns the open device handle and one worker thread per
//! registered callback. Each worker parks in its queue's blocking get
//! request and hands retrieved events or buffers to the callback; the
//! session start-up blocks until every worker has reached its first
//! blocking read, so no command is submitted to a half-started session.

use crate::device::{BufferDesc, Device, Event};
use crate::hw::{self, HwConfig, InputConfig, InputFormat, OpConfig, OpMode, OutputConfig, PipelineConfig};
use crate::huffman::{HwHuffTable, TableClass};
use std::{
    error::Error,
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex,
    },
    thread::{self, JoinHandle},
};
use tracing::{debug, warn};

/// Callback invoked for every hardware event.
pub type EventCallback = Box<dyn FnMut(Event) + Send>;

/// Callback invoked for every buffer returned by the driver.
pub type BufferCallback = Box<dyn FnMut(BufferDesc) + Send>;

/// Per-queue callbacks; a worker thread is started only for the queues
/// with a callback registered.
#[derive(Default)]
pub struct Callbacks {
    pub event: Option<EventCallback>,
    pub input: Option<BufferCallback>,
    pub output: Option<BufferCallback>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Queue {
    Event,
    Input,
    Output,
}

// One-shot ready notification between a worker and the session. This is a
// single-slot mailbox, not a counting semaphore: a second signal before the
// first is consumed overwrites it, and only the first signal per worker is
// observably consumed (by the start-up barrier).
struct ReadyGate {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl ReadyGate {
    fn new() -> Self {
        Self {
            flag: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn signal(&self) {
        let mut ready = self.flag.lock().unwrap();
        *ready = true;
        self.cond.notify_one();
    }

    fn wait(&self) {
        let mut ready = self.flag.lock().unwrap();
        while !*ready {
            ready = self.cond.wait(ready).unwrap();
        }
        *ready = false;
    }
}

struct WorkerState {
    stop: AtomicBool,
    ready: ReadyGate,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
            ready: ReadyGate::new(),
        }
    }
}

// Encode state shared between configure, encode and stop. The stop builder
// dispatches on the mode configured last, so both sides take the lock.
#[derive(Clone, Copy, Default)]
struct EncodeState {
    mode: OpMode,
    format: Option<InputFormat>,
}

struct Shared {
    device: Device,
    state: Mutex<EncodeState>,
    event: WorkerState,
    input: WorkerState,
    output: WorkerState,
}

impl Shared {
    fn worker(&self, queue: Queue) -> &WorkerState {
        match queue {
            Queue::Event => &self.event,
            Queue::Input => &self.input,
            Queue::Output => &self.output,
        }
    }

    fn unblock(&self, queue: Queue) -> io::Result<()> {
        match queue {
            Queue::Event => self.device.event_unblock(),
            Queue::Input => self.device.input_unblock(),
            Queue::Output => self.device.output_unblock(),
        }
    }
}

fn run_worker<T, G>(shared: &Shared, queue: Queue, get: G, mut callback: Box<dyn FnMut(T) + Send>)
where
    G: Fn(&Device) -> io::Result<T>,
{
    let state = shared.worker(queue);
    debug!("{queue:?} worker enter");
    state.ready.signal();
    loop {
        match get(&shared.device) {
            Ok(item) => callback(item),
            Err(e) => {
                if !state.stop.load(Ordering::Acquire) {
                    warn!("{queue:?} get failed: {e}");
                }
            }
        }
        state.ready.signal();
        if state.stop.load(Ordering::Acquire) {
            break;
        }
    }
    debug!("{queue:?} worker exit");
}

/// Open encoder session.
///
/// Created by [`Session::new`], mutated by every configure, start and stop
/// call, and torn down exactly once on drop: worker stop flags are set, one
/// unblock request per started queue wakes the parked workers, the threads
/// are joined and the device handle is closed.
pub struct Session {
    shared: Arc<Shared>,
    workers: Vec<(Queue, JoinHandle<()>)>,
}

impl Session {
    /// Opens the device and starts a worker thread per registered callback.
    ///
    /// Blocks until every started worker has signaled ready once, so the
    /// caller can submit commands immediately. If the device cannot be
    /// opened or a thread cannot be started, everything already started is
    /// torn down and the error is returned.
    pub fn new(path: &str, callbacks: Callbacks) -> Result<Self, Box<dyn Error>> {
        let device = Device::open(path)?;
        let shared = Arc::new(Shared {
            device,
            state: Mutex::new(EncodeState::default()),
            event: WorkerState::new(),
            input: WorkerState::new(),
            output: WorkerState::new(),
        });
        let mut session = Session {
            shared: Arc::clone(&shared),
            workers: Vec::with_capacity(3),
        };

        let Callbacks {
            event,
            input,
            output,
        } = callbacks;
        if let Some(callback) = event {
            let shared = Arc::clone(&shared);
            session.spawn(Queue::Event, move || {
                run_worker(&shared, Queue::Event, Device::event_get, callback)
            })?;
        }
        if let Some(callback) = input {
            let shared = Arc::clone(&shared);
            session.spawn(Queue::Input, move || {
                run_worker(&shared, Queue::Input, Device::input_get, callback)
            })?;
        }
        if let Some(callback) = output {
            let shared = Arc::clone(&shared);
            session.spawn(Queue::Output, move || {
                run_worker(&shared, Queue::Output, Device::output_get, callback)
            })?;
        }

        // Start-up barrier: consume the first ready signal of every worker.
        for (queue, _) in &session.workers {
            session.shared.worker(*queue).ready.wait();
            debug!("{queue:?} worker ready");
        }
        Ok(session)
    }

    fn spawn<F>(&mut self, queue: Queue, body: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = match queue {
            Queue::Event => "jpu-event",
            Queue::Input => "jpu-input",
            Queue::Output => "jpu-output",
        };
        let handle = thread::Builder::new().name(name.into()).spawn(body)?;
        self.workers.push((queue, handle));
        Ok(())
    }

    /// Runs the full configuration chain: reset, version query, front-end,
    /// output path, write engine, pipeline, restart marker, then the
    /// optional Huffman, quantization and filesize control loads.
    ///
    /// Aborts on the first failed submission, leaving the device partially
    /// configured; the caller should retry the whole chain from reset.
    pub fn configure(
        &self,
        input: &InputConfig,
        we_params: [u8; 2],
        config: &HwConfig,
        op: &OpConfig,
    ) -> io::Result<()> {
        let device = &self.shared.device;

        device.reset(op.mode as u32)?;
        let version = device.hw_version()?;
        debug!("hardware version {version:#x}");

        device.submit(&hw::fe_cfg(input))?;

        let output = OutputConfig {
            format: input.format,
            param: input.params[1] as u32,
            width_mcus: input.width_mcus,
            height_mcus: input.height_mcus,
        };
        device.submit(&hw::output_cfg(op, &output))?;

        device.submit(&hw::we_cfg(we_params))?;

        let pipeline = PipelineConfig {
            mode: op.mode,
            format: input.format,
            flags: [0; 5],
        };
        device.submit(&hw::pipeline_cfg(&pipeline))?;

        device.submit(&hw::restart_marker(config.restart_marker))?;

        if let Some(tables) = &config.huffman {
            let dc_luma = HwHuffTable::build(&tables.dc_luma, TableClass::Dc);
            let dc_chroma = HwHuffTable::build(&tables.dc_chroma, TableClass::Dc);
            let ac_luma = HwHuffTable::build(&tables.ac_luma, TableClass::Ac);
            let ac_chroma = HwHuffTable::build(&tables.ac_chroma, TableClass::Ac);
            device.submit(&hw::set_huffman_tables(
                &dc_luma, &dc_chroma, &ac_luma, &ac_chroma,
            ))?;
        }

        if let Some(quant) = &config.quant {
            device.submit(&hw::set_quant_tables(&quant.luma, &quant.chroma))?;
            device.submit(&hw::read_quant_tables())?;
        }

        if let Some(filesize) = &config.filesize {
            device.submit(&hw::filesize_ctrl(filesize))?;
        }

        let mut state = self.shared.state.lock().unwrap();
        state.mode = op.mode;
        state.format = Some(input.format);
        debug!("configure success");
        Ok(())
    }

    /// Starts the encode, compiling the start sequence from the mode
    /// configured last.
    pub fn encode(&self) -> io::Result<()> {
        let mode = self.shared.state.lock().unwrap().mode;
        self.shared.device.start(&hw::start(mode))
    }

    /// Stops the encode.
    ///
    /// Unless suppressed, one unblock request per queue follows the stop
    /// submission so that parked workers observe the stop promptly. The
    /// unblocks are issued even when the stop submission fails.
    pub fn stop(&self, suppress_unblock: bool) -> io::Result<()> {
        let mode = self.shared.state.lock().unwrap().mode;
        let ret = self.shared.device.stop(&hw::stop(mode, suppress_unblock));
        if !suppress_unblock {
            let _ = self.shared.device.event_unblock();
            let _ = self.shared.device.input_unblock();
            let _ = self.shared.device.output_unblock();
        }
        ret
    }

    /// Hands an input buffer to the driver.
    pub fn enqueue_input(&self, desc: &BufferDesc) -> io::Result<()> {
        self.shared.device.input_enqueue(desc)
    }

    /// Hands an output buffer to the driver.
    pub fn enqueue_output(&self, desc: &BufferDesc) -> io::Result<()> {
        self.shared.device.output_enqueue(desc)
    }

    /// Input format configured last, if any.
    pub fn input_format(&self) -> Option<InputFormat> {
        self.shared.state.lock().unwrap().format
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for (queue, _) in &self.workers {
            self.shared.worker(*queue).stop.store(true, Ordering::Release);
        }
        for (queue, _) in &self.workers {
            if let Err(e) = self.shared.unblock(*queue) {
                warn!("{queue:?} unblock failed: {e}");
            }
        }
        for (queue, handle) in self.workers.drain(..) {
            debug!("join {queue:?} worker");
            if handle.join().is_err() {
                warn!("{queue:?} worker panicked");
            }
        }
        debug!("session closed");
    }
}
