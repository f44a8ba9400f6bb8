use clap::Parser;
use edgefirst_jpu::{
    device::BufferDesc,
    hw::{HwConfig, InputConfig, InputFormat, OpConfig, OpMode, QuantTables},
    memory::DmaMemory,
    params::{scale_quant_matrix, CHROMA_QUANT_BASE, LUMA_QUANT_BASE},
    session::{Callbacks, Session},
};
use std::{error::Error, fs, path::PathBuf, sync::mpsc, time::Duration};
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
enum FormatSetting {
    Mono,
    H2v1,
    H2v2,
    H1v2,
}

impl From<FormatSetting> for InputFormat {
    fn from(setting: FormatSetting) -> Self {
        match setting {
            FormatSetting::Mono => InputFormat::Monochrome,
            FormatSetting::H2v1 => InputFormat::H2V1,
            FormatSetting::H2v2 => InputFormat::H2V2,
            FormatSetting::H1v2 => InputFormat::H1V2,
        }
    }
}

/// JPU encoder bring-up tool: encodes one raw planar frame through the
/// hardware and writes the produced scan data.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// encoder device
    #[arg(short, long, env = "JPU_DEVICE", default_value = "/dev/jpu0")]
    device: String,

    /// frame resolution in pixels (width height)
    #[arg(
        short,
        long,
        env = "FRAME_SIZE",
        default_value = "1920 1080",
        value_delimiter = ' ',
        num_args = 2
    )]
    frame_size: Vec<u32>,

    /// input pixel format
    #[arg(long, env = "FORMAT", default_value = "h2v2", value_enum)]
    format: FormatSetting,

    /// jpeg quality (0-100)
    #[arg(short, long, env = "QUALITY", default_value_t = 75)]
    quality: u32,

    /// restart marker interval in MCUs (0 disables restart markers)
    #[arg(long, default_value_t = 0)]
    restart: u16,

    /// realtime sub-mode instead of an offline memory-to-memory encode
    #[arg(long)]
    realtime: bool,

    /// realtime sub-mode variant (0-3)
    #[arg(long, default_value_t = 0)]
    variant: u32,

    /// seconds to wait for the encoded frame
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// raw planar input frame
    input: PathBuf,

    /// encoded scan data output
    output: PathBuf,

    /// verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn mcu_size(format: InputFormat) -> (u32, u32) {
    match format {
        InputFormat::Monochrome => (8, 8),
        InputFormat::H2V1 => (16, 8),
        InputFormat::H2V2 => (16, 16),
        InputFormat::H1V2 => (8, 16),
    }
}

fn chroma_len(format: InputFormat, luma_len: u32) -> u32 {
    match format {
        InputFormat::Monochrome => 0,
        InputFormat::H2V2 => luma_len / 2,
        InputFormat::H2V1 | InputFormat::H1V2 => luma_len,
    }
}

fn copy_scan(data: &[u8], len: Option<&usize>) -> Result<Vec<u8>, Box<dyn Error>> {
    let len = *len.ok_or("no scan length")?;
    Ok(data[..len.min(data.len())].to_vec())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match tracing_journald::layer() {
        Ok(journald) => tracing_subscriber::registry().with(journald).init(),
        Err(_) => tracing_subscriber::fmt().init(),
    }

    let (width, height) = (args.frame_size[0], args.frame_size[1]);
    let format = InputFormat::from(args.format);
    let (mcu_w, mcu_h) = mcu_size(format);
    let width_mcus = width.div_ceil(mcu_w);
    let height_mcus = height.div_ceil(mcu_h);
    info!(
        "frame {width}x{height} {format:?} -> {width_mcus}x{height_mcus} MCUs quality {}",
        args.quality
    );

    let frame = fs::read(&args.input)?;
    let luma_len = width * height;
    let cbcr_len = chroma_len(format, luma_len);
    if frame.len() < (luma_len + cbcr_len) as usize {
        return Err(format!(
            "{} holds {} bytes, expected {}",
            args.input.display(),
            frame.len(),
            luma_len + cbcr_len
        )
        .into());
    }

    let input_mem = DmaMemory::new(frame.len())?;
    input_mem.mmap()?.as_slice_mut()[..frame.len()].copy_from_slice(&frame);
    let output_mem = DmaMemory::new((luma_len + cbcr_len) as usize)?;

    let (done_tx, done_rx) = mpsc::channel();
    let callbacks = Callbacks {
        event: Some(Box::new(|event| {
            info!("encoder event {} len {}", event.kind, event.len);
        })),
        input: Some(Box::new(|buf| {
            debug!("input consumed: {} bytes", buf.y_len + buf.cbcr_len);
        })),
        output: Some(Box::new(move |buf| {
            let _ = done_tx.send(buf);
        })),
    };
    let session = Session::new(&args.device, callbacks)?;

    let mode = if args.realtime {
        OpMode::Realtime
    } else {
        OpMode::Offline
    };
    let input_cfg = InputConfig {
        format,
        params: [0, 0, 0],
        width_mcus,
        height_mcus,
    };
    let op_cfg = OpConfig {
        mode,
        variant: args.variant,
    };
    let hw_cfg = HwConfig {
        restart_marker: args.restart,
        quant: Some(QuantTables {
            luma: scale_quant_matrix(&LUMA_QUANT_BASE, args.quality),
            chroma: scale_quant_matrix(&CHROMA_QUANT_BASE, args.quality),
        }),
        ..Default::default()
    };
    session.configure(&input_cfg, [0, 0], &hw_cfg, &op_cfg)?;

    session.enqueue_output(&BufferDesc {
        fd: output_mem.raw_fd(),
        y_len: output_mem.len() as u32,
        num_mcu_rows: height_mcus,
        ..Default::default()
    })?;
    session.enqueue_input(&BufferDesc {
        fd: input_mem.raw_fd(),
        y_len: luma_len,
        cbcr_off: luma_len,
        cbcr_len,
        num_mcu_rows: height_mcus,
        ..Default::default()
    })?;

    session.encode()?;
    let done = match done_rx.recv_timeout(Duration::from_secs(args.timeout)) {
        Ok(buf) => buf,
        Err(e) => {
            warn!("no encoded frame: {e}");
            session.stop(false)?;
            return Err(e.into());
        }
    };
    info!("frame done: {} bytes", done.framedone_len);
    session.stop(false)?;

    let scan_len = done.framedone_len as usize;
    let dma = output_mem.dmabuf();
    let mem = dma.memory_map()?;
    let scan = mem.read(copy_scan, Some(&scan_len))?;
    fs::write(&args.output, &scan)?;

    if args.verbose {
        println!(
            "encoded {}x{} frame: {} bytes -> {}",
            width,
            height,
            scan.len(),
            args.output.display()
        );
    }
    Ok(())
}
