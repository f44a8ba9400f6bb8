use criterion::{criterion_group, criterion_main, Criterion};
use edgefirst_jpu::huffman::{HuffSpec, HwHuffTable, TableClass};
use edgefirst_jpu::hw::{self, InputConfig, InputFormat, OpConfig, OpMode, OutputConfig};

fn ac_spec() -> HuffSpec {
    HuffSpec {
        counts: [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0],
        symbols: vec![
            0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51,
            0x61, 0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1,
            0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82,
        ],
    }
}

fn dc_spec() -> HuffSpec {
    HuffSpec {
        counts: [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0],
        symbols: (0..=11).collect(),
    }
}

pub fn benchmark_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    let input = InputConfig {
        format: InputFormat::H2V2,
        params: [0, 0, 0],
        width_mcus: 240,
        height_mcus: 135,
    };
    group.bench_function("fe_cfg", |b| b.iter(|| hw::fe_cfg(&input)));

    let op = OpConfig {
        mode: OpMode::Realtime,
        variant: 1,
    };
    let out = OutputConfig {
        format: InputFormat::H2V2,
        param: 0,
        width_mcus: 240,
        height_mcus: 135,
    };
    group.bench_function("output_cfg", |b| b.iter(|| hw::output_cfg(&op, &out)));

    let luma = [16u8; 64];
    let chroma = [17u8; 64];
    group.bench_function("set_quant_tables", |b| {
        b.iter(|| hw::set_quant_tables(&luma, &chroma))
    });

    let dc = HwHuffTable::build(&dc_spec(), TableClass::Dc);
    let ac = HwHuffTable::build(&ac_spec(), TableClass::Ac);
    group.bench_function("set_huffman_tables", |b| {
        b.iter(|| hw::set_huffman_tables(&dc, &dc, &ac, &ac))
    });

    let seq = hw::set_huffman_tables(&dc, &dc, &ac, &ac);
    group.bench_function("to_wire", |b| b.iter(|| seq.to_wire()));
}

criterion_group!(benches, benchmark_compile);
criterion_main!(benches);
