use criterion::{criterion_group, criterion_main, Criterion};
use edgefirst_jpu::huffman::{HuffSpec, HwHuffTable, TableClass};
use edgefirst_jpu::params::{rate_params, scale_quant_matrix, LUMA_QUANT_BASE};

pub fn benchmark_tables(c: &mut Criterion) {
    let mut group = c.benchmark_group("tables");

    for quality in [10u32, 50, 75, 95] {
        group.bench_with_input(format!("quant/{quality}"), &quality, |b, quality| {
            b.iter(|| scale_quant_matrix(&LUMA_QUANT_BASE, *quality))
        });
    }

    let spec = HuffSpec {
        counts: [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0],
        symbols: vec![
            0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12, 0x21, 0x31, 0x41, 0x06, 0x13, 0x51,
            0x61, 0x07, 0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08, 0x23, 0x42, 0xB1, 0xC1,
            0x15, 0x52, 0xD1, 0xF0, 0x24, 0x33, 0x62, 0x72, 0x82,
        ],
    };
    group.bench_function("huffman/ac", |b| {
        b.iter(|| HwHuffTable::build(&spec, TableClass::Ac))
    });

    group.bench_function("rate_params", |b| {
        b.iter(|| rate_params(1000, 3840, 2160, 2, 2))
    });
}

criterion_group!(benches, benchmark_tables);
criterion_main!(benches);
