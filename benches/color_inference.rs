use criterion::{black_box, criterion_group, criterion_main, Criterion};
use choropleth_extract::legend::{LegendEntry, MapRecord, MapType, Unit};
use choropleth_extract::{build_dataset, LegendModelBuilder, PipelineConfig, RegionObservation, Rgb};

/// Nine-stop red ramp, as a continuous legend
fn ramp_record(map_type: MapType) -> MapRecord {
    MapRecord {
        file_name: "ramp.png".into(),
        map_type,
        map_title: "Rate".into(),
        legend: (0..9u8)
            .map(|i| {
                LegendEntry::with_value(
                    f64::from(i) * 10.0,
                    Unit::Suffix('%'),
                    Rgb::new(255, 255 - i * 28, 255 - i * 28),
                )
            })
            .collect(),
    }
}

fn benchmark_inference(c: &mut Criterion) {
    let builder = LegendModelBuilder::new();
    let continuous = builder.build(&ramp_record(MapType::Continuous)).unwrap();
    let discrete = builder.build(&ramp_record(MapType::Discrete)).unwrap();
    let query = Rgb::new(255, 120, 118);

    c.bench_function("continuous_ramp_infer", |b| {
        b.iter(|| continuous.infer(black_box(&query)))
    });
    c.bench_function("discrete_nearest_infer", |b| {
        b.iter(|| discrete.infer(black_box(&query)))
    });
}

fn benchmark_dataset(c: &mut Criterion) {
    let records: Vec<MapRecord> = (0..20)
        .map(|n| MapRecord {
            file_name: format!("map_{n}.png"),
            ..ramp_record(MapType::Discrete)
        })
        .collect();
    let observations: Vec<RegionObservation> = records
        .iter()
        .flat_map(|record| {
            choropleth_extract::constants::STATE_NAMES
                .iter()
                .enumerate()
                .map(move |(i, name)| RegionObservation {
                    file_name: record.file_name.clone(),
                    region_name: name.to_string(),
                    sampled_color: Rgb::new(255, (i * 5) as u8, (i * 5) as u8),
                })
        })
        .collect();
    let config = PipelineConfig::default();

    c.bench_function("build_dataset_20_maps", |b| {
        b.iter(|| build_dataset(black_box(&records), black_box(&observations), &config))
    });
}

criterion_group!(benches, benchmark_inference, benchmark_dataset);
criterion_main!(benches);
