use contact_sensor::*;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

const DT: f32 = 1.0 / 60.0;
const BODIES: [&str; 4] = ["lf_foot", "rf_foot", "lh_foot", "rh_foot"];

fn prepare_sensor(instances: usize, history_length: i32) -> (ContactSensor, ScriptedBackend) {
    let backend = ScriptedBackend::new(instances, BODIES);
    let driver = backend.clone();
    for instance in 0..instances {
        for body in 0..BODIES.len() {
            let load = ((instance + body) % 3) as f32;
            driver.set_net_force(instance, body, Vec3::new(0.0, 0.0, load));
        }
    }
    let config = ContactSensorConfig::new().with_history_length(history_length);
    (ContactSensor::new(config, backend).unwrap(), driver)
}

fn bench_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("sensor_refresh");
    for &count in &[256usize, 1024, 4096] {
        group.bench_with_input(BenchmarkId::new("sequential", count), &count, |b, &count| {
            let (mut sensor, _driver) = prepare_sensor(count, 3);
            sensor.set_parallel_enabled(false);
            b.iter(|| {
                sensor.update(black_box(DT), false).unwrap();
                black_box(sensor.data().unwrap().current_air_time()[0]);
            })
        });
        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |b, &count| {
            let (mut sensor, _driver) = prepare_sensor(count, 3);
            sensor.set_parallel_enabled(true);
            b.iter(|| {
                sensor.update(black_box(DT), false).unwrap();
                black_box(sensor.data().unwrap().current_air_time()[0]);
            })
        });
    }
    group.finish();
}

fn bench_history_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_depth");
    for &history in &[0i32, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(history), &history, |b, &history| {
            let (mut sensor, _driver) = prepare_sensor(1024, history);
            b.iter(|| {
                sensor.update(black_box(DT), true).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_partial_reset(c: &mut Criterion) {
    let (mut sensor, _driver) = prepare_sensor(4096, 3);
    let subset: Vec<usize> = (0..4096).step_by(8).collect();
    c.bench_function("partial_reset", |b| {
        b.iter(|| {
            sensor.update(DT, false).unwrap();
            sensor.reset(black_box(subset.as_slice())).unwrap();
            sensor.refresh().unwrap();
        })
    });
}

criterion_group!(benches, bench_refresh, bench_history_depth, bench_partial_reset);
criterion_main!(benches);
