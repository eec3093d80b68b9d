use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polars::prelude::DataFrame;
use weather_dashboard::{
    records_to_frame, seasonal_statistics, AdditionalMetrics, KeyMetrics, Season,
    WeatherRecord, MAIN_METRICS, ROW_CAP,
};

fn synthetic_frame(rows: usize) -> DataFrame {
    let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    let records: Vec<WeatherRecord> = (0..rows)
        .map(|i| {
            let season = Season::CANONICAL[(i / 91) % 4];
            let mut record = WeatherRecord::new(
                start + Duration::days((i % 3650) as i64),
                format!("City {}", i % 40),
                season,
            );
            let x = i as f64;
            record.avg_temp_c = Some((x * 0.37).sin() * 15.0);
            record.min_temp_c = Some((x * 0.37).sin() * 15.0 - 4.0);
            record.max_temp_c = Some((x * 0.37).sin() * 15.0 + 4.0);
            record.precipitation_mm = if i % 3 == 0 { Some(x % 7.0) } else { None };
            record.snow_depth_mm = Some(if i % 5 == 0 { 20.0 } else { 0.0 });
            record.avg_wind_speed_kmh = Some(x % 30.0);
            record.avg_wind_dir_deg = Some((x * 13.0) % 360.0);
            record.peak_wind_gust_kmh = Some(x % 60.0);
            record
        })
        .collect();
    records_to_frame(&records).unwrap()
}

fn bench_metrics(c: &mut Criterion) {
    let df = synthetic_frame(ROW_CAP);
    c.bench_function("key_metrics", |b| {
        b.iter(|| KeyMetrics::compute(black_box(&df)))
    });
    c.bench_function("additional_metrics", |b| {
        b.iter(|| AdditionalMetrics::compute(black_box(&df)))
    });
    c.bench_function("seasonal_statistics", |b| {
        b.iter(|| seasonal_statistics(black_box(&MAIN_METRICS), black_box(&df)))
    });
}

criterion_group!(benches, bench_metrics);
criterion_main!(benches);
