//! 调度表达式基准测试

use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use url_uptime_monitor::health::CronSchedule;

fn schedule_benchmark(c: &mut Criterion) {
    c.bench_function("cron_parse", |b| {
        b.iter(|| CronSchedule::parse(black_box("*/5 8-18 * 1-6,9-12 1-5")))
    });

    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let every_minute = CronSchedule::parse("* * * * *").unwrap();
    c.bench_function("next_after_every_minute", |b| {
        b.iter(|| every_minute.next_after(black_box(start)))
    });

    // 需要跨月搜索的表达式
    let leap_day = CronSchedule::parse("0 0 29 2 *").unwrap();
    c.bench_function("next_after_leap_day", |b| {
        b.iter(|| leap_day.next_after(black_box(start + chrono::Duration::days(60))))
    });
}

criterion_group!(benches, schedule_benchmark);
criterion_main!(benches);
