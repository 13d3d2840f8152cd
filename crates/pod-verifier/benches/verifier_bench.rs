//! 패키지 검증 벤치마크
//!
//! 원격 호출 전 입력 검증과 실패 보고서 렌더링 성능을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;
use workbench_pod_verifier::{
    PackageVerificationResult, RemoteCommand, VerificationReport, format_package_failure_report,
    validate_request,
};

fn package_list(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("package_{i}")).collect()
}

fn failed_report(count: usize) -> VerificationReport {
    let mut report = VerificationReport::default();
    for name in package_list(count) {
        let command = RemoteCommand::import("python", &name);
        report.insert(PackageVerificationResult {
            error_message: Some(format!("ModuleNotFoundError: No module named '{name}'")),
            package_name: name,
            import_successful: false,
            command_executed: command.display().to_owned(),
            execution_time_seconds: 0.42,
            pod_logs: Some("[I 12:00:00 ServerApp] Jupyter Server is running\n".repeat(20)),
            stdout: String::new(),
            stderr: String::new(),
        });
    }
    report
}

fn bench_validate_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_request");
    for count in [1, 10, 100] {
        let packages = package_list(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &packages, |b, pkgs| {
            b.iter(|| validate_request(black_box(pkgs), Duration::from_secs(60)))
        });
    }
    group.finish();
}

fn bench_import_command(c: &mut Criterion) {
    c.bench_function("import_command", |b| {
        b.iter(|| RemoteCommand::import(black_box("python"), black_box("sklearn")))
    });
}

fn bench_failure_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("failure_report");
    for count in [1, 10, 50] {
        let report = failed_report(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &report, |b, report| {
            b.iter(|| format_package_failure_report(black_box("my-nb-0"), report))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_validate_request,
    bench_import_command,
    bench_failure_report
);
criterion_main!(benches);
