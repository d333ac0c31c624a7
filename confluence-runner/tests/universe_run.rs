//! End-to-end runner test: CSVs on disk in, artifacts on disk out.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use chrono::{Duration, TimeZone, Utc};
use confluence_runner::{
    import_json, load_bars, load_sentiment, run_universe, write_artifacts, RunConfig,
};

fn write_bar_csv(dir: &Path, symbol: &str, n: usize, drift: f64) {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut rows = String::from("timestamp,open,high,low,close,volume\n");
    for i in 0..n {
        let close = 100.0 + (i as f64 * 0.4).sin() * 5.0 + i as f64 * drift;
        let ts = base + Duration::days(i as i64);
        rows.push_str(&format!(
            "{},{:.2},{:.2},{:.2},{:.2},1000\n",
            ts.to_rfc3339(),
            close - 0.3,
            close + 1.5,
            close - 1.5,
            close,
        ));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), rows).unwrap();
}

fn write_sentiment_csv(dir: &Path) {
    let base = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
    let mut rows = String::from("symbol,timestamp,polarity\n");
    for i in 0..5 {
        let ts = base + Duration::days(i * 7);
        rows.push_str(&format!("AAA,{},0.6\nBBB,{},-0.4\n", ts.to_rfc3339(), ts.to_rfc3339()));
    }
    std::fs::write(dir.join("sentiment.csv"), rows).unwrap();
}

#[test]
fn csv_in_artifacts_out() {
    let dir = tempfile::tempdir().unwrap();
    write_bar_csv(dir.path(), "AAA", 150, 0.25);
    write_bar_csv(dir.path(), "BBB", 150, -0.15);
    write_sentiment_csv(dir.path());

    let config = RunConfig {
        universe: vec!["AAA".into(), "BBB".into()],
        data_dir: dir.path().to_path_buf(),
        sentiment_file: Some(dir.path().join("sentiment.csv")),
        risk_free_rate: 0.02,
        ..RunConfig::default()
    };

    let mut data = std::collections::HashMap::new();
    for symbol in &config.universe {
        data.insert(symbol.clone(), load_bars(&config.data_dir, symbol).unwrap());
    }
    let sentiment = load_sentiment(config.sentiment_file.as_ref().unwrap()).unwrap();
    assert_eq!(sentiment.len(), 10);

    let cancel = AtomicBool::new(false);
    let report = run_universe(&config, &data, &sentiment, &cancel).unwrap();
    assert_eq!(report.reports.len(), 2);
    for symbol_report in &report.reports {
        assert_eq!(symbol_report.bars_processed, 150);
        assert!(symbol_report.equity_curve.len() >= 150);
        assert!(symbol_report.metrics.max_drawdown >= 0.0);
    }

    let out_dir = dir.path().join("artifacts");
    let written = write_artifacts(&report, &out_dir).unwrap();
    assert_eq!(written.len(), 5); // report.json + 2 symbols x 2 CSVs

    let loaded = import_json(&std::fs::read_to_string(out_dir.join("report.json")).unwrap())
        .unwrap();
    assert_eq!(loaded.run_id, report.run_id);
    assert_eq!(loaded.reports.len(), 2);
    // The persisted metrics survive the round trip bit-for-bit.
    assert_eq!(
        loaded.reports[0].metrics.total_return,
        report.reports[0].metrics.total_return
    );
}

#[test]
fn cancelled_universe_reports_aborted_symbols() {
    let dir = tempfile::tempdir().unwrap();
    write_bar_csv(dir.path(), "AAA", 50, 0.2);

    let config = RunConfig {
        universe: vec!["AAA".into()],
        data_dir: dir.path().to_path_buf(),
        ..RunConfig::default()
    };
    let mut data = std::collections::HashMap::new();
    data.insert("AAA".to_string(), load_bars(&config.data_dir, "AAA").unwrap());

    let cancel = AtomicBool::new(true);
    let report = run_universe(&config, &data, &[], &cancel).unwrap();
    assert!(matches!(
        report.reports[0].status,
        confluence_core::engine::RunStatus::Aborted { .. }
    ));
    assert!(report.reports[0].trades.is_empty());
}
