use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use log::{info, warn};
use tops_core::naming::input_base_name;
use tops_core::{
    BulkWriter, CaptureReader, EnrichStats, Enricher, ProgressSink, SymbolFilter, SymbolStore,
};

use crate::cli::{MergeArgs, dest_or_cwd};
use crate::inputs::collect_inputs;

/// Итог merge по всем входным файлам
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MergeSummary {
    pub(crate) files_ok: usize,
    pub(crate) files_failed: usize,
    pub(crate) records: u64,
    pub(crate) units: u64,
}

/// Merge всех входных файлов.
///
/// Ошибка здесь - только если запуск невозможен (нет источника, нельзя
/// создать каталог). Проблемы отдельных файлов логируются и считаются.
pub(crate) fn run_merge(
    args: &MergeArgs,
    symbols: Vec<String>,
    shutdown: &AtomicBool,
) -> anyhow::Result<MergeSummary> {
    let inputs = collect_inputs(&args.source, args.filter.as_deref())?;
    let dest = dest_or_cwd(args.dest.as_ref());
    fs::create_dir_all(&dest).with_context(|| format!("create dest dir {}", dest.display()))?;

    let filter = SymbolFilter::new(symbols);
    info!(
        "merge: {} input file(s), {} symbol(s): {}",
        inputs.len(),
        filter.len(),
        filter.iter().collect::<Vec<_>>().join(",")
    );

    let enricher = Enricher::new(&filter).with_index_prefix(args.action_index.as_deref());
    let mut store = SymbolStore::new();
    let mut writer = BulkWriter::new(&dest, args.writer_config());
    let mut summary = MergeSummary::default();

    for path in &inputs {
        if shutdown.load(Ordering::Relaxed) {
            info!("shutdown requested, skipping remaining inputs");
            break;
        }

        match convert_file(&enricher, path, &mut store, &mut writer) {
            Ok(stats) => {
                info!(
                    "done {}: events={} trades={} records={} dropped={}",
                    path.display(),
                    stats.events,
                    stats.trades,
                    stats.records,
                    stats.dropped
                );
                summary.files_ok += 1;
                summary.records += stats.records;
            }
            Err(e) => {
                warn!("{}: {e:#}", path.display());
                summary.files_failed += 1;
            }
        }
    }

    if let Err(e) = store.close_all() {
        warn!("closing units: {e}");
    }
    summary.units = writer.units_opened();

    for (symbol, total) in store.totals() {
        info!("finished {symbol} {total}");
    }

    Ok(summary)
}

/// Один входной файл: сброс состояния, проход по событиям, закрытие
/// всех bulk-файлов. Записанное до ошибки остаётся на диске.
pub(crate) fn convert_file<P: ProgressSink>(
    enricher: &Enricher<'_>,
    path: &Path,
    store: &mut SymbolStore,
    writer: &mut BulkWriter<P>,
) -> anyhow::Result<EnrichStats> {
    store.begin_input().context("close units of previous input")?;

    let base = input_base_name(path)?;
    let mut source =
        CaptureReader::open(path).with_context(|| format!("open capture {}", path.display()))?;
    info!("converting {} -> {base}_<SYMBOL>_<n>.ndjson", path.display());
    writer.begin_input(base);

    let result = enricher.run(&mut source, store, writer);
    let closed = store.close_all();

    let stats = match result {
        Ok(stats) => stats,
        Err(aborted) => {
            if let Err(e) = closed {
                warn!("closing units after abort: {e}");
            }
            return Err(aborted.into());
        }
    };
    closed.context("close units")?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::path::PathBuf;
    use tops_core::{CaptureWriter, Event, LogProgress, QuoteUpdate, TradeReport, WriterConfig};

    fn t(ms: i64) -> tops_core::Timestamp {
        Utc.with_ymd_and_hms(2018, 1, 29, 14, 30, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn write_capture(path: &Path, events: &[Event]) {
        let mut w = CaptureWriter::create(path).unwrap();
        for e in events {
            w.write_event(e).unwrap();
        }
        w.finish().unwrap();
    }

    fn trade(sym: &str, price: f64, ms: i64) -> Event {
        Event::Trade(TradeReport {
            symbol: sym.into(),
            timestamp: t(ms),
            price,
            size: 100,
        })
    }

    fn quote(sym: &str, ms: i64) -> Event {
        Event::Quote(QuoteUpdate {
            symbol: sym.into(),
            timestamp: t(ms),
            bid_size: 1,
            bid_price: 10.0,
            ask_price: 10.1,
            ask_size: 2,
        })
    }

    fn unit_records(path: PathBuf) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip(1)
            .step_by(2)
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn trade_history_does_not_leak_into_next_input() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("20180129_A.evcap");
        let b = dir.path().join("20180130_B.evcap");
        write_capture(&a, &[trade("AAPL", 170.0, 0), quote("AAPL", 1)]);
        write_capture(&b, &[quote("AAPL", 2)]);

        let filter = SymbolFilter::new(["AAPL"]);
        let enricher = Enricher::new(&filter);
        let mut store = SymbolStore::new();
        let mut writer = BulkWriter::new(dir.path(), WriterConfig::default());

        convert_file(&enricher, &a, &mut store, &mut writer).unwrap();
        convert_file(&enricher, &b, &mut store, &mut writer).unwrap();

        let first = unit_records(dir.path().join("20180129_A_AAPL_0.ndjson"));
        let second = unit_records(dir.path().join("20180130_B_AAPL_0.ndjson"));
        assert_eq!(first[0]["lsp"], 170.0);
        assert_eq!(second[0]["lsp"], 0.0);
        assert!(second[0]["lst"].is_null());
        assert_eq!(store.get("AAPL").unwrap().total_messages, 2);
    }

    #[test]
    fn corrupt_input_keeps_records_before_the_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("20180129_C.evcap");
        write_capture(&path, &[quote("SPY", 0), quote("SPY", 1)]);
        let mut bytes = fs::read(&path).unwrap();
        bytes.extend_from_slice(&[9, 0, 0]);
        fs::write(&path, bytes).unwrap();

        let filter = SymbolFilter::new(["SPY"]);
        let enricher = Enricher::new(&filter);
        let mut store = SymbolStore::new();
        let mut writer: BulkWriter<LogProgress> = BulkWriter::new(dir.path(), WriterConfig::default());

        let err = convert_file(&enricher, &path, &mut store, &mut writer).unwrap_err();
        assert!(format!("{err:#}").contains("truncated frame"));

        assert_eq!(unit_records(dir.path().join("20180129_C_SPY_0.ndjson")).len(), 2);
        assert!(!store.get("SPY").unwrap().has_open_unit());
    }

    #[test]
    fn run_merge_continues_after_a_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in");
        let out = dir.path().join("out");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("20180128_BAD.evcap"), b"garbage").unwrap();
        write_capture(&src.join("20180129_OK.evcap"), &[quote("AMD", 0), quote("TSLA", 1)]);

        let args = MergeArgs {
            symbols_file: None,
            symbols: None,
            filter: None,
            action_index: None,
            rotate_at: WriterConfig::default().rotation_threshold,
            progress_every: 0,
            source: src,
            dest: Some(out.clone()),
        };
        let summary = run_merge(&args, vec!["AMD".into()], &AtomicBool::new(false)).unwrap();

        assert_eq!(
            summary,
            MergeSummary {
                files_ok: 1,
                files_failed: 1,
                records: 1,
                units: 1
            }
        );
        assert!(out.join("20180129_OK_AMD_0.ndjson").exists());
        assert!(!out.join("20180129_OK_TSLA_0.ndjson").exists());
    }

    #[test]
    fn run_merge_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("20180129_A.evcap");
        write_capture(&path, &[quote("AMD", 0)]);

        let args = MergeArgs {
            symbols_file: None,
            symbols: None,
            filter: None,
            action_index: None,
            rotate_at: WriterConfig::default().rotation_threshold,
            progress_every: 0,
            source: path,
            dest: Some(dir.path().join("out")),
        };
        let summary = run_merge(&args, vec!["AMD".into()], &AtomicBool::new(true)).unwrap();
        assert_eq!(summary, MergeSummary::default());
    }
}
