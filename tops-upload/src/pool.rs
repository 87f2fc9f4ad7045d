use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use log::{debug, info, warn};

use crate::upload::{BulkTransport, UnitOutcome, UploadError, upload_unit};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UploadSummary {
    pub(crate) uploaded: usize,
    pub(crate) rejected: usize,
    pub(crate) failed: usize,
    pub(crate) not_started: usize,
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uploaded={} rejected={} failed={} not_started={}",
            self.uploaded, self.rejected, self.failed, self.not_started
        )
    }
}

/// Куда загружать
#[derive(Debug, Clone, Copy)]
pub(crate) struct Destination<'a> {
    pub(crate) endpoint: &'a str,
    pub(crate) index_prefix: &'a str,
}

/// Загрузка `units` на `jobs` потоках.
///
/// Файл целиком обрабатывается одним потоком. После `shutdown` потоки
/// доделывают текущий файл и новых не берут.
pub(crate) fn run_pool<T: BulkTransport>(
    transport: &T,
    dest: Destination<'_>,
    units: Vec<PathBuf>,
    jobs: NonZeroUsize,
    shutdown: &AtomicBool,
) -> UploadSummary {
    let total = units.len();
    let (work_tx, work_rx) = crossbeam_channel::unbounded::<PathBuf>();
    for unit in units {
        if work_tx.send(unit).is_err() {
            break;
        }
    }
    drop(work_tx);

    let (done_tx, done_rx) =
        crossbeam_channel::unbounded::<Result<UnitOutcome, UploadError>>();

    thread::scope(|s| {
        for worker in 0..jobs.get().min(total.max(1)) {
            let work_rx = work_rx.clone();
            let done_tx = done_tx.clone();
            s.spawn(move || {
                for unit in work_rx.iter() {
                    if shutdown.load(Ordering::Relaxed) {
                        debug!("worker {worker}: shutdown");
                        break;
                    }
                    let result = upload_unit(transport, dest.endpoint, dest.index_prefix, &unit);
                    if let Err(e) = &result {
                        warn!("{}: {e}", unit.display());
                    }
                    if done_tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(done_tx);

    let mut summary = UploadSummary::default();
    for result in done_rx.iter() {
        match result {
            Ok(UnitOutcome::Uploaded) => summary.uploaded += 1,
            Ok(UnitOutcome::Rejected) => summary.rejected += 1,
            Err(_) => summary.failed += 1,
        }
    }
    summary.not_started = total - summary.uploaded - summary.rejected - summary.failed;
    if summary.not_started > 0 {
        info!("{} unit(s) left after shutdown", summary.not_started);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::testing::FakeTransport;
    use std::fs;
    use std::path::Path;

    const DEST: Destination<'static> = Destination {
        endpoint: "http://es:9200",
        index_prefix: "tops",
    };

    fn units(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|n| {
                let p = dir.join(n);
                fs::write(&p, "{}\n{}\n").unwrap();
                p
            })
            .collect()
    }

    #[test]
    fn every_unit_is_uploaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let units = units(
            dir.path(),
            &[
                "20180129_T_AAPL_0.ndjson",
                "20180129_T_AAPL_1.ndjson",
                "20190102_T_SPY_0.ndjson",
                "nodate_T_MU_0.ndjson",
            ],
        );
        let t = FakeTransport::replying(200, r#"{"errors":false}"#);

        let summary = run_pool(&t, DEST, units, NonZeroUsize::new(3).unwrap(), &AtomicBool::new(false));

        assert_eq!(
            summary,
            UploadSummary {
                uploaded: 3,
                rejected: 0,
                failed: 1,
                not_started: 0
            }
        );
        assert_eq!(
            t.urls(),
            vec![
                "http://es:9200/tops-aapl-2018/_bulk",
                "http://es:9200/tops-aapl-2018/_bulk",
                "http://es:9200/tops-spy-2019/_bulk",
            ]
        );
    }

    #[test]
    fn rejections_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let units = units(dir.path(), &["20180129_T_AAPL_0.ndjson"]);
        let t = FakeTransport::replying(200, r#"{"errors":true}"#);

        let summary = run_pool(&t, DEST, units, NonZeroUsize::MIN, &AtomicBool::new(false));
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.to_string(), "uploaded=0 rejected=1 failed=0 not_started=0");
    }

    #[test]
    fn shutdown_before_start_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let units = units(dir.path(), &["20180129_T_AAPL_0.ndjson", "20180129_T_AAPL_1.ndjson"]);
        let t = FakeTransport::replying(200, "{}");

        let summary = run_pool(&t, DEST, units, NonZeroUsize::new(2).unwrap(), &AtomicBool::new(true));
        assert_eq!(summary.not_started, 2);
        assert!(t.urls().is_empty());
    }

    #[test]
    fn empty_input_is_fine() {
        let t = FakeTransport::replying(200, "{}");
        let summary = run_pool(&t, DEST, Vec::new(), NonZeroUsize::MIN, &AtomicBool::new(false));
        assert_eq!(summary, UploadSummary::default());
    }
}
