use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use log::{info, warn};
use serde::Serialize;
use tops_core::naming::{input_base_name, raw_file_name};
use tops_core::{CaptureReader, Event, EventSource, OfficialPrice, QuoteUpdate, TradeReport};

use crate::cli::{RawArgs, dest_or_cwd};
use crate::inputs::collect_inputs;

/// Строка сырого экспорта: поля события + `type`
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawLine<'a> {
    Quote(&'a QuoteUpdate),
    Trade(&'a TradeReport),
    OfficialPrice(&'a OfficialPrice),
}

impl<'a> RawLine<'a> {
    fn from_event(event: &'a Event) -> Option<Self> {
        match event {
            Event::Quote(q) => Some(RawLine::Quote(q)),
            Event::Trade(t) => Some(RawLine::Trade(t)),
            Event::OfficialPrice(p) => Some(RawLine::OfficialPrice(p)),
            Event::Other { .. } => None,
        }
    }
}

pub(crate) fn run_raw(args: &RawArgs, shutdown: &AtomicBool) -> anyhow::Result<(usize, usize)> {
    let inputs = collect_inputs(&args.source, args.filter.as_deref())?;
    let dest = dest_or_cwd(args.dest.as_ref());
    fs::create_dir_all(&dest).with_context(|| format!("create dest dir {}", dest.display()))?;

    let symbol = args.symbol.as_deref().map(str::to_ascii_uppercase);
    let (mut ok, mut failed) = (0, 0);

    for path in &inputs {
        if shutdown.load(Ordering::Relaxed) {
            info!("shutdown requested, skipping remaining inputs");
            break;
        }
        match export_file(path, &dest, symbol.as_deref()) {
            Ok(n) => {
                info!("done {}: {n} events", path.display());
                ok += 1;
            }
            Err(e) => {
                warn!("{}: {e:#}", path.display());
                failed += 1;
            }
        }
    }

    Ok((ok, failed))
}

/// Все события файла (или только символа `symbol`) в `<base>[_<SYM>].json`
pub(crate) fn export_file(path: &Path, dest: &Path, symbol: Option<&str>) -> anyhow::Result<u64> {
    let base = input_base_name(path)?;
    let mut source =
        CaptureReader::open(path).with_context(|| format!("open capture {}", path.display()))?;

    let out_path = dest.join(raw_file_name(&base, symbol));
    info!("converting {} to {}", path.display(), out_path.display());
    let file =
        File::create(&out_path).with_context(|| format!("create {}", out_path.display()))?;
    let mut out = BufWriter::with_capacity(1 << 16, file);

    let mut written = 0u64;
    let result = loop {
        let event = match source.next_event() {
            Ok(Some(ev)) => ev,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };
        if symbol.is_some_and(|s| event.symbol() != Some(s)) {
            continue;
        }
        let Some(line) = RawLine::from_event(&event) else {
            continue;
        };
        serde_json::to_writer(&mut out, &line)?;
        out.write_all(b"\n")?;
        written += 1;
    };

    out.flush()
        .with_context(|| format!("flush {}", out_path.display()))?;
    result.with_context(|| format!("decode {} after {written} events", path.display()))?;
    Ok(written)
}
