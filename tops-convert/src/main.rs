//! Точка входа `tops-convert`.
//!
//! Подкоманды:
//! - `merge` - котировки, обогащённые последней сделкой, в bulk NDJSON
//!   по символам с ротацией файлов
//! - `raw`   - все события построчно в JSON
//! - `synth` - синтетический capture-файл для прогона без реальных данных
//!
//! `Ctrl+C` останавливает обработку между входными файлами; уже начатый
//! файл дописывается и закрывается.

mod cli;
mod config;
mod convert;
mod generator;
mod inputs;
mod logging;
mod raw;
mod symbols;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use log::info;

use crate::cli::Command;

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    logging::init(args.log_file.as_deref())?;

    let shutdown = Arc::new(AtomicBool::new(false));

    // Ctrl+C => ставим shutdown=true
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Relaxed);
            info!("shutting down...");
        })?;
    }

    match &args.command {
        Command::Merge(merge) => {
            let symbols = symbols::load_symbols(merge)?;
            let summary = convert::run_merge(merge, symbols, &shutdown)?;
            info!(
                "merge finished: files ok={} failed={}, records={}, units={}",
                summary.files_ok, summary.files_failed, summary.records, summary.units
            );
        }
        Command::Raw(raw) => {
            let (ok, failed) = raw::run_raw(raw, &shutdown)?;
            info!("raw finished: files ok={ok} failed={failed}");
        }
        Command::Synth(synth) => {
            let path = generator::run_synth(synth)?;
            info!("synth finished: {}", path.display());
        }
    }

    Ok(())
}
