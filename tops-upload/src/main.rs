//! Точка входа `tops-upload`.
//!
//! Bulk-файлы (один или каталог) отправляются в индекс
//! `<prefix>-<symbol>-<year>`; итог каждого файла - в sidecar рядом с ним.
//! `Ctrl+C`: начатые файлы догружаются, новые не берутся.

mod cli;
mod config;
mod inputs;
mod pool;
mod upload;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

use crate::pool::Destination;
use crate::upload::HttpTransport;

fn main() -> anyhow::Result<()> {
    // RUST_LOG, по умолчанию info
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let shutdown = Arc::new(AtomicBool::new(false));

    // Ctrl+C => ставим shutdown=true
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::Relaxed);
            info!("shutting down...");
        })?;
    }

    let args = cli::Args::parse();

    let units = inputs::collect_units(&args.source, args.skip_uploaded)?;
    info!(
        "upload: {} unit(s) to {} index={} jobs={}",
        units.len(),
        args.url,
        args.index,
        args.jobs
    );

    let transport =
        HttpTransport::new(&args.user, &args.pass, args.timeout()).context("start uploader")?;
    let dest = Destination {
        endpoint: &args.url,
        index_prefix: &args.index,
    };
    let summary = pool::run_pool(&transport, dest, units, args.jobs, &shutdown);

    info!("upload finished: {summary}");
    Ok(())
}
