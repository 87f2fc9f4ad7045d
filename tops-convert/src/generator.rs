use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use chrono::{Duration, NaiveDate};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tops_core::constants::CAPTURE_EXTENSION;
use tops_core::{
    CaptureWriter, Event, OfficialPrice, QuoteUpdate, Timestamp, TradeReport, WireError,
};

use crate::cli::SynthArgs;
use crate::config::SYNTH_SESSION_OPEN;
use crate::symbols::load_from_arg;

/// Тип сообщения "system event" в `Event::Other`
const SYSTEM_EVENT_KIND: u8 = b'S';

#[derive(Debug, Clone)]
pub(crate) struct GeneratorConfig {
    /// Максимальный относительный шаг mid за событие (0.0005 = 0.05%)
    pub(crate) max_rel_step: f64,
    /// Минимальная допустимая цена
    pub(crate) min_price: f64,
    /// Доля сделок среди событий
    pub(crate) trade_ratio: f64,
    /// Максимальный шаг часов между событиями, мс
    pub(crate) max_gap_ms: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_rel_step: 0.0005,
            min_price: 0.01,
            trade_ratio: 0.2,
            max_gap_ms: 5,
        }
    }
}

/// Внутреннее состояние символа.
#[derive(Debug, Clone)]
struct SymbolWalk {
    symbol: String,
    mid: f64,
}

/// Случайное блуждание цен: сделки и котировки вперемешку,
/// время строго не убывает.
pub(crate) struct CaptureGenerator<R: Rng> {
    cfg: GeneratorConfig,
    walks: Vec<SymbolWalk>,

    /// Набор "высоколиквидных" символов для более крупного size.
    high_volume: HashSet<String>,
    rng: R,
    clock: Timestamp,
    preamble: Vec<Event>,
}

impl CaptureGenerator<StdRng> {
    pub(crate) fn seeded(symbols: Vec<String>, start: Timestamp, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self::new(symbols, start, GeneratorConfig::default(), rng)
    }
}

impl<R: Rng> CaptureGenerator<R> {
    pub(crate) fn new(symbols: Vec<String>, start: Timestamp, cfg: GeneratorConfig, mut rng: R) -> Self {
        let walks: Vec<SymbolWalk> = symbols
            .into_iter()
            .map(|symbol| SymbolWalk {
                symbol,
                mid: round_cents(rng.random_range(5.0..500.0)),
            })
            .collect();

        let high_volume = ["AAPL", "SPY", "QQQ"]
            .into_iter()
            .map(|s| s.to_string())
            .collect::<HashSet<_>>();

        // начало сессии: system event + цены открытия
        let mut preamble = vec![Event::Other {
            kind: SYSTEM_EVENT_KIND,
        }];
        preamble.extend(walks.iter().map(|w| {
            Event::OfficialPrice(OfficialPrice {
                symbol: w.symbol.clone(),
                timestamp: start,
                price_type: b'Q',
                price: w.mid,
            })
        }));
        preamble.reverse();

        Self {
            cfg,
            walks,
            high_volume,
            rng,
            clock: start,
            preamble,
        }
    }

    /// Следующее событие
    pub(crate) fn next_event(&mut self) -> Event {
        if let Some(ev) = self.preamble.pop() {
            return ev;
        }
        if self.walks.is_empty() {
            return Event::Other {
                kind: SYSTEM_EVENT_KIND,
            };
        }

        self.clock += Duration::milliseconds(self.rng.random_range(0..=self.cfg.max_gap_ms));

        let idx = self.rng.random_range(0..self.walks.len());
        let delta = self
            .rng
            .random_range(-self.cfg.max_rel_step..self.cfg.max_rel_step);
        let walk = &mut self.walks[idx];
        walk.mid = round_cents((1.0 + delta) * walk.mid).max(self.cfg.min_price);

        // size: популярные -> больше
        let size = if self.high_volume.contains(&walk.symbol) {
            100 + self.rng.random_range(0..2000)
        } else {
            1 + self.rng.random_range(0..500)
        };

        if self.rng.random_bool(self.cfg.trade_ratio) {
            let price = if self.rng.random_bool(0.5) {
                walk.mid
            } else {
                round_cents(walk.mid + 0.01)
            };
            Event::Trade(TradeReport {
                symbol: walk.symbol.clone(),
                timestamp: self.clock,
                price,
                size,
            })
        } else {
            let half_spread = 0.01 * f64::from(self.rng.random_range(1..=3u8));
            Event::Quote(QuoteUpdate {
                symbol: walk.symbol.clone(),
                timestamp: self.clock,
                bid_size: size,
                bid_price: round_cents((walk.mid - half_spread).max(self.cfg.min_price)),
                ask_price: round_cents(walk.mid + half_spread),
                ask_size: 1 + self.rng.random_range(0..size),
            })
        }
    }
}

fn round_cents(p: f64) -> f64 {
    (p * 100.0).round() / 100.0
}

/// `<dest>/<YYYYMMDD>_SYNTH.evcap`
pub(crate) fn synth_path(dest: &Path, date: NaiveDate) -> PathBuf {
    dest.join(format!("{}_SYNTH{CAPTURE_EXTENSION}", date.format("%Y%m%d")))
}

/// Начало сессии торгового дня
pub(crate) fn session_open(date: NaiveDate) -> Option<Timestamp> {
    let (h, m) = SYNTH_SESSION_OPEN;
    date.and_hms_opt(h, m, 0).map(|dt| dt.and_utc())
}

/// Записать `count` событий генератора в capture-файл
pub(crate) fn write_synth<R: Rng>(
    path: &Path,
    generator: &mut CaptureGenerator<R>,
    count: u64,
) -> Result<(), WireError> {
    let mut w = CaptureWriter::create(path)?;
    for _ in 0..count {
        w.write_event(&generator.next_event())?;
    }
    w.finish()?;
    info!("wrote {count} events to {}", path.display());
    Ok(())
}

/// synth: capture-файл торгового дня в `args.dest`
pub(crate) fn run_synth(args: &SynthArgs) -> anyhow::Result<PathBuf> {
    let symbols = load_from_arg(&args.symbols)?;
    let start = session_open(args.date).context("session open is out of range")?;
    fs::create_dir_all(&args.dest)
        .with_context(|| format!("create dest dir {}", args.dest.display()))?;

    let path = synth_path(&args.dest, args.date);
    info!(
        "synth: {} event(s) for {} symbol(s), seed={:?}",
        args.events,
        symbols.len(),
        args.seed
    );
    let mut generator = CaptureGenerator::seeded(symbols, start, args.seed);
    write_synth(&path, &mut generator, args.events)
        .with_context(|| format!("write capture {}", path.display()))?;
    Ok(path)
}
