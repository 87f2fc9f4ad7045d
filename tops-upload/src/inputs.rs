use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use log::{info, warn};
use tops_core::constants::RESPONSE_SIDECAR_SUFFIX;
use tops_core::naming::sidecar_path;

use crate::config::UNIT_SUFFIX;

/// Bulk-файлы к загрузке.
///
/// Файл берётся как есть, в каталоге (без рекурсии) - обычные файлы
/// с именем на `ndjson`, по порядку имён. С `skip_uploaded` выбрасываются
/// файлы, рядом с которыми уже лежит `.response.json`.
pub(crate) fn collect_units(source: &Path, skip_uploaded: bool) -> anyhow::Result<Vec<PathBuf>> {
    let md = fs::symlink_metadata(source).with_context(|| format!("stat {}", source.display()))?;

    let mut units = if md.is_file() {
        vec![source.to_path_buf()]
    } else if md.is_dir() {
        let mut out = Vec::new();
        for entry in fs::read_dir(source).with_context(|| format!("read dir {}", source.display()))? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.ends_with(UNIT_SUFFIX) {
                continue;
            }
            match entry.file_type() {
                Ok(ft) if ft.is_file() => out.push(entry.path()),
                _ => warn!("cannot open or is not a file {name}"),
            }
        }
        out.sort();
        out
    } else {
        bail!("{} is neither regular file nor directory", source.display());
    };

    if skip_uploaded {
        units.retain(|unit| {
            let done = sidecar_path(unit, RESPONSE_SIDECAR_SUFFIX).exists();
            if done {
                info!("already uploaded, skipping {}", unit.display());
            }
            !done
        });
    }
    Ok(units)
}
