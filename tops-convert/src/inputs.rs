use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use log::warn;
use tops_core::constants::CAPTURE_EXTENSION;

/// Входные capture-файлы.
///
/// Файл берётся как есть. В каталоге (без рекурсии) - обычные файлы
/// с capture-расширением и подстрокой `name_filter` в имени,
/// в отсортированном порядке. `X.evcap.md5` и подобные не берутся:
/// базовое имя у них то же, что у `X.evcap`.
pub(crate) fn collect_inputs(source: &Path, name_filter: Option<&str>) -> anyhow::Result<Vec<PathBuf>> {
    let md = fs::symlink_metadata(source).with_context(|| format!("stat {}", source.display()))?;

    if md.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }
    if !md.is_dir() {
        bail!("{} is neither regular file nor directory", source.display());
    }

    let mut out = Vec::new();
    for entry in fs::read_dir(source).with_context(|| format!("read dir {}", source.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if !name.ends_with(CAPTURE_EXTENSION) {
            continue;
        }
        if name_filter.is_some_and(|f| !name.contains(f)) {
            continue;
        }
        match entry.file_type() {
            Ok(ft) if ft.is_file() => out.push(entry.path()),
            _ => warn!("cannot open or is not a file {name}"),
        }
    }

    out.sort();
    Ok(out)
}
