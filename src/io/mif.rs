use crate::columns::{ColumnIndex, parse_header};
use csv::{Reader, ReaderBuilder};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// First `.mif` header file anywhere under `scratch`, in file name order.
pub fn find_header_file(scratch: &Path) -> Option<PathBuf> {
    WalkDir::new(scratch)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_file() && has_extension(entry.path(), "mif"))
        .map(|entry| entry.into_path())
}

/// The `.mid` data file sitting next to `header` with the same stem.
pub fn find_companion(header: &Path) -> Option<PathBuf> {
    let dir = header.parent()?;
    let stem = header.file_stem()?;

    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.file_stem() == Some(stem) && has_extension(path, "mid"))
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Reads lines lazily so nothing past the `Data` marker is touched. Bytes that
/// are not UTF-8 (exports are usually WindowsLatin1) are replaced.
pub fn read_header(path: &Path) -> std::io::Result<ColumnIndex> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = Vec::new();
    let mut error = None;

    let lines = std::iter::from_fn(|| {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => Some(String::from_utf8_lossy(&buf).into_owned()),
            Err(e) => {
                error = Some(e);
                None
            }
        }
    });
    let index = parse_header(lines);

    match error {
        Some(e) => Err(e),
        None => Ok(index),
    }
}

pub fn open_data(path: &Path) -> Result<Reader<BufReader<File>>, csv::Error> {
    let file = File::open(path)?;
    let rdr = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b',')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));
    Ok(rdr)
}

/// Deletes everything inside `scratch`, leaving the directory itself.
pub fn clear_scratch(scratch: &Path) -> std::io::Result<()> {
    if !scratch.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(scratch)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
