//! PDF directory loader: one document per page

use lopdf::{Dictionary, Object};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::{Error, Result};
use crate::types::document::{Document, Metadata, PAGE_KEY, PAGE_LABEL_KEY, SOURCE_KEY, TOTAL_PAGES_KEY};

/// How many file names a `LoadFailure` lists
const FAILURE_SAMPLE_SIZE: usize = 5;

/// Largest page number rendered as roman numerals or letters; above it the
/// label falls back to decimal, since both forms grow linearly with the number
const MAX_ALPHA_LABEL: i64 = 10_000;

/// Loader behaviour switches
#[derive(Debug, Clone, Copy, Default)]
pub struct LoaderOptions {
    /// Log and skip PDFs that fail to load instead of aborting the batch
    pub skip_bad_files: bool,
}

/// Loads every `*.pdf` directly inside a directory (non-recursive)
#[derive(Debug, Clone, Default)]
pub struct PdfLoader {
    options: LoaderOptions,
}

/// Per-file failure, classified by the directory-level caller
#[derive(Debug, Error)]
enum FileLoadError {
    #[error("IoError: {0}")]
    Io(std::io::Error),

    #[error("ParseError: {0}")]
    Parse(String),
}

impl PdfLoader {
    /// Create a loader
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Load all pages of all PDFs in `dir`
    pub fn load(&self, dir: impl AsRef<Path>) -> Result<Vec<Document>> {
        let dir = resolve_dir(dir.as_ref());

        if !dir.exists() {
            return Err(Error::PathNotFound { path: dir });
        }
        if !dir.is_dir() {
            return Err(Error::NotADirectory { path: dir });
        }

        let pdf_files = list_pdf_files(&dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied {
                path: dir.clone(),
                source: e,
            },
            _ => Error::Io(e),
        })?;

        if pdf_files.is_empty() {
            return Err(Error::NoMatchingFiles { path: dir });
        }

        tracing::info!("Loading {} pdf(s) from {}", pdf_files.len(), dir.display());

        let mut documents = Vec::new();
        for file in &pdf_files {
            match load_file(file) {
                Ok(pages) => {
                    tracing::debug!("{}: {} page(s) with text", file.display(), pages.len());
                    documents.extend(pages);
                }
                Err(e) if self.options.skip_bad_files => {
                    tracing::warn!("Skipping {}: {}", file.display(), e);
                }
                Err(FileLoadError::Io(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                    return Err(Error::PermissionDenied { path: dir, source: e });
                }
                Err(e) => {
                    return Err(Error::LoadFailure {
                        path: dir,
                        found: pdf_files.len(),
                        sample: failure_sample(&pdf_files),
                        message: format!("{}: {}", file_name(file), e),
                    });
                }
            }
        }

        if documents.is_empty() {
            return Err(Error::EmptyResult { path: dir });
        }

        tracing::info!("Loaded {} document(s)", documents.len());
        Ok(documents)
    }
}

/// Expand `~` and anchor relative paths at the current working directory
fn resolve_dir(dir: &Path) -> PathBuf {
    let expanded = match dir.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| dir.to_path_buf()),
        Err(_) => dir.to_path_buf(),
    };

    if expanded.is_absolute() {
        return expanded;
    }

    let joined = std::env::current_dir()
        .map(|cwd| cwd.join(&expanded))
        .unwrap_or(expanded);
    std::fs::canonicalize(&joined).unwrap_or(joined)
}

/// Visible regular files matching `*.pdf`, sorted by name
fn list_pdf_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let visible = path
            .file_name()
            .map_or(false, |name| !name.to_string_lossy().starts_with('.'));
        let is_pdf = path.extension().map_or(false, |ext| ext == "pdf");
        if visible && is_pdf && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn failure_sample(files: &[PathBuf]) -> String {
    let names: Vec<String> = files.iter().take(FAILURE_SAMPLE_SIZE).map(|p| file_name(p)).collect();
    let more = if files.len() > FAILURE_SAMPLE_SIZE { "..." } else { "" };
    format!("{:?}{}", names, more)
}

/// Extract one document per non-empty page
fn load_file(path: &Path) -> std::result::Result<Vec<Document>, FileLoadError> {
    let data = std::fs::read(path).map_err(FileLoadError::Io)?;
    let pdf = lopdf::Document::load_mem(&data).map_err(|e| FileLoadError::Parse(e.to_string()))?;

    let pages = pdf.get_pages();
    let total_pages = pages.len();
    let labels = page_labels(&pdf, total_pages);
    let info = info_metadata(&pdf);
    let source = path.to_string_lossy().to_string();

    let page_metadata = |index: usize| {
        let mut metadata = info.clone();
        metadata.insert(SOURCE_KEY.to_string(), source.clone());
        metadata.insert(PAGE_KEY.to_string(), index.to_string());
        metadata.insert(
            PAGE_LABEL_KEY.to_string(),
            labels.get(index).cloned().unwrap_or_else(|| (index + 1).to_string()),
        );
        metadata.insert(TOTAL_PAGES_KEY.to_string(), total_pages.to_string());
        metadata
    };

    let mut texts = Vec::with_capacity(total_pages);
    for page_number in pages.keys() {
        match pdf.extract_text(&[*page_number]) {
            Ok(text) => texts.push(text),
            Err(e) => {
                tracing::debug!(
                    "Per-page extraction failed for {} ({}), using whole-file extraction",
                    path.display(),
                    e
                );
                let text = extract_whole_file(&data)?;
                return Ok(non_empty(vec![Document::new(text, page_metadata(0))]));
            }
        }
    }

    let documents = texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| Document::new(text, page_metadata(index)))
        .collect();

    Ok(non_empty(documents))
}

/// pdf-extract panics on some malformed fonts; treat that as a parse error
fn extract_whole_file(data: &[u8]) -> std::result::Result<String, FileLoadError> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(data)
    }))
    .map_err(|_| FileLoadError::Parse("text extraction panicked".to_string()))?
    .map_err(|e| FileLoadError::Parse(e.to_string()))
}

fn non_empty(documents: Vec<Document>) -> Vec<Document> {
    documents
        .into_iter()
        .filter(|doc| !doc.page_content.trim().is_empty())
        .collect()
}

/// String entries of the trailer `/Info` dictionary, keys lowercased
fn info_metadata(pdf: &lopdf::Document) -> Metadata {
    let mut metadata = Metadata::new();

    let info = pdf
        .trailer
        .get(b"Info")
        .and_then(|obj| pdf.dereference(obj))
        .and_then(|(_, obj)| obj.as_dict());
    let Ok(info) = info else {
        return metadata;
    };

    for (key, value) in info.iter() {
        let Ok((_, value)) = pdf.dereference(value) else {
            continue;
        };
        if let Object::String(bytes, _) = value {
            let text = decode_text_string(bytes);
            if !text.is_empty() {
                metadata.insert(String::from_utf8_lossy(key).to_lowercase(), text);
            }
        }
    }

    metadata
}

/// PDF text strings are UTF-16BE with a BOM, or PDFDocEncoding (Latin-1 superset)
fn decode_text_string(bytes: &[u8]) -> String {
    let text = if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    };
    text.trim().to_string()
}

/// Numbering style of one `/PageLabels` range
#[derive(Debug, Clone)]
struct LabelRange {
    first_page: usize,
    style: Option<u8>,
    prefix: String,
    start: i64,
}

impl LabelRange {
    fn from_dict(first_page: usize, dict: &Dictionary) -> Self {
        let style = dict
            .get(b"S")
            .and_then(Object::as_name)
            .ok()
            .and_then(|name| name.first().copied());
        let prefix = match dict.get(b"P") {
            Ok(Object::String(bytes, _)) => decode_text_string(bytes),
            _ => String::new(),
        };
        let start = dict.get(b"St").and_then(Object::as_i64).unwrap_or(1).max(1);

        Self {
            first_page,
            style,
            prefix,
            start,
        }
    }

    fn label(&self, page_index: usize) -> String {
        let offset = i64::try_from(page_index.saturating_sub(self.first_page)).unwrap_or(i64::MAX);
        let n = self.start.saturating_add(offset);
        let number = match self.style {
            Some(b'D') => n.to_string(),
            Some(b'R' | b'r' | b'A' | b'a') if n > MAX_ALPHA_LABEL => n.to_string(),
            Some(b'R') => roman(n).to_uppercase(),
            Some(b'r') => roman(n),
            Some(b'A') => letters(n).to_uppercase(),
            Some(b'a') => letters(n),
            _ => String::new(),
        };
        format!("{}{}", self.prefix, number)
    }
}

/// Label for every page: `/PageLabels` when present, otherwise 1-based numbers
fn page_labels(pdf: &lopdf::Document, total_pages: usize) -> Vec<String> {
    let mut ranges = Vec::new();

    let tree = pdf
        .trailer
        .get(b"Root")
        .and_then(|obj| pdf.dereference(obj))
        .and_then(|(_, obj)| obj.as_dict())
        .and_then(|catalog| catalog.get(b"PageLabels"))
        .and_then(|obj| pdf.dereference(obj))
        .and_then(|(_, obj)| obj.as_dict());
    if let Ok(tree) = tree {
        collect_label_ranges(pdf, tree, &mut ranges, 0);
    }
    ranges.sort_by_key(|range: &LabelRange| range.first_page);

    (0..total_pages)
        .map(|index| {
            ranges
                .iter()
                .rev()
                .find(|range| range.first_page <= index)
                .map(|range| range.label(index))
                .unwrap_or_else(|| (index + 1).to_string())
        })
        .collect()
}

/// Walk a number tree (`/Nums` leaves, `/Kids` intermediate nodes)
fn collect_label_ranges(pdf: &lopdf::Document, node: &Dictionary, out: &mut Vec<LabelRange>, depth: usize) {
    if depth > 16 {
        return;
    }

    if let Ok(nums) = node
        .get(b"Nums")
        .and_then(|obj| pdf.dereference(obj))
        .and_then(|(_, obj)| obj.as_array())
    {
        for pair in nums.chunks_exact(2) {
            let Ok(first_page) = pair[0].as_i64() else {
                continue;
            };
            let dict = pdf.dereference(&pair[1]).and_then(|(_, obj)| obj.as_dict());
            if let Ok(dict) = dict {
                out.push(LabelRange::from_dict(first_page.max(0) as usize, dict));
            }
        }
    }

    if let Ok(kids) = node
        .get(b"Kids")
        .and_then(|obj| pdf.dereference(obj))
        .and_then(|(_, obj)| obj.as_array())
    {
        for kid in kids {
            if let Ok(kid) = pdf.dereference(kid).and_then(|(_, obj)| obj.as_dict()) {
                collect_label_ranges(pdf, kid, out, depth + 1);
            }
        }
    }
}

fn roman(mut n: i64) -> String {
    const NUMERALS: [(i64, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut out = String::new();
    for (value, numeral) in NUMERALS {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}

/// a..z, then aa..zz, then aaa..zzz
fn letters(n: i64) -> String {
    if n < 1 {
        return String::new();
    }
    let letter = (b'a' + ((n - 1) % 26) as u8) as char;
    let repeat = ((n - 1) / 26 + 1) as usize;
    std::iter::repeat(letter).take(repeat).collect()
}
