//! Turns files on disk into [`Document`]s. One document per page (PDF), paragraph
//! (DOCX), row (CSV) or sheet (spreadsheet).

use std::io::Read;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use quick_xml::events::Event;
use tracing::{debug, info, warn};

/// Upper bound on the decompressed size of `word/document.xml`.
const MAX_DOCX_XML_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// File name the document was loaded from.
    pub source: Option<String>,
    /// 1-based PDF page.
    pub page: Option<u32>,
    /// 0-based CSV row.
    pub row: Option<usize>,
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    Pdf,
    Docx,
    Csv,
    Spreadsheet,
    Unsupported,
}

impl LoaderKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "csv" => Self::Csv,
            "xlsx" | "xls" => Self::Spreadsheet,
            _ => Self::Unsupported,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(Self::Unsupported, Self::from_extension)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("path not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("spreadsheet extraction failed: {0}")]
    Spreadsheet(#[from] calamine::Error),
}

#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: LoadError,
}

/// Everything one `load_documents` call produced, skipped and failed on.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

/// Loads a single file, or every file directly inside a directory (no recursion).
/// A file that fails to load is recorded in [`LoadReport::failures`] and the rest continue.
pub fn load_documents(path: &Path) -> Result<LoadReport, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        let entries = std::fs::read_dir(path).map_err(|e| LoadError::Io(path.to_path_buf(), e))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LoadError::Io(path.to_path_buf(), e))?;
            let p = entry.path();
            if p.is_file() {
                files.push(p);
            } else {
                debug!(path = %p.display(), "not a file; ignoring");
            }
        }
        files.sort();
        files
    };

    let mut report = LoadReport::default();
    for file in files {
        let kind = LoaderKind::from_path(&file);
        if kind == LoaderKind::Unsupported {
            warn!(path = %file.display(), "unsupported file format; skipping");
            report.skipped.push(file);
            continue;
        }
        match load_file(&file, kind) {
            Ok(docs) => {
                info!(path = %file.display(), documents = docs.len(), "loaded file");
                report.documents.extend(docs);
            }
            Err(error) => {
                warn!(path = %file.display(), %error, "failed to load file");
                report.failures.push(FileFailure { path: file, error });
            }
        }
    }
    Ok(report)
}

pub fn load_file(path: &Path, kind: LoaderKind) -> Result<Vec<Document>, LoadError> {
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    match kind {
        LoaderKind::Pdf => load_pdf(path, source),
        LoaderKind::Docx => load_docx(path, source),
        LoaderKind::Csv => load_csv(path, source),
        LoaderKind::Spreadsheet => load_spreadsheet(path, source),
        LoaderKind::Unsupported => Ok(Vec::new()),
    }
}

fn load_pdf(path: &Path, source: Option<String>) -> Result<Vec<Document>, LoadError> {
    let pdf = lopdf::Document::load(path)?;
    Ok(pdf
        .get_pages()
        .into_keys()
        .map(|page| {
            let text = pdf.extract_text(&[page]).unwrap_or_else(|e| {
                warn!(source = ?source, page, error = %e, "no text extracted from page");
                String::new()
            });
            Document {
                text,
                metadata: Metadata {
                    source: source.clone(),
                    page: Some(page),
                    ..Default::default()
                },
            }
        })
        .collect())
}

fn load_docx(path: &Path, source: Option<String>) -> Result<Vec<Document>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io(path.to_path_buf(), e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| LoadError::Docx(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| LoadError::Docx(e.to_string()))?;
    let mut xml = Vec::new();
    entry
        .take(MAX_DOCX_XML_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| LoadError::Io(path.to_path_buf(), e))?;
    if xml.len() as u64 >= MAX_DOCX_XML_BYTES {
        return Err(LoadError::Docx("word/document.xml exceeds size limit".to_string()));
    }
    Ok(docx_paragraphs(&xml)?
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .map(|text| Document {
            text,
            metadata: Metadata {
                source: source.clone(),
                ..Default::default()
            },
        })
        .collect())
}

/// Text of every `w:p` element, with its `w:t` runs concatenated. A paragraph
/// nested inside another (text boxes) is emitted on its own and the outer
/// paragraph keeps the text around it.
fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, LoadError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match (e.local_name().as_ref(), open.last_mut()) {
                (b"tab", Some(p)) => p.push(' '),
                (b"br" | b"cr", Some(p)) => p.push('\n'),
                (b"p", _) => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(|e| LoadError::Docx(e.to_string()))?;
                if let Some(p) = open.last_mut() {
                    p.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.extend(open.pop()),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(LoadError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(paragraphs)
}

fn load_csv(path: &Path, source: Option<String>) -> Result<Vec<Document>, LoadError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut documents = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let text = headers
            .iter()
            .zip(record.iter())
            .map(|(key, value)| format!("{}: {}", key.trim(), value.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        documents.push(Document {
            text,
            metadata: Metadata {
                source: source.clone(),
                row: Some(row),
                ..Default::default()
            },
        });
    }
    Ok(documents)
}

fn load_spreadsheet(path: &Path, source: Option<String>) -> Result<Vec<Document>, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let mut documents = Vec::new();
    for sheet in workbook.sheet_names() {
        let range = workbook.worksheet_range(&sheet)?;
        let text = range
            .rows()
            .map(|row| {
                row.iter()
                    .filter(|cell| !matches!(cell, Data::Empty))
                    .map(|cell| cell.to_string())
                    .filter(|cell| !cell.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            continue;
        }
        documents.push(Document {
            text,
            metadata: Metadata {
                source: source.clone(),
                sheet: Some(sheet),
                ..Default::default()
            },
        });
    }
    Ok(documents)
}
