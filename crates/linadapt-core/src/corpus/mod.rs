//! Corpus loading and chunking.
//!
//! Turns a set of source files (PDF, Markdown, plain text) into an ordered
//! list of identified text chunks ready for question generation and
//! embedding.
//!
//! # Why Chunk Before Tokenizing?
//!
//! 1. **Coherence**: preserves natural boundaries (sentences, paragraphs)
//! 2. **Quality**: models produce better embeddings for complete semantic units
//! 3. **Ground truth**: each synthetic question points at exactly one chunk

pub mod pdf;
pub mod splitter;
mod types;

pub use splitter::{Chunker, ChunkerKind};
pub use types::{NodeId, SourceDocument, TextChunk};

use crate::error::CorpusError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File type for loading and chunking strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// PDF documents (*.pdf), text extracted before chunking
    Pdf,
    /// Markdown files (*.md, *.markdown)
    Markdown,
    /// Plain text files (*.txt, *.text)
    Text,
    /// Anything else, skipped by the loader
    Unsupported,
}

/// Detects file type from the path's extension (case-insensitive).
pub fn detect_file_type<P: AsRef<Path>>(path: P) -> FileType {
    let Some(ext) = path.as_ref().extension() else {
        return FileType::Unsupported;
    };
    match ext.to_string_lossy().to_lowercase().as_str() {
        "pdf" => FileType::Pdf,
        "md" | "markdown" => FileType::Markdown,
        "txt" | "text" => FileType::Text,
        _ => FileType::Unsupported,
    }
}

/// Loads source documents from explicit file paths and/or directories.
///
/// Directories are expanded non-recursively, in sorted order, so corpus
/// loading is deterministic. Unsupported files are skipped with a warning.
///
/// # Errors
///
/// Fails on unreadable files, unparseable PDFs, and files whose extracted
/// text is empty. A directory that expands to nothing is not an error here;
/// callers decide whether an empty corpus is acceptable.
pub fn load_corpus<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<SourceDocument>, CorpusError> {
    let mut files: Vec<PathBuf> = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let entries = std::fs::read_dir(path).map_err(|source| CorpusError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let mut children: Vec<PathBuf> = entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            children.sort();
            files.extend(children);
        } else {
            files.push(path.to_path_buf());
        }
    }

    let mut documents = Vec::new();
    for file in files {
        let file_type = detect_file_type(&file);
        let text = match file_type {
            FileType::Pdf => pdf::extract_pdf_text(&file)?,
            FileType::Markdown | FileType::Text => {
                std::fs::read_to_string(&file).map_err(|source| CorpusError::Io {
                    path: file.display().to_string(),
                    source,
                })?
            }
            FileType::Unsupported => {
                warn!("Skipping unsupported file: {}", file.display());
                continue;
            }
        };

        if text.trim().is_empty() {
            return Err(CorpusError::EmptyDocument(file.display().to_string()));
        }

        debug!(
            "Loaded {} ({} chars, {:?})",
            file.display(),
            text.len(),
            file_type
        );
        documents.push(SourceDocument {
            source: file.display().to_string(),
            text,
        });
    }

    Ok(documents)
}

/// Chunks every document and assigns stable node IDs.
///
/// The chunker kind is chosen per document from its file type (Markdown
/// files get header-aware splitting). Node IDs are `{file-stem}-{index}`,
/// so two documents with the same stem (say `train/report.txt` and
/// `extra/report.txt`) would collide; chunking rejects such a corpus with
/// `CorpusError::DuplicateStem` rather than silently merging chunks.
pub fn chunk_corpus(
    documents: &[SourceDocument],
    mut make_chunker: impl FnMut(ChunkerKind) -> Chunker,
) -> Result<Vec<(NodeId, TextChunk)>, CorpusError> {
    let mut nodes = Vec::new();
    let mut seen_stems: HashMap<String, &str> = HashMap::new();

    for doc in documents {
        let kind = match detect_file_type(&doc.source) {
            FileType::Markdown => ChunkerKind::Markdown,
            _ => ChunkerKind::Text,
        };
        let chunker = make_chunker(kind);
        let stem = file_stem(&doc.source);
        if let Some(first) = seen_stems.insert(stem.clone(), &doc.source) {
            return Err(CorpusError::DuplicateStem {
                stem,
                first: first.to_string(),
                second: doc.source.clone(),
            });
        }

        let chunks = chunker.chunk(&doc.text)?;
        debug!("Chunked {} into {} chunks", doc.source, chunks.len());
        for chunk in chunks {
            nodes.push((NodeId::new(&stem, chunk.index), chunk));
        }
    }

    Ok(nodes)
}

/// Extracts a filesystem-friendly stem from a source label.
fn file_stem(source: &str) -> String {
    Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| source.to_string())
}
