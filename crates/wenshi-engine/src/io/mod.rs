use std::fs;
use std::path::{Path, PathBuf};

pub mod envelope;
pub mod validate;

use envelope::{EnvelopeError, Metadata, WenFile};
use validate::{ValidationError, validate_text};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported file type: {0} (expected .wen or .txt)")]
    UnsupportedType(PathBuf),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("Invalid content: {0}")]
    Invalid(#[from] ValidationError),
    #[error("Invalid documents directory: {0}")]
    InvalidDocumentsDir(String),
}

/// On-disk document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Annotated text inside the timestamped XML envelope.
    Wen,
    /// Bare annotated text.
    Txt,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "wen" => Some(FileKind::Wen),
            "txt" => Some(FileKind::Txt),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Wen => "wen",
            FileKind::Txt => "txt",
        }
    }
}

/// A document read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedDocument {
    pub path: PathBuf,
    pub kind: FileKind,
    /// Annotated text with LF line endings.
    pub content: String,
    /// Present for `.wen` files.
    pub metadata: Option<Metadata>,
}

/// Read a file and return its content
pub fn read_file(path: &Path) -> Result<String, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(IoError::Io)
}

/// Write content to a file, creating parent directories
pub fn write_file(path: &Path, content: &str) -> Result<(), IoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }
    fs::write(path, content).map_err(IoError::Io)
}

/// Open and validate a `.wen` or `.txt` document.
pub fn open_document(path: &Path) -> Result<OpenedDocument, IoError> {
    let kind =
        FileKind::from_path(path).ok_or_else(|| IoError::UnsupportedType(path.to_path_buf()))?;
    let raw = read_file(path)?;
    let (content, metadata) = match kind {
        FileKind::Wen => {
            let file = envelope::parse(&raw)?;
            (file.content, Some(file.metadata))
        }
        FileKind::Txt => {
            validate_text(&raw)?;
            (raw.replace("\r\n", "\n"), None)
        }
    };
    log::info!("Opened {} ({} chars)", path.display(), content.chars().count());
    Ok(OpenedDocument {
        path: path.to_path_buf(),
        kind,
        content,
        metadata,
    })
}

impl OpenedDocument {
    /// A new, unsaved document.
    pub fn new(path: PathBuf, content: impl Into<String>) -> Result<Self, IoError> {
        let kind = FileKind::from_path(&path).ok_or_else(|| IoError::UnsupportedType(path.clone()))?;
        Ok(Self {
            metadata: (kind == FileKind::Wen).then(Metadata::new),
            path,
            kind,
            content: content.into(),
        })
    }

    /// Validate `content` and write it back to this document's path.
    ///
    /// `.wen` files keep their creation time and get a fresh modification
    /// time.
    pub fn save(&mut self, content: &str) -> Result<(), IoError> {
        let data = match self.kind {
            FileKind::Wen => {
                let mut file = WenFile {
                    metadata: self.metadata.clone().unwrap_or_default(),
                    content: String::new(),
                };
                file.update(content);
                let xml = file.to_xml()?;
                self.metadata = Some(file.metadata);
                xml
            }
            FileKind::Txt => {
                validate_text(content)?;
                content.to_string()
            }
        };
        write_file(&self.path, &data)?;
        self.content = content.to_string();
        log::info!("Saved {}", self.path.display());
        Ok(())
    }
}

/// Scan for `.wen` and `.txt` documents under a directory
pub fn scan_documents(root: &Path) -> Result<Vec<PathBuf>, IoError> {
    if !root.is_dir() {
        return Err(IoError::InvalidDocumentsDir(
            "documents directory not found".to_string(),
        ));
    }

    let mut files = Vec::new();
    scan_directory_recursive(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    for entry in fs::read_dir(dir).map_err(IoError::Io)? {
        let path = entry.map_err(IoError::Io)?.path();
        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if FileKind::from_path(&path).is_some() {
            files.push(path);
        }
    }
    Ok(())
}
