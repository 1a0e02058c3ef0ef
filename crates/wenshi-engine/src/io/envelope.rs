//! The `.wen` envelope: annotated text wrapped in a timestamped XML root.
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <wenshi ver="1.0" createdAt="2024-05-01T08:00:00Z" modifiedAt="...">我{{П}}</wenshi>
//! ```
//!
//! Content is stored with CRLF line endings and read back with LF.

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::io::validate::{ValidationError, validate_text};

pub const FORMAT_VERSION: &str = "1.0";
const ROOT: &[u8] = b"wenshi";
const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Invalid .wen file: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Invalid .wen file: missing <wenshi> root element")]
    MissingRoot,
    #[error("Invalid .wen file: unexpected element <{0}>")]
    UnexpectedElement(String),
    #[error("Invalid .wen file: missing required attribute '{0}'")]
    MissingAttribute(&'static str),
    #[error("Invalid .wen file: invalid timestamp format in '{attribute}'")]
    InvalidTimestamp {
        attribute: &'static str,
        #[source]
        source: chrono::ParseError,
    },
    #[error("Invalid .wen file content: {0}")]
    InvalidContent(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub version: String,
    pub created_at: DateTime<FixedOffset>,
    pub modified_at: DateTime<FixedOffset>,
}

impl Metadata {
    /// Metadata for a document created now.
    pub fn new() -> Self {
        let now = now();
        Self {
            version: FORMAT_VERSION.to_string(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Same creation time, modified now.
    pub fn touched(&self) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            created_at: self.created_at,
            modified_at: now(),
        }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WenFile {
    pub metadata: Metadata,
    /// Annotated text with LF line endings.
    pub content: String,
}

impl WenFile {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            metadata: Metadata::new(),
            content: content.into(),
        }
    }

    /// Replace the content, keeping `createdAt` and refreshing `modifiedAt`.
    pub fn update(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.metadata = self.metadata.touched();
    }

    pub fn to_xml(&self) -> Result<String, EnvelopeError> {
        serialize(&self.content, &self.metadata)
    }
}

/// Reads an envelope. The content is validated and trimmed.
pub fn parse(xml: &str) -> Result<WenFile, EnvelopeError> {
    let mut reader = Reader::from_str(xml);
    let mut header: Option<Header> = None;
    let mut inside_root = false;
    let mut content = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                check_root(&e, header.is_some())?;
                header = Some(Header::read(&e)?);
                inside_root = true;
            }
            Event::Empty(e) => {
                check_root(&e, header.is_some())?;
                header = Some(Header::read(&e)?);
            }
            Event::End(_) => inside_root = false,
            Event::Text(e) if inside_root => content.push_str(&e.unescape()?),
            Event::CData(e) if inside_root => {
                content.push_str(&reader.decoder().decode(&e)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let header = header.ok_or(EnvelopeError::MissingRoot)?;
    let version = header
        .version
        .filter(|v| !v.is_empty())
        .ok_or(EnvelopeError::MissingAttribute("ver"))?;
    let created_at = timestamp("createdAt", header.created_at)?;
    let modified_at = timestamp("modifiedAt", header.modified_at)?;

    let content = to_lf(&content);
    validate_text(&content)?;

    Ok(WenFile {
        metadata: Metadata {
            version,
            created_at,
            modified_at,
        },
        content: content.trim().to_string(),
    })
}

/// Writes an envelope around validated content.
pub fn serialize(content: &str, metadata: &Metadata) -> Result<String, EnvelopeError> {
    validate_text(content)?;
    let body = to_lf(content).replace('\n', "\r\n");
    Ok(format!(
        "{XML_DECLARATION}\n<wenshi ver=\"{}\" createdAt=\"{}\" modifiedAt=\"{}\">{}</wenshi>",
        html_escape::encode_double_quoted_attribute(&metadata.version),
        format_timestamp(&metadata.created_at),
        format_timestamp(&metadata.modified_at),
        html_escape::encode_text(&body),
    ))
}

pub fn format_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[derive(Debug, Default)]
struct Header {
    version: Option<String>,
    created_at: Option<String>,
    modified_at: Option<String>,
}

impl Header {
    fn read(e: &BytesStart<'_>) -> Result<Self, EnvelopeError> {
        let mut header = Self::default();
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let value = attr.unescape_value()?.into_owned();
            match attr.key.as_ref() {
                b"ver" => header.version = Some(value),
                b"createdAt" => header.created_at = Some(value),
                b"modifiedAt" => header.modified_at = Some(value),
                _ => {}
            }
        }
        Ok(header)
    }
}

fn check_root(e: &BytesStart<'_>, seen_root: bool) -> Result<(), EnvelopeError> {
    if seen_root || e.name().as_ref() != ROOT {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        return Err(EnvelopeError::UnexpectedElement(name));
    }
    Ok(())
}

fn timestamp(
    attribute: &'static str,
    value: Option<String>,
) -> Result<DateTime<FixedOffset>, EnvelopeError> {
    let value = value
        .filter(|v| !v.is_empty())
        .ok_or(EnvelopeError::MissingAttribute(attribute))?;
    DateTime::parse_from_rfc3339(&value)
        .map_err(|source| EnvelopeError::InvalidTimestamp { attribute, source })
}

fn now() -> DateTime<FixedOffset> {
    let now = Utc::now().fixed_offset();
    // Second precision, like the timestamps other tools write.
    DateTime::parse_from_rfc3339(&now.to_rfc3339_opts(SecondsFormat::Secs, true)).unwrap_or(now)
}

fn to_lf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
