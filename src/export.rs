//! Spreadsheet/document export downloads.
//!
//! The backend streams a file; the transport hands it through untouched as
//! `Body::Binary` and this module only names it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::client::AdminClient;
use crate::error::HttpError;
use crate::transport::{Body, RequestOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Excel,
    Word,
}

impl ExportFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excel => "excel",
            Self::Word => "word",
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Excel => "xlsx",
            Self::Word => "docx",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "excel" | "xlsx" | "csv" => Some(Self::Excel),
            "word" | "docx" | "doc" => Some(Self::Word),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Download `<entity>/export/?type=<format>` plus any extra filter params.
///
/// # Errors
///
/// Returns [`HttpError`] if the request fails or the backend answers with
/// JSON or nothing instead of a file.
pub async fn export(
    client: &AdminClient,
    entity: &str,
    format: ExportFormat,
    options: RequestOptions,
) -> Result<ExportFile, HttpError> {
    let entity = entity.trim_matches('/');
    let path = format!("{entity}/export/");
    let body = client.get(&path, options.query("type", format.as_str())).await?;

    let Body::Binary(file) = body else {
        return Err(HttpError::new(200, "export returned no file"));
    };
    let filename = file
        .content_disposition
        .as_deref()
        .and_then(disposition_filename)
        .unwrap_or_else(|| format!("{entity}.{}", format.extension()));
    tracing::info!(entity, format = %format, filename = %filename, bytes = file.bytes.len(), "export downloaded");
    Ok(ExportFile { filename, content_type: file.content_type, bytes: file.bytes })
}

/// `filename` from a `Content-Disposition` header, quoted or bare.
pub(crate) fn disposition_filename(header: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let name = value.trim().trim_matches('"').trim();
        let name = name.rsplit(['/', '\\']).next().unwrap_or_default();
        if name.is_empty() { None } else { Some(name.to_string()) }
    })
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
