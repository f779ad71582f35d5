//! Input and output surface
//!
//! Raw DDL arrives either as an uploaded file or as pasted text. Uploaded
//! bytes are decoded as UTF-8 with invalid sequences replaced, so decoding
//! never fails. The converted DDL is offered under a name derived from the
//! upload.

use std::borrow::Cow;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Download name used when no file was uploaded
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "converted_snowflake.sql";

/// Suffix appended to the upload's base name
pub const OUTPUT_SUFFIX: &str = "_snowflake.sql";

/// Extensions accepted without a warning
pub const ACCEPTED_EXTENSIONS: &[&str] = &["sql", "txt"];

/// Errors reading DDL input
#[derive(Error, Debug)]
pub enum InputError {
    /// The file could not be read
    #[error("Error reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Standard input could not be read
    #[error("Error reading standard input: {0}")]
    Stdin(#[source] std::io::Error),
}

/// Where the Oracle DDL came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlSource {
    /// Uploaded file contents
    Upload { file_name: String, bytes: Vec<u8> },
    /// Freeform pasted text
    Pasted(String),
}

impl DdlSource {
    /// Uploaded file
    pub fn upload(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        DdlSource::Upload {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Pasted text
    pub fn pasted(text: impl Into<String>) -> Self {
        DdlSource::Pasted(text.into())
    }

    /// Read a file as an upload
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if !extension
            .as_deref()
            .is_some_and(|e| ACCEPTED_EXTENSIONS.contains(&e))
        {
            tracing::warn!(
                path = %path.display(),
                "Input is not a .sql or .txt file; reading it as text anyway"
            );
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(DdlSource::upload(file_name, bytes))
    }

    /// Read everything from a reader as pasted text
    pub fn from_reader(mut reader: impl Read) -> Result<Self, InputError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(InputError::Stdin)?;
        Ok(DdlSource::Pasted(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    }

    /// The raw DDL text
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            DdlSource::Upload { bytes, .. } => String::from_utf8_lossy(bytes),
            DdlSource::Pasted(text) => Cow::Borrowed(text),
        }
    }

    /// Name under which the converted DDL is offered
    pub fn output_file_name(&self) -> String {
        match self {
            DdlSource::Upload { file_name, .. } => output_file_name(Some(file_name)),
            DdlSource::Pasted(_) => output_file_name(None),
        }
    }
}

/// `{basename}_snowflake.sql`, or [`DEFAULT_OUTPUT_FILE_NAME`]
///
/// The base name is the file name up to its first `.`, so
/// `schema.v2.sql` becomes `schema_snowflake.sql`.
pub fn output_file_name(uploaded: Option<&str>) -> String {
    let base = uploaded
        .map(|name| {
            Path::new(name)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .and_then(|name| name.split('.').next().map(str::to_string))
        .filter(|base| !base.trim().is_empty());

    match base {
        Some(base) => format!("{base}{OUTPUT_SUFFIX}"),
        None => DEFAULT_OUTPUT_FILE_NAME.to_string(),
    }
}
