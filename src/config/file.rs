//! File and directory configuration sources.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::combinator::OnFail;
use super::encoding::Encoding;
use super::format::{Format, Formats};
use super::source::{Resolution, Source};
use super::value::{merge_values, Value};
use super::ConfigError;

/// A configuration source that parses a single file.
///
/// The parser is picked by extension when that format is enabled. Otherwise
/// every enabled format is tried in priority order and the first one that
/// yields a mapping wins.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    encoding: Encoding,
    formats: Formats,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            encoding: Encoding::Utf8,
            formats: Formats::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_formats(mut self, formats: Formats) -> Self {
        self.formats = formats;
        self
    }
}

impl Source for FileSource {
    fn resolve(&self) -> Resolution {
        let text = read_config_file(&self.path, self.encoding)?;

        if let Some(format) = Format::from_extension(&self.path)
            .filter(|format| self.formats.contains(*format))
        {
            return format
                .parse_mapping(&text)
                .map_err(|message| ConfigError::ParseError {
                    path: self.path.clone(),
                    format,
                    message,
                });
        }

        for format in self.formats.enabled() {
            match format.parse_mapping(&text) {
                Ok(value) => return Ok(value),
                Err(message) => {
                    tracing::debug!(
                        path = %self.path.display(),
                        %format,
                        %message,
                        "format did not match"
                    );
                }
            }
        }

        Err(ConfigError::UnrecognizedFormat(self.path.clone()))
    }
}

/// Reads and decodes a config file. The handle is closed before parsing starts.
fn read_config_file(path: &Path, encoding: Encoding) -> Result<String, ConfigError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    encoding
        .decode(&bytes)
        .ok_or_else(|| ConfigError::DecodeError {
            path: path.to_path_buf(),
            encoding: encoding.to_string(),
        })
}

/// A configuration source that merges every file in a directory.
///
/// Files are visited in lexicographic order of their names, so later names
/// take precedence. Files no enabled format accepts are skipped, so a
/// directory without any parseable file resolves to an empty mapping.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
    encoding: Encoding,
    formats: Formats,
    scan_subdirectories: bool,
    on_fail: OnFail,
}

impl DirectorySource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            encoding: Encoding::Utf8,
            formats: Formats::default(),
            scan_subdirectories: true,
            on_fail: OnFail::Raise,
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_formats(mut self, formats: Formats) -> Self {
        self.formats = formats;
        self
    }

    pub fn scan_subdirectories(mut self, scan: bool) -> Self {
        self.scan_subdirectories = scan;
        self
    }

    pub fn with_on_fail(mut self, on_fail: OnFail) -> Self {
        self.on_fail = on_fail;
        self
    }

    /// Lists the files this source would read, in merge order.
    pub fn files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        if !self.path.is_dir() {
            return Err(ConfigError::DirectoryNotFound(self.path.clone()));
        }

        let max_depth = if self.scan_subdirectories { usize::MAX } else { 1 };
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| ConfigError::DirectoryRead {
                path: self.path.clone(),
                source: e,
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

impl Source for DirectorySource {
    fn resolve(&self) -> Resolution {
        let mut merged = Value::default();

        for path in self.files()? {
            let file = FileSource::new(&path)
                .with_encoding(self.encoding)
                .with_formats(self.formats);
            match file.resolve() {
                Ok(value) => merged = merge_values(merged, value),
                Err(ConfigError::UnrecognizedFormat(_)) => {
                    tracing::debug!(path = %path.display(), "not a config file");
                }
                Err(e) if self.on_fail == OnFail::Silent => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping config file");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(merged)
    }
}
