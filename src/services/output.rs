use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::error::{ConfigError, OutputError};
use crate::models::OutputFormat;

/// Where and how a job writes its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: Utf8PathBuf,
    pub format: OutputFormat,
    /// Write what was produced so far when the job is cancelled
    pub write_partial_on_cancel: bool,
}

impl OutputTarget {
    pub fn new(path: &Utf8Path, format: OutputFormat, write_partial_on_cancel: bool) -> Result<Self, ConfigError> {
        if path.as_str().trim().is_empty() {
            return Err(ConfigError::NoOutput);
        }
        Ok(Self {
            path: path.to_path_buf(),
            format,
            write_partial_on_cancel,
        })
    }

    pub fn write(&self, candidates: &[String]) -> Result<(), OutputError> {
        OutputWriter::write(candidates, &self.path, self.format)
    }
}

/// Writes the final candidate list to disk.
pub struct OutputWriter;

impl OutputWriter {
    /// Write `candidates` to `path` in `format`, replacing any existing file.
    ///
    /// - TXT: one candidate per line, each terminated by `\n`
    /// - CSV: one header-less column, quoted only when needed
    /// - JSON: a pretty-printed array of strings
    ///
    /// Errors raised after the file was created are flagged as partial.
    pub fn write(candidates: &[String], path: &Utf8Path, format: OutputFormat) -> Result<(), OutputError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| OutputError::Write {
                path: path.to_path_buf(),
                partial: false,
                source,
            })?;
        }

        let file = File::create(path).map_err(|source| OutputError::Write {
            path: path.to_path_buf(),
            partial: false,
            source,
        })?;

        let io_error = |source: std::io::Error| OutputError::Write {
            path: path.to_path_buf(),
            partial: true,
            source,
        };

        match format {
            OutputFormat::Txt => {
                let mut writer = BufWriter::new(file);
                for candidate in candidates {
                    writer.write_all(candidate.as_bytes()).map_err(io_error)?;
                    writer.write_all(b"\n").map_err(io_error)?;
                }
                writer.flush().map_err(io_error)?;
            }
            OutputFormat::Csv => {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .quote_style(csv::QuoteStyle::Necessary)
                    .terminator(csv::Terminator::Any(b'\n'))
                    .from_writer(BufWriter::new(file));
                for candidate in candidates {
                    writer.write_record([candidate]).map_err(|e| OutputError::Encode {
                        path: path.to_path_buf(),
                        partial: true,
                        message: e.to_string(),
                    })?;
                }
                writer.flush().map_err(io_error)?;
            }
            OutputFormat::Json => {
                let mut writer = BufWriter::new(file);
                serde_json::to_writer_pretty(&mut writer, candidates).map_err(|e| OutputError::Encode {
                    path: path.to_path_buf(),
                    partial: true,
                    message: e.to_string(),
                })?;
                writer.write_all(b"\n").map_err(io_error)?;
                writer.flush().map_err(io_error)?;
            }
        }

        tracing::info!("Wrote {} candidates to {} ({:?})", candidates.len(), path, format);
        Ok(())
    }
}
