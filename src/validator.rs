// ==============================================================================
// validator.rs - Raw Export File Validation
// ==============================================================================
// Description: Validates uploaded raw genotype exports (size, type, format)
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-09-19
// Version: 2.0.0
// Security: Allowlist-only file types, magic number verification
// ==============================================================================

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, Read};
use std::path::Path;
use tracing::{debug, info};

use crate::input::{with_export_reader, Compression};
use crate::parsers::ExportLines;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024; // 100 MB

/// Lines inspected when sniffing content
const SNIFF_LINES: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct ValidatedFile {
    pub original_name: String,
    pub safe_name: String,
    pub extension: String,
    pub compression: Compression,
    pub size: u64,
    pub hash_sha256: String,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

const ALLOWED_TYPES: &[(&str, Compression)] = &[
    ("txt", Compression::None),
    ("csv", Compression::None),
    ("tsv", Compression::None),
    ("txt.gz", Compression::Gzip),
    ("csv.gz", Compression::Gzip),
    ("tsv.gz", Compression::Gzip),
    ("zip", Compression::Zip),
];

#[derive(Debug, Clone)]
pub struct FileValidator {
    max_file_size: u64,
}

impl FileValidator {
    pub fn new() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Whether a path carries an allowlisted extension
    pub fn is_supported(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.compression_for(&name.to_string_lossy()).is_ok())
            .unwrap_or(false)
    }

    pub fn validate_upload(&self, file_path: &Path) -> Result<ValidatedFile> {
        let file_name = file_path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file path"))?
            .to_string_lossy()
            .to_string();

        info!("Validating file: {}", file_name);

        // 1. Size check
        let metadata = std::fs::metadata(file_path).context("Failed to get file metadata")?;
        let size = metadata.len();

        if size > self.max_file_size {
            anyhow::bail!(
                "File too large: {} bytes (max: {} bytes)",
                size,
                self.max_file_size
            );
        }
        if size == 0 {
            anyhow::bail!("File is empty");
        }
        debug!("Size check passed: {} bytes", size);

        // 2. Filename sanitization
        let safe_name = sanitize_filename(&file_name)?;
        debug!("Sanitized filename: {}", safe_name);

        // 3. Extension check (allowlist)
        let (extension, compression) = self.compression_for(&safe_name)?;
        debug!("Extension check passed: {}", extension);

        // 4. Magic number verification
        let expected_magic = compression.magic();
        if !expected_magic.is_empty() {
            let actual_magic = read_magic_number(file_path)?;
            if !actual_magic.starts_with(expected_magic) {
                anyhow::bail!("Magic number mismatch for .{} file", extension);
            }
            debug!("Magic number check passed");
        }

        // 5. Content validation (first data line)
        with_export_reader(file_path, compression, validate_export_content)?;
        debug!("Content validation passed");

        // 6. Compute SHA-256 hash
        let hash = compute_sha256(file_path)?;
        debug!("SHA-256: {}", hash);

        Ok(ValidatedFile {
            original_name: file_name,
            safe_name,
            extension,
            compression,
            size,
            hash_sha256: hash,
            validated_at: chrono::Utc::now(),
        })
    }

    fn compression_for(&self, filename: &str) -> Result<(String, Compression)> {
        let lowered = filename.to_lowercase();

        // Compound extensions (.txt.gz) are listed before their suffixes
        let mut candidates: Vec<&(&str, Compression)> = ALLOWED_TYPES.iter().collect();
        candidates.sort_by_key(|(ext, _)| std::cmp::Reverse(ext.len()));

        candidates
            .into_iter()
            .find(|(ext, _)| lowered.ends_with(&format!(".{}", ext)))
            .map(|(ext, compression)| (ext.to_string(), *compression))
            .ok_or_else(|| anyhow::anyhow!("Invalid file type: {}", filename))
    }
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn sanitize_filename(name: &str) -> Result<String> {
    // Remove path separators, null bytes, control characters
    let safe = name
        .replace(['/', '\\', '\0'], "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.' || *c == '-')
        .collect::<String>();

    // Limit length to 255 characters
    let truncated: String = safe.chars().take(255).collect();

    if truncated.is_empty() {
        anyhow::bail!("Invalid filename after sanitization");
    }

    Ok(truncated)
}

fn read_magic_number(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::with_capacity(4);
    file.by_ref().take(4).read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// The first data line must be a header or carry at least 3 fields
///
/// Lines are split exactly as the parser splits them.
fn validate_export_content(reader: &mut dyn BufRead) -> Result<()> {
    for line in ExportLines::new(reader).take(SNIFF_LINES) {
        let line = line.context("Export is not valid UTF-8 text")?;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
            continue;
        }

        let fields = if trimmed.contains('\t') {
            trimmed.split('\t').count()
        } else if trimmed.contains(',') {
            trimmed.split(',').count()
        } else {
            trimmed.split_whitespace().count()
        };

        if fields < 3 {
            anyhow::bail!(
                "Invalid raw data format: expected at least 3 columns, found {}",
                fields
            );
        }
        return Ok(());
    }

    anyhow::bail!("No data lines found in export")
}

fn compute_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
