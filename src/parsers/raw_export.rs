// ==============================================================================
// raw_export.rs - Consumer Raw Data Export Parser
// ==============================================================================
// Description: Format-tolerant parser for 23andMe / AncestryDNA / MyHeritage
//              style raw genotype exports
// Author: Matt Barham
// Created: 2026-09-03
// Modified: 2026-09-21
// Version: 2.0.0
// ==============================================================================
// Supported layouts:
//   23andMe (tab, header in a comment, positional):
//     # rsid  chromosome  position  genotype
//     rs548049170  1  69869  TT
//   AncestryDNA (tab, header row, split alleles):
//     rsid  chromosome  position  allele1  allele2
//     rs3131972  1  752721  A  G
//   MyHeritage / FTDNA (quoted CSV, header row):
//     "RSID","CHROMOSOME","POSITION","RESULT"
//     "rs4477212","1","82154","AA"
// ==============================================================================

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::BufRead;
use thiserror::Error;
use tracing::{debug, info};

use crate::genotype::Genotype;
use crate::models::{has_marker_prefix, IngestionSummary, Marker, ParsedFile, Provider};

const COMMENT_PREFIXES: &[&str] = &["#", "//"];

const HEADER_KEYS: &[&str] = &[
    "rsid", "chromosome", "chrom", "chr", "position", "pos", "genotype", "result", "allele1",
    "allele2", "allele_1", "allele_2",
];

const RSID_COLUMNS: &[&str] = &["rsid"];
const CHROMOSOME_COLUMNS: &[&str] = &["chromosome", "chrom", "chr"];
const POSITION_COLUMNS: &[&str] = &["position", "pos"];
const GENOTYPE_COLUMNS: &[&str] = &["genotype", "result"];
const ALLELE1_COLUMNS: &[&str] = &["allele1", "allele_1"];
const ALLELE2_COLUMNS: &[&str] = &["allele2", "allele_2"];

/// Default number of markers materialized per parse
pub const DEFAULT_SAMPLE_LIMIT: usize = 1000;

/// Errors that abort a parse (malformed data lines never do)
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Input is not valid UTF-8 text (line {line})")]
    Decode {
        line: usize,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Parser tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Maximum markers kept in `ParsedFile::markers` (all are still counted)
    pub sample_limit: usize,

    /// Log progress every N lines (0 disables)
    pub progress_interval: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            progress_interval: 10_000,
        }
    }
}

/// Parser for raw consumer genotype exports
#[derive(Debug, Clone, Default)]
pub struct RawExportParser {
    options: ParserOptions,
}

impl RawExportParser {
    /// Create a parser with default options
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Set the materialized sample size
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.options.sample_limit = limit;
        self
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Lazily stream markers from a line-oriented source
    ///
    /// The stream is forward-only; re-parsing means calling this again with
    /// a fresh reader.
    pub fn markers<R: BufRead>(&self, reader: R) -> MarkerStream<R> {
        MarkerStream::new(reader, self.options.progress_interval)
    }

    /// Parse a whole export, keeping at most `sample_limit` markers
    ///
    /// # Returns
    /// * `Ok(ParsedFile)` - Markers sample plus counts over the entire input
    /// * `Err(ParseError)` - Input could not be read or decoded as UTF-8
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<ParsedFile, ParseError> {
        let limit = self.options.sample_limit;
        let mut stream = self.markers(reader);
        let mut markers = Vec::with_capacity(limit.min(DEFAULT_SAMPLE_LIMIT));

        for marker in stream.by_ref() {
            let marker = marker?;
            if markers.len() < limit {
                markers.push(marker);
            }
        }

        let summary = stream.summary();
        info!(
            "Parsing completed: {} lines, {} markers found, {} stored, provider {}",
            summary.total_lines_scanned,
            summary.parsed_marker_count,
            markers.len(),
            summary.detected_provider
        );

        Ok(ParsedFile {
            provider: summary.detected_provider,
            markers,
            summary,
        })
    }

    /// Parse already-decoded text
    pub fn parse_str(&self, text: &str) -> Result<ParsedFile, ParseError> {
        self.parse_reader(text.as_bytes())
    }

    /// Parse raw bytes (must be UTF-8)
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedFile, ParseError> {
        self.parse_reader(bytes)
    }
}

/// Column delimiter of a data line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Tab,
    Comma,
    Whitespace,
}

impl Delimiter {
    /// Prefer tab, then comma, then any whitespace
    fn detect(line: &str) -> Self {
        if line.contains('\t') {
            Delimiter::Tab
        } else if line.contains(',') {
            Delimiter::Comma
        } else {
            Delimiter::Whitespace
        }
    }

    fn split(self, line: &str) -> Vec<String> {
        match self {
            Delimiter::Tab => line.split('\t').map(clean_cell).collect(),
            Delimiter::Comma => split_csv(line),
            Delimiter::Whitespace => line.split_whitespace().map(clean_cell).collect(),
        }
    }
}

fn clean_cell(cell: &str) -> String {
    cell.trim().trim_matches('"').trim().to_string()
}

/// Split one comma-delimited line, honouring quoted fields
fn split_csv(line: &str) -> Vec<String> {
    if !line.contains('"') {
        return line.split(',').map(clean_cell).collect();
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .buffer_capacity(line.len().max(64))
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(clean_cell).collect(),
        // Unbalanced quotes: fall back to a plain split
        _ => line.split(',').map(clean_cell).collect(),
    }
}

fn looks_like_header(cells: &[String]) -> bool {
    cells
        .iter()
        .any(|cell| HEADER_KEYS.contains(&cell.to_lowercase().as_str()))
}

/// Column positions resolved once from the header row
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderMap {
    rsid: Option<usize>,
    chromosome: Option<usize>,
    position: Option<usize>,
    genotype: Option<usize>,
    allele1: Option<usize>,
    allele2: Option<usize>,
}

impl HeaderMap {
    fn from_cells(cells: &[String]) -> Self {
        // First occurrence of each name wins
        let mut index: HashMap<String, usize> = HashMap::new();
        for (idx, cell) in cells.iter().enumerate() {
            let name = cell.to_lowercase();
            if !name.is_empty() {
                index.entry(name).or_insert(idx);
            }
        }

        let resolve = |names: &[&str]| names.iter().find_map(|name| index.get(*name).copied());

        Self {
            rsid: resolve(RSID_COLUMNS),
            chromosome: resolve(CHROMOSOME_COLUMNS),
            position: resolve(POSITION_COLUMNS),
            genotype: resolve(GENOTYPE_COLUMNS),
            allele1: resolve(ALLELE1_COLUMNS),
            allele2: resolve(ALLELE2_COLUMNS),
        }
    }

    fn resolve<'a>(&self, cells: &'a [String]) -> Option<RawFields<'a>> {
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| cells.get(i))
                .map(String::as_str)
                .unwrap_or("")
        };

        let rsid = cell(Some(self.rsid?));
        let chromosome = cell(Some(self.chromosome?));

        let genotype = match self.genotype {
            Some(idx) => cell(Some(idx)).to_string(),
            None => format!("{}{}", cell(self.allele1), cell(self.allele2)),
        };

        Some(RawFields {
            rsid,
            chromosome,
            position: cell(self.position),
            genotype,
        })
    }
}

/// Unvalidated fields of one data line
#[derive(Debug)]
struct RawFields<'a> {
    rsid: &'a str,
    chromosome: &'a str,
    position: &'a str,
    genotype: String,
}

impl<'a> RawFields<'a> {
    fn positional(cells: &'a [String]) -> Self {
        let cell = |idx: usize| cells.get(idx).map(String::as_str).unwrap_or("");

        Self {
            rsid: cell(0),
            chromosome: cell(1),
            position: cell(2),
            genotype: cell(3).to_string(),
        }
    }

    fn into_marker(self) -> Option<Marker> {
        if self.rsid.is_empty() || !has_marker_prefix(self.rsid) {
            return None;
        }

        Some(Marker {
            rsid: self.rsid.to_string(),
            chromosome: self.chromosome.to_string(),
            position: self.position.parse::<u64>().ok(),
            genotype: Genotype::parse(&self.genotype),
        })
    }
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decoded lines of an export, split on `\n`, `\r\n` or bare `\r`
///
/// Comment lines that are not valid UTF-8 are decoded lossily; any other
/// invalid line yields `ParseError::Decode` and ends the iteration.
pub struct ExportLines<R> {
    reader: R,
    buffer: Vec<u8>,
    pending: VecDeque<Vec<u8>>,
    raw_lines: usize,
    at_start: bool,
    finished: bool,
}

impl<R: BufRead> ExportLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            raw_lines: 0,
            at_start: true,
            finished: false,
        }
    }

    /// Read the next `\n`-terminated chunk and queue its `\r`-separated lines
    fn fill(&mut self) -> Result<bool, ParseError> {
        self.buffer.clear();
        if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
            return Ok(false);
        }
        self.raw_lines += 1;

        if self.buffer.last() == Some(&b'\n') {
            self.buffer.pop();
        }
        if self.buffer.last() == Some(&b'\r') {
            self.buffer.pop();
        }

        let mut chunk: &[u8] = &self.buffer;
        if self.at_start {
            self.at_start = false;
            if let Some(rest) = chunk.strip_prefix(UTF8_BOM) {
                chunk = rest;
            }
        }

        self.pending
            .extend(chunk.split(|byte| *byte == b'\r').map(<[u8]>::to_vec));
        Ok(true)
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<String, ParseError> {
        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(e) if is_comment_bytes(e.as_bytes()) => {
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
            Err(source) => Err(ParseError::Decode {
                line: self.raw_lines,
                source,
            }),
        }
    }
}

impl<R: BufRead> Iterator for ExportLines<R> {
    type Item = Result<String, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if let Some(bytes) = self.pending.pop_front() {
                let line = self.decode(bytes);
                if line.is_err() {
                    self.finished = true;
                }
                return Some(line);
            }

            match self.fill() {
                Ok(true) => {}
                Ok(false) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn is_comment_bytes(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let trimmed = &bytes[start..];
    COMMENT_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix.as_bytes()))
}

/// Lazy, forward-only marker iterator over one export
///
/// Counts every line and marker it sees; callers decide how many markers
/// to keep. After a read or decode error the stream is finished.
pub struct MarkerStream<R> {
    lines: ExportLines<R>,
    header: Option<HeaderMap>,
    header_checked: bool,
    delimiter: Delimiter,
    header_provider: Option<Provider>,
    comment_provider: Option<Provider>,
    total_lines: usize,
    parsed_markers: usize,
    chromosomes: HashSet<String>,
    progress_interval: usize,
    finished: bool,
}

impl<R: BufRead> MarkerStream<R> {
    fn new(reader: R, progress_interval: usize) -> Self {
        Self {
            lines: ExportLines::new(reader),
            header: None,
            header_checked: false,
            delimiter: Delimiter::Tab,
            header_provider: None,
            comment_provider: None,
            total_lines: 0,
            parsed_markers: 0,
            chromosomes: HashSet::new(),
            progress_interval,
            finished: false,
        }
    }

    /// Provider as far as the input has been read
    pub fn provider(&self) -> Provider {
        match self.header {
            Some(_) => self
                .header_provider
                .or(self.comment_provider)
                .unwrap_or(Provider::Unknown),
            None => self.comment_provider.unwrap_or(Provider::Positional),
        }
    }

    /// Whether a header row was detected
    pub fn has_header(&self) -> bool {
        self.header.is_some()
    }

    /// Counters for everything read so far
    pub fn summary(&self) -> IngestionSummary {
        IngestionSummary {
            total_lines_scanned: self.total_lines,
            parsed_marker_count: self.parsed_markers,
            distinct_chromosome_count: self.chromosomes.len(),
            detected_provider: self.provider(),
        }
    }

    fn process_line(&mut self, line: &str) -> Option<Marker> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        if COMMENT_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix)) {
            if self.comment_provider.is_none() {
                self.comment_provider = Provider::from_hint(trimmed);
            }
            return None;
        }

        if !self.header_checked {
            self.header_checked = true;
            let delimiter = Delimiter::detect(trimmed);
            let cells = delimiter.split(trimmed);

            if looks_like_header(&cells) {
                let header = HeaderMap::from_cells(&cells);
                debug!(
                    "Detected header row ({:?} delimited): {:?}",
                    delimiter, header
                );
                self.header = Some(header);
                self.delimiter = delimiter;
                self.header_provider = Provider::from_hint(&cells.join(" "));
                return None;
            }
        }

        let delimiter = match self.header {
            Some(_) => self.delimiter,
            None => Delimiter::detect(trimmed),
        };
        let cells = delimiter.split(trimmed);
        if cells.len() < 3 {
            return None;
        }

        let fields = match &self.header {
            Some(header) => header.resolve(&cells)?,
            None => RawFields::positional(&cells),
        };

        fields.into_marker()
    }
}

impl<R: BufRead> Iterator for MarkerStream<R> {
    type Item = Result<Marker, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.lines.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                Some(Ok(line)) => line,
            };

            self.total_lines += 1;
            if self.progress_interval > 0 && self.total_lines % self.progress_interval == 0 {
                debug!(
                    "Processed {} lines, {} markers found",
                    self.total_lines, self.parsed_markers
                );
            }

            if let Some(marker) = self.process_line(&line) {
                self.parsed_markers += 1;
                if !self.chromosomes.contains(&marker.chromosome) {
                    self.chromosomes.insert(marker.chromosome.clone());
                }
                return Some(Ok(marker));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::{BufReader, Write};
    use tempfile::NamedTempFile;

    /// Create a temporary test file with raw export contents
    fn create_test_file(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    fn parse(text: &str) -> ParsedFile {
        RawExportParser::new().parse_str(text).unwrap()
    }

    #[test]
    fn test_single_positional_line() {
        let parsed = parse("rs4988235\t2\t136608646\tTT");

        assert_eq!(parsed.markers.len(), 1);
        assert_eq!(parsed.markers[0].rsid, "rs4988235");
        assert_eq!(parsed.markers[0].chromosome, "2");
        assert_eq!(parsed.markers[0].position, Some(136608646));
        assert_eq!(parsed.markers[0].genotype.as_str(), "TT");
        assert_eq!(parsed.summary.parsed_marker_count, 1);
        assert_eq!(parsed.provider, Provider::Positional);
    }

    #[test]
    fn test_23andme_file() {
        let contents = "\
# This data file generated by 23andMe at: Mon Jan 01 00:00:00 2024
# rsid\tchromosome\tposition\tgenotype
rs548049170\t1\t69869\tTT
rs13328684\t1\t74792\t--
i713426\tX\t100\tA
rs9283150\t2\t565508\tGA
";
        let parsed = parse(contents);

        assert_eq!(parsed.provider, Provider::TwentyThreeAndMe);
        assert_eq!(parsed.markers.len(), 4);
        assert_eq!(parsed.markers[1].genotype.as_str(), "--");
        assert_eq!(parsed.markers[2].rsid, "i713426");
        assert_eq!(parsed.markers[2].genotype.as_str(), "A");
        assert_eq!(parsed.markers[3].genotype.as_str(), "AG");
        assert_eq!(parsed.summary.total_lines_scanned, 6);
        assert_eq!(parsed.summary.distinct_chromosome_count, 3);
    }

    #[test]
    fn test_csv_header_reordered_columns() {
        let contents = "\
POSITION,RESULT,RSID,CHROMOSOME
82154,AA,rs4477212,1
752566,GA,rs3094315,1
";
        let parsed = parse(contents);

        assert_eq!(parsed.markers.len(), 2);
        assert_eq!(parsed.markers[0].rsid, "rs4477212");
        assert_eq!(parsed.markers[0].chromosome, "1");
        assert_eq!(parsed.markers[0].position, Some(82154));
        assert_eq!(parsed.markers[1].genotype.as_str(), "AG");
        assert_eq!(parsed.provider, Provider::Unknown);
    }

    #[test]
    fn test_csv_standard_header() {
        let contents = "\
RSID,CHROMOSOME,POSITION,RESULT
rs4477212,1,82154,AA
rs3094315,1,752566,AG
rs3131972,2,752721,GG
";
        let parsed = parse(contents);

        assert_eq!(parsed.markers.len(), 3);
        assert_eq!(parsed.markers[2].chromosome, "2");
        assert_eq!(parsed.markers[2].genotype.as_str(), "GG");
        assert_eq!(parsed.summary.distinct_chromosome_count, 2);
    }

    #[test]
    fn test_myheritage_quoted_csv() {
        let contents = "\
# MyHeritage DNA raw data.
\"RSID\",\"CHROMOSOME\",\"POSITION\",\"RESULT\"
\"rs4477212\",\"1\",\"82154\",\"AA\"
\"rs3094315\",\"1\",\"752566\",\"AG\"
";
        let parsed = parse(contents);

        assert_eq!(parsed.provider, Provider::MyHeritage);
        assert_eq!(parsed.markers.len(), 2);
        assert_eq!(parsed.markers[0].rsid, "rs4477212");
        assert_eq!(parsed.markers[0].position, Some(82154));
        assert_eq!(parsed.markers[1].genotype.as_str(), "AG");
    }

    #[test]
    fn test_quoted_field_with_comma() {
        let contents = "\
rsid,chromosome,position,genotype,note
rs1,1,100,AG,\"a, b\"
";
        let parsed = parse(contents);
        assert_eq!(parsed.markers.len(), 1);
        assert_eq!(parsed.markers[0].genotype.as_str(), "AG");
    }

    #[test]
    fn test_ancestrydna_split_alleles() {
        let contents = "\
#AncestryDNA raw data download
rsid\tchromosome\tposition\tallele1\tallele2
rs3131972\t1\t752721\tG\tA
rs12562034\t1\t768448\tG\tG
rs11240777\t1\t798959\t0\t0
";
        let parsed = parse(contents);

        assert_eq!(parsed.provider, Provider::AncestryDna);
        assert_eq!(parsed.markers.len(), 3);
        assert_eq!(parsed.markers[0].genotype.as_str(), "AG");
        assert_eq!(parsed.markers[1].genotype.as_str(), "GG");
        assert_eq!(parsed.markers[2].genotype.as_str(), "--");
    }

    #[test]
    fn test_header_provider_keyword() {
        let contents = "\
rsid\tchromosome\tposition\tgenotype\tmyheritage_flag
rs1\t1\t100\tAA\t1
";
        let parsed = parse(contents);
        assert_eq!(parsed.provider, Provider::MyHeritage);
    }

    #[test]
    fn test_header_missing_required_columns() {
        // No chromosome column: every data line is skipped
        let contents = "\
rsid\tposition\tgenotype
rs1\t100\tAA
rs2\t200\tGG
";
        let parsed = parse(contents);
        assert!(parsed.markers.is_empty());
        assert_eq!(parsed.summary.total_lines_scanned, 3);
        assert_eq!(parsed.summary.parsed_marker_count, 0);
    }

    #[test]
    fn test_duplicate_header_name_first_wins() {
        let contents = "\
rsid\tchromosome\tgenotype\tgenotype
rs1\t1\tAA\tCC
";
        let parsed = parse(contents);
        assert_eq!(parsed.markers[0].genotype.as_str(), "AA");
        assert_eq!(parsed.markers[0].position, None);
    }

    #[test]
    fn test_whitespace_delimited() {
        let contents = "rs1   1   100   AG\nrs2 2 200 CT\n";
        let parsed = parse(contents);

        assert_eq!(parsed.markers.len(), 2);
        assert_eq!(parsed.markers[0].position, Some(100));
        assert_eq!(parsed.markers[1].genotype.as_str(), "CT");
    }

    #[test]
    fn test_skips_invalid_lines() {
        let contents = "\
// exported by some tool

rs1\t1\t100\tAA
chr1\t1\t100\tAA
rs2\t1
RS3\t1\t300\tCC
rs4\t1\tnot_a_number\tGG
";
        let parsed = parse(contents);

        assert_eq!(parsed.markers.len(), 2);
        assert_eq!(parsed.markers[0].rsid, "rs1");
        assert_eq!(parsed.markers[1].rsid, "rs4");
        assert_eq!(parsed.markers[1].position, None);
        assert_eq!(parsed.summary.total_lines_scanned, 7);
        assert_eq!(parsed.summary.parsed_marker_count, 2);
    }

    #[test]
    fn test_first_data_line_with_chr_not_header() {
        // Data cells like "chr1" must not be mistaken for a header keyword
        let contents = "rs1\tchr1\t100\tAA\nrs2\tchr2\t200\tCC\n";
        let parsed = parse(contents);
        assert_eq!(parsed.markers.len(), 2);
        assert_eq!(parsed.markers[0].chromosome, "chr1");
    }

    #[test]
    fn test_bom_and_line_endings() {
        let crlf = "\u{FEFF}rsid,chromosome,position,result\r\nrs1,1,100,AA\r\nrs2,2,200,CT\r\n";
        let parsed = parse(crlf);
        assert_eq!(parsed.markers.len(), 2);
        assert_eq!(parsed.markers[1].genotype.as_str(), "CT");

        let bare_cr = "rs1\t1\t100\tAA\rrs2\t2\t200\tGG\r";
        let parsed = parse(bare_cr);
        assert_eq!(parsed.markers.len(), 2);
        assert_eq!(parsed.summary.total_lines_scanned, 2);
    }

    #[test]
    fn test_bom_positional() {
        let parsed = parse("\u{FEFF}rs1\t1\t100\tAA\n");
        assert_eq!(parsed.markers[0].rsid, "rs1");
    }

    #[test]
    fn test_duplicates_retained() {
        let contents = "rs1\t1\t100\tAA\nrs1\t1\t100\tAG\n";
        let parsed = parse(contents);

        assert_eq!(parsed.markers.len(), 2);
        assert_eq!(parsed.summary.parsed_marker_count, 2);
    }

    #[test]
    fn test_sample_limit_decoupled_from_counts() {
        let contents: String = (1..=25)
            .map(|i| format!("rs{}\t{}\t{}\tAG\n", i, (i % 3) + 1, i * 100))
            .collect();

        let parser = RawExportParser::new().with_sample_limit(10);
        let parsed = parser.parse_str(&contents).unwrap();

        assert_eq!(parsed.markers.len(), 10);
        assert_eq!(parsed.markers[9].rsid, "rs10");
        assert_eq!(parsed.summary.parsed_marker_count, 25);
        assert_eq!(parsed.summary.total_lines_scanned, 25);
        assert_eq!(parsed.summary.distinct_chromosome_count, 3);
    }

    #[test]
    fn test_stream_is_lazy() {
        let contents = "rs1\t1\t100\tAA\nrs2\t2\t200\tCC\nrs3\t3\t300\tGG\n";
        let parser = RawExportParser::new();
        let mut stream = parser.markers(contents.as_bytes());

        let first = stream.next().unwrap().unwrap();
        assert_eq!(first.rsid, "rs1");
        assert_eq!(stream.summary().total_lines_scanned, 1);
        assert_eq!(stream.summary().parsed_marker_count, 1);

        assert_eq!(stream.by_ref().count(), 2);
        assert_eq!(stream.summary().parsed_marker_count, 3);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_invalid_utf8_in_comment_is_tolerated() {
        let bytes = b"# Donn\xe9es brutes MyHeritage\nrs1\t1\t100\tAA\n";
        let parsed = RawExportParser::new().parse_bytes(bytes).unwrap();

        assert_eq!(parsed.markers.len(), 1);
        assert_eq!(parsed.provider, Provider::MyHeritage);
        assert_eq!(parsed.summary.total_lines_scanned, 2);
    }

    #[test]
    fn test_export_lines_split_bare_cr() {
        let lines: Vec<String> = ExportLines::new(&b"# 23andMe\rrs1\t1\t100\tAA\r\rrs2\t2\t200\tCT\r"[..])
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(lines, vec!["# 23andMe", "rs1\t1\t100\tAA", "", "rs2\t2\t200\tCT"]);
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let bytes = b"rs1\t1\t100\tAA\nrs2\t1\t\xff\xfe\tCC\n";
        let result = RawExportParser::new().parse_bytes(bytes);

        match result {
            Err(ParseError::Decode { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected Decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input() {
        let parsed = parse("");
        assert!(parsed.markers.is_empty());
        assert_eq!(parsed.summary.total_lines_scanned, 0);
        assert_eq!(parsed.provider, Provider::Positional);
    }

    #[test]
    fn test_parse_from_file() {
        let file = create_test_file(
            b"# rsid\tchromosome\tposition\tgenotype\nrs1426654\t15\t48426484\tAA\nrs4988235\t2\t136608646\tCT\n",
        );
        let reader = BufReader::new(File::open(file.path()).unwrap());

        let parsed = RawExportParser::new().parse_reader(reader).unwrap();
        assert_eq!(parsed.markers.len(), 2);
        assert_eq!(parsed.markers[1].genotype.as_str(), "CT");
    }
}
