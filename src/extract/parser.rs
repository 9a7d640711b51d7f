use anyhow::{Context, Result};
use log::trace;
use regex::Regex;

use crate::extract::record::{EchoedParameters, MetricRecord, SummaryFields};

const ECHO_PATTERN: &str = r"^\s*(num_queries|blowup_factor|grinding_factor)\s*=\s*(\S+)";
const MARKER_PATTERN: &str = r"^\s*Done\.\s+(Trace build:.*?)\s*$";
const PROOF_BYTES_PATTERN: &str = r"\((\d+)\s*bytes\)";

const TRACE_BUILD_LABEL: &str = "Trace build:";
const PROVE_LABEL: &str = "Prove:";
const VERIFY_LABEL: &str = "Verify:";
const PROOF_LABEL: &str = "Proof:";

/// Turns a captured prover stdout into metric records.
///
/// The log is scanned once, top to bottom. Parameter echo lines
/// (`num_queries = 64`) fill a running set of parameters, first value per
/// name wins. Every `Done. Trace build:` summary line emits one record carrying the
/// parameters seen *so far*, so a log with several summary lines yields
/// several records and echoes printed after a summary line do not reach it.
pub struct LogExtractor {
    echo: Regex,
    marker: Regex,
    proof_bytes: Regex,
}

impl LogExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            echo: Regex::new(ECHO_PATTERN).context("Failed to compile echo pattern")?,
            marker: Regex::new(MARKER_PATTERN).context("Failed to compile marker pattern")?,
            proof_bytes: Regex::new(PROOF_BYTES_PATTERN)
                .context("Failed to compile proof size pattern")?,
        })
    }

    /// Extract every record from one log
    pub fn extract(&self, bench: &str, run: u32, log: &str) -> Vec<MetricRecord> {
        let mut params = EchoedParameters::default();
        let mut records = Vec::new();

        for (line_no, line) in log.lines().enumerate() {
            if let Some(caps) = self.echo.captures(line) {
                params.observe(&caps[1], &caps[2]);
                continue;
            }
            if let Some(caps) = self.marker.captures(line) {
                trace!("{bench} run {run}: summary at line {}", line_no + 1);
                let summary = self.parse_summary(&caps[1]);
                records.push(MetricRecord::new(bench, run, &params, summary));
            }
        }
        records
    }

    /// Split a summary payload into its four labelled segments.
    ///
    /// Segments missing from the end of the payload stay `None`.
    pub fn parse_summary(&self, payload: &str) -> SummaryFields {
        let mut segments = payload.splitn(4, '|');
        let trace_build = segments.next().and_then(|s| strip_label(s, TRACE_BUILD_LABEL));
        let prove = segments.next().and_then(|s| strip_label(s, PROVE_LABEL));
        let verify = segments.next().and_then(|s| strip_label(s, VERIFY_LABEL));
        let (proof_size_readable, proof_size_bytes) = match segments.next() {
            Some(segment) => self.parse_proof_size(segment),
            None => (None, None),
        };

        SummaryFields {
            trace_build,
            prove,
            verify,
            proof_size_readable,
            proof_size_bytes,
        }
    }

    /// `16.85 KiB (17251 bytes)` -> (`16.85 KiB`, `17251`)
    fn parse_proof_size(&self, segment: &str) -> (Option<String>, Option<String>) {
        let Some(text) = strip_label(segment, PROOF_LABEL) else {
            return (None, None);
        };

        // The readable pair only ever comes from before the parenthetical
        let (head, bytes) = match self.proof_bytes.captures(&text) {
            Some(caps) => {
                let start = caps.get(0).map_or(text.len(), |m| m.start());
                (&text[..start], Some(caps[1].to_string()))
            }
            None => (text.as_str(), None),
        };

        let mut tokens = head.split_whitespace();
        let readable = match (tokens.next(), tokens.next()) {
            (Some(value), Some(unit)) => Some(format!("{value} {unit}")),
            _ => None,
        };
        (readable, bytes)
    }
}

/// Trim a segment and drop its label; empty text is absent
fn strip_label(segment: &str, label: &str) -> Option<String> {
    let segment = segment.trim();
    let value = segment.strip_prefix(label).unwrap_or(segment).trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = "Done. Trace build: 41.074µs | Prove: 10.023ms | Verify: 240.442µs | Proof: 16.85 KiB (17251 bytes)";

    fn extractor() -> LogExtractor {
        LogExtractor::new().unwrap()
    }

    #[test]
    fn test_full_summary_line() {
        let records = extractor().extract("aha-mont64", 1, SUMMARY);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.bench, "aha-mont64");
        assert_eq!(record.run, 1);
        assert_eq!(record.trace_build.as_deref(), Some("41.074µs"));
        assert_eq!(record.prove.as_deref(), Some("10.023ms"));
        assert_eq!(record.verify.as_deref(), Some("240.442µs"));
        assert_eq!(record.proof_size_readable.as_deref(), Some("16.85 KiB"));
        assert_eq!(record.proof_size_bytes.as_deref(), Some("17251"));
        assert_eq!(record.num_queries, None);
    }

    #[test]
    fn test_typical_prover_output() {
        let log = "\
num_queries = 20
blowup_factor = 64
grinding_factor = 0
Trace built in 41.074µs
row |   nonce | current |
  0 |     123 |       0 |
Proving time: 10.023ms
Proof size: 16.85 KiB (17251 bytes)
Valid Proof
 Verification succeeded in 240.442µs
Done. Trace build: 41.074µs | Prove: 10.023ms | Verify: 240.442µs | Proof: 16.85 KiB (17251 bytes)
";
        let records = extractor().extract("crc32", 4, log);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].num_queries.as_deref(), Some("20"));
        assert_eq!(records[0].blowup_factor.as_deref(), Some("64"));
        assert_eq!(records[0].grinding_factor.as_deref(), Some("0"));
        assert_eq!(records[0].proof_size_bytes.as_deref(), Some("17251"));
    }

    #[test]
    fn test_no_marker_no_records() {
        let log = "num_queries = 20\nProving time: 10.023ms\nthread 'main' panicked\n";
        assert!(extractor().extract("crc32", 1, log).is_empty());
        assert!(extractor().extract("crc32", 1, "").is_empty());
    }

    #[test]
    fn test_done_without_summary_labels_is_ignored() {
        let log = "Done. writing proof cache\nDone.\tflushed 3 files\nDone.\n";
        assert!(extractor().extract("crc32", 1, log).is_empty());

        let log = format!("Done. writing proof cache\n{SUMMARY}\n");
        let records = extractor().extract("crc32", 1, &log);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].trace_build.as_deref(), Some("41.074µs"));
    }

    #[test]
    fn test_one_record_per_marker() {
        let log = format!("{SUMMARY}\nnoise\n{SUMMARY}\n{SUMMARY}\n");
        let records = extractor().extract("st", 2, &log);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.run == 2 && r.prove.as_deref() == Some("10.023ms")));
    }

    #[test]
    fn test_missing_segments() {
        let log = "Done. Trace build: 41.074µs | Prove: 10.023ms";
        let records = extractor().extract("edn", 1, log);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.trace_build.as_deref(), Some("41.074µs"));
        assert_eq!(record.prove.as_deref(), Some("10.023ms"));
        assert_eq!(record.verify, None);
        assert_eq!(record.proof_size_readable, None);
        assert_eq!(record.proof_size_bytes, None);
    }

    #[test]
    fn test_missing_parenthetical() {
        let log = "Done. Trace build: 41.074µs | Prove: 10.023ms | Verify: 240.442µs | Proof: 16.85 KiB";
        let record = &extractor().extract("edn", 1, log)[0];
        assert_eq!(record.proof_size_readable.as_deref(), Some("16.85 KiB"));
        assert_eq!(record.proof_size_bytes, None);
    }

    #[test]
    fn test_irregular_spacing_in_proof_segment() {
        let log = "Done. Trace build: 1.2ms|Prove: 3.4ms|Verify: 5.6µs|Proof:   1.02 MiB   (1069548   bytes)  ";
        let record = &extractor().extract("nbody", 1, log)[0];
        assert_eq!(record.trace_build.as_deref(), Some("1.2ms"));
        assert_eq!(record.verify.as_deref(), Some("5.6µs"));
        assert_eq!(record.proof_size_readable.as_deref(), Some("1.02 MiB"));
        assert_eq!(record.proof_size_bytes.as_deref(), Some("1069548"));
    }

    #[test]
    fn test_parenthetical_glued_to_unit() {
        let log = "Done. Trace build: 1ms | Prove: 2ms | Verify: 3ms | Proof: 16.85 KiB(17251 bytes)";
        let record = &extractor().extract("crc32", 1, log)[0];
        assert_eq!(record.proof_size_readable.as_deref(), Some("16.85 KiB"));
        assert_eq!(record.proof_size_bytes.as_deref(), Some("17251"));

        // Only the value precedes the parenthetical, so there is no pair
        let log = "Done. Trace build: 1ms | Prove: 2ms | Verify: 3ms | Proof: 16.85(17251 bytes)";
        let record = &extractor().extract("crc32", 1, log)[0];
        assert_eq!(record.proof_size_readable, None);
        assert_eq!(record.proof_size_bytes.as_deref(), Some("17251"));
    }

    #[test]
    fn test_small_proof_without_parenthetical() {
        let log = "Done. Trace build: 1ms | Prove: 2ms | Verify: 3ms | Proof: 812 bytes";
        let record = &extractor().extract("ud", 1, log)[0];
        assert_eq!(record.proof_size_readable.as_deref(), Some("812 bytes"));
        assert_eq!(record.proof_size_bytes, None);
    }

    #[test]
    fn test_lone_token_is_not_a_partial_size() {
        let log = "Done. Trace build: 1ms | Prove: 2ms | Verify: 3ms | Proof: 16.85";
        let record = &extractor().extract("ud", 1, log)[0];
        assert_eq!(record.proof_size_readable, None);
        assert_eq!(record.proof_size_bytes, None);
    }

    #[test]
    fn test_empty_segment_is_absent() {
        let log = "Done. Trace build: 1ms | Prove: | Verify: 3ms";
        let record = &extractor().extract("ud", 1, log)[0];
        assert_eq!(record.trace_build.as_deref(), Some("1ms"));
        assert_eq!(record.prove, None);
        assert_eq!(record.verify.as_deref(), Some("3ms"));
    }

    #[test]
    fn test_parameters_are_position_dependent() {
        let log = format!(
            "{SUMMARY}\nnum_queries = 64\nblowup_factor = 32\ngrinding_factor = 4\n{SUMMARY}\n"
        );
        let records = extractor().extract("minver", 1, &log);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].num_queries, None);
        assert_eq!(records[0].blowup_factor, None);
        assert_eq!(records[0].grinding_factor, None);

        assert_eq!(records[1].num_queries.as_deref(), Some("64"));
        assert_eq!(records[1].blowup_factor.as_deref(), Some("32"));
        assert_eq!(records[1].grinding_factor.as_deref(), Some("4"));
    }

    #[test]
    fn test_first_echo_is_kept() {
        let log = format!("num_queries = 64\nnum_queries = 20\n{SUMMARY}\n");
        let record = &extractor().extract("minver", 1, &log)[0];
        assert_eq!(record.num_queries.as_deref(), Some("64"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let log = format!("blowup_factor = 8\r\n{SUMMARY}\r\n");
        let record = &extractor().extract("slre", 1, &log)[0];
        assert_eq!(record.blowup_factor.as_deref(), Some("8"));
        assert_eq!(record.proof_size_bytes.as_deref(), Some("17251"));
    }
}
