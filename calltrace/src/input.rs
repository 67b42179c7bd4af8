//! Trace file loading.
//!
//! DevTools saves traces as plain JSON, while traces pulled from CI or
//! remote devices are usually gzipped. Compression is detected from the
//! content, not the file name.

use crate::Result;
use calltrace_parse::{ParserConfig, Trace};
use flate2::read::GzDecoder;
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Parse a trace from in-memory file contents, gunzipping when needed.
pub fn parse_trace(bytes: &[u8], config: &ParserConfig) -> Result<Trace> {
    let trace = if is_gzip(bytes) {
        log::debug!("input is gzip-compressed ({} bytes)", bytes.len());
        Trace::parse_with_config(GzDecoder::new(bytes), config)?
    } else {
        Trace::parse_with_config(bytes, config)?
    };
    Ok(trace)
}

/// Read and reconstruct the trace stored at `path`.
pub fn read_trace<P: AsRef<Path>>(path: P, config: &ParserConfig) -> Result<Trace> {
    let bytes = std::fs::read(path.as_ref())?;
    log::info!("read {} bytes from {}", bytes.len(), path.as_ref().display());
    parse_trace(&bytes, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const TRACE: &str = r#"{"traceEvents": [
        {"name": "RunTask", "ph": "X", "pid": 1, "tid": 1, "ts": 100, "dur": 50},
        {"name": "Screenshot", "ph": "O", "pid": 1, "tid": 1, "ts": 120, "args": {"snapshot": "AAAA"}}
    ]}"#;

    #[test]
    fn reads_plain_json() {
        let trace = parse_trace(TRACE.as_bytes(), &ParserConfig::default()).unwrap();
        assert_eq!(trace.start_time, 100.0);
        assert_eq!(trace.end_time, 120.0);
        assert_eq!(trace.screenshots.len(), 1);
    }

    #[test]
    fn reads_gzip_json() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(TRACE.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        assert!(is_gzip(&compressed));
        let trace = parse_trace(&compressed, &ParserConfig::default()).unwrap();
        assert_eq!(trace.screenshots[0].base64, "AAAA");
    }

    #[test]
    fn rejects_garbage() {
        let result = parse_trace(b"not a trace", &ParserConfig::default());
        assert!(matches!(
            result,
            Err(crate::ToolError::Trace(calltrace_parse::TraceError::Json(_)))
        ));
    }

    #[test]
    fn read_trace_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_trace(dir.path().join("missing.json"), &ParserConfig::default());
        assert!(matches!(result, Err(crate::ToolError::Io(_))));
    }
}
