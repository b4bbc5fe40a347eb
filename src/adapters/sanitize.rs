//! Log redaction for patient identifiers and contact details.
//!
//! Gateway failures are logged with their operation label and, at debug
//! level, request paths that embed patient ids. Formatted log lines pass
//! through [`SanitizingMakeWriter`] before reaching the sink, which replaces:
//! - patient ids (`BN-2024-0001`)
//! - `name`, `phone` and `address` values in JSON or `key=value` form
//! - email addresses and phone numbers
//! - bearer tokens and JWTs
//!
//! Input longer than `CARDIOLENS_SANITIZE_MAX_BYTES` (default 16 KiB) is cut
//! before scanning.

use std::io::Write;
use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_MAX_BYTES: usize = 16 * 1024;

/// What a redaction rule hides, used as the replacement tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Redacted {
    PatientId,
    ContactField,
    Email,
    Phone,
    Token,
}

impl Redacted {
    const fn tag(self) -> &'static str {
        match self {
            Self::PatientId => "[PATIENT-ID]",
            Self::ContactField => "$key$sep[REDACTED]",
            Self::Email => "[EMAIL]",
            Self::Phone => "[PHONE]",
            Self::Token => "[TOKEN]",
        }
    }
}

// Contact fields run first so a quoted phone is replaced as a whole value.
const RULES: &[(Redacted, &str)] = &[
    (
        Redacted::ContactField,
        r#"(?i)(?P<key>"?\b(?:name|phone|address)\b"?)(?P<sep>\s*[:=]\s*)(?:"[^"]*"|[^\s,}]+)"#,
    ),
    (Redacted::PatientId, r"\bBN-\d{4}-\d{3,6}\b"),
    (
        Redacted::Email,
        r"(?i)\b[a-z0-9][a-z0-9._%+-]{0,63}@(?:[a-z0-9-]{1,63}\.)+[a-z]{2,}\b",
    ),
    (Redacted::Phone, r"(?:\+84|\b0)\d{9,10}\b"),
    (Redacted::Token, r"(?i)\bbearer\s+[a-z0-9._~+/-]{16,}=*"),
    (
        Redacted::Token,
        r"\beyJ[a-zA-Z0-9_-]{10,}\.[a-zA-Z0-9_-]{10,}\.[a-zA-Z0-9_-]{10,}\b",
    ),
];

struct Redactor {
    any: RegexSet,
    rules: Vec<(Regex, Redacted)>,
}

static REDACTOR: OnceLock<Redactor> = OnceLock::new();

fn redactor() -> &'static Redactor {
    REDACTOR.get_or_init(|| Redactor {
        any: RegexSet::new(RULES.iter().map(|(_, pattern)| *pattern)).expect("Valid regex set"),
        rules: RULES
            .iter()
            .map(|(kind, pattern)| (Regex::new(pattern).expect("Valid regex"), *kind))
            .collect(),
    })
}

fn max_bytes() -> usize {
    std::env::var("CARDIOLENS_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_MAX_BYTES)
}

/// Longest prefix of `input` within `limit` bytes on a char boundary.
fn clip(input: &str, limit: usize) -> (&str, bool) {
    if input.len() <= limit {
        return (input, false);
    }
    let mut end = limit;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

/// Replace sensitive values in `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_within(input, max_bytes())
}

fn sanitize_within(input: &str, limit: usize) -> String {
    let redactor = redactor();
    let (text, clipped) = clip(input, limit);

    let mut out = text.to_string();
    for idx in redactor.any.matches(text).iter() {
        let (regex, kind) = &redactor.rules[idx];
        out = regex.replace_all(&out, kind.tag()).into_owned();
    }

    if clipped {
        out.push_str(" [CLIPPED]");
    }
    out
}

/// Whether `input` contains anything [`sanitize`] would replace.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let (text, _) = clip(input, max_bytes());
    redactor().any.is_match(text)
}

/// `MakeWriter` wrapper that redacts each formatted log line.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub const fn new(inner: M) -> Self {
        Self { inner }
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W: Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: Write> SanitizingWriter<W> {
    fn emit(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let line = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&line).as_bytes())
    }

    fn drain_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line)?;
        }
        Ok(())
    }
}

impl<W: Write> Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.drain_lines()?;

        // A line that never ends is flushed once it outgrows the scan limit.
        if self.pending.len() > max_bytes() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
            self.inner.write_all(b"\n")?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.drain_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
        }
        self.inner.flush()
    }
}

impl<W: Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            pending: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_patient_id_in_path() {
        let out = sanitize("GET /patients/BN-2024-0042/history failed");
        assert_eq!(out, "GET /patients/[PATIENT-ID]/history failed");
    }

    #[test]
    fn test_json_contact_fields() {
        let out = sanitize(r#"{"name": "Nguyen Van A", "age": 58, "phone": "0912345678"}"#);
        assert!(!out.contains("Nguyen"));
        assert!(!out.contains("0912345678"));
        assert!(out.contains(r#""name": [REDACTED]"#));
        assert!(out.contains(r#""age": 58"#));
    }

    #[test]
    fn test_key_value_fields() {
        let out = sanitize("created patient name=Tran address=Hanoi gender=Nam");
        assert_eq!(out, "created patient name=[REDACTED] address=[REDACTED] gender=Nam");
    }

    #[test]
    fn test_email_phone_and_tokens() {
        let out = sanitize("contact bs.le@benhvien.vn or +84912345678 with Bearer abcdefghijklmnop1234");
        assert!(out.contains("[EMAIL]"));
        assert!(out.contains("[PHONE]"));
        assert!(out.contains("[TOKEN]"));
        assert!(!out.contains("abcdefghijklmnop1234"));
    }

    #[test]
    fn test_clean_lines_untouched() {
        let line = "operation=\"list patients\" status=500 body_len=32";
        assert!(!contains_pii(line));
        assert_eq!(sanitize(line), line);
    }

    #[test]
    fn test_clip_on_char_boundary() {
        let out = sanitize_within("điểm BN-2024-0001", 2);
        assert_eq!(out, "đ [CLIPPED]");
    }

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("Sink lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Sink {
        type Writer = Sink;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_writer_redacts_split_writes() {
        let sink = Sink::default();
        let make = SanitizingMakeWriter::new(sink.clone());
        {
            let mut writer = make.make_writer();
            writer.write_all(b"deleting BN-20").expect("Should write");
            writer.write_all(b"24-0009\nsecond line\n").expect("Should write");
        }

        let written = String::from_utf8(sink.0.lock().expect("Sink lock").clone()).expect("UTF-8");
        assert_eq!(written, "deleting [PATIENT-ID]\nsecond line\n");
    }
}
