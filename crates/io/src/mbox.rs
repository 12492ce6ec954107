// MBOX cross-reference
//
// Secondary source for exports captured before the collection tool started
// embedding the originating address in message metadata. One sequential
// scan indexes every message by its Message-ID, keeping the data needed to
// complete matching: sender address and mailbox labels.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use caselink_engine::model::{Xref, XrefEntry};
use caselink_engine::EngineError;

use crate::split_labels;

/// Build the message-id cross-reference from an MBOX container.
///
/// When the collection already embeds sender metadata
/// (`data_predates_header_enrichment` is false) this is a no-op: scanning
/// a large MBOX is the most expensive step in the pipeline and must not
/// run unnecessarily.
pub fn build_xref(
    path: &Path,
    data_predates_header_enrichment: bool,
) -> Result<Option<Xref>, EngineError> {
    if !data_predates_header_enrichment {
        return Ok(None);
    }

    let file = File::open(path).map_err(|e| EngineError::Io(format!(
        "cannot open mbox '{}': {e}",
        path.display()
    )))?;
    let mut reader = BufReader::new(file);

    let mut xref = Xref::default();
    let mut line = Vec::new();
    let mut offset: u64 = 0;
    let mut sequence: u64 = 0;
    let mut current: Option<PendingMessage> = None;

    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| EngineError::Io(format!("reading '{}': {e}", path.display())))?;
        if n == 0 {
            break;
        }

        if line.starts_with(b"From ") {
            if let Some(pending) = current.take() {
                pending.finish(&mut xref);
            }
            current = Some(PendingMessage::new(offset, sequence));
            sequence += 1;
        } else if let Some(pending) = current.as_mut() {
            pending.push_line(&line);
        }

        offset += n as u64;
    }
    if let Some(pending) = current.take() {
        pending.finish(&mut xref);
    }

    Ok(Some(xref))
}

/// Header block of the message currently being scanned. Body lines are
/// ignored; only the headers feed the cross-reference.
struct PendingMessage {
    offset: u64,
    sequence: u64,
    headers: Vec<String>,
    in_headers: bool,
}

impl PendingMessage {
    fn new(offset: u64, sequence: u64) -> Self {
        Self {
            offset,
            sequence,
            headers: Vec::new(),
            in_headers: true,
        }
    }

    fn push_line(&mut self, line: &[u8]) {
        if !self.in_headers {
            return;
        }
        let text = String::from_utf8_lossy(line);
        let trimmed = text.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            self.in_headers = false;
        } else if trimmed.starts_with(' ') || trimmed.starts_with('\t') {
            // folded continuation line
            if let Some(last) = self.headers.last_mut() {
                last.push(' ');
                last.push_str(trimmed.trim_start());
            }
        } else {
            self.headers.push(trimmed.to_string());
        }
    }

    fn finish(self, xref: &mut Xref) {
        let mut message_id = String::new();
        let mut from_address = String::new();
        let mut labels: BTreeSet<String> = BTreeSet::new();

        for header in &self.headers {
            let Some((name, value)) = header.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if name.eq_ignore_ascii_case("message-id") {
                message_id = value
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string();
            } else if name.eq_ignore_ascii_case("from") {
                from_address = address_of(value);
            } else if name.eq_ignore_ascii_case("x-gmail-labels") {
                labels.extend(split_labels(value, ','));
            }
        }

        if message_id.is_empty() {
            return;
        }
        xref.insert(
            message_id,
            XrefEntry {
                sequence: self.sequence,
                offset: self.offset,
                from_address,
                labels,
            },
        );
    }
}

/// Pull the bare address out of a `From:` value, with or without a
/// display name.
fn address_of(raw: &str) -> String {
    if let (Some(open), Some(close)) = (raw.find('<'), raw.rfind('>')) {
        if open < close {
            return raw[open + 1..close].trim().to_string();
        }
    }
    raw.trim().to_string()
}
