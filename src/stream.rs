//! Incremental decoding of streamed daemon output
//!
//! Three framings are handled:
//!
//! - **lines**: plain text logs, one event per `\n`-terminated line. A last
//!   line without a terminator is still emitted when the daemon closes.
//! - **multiplexed**: logs of non-TTY containers, where every chunk carries an
//!   8-byte header naming stdout or stderr and the payload length.
//! - **progress records**: concatenated JSON objects emitted by pull, push and
//!   build. A record may arrive split over several reads and one read may
//!   carry several records.
//!
//! Decoders read only when the pending bytes do not yet hold a full event,
//! never retry, and stop after the first error. An I/O failure while waiting
//! for bytes surfaces as [`Error::Stream`] (or as a transport error when the
//! read timed out) so a dropped connection is never mistaken for a clean end.

use std::collections::VecDeque;
use std::io::{self, BufRead, BufReader, Read};

use serde::Deserialize;

use crate::{Error, ErrorKind, Result};

const READ_CHUNK: usize = 8 * 1024;

/// One decoded unit of a streamed response
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Line(LogLine),
    Progress(ProgressRecord),
}

impl StreamEvent {
    /// Human-readable text of the event, without trailing newline
    pub fn text(&self) -> String {
        match self {
            StreamEvent::Line(line) => line.text.clone(),
            StreamEvent::Progress(record) => record.text(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Stdin,
    Stdout,
    Stderr,
    /// Unframed output (TTY containers, older daemons)
    Raw,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub source: LogSource,
    pub text: String,
}

/// A pull/push/build progress message
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: Option<String>,
    pub status: Option<String>,
    pub progress: Option<String>,
    pub progress_detail: Option<ProgressDetail>,
    pub stream: Option<String>,
    pub error: Option<String>,
    pub error_detail: Option<ErrorDetail>,
    pub aux: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProgressDetail {
    pub current: Option<u64>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorDetail {
    pub code: Option<i64>,
    pub message: Option<String>,
}

impl ProgressRecord {
    pub fn text(&self) -> String {
        if let Some(error) = &self.error {
            return error.trim_end().to_string();
        }
        if let Some(stream) = &self.stream {
            return stream.trim_end_matches('\n').to_string();
        }
        let mut text = String::new();
        if let Some(id) = &self.id {
            text.push_str(id);
            text.push_str(": ");
        }
        if let Some(status) = &self.status {
            text.push_str(status);
        }
        if let Some(progress) = &self.progress {
            text.push(' ');
            text.push_str(progress);
        }
        text
    }
}

/// Timeouts stay transport errors; reqwest hands its read deadline back as an
/// `Other` io error wrapping a `reqwest::Error`.
fn stream_read_error(err: io::Error) -> Error {
    let timed_out = err.kind() == io::ErrorKind::TimedOut
        || err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .is_some_and(reqwest::Error::is_timeout);
    if timed_out {
        Error::Io(err)
    } else {
        Error::Stream(format!("connection dropped mid-stream: {}", err))
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(stream_read_error(e)),
        }
    }
    Ok(filled)
}

fn trim_line_end(mut bytes: &[u8]) -> &[u8] {
    if let [rest @ .., b'\n'] = bytes {
        bytes = rest;
    }
    if let [rest @ .., b'\r'] = bytes {
        bytes = rest;
    }
    bytes
}

/// Newline framing over an unframed body
pub struct LineDecoder<R> {
    reader: BufReader<R>,
    done: bool,
}

impl<R: Read> LineDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            done: false,
        }
    }
}

impl<R: Read> Iterator for LineDecoder<R> {
    type Item = Result<LogLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => Some(Ok(LogLine {
                source: LogSource::Raw,
                text: String::from_utf8_lossy(trim_line_end(&line)).into_owned(),
            })),
            Err(e) => {
                self.done = true;
                Some(Err(stream_read_error(e)))
            }
        }
    }
}

/// Demultiplexes stdout/stderr frames, then splits each source into lines
pub struct MultiplexedDecoder<R> {
    reader: R,
    ready: VecDeque<LogLine>,
    partial: [Vec<u8>; 3],
    /// Raised after the lines that arrived before it
    failure: Option<Error>,
    done: bool,
}

impl<R: Read> MultiplexedDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            ready: VecDeque::new(),
            partial: [Vec::new(), Vec::new(), Vec::new()],
            failure: None,
            done: false,
        }
    }

    /// Returns `false` on a clean end of stream between frames.
    fn read_frame(&mut self) -> Result<bool> {
        let mut header = [0u8; 8];
        let got = read_full(&mut self.reader, &mut header)?;
        if got == 0 {
            return Ok(false);
        }
        if got < header.len() {
            return Err(Error::Stream(format!(
                "stream closed inside a frame header ({} of 8 bytes)",
                got
            )));
        }

        let slot = match header {
            [kind @ 0..=2, 0, 0, 0, ..] => kind as usize,
            [kind, 0, 0, 0, ..] => return Err(Error::Stream(format!("unknown stream kind {} in frame header", kind))),
            _ => return Err(Error::Stream(format!("corrupt frame header {:02x?}", &header[..4]))),
        };
        let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;

        // payload goes straight into the source's pending line, one chunk at a time
        let mut chunk = [0u8; READ_CHUNK];
        let mut remaining = len;
        while remaining > 0 {
            let want = remaining.min(READ_CHUNK);
            let got = read_full(&mut self.reader, &mut chunk[..want])?;
            self.partial[slot].extend_from_slice(&chunk[..got]);
            self.split_lines(slot);
            if got < want {
                return Err(Error::Stream(format!(
                    "stream closed inside a frame ({} of {} bytes)",
                    len - remaining + got,
                    len
                )));
            }
            remaining -= got;
        }
        Ok(true)
    }

    fn split_lines(&mut self, slot: usize) {
        let pending = &mut self.partial[slot];
        while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = pending.drain(..=pos).collect();
            self.ready.push_back(LogLine {
                source: source_for_slot(slot),
                text: String::from_utf8_lossy(trim_line_end(&line)).into_owned(),
            });
        }
    }

    fn flush_partials(&mut self) {
        for slot in 0..self.partial.len() {
            if self.partial[slot].is_empty() {
                continue;
            }
            let line = std::mem::take(&mut self.partial[slot]);
            self.ready.push_back(LogLine {
                source: source_for_slot(slot),
                text: String::from_utf8_lossy(trim_line_end(&line)).into_owned(),
            });
        }
    }
}

fn source_for_slot(slot: usize) -> LogSource {
    match slot {
        0 => LogSource::Stdin,
        1 => LogSource::Stdout,
        _ => LogSource::Stderr,
    }
}

impl<R: Read> Iterator for MultiplexedDecoder<R> {
    type Item = Result<LogLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }
            if let Some(e) = self.failure.take() {
                return Some(Err(e));
            }
            if self.done {
                return None;
            }
            match self.read_frame() {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    self.flush_partials();
                }
                Err(e) => {
                    self.done = true;
                    self.failure = Some(e);
                }
            }
        }
    }
}

/// Splits a body of concatenated JSON objects into [`ProgressRecord`]s
pub struct ProgressDecoder<R> {
    reader: R,
    buf: Vec<u8>,
    done: bool,
}

impl<R: Read> ProgressDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            done: false,
        }
    }

    /// Take one complete record off the front of the buffer, if there is one.
    fn take_record(&mut self) -> Result<Option<ProgressRecord>> {
        let (next, used) = {
            let mut records = serde_json::Deserializer::from_slice(&self.buf).into_iter::<ProgressRecord>();
            let next = records.next();
            (next, records.byte_offset())
        };
        match next {
            Some(Ok(record)) => {
                self.buf.drain(..used);
                Ok(Some(record))
            }
            Some(Err(e)) if e.is_eof() => Ok(None),
            Some(Err(e)) => Err(Error::Stream(format!("undecodable progress record: {}", e))),
            None => {
                // whitespace only
                self.buf.clear();
                Ok(None)
            }
        }
    }
}

impl<R: Read> Iterator for ProgressDecoder<R> {
    type Item = Result<ProgressRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.take_record() {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }

            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.done = true;
                    if self.buf.iter().all(u8::is_ascii_whitespace) {
                        return None;
                    }
                    return Some(Err(Error::Stream(format!(
                        "stream closed inside a progress record ({} bytes pending)",
                        self.buf.len()
                    ))));
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(stream_read_error(e)));
                }
            }
        }
    }
}

enum LogFraming {
    Lines(LineDecoder<Box<dyn Read + Send>>),
    Multiplexed(MultiplexedDecoder<Box<dyn Read + Send>>),
}

/// Live container log output. Dropping or closing it releases the connection.
pub struct LogStream {
    framing: LogFraming,
}

impl LogStream {
    pub fn lines(body: Box<dyn Read + Send>) -> Self {
        Self {
            framing: LogFraming::Lines(LineDecoder::new(body)),
        }
    }

    pub fn multiplexed(body: Box<dyn Read + Send>) -> Self {
        Self {
            framing: LogFraming::Multiplexed(MultiplexedDecoder::new(body)),
        }
    }

    pub fn is_multiplexed(&self) -> bool {
        matches!(self.framing, LogFraming::Multiplexed(_))
    }

    /// Drain the stream and join the lines with `\n`
    pub fn text(self) -> Result<String> {
        let lines = self.map(|event| event.map(|e| e.text())).collect::<Result<Vec<_>>>()?;
        Ok(lines.join("\n"))
    }

    pub fn close(self) {}
}

impl Iterator for LogStream {
    type Item = Result<StreamEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match &mut self.framing {
            LogFraming::Lines(decoder) => decoder.next(),
            LogFraming::Multiplexed(decoder) => decoder.next(),
        };
        line.map(|l| l.map(StreamEvent::Line))
    }
}

/// Which operation produced a progress stream; decides the success marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    Pull,
    Push,
    Build,
}

impl ProgressKind {
    /// Only the final event counts: a pull prints per-layer progress right
    /// up to its closing `Status:` line.
    fn marks_success(&self, record: &ProgressRecord) -> bool {
        match self {
            ProgressKind::Pull => record
                .status
                .as_deref()
                .is_some_and(|s| s.contains("Downloaded newer image") || s.contains("Image is up to date")),
            ProgressKind::Build => {
                record.stream.as_deref().is_some_and(|s| s.contains(BUILD_SUCCESS))
                    || aux_image_id(record).is_some()
            }
            ProgressKind::Push => {
                record.aux.as_ref().is_some_and(|aux| aux.get("Digest").is_some())
                    || record.status.as_deref().is_some_and(|s| s.contains("digest: "))
            }
        }
    }

    /// Records allowed after the success marker
    fn is_trailer(&self, record: &ProgressRecord) -> bool {
        let blank_stream = record.stream.as_deref().map_or(true, |s| s.trim().is_empty());
        let empty = record.status.is_none() && record.aux.is_none() && blank_stream;
        match self {
            ProgressKind::Build => {
                empty || record.stream.as_deref().is_some_and(|s| s.starts_with(BUILD_TAGGED))
            }
            ProgressKind::Pull | ProgressKind::Push => empty,
        }
    }
}

const BUILD_SUCCESS: &str = "Successfully built ";
const BUILD_TAGGED: &str = "Successfully tagged ";

fn aux_image_id(record: &ProgressRecord) -> Option<String> {
    record
        .aux
        .as_ref()
        .and_then(|aux| aux.get("ID"))
        .and_then(|id| id.as_str())
        .map(str::to_string)
}

/// How a drained progress stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    /// The daemon reported an error record in-band
    Failed(String),
    /// The stream ended cleanly but never carried the expected success marker
    Unconfirmed,
}

/// Everything a fully drained progress stream produced
#[derive(Debug, Clone)]
pub struct ProgressOutcome {
    pub kind: ProgressKind,
    pub records: Vec<ProgressRecord>,
    pub completion: Completion,
}

impl ProgressOutcome {
    fn from_records(kind: ProgressKind, records: Vec<ProgressRecord>) -> Self {
        let completion = if let Some(failed) = records.iter().find(|r| r.error.is_some() || r.error_detail.is_some()) {
            let message = failed
                .error
                .clone()
                .or_else(|| failed.error_detail.as_ref().and_then(|d| d.message.clone()))
                .unwrap_or_default();
            Completion::Failed(message)
        } else if records
            .iter()
            .rev()
            .find(|r| !kind.is_trailer(r))
            .is_some_and(|r| kind.marks_success(r))
        {
            Completion::Succeeded
        } else {
            Completion::Unconfirmed
        };
        Self {
            kind,
            records,
            completion,
        }
    }

    pub fn is_success(&self) -> bool {
        self.completion == Completion::Succeeded
    }

    /// All record texts, one per line
    pub fn transcript(&self) -> String {
        let mut text = String::new();
        for record in &self.records {
            text.push_str(&record.text());
            text.push('\n');
        }
        text
    }

    /// Image id announced by a build, from `Successfully built <id>` or an
    /// `aux` record.
    pub fn built_image_id(&self) -> Option<String> {
        let from_text = self.records.iter().rev().find_map(|record| {
            let stream = record.stream.as_deref()?;
            let start = stream.find(BUILD_SUCCESS)? + BUILD_SUCCESS.len();
            let id: String = stream[start..].chars().take_while(|c| c.is_ascii_alphanumeric() || *c == ':').collect();
            (!id.is_empty()).then_some(id)
        });
        from_text.or_else(|| self.records.iter().rev().find_map(aux_image_id))
    }
}

/// Live pull, push or build output
pub struct ProgressStream {
    kind: ProgressKind,
    decoder: ProgressDecoder<Box<dyn Read + Send>>,
    /// Records already handed out through the iterator
    seen: Vec<ProgressRecord>,
    /// First error handed out through the iterator, raised again by `finish`
    failure: Option<(ErrorKind, String)>,
}

impl ProgressStream {
    pub fn new(kind: ProgressKind, body: Box<dyn Read + Send>) -> Self {
        Self {
            kind,
            decoder: ProgressDecoder::new(body),
            seen: Vec::new(),
            failure: None,
        }
    }

    pub fn kind(&self) -> ProgressKind {
        self.kind
    }

    /// Drain to the end of the stream. The outcome covers records already
    /// taken through the iterator too. Transport-level truncation is an
    /// error; a missing success marker is reported through
    /// [`ProgressOutcome::completion`].
    pub fn finish(self) -> Result<ProgressOutcome> {
        if let Some((error_kind, message)) = self.failure {
            return Err(match error_kind {
                ErrorKind::Transport => Error::Io(io::Error::new(io::ErrorKind::TimedOut, message)),
                _ => Error::Stream(message),
            });
        }
        let kind = self.kind;
        let mut records = self.seen;
        for record in self.decoder {
            records.push(record?);
        }
        let outcome = ProgressOutcome::from_records(kind, records);
        match &outcome.completion {
            Completion::Succeeded => {}
            Completion::Failed(message) => tracing::warn!(?kind, error = %message, "Daemon reported failure in progress stream"),
            Completion::Unconfirmed => tracing::warn!(?kind, "Progress stream ended without a completion marker"),
        }
        Ok(outcome)
    }

    pub fn close(self) {}
}

impl Iterator for ProgressStream {
    type Item = Result<StreamEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.decoder.next()? {
            Ok(record) => {
                self.seen.push(record.clone());
                Some(Ok(StreamEvent::Progress(record)))
            }
            Err(e) => {
                self.failure.get_or_insert_with(|| (e.kind(), e.to_string()));
                Some(Err(e))
            }
        }
    }
}
