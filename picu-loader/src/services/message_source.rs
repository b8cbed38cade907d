//! HL7 v2 message source
//!
//! Splits a message container file into message units and gives terser-style
//! access to their fields: segment, field, repetition (0-based), component
//! (1-based) and sub-component (1-based). Empty values read as `None`.

use crate::error::{LoaderError, LoaderResult};
use picu_common::{Error, Result};
use std::fmt;
use std::path::Path;

/// Segment that opens every message unit
pub const HEADER_SEGMENT: &str = "MSH";

/// MLLP start-of-block / end-of-block framing bytes
const MLLP_FRAMING: [char; 2] = ['\u{0b}', '\u{1c}'];

/// Delimiters declared in MSH-1 and MSH-2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingCharacters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for EncodingCharacters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

impl EncodingCharacters {
    /// Read delimiters from an MSH line
    fn from_header(line: &str) -> Result<Self> {
        let mut chars = line.chars().skip(HEADER_SEGMENT.len());
        let field = chars
            .next()
            .ok_or_else(|| Error::Parse("MSH segment has no field separator".to_string()))?;
        let declared: Vec<char> = chars.take_while(|c| *c != field).collect();
        if declared.len() < 4 {
            return Err(Error::Parse(format!(
                "MSH-2 declares {} encoding characters, expected 4",
                declared.len()
            )));
        }
        Ok(Self {
            field,
            component: declared[0],
            repetition: declared[1],
            escape: declared[2],
            subcomponent: declared[3],
        })
    }
}

/// Terser-style field address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath {
    pub segment: &'static str,
    pub field: usize,
    pub repetition: usize,
    pub component: usize,
    pub subcomponent: usize,
}

impl FieldPath {
    /// First repetition, first sub-component of a component
    pub const fn component(segment: &'static str, field: usize, component: usize) -> Self {
        Self {
            segment,
            field,
            repetition: 0,
            component,
            subcomponent: 1,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}({})-{}-{}",
            self.segment, self.field, self.repetition, self.component, self.subcomponent
        )
    }
}

/// One segment; `fields[n]` is field n, `fields[0]` the segment name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    fields: Vec<String>,
}

impl Segment {
    fn parse(line: &str, encoding: &EncodingCharacters) -> Self {
        let mut parts = line.split(encoding.field);
        let name = parts.next().unwrap_or_default().to_string();
        let mut fields = vec![name];
        if fields[0] == HEADER_SEGMENT {
            // MSH-1 is the separator itself
            fields.push(encoding.field.to_string());
        }
        fields.extend(parts.map(str::to_string));
        Self { fields }
    }

    pub fn name(&self) -> &str {
        &self.fields[0]
    }

    /// Raw field text, delimiters intact
    pub fn raw_field(&self, field: usize) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Decoded value at a repetition/component/sub-component address
    pub fn value(
        &self,
        encoding: &EncodingCharacters,
        field: usize,
        repetition: usize,
        component: usize,
        subcomponent: usize,
    ) -> Option<String> {
        if field == 0 {
            return None;
        }
        let raw = self.raw_field(field)?;
        if self.name() == HEADER_SEGMENT && field <= 2 {
            return non_empty(raw).map(str::to_string);
        }
        let value = raw
            .split(encoding.repetition)
            .nth(repetition)?
            .split(encoding.component)
            .nth(component.checked_sub(1)?)?
            .split(encoding.subcomponent)
            .nth(subcomponent.checked_sub(1)?)?;
        non_empty(value).map(|v| unescape(v, encoding))
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Resolve `\F\ \S\ \T\ \R\ \E\`; unknown sequences are kept verbatim
fn unescape(value: &str, encoding: &EncodingCharacters) -> String {
    if !value.contains(encoding.escape) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find(encoding.escape) {
        out.push_str(&rest[..start]);
        let after = &rest[start + encoding.escape.len_utf8()..];
        let decoded = after.find(encoding.escape).and_then(|end| {
            let replacement = match &after[..end] {
                "F" => Some(encoding.field),
                "S" => Some(encoding.component),
                "T" => Some(encoding.subcomponent),
                "R" => Some(encoding.repetition),
                "E" => Some(encoding.escape),
                _ => None,
            };
            replacement.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + encoding.escape.len_utf8()..];
            }
            None => {
                out.push(encoding.escape);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// One parsed HL7 v2 message unit
#[derive(Debug, Clone)]
pub struct Hl7Message {
    encoding: EncodingCharacters,
    segments: Vec<Segment>,
}

impl Hl7Message {
    /// Parse one message unit (segments separated by CR or LF)
    pub fn parse(raw: &str) -> Result<Self> {
        let mut lines = raw
            .split(['\r', '\n'])
            .filter(|line| !line.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| Error::Parse("Empty message".to_string()))?;
        if !header.starts_with(HEADER_SEGMENT) {
            return Err(Error::Parse(format!(
                "Message does not start with MSH: '{}'",
                header.chars().take(20).collect::<String>()
            )));
        }
        let encoding = EncodingCharacters::from_header(header)?;

        let segments = std::iter::once(header)
            .chain(lines)
            .map(|line| Segment::parse(line, &encoding))
            .filter(|segment| !segment.name().is_empty())
            .collect();

        Ok(Self { encoding, segments })
    }

    pub fn encoding(&self) -> &EncodingCharacters {
        &self.encoding
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// First segment with this name
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name() == name)
    }

    /// Value at a path, read from the first matching segment
    pub fn get(&self, path: &FieldPath) -> Option<String> {
        self.segment(path.segment)?.value(
            &self.encoding,
            path.field,
            path.repetition,
            path.component,
            path.subcomponent,
        )
    }

    /// Value at a path of a given segment of this message
    pub fn get_in(&self, segment: &Segment, path: &FieldPath) -> Option<String> {
        segment.value(
            &self.encoding,
            path.field,
            path.repetition,
            path.component,
            path.subcomponent,
        )
    }

    /// OBX segments of the first OBR group
    pub fn order_observations(&self) -> Vec<&Segment> {
        self.segments
            .iter()
            .skip_while(|s| s.name() != "OBR")
            .skip(1)
            .take_while(|s| s.name() != "OBR")
            .filter(|s| s.name() == "OBX")
            .collect()
    }
}

/// Split container text into message units, one per MSH segment
///
/// Text before the first MSH is dropped.
pub fn split_messages(content: &str) -> Vec<String> {
    let cleaned: String = content.chars().filter(|c| !MLLP_FRAMING.contains(c)).collect();
    let mut messages: Vec<Vec<&str>> = Vec::new();

    for line in cleaned.split(['\r', '\n']) {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(HEADER_SEGMENT) {
            messages.push(vec![line]);
        } else if let Some(current) = messages.last_mut() {
            current.push(line);
        }
    }

    messages.into_iter().map(|lines| lines.join("\r")).collect()
}

/// Produces parsed message units for a file
pub trait MessageSource: Send + Sync {
    /// Units in file order
    ///
    /// The outer error is fatal (file unreadable); inner errors belong to a
    /// single unit.
    fn read_units(&self, path: &Path) -> LoaderResult<Vec<Result<Hl7Message>>>;
}

/// Reads HL7 v2 text files (`.txt`, `.msg`)
#[derive(Debug, Clone, Copy, Default)]
pub struct Hl7FileSource;

impl MessageSource for Hl7FileSource {
    fn read_units(&self, path: &Path) -> LoaderResult<Vec<Result<Hl7Message>>> {
        let bytes = std::fs::read(path).map_err(|source| LoaderError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let content = String::from_utf8_lossy(&bytes);

        let units: Vec<Result<Hl7Message>> = split_messages(&content)
            .iter()
            .map(|raw| Hl7Message::parse(raw))
            .collect();

        tracing::debug!(path = %path.display(), units = units.len(), "Read message units");
        Ok(units)
    }
}
