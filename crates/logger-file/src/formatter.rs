//! Named templates that turn records into lines of text
//!
//! Templates use `%(field)` directives:
//!
//! ```text
//! %(name)[flags][width][.precision]conversion
//! ```
//!
//! where flags are `-` (left-align) and `0` (zero-pad numbers), and the
//! conversion is `s` (text) or `d` (integer). `%%` is a literal percent sign.

use crate::error::{Error, Result};
use crate::rotation::Zone;
use chrono::Local;
use chrono::format::{Item, StrftimeItems};
use pocs_logger::Record;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

/// Template used by handlers that do not name a formatter
pub const DEFAULT_FORMAT: &str = "%(message)s";

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    AscTime,
    Created,
    Msecs,
    LevelName,
    LevelNo,
    Name,
    Message,
    Process,
    ProcessName,
    ThreadName,
    FileName,
    PathName,
    Module,
    LineNo,
    FuncName,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "asctime" => Field::AscTime,
            "created" => Field::Created,
            "msecs" => Field::Msecs,
            "levelname" => Field::LevelName,
            "levelno" => Field::LevelNo,
            "name" => Field::Name,
            "message" => Field::Message,
            "process" => Field::Process,
            "processName" => Field::ProcessName,
            "threadName" => Field::ThreadName,
            "filename" => Field::FileName,
            "pathname" => Field::PathName,
            "module" => Field::Module,
            "lineno" => Field::LineNo,
            "funcName" => Field::FuncName,
            _ => return None,
        })
    }

    fn is_numeric(self) -> bool {
        matches!(
            self,
            Field::Created | Field::Msecs | Field::LevelNo | Field::Process | Field::LineNo
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Text,
    Integer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive {
    field: Field,
    left_align: bool,
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
    conversion: Conversion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Directive(Directive),
}

/// A parsed format string.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Template {
    segments: Vec<Segment>,
}

impl Template {
    fn parse(source: &str) -> std::result::Result<Self, String> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => literal.push('%'),
                Some('(') => {
                    let directive = parse_directive(&mut chars)?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Directive(directive));
                }
                Some(other) => return Err(format!("expected '(' or '%' after '%', found {other:?}")),
                None => return Err("format ends with a lone '%'".to_string()),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }
}

/// Parses the remainder of a directive after `%(`.
fn parse_directive(chars: &mut Peekable<Chars<'_>>) -> std::result::Result<Directive, String> {
    let mut name = String::new();
    loop {
        match chars.next() {
            Some(')') => break,
            Some(c) => name.push(c),
            None => return Err(format!("unterminated field name {name:?}")),
        }
    }
    let field = Field::parse(&name).ok_or_else(|| format!("unknown field {name:?}"))?;

    let mut left_align = false;
    let mut zero_pad = false;
    while let Some(&flag) = chars.peek() {
        match flag {
            '-' => left_align = true,
            '0' => zero_pad = true,
            _ => break,
        }
        chars.next();
    }

    let width = take_number(chars).unwrap_or(0);
    let precision = if chars.peek() == Some(&'.') {
        chars.next();
        Some(take_number(chars).unwrap_or(0))
    } else {
        None
    };

    let conversion = match chars.next() {
        Some('s') => Conversion::Text,
        Some('d') if field.is_numeric() => Conversion::Integer,
        Some('d') => return Err(format!("field {name:?} is not numeric")),
        Some(other) => return Err(format!("unsupported conversion {other:?} for field {name:?}")),
        None => return Err(format!("missing conversion for field {name:?}")),
    };

    Ok(Directive {
        field,
        left_align,
        zero_pad,
        width,
        precision,
        conversion,
    })
}

fn take_number(chars: &mut Peekable<Chars<'_>>) -> Option<usize> {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits.parse().ok()
}

/// A named template plus date pattern.
#[derive(Debug, Clone)]
pub struct Formatter {
    name: String,
    format: String,
    template: Template,
    datefmt: Option<String>,
    zone: Zone,
}

impl Formatter {
    /// Parse `format` and `datefmt` into a formatter rendering times in `zone`.
    pub fn new(
        name: impl Into<String>,
        format: &str,
        datefmt: Option<&str>,
        zone: Zone,
    ) -> Result<Self> {
        let name = name.into();
        let template = Template::parse(format).map_err(|reason| Error::InvalidFormat {
            formatter: name.clone(),
            reason,
        })?;

        if let Some(pattern) = datefmt
            && StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
        {
            return Err(Error::InvalidFormat {
                formatter: name,
                reason: format!("invalid date format {pattern:?}"),
            });
        }

        Ok(Self {
            name,
            format: format.to_string(),
            template,
            datefmt: datefmt.map(str::to_string),
            zone,
        })
    }

    /// Formatter used when a handler names none.
    pub fn fallback(zone: Zone) -> Self {
        Self {
            name: String::new(),
            format: DEFAULT_FORMAT.to_string(),
            template: Template {
                segments: vec![Segment::Directive(Directive {
                    field: Field::Message,
                    left_align: false,
                    zero_pad: false,
                    width: 0,
                    precision: None,
                    conversion: Conversion::Text,
                })],
            },
            datefmt: None,
            zone,
        }
    }

    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The template source
    pub fn format_string(&self) -> &str {
        &self.format
    }

    /// Render `record` as one line, without a terminator.
    pub fn format(&self, record: &Record) -> String {
        let mut out = String::with_capacity(128);
        for segment in &self.template.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Directive(directive) => {
                    let value = self.value(directive, record);
                    pad_into(&mut out, &value, directive);
                }
            }
        }
        out
    }

    fn value(&self, directive: &Directive, record: &Record) -> String {
        let integer = directive.conversion == Conversion::Integer;
        match directive.field {
            Field::AscTime => self.asctime(record),
            Field::Created if integer => record.timestamp.timestamp().to_string(),
            Field::Created => format!(
                "{}.{:06}",
                record.timestamp.timestamp(),
                record.timestamp.timestamp_subsec_micros()
            ),
            Field::Msecs => record.timestamp.timestamp_subsec_millis().to_string(),
            Field::LevelName => record.level.as_str().to_string(),
            Field::LevelNo => record.level.number().to_string(),
            Field::Name if record.target.is_empty() => "root".to_string(),
            Field::Name => record.target.clone(),
            Field::Message => record.message.clone(),
            Field::Process => record.process_id.to_string(),
            Field::ProcessName => record.process_name.clone(),
            Field::ThreadName => record.thread_name.clone(),
            Field::FileName => record.filename().to_string(),
            Field::PathName => record.file.clone(),
            Field::Module => record.module().to_string(),
            Field::LineNo => record.line.to_string(),
            Field::FuncName => record.function.clone(),
        }
    }

    fn asctime(&self, record: &Record) -> String {
        let pattern = self.datefmt.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
        let mut stamp = match self.zone {
            Zone::Utc => record.timestamp.format(pattern).to_string(),
            Zone::Local => record.timestamp.with_timezone(&Local).format(pattern).to_string(),
        };
        if self.datefmt.is_none() {
            let _ = write!(stamp, ",{:03}", record.timestamp.timestamp_subsec_millis());
        }
        stamp
    }
}

fn pad_into(out: &mut String, value: &str, directive: &Directive) {
    let value = match directive.precision {
        Some(precision) if directive.conversion == Conversion::Text => {
            match value.char_indices().nth(precision) {
                Some((end, _)) => &value[..end],
                None => value,
            }
        }
        _ => value,
    };

    let fill = directive.width.saturating_sub(value.chars().count());
    if directive.left_align {
        out.push_str(value);
        out.extend(std::iter::repeat_n(' ', fill));
    } else if directive.zero_pad && directive.conversion == Conversion::Integer {
        let (sign, digits) = match value.strip_prefix('-') {
            Some(digits) => ("-", digits),
            None => ("", value),
        };
        out.push_str(sign);
        out.extend(std::iter::repeat_n('0', fill));
        out.push_str(digits);
    } else {
        out.extend(std::iter::repeat_n(' ', fill));
        out.push_str(value);
    }
}

/// All formatters known to a logging setup, by name.
#[derive(Debug, Clone, Default)]
pub struct FormatterRegistry {
    formatters: BTreeMap<String, Arc<Formatter>>,
}

impl FormatterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `formatter`, replacing any formatter of the same name.
    pub fn register(&mut self, formatter: Formatter) -> Arc<Formatter> {
        let formatter = Arc::new(formatter);
        self.formatters
            .insert(formatter.name().to_string(), formatter.clone());
        formatter
    }

    /// Look up a formatter by name
    pub fn get(&self, name: &str) -> Result<Arc<Formatter>> {
        self.formatters
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownFormatter(name.to_string()))
    }

    /// Render `record` with the formatter called `name`.
    pub fn render(&self, name: &str, record: &Record) -> Result<String> {
        Ok(self.get(name)?.format(record))
    }

    /// Registered names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formatters.keys().map(String::as_str)
    }

    /// Number of registered formatters
    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    /// Whether no formatter is registered
    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pocs_logger::Level;

    const DETAIL: &str = "%(processName)s %(process)d %(threadName)s %(asctime)s %(levelname)8s \
                          %(filename)20s %(lineno)4d %(funcName)-25s %(message)s";

    fn record() -> Record {
        let timestamp = DateTime::parse_from_rfc3339("2024-01-03T15:04:05.250Z")
            .unwrap()
            .with_timezone(&Utc);
        Record {
            process_name: "pocs".into(),
            process_id: 1234,
            thread_name: "MainThread".into(),
            ..Record::new(Level::Info, "hello")
                .with_timestamp(timestamp)
                .with_location("pocs/mount/mount.rs", 42)
                .with_function("slew")
        }
    }

    #[test]
    fn test_detail_layout() {
        let formatter = Formatter::new("detail", DETAIL, Some("%Y%m%d%H%M%S"), Zone::Utc).unwrap();
        let expected = format!(
            "pocs 1234 MainThread 20240103150405 {:>8} {:>20} {:>4} {:<25} hello",
            "INFO", "mount.rs", 42, "slew"
        );
        assert_eq!(formatter.format(&record()), expected);
    }

    #[test]
    fn test_simple_layout() {
        let formatter =
            Formatter::new("simple", "%(asctime)s UTC - %(message)s", Some("%H:%M:%S"), Zone::Utc)
                .unwrap();
        assert_eq!(formatter.format(&record()), "15:04:05 UTC - hello");
    }

    #[test]
    fn test_default_asctime_has_millis() {
        let formatter = Formatter::new("t", "%(asctime)s", None, Zone::Utc).unwrap();
        assert_eq!(formatter.format(&record()), "2024-01-03 15:04:05,250");
    }

    #[test]
    fn test_flags_precision_and_escape() {
        let formatter = Formatter::new(
            "t",
            "%(lineno)05d|%(levelname).1s|%(name)s|100%%",
            None,
            Zone::Utc,
        )
        .unwrap();
        assert_eq!(formatter.format(&record()), "00042|I|root|100%");
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "%(nosuchfield)s",
            "%(message)d",
            "%(message)x",
            "%(message",
            "trailing %",
            "%s",
        ] {
            let err = Formatter::new("bad", bad, None, Zone::Utc).unwrap_err();
            assert!(
                matches!(err, Error::InvalidFormat { ref formatter, .. } if formatter == "bad"),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_date_format() {
        let err = Formatter::new("bad", "%(asctime)s", Some("%Q"), Zone::Utc).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }

    #[test]
    fn test_registry_unknown_name() {
        let mut registry = FormatterRegistry::new();
        registry.register(Formatter::fallback(Zone::Utc));
        registry.register(Formatter::new("simple", "%(message)s", None, Zone::Utc).unwrap());

        assert_eq!(registry.render("simple", &record()).unwrap(), "hello");
        assert!(matches!(
            registry.render("detail", &record()),
            Err(Error::UnknownFormatter(ref name)) if name == "detail"
        ));
    }
}
