//! JUnit XML parsing.
//!
//! Converts raw report bytes into [`Suite`]s. Counting is driven by the
//! `<testcase>` elements actually present, never by the `tests`/`failures`
//! attributes a reporter claims on the suite.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{AppError, AppResult};
use crate::models::{Suite, Test, TestStatus, Totals};

/// Converts artifact bytes into suites.
pub trait ResultParser: Send + Sync {
    fn parse(&self, data: &[u8]) -> AppResult<Vec<Suite>>;
}

/// Parser for JUnit/XUnit style XML documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JunitParser;

impl ResultParser for JunitParser {
    fn parse(&self, data: &[u8]) -> AppResult<Vec<Suite>> {
        parse_junit(data)
    }
}

// ============================================================================
// Parser State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    /// `<testsuites>` document root
    Root,
    /// `<testsuite>`, holding its index in the output
    Suite(usize),
    Case,
    Status(TestStatus),
    SystemOut,
    SystemErr,
    Properties,
    Other,
}

#[derive(Default)]
struct ParseState {
    stack: Vec<Element>,
    root_seen: bool,
    suites: Vec<Suite>,
    /// Unnamed suite collecting `<testcase>`s placed directly under `<testsuites>`
    orphans: Option<usize>,
    case: Option<Test>,
    text: String,
}

impl ParseState {
    fn parent(&self) -> Option<Element> {
        self.stack.last().copied()
    }

    /// Innermost open suite.
    fn current_suite(&self) -> Option<usize> {
        self.stack.iter().rev().find_map(|el| match el {
            Element::Suite(idx) => Some(*idx),
            _ => None,
        })
    }

    fn open(&mut self, e: &BytesStart<'_>) -> AppResult<()> {
        let local = e.local_name();
        let name = local.as_ref();

        let element = match self.parent() {
            None => {
                if self.root_seen {
                    return Err(AppError::Parse(
                        "document has more than one root element".to_string(),
                    ));
                }
                self.root_seen = true;
                match name {
                    b"testsuites" => Element::Root,
                    b"testsuite" => self.start_suite(e),
                    other => {
                        return Err(AppError::Parse(format!(
                            "unrecognized root element <{}>, expected <testsuites> or <testsuite>",
                            String::from_utf8_lossy(other)
                        )));
                    }
                }
            }
            Some(Element::Root | Element::Suite(_)) if name == b"testsuite" => self.start_suite(e),
            Some(Element::Root) if name == b"testcase" => {
                if self.orphans.is_none() {
                    self.suites.push(Suite::default());
                    self.orphans = Some(self.suites.len() - 1);
                }
                self.case = Some(start_case(e));
                Element::Case
            }
            Some(Element::Suite(_)) => match name {
                b"testcase" => {
                    self.case = Some(start_case(e));
                    Element::Case
                }
                b"properties" => Element::Properties,
                b"system-out" => self.start_capture(Element::SystemOut),
                b"system-err" => self.start_capture(Element::SystemErr),
                _ => Element::Other,
            },
            Some(Element::Case) => match name {
                b"failure" => self.start_status(e, TestStatus::Failed),
                b"error" => self.start_status(e, TestStatus::Error),
                b"skipped" => self.start_status(e, TestStatus::Skipped),
                b"system-out" => self.start_capture(Element::SystemOut),
                b"system-err" => self.start_capture(Element::SystemErr),
                _ => Element::Other,
            },
            Some(Element::Properties) => {
                if name == b"property" {
                    self.add_property(e);
                }
                Element::Other
            }
            Some(_) => Element::Other,
        };

        self.stack.push(element);
        Ok(())
    }

    fn start_suite(&mut self, e: &BytesStart<'_>) -> Element {
        self.suites.push(Suite {
            name: attr(e, b"name").unwrap_or_default(),
            package: attr(e, b"package").unwrap_or_default(),
            ..Default::default()
        });
        Element::Suite(self.suites.len() - 1)
    }

    fn start_status(&mut self, e: &BytesStart<'_>, status: TestStatus) -> Element {
        if let Some(case) = self.case.as_mut() {
            // The most severe status child wins.
            if status > case.status {
                case.status = status;
                case.message = attr(e, b"message");
                case.error = None;
            }
        }
        self.start_capture(Element::Status(status))
    }

    fn start_capture(&mut self, element: Element) -> Element {
        self.text.clear();
        element
    }

    fn add_property(&mut self, e: &BytesStart<'_>) {
        if let (Some(idx), Some(name)) = (self.current_suite(), attr(e, b"name")) {
            let value = attr(e, b"value").unwrap_or_default();
            self.suites[idx].properties.insert(name, value);
        }
    }

    fn text(&mut self, text: &str) -> AppResult<()> {
        match self.parent() {
            Some(Element::Status(_) | Element::SystemOut | Element::SystemErr) => {
                self.text.push_str(text);
                Ok(())
            }
            None if !text.trim().is_empty() => Err(AppError::Parse(
                "text content outside of the root element".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn close(&mut self) -> AppResult<()> {
        let element = self
            .stack
            .pop()
            .ok_or_else(|| AppError::Parse("unexpected closing tag".to_string()))?;

        match element {
            Element::Suite(idx) => {
                let suite = &mut self.suites[idx];
                suite.totals = Totals::from_tests(&suite.tests);
            }
            Element::Case => {
                let owner = self.current_suite().or(self.orphans);
                if let (Some(test), Some(idx)) = (self.case.take(), owner) {
                    self.suites[idx].tests.push(test);
                }
            }
            Element::Status(status) => {
                let body = self.take_text();
                if let Some(case) = self.case.as_mut()
                    && case.status == status
                    && case.error.is_none()
                {
                    case.error = body;
                }
            }
            Element::SystemOut | Element::SystemErr => {
                let body = self.take_text();
                let is_out = element == Element::SystemOut;
                match self.parent() {
                    Some(Element::Case) => {
                        if let Some(case) = self.case.as_mut() {
                            if is_out {
                                case.system_out = body;
                            } else {
                                case.system_err = body;
                            }
                        }
                    }
                    Some(Element::Suite(idx)) => {
                        let suite = &mut self.suites[idx];
                        if is_out {
                            suite.system_out = body;
                        } else {
                            suite.system_err = body;
                        }
                    }
                    _ => {}
                }
            }
            Element::Root | Element::Properties | Element::Other => {}
        }

        Ok(())
    }

    fn take_text(&mut self) -> Option<String> {
        let text = std::mem::take(&mut self.text);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn finish(mut self) -> AppResult<Vec<Suite>> {
        if !self.root_seen {
            return Err(AppError::Parse(
                "document has no root element".to_string(),
            ));
        }
        if !self.stack.is_empty() {
            return Err(AppError::Parse(
                "unexpected end of document, element left unclosed".to_string(),
            ));
        }
        if let Some(idx) = self.orphans {
            let suite = &mut self.suites[idx];
            suite.totals = Totals::from_tests(&suite.tests);
        }
        Ok(self.suites)
    }
}

fn start_case(e: &BytesStart<'_>) -> Test {
    Test {
        name: attr(e, b"name").unwrap_or_default(),
        classname: attr(e, b"classname").unwrap_or_default(),
        status: TestStatus::Passed,
        duration_ms: attr(e, b"time").map(|t| parse_duration_ms(&t)).unwrap_or(0),
        message: None,
        error: None,
        system_out: None,
        system_err: None,
    }
}

/// Read an attribute by local name. Malformed attributes are skipped.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| match a.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

/// JUnit `time` is fractional seconds; some reporters add thousands separators.
fn parse_duration_ms(raw: &str) -> u64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => (secs * 1000.0).round() as u64,
        _ => 0,
    }
}

// ============================================================================
// Entry Point
// ============================================================================

/// Parse a JUnit XML document into suites in document order.
///
/// Nested `<testsuite>` elements are flattened. A `<testsuites>` root without
/// children yields an empty list. Test cases sitting directly under
/// `<testsuites>` are gathered into one unnamed suite, placed where the first
/// of them appears.
pub fn parse_junit(data: &[u8]) -> AppResult<Vec<Suite>> {
    let mut reader = Reader::from_reader(data);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut state = ParseState::default();

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => {
                return Err(AppError::Parse(format!(
                    "malformed XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        };

        match event {
            Event::Start(e) => state.open(&e)?,
            Event::Empty(e) => {
                state.open(&e)?;
                state.close()?;
            }
            Event::End(_) => state.close()?,
            Event::Text(t) => state.text(&t.unescape()?)?,
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                state.text(&text)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    state.finish()
}
