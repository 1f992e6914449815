//! `{name:format}` path templates.
//!
//! Time fields take a strftime format (`{reference_time:%Y%m%d%H}`), integer
//! fields an optional zero-padded width (`{lead_time:03}`), text fields no
//! format. `{{` and `}}` are literal braces.

use std::collections::HashMap;

use align_common::{AlignError, Result, Timestamp};
use chrono::format::{Item, StrftimeItems};

const DEFAULT_TIME_FORMAT: &str = "%Y%m%d%H";

/// A value substituted into a template field.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternValue {
    Time(Timestamp),
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field { name: String, format: Option<String> },
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut field = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => field.push(c),
                            None => {
                                return Err(AlignError::configuration(format!(
                                    "unclosed field in pattern '{}'",
                                    template
                                )))
                            }
                        }
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    let (name, format) = match field.split_once(':') {
                        Some((name, format)) => (name, Some(format.to_string())),
                        None => (field.as_str(), None),
                    };
                    if name.is_empty() {
                        return Err(AlignError::configuration(format!("empty field in pattern '{}'", template)));
                    }
                    segments.push(Segment::Field {
                        name: name.to_string(),
                        format,
                    });
                }
                '}' => {
                    return Err(AlignError::configuration(format!(
                        "unmatched '}}' in pattern '{}'",
                        template
                    )))
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Field names in order of first appearance.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Field { name, .. } = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Render the template. Every field must have a value.
    pub fn render(&self, values: &HashMap<&str, PatternValue>) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field { name, format } => {
                    let value = values
                        .get(name.as_str())
                        .ok_or_else(|| AlignError::configuration(format!("no value for pattern field '{}'", name)))?;
                    out.push_str(&format_value(name, value, format.as_deref())?);
                }
            }
        }
        Ok(out)
    }
}

fn format_value(name: &str, value: &PatternValue, format: Option<&str>) -> Result<String> {
    match value {
        PatternValue::Time(t) => {
            let format = format.unwrap_or(DEFAULT_TIME_FORMAT);
            let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
            if items.iter().any(|item| matches!(item, Item::Error)) {
                return Err(AlignError::configuration(format!(
                    "invalid time format '{}' for field '{}'",
                    format, name
                )));
            }
            Ok(t.format_with_items(items.into_iter()).to_string())
        }
        PatternValue::Int(v) => match format {
            None | Some("") | Some("d") => Ok(v.to_string()),
            Some(spec) => {
                let digits = spec.strip_suffix('d').unwrap_or(spec);
                let width: usize = digits.parse().map_err(|_| {
                    AlignError::configuration(format!("invalid integer format '{}' for field '{}'", spec, name))
                })?;
                if digits.starts_with('0') {
                    Ok(format!("{:0width$}", v, width = width))
                } else {
                    Ok(format!("{:width$}", v, width = width))
                }
            }
        },
        PatternValue::Text(s) => match format {
            None | Some("") => Ok(s.clone()),
            Some(spec) => Err(AlignError::configuration(format!(
                "text field '{}' does not take a format ('{}')",
                name, spec
            ))),
        },
    }
}
