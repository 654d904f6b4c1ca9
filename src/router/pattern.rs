//! Placeholder syntax for dynamic routes.
//!
//! A URI is dynamic when it contains at least one `{name:pattern}` (required)
//! or `{name?:pattern}` (optional) placeholder. `name` is an identifier
//! (`[A-Za-z_][A-Za-z0-9_]*`) and `pattern` is any regular expression; braces
//! inside `pattern` must balance, and `\{` / `\}` are taken literally. Text that
//! does not form a complete placeholder is literal URI text.
//!
//! From the placeholders two artefacts are derived:
//!
//! - the matching expression, anchored at both ends: `/u/{id:\d+}` becomes
//!   `^/u/(?P<id>\d+)$`, an optional `{tab?:[a-z]+}` becomes `(?P<tab>[a-z]+)?`
//! - the reverse template used for URI generation: `/u/{id}`
//!
//! Placeholder names must be unique within a URI; a repeated name fails with
//! [`RouteError::InvalidPattern`].
//!
//! Two patterns with the same shape (same expression once the group names are
//! dropped) can never both be reached, so the route table treats them as the
//! same route; see [`RoutePattern::shape`].

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use smallvec::SmallVec;

use super::RouteError;

/// Maximum number of route parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameters extracted from a matched URI, in placeholder order.
///
/// Names are shared with the route (`Arc<str>`); values are per request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder {
        name: Arc<str>,
        optional: bool,
        pattern: String,
    },
}

/// The compiled form of a dynamic route URI.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    segments: Vec<Segment>,
    regex: Regex,
    shape: String,
    template: String,
}

impl RoutePattern {
    /// Classify `uri`: `Ok(None)` when it is static, the compiled pattern when
    /// it holds at least one placeholder.
    pub fn parse(uri: &str) -> Result<Option<Self>, RouteError> {
        let segments = split(uri);
        if !segments
            .iter()
            .any(|s| matches!(s, Segment::Placeholder { .. }))
        {
            return Ok(None);
        }

        let mut expression = String::with_capacity(uri.len() + 16);
        let mut shape = String::with_capacity(uri.len() + 8);
        let mut template = String::with_capacity(uri.len());
        expression.push('^');
        shape.push('^');
        for segment in &segments {
            match segment {
                Segment::Literal(text) => {
                    let escaped = regex::escape(text);
                    expression.push_str(&escaped);
                    shape.push_str(&escaped);
                    template.push_str(text);
                }
                Segment::Placeholder {
                    name,
                    optional,
                    pattern,
                } => {
                    let quantifier = if *optional { "?" } else { "" };
                    expression.push_str(&format!("(?P<{name}>{pattern}){quantifier}"));
                    shape.push_str(&format!("({pattern}){quantifier}"));
                    template.push('{');
                    template.push_str(name);
                    template.push('}');
                }
            }
        }
        expression.push('$');
        shape.push('$');

        let regex = Regex::new(&expression).map_err(|source| RouteError::InvalidPattern {
            uri: uri.to_string(),
            source,
        })?;

        Ok(Some(Self {
            segments,
            regex,
            shape,
            template,
        }))
    }

    /// The derived matching expression.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// The matching expression with unnamed groups: `^/u/(\d+)$`.
    pub fn shape(&self) -> &str {
        &self.shape
    }

    /// The reverse template, with `{name}` markers in place of placeholders.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder names with their optional flag, in URI order.
    pub fn params(&self) -> impl Iterator<Item = (&str, bool)> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder { name, optional, .. } => Some((name.as_ref(), *optional)),
            Segment::Literal(_) => None,
        })
    }

    /// Match the whole of `uri`, returning one parameter per placeholder.
    ///
    /// An optional placeholder that matched nothing is the empty string, the
    /// same value [`reverse`](RoutePattern::reverse) substitutes for it.
    pub fn captures(&self, uri: &str) -> Option<ParamVec> {
        let captures = self.regex.captures(uri)?;
        let params = self
            .segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder { name, .. } => {
                    let value = captures.name(name).map_or("", |m| m.as_str());
                    Some((Arc::clone(name), value.to_string()))
                }
                Segment::Literal(_) => None,
            })
            .collect();
        Some(params)
    }

    /// Fill the reverse template from `args`.
    ///
    /// A missing optional parameter becomes the empty string; a missing
    /// required one fails with `MissingRouteArgument`.
    pub fn reverse(&self, route_name: &str, args: &HashMap<&str, &str>) -> Result<String, RouteError> {
        let mut uri = String::with_capacity(self.template.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => uri.push_str(text),
                Segment::Placeholder { name, optional, .. } => {
                    match (args.get(name.as_ref()), *optional) {
                        (Some(value), _) => uri.push_str(value),
                        (None, true) => {}
                        (None, false) => {
                            return Err(RouteError::MissingRouteArgument {
                                name: route_name.to_string(),
                                param: name.to_string(),
                            })
                        }
                    }
                }
            }
        }
        Ok(uri)
    }
}

fn split(uri: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = uri;

    while let Some(open) = rest.find('{') {
        literal.push_str(&rest[..open]);
        rest = &rest[open..];
        match placeholder(rest) {
            Some((segment, consumed)) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(segment);
                rest = &rest[consumed..];
            }
            None => {
                literal.push('{');
                rest = &rest[1..];
            }
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// Parse one placeholder at the start of `source` (which begins with `{`),
/// returning it with the number of bytes consumed.
fn placeholder(source: &str) -> Option<(Segment, usize)> {
    let body = source.strip_prefix('{')?;

    let name_len = body
        .char_indices()
        .find(|&(i, c)| !(c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit())))
        .map_or(body.len(), |(i, _)| i);
    if name_len == 0 {
        return None;
    }
    let name = &body[..name_len];
    let mut cursor = name_len;

    let optional = body[cursor..].starts_with('?');
    if optional {
        cursor += 1;
    }
    if !body[cursor..].starts_with(':') {
        return None;
    }
    cursor += 1;

    let pattern_start = cursor;
    let mut depth = 0usize;
    let mut escaped = false;
    for (offset, c) in body[pattern_start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' if depth == 0 => {
                let pattern = &body[pattern_start..pattern_start + offset];
                let segment = Segment::Placeholder {
                    name: Arc::from(name),
                    optional,
                    pattern: pattern.to_string(),
                };
                // leading '{' + body up to and including the closing '}'
                return Some((segment, 1 + pattern_start + offset + 1));
            }
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}
