//! Route template compilation.
//!
//! A template is a sequence of literal text and variables:
//!
//! - `{name}` matches one path segment (`[^/]+`)
//! - `{name:regex}` matches whatever `regex` accepts, which may span slashes
//!
//! Regex bodies may contain their own braces (`{year:\d{4}}`), so templates
//! are split with a small brace-aware scanner rather than a regex. Literal
//! text is matched verbatim: case-sensitive, slash-sensitive and without any
//! trailing-slash normalization. The compiled matcher is anchored at both
//! ends, so a path must match the whole template.
//!
//! ```
//! use trestle_core::RoutePattern;
//!
//! let pattern = RoutePattern::compile(r"/archive/{year:\d{4}}/{slug}").unwrap();
//! let params = pattern.captures("/archive/2010/hello").unwrap();
//! assert_eq!(params["year"], "2010");
//! assert_eq!(params["slug"], "hello");
//! assert!(pattern.captures("/archive/10/hello").is_none());
//! ```

use crate::error::{RouteError, RouteResult};
use crate::route::RouteParams;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Regex used for variables declared without one: a single path segment.
pub const DEFAULT_VARIABLE_REGEX: &str = "[^/]+";

/// One piece of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable { name: String, regex: String },
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    segments: Vec<Segment>,
    matcher: Regex,
    /// Anchored per-variable regexes used to check build arguments.
    validators: HashMap<String, Regex>,
}

impl RoutePattern {
    /// Parse and compile a template.
    pub fn compile(template: &str) -> RouteResult<Self> {
        let segments = tokenize(template)?;

        let mut seen = HashSet::new();
        let mut validators = HashMap::new();
        let mut source = String::with_capacity(template.len() + 16);
        source.push('^');

        for segment in &segments {
            match segment {
                Segment::Literal(text) => source.push_str(&regex::escape(text)),
                Segment::Variable { name, regex } => {
                    if !seen.insert(name.as_str()) {
                        return Err(RouteError::DuplicateVariable {
                            template: template.to_string(),
                            variable: name.clone(),
                        });
                    }

                    let validator = Regex::new(&format!("^(?:{})$", regex)).map_err(|e| {
                        RouteError::InvalidRegex {
                            template: template.to_string(),
                            variable: name.clone(),
                            message: e.to_string(),
                        }
                    })?;
                    validators.insert(name.clone(), validator);

                    source.push_str(&format!("(?P<{}>{})", name, regex));
                }
            }
        }
        source.push('$');

        // Per-variable regexes already compiled; what can still fail here is
        // an interaction such as a nested group reusing a variable's name.
        let matcher = Regex::new(&source).map_err(|e| RouteError::InvalidTemplate {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            template: template.to_string(),
            segments,
            matcher,
            validators,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Variable names in template order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Variable { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// True when the template has no variables.
    pub fn is_static(&self) -> bool {
        self.variables().next().is_none()
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    /// Match `path` against the whole template and return the variables.
    pub fn captures(&self, path: &str) -> Option<RouteParams> {
        let captures = self.matcher.captures(path)?;
        let mut params = RouteParams::with_capacity(self.validators.len());
        for name in self.variables() {
            if let Some(value) = captures.name(name) {
                params.insert(name.to_string(), value.as_str().to_string());
            }
        }
        Some(params)
    }

    /// Rebuild a path by substituting values into the variable slots.
    ///
    /// `value_for` supplies the value of each variable; `route` labels errors.
    /// Values are inserted verbatim and must be accepted by the variable's
    /// regex so that the built path matches this pattern again.
    pub fn build<'a, F>(&self, route: &str, mut value_for: F) -> RouteResult<String>
    where
        F: FnMut(&str) -> Option<&'a str>,
    {
        let mut path = String::with_capacity(self.template.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => path.push_str(text),
                Segment::Variable { name, .. } => {
                    let value = value_for(name).ok_or_else(|| RouteError::MissingArgument {
                        route: route.to_string(),
                        argument: name.clone(),
                    })?;

                    let accepted = self
                        .validators
                        .get(name)
                        .is_some_and(|validator| validator.is_match(value));
                    if !accepted {
                        return Err(RouteError::InvalidArgument {
                            route: route.to_string(),
                            argument: name.clone(),
                            value: value.to_string(),
                        });
                    }

                    path.push_str(value);
                }
            }
        }

        Ok(path)
    }
}

/// Split a template into literal and variable segments.
fn tokenize(template: &str) -> RouteResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            '{' => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let body = read_variable_body(template, offset, &mut chars)?;
                segments.push(parse_variable(template, body)?);
            }
            '}' => {
                return Err(invalid_template(
                    template,
                    format!("unmatched '}}' at offset {}", offset),
                ));
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

/// Consume characters up to the brace closing the one at `open`, returning
/// the text between them. Nested braces and backslash escapes are honored.
fn read_variable_body<'t>(
    template: &'t str,
    open: usize,
    chars: &mut std::str::CharIndices<'t>,
) -> RouteResult<&'t str> {
    let mut depth = 1usize;
    let mut escaped = false;

    for (offset, c) in chars.by_ref() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&template[open + 1..offset]);
                }
            }
            _ => {}
        }
    }

    Err(invalid_template(
        template,
        format!("unclosed '{{' at offset {}", open),
    ))
}

fn parse_variable(template: &str, body: &str) -> RouteResult<Segment> {
    let (name, regex) = match body.split_once(':') {
        Some((name, regex)) => (name, regex),
        None => (body, ""),
    };

    if !is_identifier(name) {
        return Err(invalid_template(
            template,
            format!("'{}' is not a valid variable name", name),
        ));
    }

    let regex = if regex.is_empty() {
        DEFAULT_VARIABLE_REGEX
    } else {
        regex
    };

    Ok(Segment::Variable {
        name: name.to_string(),
        regex: regex.to_string(),
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn invalid_template(template: &str, reason: String) -> RouteError {
    RouteError::InvalidTemplate {
        template: template.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pattern: &RoutePattern) -> Vec<&str> {
        pattern.variables().collect()
    }

    #[test]
    fn test_tokenize_literal_only() {
        let pattern = RoutePattern::compile("/hello/world/").unwrap();
        assert_eq!(
            pattern.segments(),
            &[Segment::Literal("/hello/world/".to_string())]
        );
        assert!(pattern.is_static());
    }

    #[test]
    fn test_tokenize_default_regex() {
        let pattern = RoutePattern::compile("/users/{id}").unwrap();
        assert_eq!(
            pattern.segments()[1],
            Segment::Variable {
                name: "id".to_string(),
                regex: DEFAULT_VARIABLE_REGEX.to_string(),
            }
        );
    }

    #[test]
    fn test_tokenize_nested_braces() {
        let pattern = RoutePattern::compile(r"/{year:\d{4}}-{month:\d{1,2}}").unwrap();
        assert_eq!(vars(&pattern), vec!["year", "month"]);
        assert_eq!(
            pattern.segments()[1],
            Segment::Variable {
                name: "year".to_string(),
                regex: r"\d{4}".to_string(),
            }
        );
        assert_eq!(pattern.segments()[2], Segment::Literal("-".to_string()));
    }

    #[test]
    fn test_escaped_brace_in_regex() {
        let pattern = RoutePattern::compile(r"/{tag:\{[a-z]+\}}").unwrap();
        assert_eq!(
            pattern.captures("/{rust}").unwrap().get("tag"),
            Some(&"{rust}".to_string())
        );
    }

    #[test]
    fn test_empty_regex_uses_default() {
        let pattern = RoutePattern::compile("/{name:}").unwrap();
        assert!(pattern.is_match("/alice"));
        assert!(!pattern.is_match("/alice/bob"));
    }

    #[test]
    fn test_literal_regex_characters_are_escaped() {
        let pattern = RoutePattern::compile("/files/{name}.txt").unwrap();
        assert!(pattern.is_match("/files/notes.txt"));
        assert!(!pattern.is_match("/files/notesXtxt"));
    }

    #[test]
    fn test_anchored_match() {
        let pattern = RoutePattern::compile("/hello").unwrap();
        assert!(pattern.is_match("/hello"));
        assert!(!pattern.is_match("/hello/"));
        assert!(!pattern.is_match("/hello/world"));
        assert!(!pattern.is_match("x/hello"));
        assert!(!pattern.is_match("/Hello"));
    }

    #[test]
    fn test_greedy_and_lazy_regex() {
        let greedy = RoutePattern::compile("/{head:.+}/{tail}").unwrap();
        let params = greedy.captures("/a/b/c").unwrap();
        assert_eq!(params["head"], "a/b");
        assert_eq!(params["tail"], "c");

        let lazy = RoutePattern::compile("/{head:.+?}/{tail:.+}").unwrap();
        let params = lazy.captures("/a/b/c").unwrap();
        assert_eq!(params["head"], "a");
        assert_eq!(params["tail"], "b/c");
    }

    #[test]
    fn test_user_groups_do_not_shift_variables() {
        let pattern = RoutePattern::compile(r"/{lang:(en|fr)}/{page}").unwrap();
        let params = pattern.captures("/fr/about").unwrap();
        assert_eq!(params["lang"], "fr");
        assert_eq!(params["page"], "about");
    }

    #[test]
    fn test_unclosed_brace() {
        let err = RoutePattern::compile("/{year").unwrap_err();
        assert!(matches!(err, RouteError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_unmatched_closing_brace() {
        let err = RoutePattern::compile("/year}").unwrap_err();
        assert!(matches!(err, RouteError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_invalid_variable_names() {
        for template in ["/{}", "/{:\\d+}", "/{1st}", "/{first-name}"] {
            let err = RoutePattern::compile(template).unwrap_err();
            assert!(
                matches!(err, RouteError::InvalidTemplate { .. }),
                "{} should be rejected",
                template
            );
        }
    }

    #[test]
    fn test_duplicate_variable() {
        let err = RoutePattern::compile("/{id}/{id}").unwrap_err();
        assert_eq!(
            err,
            RouteError::DuplicateVariable {
                template: "/{id}/{id}".to_string(),
                variable: "id".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_regex() {
        let err = RoutePattern::compile("/{id:[0-9}").unwrap_err();
        assert!(matches!(err, RouteError::InvalidRegex { ref variable, .. } if variable == "id"));
    }

    #[test]
    fn test_build_substitutes_in_order() {
        let pattern = RoutePattern::compile(r"/{year:\d{4}}/foo/{slug}/").unwrap();
        let path = pattern
            .build("archive", |name| match name {
                "year" => Some("2010"),
                "slug" => Some("hello"),
                _ => None,
            })
            .unwrap();
        assert_eq!(path, "/2010/foo/hello/");
    }

    #[test]
    fn test_build_missing_argument() {
        let pattern = RoutePattern::compile("/{a}/{b}").unwrap();
        let err = pattern
            .build("pair", |name| (name == "a").then_some("x"))
            .unwrap_err();
        assert_eq!(
            err,
            RouteError::MissingArgument {
                route: "pair".to_string(),
                argument: "b".to_string(),
            }
        );
    }

    #[test]
    fn test_build_rejects_value_outside_regex() {
        let pattern = RoutePattern::compile(r"/{year:\d{4}}").unwrap();
        let err = pattern.build("year", |_| Some("20x0")).unwrap_err();
        assert!(matches!(err, RouteError::InvalidArgument { .. }));

        let pattern = RoutePattern::compile("/{segment}").unwrap();
        let err = pattern.build("segment", |_| Some("a/b")).unwrap_err();
        assert!(err.is_argument_error());
    }
}
