//! System-prompt templates with `{{name}}` placeholders.
//!
//! Templates are parsed once in [`TemplateBuilder::build`]; rendering only
//! looks values up. Single braces are literal, so JSON examples can appear in
//! prompt text untouched.

use std::fmt;

/// Result alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Template construction and rendering failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{{` with no matching `}}`.
    #[error("unclosed placeholder at byte {offset}")]
    Unclosed {
        /// Byte offset of the opening braces.
        offset: usize,
    },

    /// A `{{ }}` with nothing inside.
    #[error("empty placeholder at byte {offset}")]
    EmptyPlaceholder {
        /// Byte offset of the opening braces.
        offset: usize,
    },

    /// A required variable that the template text never mentions.
    #[error("required variable `{name}` does not appear in the template")]
    UnusedRequirement {
        /// The declared name.
        name: String,
    },

    /// A required variable was not supplied at render time.
    #[error("missing required variable: {name}")]
    MissingVariable {
        /// The absent name.
        name: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Slot(String),
}

/// A parsed prompt template.
///
/// Required slots must be supplied when rendering; any other slot renders as
/// an empty string when no value is given.
///
/// ```
/// use agent_prompts::template::PromptTemplate;
///
/// let template = PromptTemplate::builder("Events:\n{{events}}")
///     .with_required_variable("events")
///     .build()
///     .unwrap();
///
/// let rendered = template
///     .render_pairs(&[("events", "1: Developer Meetup")])
///     .unwrap();
/// assert_eq!(rendered, "Events:\n1: Developer Meetup");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    pieces: Vec<Piece>,
    required: Vec<String>,
}

impl PromptTemplate {
    /// Starts a template from `source`.
    #[must_use]
    pub fn builder(source: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder {
            source: source.into(),
            required: Vec::new(),
        }
    }

    /// Substitutes `(name, value)` pairs; the first pair for a name wins.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingVariable`] for the first required slot
    /// with no value.
    pub fn render_pairs(&self, pairs: &[(&str, &str)]) -> TemplateResult<String> {
        if let Some(name) = self
            .required
            .iter()
            .find(|name| !pairs.iter().any(|(key, _)| key == name))
        {
            return Err(TemplateError::MissingVariable { name: name.clone() });
        }

        let mut out = String::with_capacity(self.source.len());
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Slot(name) => {
                    if let Some((_, value)) = pairs.iter().find(|(key, _)| key == name) {
                        out.push_str(value);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Distinct slot names in order of first appearance.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for piece in &self.pieces {
            if let Piece::Slot(name) = piece {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// The unparsed template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Declares required slots before parsing.
#[derive(Debug)]
pub struct TemplateBuilder {
    source: String,
    required: Vec<String>,
}

impl TemplateBuilder {
    /// Marks `name` as required at render time.
    #[must_use]
    pub fn with_required_variable(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    /// Parses the template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Unclosed`] or [`TemplateError::EmptyPlaceholder`]
    /// for malformed text, and [`TemplateError::UnusedRequirement`] when a
    /// required name has no slot.
    pub fn build(self) -> TemplateResult<PromptTemplate> {
        let pieces = parse(&self.source)?;
        for name in &self.required {
            let present = pieces
                .iter()
                .any(|piece| matches!(piece, Piece::Slot(slot) if slot == name));
            if !present {
                return Err(TemplateError::UnusedRequirement { name: name.clone() });
            }
        }
        Ok(PromptTemplate {
            source: self.source,
            pieces,
            required: self.required,
        })
    }
}

fn parse(source: &str) -> TemplateResult<Vec<Piece>> {
    let mut pieces = Vec::new();
    let mut cursor = 0;

    while let Some(found) = source[cursor..].find("{{") {
        let open = cursor + found;
        if open > cursor {
            pieces.push(Piece::Literal(source[cursor..open].to_owned()));
        }
        let body_start = open + 2;
        let close = source[body_start..]
            .find("}}")
            .map(|len| body_start + len)
            .ok_or(TemplateError::Unclosed { offset: open })?;
        let name = source[body_start..close].trim();
        if name.is_empty() {
            return Err(TemplateError::EmptyPlaceholder { offset: open });
        }
        pieces.push(Piece::Slot(name.to_owned()));
        cursor = close + 2;
    }

    if cursor < source.len() {
        pieces.push(Piece::Literal(source[cursor..].to_owned()));
    }
    Ok(pieces)
}
