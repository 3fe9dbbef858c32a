/// Pattern segments for route declarations
///
/// Pure functional parsing of declaration segments into typed segments.
/// All functions are **pure**: same input → same output, no side effects.
use std::fmt;
use std::str::FromStr;

use crate::{ParamValue, PatternError};

/// Declared type of a variable segment
///
/// The type decides both which path text matches and what the text is
/// converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Str,
    Int,
    Float,
    Uuid,
    /// Greedy: consumes every remaining path segment
    Path,
}

impl ParamType {
    /// Resolves a type annotation such as `integer` or `path`
    pub fn from_annotation(annotation: &str) -> Option<Self> {
        match annotation {
            "string" | "str" => Some(ParamType::Str),
            "integer" | "int" => Some(ParamType::Int),
            "float" => Some(ParamType::Float),
            "uuid" => Some(ParamType::Uuid),
            "path" => Some(ParamType::Path),
            _ => None,
        }
    }

    /// Canonical annotation
    pub fn annotation(&self) -> &'static str {
        match self {
            ParamType::Str => "string",
            ParamType::Int => "integer",
            ParamType::Float => "float",
            ParamType::Uuid => "uuid",
            ParamType::Path => "path",
        }
    }

    pub fn is_greedy(&self) -> bool {
        matches!(self, ParamType::Path)
    }

    /// Converts decoded path text into a typed value
    ///
    /// Returns `None` when the text does not fit the type. Only greedy
    /// values may be empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use jsweb_router::{ParamType, ParamValue};
    ///
    /// assert_eq!(ParamType::Int.convert("42"), Some(ParamValue::Int(42)));
    /// assert_eq!(ParamType::Int.convert("abc"), None);
    /// assert_eq!(ParamType::Float.convert("1.5"), Some(ParamValue::Float(1.5)));
    /// ```
    pub fn convert(&self, raw: &str) -> Option<ParamValue> {
        match self {
            ParamType::Str => (!raw.is_empty()).then(|| ParamValue::Str(raw.to_string())),
            ParamType::Int => is_integer_text(raw)
                .then(|| raw.parse::<i64>().ok())
                .flatten()
                .map(ParamValue::Int),
            ParamType::Float => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(ParamValue::Float),
            ParamType::Uuid => uuid::Uuid::parse_str(raw).ok().map(ParamValue::Uuid),
            ParamType::Path => Some(ParamValue::Path(raw.to_string())),
        }
    }
}

// Optional minus followed by ASCII digits; `+1` and ` 1` are rejected
fn is_integer_text(raw: &str) -> bool {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// One component of a compiled pattern
///
/// # Examples
///
/// ```
/// use jsweb_router::route::pattern::{classify_segment, ParamType, Segment};
///
/// let seg = classify_segment("/users/<id:int>", "<id:int>").unwrap();
/// assert!(matches!(seg, Segment::Variable { ty: ParamType::Int, .. }));
///
/// let seg = classify_segment("/about", "about").unwrap();
/// assert_eq!(seg, Segment::Literal("about".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Variable {
        name: String,
        ty: ParamType,
        /// Greedy tail that may capture zero segments
        optional: bool,
    },
}

impl Segment {
    pub fn is_greedy(&self) -> bool {
        matches!(self, Segment::Variable { ty, .. } if ty.is_greedy())
    }

    pub fn literal(&self) -> Option<&str> {
        match self {
            Segment::Literal(text) => Some(text),
            Segment::Variable { .. } => None,
        }
    }

    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Segment::Variable { name, .. } => Some(name),
            Segment::Literal(_) => None,
        }
    }

    /// Same literal text, or same variable type, ignoring variable names
    pub fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (
                Segment::Variable { ty: a, optional: oa, .. },
                Segment::Variable { ty: b, optional: ob, .. },
            ) => a == b && oa == ob,
            _ => false,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Literal(text) => f.write_str(text),
            Segment::Variable { name, ty: ParamType::Str, .. } => write!(f, "<{}>", name),
            Segment::Variable { name, ty, optional } => write!(
                f,
                "<{}:{}{}>",
                name,
                ty.annotation(),
                if *optional { "?" } else { "" }
            ),
        }
    }
}

/// A compiled route pattern
///
/// Immutable once built. At most one greedy segment exists and it is always
/// the last one. `Display` gives back a declaration string that compiles to
/// an equal pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    segments: Vec<Segment>,
}

impl Pattern {
    pub(crate) fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Compiles a declaration string; see [`compile`](super::parser::compile)
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        super::parser::compile(pattern)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// The root pattern `/` has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn has_greedy_tail(&self) -> bool {
        self.segments.last().is_some_and(Segment::is_greedy)
    }

    /// Declared variables in order
    pub fn variables(&self) -> impl Iterator<Item = (&str, ParamType)> {
        self.segments.iter().filter_map(|seg| match seg {
            Segment::Variable { name, ty, .. } => Some((name.as_str(), *ty)),
            Segment::Literal(_) => None,
        })
    }

    /// Same segment structure, ignoring variable names
    pub fn same_shape(&self, other: &Pattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.same_shape(b))
    }

    /// The same pattern with the trailing slash toggled
    ///
    /// `None` for the root pattern and for greedy tails, which already
    /// cover both forms.
    pub fn trailing_slash_twin(&self) -> Option<Pattern> {
        let last = self.segments.last()?;
        if last.is_greedy() {
            return None;
        }
        let mut segments = self.segments.clone();
        if last.literal() == Some("") {
            segments.pop();
        } else {
            segments.push(Segment::Literal(String::new()));
        }
        Some(Pattern::from_segments(segments))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

/// Classifies a declaration segment (pure function)
///
/// # Parsing Rules (evaluated in order)
///
/// 1. **Variable**: `<name>`, `<name:type>` or `<name:path?>`
/// 2. **Unclosed variable**: starts with `<` but lacks the closing `>`
/// 3. **Stray delimiter**: any other `<` or `>`
/// 4. **Literal**: any other text, including the empty segment
pub fn classify_segment(pattern: &str, segment: &str) -> Result<Segment, PatternError> {
    match segment.strip_prefix('<') {
        Some(rest) => {
            let inner = rest
                .strip_suffix('>')
                .ok_or_else(|| PatternError::UnclosedVariable {
                    pattern: pattern.to_string(),
                    segment: segment.to_string(),
                })?;
            if inner.contains('<') || inner.contains('>') {
                return Err(PatternError::StrayDelimiter {
                    pattern: pattern.to_string(),
                    segment: segment.to_string(),
                });
            }
            parse_param_with_annotation(pattern, inner)
        }
        None if segment.contains('<') || segment.contains('>') => {
            Err(PatternError::StrayDelimiter {
                pattern: pattern.to_string(),
                segment: segment.to_string(),
            })
        }
        None => Ok(Segment::Literal(segment.to_string())),
    }
}

/// Parses `name` or `name:type` (pure function)
///
/// A trailing `?` on the annotation is only accepted for `path`.
pub fn parse_param_with_annotation(pattern: &str, param: &str) -> Result<Segment, PatternError> {
    let (name, annotation) = param
        .split_once(':')
        .map(|(name, annotation)| (name, Some(annotation)))
        .unwrap_or((param, None));

    if !is_identifier(name) {
        return Err(PatternError::InvalidName {
            pattern: pattern.to_string(),
            name: name.to_string(),
        });
    }

    let unknown = || PatternError::UnknownType {
        pattern: pattern.to_string(),
        name: name.to_string(),
        annotation: annotation.unwrap_or_default().to_string(),
    };

    let (ty, optional) = match annotation {
        None => (ParamType::Str, false),
        Some(annotation) => {
            let (base, optional) = annotation
                .strip_suffix('?')
                .map(|base| (base, true))
                .unwrap_or((annotation, false));
            let ty = ParamType::from_annotation(base).ok_or_else(unknown)?;
            if optional && !ty.is_greedy() {
                return Err(unknown());
            }
            (ty, optional)
        }
    };

    Ok(Segment::Variable {
        name: name.to_string(),
        ty,
        optional,
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
