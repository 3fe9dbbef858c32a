/// Pattern compilation
///
/// Pure functional parser that turns a declaration string into a [`Pattern`].
/// No I/O and no shared state; meant to run while routes are being declared.
use std::collections::HashSet;

use super::pattern::{classify_segment, Pattern, Segment};
use crate::path::split_segments;
use crate::PatternError;

/// Internal state accumulator for fold-based parsing
#[derive(Default)]
struct ParseState {
    segments: Vec<Segment>,
    names: HashSet<String>,
}

impl ParseState {
    /// Appends a classified segment, enforcing the cross-segment invariants
    fn with_segment(mut self, pattern: &str, segment: Segment) -> Result<Self, PatternError> {
        if let Some(Segment::Variable { name, .. }) = self.segments.last().filter(|s| s.is_greedy()) {
            return Err(PatternError::GreedyNotLast {
                pattern: pattern.to_string(),
                name: name.clone(),
            });
        }

        if let Some(name) = segment.variable_name() {
            if !self.names.insert(name.to_string()) {
                return Err(PatternError::DuplicateVariable {
                    pattern: pattern.to_string(),
                    name: name.to_string(),
                });
            }
        }

        self.segments.push(segment);
        Ok(self)
    }

    fn finalize(self) -> Pattern {
        Pattern::from_segments(self.segments)
    }
}

/// Compiles a route declaration into a [`Pattern`]
///
/// # Errors
///
/// [`PatternError`] when a variable is unclosed, a name is invalid or
/// repeated, a type annotation is unknown, or a greedy segment is not last.
///
/// # Examples
///
/// ```
/// use jsweb_router::compile;
///
/// let pattern = compile("/users/<id:integer>/posts/<slug>").unwrap();
/// assert_eq!(pattern.len(), 4);
/// assert_eq!(pattern.to_string(), "/users/<id:integer>/posts/<slug>");
///
/// assert!(compile("/files/<rest:path>/edit").is_err());
/// ```
pub fn compile(pattern: &str) -> Result<Pattern, PatternError> {
    if !pattern.starts_with('/') {
        return Err(PatternError::MissingLeadingSlash {
            pattern: pattern.to_string(),
        });
    }

    split_segments(pattern)
        .into_iter()
        .try_fold(ParseState::default(), |state, raw| {
            let segment = classify_segment(pattern, raw)?;
            state.with_segment(pattern, segment)
        })
        .map(ParseState::finalize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParamType;

    #[test]
    fn test_compile_root() {
        let pattern = compile("/").unwrap();
        assert!(pattern.is_empty());
        assert_eq!(pattern.to_string(), "/");
    }

    #[test]
    fn test_compile_literal_only() {
        let pattern = compile("/about/team").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal("about".to_string()),
                Segment::Literal("team".to_string())
            ]
        );
    }

    #[test]
    fn test_compile_variables_in_order() {
        let pattern = compile("/users/<id:integer>/posts/<slug>").unwrap();
        let vars: Vec<_> = pattern.variables().collect();
        assert_eq!(vars, vec![("id", ParamType::Int), ("slug", ParamType::Str)]);
    }

    #[test]
    fn test_compile_trailing_slash_kept() {
        let pattern = compile("/users/").unwrap();
        assert_eq!(pattern.len(), 2);
        assert_eq!(pattern.to_string(), "/users/");
    }

    #[test]
    fn test_greedy_must_be_last() {
        assert_eq!(
            compile("/files/<rest:path>/raw"),
            Err(PatternError::GreedyNotLast {
                pattern: "/files/<rest:path>/raw".to_string(),
                name: "rest".to_string(),
            })
        );
        assert!(compile("/files/<rest:path>").unwrap().has_greedy_tail());
    }

    #[test]
    fn test_duplicate_variable() {
        assert_eq!(
            compile("/<id>/x/<id:int>"),
            Err(PatternError::DuplicateVariable {
                pattern: "/<id>/x/<id:int>".to_string(),
                name: "id".to_string(),
            })
        );
    }

    #[test]
    fn test_missing_leading_slash() {
        assert!(matches!(
            compile("users/<id>"),
            Err(PatternError::MissingLeadingSlash { .. })
        ));
    }

    #[test]
    fn test_first_error_wins() {
        assert!(matches!(
            compile("/<id/<x:nope>"),
            Err(PatternError::UnclosedVariable { .. })
        ));
    }
}
