//! Source-located errors for reference and project files

use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// A file that could not be read into the data model
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(elca::yaml::invalid))]
pub struct YamlSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl YamlSyntaxError {
    pub fn from_serde_error(err: &serde_yml::Error, source: &str, filename: &str) -> Self {
        let offset = err
            .location()
            .map(|loc| offset_of(source, loc.line(), loc.column()))
            .unwrap_or(0);
        let message = err.to_string();

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1).min(source.len().max(1))),
            help: hint(&message),
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("cannot read {path}: {source}")]
    #[diagnostic(code(elca::yaml::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Deserialize a YAML document, locating failures in `filename`
pub fn parse_str<T: DeserializeOwned + 'static>(source: &str, filename: &str) -> Result<T, YamlError> {
    serde_yml::from_str(source)
        .map_err(|e| YamlSyntaxError::from_serde_error(&e, source, filename).into())
}

/// Read and deserialize a YAML file
pub fn parse_file<T: DeserializeOwned + 'static>(path: &Path) -> Result<T, YamlError> {
    let source = std::fs::read_to_string(path).map_err(|source| YamlError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_str(&source, &path.display().to_string())
}

/// Byte offset of a 1-based line and column
fn offset_of(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    let line_text = source[line_start.min(source.len())..]
        .split('\n')
        .next()
        .unwrap_or("");
    let column_offset = line_text
        .char_indices()
        .nth(column.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(line_text.len());
    (line_start + column_offset).min(source.len())
}

fn hint(message: &str) -> Option<String> {
    let lower = message.to_lowercase();

    if lower.contains("missing field") {
        return Some("every id, process_config_id and quantity must be given".to_string());
    }
    if lower.contains("unknown variant") {
        return Some("life cycle modules are written A1-3, A4, B6, C3, D, prod, op, eol, rec".to_string());
    }
    if lower.contains("invalid type") {
        return Some("ids and numeric values must not be quoted".to_string());
    }
    if lower.contains("tab") {
        return Some("YAML requires spaces for indentation, not tabs".to_string());
    }
    if lower.contains("duplicate key") {
        return Some("each key can only appear once".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::element::Element;

    #[test]
    fn test_offset_of() {
        let source = "line1\nline2\nline3";
        assert_eq!(offset_of(source, 1, 1), 0);
        assert_eq!(offset_of(source, 2, 1), 6);
        assert_eq!(offset_of(source, 3, 3), 14);
        assert_eq!(offset_of(source, 9, 1), source.len());
    }

    #[test]
    fn test_missing_field_gets_hint() {
        let err = parse_str::<Element>("id: 1\n", "element.yaml").unwrap_err();
        let YamlError::Syntax(syntax) = err else {
            panic!("expected a syntax error");
        };
        assert!(syntax.message().contains("element_type_node_id"));
        assert!(syntax.help.is_some());
    }

    #[test]
    fn test_missing_file() {
        let err = parse_file::<Element>(Path::new("/nonexistent/element.yaml")).unwrap_err();
        assert!(matches!(err, YamlError::Io { .. }));
    }

    #[test]
    fn test_hints() {
        assert!(hint("found tab character").is_some());
        assert!(hint("unknown variant `A9`").is_some());
        assert!(hint("something else").is_none());
    }
}
