//! Prompt templates loaded from text files.
//!
//! Templates use single-brace placeholders: `{language}` is replaced by the
//! `language` variable, while `{{` and `}}` produce literal braces (prompts
//! routinely embed JSON examples). A template is compiled once when loaded so
//! syntax errors surface at startup instead of on the first request.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Variables substituted into a template.
pub type Vars = HashMap<&'static str, String>;

/// Errors produced while loading or rendering a prompt template.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template file {path} not found")]
    NotFound { path: PathBuf },

    #[error("error loading prompt template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("template syntax error at byte {offset}: {reason}")]
    Syntax { offset: usize, reason: &'static str },

    #[error("missing template variable: {name}")]
    MissingVariable { name: String },
}

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text(String),
    Var(String),
}

/// A compiled prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pieces: Vec<Piece>,
}

impl PromptTemplate {
    /// Compiles `source` into a template.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Syntax`] for an unmatched brace or an empty
    /// placeholder.
    pub fn parse(source: &str) -> Result<Self, PromptError> {
        let mut pieces = Vec::new();
        let mut text = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, n) in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(PromptError::Syntax {
                            offset,
                            reason: "unclosed '{'",
                        });
                    }
                    let name = name.trim();
                    if name.is_empty() || name.contains('{') {
                        return Err(PromptError::Syntax {
                            offset,
                            reason: "invalid placeholder name",
                        });
                    }
                    if !text.is_empty() {
                        pieces.push(Piece::Text(std::mem::take(&mut text)));
                    }
                    pieces.push(Piece::Var(name.to_owned()));
                }
                '}' => {
                    return Err(PromptError::Syntax {
                        offset,
                        reason: "single '}' outside a placeholder",
                    });
                }
                c => text.push(c),
            }
        }

        if !text.is_empty() {
            pieces.push(Piece::Text(text));
        }
        Ok(Self { pieces })
    }

    /// Reads and compiles the template at `path`.
    pub fn load(path: &Path) -> Result<Self, PromptError> {
        let source = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => PromptError::NotFound {
                path: path.to_owned(),
            },
            _ => PromptError::Io {
                path: path.to_owned(),
                source: e,
            },
        })?;
        Self::parse(&source)
    }

    /// Returns the placeholder names in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for piece in &self.pieces {
            if let Piece::Var(name) = piece {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Substitutes `vars` into the template.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::MissingVariable`] for the first placeholder
    /// without a value. Extra variables are ignored.
    pub fn render(&self, vars: &Vars) -> Result<String, PromptError> {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Var(name) => {
                    let value = vars
                        .get(name.as_str())
                        .ok_or_else(|| PromptError::MissingVariable { name: name.clone() })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// The three templates the generation endpoints use.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub outline: PromptTemplate,
    pub cover_contents: PromptTemplate,
    pub section_content: PromptTemplate,
}

impl PromptSet {
    /// Loads `outline.txt`, `cover_contents.txt` and `section_content.txt` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, PromptError> {
        Ok(Self {
            outline: PromptTemplate::load(&dir.join("outline.txt"))?,
            cover_contents: PromptTemplate::load(&dir.join("cover_contents.txt"))?,
            section_content: PromptTemplate::load(&dir.join("section_content.txt"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> Vars {
        pairs.iter().map(|(k, v)| (*k, (*v).to_owned())).collect()
    }

    #[test]
    fn substitutes_variables() {
        let t = PromptTemplate::parse("Write in {language} about {content}.").unwrap();
        let out = t
            .render(&vars(&[("language", "English"), ("content", "tides")]))
            .unwrap();
        assert_eq!(out, "Write in English about tides.");
        assert_eq!(t.variables(), vec!["language", "content"]);
    }

    #[test]
    fn doubled_braces_are_literal() {
        let t = PromptTemplate::parse(r#"{{"type": "cover", "title": "{title}"}}"#).unwrap();
        let out = t.render(&vars(&[("title", "Rust")])).unwrap();
        assert_eq!(out, r#"{"type": "cover", "title": "Rust"}"#);
    }

    #[test]
    fn missing_variable_is_reported() {
        let t = PromptTemplate::parse("{a} and {b}").unwrap();
        let err = t.render(&vars(&[("a", "1")])).unwrap_err();
        assert!(matches!(err, PromptError::MissingVariable { name } if name == "b"));
    }

    #[test]
    fn unclosed_brace_is_a_syntax_error() {
        assert!(matches!(
            PromptTemplate::parse("hello {name"),
            Err(PromptError::Syntax { offset: 6, .. })
        ));
    }

    #[test]
    fn stray_closing_brace_is_a_syntax_error() {
        assert!(matches!(
            PromptTemplate::parse("a } b"),
            Err(PromptError::Syntax { .. })
        ));
    }

    #[test]
    fn empty_placeholder_is_a_syntax_error() {
        assert!(PromptTemplate::parse("{}").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PromptTemplate::load(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, PromptError::NotFound { .. }));
    }

    #[test]
    fn prompt_set_loads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("outline.txt"), "{content} in {language}").unwrap();
        std::fs::write(dir.path().join("cover_contents.txt"), "{content}").unwrap();
        std::fs::write(dir.path().join("section_content.txt"), "{section_title}").unwrap();

        let set = PromptSet::load(dir.path()).unwrap();
        assert_eq!(set.outline.variables(), vec!["content", "language"]);
        assert_eq!(set.section_content.variables(), vec!["section_title"]);
    }

    #[test]
    fn shipped_prompts_compile() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("prompts");
        let set = PromptSet::load(&dir).unwrap();
        assert_eq!(set.outline.variables().len(), 2);
        assert!(set.section_content.variables().contains(&"section_content"));
    }
}
