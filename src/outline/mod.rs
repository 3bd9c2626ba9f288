//! Markdown outline parsing.
//!
//! The outline endpoint produces, and the page endpoint consumes, a small
//! markdown dialect:
//!
//! ```text
//! # Presentation title
//! ## Chapter
//! ### Section
//! - Item
//! ```
//!
//! Parsing is lenient: unknown lines are skipped, a section without a
//! chapter and an item without a section are dropped.

use serde::Serialize;

/// A parsed presentation outline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outline {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    pub title: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub items: Vec<String>,
}

impl Outline {
    /// Parses a markdown outline.
    pub fn parse(content: &str) -> Self {
        let mut outline = Outline::default();
        let mut chapter: Option<Chapter> = None;

        for line in content.trim().lines().map(str::trim) {
            if line.is_empty() {
                continue;
            }

            if let Some(title) = line.strip_prefix("# ") {
                outline.title = title.trim().to_owned();
            } else if let Some(title) = line.strip_prefix("## ") {
                outline.chapters.extend(chapter.take());
                chapter = Some(Chapter {
                    title: title.trim().to_owned(),
                    sections: Vec::new(),
                });
            } else if let Some(title) = line.strip_prefix("### ") {
                if let Some(chapter) = chapter.as_mut() {
                    chapter.sections.push(Section {
                        title: title.trim().to_owned(),
                        items: Vec::new(),
                    });
                }
            } else if let Some(item) = line.strip_prefix("- ") {
                // Items attach to the most recent section of the current chapter.
                if let Some(section) = chapter.as_mut().and_then(|c| c.sections.last_mut()) {
                    section.items.push(item.trim().to_owned());
                }
            }
        }

        outline.chapters.extend(chapter);
        outline
    }
}

impl Chapter {
    /// Renders the chapter back to markdown, one line per heading or item.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("## {}\n", self.title);
        for section in &self.sections {
            out.push_str(&format!("### {}\n", section.title));
            for item in &section.items {
                out.push_str(&format!("- {item}\n"));
            }
        }
        out
    }
}
