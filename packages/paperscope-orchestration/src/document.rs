//! Input types supplied by the document-sectioning collaborator.
//!
//! The core does not parse documents. A sectioner hands it an ordered list
//! of named sections plus document metadata; those become `TaskInput`s, one
//! per task in a batch.

use serde::{Deserialize, Serialize};

/// Document-level metadata attached to every task input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<u16>,
}

impl DocumentMeta {
    pub fn new(title: impl Into<String>, authors: Vec<String>, year: u16) -> Self {
        Self {
            title: title.into(),
            authors,
            year: Some(year),
        }
    }

    /// Metadata with title only, for documents without author/year fields
    pub fn untitled_extras(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            year: None,
        }
    }
}

/// One contiguous region of the document, as extracted by the sectioner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSection {
    /// Section name ("abstract", "methods", "results", ...)
    pub name: String,
    /// Section text, verbatim
    pub text: String,
    /// Position within the document (0-indexed)
    pub index: usize,
}

impl DocumentSection {
    pub fn new(name: impl Into<String>, text: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            index,
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Payload handed to a capability handler: the section under analysis plus
/// document context. Owned by the caller until submitted; never mutated by
/// the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInput {
    pub document: DocumentMeta,
    pub section: DocumentSection,
}

impl TaskInput {
    pub fn new(document: DocumentMeta, section: DocumentSection) -> Self {
        Self { document, section }
    }
}
