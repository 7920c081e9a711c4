use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

// @module: Book metadata and the spoken introduction

// @const: Life-span suffix as found in catalogue names ("Tolstoy, Leo, 1828-1910")
static LIFE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*\d{4}-\d{4}").unwrap());

/// Book metadata as produced by the text extraction step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookMetadata {
    #[serde(rename = "Title", default = "default_title")]
    pub title: String,

    #[serde(rename = "Author", default = "default_author")]
    pub author: String,

    /// The literal "None" means the book has no translator
    #[serde(rename = "Translator", default = "default_translator")]
    pub translator: String,
}

fn default_title() -> String {
    "Unknown Title".to_string()
}

fn default_author() -> String {
    "Unknown Author".to_string()
}

fn default_translator() -> String {
    "None".to_string()
}

impl BookMetadata {
    pub fn new(title: &str, author: &str, translator: &str) -> Self {
        Self {
            title: title.to_string(),
            author: author.to_string(),
            translator: translator.to_string(),
        }
    }

    /// Load metadata from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read metadata file: {}", path.display()))?;
        let metadata: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse metadata file: {}", path.display()))?;
        Ok(metadata)
    }

    /// Reject metadata that cannot produce an introduction
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.title.trim().is_empty() {
            return Err(PipelineError::Input("Book metadata has an empty Title".to_string()));
        }
        if self.author.trim().is_empty() {
            return Err(PipelineError::Input("Book metadata has an empty Author".to_string()));
        }
        Ok(())
    }

    /// Normalized translator name, if the book has one
    pub fn translator_name(&self) -> Option<String> {
        let raw = self.translator.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
            return None;
        }
        Some(format_name(raw))
    }

    /// The greeting spoken before the first chapter
    pub fn introduction_text(&self) -> String {
        let title = self.title.trim();
        let author = format_name(&self.author);

        match self.translator_name() {
            Some(translator) => format!(
                "Welcome, to the audiobook edition of {}, written by {} and beautifully translated by {}. Sit back, relax, and enjoy.",
                title, author, translator
            ),
            None => format!(
                "Welcome, to the audiobook edition of {} by {}. Sit back, relax, and enjoy.",
                title, author
            ),
        }
    }
}

/// Turn "Last, First, 1800-1870" into "First Last"
pub fn format_name(raw_name: &str) -> String {
    let name = LIFE_SPAN.replace_all(raw_name, "");
    let name = name.trim();

    match name.split_once(',') {
        Some((last, first)) => format!("{} {}", first.trim(), last.trim()),
        None => name.to_string(),
    }
}
