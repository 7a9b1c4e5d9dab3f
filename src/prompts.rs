//! Instruction templates sent to the OCR model.
//!
//! The model receives a single argument: the absolute path of the page
//! image, a literal newline, then one of the templates below. DeepSeek-OCR
//! keys its behaviour on the exact text (including the `<|grounding|>`
//! marker and the trailing period), so the strings must stay byte-for-byte
//! identical.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which extraction style to ask the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    /// Plain transcription. (default)
    #[default]
    Free,
    /// Transcription with grounding boxes that follow the page layout.
    Layout,
    /// Whole page converted to Markdown.
    Markdown,
    /// Text only, figures ignored.
    Extract,
    /// Describe a chart or figure.
    Figure,
}

impl PromptKind {
    /// Every kind, in the order shown by `--help`.
    pub const ALL: [PromptKind; 5] = [
        PromptKind::Free,
        PromptKind::Layout,
        PromptKind::Markdown,
        PromptKind::Extract,
        PromptKind::Figure,
    ];

    /// The literal instruction text for this kind.
    pub fn template(self) -> &'static str {
        match self {
            PromptKind::Free => "Free OCR.",
            PromptKind::Layout => "<|grounding|>Given the layout of the image.",
            PromptKind::Markdown => "<|grounding|>Convert the document to markdown.",
            PromptKind::Extract => "Extract the text in the image.",
            PromptKind::Figure => "Parse the figure.",
        }
    }

    /// Lowercase name used on the command line and in the output header.
    pub fn name(self) -> &'static str {
        match self {
            PromptKind::Free => "free",
            PromptKind::Layout => "layout",
            PromptKind::Markdown => "markdown",
            PromptKind::Extract => "extract",
            PromptKind::Figure => "figure",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PromptKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        PromptKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = PromptKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown prompt '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Build the single instruction argument passed to the model:
/// `"<image path>\n<template>"`.
pub fn build_instruction(image_path: &Path, kind: PromptKind) -> String {
    format!("{}\n{}", image_path.display(), kind.template())
}
