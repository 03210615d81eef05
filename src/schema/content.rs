use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Newtype wrapper for content IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Newtype wrapper for audio clip handles. The audio collaborator decides
/// what the key refers to (a file path, an asset id, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipHandle(pub String);

impl ClipHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClipHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of displayable dialogue text.
///
/// `index` is the line's 0-based position within its content and never
/// changes after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub index: usize,
    pub text: String,
    #[serde(default)]
    pub audio: Option<ClipHandle>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Line {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            audio: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_audio(mut self, clip: ClipHandle) -> Self {
        self.audio = Some(clip);
        self
    }
}

/// An ordered dialogue script. Immutable once loaded; sessions and
/// controllers share it behind an `Rc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueContent {
    pub id: ContentId,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub description: String,
    pub lines: Vec<Line>,
}

impl DialogueContent {
    /// Build content from plain strings, assigning indices by position.
    pub fn from_texts<I, S>(id: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Line::new(i, text))
            .collect();
        Self {
            id: ContentId::new(id),
            speaker: None,
            description: String::new(),
            lines,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }
}
