/// Line store — loaded dialogue content keyed by id.
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use thiserror::Error;

use crate::schema::content::{ClipHandle, ContentId, DialogueContent, Line};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("duplicate content id: {0}")]
    DuplicateContent(ContentId),
    #[error("content not found: {0}")]
    NotFound(ContentId),
}

// Authored files omit line indices; they are assigned from position on load.

#[derive(Debug, Deserialize)]
struct RonLine {
    text: String,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Dialogue")]
struct RonContent {
    id: String,
    #[serde(default)]
    speaker: Option<String>,
    #[serde(default)]
    description: String,
    lines: Vec<RonLine>,
}

impl From<RonContent> for DialogueContent {
    fn from(raw: RonContent) -> Self {
        let lines = raw
            .lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| Line {
                index,
                text: line.text,
                audio: line.audio.map(ClipHandle),
                metadata: line.metadata,
            })
            .collect();
        DialogueContent {
            id: ContentId(raw.id),
            speaker: raw.speaker,
            description: raw.description,
            lines,
        }
    }
}

/// All loaded dialogue content. Content is handed out as `Rc` so sessions
/// and branch options can point at it without copying.
#[derive(Debug, Clone, Default)]
pub struct ContentLibrary {
    contents: FxHashMap<ContentId, Rc<DialogueContent>>,
}

impl ContentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register content. A later registration with the same id replaces
    /// the earlier one.
    pub fn register(&mut self, content: DialogueContent) -> Rc<DialogueContent> {
        let content = Rc::new(content);
        if self
            .contents
            .insert(content.id.clone(), Rc::clone(&content))
            .is_some()
        {
            tracing::warn!(content = %content.id, "content replaced by a later registration");
        }
        content
    }

    pub fn get(&self, id: &ContentId) -> Option<Rc<DialogueContent>> {
        self.contents.get(id).cloned()
    }

    /// Like `get`, but reports a missing id as an error.
    pub fn require(&self, id: &ContentId) -> Result<Rc<DialogueContent>, ContentError> {
        self.get(id).ok_or_else(|| ContentError::NotFound(id.clone()))
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Content ids in sorted order.
    pub fn ids(&self) -> Vec<ContentId> {
        let mut ids: Vec<ContentId> = self.contents.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Parse a list of content definitions from a RON string.
    ///
    /// Ids must be unique within one file; clashes with content already in
    /// the library are allowed and replace it.
    pub fn parse_ron(input: &str) -> Result<Vec<DialogueContent>, ContentError> {
        let raw: Vec<RonContent> = ron::from_str(input)?;
        let mut seen = FxHashSet::default();
        let mut contents = Vec::with_capacity(raw.len());
        for entry in raw {
            let content = DialogueContent::from(entry);
            if !seen.insert(content.id.clone()) {
                return Err(ContentError::DuplicateContent(content.id));
            }
            contents.push(content);
        }
        Ok(contents)
    }

    /// Load content definitions from a RON file into the library.
    pub fn load_from_ron(&mut self, path: &Path) -> Result<usize, ContentError> {
        let contents = std::fs::read_to_string(path)?;
        let parsed = Self::parse_ron(&contents)?;
        let count = parsed.len();
        for content in parsed {
            tracing::info!(
                content = %content.id,
                lines = content.lines.len(),
                "loaded dialogue content"
            );
            self.register(content);
        }
        Ok(count)
    }

    /// Load every `.ron` file in a directory.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ContentError> {
        let mut total = 0;
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                paths.push(path);
            }
        }
        paths.sort();
        for path in paths {
            total += self.load_from_ron(&path)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        Dialogue(
            id: "greeting",
            speaker: Some("Innkeeper"),
            lines: [
                (text: "Welcome, traveller."),
                (text: "Rooms are two silver.", audio: Some("rooms.ogg")),
            ],
        ),
        Dialogue(
            id: "farewell",
            lines: [(text: "Safe roads.", metadata: {"mood": "warm"})],
        ),
    ]"#;

    #[test]
    fn parse_assigns_indices() {
        let contents = ContentLibrary::parse_ron(SAMPLE).unwrap();
        assert_eq!(contents.len(), 2);
        let greeting = &contents[0];
        assert_eq!(greeting.speaker.as_deref(), Some("Innkeeper"));
        assert_eq!(greeting.lines[0].index, 0);
        assert_eq!(greeting.lines[1].index, 1);
        assert_eq!(greeting.lines[1].audio, Some(ClipHandle::new("rooms.ogg")));
        assert_eq!(
            contents[1].lines[0].metadata.get("mood").map(String::as_str),
            Some("warm")
        );
    }

    #[test]
    fn duplicate_ids_in_one_file_rejected() {
        let input = r#"[
            Dialogue(id: "a", lines: []),
            Dialogue(id: "a", lines: [(text: "again")]),
        ]"#;
        let err = ContentLibrary::parse_ron(input).unwrap_err();
        assert!(matches!(err, ContentError::DuplicateContent(id) if id.as_str() == "a"));
    }

    #[test]
    fn register_and_get() {
        let mut library = ContentLibrary::new();
        for content in ContentLibrary::parse_ron(SAMPLE).unwrap() {
            library.register(content);
        }
        assert_eq!(library.len(), 2);
        assert!(library.get(&ContentId::new("greeting")).is_some());
        assert!(library.get(&ContentId::new("missing")).is_none());
        assert_eq!(
            library.ids(),
            vec![ContentId::new("farewell"), ContentId::new("greeting")]
        );
    }

    #[test]
    fn require_missing_is_error() {
        let library = ContentLibrary::new();
        let err = library.require(&ContentId::new("nowhere")).unwrap_err();
        assert!(matches!(err, ContentError::NotFound(_)));
    }

    #[test]
    fn later_registration_wins() {
        let mut library = ContentLibrary::new();
        library.register(DialogueContent::from_texts("a", ["old"]));
        library.register(DialogueContent::from_texts("a", ["new", "lines"]));
        let content = library.get(&ContentId::new("a")).unwrap();
        assert_eq!(content.lines.len(), 2);
        assert_eq!(content.lines[0].text, "new");
    }

    #[test]
    fn load_test_content_from_ron() {
        let path = std::path::PathBuf::from("tests/fixtures/test_content.ron");
        let mut library = ContentLibrary::new();
        let count = library.load_from_ron(&path).unwrap();
        assert_eq!(count, 4);
        let intro = library.get(&ContentId::new("intro")).unwrap();
        assert_eq!(intro.lines.len(), 3);
        assert!(library.get(&ContentId::new("empty")).unwrap().is_empty());
    }
}
