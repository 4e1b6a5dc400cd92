use std::sync::Arc;

/// A source unit under observation. Sources are discovered at runtime and
/// shared by reference; identity is the `Arc` pointer, never the content
/// (two sources with identical text are still distinct sources).
#[derive(Debug)]
pub struct Source {
    pub name: String,
    pub url: String,
    /// Runtime-internal sources are excluded from sampling by default.
    pub internal: bool,
}

pub type SourceRef = Arc<Source>;

impl Source {
    pub fn new(name: &str, url: &str) -> SourceRef {
        Arc::new(Source {
            name: name.to_owned(),
            url: url.to_owned(),
            internal: false,
        })
    }

    pub fn new_internal(name: &str) -> SourceRef {
        Arc::new(Source {
            name: name.to_owned(),
            url: String::new(),
            internal: true,
        })
    }
}

/// A contiguous character range within a source, with the line/column of its
/// first character.
#[derive(Debug, Clone)]
pub struct SourceSection {
    pub source: SourceRef,
    pub start_line: u32,
    pub start_column: u32,
    pub char_index: usize,
    pub char_end_index: usize,
}

impl SourceSection {
    pub fn new(
        source: &SourceRef,
        start_line: u32,
        start_column: u32,
        char_index: usize,
        char_end_index: usize,
    ) -> Self {
        Self {
            source: Arc::clone(source),
            start_line,
            start_column,
            char_index,
            char_end_index,
        }
    }
}

impl PartialEq for SourceSection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
            && self.char_index == other.char_index
            && self.char_end_index == other.char_end_index
    }
}

impl Eq for SourceSection {}

/// Instrumentation tags carried by coverage payloads. A `Statement` tag on
/// any payload of a function group upgrades that group to block coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Root,
    Statement,
}
