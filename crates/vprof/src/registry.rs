use std::sync::Arc;

use crate::source::SourceRef;

/// A source known to the registry, with its stable numeric id.
#[derive(Debug)]
pub struct Script {
    pub id: u32,
    pub url: String,
    pub source: SourceRef,
}

/// Maps source objects to stable script ids. Ids are allocated sequentially
/// from 1 so that 0 stays the "unresolved" sentinel.
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: Vec<Script>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self { scripts: vec![] }
    }

    /// Registers a source, returning its id. Registering the same source
    /// reference twice returns the existing id.
    pub fn register(&mut self, source: &SourceRef) -> u32 {
        if let Some(script) = self.resolve(source) {
            return script.id;
        }
        let id = self.scripts.len() as u32 + 1;
        self.scripts.push(Script {
            id,
            url: source.url.clone(),
            source: Arc::clone(source),
        });
        id
    }

    /// Looks a source up by reference identity.
    pub fn resolve(&self, source: &SourceRef) -> Option<&Script> {
        self.scripts
            .iter()
            .find(|script| Arc::ptr_eq(&script.source, source))
    }

    /// Like `resolve`, but yields the `(0, "")` sentinel for unknown sources.
    pub fn resolve_or_default(&self, source: &SourceRef) -> (u32, String) {
        match self.resolve(source) {
            Some(script) => (script.id, script.url.clone()),
            None => (0, String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;

    #[test]
    fn test_register_allocates_sequential_ids() {
        let mut registry = ScriptRegistry::new();
        let a = Source::new("a.js", "file:///a.js");
        let b = Source::new("b.js", "file:///b.js");

        assert_eq!(registry.register(&a), 1);
        assert_eq!(registry.register(&b), 2);
        assert_eq!(registry.register(&a), 1);
    }

    #[test]
    fn test_resolve_is_by_reference_identity() {
        let mut registry = ScriptRegistry::new();
        let a = Source::new("a.js", "file:///a.js");
        let twin = Source::new("a.js", "file:///a.js");
        registry.register(&a);

        assert_eq!(registry.resolve_or_default(&a), (1, "file:///a.js".to_owned()));
        assert_eq!(registry.resolve_or_default(&twin), (0, String::new()));
    }
}
