use std::collections::HashSet;

use crate::session::configuration::Granularity;
use crate::source::{SourceSection, Tag};

/// Accumulated hit counts for one instrumented section.
#[derive(Debug)]
pub struct TracePayload {
    pub section: SourceSection,
    pub root_name: String,
    pub tags: HashSet<Tag>,
    pub count: u64,
}

/// The coverage hit producer. One payload per instrumented (section, root)
/// pair; repeated hits bump the count. The session drains the buffer on
/// `takePreciseCoverage` / `getBestEffortCoverage`.
#[derive(Debug)]
pub struct CoverageTracer {
    collecting: bool,
    granularity: Granularity,
    payloads: Vec<TracePayload>,
}

impl CoverageTracer {
    pub fn new() -> Self {
        Self {
            collecting: false,
            granularity: Granularity::Root,
            payloads: vec![],
        }
    }

    pub fn set_collecting(&mut self, collecting: bool) {
        self.collecting = collecting;
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    /// Instrumentation filter chosen at `startPreciseCoverage` time. The
    /// instrumentation side reads this to decide which nodes to probe.
    pub fn set_granularity(&mut self, granularity: Granularity) {
        self.granularity = granularity;
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Records one execution of an instrumented section. `tags` are the
    /// section's own instrumentation tags, not the tracer's filter.
    pub fn record_hit(&mut self, section: &SourceSection, root_name: &str, tags: &[Tag]) {
        if !self.collecting {
            return;
        }
        let existing = self
            .payloads
            .iter_mut()
            .find(|p| p.section == *section && p.root_name == root_name);
        match existing {
            Some(payload) => {
                payload.count += 1;
                payload.tags.extend(tags.iter().copied());
            }
            None => self.payloads.push(TracePayload {
                section: section.clone(),
                root_name: root_name.to_owned(),
                tags: tags.iter().copied().collect(),
                count: 1,
            }),
        }
    }

    pub fn payloads(&self) -> &[TracePayload] {
        &self.payloads
    }

    pub fn clear_data(&mut self) {
        self.payloads.clear();
    }
}

impl Default for CoverageTracer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;

    #[test]
    fn test_hits_merge_by_section_and_root() {
        let source = Source::new("app.js", "file:///app.js");
        let body = SourceSection::new(&source, 1, 1, 0, 40);
        let stmt = SourceSection::new(&source, 2, 3, 10, 20);

        let mut tracer = CoverageTracer::new();
        tracer.set_collecting(true);
        tracer.record_hit(&body, "main", &[Tag::Root]);
        tracer.record_hit(&stmt, "main", &[Tag::Statement]);
        tracer.record_hit(&body, "main", &[Tag::Root]);

        assert_eq!(tracer.payloads().len(), 2);
        assert_eq!(tracer.payloads()[0].count, 2);
        assert_eq!(tracer.payloads()[1].count, 1);
    }

    #[test]
    fn test_not_collecting_drops_hits() {
        let source = Source::new("app.js", "file:///app.js");
        let body = SourceSection::new(&source, 1, 1, 0, 40);

        let mut tracer = CoverageTracer::new();
        tracer.record_hit(&body, "main", &[Tag::Root]);

        assert!(tracer.payloads().is_empty());
    }
}
