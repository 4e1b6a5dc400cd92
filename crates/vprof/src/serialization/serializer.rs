use std::collections::HashMap;
use std::sync::Arc;

use crate::registry::ScriptRegistry;
use crate::sampler::{CallTreeArena, NodeHandle};
use crate::serialization::profile::{
    CoverageRange, FunctionCoverage, Profile, ProfileNode, RuntimeCallFrame, ScriptCoverage,
    ScriptTypeProfile, TypeObject, TypeProfileEntry,
};
use crate::source::{SourceRef, Tag};
use crate::tracer::TracePayload;
use crate::type_handler::SectionTypeProfile;

struct TimeLineItem {
    timestamp: u64,
    node_id: i64,
}

/// Walks the sampled call forest, allocating sequential node ids in
/// depth-first pre-order. Deduplication is keyed by node handle, so
/// structurally identical frames on different paths keep distinct ids while
/// a handle reachable from two parents is expanded exactly once.
struct ProfileBuilder<'a> {
    arena: &'a CallTreeArena,
    registry: &'a ScriptRegistry,
    node2id: HashMap<NodeHandle, i64>,
    nodes: Vec<ProfileNode>,
    timeline: Vec<TimeLineItem>,
    next_id: i64,
}

impl<'a> ProfileBuilder<'a> {
    fn new(arena: &'a CallTreeArena, registry: &'a ScriptRegistry) -> Self {
        Self {
            arena,
            registry,
            node2id: HashMap::new(),
            nodes: vec![],
            timeline: vec![],
            next_id: 1,
        }
    }

    fn alloc_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn visit(&mut self, handle: NodeHandle) -> i64 {
        if let Some(&id) = self.node2id.get(&handle) {
            return id;
        }
        let sample_node = self.arena.get(handle);
        let id = self.alloc_id();
        let (script_id, url) = self
            .registry
            .resolve_or_default(&sample_node.frame.section.source);
        self.nodes.push(ProfileNode {
            id,
            call_frame: RuntimeCallFrame {
                function_name: sample_node.frame.root_name.clone(),
                script_id,
                url,
                line_number: sample_node.frame.section.start_line,
                column_number: sample_node.frame.section.start_column,
            },
            hit_count: sample_node.self_hit_count,
            children: vec![],
        });
        let node_index = self.nodes.len() - 1;
        for &timestamp in sample_node.self_hit_times.iter() {
            self.timeline.push(TimeLineItem {
                timestamp,
                node_id: id,
            });
        }
        self.node2id.insert(handle, id);
        let child_ids: Vec<i64> = sample_node
            .children
            .iter()
            .map(|&child| self.visit(child))
            .collect();
        self.nodes[node_index].children = child_ids;
        id
    }
}

/// Builds the call-tree profile from a drained sampler snapshot. Node id 1
/// is the synthetic `(root)` frame carrying the idle hit count, which may be
/// negative when the sampler fell behind its nominal period.
pub fn profile(
    arena: &CallTreeArena,
    root_nodes: &[NodeHandle],
    idle_hit_count: i64,
    start_time: u64,
    end_time: u64,
    registry: &ScriptRegistry,
) -> Profile {
    let mut builder = ProfileBuilder::new(arena, registry);
    let root_id = builder.alloc_id();
    builder.nodes.push(ProfileNode {
        id: root_id,
        call_frame: RuntimeCallFrame {
            function_name: "(root)".to_owned(),
            script_id: 0,
            url: String::new(),
            line_number: 0,
            column_number: 0,
        },
        hit_count: idle_hit_count,
        children: vec![],
    });
    let child_ids: Vec<i64> = root_nodes.iter().map(|&root| builder.visit(root)).collect();
    builder.nodes[0].children = child_ids;

    builder.timeline.sort_by_key(|item| item.timestamp);
    let mut samples = Vec::with_capacity(builder.timeline.len());
    let mut time_deltas = Vec::with_capacity(builder.timeline.len());
    let mut previous = start_time;
    for item in builder.timeline.iter() {
        samples.push(item.node_id);
        time_deltas.push(item.timestamp as i64 - previous as i64);
        previous = item.timestamp;
    }

    Profile {
        nodes: builder.nodes,
        start_time,
        end_time,
        samples,
        time_deltas,
    }
}

/// Builds the coverage report from a drained tracer snapshot. Sources and,
/// within a source, root names are emitted in first-encounter order; every
/// payload contributes exactly one range, overlaps included.
pub fn coverage(payloads: &[TracePayload], registry: &ScriptRegistry) -> Vec<ScriptCoverage> {
    let mut source_to_roots: Vec<(SourceRef, Vec<(&str, Vec<&TracePayload>)>)> = vec![];
    for payload in payloads.iter() {
        let source = &payload.section.source;
        let index = match source_to_roots
            .iter()
            .position(|(s, _)| Arc::ptr_eq(s, source))
        {
            Some(index) => index,
            None => {
                source_to_roots.push((Arc::clone(source), vec![]));
                source_to_roots.len() - 1
            }
        };
        let roots = &mut source_to_roots[index].1;
        match roots
            .iter_mut()
            .find(|(name, _)| *name == payload.root_name)
        {
            Some((_, group)) => group.push(payload),
            None => roots.push((payload.root_name.as_str(), vec![payload])),
        }
    }

    source_to_roots
        .into_iter()
        .map(|(source, roots)| {
            let functions = roots
                .into_iter()
                .map(|(root_name, group)| {
                    let mut is_block_coverage = false;
                    let mut ranges = Vec::with_capacity(group.len());
                    for payload in group {
                        is_block_coverage |= payload.tags.contains(&Tag::Statement);
                        ranges.push(CoverageRange {
                            start_offset: payload.section.char_index,
                            end_offset: payload.section.char_end_index,
                            count: payload.count,
                        });
                    }
                    FunctionCoverage {
                        function_name: root_name.to_owned(),
                        is_block_coverage,
                        ranges,
                    }
                })
                .collect();
            let (script_id, url) = registry.resolve_or_default(&source);
            ScriptCoverage {
                script_id,
                url,
                functions,
            }
        })
        .collect()
}

/// Builds the type profile from a drained type-handler snapshot. Sections
/// with no observed types are omitted; sources are grouped in
/// first-encounter order so the output is deterministic for a fixed input.
pub fn type_profile(
    profiles: &[SectionTypeProfile],
    registry: &ScriptRegistry,
) -> Vec<ScriptTypeProfile> {
    let mut source_to_profiles: Vec<(SourceRef, Vec<&SectionTypeProfile>)> = vec![];
    for profile in profiles.iter() {
        let source = &profile.section.source;
        match source_to_profiles
            .iter_mut()
            .find(|(s, _)| Arc::ptr_eq(s, source))
        {
            Some((_, group)) => group.push(profile),
            None => source_to_profiles.push((Arc::clone(source), vec![profile])),
        }
    }

    source_to_profiles
        .into_iter()
        .map(|(source, group)| {
            let entries = group
                .into_iter()
                .filter(|section_profile| !section_profile.types.is_empty())
                .map(|section_profile| TypeProfileEntry {
                    offset: section_profile.section.char_end_index,
                    types: section_profile
                        .types
                        .iter()
                        .map(|name| TypeObject { name: name.clone() })
                        .collect(),
                })
                .collect();
            let (script_id, url) = registry.resolve_or_default(&source);
            ScriptTypeProfile {
                script_id,
                url,
                entries,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::sampler::{SampleNode, StackFrame};
    use crate::source::{Source, SourceSection};

    fn section(source: &SourceRef, line: u32, start: usize, end: usize) -> SourceSection {
        SourceSection::new(source, line, 1, start, end)
    }

    fn payload(
        source: &SourceRef,
        root_name: &str,
        start: usize,
        end: usize,
        tags: &[Tag],
        count: u64,
    ) -> TracePayload {
        TracePayload {
            section: section(source, 1, start, end),
            root_name: root_name.to_owned(),
            tags: tags.iter().copied().collect::<HashSet<Tag>>(),
            count,
        }
    }

    #[test]
    fn test_coverage_aggregation_is_deterministic() {
        let mut registry = ScriptRegistry::new();
        let a = Source::new("a.js", "file:///a.js");
        let b = Source::new("b.js", "file:///b.js");
        registry.register(&a);
        registry.register(&b);

        let payloads = vec![
            payload(&b, "main", 0, 50, &[Tag::Root], 1),
            payload(&a, "helper", 10, 20, &[Tag::Statement], 3),
            payload(&b, "util", 60, 90, &[Tag::Root], 2),
            payload(&a, "helper", 0, 40, &[Tag::Root], 3),
        ];

        let first = serde_json::to_string(&coverage(&payloads, &registry)).unwrap();
        let second = serde_json::to_string(&coverage(&payloads, &registry)).unwrap();
        assert_eq!(first, second);

        // First-encounter order: source b before a, "main" before "util".
        let result = coverage(&payloads, &registry);
        assert_eq!(result[0].url, "file:///b.js");
        assert_eq!(result[0].functions[0].function_name, "main");
        assert_eq!(result[0].functions[1].function_name, "util");
        assert_eq!(result[1].url, "file:///a.js");
    }

    #[test]
    fn test_block_coverage_is_or_reduced_over_statement_tags() {
        let mut registry = ScriptRegistry::new();
        let source = Source::new("a.js", "file:///a.js");
        registry.register(&source);

        let payloads = vec![
            payload(&source, "mixed", 0, 40, &[Tag::Root], 1),
            payload(&source, "mixed", 10, 20, &[Tag::Statement], 5),
            payload(&source, "rootonly", 50, 90, &[Tag::Root], 2),
        ];

        let result = coverage(&payloads, &registry);
        assert_eq!(result.len(), 1);
        let mixed = &result[0].functions[0];
        assert!(mixed.is_block_coverage);
        assert_eq!(mixed.ranges.len(), 2);
        let rootonly = &result[0].functions[1];
        assert!(!rootonly.is_block_coverage);
        assert_eq!(
            rootonly.ranges,
            vec![CoverageRange {
                start_offset: 50,
                end_offset: 90,
                count: 2
            }]
        );
    }

    #[test]
    fn test_unresolved_source_yields_sentinel() {
        let registry = ScriptRegistry::new();
        let source = Source::new("a.js", "file:///a.js");
        let payloads = vec![payload(&source, "main", 0, 10, &[Tag::Root], 1)];

        let result = coverage(&payloads, &registry);
        assert_eq!(result[0].script_id, 0);
        assert_eq!(result[0].url, "");
    }

    #[test]
    fn test_profile_assigns_one_id_per_handle() {
        let registry = ScriptRegistry::new();
        let source = Source::new("a.js", "file:///a.js");
        let mut arena = CallTreeArena::default();

        // A forest where both roots reference the same child handle. Tree
        // traversal normally never produces this shape; the visited-set must
        // still expand the shared node only once.
        let shared = arena.alloc(SampleNode::new(StackFrame::new(
            "shared",
            section(&source, 9, 90, 95),
        )));
        let a = arena.alloc(SampleNode::new(StackFrame::new(
            "a",
            section(&source, 1, 0, 10),
        )));
        let b = arena.alloc(SampleNode::new(StackFrame::new(
            "b",
            section(&source, 2, 20, 30),
        )));
        arena.get_mut(a).children.push(shared);
        arena.get_mut(b).children.push(shared);
        arena.get_mut(shared).self_hit_count = 4;

        let result = profile(&arena, &[a, b], 0, 0, 100, &registry);

        // (root), a, shared, b. The shared node is emitted exactly once.
        assert_eq!(result.nodes.len(), 4);
        assert_eq!(result.nodes[0].id, 1);
        assert_eq!(result.nodes[0].children, vec![2, 4]);
        assert_eq!(result.nodes[1].call_frame.function_name, "a");
        assert_eq!(result.nodes[1].children, vec![3]);
        assert_eq!(result.nodes[2].call_frame.function_name, "shared");
        assert_eq!(result.nodes[3].call_frame.function_name, "b");
        assert_eq!(result.nodes[3].children, vec![3]);
    }

    #[test]
    fn test_timeline_is_sorted_by_timestamp() {
        let registry = ScriptRegistry::new();
        let source = Source::new("a.js", "file:///a.js");
        let mut arena = CallTreeArena::default();

        let a = arena.alloc(SampleNode::new(StackFrame::new(
            "a",
            section(&source, 1, 0, 10),
        )));
        let b = arena.alloc(SampleNode::new(StackFrame::new(
            "b",
            section(&source, 2, 20, 30),
        )));
        arena.get_mut(a).self_hit_count = 2;
        arena.get_mut(a).self_hit_times.extend([50, 10]);
        arena.get_mut(b).self_hit_count = 1;
        arena.get_mut(b).self_hit_times.push(30);

        let result = profile(&arena, &[a, b], 0, 5, 100, &registry);

        // a = id 2, b = id 3; entries ordered 10, 30, 50.
        assert_eq!(result.samples, vec![2, 3, 2]);
        assert_eq!(result.time_deltas, vec![5, 20, 20]);
    }

    #[test]
    fn test_profile_resolves_call_frame_locations() {
        let mut registry = ScriptRegistry::new();
        let source = Source::new("a.js", "file:///a.js");
        registry.register(&source);
        let mut arena = CallTreeArena::default();
        let a = arena.alloc(SampleNode::new(StackFrame::new(
            "main",
            SourceSection::new(&source, 3, 7, 0, 10),
        )));
        arena.get_mut(a).self_hit_count = 1;

        let result = profile(&arena, &[a], 2, 0, 100, &registry);

        assert_eq!(result.nodes[0].hit_count, 2);
        let frame = &result.nodes[1].call_frame;
        assert_eq!(frame.function_name, "main");
        assert_eq!(frame.script_id, 1);
        assert_eq!(frame.url, "file:///a.js");
        assert_eq!(frame.line_number, 3);
        assert_eq!(frame.column_number, 7);
    }

    #[test]
    fn test_negative_idle_hit_count_is_not_clamped() {
        let registry = ScriptRegistry::new();
        let arena = CallTreeArena::default();

        let result = profile(&arena, &[], -3, 0, 100, &registry);
        assert_eq!(result.nodes[0].hit_count, -3);
    }

    #[test]
    fn test_untyped_sections_are_omitted_from_type_profile() {
        let mut registry = ScriptRegistry::new();
        let source = Source::new("a.js", "file:///a.js");
        registry.register(&source);

        let profiles = vec![
            SectionTypeProfile {
                section: section(&source, 1, 0, 12),
                types: vec![],
            },
            SectionTypeProfile {
                section: section(&source, 2, 20, 33),
                types: vec!["number".to_owned(), "string".to_owned()],
            },
        ];

        let result = type_profile(&profiles, &registry);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].entries.len(), 1);
        assert_eq!(result[0].entries[0].offset, 33);
        assert_eq!(
            result[0].entries[0].types,
            vec![
                TypeObject {
                    name: "number".to_owned()
                },
                TypeObject {
                    name: "string".to_owned()
                }
            ]
        );
    }
}
