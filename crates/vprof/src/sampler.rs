use crate::source::SourceSection;

/// One call-frame identity in a sampled stack: a root (function) name plus
/// the section where it is declared.
#[derive(Debug, Clone, PartialEq)]
pub struct StackFrame {
    pub root_name: String,
    pub section: SourceSection,
}

impl StackFrame {
    pub fn new(root_name: &str, section: SourceSection) -> Self {
        Self {
            root_name: root_name.to_owned(),
            section,
        }
    }
}

/// Index of a `SampleNode` inside its arena. Handles are never reused within
/// one collection window; `clear_data()` invalidates all of them at once.
pub type NodeHandle = usize;

/// One node of the merged call tree.
#[derive(Debug)]
pub struct SampleNode {
    pub frame: StackFrame,
    pub self_hit_count: i64,
    pub self_hit_times: Vec<u64>,
    pub children: Vec<NodeHandle>,
}

impl SampleNode {
    pub fn new(frame: StackFrame) -> Self {
        Self {
            frame,
            self_hit_count: 0,
            self_hit_times: vec![],
            children: vec![],
        }
    }
}

/// Arena holding the merged call tree. Nodes address each other by handle,
/// so structurally identical frames reached over different call paths stay
/// distinct nodes.
#[derive(Debug, Default)]
pub struct CallTreeArena {
    nodes: Vec<SampleNode>,
}

impl CallTreeArena {
    pub fn alloc(&mut self, node: SampleNode) -> NodeHandle {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get(&self, handle: NodeHandle) -> &SampleNode {
        &self.nodes[handle]
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> &mut SampleNode {
        &mut self.nodes[handle]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingMode {
    Roots,
    Statements,
}

/// Which frames the sampler keeps out of recorded stacks.
#[derive(Debug, Clone, Copy)]
pub struct SourceFilter {
    pub include_internal: bool,
}

impl SourceFilter {
    fn accepts(&self, frame: &StackFrame) -> bool {
        self.include_internal || !frame.section.source.internal
    }
}

/// The call-stack sample producer. Observation threads merge captured stacks
/// into the arena via `record_sample`; the session drains the whole tree at
/// `stop()`. Callers are expected to hold this behind a `Mutex` so that a
/// drain's read+clear cannot interleave with an append.
#[derive(Debug)]
pub struct CpuSampler {
    collecting: bool,
    gather_self_hit_times: bool,
    period_ms: u64,
    mode: SamplingMode,
    filter: SourceFilter,
    arena: CallTreeArena,
    roots: Vec<NodeHandle>,
    sample_count: u64,
}

impl CpuSampler {
    pub fn new() -> Self {
        Self {
            collecting: false,
            gather_self_hit_times: false,
            period_ms: 1,
            mode: SamplingMode::Roots,
            filter: SourceFilter {
                include_internal: true,
            },
            arena: CallTreeArena::default(),
            roots: vec![],
            sample_count: 0,
        }
    }

    pub fn set_collecting(&mut self, collecting: bool) {
        self.collecting = collecting;
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    pub fn set_gather_self_hit_times(&mut self, gather: bool) {
        self.gather_self_hit_times = gather;
    }

    pub fn is_gather_self_hit_times(&self) -> bool {
        self.gather_self_hit_times
    }

    /// Sampling period in milliseconds; clamped to >= 1.
    pub fn set_period(&mut self, period_ms: u64) {
        self.period_ms = period_ms.max(1);
    }

    pub fn period(&self) -> u64 {
        self.period_ms
    }

    pub fn set_mode(&mut self, mode: SamplingMode) {
        self.mode = mode;
    }

    /// Capture granularity for the observation side.
    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    pub fn set_filter(&mut self, filter: SourceFilter) {
        self.filter = filter;
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn arena(&self) -> &CallTreeArena {
        &self.arena
    }

    pub fn root_nodes(&self) -> &[NodeHandle] {
        &self.roots
    }

    /// Merges one captured stack (shallow to deep) into the call tree and
    /// attributes a self hit to the leaf. Frames rejected by the filter are
    /// dropped; a stack that filters down to nothing is not counted.
    pub fn record_sample(&mut self, stack: &[StackFrame], timestamp: u64) {
        if !self.collecting {
            return;
        }
        let filter = self.filter;
        let mut handle: Option<NodeHandle> = None;
        for frame in stack.iter().filter(|frame| filter.accepts(frame)) {
            let siblings = match handle {
                None => &self.roots,
                Some(parent) => &self.arena.get(parent).children,
            };
            let existing = siblings
                .iter()
                .copied()
                .find(|&h| self.arena.get(h).frame == *frame);
            let next = match existing {
                Some(h) => h,
                None => {
                    let h = self.arena.alloc(SampleNode::new(frame.clone()));
                    match handle {
                        None => self.roots.push(h),
                        Some(parent) => self.arena.get_mut(parent).children.push(h),
                    }
                    h
                }
            };
            handle = Some(next);
        }
        let Some(leaf) = handle else {
            log::trace!("Sample filtered down to an empty stack. Dropping.");
            return;
        };
        let node = self.arena.get_mut(leaf);
        node.self_hit_count += 1;
        if self.gather_self_hit_times {
            node.self_hit_times.push(timestamp);
        }
        self.sample_count += 1;
    }

    pub fn clear_data(&mut self) {
        self.arena.clear();
        self.roots.clear();
        self.sample_count = 0;
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}
