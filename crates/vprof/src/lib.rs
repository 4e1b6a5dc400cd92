extern crate serde;
#[macro_use]
extern crate serde_derive;

mod registry;
mod sampler;
mod serialization;
mod session;
mod source;
mod tracer;
mod type_handler;
mod util;

pub use crate::registry::{Script, ScriptRegistry};
pub use crate::sampler::{
    CallTreeArena, CpuSampler, NodeHandle, SampleNode, SamplingMode, SourceFilter, StackFrame,
};
pub use crate::serialization::profile::{
    CoverageRange, CoverageResult, FunctionCoverage, Profile, ProfileNode, ProfileResult,
    RuntimeCallFrame, ScriptCoverage, ScriptTypeProfile, TypeObject, TypeProfileEntry,
    TypeProfileResult,
};
pub use crate::session::configuration::{Configuration, Granularity};
pub use crate::session::{Profiler, SessionError};
pub use crate::source::{Source, SourceRef, SourceSection, Tag};
pub use crate::tracer::{CoverageTracer, TracePayload};
pub use crate::type_handler::{SectionTypeProfile, TypeHandler};
