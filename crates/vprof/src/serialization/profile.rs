//! Output data model. Field names follow the DevTools-protocol Profiler
//! domain so an inspector-protocol client can consume the encoded JSON
//! as-is.

/// An aggregated sampling profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub nodes: Vec<ProfileNode>,
    pub start_time: u64,
    pub end_time: u64,
    /// Node ids of the self-hit timeline, timestamp-ascending.
    pub samples: Vec<i64>,
    /// Per-entry delta from the previous timeline entry; the first entry is
    /// relative to `start_time`.
    pub time_deltas: Vec<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileNode {
    pub id: i64,
    pub call_frame: RuntimeCallFrame,
    pub hit_count: i64,
    pub children: Vec<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeCallFrame {
    pub function_name: String,
    pub script_id: u32,
    pub url: String,
    pub line_number: u32,
    pub column_number: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptCoverage {
    pub script_id: u32,
    pub url: String,
    pub functions: Vec<FunctionCoverage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCoverage {
    pub function_name: String,
    pub is_block_coverage: bool,
    pub ranges: Vec<CoverageRange>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRange {
    pub start_offset: usize,
    pub end_offset: usize,
    pub count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptTypeProfile {
    pub script_id: u32,
    pub url: String,
    pub entries: Vec<TypeProfileEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeProfileEntry {
    /// End character offset of the typed section.
    pub offset: usize,
    pub types: Vec<TypeObject>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeObject {
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileResult {
    pub profile: Profile,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoverageResult {
    pub result: Vec<ScriptCoverage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeProfileResult {
    pub result: Vec<ScriptTypeProfile>,
}

impl ProfileResult {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

impl CoverageResult {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}

impl TypeProfileResult {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}
