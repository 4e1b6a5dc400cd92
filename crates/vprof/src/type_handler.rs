use crate::source::SourceSection;

/// Observed runtime types for one call site.
#[derive(Debug)]
pub struct SectionTypeProfile {
    pub section: SourceSection,
    pub types: Vec<String>,
}

/// The observed-type producer. A call site shows up once it is visited;
/// distinct type names accumulate in first-seen order.
#[derive(Debug)]
pub struct TypeHandler {
    collecting: bool,
    profiles: Vec<SectionTypeProfile>,
}

impl TypeHandler {
    pub fn new() -> Self {
        Self {
            collecting: false,
            profiles: vec![],
        }
    }

    pub fn start(&mut self) {
        self.collecting = true;
    }

    pub fn stop(&mut self) {
        self.collecting = false;
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting
    }

    /// Registers a visited call site, even if no type is ever observed there.
    pub fn record_section(&mut self, section: &SourceSection) {
        if !self.collecting {
            return;
        }
        self.profile_for(section);
    }

    /// Registers one observed type at a call site. Duplicate names are kept
    /// once.
    pub fn record_type(&mut self, section: &SourceSection, type_name: &str) {
        if !self.collecting {
            return;
        }
        let profile = self.profile_for(section);
        if !profile.types.iter().any(|t| t == type_name) {
            profile.types.push(type_name.to_owned());
        }
    }

    fn profile_for(&mut self, section: &SourceSection) -> &mut SectionTypeProfile {
        let index = match self.profiles.iter().position(|p| p.section == *section) {
            Some(index) => index,
            None => {
                self.profiles.push(SectionTypeProfile {
                    section: section.clone(),
                    types: vec![],
                });
                self.profiles.len() - 1
            }
        };
        &mut self.profiles[index]
    }

    pub fn section_type_profiles(&self) -> &[SectionTypeProfile] {
        &self.profiles
    }

    pub fn clear_data(&mut self) {
        self.profiles.clear();
    }
}

impl Default for TypeHandler {
    fn default() -> Self {
        Self::new()
    }
}
