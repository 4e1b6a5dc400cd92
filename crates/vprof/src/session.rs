pub mod configuration;

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use self::configuration::{Configuration, Granularity};
use crate::registry::ScriptRegistry;
use crate::sampler::{CpuSampler, SamplingMode, SourceFilter};
use crate::serialization::profile::{CoverageResult, ProfileResult, TypeProfileResult};
use crate::serialization::serializer;
use crate::tracer::CoverageTracer;
use crate::type_handler::TypeHandler;
use crate::util::now_millis;

#[derive(Debug, PartialEq)]
pub enum SessionError {
    /// An operation was invoked before `enable()` (or after `disable()`).
    /// Callers are required to track the enabled state themselves.
    NotEnabled,
    /// A producer lock was poisoned by a panicking observation thread.
    LockPoisoned,
}

/// The profiler session controller. Owns the three event producers for the
/// session's lifetime and drains each of them exactly once per take/stop,
/// inside that producer's lock, so no event can land between snapshot and
/// clear.
pub struct Profiler {
    configuration: Configuration,
    registry: Arc<RwLock<ScriptRegistry>>,
    sampler: Option<Arc<Mutex<CpuSampler>>>,
    tracer: Option<Arc<Mutex<CoverageTracer>>>,
    type_handler: Option<Arc<Mutex<TypeHandler>>>,
    start_timestamp: u64,
    old_gather_self_hit_times: bool,
}

impl Profiler {
    pub fn new(registry: Arc<RwLock<ScriptRegistry>>) -> Self {
        Self::with_configuration(registry, Configuration::default())
    }

    pub fn with_configuration(
        registry: Arc<RwLock<ScriptRegistry>>,
        configuration: Configuration,
    ) -> Self {
        Self {
            configuration,
            registry,
            sampler: None,
            tracer: None,
            type_handler: None,
            start_timestamp: 0,
            old_gather_self_hit_times: false,
        }
    }

    fn do_enable(&mut self) {
        #[cfg(feature = "debug")]
        {
            let _ = env_logger::builder()
                .format_timestamp(None)
                .format_module_path(false)
                .try_init();
        }

        let mut sampler = CpuSampler::new();
        sampler.set_period(self.configuration.sampling_interval.as_millis().max(1) as u64);
        self.sampler = Some(Arc::new(Mutex::new(sampler)));
        self.tracer = Some(Arc::new(Mutex::new(CoverageTracer::new())));
        self.type_handler = Some(Arc::new(Mutex::new(TypeHandler::new())));
    }

    pub fn enable(&mut self) {
        if self.sampler.is_none() {
            self.do_enable();
        }
    }

    pub fn disable(&mut self) {
        if self.sampler.is_some() {
            self.sampler = None;
            self.tracer = None;
            self.type_handler = None;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sampler.is_some()
    }

    pub fn registry(&self) -> Arc<RwLock<ScriptRegistry>> {
        Arc::clone(&self.registry)
    }

    /// Handle for the observation side to append call-stack samples.
    pub fn sampler(&self) -> Result<Arc<Mutex<CpuSampler>>, SessionError> {
        self.sampler
            .as_ref()
            .map(Arc::clone)
            .ok_or(SessionError::NotEnabled)
    }

    /// Handle for the observation side to append coverage hits.
    pub fn tracer(&self) -> Result<Arc<Mutex<CoverageTracer>>, SessionError> {
        self.tracer
            .as_ref()
            .map(Arc::clone)
            .ok_or(SessionError::NotEnabled)
    }

    /// Handle for the observation side to append observed types.
    pub fn type_handler(&self) -> Result<Arc<Mutex<TypeHandler>>, SessionError> {
        self.type_handler
            .as_ref()
            .map(Arc::clone)
            .ok_or(SessionError::NotEnabled)
    }

    /// Sampling interval in microseconds; anything below 1000 clamps to a
    /// 1ms period.
    pub fn set_sampling_interval(&self, interval_us: u64) -> Result<(), SessionError> {
        let handle = self.sampler()?;
        let mut sampler = lock(&handle)?;
        sampler.set_period((interval_us / 1000).max(1));
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.start_at(now_millis())
    }

    fn start_at(&mut self, timestamp: u64) -> Result<(), SessionError> {
        let handle = self.sampler()?;
        {
            let mut sampler = lock(&handle)?;
            self.old_gather_self_hit_times = sampler.is_gather_self_hit_times();
            sampler.set_gather_self_hit_times(true);
            sampler.set_mode(SamplingMode::Roots);
            sampler.set_filter(SourceFilter {
                include_internal: self.configuration.include_internal_sources,
            });
            sampler.set_collecting(true);
        }
        self.start_timestamp = timestamp;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<ProfileResult, SessionError> {
        self.stop_at(now_millis())
    }

    fn stop_at(&mut self, end_timestamp: u64) -> Result<ProfileResult, SessionError> {
        let handle = self.sampler()?;
        let mut sampler = lock(&handle)?;
        sampler.set_collecting(false);
        sampler.set_gather_self_hit_times(self.old_gather_self_hit_times);
        let elapsed = end_timestamp.saturating_sub(self.start_timestamp);
        // The sampler may have recorded more samples than the nominal period
        // allows for; the idle hit count then goes negative and is reported
        // as-is.
        let idle_hit_count =
            (elapsed / sampler.period()) as i64 - sampler.sample_count() as i64;
        log::debug!("Number of samples: {}", sampler.sample_count());
        let registry = self
            .registry
            .read()
            .map_err(|_| SessionError::LockPoisoned)?;
        let profile = serializer::profile(
            sampler.arena(),
            sampler.root_nodes(),
            idle_hit_count,
            self.start_timestamp,
            end_timestamp,
            &registry,
        );
        drop(registry);
        sampler.clear_data();
        Ok(ProfileResult { profile })
    }

    /// `call_count` is part of the inspector-protocol surface but carries no
    /// meaning here: hit counts are always collected.
    pub fn start_precise_coverage(
        &self,
        _call_count: bool,
        detailed: bool,
    ) -> Result<(), SessionError> {
        let handle = self.tracer()?;
        let mut tracer = lock(&handle)?;
        tracer.set_granularity(if detailed {
            Granularity::Statement
        } else {
            Granularity::Root
        });
        tracer.set_collecting(true);
        Ok(())
    }

    pub fn stop_precise_coverage(&self) -> Result<(), SessionError> {
        let handle = self.tracer()?;
        let mut tracer = lock(&handle)?;
        tracer.set_collecting(false);
        tracer.clear_data();
        Ok(())
    }

    pub fn take_precise_coverage(&self) -> Result<CoverageResult, SessionError> {
        self.take_coverage()
    }

    pub fn get_best_effort_coverage(&self) -> Result<CoverageResult, SessionError> {
        self.take_coverage()
    }

    fn take_coverage(&self) -> Result<CoverageResult, SessionError> {
        let handle = self.tracer()?;
        let mut tracer = lock(&handle)?;
        let registry = self
            .registry
            .read()
            .map_err(|_| SessionError::LockPoisoned)?;
        let result = serializer::coverage(tracer.payloads(), &registry);
        drop(registry);
        tracer.clear_data();
        Ok(CoverageResult { result })
    }

    pub fn start_type_profile(&self) -> Result<(), SessionError> {
        let handle = self.type_handler()?;
        lock(&handle)?.start();
        Ok(())
    }

    pub fn stop_type_profile(&self) -> Result<(), SessionError> {
        let handle = self.type_handler()?;
        let mut type_handler = lock(&handle)?;
        type_handler.stop();
        type_handler.clear_data();
        Ok(())
    }

    /// Drains collected type data without stopping collection.
    pub fn take_type_profile(&self) -> Result<TypeProfileResult, SessionError> {
        let handle = self.type_handler()?;
        let mut type_handler = lock(&handle)?;
        let registry = self
            .registry
            .read()
            .map_err(|_| SessionError::LockPoisoned)?;
        let result = serializer::type_profile(type_handler.section_type_profiles(), &registry);
        drop(registry);
        type_handler.clear_data();
        Ok(TypeProfileResult { result })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, SessionError> {
    mutex.lock().map_err(|_| SessionError::LockPoisoned)
}
