//! Planner sessions.
//!
//! A [`PlannerSession`] owns everything the resolver consults: options, the capability snapshot,
//! the forced strategy, recorded per-size decisions and the wisdom cache. Every field sits behind
//! its own read/write lock, so a session can be shared freely between threads. Most callers use
//! [`PlannerSession::global`].
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::OnceLock;

use log::{debug, warn};
use parking_lot::RwLock;

use crate::capabilities::CapabilityVector;
use crate::options::PlannerOptions;
use crate::precision::Precision;
use crate::strategy::{
    apply_forced, apply_hint, heuristic_family, AlgorithmFamily, DecisionSource, ForcedStrategy,
    Resolution,
};
use crate::wisdom::{WisdomCache, WisdomError, WisdomKey};

static GLOBAL_SESSION: OnceLock<PlannerSession> = OnceLock::new();

#[derive(Debug)]
pub struct PlannerSession {
    options: PlannerOptions,
    detected: CapabilityVector,
    capabilities: RwLock<CapabilityVector>,
    forced: RwLock<ForcedStrategy>,
    decisions: RwLock<HashMap<usize, AlgorithmFamily>>,
    wisdom: WisdomCache,
}

impl Default for PlannerSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlannerSession {
    /// The lazily created process-wide session
    pub fn global() -> &'static PlannerSession {
        GLOBAL_SESSION.get_or_init(PlannerSession::new)
    }

    /// A session with default options and the detected capabilities of this CPU
    pub fn new() -> Self {
        Self::with_options(PlannerOptions::default())
    }

    pub fn with_options(options: PlannerOptions) -> Self {
        let detected = CapabilityVector::detect();
        debug!("planner session created with capabilities {detected:?}");

        Self {
            options,
            detected,
            capabilities: RwLock::new(detected),
            forced: RwLock::new(ForcedStrategy::Auto),
            decisions: RwLock::new(HashMap::new()),
            wisdom: WisdomCache::new(),
        }
    }

    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// Current capability snapshot
    pub fn capabilities(&self) -> CapabilityVector {
        *self.capabilities.read()
    }

    /// Replace the capability snapshot, e.g. to test a lower tier on capable hardware.
    pub fn override_capabilities(&self, capabilities: CapabilityVector) {
        *self.capabilities.write() = capabilities;
    }

    /// Go back to the detected capabilities.
    pub fn reset_capabilities(&self) {
        *self.capabilities.write() = self.detected;
    }

    pub fn set_forced_strategy(&self, forced: impl Into<ForcedStrategy>) {
        let forced = forced.into();
        debug!("forced strategy set to {forced:?}");
        *self.forced.write() = forced;
    }

    pub fn forced_strategy(&self) -> ForcedStrategy {
        *self.forced.read()
    }

    /// Pin `size` to `family`, overriding wisdom and heuristics.
    pub fn record_decision(&self, size: usize, family: AlgorithmFamily) {
        self.decisions.write().insert(size, family);
    }

    pub fn recorded_decision(&self, size: usize) -> Option<AlgorithmFamily> {
        self.decisions.read().get(&size).copied()
    }

    pub fn clear_decisions(&self) {
        self.decisions.write().clear();
    }

    pub fn wisdom(&self) -> &WisdomCache {
        &self.wisdom
    }

    /// Wisdom key of `size` at `precision` under the current capabilities
    pub fn wisdom_key(&self, size: usize, precision: Precision) -> WisdomKey {
        WisdomKey {
            size,
            precision,
            capability_mask: self.capabilities().mask(),
        }
    }

    /// Record `family` as the measured best for `size` at `precision`.
    pub fn store_wisdom(&self, size: usize, precision: Precision, family: AlgorithmFamily) {
        self.wisdom.record(self.wisdom_key(size, precision), family.name());
    }

    pub fn export_wisdom<P: AsRef<Path>>(&self, path: P) -> Result<(), WisdomError> {
        self.wisdom.export(path)
    }

    pub fn import_wisdom<P: AsRef<Path>>(&self, path: P) -> Result<usize, WisdomError> {
        self.wisdom.import(path)
    }

    pub fn export_wisdom_to_writer<W: Write>(&self, writer: W) -> Result<(), WisdomError> {
        self.wisdom.export_to_writer(writer)
    }

    pub fn import_wisdom_from_reader<R: Read>(&self, reader: R) -> Result<usize, WisdomError> {
        self.wisdom.import_from_reader(reader)
    }

    /// Direct for small sizes, recursive otherwise.
    pub fn fallback_family(&self, size: usize) -> AlgorithmFamily {
        crate::strategy::fallback_family(size, &self.options)
    }

    /// Family serving `size` at `precision`.
    pub fn resolve(&self, size: usize, precision: Precision) -> AlgorithmFamily {
        self.resolve_with_source(size, precision).family
    }

    /// Like [`Self::resolve`], also reporting which layer decided.
    ///
    /// Precedence: forced strategy, recorded decision, wisdom, heuristics. Forced families that
    /// cannot serve `size` (or sizes below the direct threshold) fall back to
    /// [`Self::fallback_family`], as do inapplicable recorded decisions and wisdom hints.
    pub fn resolve_with_source(&self, size: usize, precision: Precision) -> Resolution {
        let resolution = self.resolve_uncached(size, precision);
        debug!(
            "resolved size {size} ({precision}) to {} from {:?}",
            resolution.family, resolution.source
        );
        resolution
    }

    fn resolve_uncached(&self, size: usize, precision: Precision) -> Resolution {
        if let ForcedStrategy::Family(family) = self.forced_strategy() {
            return Resolution {
                family: apply_forced(family, size, &self.options),
                source: DecisionSource::Forced,
            };
        }

        if let Some(family) = self.recorded_decision(size) {
            return Resolution {
                family: apply_hint(family, size, &self.options),
                source: DecisionSource::Recorded,
            };
        }

        if let Some(entry) = self.wisdom.lookup(&self.wisdom_key(size, precision)) {
            match entry.algorithm.parse::<AlgorithmFamily>() {
                Ok(family) => {
                    return Resolution {
                        family: apply_hint(family, size, &self.options),
                        source: DecisionSource::Wisdom,
                    }
                }
                Err(err) => warn!("ignoring wisdom for size {size}: {err}"),
            }
        }

        Resolution {
            family: heuristic_family(size, &self.options),
            source: DecisionSource::Heuristic,
        }
    }
}
