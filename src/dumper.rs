// CLASSIFICATION: COMMUNITY
// Filename: dumper.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

//! Reboot dumper context.
//!
//! One [`RebootDumper`] is built during early init and handed to every host
//! callback (fault delivery, OOM and reboot notifiers, the query node).

use std::fs;
use std::sync::Arc;

use log::{debug, error, warn};

use crate::capture::{CaptureCoordinator, CaptureOutcome, CaptureResult, Collaborators, FaultEvent};
use crate::config::{ConfigError, DumperConfig};
use crate::query::{self, FaultInjector, InjectedOops, QueryError, QuerySurface};
use crate::register::store::RegisterStore;
use crate::register::{DecodedHistory, ReasonCode};
use crate::tracker::{RebootTracker, TrackerResult};

pub struct RebootDumper {
    config: DumperConfig,
    tracker: Arc<RebootTracker>,
    coordinator: CaptureCoordinator,
}

impl RebootDumper {
    /// Validate `config`, shift the register for this boot and prepare the
    /// capture path.
    pub fn init(
        config: DumperConfig,
        store: Box<dyn RegisterStore>,
        collaborators: Collaborators,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if let Err(err) = fs::create_dir_all(&config.artifact_dir) {
            warn!(
                "cannot create artifact dir {}: {err}; captures may fail",
                config.artifact_dir.display()
            );
        }
        let tracker = Arc::new(RebootTracker::init(store, config.register_offset));
        let coordinator = CaptureCoordinator::new(Arc::clone(&tracker), collaborators, &config);
        Ok(Self {
            config,
            tracker,
            coordinator,
        })
    }

    pub fn config(&self) -> &DumperConfig {
        &self.config
    }

    pub fn tracker(&self) -> &RebootTracker {
        &self.tracker
    }

    pub fn coordinator(&self) -> &CaptureCoordinator {
        &self.coordinator
    }

    pub fn on_fault(&self, event: FaultEvent) -> CaptureResult<CaptureOutcome> {
        self.coordinator.on_fault(event)
    }

    pub fn on_oom(&self) -> CaptureResult<()> {
        self.coordinator.on_oom()
    }

    pub fn on_reboot(&self) -> CaptureResult<()> {
        self.coordinator.on_reboot()
    }

    /// Record a reason from platform code, e.g. before arming the watchdog.
    pub fn record(&self, reason: ReasonCode) -> TrackerResult<()> {
        self.tracker.record_reason(reason)
    }

    pub fn history(&self) -> TrackerResult<DecodedHistory> {
        self.tracker.query_history()
    }

    /// History as shown on the query surface; `NoHistory` on any failure.
    pub fn render_history(&self) -> Result<String, QueryError> {
        query::read_history(&self.tracker)
    }

    pub fn query_surface<'a>(&'a self, injector: &'a dyn FaultInjector) -> QuerySurface<'a> {
        QuerySurface::new(&self.tracker, injector)
    }
}

/// Route process panics through the dumper, then run the previous hook.
///
/// The panic message is logged first so it lands in the captured text. A
/// panic carrying [`InjectedOops`] is delivered as an oops.
pub fn install_panic_hook(dumper: Arc<RebootDumper>) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let event = if info.payload().is::<InjectedOops>() {
            let location = info.location().map(ToString::to_string).unwrap_or_default();
            error!("kernel oops: injected fault at {location}");
            FaultEvent::Oops
        } else {
            error!("kernel panic: {info}");
            FaultEvent::Panic
        };
        match dumper.on_fault(event) {
            Ok(outcome) => debug!("{event:?} capture: {outcome:?}"),
            Err(err) => debug!("{event:?} capture skipped: {err}"),
        }
        previous(info);
    }));
}
