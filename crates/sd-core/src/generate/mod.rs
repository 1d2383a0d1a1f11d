//! Station-file fallback fragment generation.
//!
//! Renders the file-based detection step for one component into a block
//! of script text for each dialect. Both renderings implement the same
//! behaviour:
//!
//! - skip everything when the enclosing script already resolved the
//!   identity (`IDENTITY_RESOLVED` / `$script:IdentityResolved`);
//! - report and stop when the station file is missing;
//! - otherwise read `StoreID=`, `WorkstationID=` (and, with
//!   multi-environment support, `Environment=`) line prefixes;
//! - publish the identity and set the resolved flag only when a store value
//!   and a numeric workstation value were found.
//!
//! Generation is pure string construction. Its only inputs are the station
//! file path and the detection toggles; hostname patterns are handled by a
//! separate stage of the installer script.

mod posix;
mod windows;

use sd_config::{ComponentId, DetectionStore, Dialect};
use serde::Serialize;
use tracing::debug;

/// Generated script text for one component and dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub component: ComponentId,
    pub dialect: Dialect,
    /// Script text, or empty when file detection does not apply.
    pub text: String,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Values a fragment is rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FragmentPlan {
    pub component: ComponentId,
    pub station_file: String,
    pub multi_environment: bool,
}

/// Render the station-file fallback for `component` in `dialect`.
///
/// Returns an empty fragment when file detection is disabled or no station
/// file path is configured. Resolving the path may assign the default base
/// directory in `store` (see [`DetectionStore::get_file_path`]).
pub fn generate(store: &mut DetectionStore, component: ComponentId, dialect: Dialect) -> Fragment {
    let text = match plan(store, component) {
        Some(plan) => match dialect {
            Dialect::Posix => posix::render(&plan),
            Dialect::Windows => windows::render(&plan),
        },
        None => String::new(),
    };

    Fragment {
        component,
        dialect,
        text,
    }
}

/// Render both dialects for a component, POSIX first.
pub fn generate_all(store: &mut DetectionStore, component: ComponentId) -> [Fragment; 2] {
    Dialect::ALL.map(|dialect| generate(&mut *store, component, dialect))
}

fn plan(store: &mut DetectionStore, component: ComponentId) -> Option<FragmentPlan> {
    if !store.is_file_detection_enabled() {
        debug!(%component, "File detection disabled; emitting empty fragment");
        return None;
    }

    let station_file = store.get_file_path(component);
    if station_file.is_empty() {
        debug!(%component, "No station file configured; emitting empty fragment");
        return None;
    }

    Some(FragmentPlan {
        component,
        station_file,
        multi_environment: store.is_environment_extraction_enabled(),
    })
}
