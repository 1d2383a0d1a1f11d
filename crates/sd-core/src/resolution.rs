//! Identity resolution policy.
//!
//! An installed component finds its store and workstation numbers by
//! trying, in order:
//!
//! 1. explicit command-line values,
//! 2. the hostname, parsed with the configured pattern,
//! 3. the component's station file,
//! 4. an interactive prompt.
//!
//! The first stage that yields both a store and a numeric workstation wins.
//! An explicit environment value overrides whatever the winning stage
//! found. Generated fragments implement stage 3 inside the installer
//! script; this module runs the whole chain in-process.

use crate::station_file::StationFile;
use crate::tester::{is_valid_workstation_id, PatternTester};
use sd_config::{ComponentId, DetectionStore, Dialect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Stage that produced an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    CliArgument,
    Hostname,
    StationFile,
    Prompt,
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IdentitySource::CliArgument => "command-line argument",
            IdentitySource::Hostname => "hostname",
            IdentitySource::StationFile => "station file",
            IdentitySource::Prompt => "interactive prompt",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub store_id: String,
    pub workstation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub source: IdentitySource,
}

/// Values entered at the interactive prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptAnswer {
    pub store_id: String,
    pub workstation_id: String,
    pub environment: Option<String>,
}

/// Last-resort source of identity values.
pub trait IdentityPrompt {
    /// Ask for the identity of `component`. `None` means the user declined
    /// or no input is available.
    fn prompt(&mut self, component: ComponentId, with_environment: bool) -> Option<PromptAnswer>;
}

/// Prompt that never answers; used for non-interactive runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl IdentityPrompt for NoPrompt {
    fn prompt(&mut self, _component: ComponentId, _with_environment: bool) -> Option<PromptAnswer> {
        None
    }
}

/// Per-run inputs to [`resolve_identity`].
#[derive(Debug, Clone)]
pub struct ResolutionInputs {
    pub component: ComponentId,
    /// Dialect whose hostname pattern is applied.
    pub dialect: Dialect,
    pub cli_store: Option<String>,
    pub cli_workstation: Option<String>,
    pub cli_environment: Option<String>,
    pub hostname: Option<String>,
}

impl ResolutionInputs {
    pub fn new(component: ComponentId, dialect: Dialect) -> Self {
        Self {
            component,
            dialect,
            cli_store: None,
            cli_workstation: None,
            cli_environment: None,
            hostname: None,
        }
    }

    pub fn with_cli(mut self, store: Option<String>, workstation: Option<String>) -> Self {
        self.cli_store = store;
        self.cli_workstation = workstation;
        self
    }

    pub fn with_environment(mut self, environment: Option<String>) -> Self {
        self.cli_environment = environment;
        self
    }

    pub fn with_hostname(mut self, hostname: Option<String>) -> Self {
        self.hostname = hostname;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Stage had no input to work with.
    Skipped,
    /// Stage ran but did not produce a usable identity.
    Failed,
    Resolved,
}

/// Record of one stage of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStep {
    pub source: IdentitySource,
    pub outcome: StepOutcome,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// `None` when every stage was exhausted.
    pub identity: Option<ResolvedIdentity>,
    pub steps: Vec<ResolutionStep>,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        self.identity.is_some()
    }
}

struct Candidate {
    store_id: String,
    workstation_id: String,
    environment: Option<String>,
}

type StageResult = Result<Candidate, (StepOutcome, String)>;

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Run the resolution chain for one component.
///
/// Later stages do not run once an identity is found, so the prompt is
/// only consulted when everything else failed.
pub fn resolve_identity(
    store: &mut DetectionStore,
    inputs: &ResolutionInputs,
    prompt: &mut dyn IdentityPrompt,
) -> Resolution {
    let with_environment = store.is_environment_extraction_enabled();
    let mut steps = Vec::with_capacity(4);

    let stages = [
        IdentitySource::CliArgument,
        IdentitySource::Hostname,
        IdentitySource::StationFile,
        IdentitySource::Prompt,
    ];

    for source in stages {
        let result = match source {
            IdentitySource::CliArgument => from_cli(inputs),
            IdentitySource::Hostname => from_hostname(store, inputs),
            IdentitySource::StationFile => from_station_file(store, inputs.component, with_environment),
            IdentitySource::Prompt => from_prompt(prompt, inputs.component, with_environment),
        };

        match result {
            Ok(candidate) => {
                let environment =
                    non_empty(inputs.cli_environment.as_deref()).or(candidate.environment);
                info!(
                    component = %inputs.component,
                    %source,
                    store_id = %candidate.store_id,
                    workstation_id = %candidate.workstation_id,
                    "Station identity resolved"
                );
                steps.push(ResolutionStep {
                    source,
                    outcome: StepOutcome::Resolved,
                    detail: format!(
                        "StoreID={} WorkstationID={}",
                        candidate.store_id, candidate.workstation_id
                    ),
                });
                return Resolution {
                    identity: Some(ResolvedIdentity {
                        store_id: candidate.store_id,
                        workstation_id: candidate.workstation_id,
                        environment,
                        source,
                    }),
                    steps,
                };
            }
            Err((outcome, detail)) => {
                debug!(component = %inputs.component, %source, ?outcome, %detail, "Resolution stage did not resolve");
                steps.push(ResolutionStep {
                    source,
                    outcome,
                    detail,
                });
            }
        }
    }

    Resolution {
        identity: None,
        steps,
    }
}

fn from_cli(inputs: &ResolutionInputs) -> StageResult {
    let store = non_empty(inputs.cli_store.as_deref());
    let workstation = non_empty(inputs.cli_workstation.as_deref());
    match (store, workstation) {
        (None, None) => Err((StepOutcome::Skipped, "no values given".to_string())),
        (Some(store_id), Some(workstation_id)) => {
            if !is_valid_workstation_id(&workstation_id) {
                return Err((
                    StepOutcome::Failed,
                    format!("workstation '{}' is not numeric", workstation_id),
                ));
            }
            Ok(Candidate {
                store_id,
                workstation_id,
                environment: None,
            })
        }
        _ => Err((
            StepOutcome::Failed,
            "both store and workstation are required".to_string(),
        )),
    }
}

fn from_hostname(store: &DetectionStore, inputs: &ResolutionInputs) -> StageResult {
    let Some(hostname) = non_empty(inputs.hostname.as_deref()) else {
        return Err((StepOutcome::Skipped, "no hostname available".to_string()));
    };
    let pattern = store.get_hostname_regex(inputs.dialect);
    if pattern.is_empty() {
        return Err((
            StepOutcome::Skipped,
            format!("no {} hostname pattern configured", inputs.dialect),
        ));
    }

    let config = store.get_config();
    let result = PatternTester::from_policy(&config.hostname_detection).test(
        pattern,
        inputs.dialect,
        &hostname,
    );
    if !result.success {
        return Err((
            StepOutcome::Failed,
            result
                .error
                .unwrap_or_else(|| format!("hostname '{}' not usable", hostname)),
        ));
    }

    Ok(Candidate {
        store_id: result.store_number,
        workstation_id: result.workstation_id,
        environment: non_empty(result.environment.as_deref()),
    })
}

fn from_station_file(
    store: &mut DetectionStore,
    component: ComponentId,
    with_environment: bool,
) -> StageResult {
    if !store.is_file_detection_enabled() {
        return Err((StepOutcome::Skipped, "file detection disabled".to_string()));
    }
    let path = store.get_file_path(component);
    if path.is_empty() {
        return Err((StepOutcome::Skipped, "no station file configured".to_string()));
    }

    let file = match StationFile::read(Path::new(&path)) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err((StepOutcome::Failed, format!("station file not found: {}", path)))
        }
        Err(e) => return Err((StepOutcome::Failed, format!("cannot read {}: {}", path, e))),
    };

    match file.identity(with_environment) {
        Some(identity) => Ok(Candidate {
            store_id: identity.store_id,
            workstation_id: identity.workstation_id,
            environment: identity.environment,
        }),
        None => Err((
            StepOutcome::Failed,
            format!("station file {} has no valid StoreID/WorkstationID", path),
        )),
    }
}

fn from_prompt(
    prompt: &mut dyn IdentityPrompt,
    component: ComponentId,
    with_environment: bool,
) -> StageResult {
    let Some(answer) = prompt.prompt(component, with_environment) else {
        return Err((StepOutcome::Skipped, "no interactive input".to_string()));
    };
    let store_id = answer.store_id.trim().to_string();
    let workstation_id = answer.workstation_id.trim().to_string();
    if store_id.is_empty() || !is_valid_workstation_id(&workstation_id) {
        return Err((
            StepOutcome::Failed,
            "entered values are not a valid store/workstation".to_string(),
        ));
    }
    Ok(Candidate {
        store_id,
        workstation_id,
        environment: with_environment
            .then(|| non_empty(answer.environment.as_deref().map(str::trim)))
            .flatten(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Scripted(Option<PromptAnswer>, usize);

    impl IdentityPrompt for Scripted {
        fn prompt(&mut self, _component: ComponentId, _with_environment: bool) -> Option<PromptAnswer> {
            self.1 += 1;
            self.0.clone()
        }
    }

    fn store_with_file(dir: &TempDir, content: Option<&str>) -> DetectionStore {
        let mut store = DetectionStore::new(Dialect::Posix);
        store.set_base_directory(&dir.path().to_string_lossy());
        if let Some(content) = content {
            fs::write(dir.path().join("POS.station"), content).unwrap();
        }
        store
    }

    fn answer(store: &str, workstation: &str) -> PromptAnswer {
        PromptAnswer {
            store_id: store.to_string(),
            workstation_id: workstation.to_string(),
            environment: None,
        }
    }

    #[test]
    fn test_cli_overrides_everything() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_file(&dir, Some("StoreID=1111\nWorkstationID=1\n"));
        let inputs = ResolutionInputs::new(ComponentId::Pos, Dialect::Posix)
            .with_cli(Some("9999".into()), Some("42".into()))
            .with_hostname(Some("SHOP-1234-101".into()));
        let mut prompt = Scripted(Some(answer("5555", "5")), 0);

        let resolution = resolve_identity(&mut store, &inputs, &mut prompt);
        let identity = resolution.identity.unwrap();
        assert_eq!(identity.source, IdentitySource::CliArgument);
        assert_eq!(identity.store_id, "9999");
        assert_eq!(identity.workstation_id, "42");
        assert_eq!(resolution.steps.len(), 1);
        assert_eq!(prompt.1, 0);
    }

    #[test]
    fn test_hostname_before_file() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_file(&dir, Some("StoreID=1111\nWorkstationID=1\n"));
        let inputs = ResolutionInputs::new(ComponentId::Pos, Dialect::Posix)
            .with_hostname(Some("SHOP-1234-101".into()));

        let resolution = resolve_identity(&mut store, &inputs, &mut NoPrompt);
        let identity = resolution.identity.unwrap();
        assert_eq!(identity.source, IdentitySource::Hostname);
        assert_eq!(identity.store_id, "1234");
        assert_eq!(identity.workstation_id, "101");
        assert_eq!(resolution.steps[0].outcome, StepOutcome::Skipped);
    }

    #[test]
    fn test_file_fallback_when_hostname_does_not_match() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_file(&dir, Some("StoreID=1111\r\nWorkstationID=7\r\n"));
        let inputs = ResolutionInputs::new(ComponentId::Pos, Dialect::Posix)
            .with_hostname(Some("buildhost".into()));

        let resolution = resolve_identity(&mut store, &inputs, &mut NoPrompt);
        let identity = resolution.identity.unwrap();
        assert_eq!(identity.source, IdentitySource::StationFile);
        assert_eq!(identity.store_id, "1111");
        assert_eq!(identity.workstation_id, "7");
        assert_eq!(resolution.steps[1].outcome, StepOutcome::Failed);
    }

    #[test]
    fn test_prompt_is_last_resort() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_file(&dir, None);
        let inputs = ResolutionInputs::new(ComponentId::Pos, Dialect::Posix);
        let mut prompt = Scripted(Some(answer(" 0042 ", "3")), 0);

        let resolution = resolve_identity(&mut store, &inputs, &mut prompt);
        let identity = resolution.identity.unwrap();
        assert_eq!(identity.source, IdentitySource::Prompt);
        assert_eq!(identity.store_id, "0042");
        assert_eq!(prompt.1, 1);
        assert!(resolution.steps[2].detail.contains("not found"));
    }

    #[test]
    fn test_unresolved_without_prompt() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_file(&dir, Some("StoreID=1111\nWorkstationID=abc\n"));
        let inputs = ResolutionInputs::new(ComponentId::Pos, Dialect::Posix)
            .with_cli(Some("1234".into()), None);

        let resolution = resolve_identity(&mut store, &inputs, &mut NoPrompt);
        assert!(!resolution.is_resolved());
        let outcomes: Vec<_> = resolution.steps.iter().map(|s| s.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                StepOutcome::Failed,
                StepOutcome::Skipped,
                StepOutcome::Failed,
                StepOutcome::Skipped
            ]
        );
    }

    #[test]
    fn test_cli_environment_overrides_stage_environment() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_file(&dir, None);
        store.set_environment_extraction(true);
        let inputs = ResolutionInputs::new(ComponentId::Pos, Dialect::Posix)
            .with_hostname(Some("QA1234-101".into()));

        let resolution = resolve_identity(&mut store, &inputs, &mut NoPrompt);
        assert_eq!(
            resolution.identity.unwrap().environment.as_deref(),
            Some("QA")
        );

        let inputs = inputs.with_environment(Some("PROD".into()));
        let resolution = resolve_identity(&mut store, &inputs, &mut NoPrompt);
        assert_eq!(
            resolution.identity.unwrap().environment.as_deref(),
            Some("PROD")
        );
    }

    #[test]
    fn test_disabled_file_detection_skips_file_stage() {
        let dir = TempDir::new().unwrap();
        let mut store = store_with_file(&dir, Some("StoreID=1111\nWorkstationID=1\n"));
        store.enable_file_detection(false);
        let inputs = ResolutionInputs::new(ComponentId::Pos, Dialect::Posix);

        let resolution = resolve_identity(&mut store, &inputs, &mut NoPrompt);
        assert!(!resolution.is_resolved());
        assert_eq!(resolution.steps[2].outcome, StepOutcome::Skipped);
    }
}
