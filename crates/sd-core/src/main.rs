//! Station Detect - identity detection settings and script fragments
//!
//! The entry point for `sd`, handling:
//! - Editing the `detection_config` section of the installer settings
//! - Checking hostname patterns against the POSIX ERE and .NET engines
//! - Generating station-file fallback fragments for installer scripts
//! - Inspecting station files and running the identity resolution chain

use clap::{Args, Parser, Subcommand};
use sd_config::validate::validate_detection;
use sd_config::{
    resolve_settings, ComponentId, ConfigError, ConfigLocation, DetectionStore, Dialect,
    GroupField, PersistedDocument,
};
use sd_core::dialect::engine_name;
use sd_core::error::{CoreError, Result};
use sd_core::exit_codes::ExitCode;
use sd_core::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use sd_core::output::OutputFormat;
use sd_core::resolution::{
    resolve_identity, IdentityPrompt, NoPrompt, PromptAnswer, ResolutionInputs,
};
use sd_core::station_file::StationFile;
use sd_core::tester::{PatternTestResult, PatternTester, TestFailure};
use sd_core::{generate, validate_for_dialect, Fragment};
use serde_json::json;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Station Detect - configure and test store/workstation identity detection
#[derive(Parser)]
#[command(name = "sd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Settings file (defaults to SD_CONFIG, SD_CONFIG_DIR or the XDG config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Log level for stderr (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format for stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Platform the installer is configured for (windows, linux); defaults to this host
    #[arg(long, global = true)]
    target: Option<Dialect>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or edit the detection settings
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Check whether a pattern can run under a dialect's regex engine
    Validate(ValidateArgs),

    /// Test hostname patterns against a sample hostname
    Test(TestArgs),

    /// Print the station-file fallback fragment for a component
    Generate(GenerateArgs),

    /// Station file utilities
    #[command(subcommand)]
    Station(StationCommand),

    /// Resolve the station identity: CLI values, hostname, station file, prompt
    Resolve(ResolveArgs),
}

// ============================================================================
// Command argument structs
// ============================================================================

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective detection settings
    Show,

    /// Set the explicit station file path for a component
    SetPath { component: String, path: String },

    /// Set the station filename used under the base directory
    SetFilename { component: String, filename: String },

    /// Set the base directory holding station files
    SetBaseDir { directory: String },

    /// Use base directory + filename (true) or explicit per-component paths (false)
    UseBaseDir {
        #[arg(action = clap::ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        enabled: bool,
    },

    /// Enable or disable station file detection
    FileDetection {
        #[arg(action = clap::ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        enabled: bool,
    },

    /// Set the hostname pattern for a dialect
    SetRegex { dialect: Dialect, pattern: String },

    /// Set the capture group for a field (env, store, workstation)
    SetMapping { field: GroupField, index: usize },

    /// Enable or disable environment extraction from the hostname
    EnvExtraction {
        #[arg(action = clap::ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        enabled: bool,
    },

    /// Set the sample hostname used by `sd test`
    SetTestHostname { value: String },
}

#[derive(Args, Debug)]
struct ValidateArgs {
    dialect: Dialect,
    pattern: String,
}

#[derive(Args, Debug)]
struct TestArgs {
    /// Only test this dialect (default: both)
    #[arg(long)]
    dialect: Option<Dialect>,

    /// Pattern to test instead of the configured one
    #[arg(long)]
    pattern: Option<String>,

    /// Sample hostname instead of the configured one
    #[arg(long)]
    hostname: Option<String>,

    /// Apply store/workstation shape rules for both dialects
    #[arg(long)]
    strict: bool,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    component: ComponentId,

    /// Dialect to render (default: both)
    dialect: Option<Dialect>,
}

#[derive(Subcommand, Debug)]
enum StationCommand {
    /// Parse a station file and show the identity a fragment would resolve
    Inspect {
        file: PathBuf,

        /// Report the Environment value even when extraction is disabled
        #[arg(long)]
        environment: bool,
    },
}

#[derive(Args, Debug)]
struct ResolveArgs {
    /// Component whose station file is consulted
    #[arg(long, default_value = "POS")]
    component: ComponentId,

    #[arg(long)]
    store: Option<String>,

    #[arg(long)]
    workstation: Option<String>,

    #[arg(long)]
    environment: Option<String>,

    /// Hostname to parse (default: this machine's hostname)
    #[arg(long)]
    hostname: Option<String>,

    /// Dialect whose hostname pattern is applied (default: --target)
    #[arg(long)]
    dialect: Option<Dialect>,

    /// Never ask interactively
    #[arg(long)]
    no_prompt: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            std::process::exit(code.as_i32());
        }
    };

    let log_config = LogConfig::from_env(cli.global.log_level, cli.global.log_format);
    init_logging(&log_config);

    let result = match &cli.command {
        Commands::Config(cmd) => run_config(&cli.global, cmd),
        Commands::Validate(args) => run_validate(&cli.global, args),
        Commands::Test(args) => run_test(&cli.global, args),
        Commands::Generate(args) => run_generate(&cli.global, args),
        Commands::Station(cmd) => run_station(&cli.global, cmd),
        Commands::Resolve(args) => run_resolve(&cli.global, args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            let code = e.exit_code();
            error!(code = code.code_name(), "{}", e);
            eprintln!("sd: {}", e);
            code
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Settings session
// ============================================================================

/// Loaded settings document plus the store built from it.
struct Session {
    location: ConfigLocation,
    document: PersistedDocument,
    store: DetectionStore,
}

impl Session {
    fn open(global: &GlobalOpts) -> Result<Self> {
        let location = resolve_settings(global.config.as_deref());
        let document = match &location.path {
            Some(path) => PersistedDocument::load(path)?,
            None => PersistedDocument::default(),
        };

        let target = global.target.unwrap_or_else(Dialect::host);
        let mut store = DetectionStore::new(target);
        if let Some(partial) = document.detection_partial()? {
            store.set_config(partial);
        }
        debug!(
            source = %location.source,
            path = ?location.path,
            %target,
            "Loaded detection settings"
        );

        for finding in validate_detection(&store.get_config()) {
            warn!(code = finding.code(), "{}", finding);
        }

        Ok(Self {
            location,
            document,
            store,
        })
    }

    fn save(&mut self) -> Result<PathBuf> {
        let path = self.location.save_target().ok_or_else(|| {
            CoreError::InvalidArgument(
                "no settings location available; pass --config".to_string(),
            )
        })?;
        self.document.set_detection(&self.store.get_config())?;
        self.document.save(&path)?;
        info!(path = %path.display(), "Saved detection settings");
        Ok(path)
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", text)?;
    Ok(())
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_config(global: &GlobalOpts, cmd: &ConfigCommand) -> Result<ExitCode> {
    let mut session = Session::open(global)?;
    let store = &mut session.store;

    match cmd {
        ConfigCommand::Show => {
            let config = store.get_config();
            match global.format {
                OutputFormat::Json => print_json(&json!({
                    "source": session.location.source.to_string(),
                    "path": session.location.path,
                    "detection_config": config,
                }))?,
                OutputFormat::Human => {
                    match &session.location.path {
                        Some(path) => println!(
                            "# Settings: {} ({})",
                            path.display(),
                            session.location.source
                        ),
                        None => println!("# Settings: {}", session.location.source),
                    }
                    println!("{}", serde_json::to_string_pretty(&config)?);
                }
            }
            return Ok(ExitCode::Clean);
        }
        ConfigCommand::SetPath { component, path } => {
            if !store.set_file_path(component, path) {
                return Err(unknown_component(component));
            }
        }
        ConfigCommand::SetFilename {
            component,
            filename,
        } => {
            if !store.set_custom_filename(component, filename) {
                return Err(unknown_component(component));
            }
        }
        ConfigCommand::SetBaseDir { directory } => store.set_base_directory(directory),
        ConfigCommand::UseBaseDir { enabled } => store.use_base_directory(*enabled),
        ConfigCommand::FileDetection { enabled } => store.enable_file_detection(*enabled),
        ConfigCommand::SetRegex { dialect, pattern } => {
            let check = validate_for_dialect(pattern, *dialect);
            if !check.compatible {
                warn!(
                    %dialect,
                    reason = check.reason.as_deref().unwrap_or_default(),
                    "Saving a pattern the {} engine cannot run",
                    engine_name(*dialect)
                );
            }
            store.set_hostname_regex(pattern, *dialect);
        }
        ConfigCommand::SetMapping { field, index } => {
            if *index == 0 {
                return Err(CoreError::InvalidArgument(
                    "group indices start at 1".to_string(),
                ));
            }
            store.set_group_mapping(*field, *index);
        }
        ConfigCommand::EnvExtraction { enabled } => store.set_environment_extraction(*enabled),
        ConfigCommand::SetTestHostname { value } => store.set_test_identity_string(value),
    }

    let path = session.save()?;
    match global.format {
        OutputFormat::Json => print_json(&json!({
            "saved": path,
            "detection_config": session.store.get_config(),
        }))?,
        OutputFormat::Human => println!("Saved {}", path.display()),
    }
    Ok(ExitCode::Clean)
}

fn unknown_component(name: &str) -> CoreError {
    ConfigError::UnknownComponent(name.to_string()).into()
}

fn run_validate(global: &GlobalOpts, args: &ValidateArgs) -> Result<ExitCode> {
    let check = validate_for_dialect(&args.pattern, args.dialect);
    match global.format {
        OutputFormat::Json => print_json(&json!({
            "dialect": args.dialect,
            "engine": engine_name(args.dialect),
            "pattern": args.pattern,
            "check": check,
        }))?,
        OutputFormat::Human => {
            if check.compatible {
                println!("compatible with {}", engine_name(args.dialect));
            } else {
                println!(
                    "incompatible with {}: {}",
                    engine_name(args.dialect),
                    check.reason.as_deref().unwrap_or_default()
                );
            }
        }
    }

    Ok(match check.issue {
        None => ExitCode::Clean,
        Some(sd_core::DialectIssue::InvalidPattern) => ExitCode::TestFailed,
        Some(_) => ExitCode::Incompatible,
    })
}

fn run_test(global: &GlobalOpts, args: &TestArgs) -> Result<ExitCode> {
    let session = Session::open(global)?;
    let store = &session.store;
    let config = store.get_config();

    let dialects: Vec<Dialect> = match (args.dialect, &args.pattern) {
        (Some(dialect), _) => vec![dialect],
        (None, Some(_)) => vec![store.target()],
        (None, None) => Dialect::ALL.to_vec(),
    };
    let identity = args
        .hostname
        .as_deref()
        .unwrap_or_else(|| store.get_test_identity_string());

    let mut tester = PatternTester::from_policy(&config.hostname_detection);
    if args.strict {
        tester = tester.with_shape_checks(true);
    }

    let results: Vec<(Dialect, String, PatternTestResult)> = dialects
        .into_iter()
        .map(|dialect| {
            let pattern = args
                .pattern
                .clone()
                .unwrap_or_else(|| store.get_hostname_regex(dialect).to_string());
            let result = tester.test(&pattern, dialect, identity);
            (dialect, pattern, result)
        })
        .collect();

    match global.format {
        OutputFormat::Json => {
            let entries: Vec<_> = results
                .iter()
                .map(|(dialect, pattern, result)| {
                    json!({
                        "dialect": dialect,
                        "pattern": pattern,
                        "hostname": identity,
                        "result": result,
                    })
                })
                .collect();
            print_json(&entries)?;
        }
        OutputFormat::Human => {
            for (dialect, pattern, result) in &results {
                println!("[{}] {} against '{}'", dialect, pattern, identity);
                if result.success {
                    print!("  ok: store={} workstation={}", result.store_number, result.workstation_id);
                    if let Some(env) = &result.environment {
                        print!(" environment={}", env);
                    }
                    println!();
                } else {
                    println!(
                        "  failed: {}",
                        result.error.as_deref().unwrap_or("unknown failure")
                    );
                }
            }
        }
    }

    let incompatible = results
        .iter()
        .any(|(_, _, r)| r.failure == Some(TestFailure::IncompatibleDialect));
    Ok(if incompatible {
        ExitCode::Incompatible
    } else if results.iter().all(|(_, _, r)| r.success) {
        ExitCode::Clean
    } else {
        ExitCode::TestFailed
    })
}

fn run_generate(global: &GlobalOpts, args: &GenerateArgs) -> Result<ExitCode> {
    let mut session = Session::open(global)?;
    let fragments: Vec<Fragment> = match args.dialect {
        Some(dialect) => vec![generate(&mut session.store, args.component, dialect)],
        None => sd_core::generate_all(&mut session.store, args.component).to_vec(),
    };

    if fragments.iter().all(Fragment::is_empty) {
        info!(component = %args.component, "File detection does not apply; nothing generated");
    }

    match global.format {
        OutputFormat::Json => print_json(&fragments)?,
        OutputFormat::Human => {
            let mut out = std::io::stdout().lock();
            for fragment in fragments.iter().filter(|f| !f.is_empty()) {
                if args.dialect.is_none() {
                    writeln!(out, "# --- {} ---", fragment.dialect)?;
                }
                write!(out, "{}", fragment.text)?;
            }
        }
    }
    Ok(ExitCode::Clean)
}

fn run_station(global: &GlobalOpts, cmd: &StationCommand) -> Result<ExitCode> {
    let StationCommand::Inspect { file, environment } = cmd;
    let session = Session::open(global)?;
    let with_environment = *environment || session.store.is_environment_extraction_enabled();

    let parsed = StationFile::read(file).map_err(|e| CoreError::Io {
        path: file.clone(),
        source: e,
    })?;
    let identity = parsed.identity(with_environment);

    match global.format {
        OutputFormat::Json => print_json(&json!({
            "file": file,
            "values": parsed,
            "identity": identity,
        }))?,
        OutputFormat::Human => {
            println!("StoreID:       {}", parsed.store_id.as_deref().unwrap_or("-"));
            println!(
                "WorkstationID: {}",
                parsed.workstation_id.as_deref().unwrap_or("-")
            );
            println!(
                "Environment:   {}",
                parsed.environment.as_deref().unwrap_or("-")
            );
            match &identity {
                Some(_) => println!("resolves: yes"),
                None => println!("resolves: no (needs StoreID and a numeric WorkstationID)"),
            }
        }
    }

    Ok(if identity.is_some() {
        ExitCode::Clean
    } else {
        ExitCode::TestFailed
    })
}

fn run_resolve(global: &GlobalOpts, args: &ResolveArgs) -> Result<ExitCode> {
    let mut session = Session::open(global)?;
    let dialect = args.dialect.unwrap_or_else(|| session.store.target());

    let hostname = match &args.hostname {
        Some(name) => Some(name.clone()),
        None => match hostname::get() {
            Ok(name) => Some(name.to_string_lossy().into_owned()),
            Err(e) => {
                warn!(error = %e, "Could not read the machine hostname");
                None
            }
        },
    };

    let inputs = ResolutionInputs::new(args.component, dialect)
        .with_cli(args.store.clone(), args.workstation.clone())
        .with_environment(args.environment.clone())
        .with_hostname(hostname);

    let interactive = !args.no_prompt && std::io::stdin().is_terminal();
    let resolution = if interactive {
        resolve_identity(&mut session.store, &inputs, &mut StdinPrompt)
    } else {
        resolve_identity(&mut session.store, &inputs, &mut NoPrompt)
    };

    match global.format {
        OutputFormat::Json => print_json(&resolution)?,
        OutputFormat::Human => {
            for step in &resolution.steps {
                println!("{:<22} {:?}: {}", step.source.to_string(), step.outcome, step.detail);
            }
            match &resolution.identity {
                Some(identity) => {
                    print!(
                        "STORE_ID={} WORKSTATION_ID={}",
                        identity.store_id, identity.workstation_id
                    );
                    if let Some(env) = &identity.environment {
                        print!(" ENVIRONMENT={}", env);
                    }
                    println!(" (from {})", identity.source);
                }
                None => println!("unresolved"),
            }
        }
    }

    Ok(if resolution.is_resolved() {
        ExitCode::Clean
    } else {
        ExitCode::TestFailed
    })
}

/// Reads identity values from the terminal.
struct StdinPrompt;

impl StdinPrompt {
    fn ask(label: &str) -> Option<String> {
        eprint!("{}: ", label);
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl IdentityPrompt for StdinPrompt {
    fn prompt(&mut self, component: ComponentId, with_environment: bool) -> Option<PromptAnswer> {
        eprintln!("Station identity for {} could not be detected.", component);
        let store_id = Self::ask("Store ID")?;
        let workstation_id = Self::ask("Workstation ID")?;
        let environment = if with_environment {
            Self::ask("Environment").filter(|v| !v.is_empty())
        } else {
            None
        };
        Some(PromptAnswer {
            store_id,
            workstation_id,
            environment,
        })
    }
}
