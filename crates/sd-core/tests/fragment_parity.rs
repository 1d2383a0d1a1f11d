//! Fragment parity tests.
//!
//! Executes generated fragments against real station files and checks
//! that they publish exactly what the Rust station-file parser resolves.
//! The POSIX fragment runs under `sh`; the PowerShell fragment runs under
//! `pwsh` when it is installed.

use sd_config::{ComponentId, DetectionStore, Dialect};
use sd_core::generate::generate;
use sd_core::station_file::{FileIdentity, StationFile};
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const CASES: &[&str] = &[
    "StoreID=1234\nWorkstationID=101\n",
    "StoreID=1234  \r\nWorkstationID=101\t\r\nEnvironment=PROD\r\n",
    "StoreID=1234\nStoreID=\nWorkstationID=1\n",
    "StoreID=A123\nWorkstationID=10a\n",
    "WorkstationID=7\nStoreID=0042",
    "# comment\nstoreid=9999\nFoo=bar\nStoreID=AB12\nWorkstationID=0010\nEnvironment=QA\n",
    "StoreID=Shop 1$x\nWorkstationID=5\nEnvironment=\n",
    "StoreID=1\nWorkstationID=2\nWorkstationID=3\nEnvironment=UAT\nEnvironment=TEST\n",
    "StoreID=1234\x0C\nWorkstationID=101\x0B\n",
    "StoreID=1234\u{A0}\nWorkstationID=101\n",
    "StoreID=1234\nWorkstationID=101\u{A0}\n",
    "",
];

/// What a fragment published: resolved flag plus identity values.
#[derive(Debug, PartialEq, Eq)]
struct Published {
    resolved: bool,
    store_id: String,
    workstation_id: String,
    environment: String,
}

impl Published {
    fn expected(identity: Option<FileIdentity>) -> Self {
        match identity {
            Some(identity) => Published {
                resolved: true,
                store_id: identity.store_id,
                workstation_id: identity.workstation_id,
                environment: identity.environment.unwrap_or_default(),
            },
            None => Published {
                resolved: false,
                store_id: String::new(),
                workstation_id: String::new(),
                environment: String::new(),
            },
        }
    }

    fn parse_last_line(stdout: &[u8], truthy: &str) -> Self {
        let text = String::from_utf8_lossy(stdout);
        let line = text.lines().last().expect("fragment produced no output");
        let fields: Vec<&str> = line.split('|').collect();
        assert_eq!(fields.len(), 4, "unexpected report line: {line}");
        Published {
            resolved: fields[0] == truthy,
            store_id: fields[1].to_string(),
            workstation_id: fields[2].to_string(),
            environment: fields[3].to_string(),
        }
    }
}

fn store_for(dir: &TempDir, with_environment: bool) -> DetectionStore {
    let mut store = DetectionStore::new(Dialect::Posix);
    store.set_base_directory(&dir.path().to_string_lossy());
    store.set_environment_extraction(with_environment);
    store
}

fn have(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn run_posix(fragment: &str) -> Published {
    let script = format!(
        "{fragment}printf '%s|%s|%s|%s\\n' \"${{IDENTITY_RESOLVED:-}}\" \"${{STORE_ID:-}}\" \"${{WORKSTATION_ID:-}}\" \"${{ENVIRONMENT:-}}\"\n"
    );
    let output = Command::new("sh")
        .arg("-c")
        .arg(&script)
        .env_remove("IDENTITY_RESOLVED")
        .env_remove("STORE_ID")
        .env_remove("WORKSTATION_ID")
        .env_remove("ENVIRONMENT")
        .output()
        .expect("run sh");
    assert!(output.status.success(), "sh failed: {:?}", output);
    Published::parse_last_line(&output.stdout, "true")
}

fn run_powershell(dir: &TempDir, fragment: &str) -> Published {
    let script = format!(
        "{fragment}Write-Output (\"{{0}}|{{1}}|{{2}}|{{3}}\" -f $script:IdentityResolved, $script:StoreId, $script:WorkstationId, $script:Environment)\n"
    );
    let path = dir.path().join("fragment.ps1");
    fs::write(&path, script).expect("write ps1");
    let output = Command::new("pwsh")
        .args(["-NoProfile", "-NonInteractive", "-File"])
        .arg(&path)
        .output()
        .expect("run pwsh");
    assert!(output.status.success(), "pwsh failed: {:?}", output);
    Published::parse_last_line(&output.stdout, "True")
}

#[test]
fn posix_fragment_matches_station_parser() {
    if !have("sh", &["-c", "true"]) {
        eprintln!("sh not available; skipping");
        return;
    }

    for with_environment in [false, true] {
        for content in CASES {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("POS.station"), content).unwrap();
            let mut store = store_for(&dir, with_environment);

            let fragment = generate(&mut store, ComponentId::Pos, Dialect::Posix);
            let published = run_posix(&fragment.text);
            let expected =
                Published::expected(StationFile::parse(content).identity(with_environment));
            assert_eq!(
                published, expected,
                "content {content:?}, environment extraction {with_environment}"
            );
        }
    }
}

#[test]
fn posix_fragment_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let mut store = store_for(&dir, false);
    let fragment = generate(&mut store, ComponentId::Wdm, Dialect::Posix);

    let output = Command::new("sh")
        .arg("-c")
        .arg(&fragment.text)
        .env_remove("IDENTITY_RESOLVED")
        .output()
        .expect("run sh");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Station file not found"), "{stdout}");
    assert!(stdout.contains("WDM.station"));
}

#[test]
fn posix_fragment_skips_when_already_resolved() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("POS.station"), "StoreID=1234\nWorkstationID=1\n").unwrap();
    let mut store = store_for(&dir, false);
    let fragment = generate(&mut store, ComponentId::Pos, Dialect::Posix);

    let script = format!("{}printf '%s|%s\\n' \"$STORE_ID\" \"$WORKSTATION_ID\"\n", fragment.text);
    let output = Command::new("sh")
        .arg("-c")
        .arg(&script)
        .env("IDENTITY_RESOLVED", "true")
        .env("STORE_ID", "9999")
        .env("WORKSTATION_ID", "42")
        .output()
        .expect("run sh");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "9999|42");
}

#[test]
fn posix_fragment_survives_quotes_in_path() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("it's here");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("POS.station"), "StoreID=0001\nWorkstationID=9\n").unwrap();

    let mut store = DetectionStore::new(Dialect::Posix);
    store.set_base_directory(&nested.to_string_lossy());
    let fragment = generate(&mut store, ComponentId::Pos, Dialect::Posix);

    let published = run_posix(&fragment.text);
    assert!(published.resolved);
    assert_eq!(published.store_id, "0001");
}

#[test]
fn powershell_fragment_matches_station_parser() {
    if !have("pwsh", &["-NoProfile", "-Command", "exit 0"]) {
        // Without PowerShell, check the fragment reads every key the
        // parser knows and publishes the shared signals.
        let dir = TempDir::new().unwrap();
        let mut store = store_for(&dir, true);
        let text = generate(&mut store, ComponentId::Pos, Dialect::Windows).text;
        for needle in [
            "\"StoreID=\"",
            "\"WorkstationID=\"",
            "\"Environment=\"",
            "$script:IdentityResolved = $true",
            "$script:StoreId = $fileStoreId",
            "$script:WorkstationId = $fileWorkstationId",
            "$script:Environment = $fileEnvironment",
            "-match '^[0-9]+$'",
            ".TrimEnd([char[]]\" `t`r`v`f\")",
        ] {
            assert!(text.contains(needle), "missing {needle}");
        }
        return;
    }

    for with_environment in [false, true] {
        for content in CASES {
            let dir = TempDir::new().unwrap();
            fs::write(dir.path().join("POS.station"), content).unwrap();
            let mut store = store_for(&dir, with_environment);

            let fragment = generate(&mut store, ComponentId::Pos, Dialect::Windows);
            let published = run_powershell(&dir, &fragment.text);
            let expected =
                Published::expected(StationFile::parse(content).identity(with_environment));
            assert_eq!(
                published, expected,
                "content {content:?}, environment extraction {with_environment}"
            );
        }
    }
}
