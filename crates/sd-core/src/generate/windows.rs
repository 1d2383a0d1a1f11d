//! PowerShell rendering of the station-file fallback.
//!
//! Results are published through `$script:` scope so the enclosing
//! installer script sees them after the block runs.

use super::FragmentPlan;
use crate::station_file::{ENVIRONMENT_KEY, STORE_KEY, TRAILING_WHITESPACE, WORKSTATION_KEY};
use std::fmt::Write;

/// Escape a value for a double-quoted PowerShell string.
///
/// Backslashes are doubled. Backtick, `$`, `"` and the typographic double
/// quotes PowerShell also accepts as delimiters get the backtick escape.
pub(crate) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => out.push_str(r"\\"),
            '`' | '$' | '"' | '\u{201C}' | '\u{201D}' | '\u{201E}' => {
                out.push('`');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// `TRAILING_WHITESPACE` as the body of a PowerShell string literal.
fn trim_chars() -> String {
    TRAILING_WHITESPACE
        .iter()
        .map(|c| match c {
            '\t' => "`t".to_string(),
            '\r' => "`r".to_string(),
            '\x0B' => "`v".to_string(),
            '\x0C' => "`f".to_string(),
            other => other.to_string(),
        })
        .collect()
}

/// One `StartsWith` test. `lead` is `if` for the first key and `} elseif`
/// for the rest; the caller closes the chain.
fn key_branch(out: &mut String, lead: &str, key: &str, variable: &str) {
    let _ = writeln!(
        out,
        "            {} ($stationLine.StartsWith(\"{}\", [System.StringComparison]::Ordinal)) {{",
        lead, key
    );
    let _ = writeln!(
        out,
        "                ${} = $stationLine.Substring({})",
        variable,
        key.len()
    );
}

pub(crate) fn render(plan: &FragmentPlan) -> String {
    let mut out = String::new();
    let env = plan.multi_environment;

    // write! into a String cannot fail.
    let _ = writeln!(out, "# Station file detection for {}", plan.component);
    let _ = writeln!(out, "if (-not $script:IdentityResolved) {{");
    let _ = writeln!(out, "    $stationFile = \"{}\"", escape(&plan.station_file));
    let _ = writeln!(
        out,
        "    if (Test-Path -LiteralPath $stationFile -PathType Leaf) {{"
    );
    let _ = writeln!(out, "        Write-Host \"Reading station file: $stationFile\"");
    let _ = writeln!(out, "        $fileStoreId = \"\"");
    let _ = writeln!(out, "        $fileWorkstationId = \"\"");
    if env {
        let _ = writeln!(out, "        $fileEnvironment = \"\"");
    }
    let _ = writeln!(
        out,
        "        foreach ($stationLine in @(Get-Content -LiteralPath $stationFile)) {{"
    );
    let _ = writeln!(
        out,
        "            $stationLine = $stationLine.TrimEnd([char[]]\"{}\")",
        trim_chars()
    );
    key_branch(&mut out, "if", STORE_KEY, "fileStoreId");
    key_branch(&mut out, "} elseif", WORKSTATION_KEY, "fileWorkstationId");
    if env {
        key_branch(&mut out, "} elseif", ENVIRONMENT_KEY, "fileEnvironment");
    }
    let _ = writeln!(out, "            }}");
    let _ = writeln!(out, "        }}");
    let _ = writeln!(
        out,
        "        if ($fileStoreId -and ($fileWorkstationId -match '^[0-9]+$')) {{"
    );
    let _ = writeln!(out, "            $script:StoreId = $fileStoreId");
    let _ = writeln!(out, "            $script:WorkstationId = $fileWorkstationId");
    let _ = writeln!(out, "            $script:IdentityResolved = $true");
    if env {
        let _ = writeln!(out, "            if ($fileEnvironment) {{");
        let _ = writeln!(out, "                $script:Environment = $fileEnvironment");
        let _ = writeln!(
            out,
            "                Write-Host \"Environment from station file: $($script:Environment)\""
        );
        let _ = writeln!(out, "            }}");
    }
    let _ = writeln!(
        out,
        "            Write-Host \"Station identity from file: StoreID=$($script:StoreId) WorkstationID=$($script:WorkstationId)\""
    );
    let _ = writeln!(out, "        }} else {{");
    let _ = writeln!(
        out,
        "            Write-Host \"Station file $stationFile has no valid StoreID/WorkstationID\""
    );
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }} else {{");
    let _ = writeln!(out, "        Write-Host \"Station file not found: $stationFile\"");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sd_config::ComponentId;

    fn plan(path: &str, multi_environment: bool) -> FragmentPlan {
        FragmentPlan {
            component: ComponentId::Wdm,
            station_file: path.to_string(),
            multi_environment,
        }
    }

    #[test]
    fn test_escape_doubles_backslashes() {
        assert_eq!(
            escape(r"C:\gkretail\stations\WDM.station"),
            r"C:\\gkretail\\stations\\WDM.station"
        );
        assert_eq!(escape("a$b`c\"d"), "a`$b``c`\"d");
    }

    #[test]
    fn test_escape_typographic_quotes() {
        assert_eq!(
            escape("C:\\Shop \u{201C}North\u{201D} \u{201E}1\u{201D}"),
            "C:\\\\Shop `\u{201C}North`\u{201D} `\u{201E}1`\u{201D}"
        );
        // Single typographic quotes are literal inside double quotes.
        assert_eq!(escape("it\u{2019}s"), "it\u{2019}s");
    }

    #[test]
    fn test_trim_set_is_ascii_only() {
        let text = render(&plan(r"C:\s\WDM.station", false));
        assert!(text.contains("$stationLine = $stationLine.TrimEnd([char[]]\" `t`r`v`f\")"));
        assert!(!text.contains(".TrimEnd()"));
    }

    #[test]
    fn test_elseif_chain_layout() {
        let text = render(&plan(r"C:\s\WDM.station", true));
        let chain = "                $fileStoreId = $stationLine.Substring(8)\n            } elseif ($stationLine.StartsWith(\"WorkstationID=\", [System.StringComparison]::Ordinal)) {\n";
        assert!(text.contains(chain));
        assert!(text.contains(
            "            } elseif ($stationLine.StartsWith(\"Environment=\", [System.StringComparison]::Ordinal)) {\n"
        ));
        assert!(text.contains("$stationLine.Substring(12)\n            }\n        }\n"));
        assert!(!text.contains("}  "));
    }

    #[test]
    fn test_render_structure() {
        let text = render(&plan(r"C:\gkretail\stations\WDM.station", false));
        assert!(text.starts_with("# Station file detection for WDM\n"));
        assert!(text.contains(r#"$stationFile = "C:\\gkretail\\stations\\WDM.station""#));
        assert!(text.contains("if (-not $script:IdentityResolved) {"));
        assert!(text.contains(
            "if ($stationLine.StartsWith(\"StoreID=\", [System.StringComparison]::Ordinal)) {"
        ));
        assert!(text.contains("$fileWorkstationId = $stationLine.Substring(14)"));
        assert!(text.contains("$script:IdentityResolved = $true"));
        assert!(!text.contains("Environment="));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_render_with_environment() {
        let text = render(&plan(r"C:\s\WDM.station", true));
        assert!(text.contains("$fileEnvironment = $stationLine.Substring(12)"));
        assert!(text.contains("$script:Environment = $fileEnvironment"));
    }

    #[test]
    fn test_braces_balance() {
        for env in [false, true] {
            let text = render(&plan(r"C:\s\WDM.station", env));
            let open = text.matches('{').count();
            let close = text.matches('}').count();
            assert_eq!(open, close);
        }
    }
}
