//! POSIX shell rendering of the station-file fallback.
//!
//! Uses only POSIX `sh` features plus `sed` and `grep -E`, so the block
//! can be spliced into either a `sh` or a `bash` installer.

use super::FragmentPlan;
use crate::station_file::{ENVIRONMENT_KEY, STORE_KEY, WORKSTATION_KEY};
use std::fmt::Write;

/// Single-quote a value for the shell.
pub(crate) fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub(crate) fn render(plan: &FragmentPlan) -> String {
    let mut out = String::new();
    let env = plan.multi_environment;
    let store_key = STORE_KEY.trim_end_matches('=');
    let ws_key = WORKSTATION_KEY.trim_end_matches('=');
    let env_key = ENVIRONMENT_KEY.trim_end_matches('=');

    // write! into a String cannot fail.
    let _ = writeln!(out, "# Station file detection for {}", plan.component);
    let _ = writeln!(out, "if [ \"${{IDENTITY_RESOLVED:-false}}\" != \"true\" ]; then");
    let _ = writeln!(out, "  station_file={}", quote(&plan.station_file));
    let _ = writeln!(out, "  if [ -f \"$station_file\" ]; then");
    let _ = writeln!(out, "    echo \"Reading station file: $station_file\"");
    let _ = writeln!(out, "    file_store_id=\"\"");
    let _ = writeln!(out, "    file_workstation_id=\"\"");
    if env {
        let _ = writeln!(out, "    file_environment=\"\"");
    }
    let _ = writeln!(
        out,
        "    while IFS= read -r station_line || [ -n \"$station_line\" ]; do"
    );
    // In the C locale [[:space:]] is exactly the ASCII set the parser trims.
    let _ = writeln!(
        out,
        "      station_line=$(printf '%s\\n' \"$station_line\" | LC_ALL=C sed -e 's/[[:space:]]*$//')"
    );
    let _ = writeln!(out, "      case \"$station_line\" in");
    let _ = writeln!(
        out,
        "        {k}=*) file_store_id=\"${{station_line#{k}=}}\" ;;",
        k = store_key
    );
    let _ = writeln!(
        out,
        "        {k}=*) file_workstation_id=\"${{station_line#{k}=}}\" ;;",
        k = ws_key
    );
    if env {
        let _ = writeln!(
            out,
            "        {k}=*) file_environment=\"${{station_line#{k}=}}\" ;;",
            k = env_key
        );
    }
    let _ = writeln!(out, "      esac");
    let _ = writeln!(out, "    done < \"$station_file\"");
    let _ = writeln!(
        out,
        "    if [ -n \"$file_store_id\" ] && printf '%s\\n' \"$file_workstation_id\" | grep -Eq '^[0-9]+$'; then"
    );
    let _ = writeln!(out, "      STORE_ID=\"$file_store_id\"");
    let _ = writeln!(out, "      WORKSTATION_ID=\"$file_workstation_id\"");
    let _ = writeln!(out, "      IDENTITY_RESOLVED=true");
    let _ = writeln!(out, "      export IDENTITY_RESOLVED STORE_ID WORKSTATION_ID");
    if env {
        let _ = writeln!(out, "      if [ -n \"$file_environment\" ]; then");
        let _ = writeln!(out, "        ENVIRONMENT=\"$file_environment\"");
        let _ = writeln!(out, "        export ENVIRONMENT");
        let _ = writeln!(out, "        echo \"Environment from station file: $ENVIRONMENT\"");
        let _ = writeln!(out, "      fi");
    }
    let _ = writeln!(
        out,
        "      echo \"Station identity from file: StoreID=$STORE_ID WorkstationID=$WORKSTATION_ID\""
    );
    let _ = writeln!(out, "    else");
    let _ = writeln!(
        out,
        "      echo \"Station file $station_file has no valid StoreID/WorkstationID\""
    );
    let _ = writeln!(out, "    fi");
    let _ = writeln!(out, "  else");
    let _ = writeln!(out, "    echo \"Station file not found: $station_file\"");
    let _ = writeln!(out, "  fi");
    let _ = writeln!(out, "fi");
    out
}
