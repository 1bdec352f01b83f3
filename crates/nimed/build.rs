//! Build script: render the `nimed(1)` manual page for packagers.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use time::{OffsetDateTime, format_description::well_known::Iso8601};

const EPOCH_DATE: &str = "1970-01-01";

/// Manual date from `SOURCE_DATE_EPOCH`, so reproducible builds agree.
fn manual_date() -> String {
    let Ok(raw) = env::var("SOURCE_DATE_EPOCH") else {
        return EPOCH_DATE.into();
    };
    let formatted = raw
        .parse::<i64>()
        .ok()
        .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
        .and_then(|moment| moment.format(&Iso8601::DATE).ok());
    formatted.unwrap_or_else(|| {
        println!("cargo:warning=ignoring unusable SOURCE_DATE_EPOCH '{raw}'");
        EPOCH_DATE.into()
    })
}

/// `target/generated-man/<target>/<profile>`, derived from `OUT_DIR`
/// (`target/<profile>/build/<crate>-<hash>/out`).
fn man_dir() -> PathBuf {
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown-target".into());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown-profile".into());
    let target_root = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .and_then(|out| out.ancestors().nth(4).map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("target"));
    target_root.join("generated-man").join(target).join(profile)
}

fn write_atomically(dir: &Path, name: &str, contents: &[u8]) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let staging = dir.join(format!("{name}.tmp"));
    fs::write(&staging, contents)?;
    fs::rename(&staging, dir.join(name))
}

fn render(binary: &str, version: &str, date: &str) -> String {
    let title = binary.to_uppercase();
    format!(
        ".TH \"{title}\" \"1\" \"{date}\" \"{binary} {version}\" \"NIME\"\n\
.SH NAME\n\
{binary} \\- NIME pipe protocol daemon\n\
.SH SYNOPSIS\n\
.B {binary}\n\
[\\fB\\-\\-daemon\\-socket\\fR \\fIURL\\fR]\n\
[\\fB\\-\\-service\\fR \\fIID\\fR]...\n\
.SH DESCRIPTION\n\
{binary} accepts input method clients on a Unix or TCP socket, answers\n\
\\fBping\\fR with \\fBpong\\fR, closes on \\fBquit\\fR, and routes JSON requests\n\
to the service named by their \\fBid\\fR field.\n\
.SH ENVIRONMENT\n\
NIME_DAEMON_SOCKET, NIME_LOG_FILTER, NIME_LOG_FORMAT,\n\
NIME_MAX_MESSAGE_BYTES, NIME_SERVICES\n"
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    for var in ["CARGO_PKG_VERSION", "SOURCE_DATE_EPOCH", "TARGET", "PROFILE"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    let binary = env::var("CARGO_PKG_NAME").unwrap_or_else(|_| "nimed".into());
    let version = env::var("CARGO_PKG_VERSION")?;
    let page = render(&binary, &version, &manual_date());
    let name = format!("{binary}.1");

    write_atomically(&man_dir(), &name, page.as_bytes())?;
    if let Some(out_dir) = env::var_os("OUT_DIR")
        && let Err(error) = write_atomically(Path::new(&out_dir), &name, page.as_bytes())
    {
        println!("cargo:warning=failed to stage manual page in OUT_DIR: {error}");
    }
    Ok(())
}
