use std::process::{Child, Command, Output, Stdio};

use bitflags::bitflags;
use miette::{Context, IntoDiagnostic};
use tracing::{debug, trace};

use crate::result::{bail, Result};

pub const YT_DLP: &str = "yt-dlp";
pub const YT_DL: &str = "youtube-dl";

bitflags! {
    #[derive(Debug, Clone, Copy)]
    pub struct Capture: u8 {
        const STDIN = 0b0000001;
        const STDOUT = 0b0000010;
        const STDERR = 0b0000100;
    }
}

fn pipe_or_null(wanted: bool) -> Stdio {
    if wanted {
        Stdio::piped()
    } else {
        Stdio::null()
    }
}

/// Run a program to completion, returning its raw output handle.
///
/// IO handles are captured only when the caller asked for them or the log
/// level is Debug, in which case `stdout`/`stderr` are also logged.
///
/// An error means the program could not be executed at all; a non-0 exit
/// status is reported through the output handle, not as an error.
pub fn run_command<F: FnOnce(&mut Command) -> &mut Command>(
    program: &str,
    f: F,
    capture: Capture,
) -> Result<Output> {
    let is_debug = tracing::enabled!(tracing::Level::DEBUG);

    let mut cmd = Command::new(program);
    let cmd = f(&mut cmd)
        .stdin(pipe_or_null(capture.contains(Capture::STDIN)))
        .stdout(pipe_or_null(is_debug || capture.contains(Capture::STDOUT)))
        .stderr(pipe_or_null(is_debug || capture.contains(Capture::STDERR)));

    debug!("Executing command: {cmd:?}");
    let res = cmd
        .output()
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not execute {program}"))?;

    if is_debug {
        debug!("status: {}", res.status);
        debug!("stdout: {} bytes long", res.stdout.len());
        trace!("stdout: {:?}", String::from_utf8_lossy(&res.stdout));
        debug!("stderr: {} bytes long", res.stderr.len());
        trace!("stderr: {:?}", String::from_utf8_lossy(&res.stderr));
    }

    Ok(res)
}

/// Run a program and verify that it returned a success status code.
pub fn assert_success_command<F: FnOnce(&mut Command) -> &mut Command>(
    program: &str,
    f: F,
) -> Result<()> {
    let res = run_command(program, f, Capture::empty())?;
    if res.status.success() {
        Ok(())
    } else {
        bail("Command did run but was not successful")
    }
}

/// Spawn a program with stdout and stderr piped, for callers that need
/// to stream output while the program runs.
pub fn spawn_streaming<F: FnOnce(&mut Command) -> &mut Command>(
    program: &str,
    f: F,
) -> Result<Child> {
    let mut cmd = Command::new(program);
    let cmd = f(&mut cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("Spawning command: {cmd:?}");
    cmd.spawn()
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not spawn {program}"))
        .map_err(Into::into)
}
