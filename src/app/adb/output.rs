use crate::app::adb::runner::CommandOutput;
use crate::app::error::AppError;

/// What kind of command produced the output. adb routes a lot of benign
/// chatter to stderr, and how much of it can be ignored depends on the
/// family, so interpretation is per-family rather than one shared
/// "does stderr look dangerous" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFamily {
    /// Host-side commands (`devices`, `connect`, `version`, ...).
    Host,
    /// `shell <anything>` that has no more specific family.
    Shell,
    /// `shell monkey ...` launcher invocations, which spray event stats on
    /// stderr even when they succeed.
    Monkey,
    /// `push` / `pull` transfers, which report success in prose.
    Transfer,
}

pub fn family_of(args: &[String]) -> CommandFamily {
    let mut saw_shell = false;
    for arg in args {
        match arg.as_str() {
            "push" | "pull" => return CommandFamily::Transfer,
            "monkey" if saw_shell => return CommandFamily::Monkey,
            "shell" => saw_shell = true,
            _ => {}
        }
    }
    if saw_shell {
        CommandFamily::Shell
    } else {
        CommandFamily::Host
    }
}

// Approximate list of stderr lines adb and shell tools emit on success.
// Known to be incomplete; extend only with output observed in the wild.
const IGNORABLE_STDERR: &[&str] = &[
    "Warning",
    "args:",
    "arg:",
    "data=",
    "Events injected:",
    "Network speed:",
    "Dropped:",
];

fn stderr_is_ignorable(stderr: &str) -> bool {
    IGNORABLE_STDERR
        .iter()
        .any(|pattern| stderr.contains(pattern))
}

fn transfer_succeeded(output: &CommandOutput) -> bool {
    let combined = format!("{}\n{}", output.stdout, output.stderr);
    combined.contains("file pulled") || combined.contains("file pushed") || combined.contains("files pulled") || combined.contains("files pushed")
}

/// Turns a finished command into the caller-visible result: trimmed stdout
/// on success, `ERR_DEPENDENCY` with the tool's own message on failure.
pub fn interpret(
    family: CommandFamily,
    output: &CommandOutput,
    trace_id: &str,
) -> Result<String, AppError> {
    let stdout = output.stdout.trim();
    let stderr = output.stderr.trim();

    if family == CommandFamily::Transfer {
        if transfer_succeeded(output) || output.succeeded() {
            return Ok(stdout.to_string());
        }
        let message = if stderr.is_empty() { stdout } else { stderr };
        return Err(AppError::dependency(
            format!("Transfer failed: {message}"),
            trace_id,
        ));
    }

    if !output.succeeded() {
        let message = if stderr.is_empty() { stdout } else { stderr };
        return Err(AppError::dependency(
            format!("Command failed: {message}"),
            trace_id,
        ));
    }

    if !stderr.is_empty() {
        match family {
            CommandFamily::Monkey => {
                if stderr.contains("Error:") || stderr.contains("CRASH") {
                    return Err(AppError::dependency(
                        format!("Command failed: {stderr}"),
                        trace_id,
                    ));
                }
                if stdout.is_empty() {
                    return Ok("Command executed successfully".to_string());
                }
                return Ok(stdout.to_string());
            }
            CommandFamily::Shell | CommandFamily::Host => {
                if !stderr_is_ignorable(stderr) {
                    return Err(AppError::dependency(
                        format!("Command failed: {stderr}"),
                        trace_id,
                    ));
                }
            }
            CommandFamily::Transfer => unreachable!("handled above"),
        }
    }

    Ok(stdout.to_string())
}
