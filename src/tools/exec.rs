use crate::tools::error::{ToolError, ToolResult};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::ffi::OsString;
use std::process::Stdio;
use tokio::process::Command;

lazy_static! {
    static ref ANSI_COLOR_RE: Regex = Regex::new(r"\x1B\[[0-9;]*m").unwrap();
    static ref OVERWRITTEN_RE: Regex = Regex::new(r"(?m)^.*\r").unwrap();
    static ref TRAILING_SPACES_RE: Regex = Regex::new(r"(?m) +$").unwrap();
}

/// Exit code (`None` when killed by a signal) and combined transcript,
/// stdout first then stderr.
#[derive(Debug)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub out: String,
}

/// Runs `program` to completion and captures its transcript. The exit status
/// is reported, not checked.
pub async fn run(program: &str, args: &[OsString]) -> ToolResult<ToolOutput> {
    debug!("CMD: {}", command_line(program, args));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotFound(program.to_string()),
            _ => err.into(),
        })?;

    let mut out = String::from_utf8_lossy(&output.stdout).into_owned();
    out.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(ToolOutput {
        code: output.status.code(),
        out,
    })
}

/// Like [`run`], but any non-zero exit is an error carrying the transcript.
pub async fn run_checked(program: &str, args: &[OsString]) -> ToolResult<String> {
    let output = run(program, args).await?;
    match output.code {
        Some(0) => Ok(output.out),
        Some(code) => Err(ToolError::InvocationFailed {
            program: program.to_string(),
            code,
            output: output.out,
        }),
        None => Err(ToolError::Signaled {
            program: program.to_string(),
            output: output.out,
        }),
    }
}

/// Normalises a terminal transcript for line parsing: drops colour codes and
/// text overwritten through carriage returns, turns tabs into spaces and
/// strips trailing spaces.
pub fn clean_output(out: &str) -> String {
    let out = ANSI_COLOR_RE.replace_all(out, "");
    let out = out.replace("\r\n", "\n");
    let out = OVERWRITTEN_RE.replace_all(&out, "");
    let out = out.replace('\t', " ");
    TRAILING_SPACES_RE.replace_all(&out, "").into_owned()
}

fn command_line(program: &str, args: &[OsString]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_output_strips_terminal_noise() {
        let raw = "\x1B[1mBold\x1B[0m line  \r\n50%\r100%\n\tindented\t\n";
        assert_eq!(clean_output(raw), "Bold line\n100%\n indented\n");
    }

    #[test]
    fn command_line_joins_arguments() {
        let args: Vec<OsString> = vec!["--query".into(), "-d".into(), "/dev/sr0".into()];
        assert_eq!(command_line("cdparanoia", &args), "cdparanoia --query -d /dev/sr0");
    }

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let err = run("cdda-rip-no-such-program", &[]).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "cdda-rip-no-such-program"));
    }
}
