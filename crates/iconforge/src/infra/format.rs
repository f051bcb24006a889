//! External source formatting (for example `prettier --stdin-filepath {path}`).

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::infra::config::FormatSettings;

const PATH_PLACEHOLDER: &str = "{path}";

/// Pipes generated source through a configured command. Without a command it is the identity.
#[derive(Debug, Clone, Default)]
pub struct SourceFormatter {
    argv: Vec<String>,
}

impl SourceFormatter {
    pub fn from_settings(settings: &FormatSettings) -> Self {
        Self {
            argv: settings.command.clone().unwrap_or_default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.argv.is_empty()
    }

    pub async fn format(&self, source: String, path: &Path) -> Result<String> {
        let Some((program, args)) = self.argv.split_first() else {
            return Ok(source);
        };

        let path = path.display().to_string();
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.replace(PATH_PLACEHOLDER, &path))
            .collect();

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start formatter '{program}'"))?;

        let mut stdin = child
            .stdin
            .take()
            .context("formatter stdin unavailable")?;
        let input = source.into_bytes();
        let writer = async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        };

        let (written, output) = tokio::join!(writer, child.wait_with_output());
        let output = output.with_context(|| format!("formatter '{program}' did not finish"))?;
        if !output.status.success() {
            bail!(
                "formatter '{program}' failed for {path} ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        written.with_context(|| format!("failed to send source to formatter '{program}'"))?;

        String::from_utf8(output.stdout).context("formatter produced non UTF-8 output")
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn formatter(argv: &[&str]) -> SourceFormatter {
        SourceFormatter::from_settings(&FormatSettings {
            command: Some(argv.iter().map(|arg| arg.to_string()).collect()),
        })
    }

    #[tokio::test]
    async fn passes_source_through_without_command() {
        let formatter = SourceFormatter::default();
        assert!(!formatter.is_enabled());
        let out = formatter
            .format("const a = 1;".into(), Path::new("a.tsx"))
            .await
            .unwrap();
        assert_eq!(out, "const a = 1;");
    }

    #[tokio::test]
    async fn pipes_source_through_command() {
        let out = formatter(&["cat"])
            .format("export {};\n".into(), Path::new("a.tsx"))
            .await
            .unwrap();
        assert_eq!(out, "export {};\n");
    }

    #[tokio::test]
    async fn substitutes_path_placeholder() {
        let out = formatter(&["sh", "-c", "cat >/dev/null; echo {path}"])
            .format("x".into(), Path::new("icons/star.tsx"))
            .await
            .unwrap();
        assert_eq!(out.trim(), "icons/star.tsx");
    }

    #[tokio::test]
    async fn failing_command_is_an_error() {
        let result = formatter(&["sh", "-c", "cat >/dev/null; echo bad >&2; exit 3"])
            .format("x".into(), Path::new("a.tsx"))
            .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("bad"));
    }
}
