//! Command execution against an open session.
//!
//! Show commands are passed through untouched. Config commands are wrapped
//! in the platform's config-mode enter/exit commands and classified against
//! the platform's CLI rejection markers; after leaving config mode the
//! executor waits the settle delay, then issues the platform's persistence
//! command and captures its confirmation. Some platforms apply
//! configuration asynchronously relative to the prompt returning, hence
//! the delay.

use std::time::Duration;

use indexmap::IndexMap;
use log::warn;
use regex::Regex;

use crate::error::{PlatformError, Result};
use crate::platform::PlatformDefinition;
use crate::transport::Session;

/// Per-command config execution report.
///
/// Every submitted command lands in exactly one of `good` or `rejected`.
#[derive(Debug, Default)]
pub struct ConfigReport {
    /// Commands the CLI accepted, with their output.
    pub good: IndexMap<String, String>,

    /// Commands the CLI rejected, with the rejection output.
    pub rejected: IndexMap<String, String>,

    /// Output of the persistence command.
    pub save_output: String,
}

/// Whole-batch config execution report.
///
/// Batch mode treats the command set as one transaction against the CLI
/// and keeps the combined raw output; use [`ConfigReport`] when
/// per-command attribution is needed.
#[derive(Debug)]
pub struct BatchReport {
    /// Combined raw output of all commands.
    pub output: String,

    /// Output of the persistence command.
    pub save_output: String,
}

impl BatchReport {
    /// Flatten into a single text blob, save confirmation last.
    pub fn into_output(self) -> String {
        if self.save_output.is_empty() {
            self.output
        } else {
            format!("{}\n{}", self.output, self.save_output)
        }
    }
}

/// Runs show and config commands on sessions.
#[derive(Debug, Clone, Copy)]
pub struct CommandExecutor {
    settle_delay: Duration,
}

impl CommandExecutor {
    /// Create an executor with the given post-config settle delay.
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    /// Run one show command and return its output.
    pub async fn run_show<S: Session>(&self, session: &mut S, command: &str) -> Result<String> {
        session.run(command).await
    }

    /// Run config commands one by one, classifying each as accepted or
    /// rejected, then persist.
    pub async fn run_config<S: Session>(
        &self,
        session: &mut S,
        platform: &PlatformDefinition,
        commands: &[String],
    ) -> Result<ConfigReport> {
        let rejection = rejection_regex(platform)?;
        let mut report = ConfigReport::default();

        session.run(&platform.config_enter).await?;
        for command in commands {
            let output = session.run(command).await?;
            match &rejection {
                Some(re) if re.is_match(&output) => {
                    warn!("command '{}' rejected: {}", command, output.trim());
                    report.rejected.insert(command.clone(), output);
                }
                _ => {
                    report.good.insert(command.clone(), output);
                }
            }
        }
        session.run(&platform.config_exit).await?;

        report.save_output = self.persist(session, platform).await?;
        Ok(report)
    }

    /// Run config commands as one batch and return the combined output.
    pub async fn run_config_batch<S: Session>(
        &self,
        session: &mut S,
        platform: &PlatformDefinition,
        commands: &[String],
    ) -> Result<BatchReport> {
        let mut output = String::new();

        session.run(&platform.config_enter).await?;
        for command in commands {
            let chunk = session.run(command).await?;
            if !output.is_empty() && !chunk.is_empty() {
                output.push('\n');
            }
            output.push_str(&chunk);
        }
        session.run(&platform.config_exit).await?;

        let save_output = self.persist(session, platform).await?;
        Ok(BatchReport {
            output,
            save_output,
        })
    }

    /// Wait out the settle delay, then persist and capture the confirmation.
    async fn persist<S: Session>(
        &self,
        session: &mut S,
        platform: &PlatformDefinition,
    ) -> Result<String> {
        tokio::time::sleep(self.settle_delay).await;
        session.run(&platform.save_command).await
    }
}

/// Compile the platform's rejection markers into one alternation.
///
/// Markers are matched case-sensitively; vendors are consistent about the
/// casing of their own error strings.
fn rejection_regex(platform: &PlatformDefinition) -> Result<Option<Regex>> {
    if platform.rejection_patterns.is_empty() {
        return Ok(None);
    }
    let joined = platform
        .rejection_patterns
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    let re = Regex::new(&joined).map_err(|e| PlatformError::InvalidDefinition {
        message: format!("bad rejection pattern for '{}': {}", platform.name, e),
    })?;
    Ok(Some(re))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::vendors::cisco_ios;
    use crate::testing::ScriptedSession;

    fn executor() -> CommandExecutor {
        CommandExecutor::new(Duration::from_millis(0))
    }

    #[test]
    fn test_run_show() {
        tokio_test::block_on(async {
            let mut session = ScriptedSession::new([("show version", "Cisco IOS, Version 15.2")]);
            let output = executor()
                .run_show(&mut session, "show version")
                .await
                .unwrap();
            assert_eq!(output, "Cisco IOS, Version 15.2");
        });
    }

    #[tokio::test]
    async fn test_config_classifies_rejections() {
        let platform = cisco_ios::platform();
        let mut session = ScriptedSession::new([
            ("bad cmd", "bad cmd\n% Invalid input detected at '^' marker."),
            ("good cmd", "applied"),
        ]);

        let report = executor()
            .run_config(
                &mut session,
                &platform,
                &["bad cmd".to_string(), "good cmd".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(report.rejected.len(), 1);
        assert!(report.rejected.contains_key("bad cmd"));
        assert_eq!(report.good.len(), 1);
        assert!(report.good.contains_key("good cmd"));
    }

    #[tokio::test]
    async fn test_config_wraps_and_persists() {
        let platform = cisco_ios::platform();
        let mut session = ScriptedSession::new([("write", "Building configuration...\n[OK]")]);

        let report = executor()
            .run_config(&mut session, &platform, &["hostname r1".to_string()])
            .await
            .unwrap();

        assert!(report.save_output.contains("[OK]"));
        assert_eq!(
            session.transcript(),
            vec![
                "configure terminal",
                "hostname r1",
                "end",
                "write",
            ]
        );
    }

    #[tokio::test]
    async fn test_batch_combines_output() {
        let platform = cisco_ios::platform();
        let mut session = ScriptedSession::new([
            ("interface lo1", ""),
            ("description test", ""),
            ("write", "[OK]"),
        ]);

        let report = executor()
            .run_config_batch(
                &mut session,
                &platform,
                &["interface lo1".to_string(), "description test".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(report.save_output, "[OK]");
        assert_eq!(report.into_output(), "\n[OK]");
        assert_eq!(
            session.transcript(),
            vec![
                "configure terminal",
                "interface lo1",
                "description test",
                "end",
                "write",
            ]
        );
    }
}
