//! Shell commands run on the TRex VM console.

use crate::console::{execute_batch, Command};
use crate::context::Context;
use crate::error::{CheckupError, Result};
use crate::transport::ConsoleTransport;

use super::sanitize::sanitize_console_output;
use super::TrexClient;

impl<'a, T: ConsoleTransport> TrexClient<'a, T> {
    /// Run a single `trex-console` command and return its sanitized output.
    ///
    /// The command is piped into `trex-console -q` from the TRex install
    /// directory, so each call is a fresh, non-interactive console. Exit codes
    /// are not interpreted; callers inspect the returned text.
    pub fn run_console_command(
        &self,
        ctx: &Context,
        vm_name: &str,
        command: &str,
    ) -> Result<String> {
        let shell_command = format!(
            "cd {} && echo {} | ./trex-console -q",
            self.settings.bin_directory,
            shell_quote(command)
        );
        let output = self.run_shell(ctx, vm_name, &shell_command)?;
        Ok(sanitize_console_output(&output))
    }

    /// `systemctl status` of the TRex unit, unprocessed.
    pub fn service_status(&self, ctx: &Context, vm_name: &str) -> Result<String> {
        let command = format!("systemctl status {} | cat", self.settings.unit_name);
        self.run_shell(ctx, vm_name, &command)
    }

    /// Journal lines mentioning the TRex unit, unprocessed.
    pub fn service_journal(&self, ctx: &Context, vm_name: &str) -> Result<String> {
        let command = format!("journalctl | grep {}", self.settings.unit_name);
        self.run_shell(ctx, vm_name, &command)
    }

    fn run_shell(&self, ctx: &Context, vm_name: &str, command: &str) -> Result<String> {
        let batch = [Command::new(command, self.settings.shell_prompt.clone())];
        let mut outputs = execute_batch(
            ctx,
            self.transport,
            &self.namespace,
            vm_name,
            &batch,
            self.settings.batch_timeout,
        )?;
        outputs
            .pop()
            .map(|o| o.output)
            .ok_or_else(|| CheckupError::Transport("console batch returned no output".into()))
    }
}

/// Single-quote `s` for the VM's shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("help"), "'help'");
        assert_eq!(shell_quote("stats --port 0"), "'stats --port 0'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }
}
