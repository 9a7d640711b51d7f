use anyhow::{Context, Result};
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::process::{Child, Command, Stdio};

/// Command execution context
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Environment variables to set
    pub env_vars: HashMap<String, String>,
    /// Program and leading arguments the command is launched through
    pub wrapper: Vec<String>,
}

/// Builder for CommandExecutor
pub struct CommandExecutorBuilder {
    context: CommandContext,
}

impl Default for CommandExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutorBuilder {
    /// Create a new CommandExecutorBuilder with default settings
    pub fn new() -> Self {
        Self {
            context: CommandContext::default(),
        }
    }

    /// Add a single environment variable
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.env_vars.insert(key.into(), value.into());
        self
    }

    /// Launch every command through this prefix, e.g. `taskset -c 2`
    pub fn wrapper(mut self, wrapper: Option<Vec<String>>) -> Self {
        self.context.wrapper = wrapper.unwrap_or_default();
        self
    }

    /// Build the CommandExecutor
    pub fn build(self) -> Result<CommandExecutor> {
        if self.context.wrapper.first().is_some_and(|p| p.is_empty()) {
            anyhow::bail!("Wrapper program cannot be empty");
        }
        Ok(CommandExecutor {
            context: self.context,
        })
    }
}

/// Launches commands with their output streams redirected to files
pub struct CommandExecutor {
    context: CommandContext,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    /// Create a new CommandExecutor with default settings
    pub fn new() -> Self {
        Self {
            context: CommandContext::default(),
        }
    }

    /// Create a builder for CommandExecutor with fluent configuration
    pub fn builder() -> CommandExecutorBuilder {
        CommandExecutorBuilder::new()
    }

    /// Spawn `cmd` with stdout and stderr going to separate files.
    ///
    /// The caller owns the returned child and is responsible for waiting on it.
    pub fn launch_redirected(
        &self,
        cmd: &str,
        args: &[&str],
        stdout: File,
        stderr: File,
    ) -> Result<Child> {
        let command_str = self.format_command(cmd, args);
        debug!("Launching command: {}", command_str);

        let mut command = match self.context.wrapper.split_first() {
            Some((program, wrapper_args)) => {
                let mut command = Command::new(program);
                command.args(wrapper_args).arg(cmd);
                command
            }
            None => Command::new(cmd),
        };
        command.args(args);

        for (key, value) in &self.context.env_vars {
            command.env(key, value);
        }

        command
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        let child = command
            .spawn()
            .with_context(|| format!("Failed to spawn command: {}", command_str))?;

        Ok(child)
    }

    /// Format command and arguments for logging
    fn format_command(&self, cmd: &str, args: &[&str]) -> String {
        let mut parts: Vec<&str> = self.context.wrapper.iter().map(String::as_str).collect();
        parts.push(cmd);
        parts.extend_from_slice(args);
        parts.join(" ")
    }
}
