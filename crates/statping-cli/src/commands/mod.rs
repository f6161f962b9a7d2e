//! CLI command definitions and dispatch.

pub mod plan;
pub mod synth;
pub mod validate;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use statping_common::config::StackConfiguration;
use statping_common::constants::DEFAULT_STACK_ID;
use statping_stack::statping::StatpingStack;

use crate::profiles::Profile;

/// statping: Render the Statping deployment stack.
#[derive(Parser, Debug)]
#[command(name = "statping", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute. Defaults to `synth` with the open profile.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the CloudFormation template.
    Synth(synth::SynthArgs),
    /// List the resources in the order they will be created.
    Plan(plan::PlanArgs),
    /// Load and default a configuration file.
    Validate(validate::ValidateArgs),
}

/// Flags that select which stack to declare.
#[derive(Args, Debug, Default)]
pub struct StackArgs {
    /// Built-in profile, ignored when `--config` is given.
    #[arg(long, value_enum, default_value_t = Profile::Open)]
    pub profile: Profile,

    /// YAML or JSON configuration file.
    #[arg(long, env = "STATPING_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stack id, used as a prefix for construct names.
    #[arg(long)]
    pub stack_id: Option<String>,
}

impl StackArgs {
    /// The stack id to declare under.
    #[must_use]
    pub fn stack_id(&self) -> &str {
        self.stack_id.as_deref().unwrap_or(DEFAULT_STACK_ID)
    }

    /// Reads the configuration file or falls back to the profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded.
    pub fn configuration(&self) -> anyhow::Result<StackConfiguration> {
        match &self.config {
            Some(path) => StackConfiguration::load(path)
                .with_context(|| format!("failed to load configuration from {}", path.display())),
            None => {
                tracing::debug!(profile = ?self.profile, "using built-in profile");
                self.profile.configuration()
            }
        }
    }

    /// Declares the selected stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or the stack
    /// cannot be declared.
    pub fn declare(&self) -> anyhow::Result<StatpingStack> {
        let config = self.configuration()?;
        StatpingStack::new(self.stack_id(), config)
            .with_context(|| format!("failed to declare stack {}", self.stack_id()))
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Command::Synth(args)) => synth::execute(&args),
        Some(Command::Plan(args)) => plan::execute(&args),
        Some(Command::Validate(args)) => validate::execute(&args),
        None => synth::execute(&synth::SynthArgs::default()),
    }
}
