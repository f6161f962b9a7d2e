//! `statping validate`: Load and default a configuration file.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;
use statping_common::config::{ResolvedConfiguration, StackConfiguration};
use statping_common::constants::DEFAULT_STACK_ID;
use statping_stack::statping::StatpingStack;

/// Shown in place of the admin password.
const REDACTED: &str = "********";

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// YAML or JSON configuration file.
    #[arg(long)]
    pub config: PathBuf,

    /// Stack id the defaults are derived from.
    #[arg(long, default_value = DEFAULT_STACK_ID)]
    pub stack_id: String,
}

/// Executes the `validate` command.
///
/// Prints the resolved configuration as JSON, then declares the stack to
/// check that the layout fits.
///
/// # Errors
///
/// Returns an error if the file does not load, a mandatory field is missing,
/// or the stack cannot be declared.
pub fn execute(args: &ValidateArgs) -> anyhow::Result<()> {
    let config = StackConfiguration::load(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;
    let resolved = config.clone().resolve(&args.stack_id)?;
    println!("{}", render_resolved(&resolved)?);

    let stack = StatpingStack::new(&args.stack_id, config)?;
    let template = stack.synth()?;
    println!();
    println!(
        "Configuration valid: {} resource(s) for https://{}",
        template.resources.len(),
        stack.full_domain_name()
    );
    Ok(())
}

/// Renders the resolved configuration as JSON with the admin password
/// masked.
fn render_resolved(resolved: &ResolvedConfiguration) -> anyhow::Result<String> {
    let mut value = serde_json::to_value(resolved)?;
    if let Some(password) = value.get_mut("admin_password") {
        *password = serde_json::Value::from(REDACTED);
    }
    Ok(serde_json::to_string_pretty(&value)?)
}
