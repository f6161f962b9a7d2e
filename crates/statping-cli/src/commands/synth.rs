//! `statping synth`: Render the CloudFormation template.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Args, ValueEnum};

use super::StackArgs;
use crate::output;

/// Template serialization format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// YAML.
    Yaml,
}

/// Arguments for the `synth` command.
#[derive(Args, Debug, Default)]
pub struct SynthArgs {
    /// Stack selection.
    #[command(flatten)]
    pub stack: StackArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Json)]
    pub format: Format,

    /// Write the template to this file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Executes the `synth` command.
///
/// # Errors
///
/// Returns an error if the stack cannot be declared, fails validation, or
/// the template cannot be written.
pub fn execute(args: &SynthArgs) -> anyhow::Result<()> {
    let rendered = render(args)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write template to {}", path.display()))?;
            tracing::info!(path = %path.display(), "template written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn render(args: &SynthArgs) -> anyhow::Result<String> {
    let stack = args.stack.declare()?;
    let template = stack.synth()?;
    tracing::info!(
        stack = args.stack.stack_id(),
        domain = %stack.full_domain_name(),
        "rendering template\n{}",
        output::format_type_counts(&template.type_counts())
    );
    let rendered = match args.format {
        Format::Json => template.to_json_pretty()?,
        Format::Yaml => template.to_yaml()?,
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_json_template_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("template.json");
        execute(&SynthArgs {
            output: Some(path.clone()),
            ..SynthArgs::default()
        })
        .expect("synth");

        let content = std::fs::read_to_string(&path).expect("read");
        let template: serde_json::Value = serde_json::from_str(&content).expect("json");
        assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
        assert!(template["Resources"].as_object().expect("resources").len() > 30);
    }

    #[test]
    fn renders_yaml() {
        let rendered = render(&SynthArgs {
            format: Format::Yaml,
            ..SynthArgs::default()
        })
        .expect("render");
        assert!(rendered.contains("AWSTemplateFormatVersion"));
        assert!(rendered.contains("AWS::ECS::Service"));
    }

    #[test]
    fn restricted_profile_renders_single_address() {
        let rendered = render(&SynthArgs {
            stack: StackArgs {
                profile: crate::profiles::Profile::Restricted,
                ..StackArgs::default()
            },
            ..SynthArgs::default()
        })
        .expect("render");
        assert!(rendered.contains("203.0.113.10/32"));
        assert!(!rendered.contains("0.0.0.0/16"));
    }
}
