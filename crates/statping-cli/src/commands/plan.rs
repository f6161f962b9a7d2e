//! `statping plan`: List resources in the order they will be created.

use clap::Args;
use statping_stack::graph::ResourceGraph;

use super::StackArgs;
use crate::output;

/// Arguments for the `plan` command.
#[derive(Args, Debug, Default)]
pub struct PlanArgs {
    /// Stack selection.
    #[command(flatten)]
    pub stack: StackArgs,
}

/// Executes the `plan` command.
///
/// Declares the stack, builds the resource graph, resolves topological
/// order, and displays each resource with its direct dependencies.
///
/// # Errors
///
/// Returns an error if the stack cannot be declared or the graph does not
/// resolve.
pub fn execute(args: &PlanArgs) -> anyhow::Result<()> {
    let stack = args.stack.declare()?;
    let template = stack.synth()?;
    let graph = ResourceGraph::from_template(&template)?;
    let order = graph.resolve_order()?;

    println!("Deployment Plan for: {} ({})", args.stack.stack_id(), stack.full_domain_name());
    println!("{}", "\u{2550}".repeat(35));
    println!();

    for id in &order {
        if let Some(resource) = template.resource(id) {
            println!("  + {id}");
            println!("      type: {}", output::short_type(&resource.resource_type));
            println!(
                "      after: {}",
                output::format_dependencies(&graph.dependencies_of(id))
            );
        }
    }

    println!();
    println!("{}", output::format_type_counts(&template.type_counts()));

    if !template.outputs.is_empty() {
        println!();
        println!("  Outputs:");
        for name in template.outputs.keys() {
            println!("    {name}");
        }
    }

    Ok(())
}
