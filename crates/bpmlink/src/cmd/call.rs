use bpmlink_client::{CallDescriptor, DispatchPlan, DispatchTable, PassthroughProtocol, TableKind};
use tracing::info;

use crate::cmd::CallArgs;
use crate::exit::{client_error, CliError, CliResult, SUCCESS};
use crate::output::{print_results, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let mut plan = build_plan(&args)?;
    if plan.armed_count() == 0 {
        return Err(CliError::usage(
            "nothing to call: give at least one of --func, --get-var, --set-var, --curve",
        ));
    }

    let framed = args.connect.open()?;
    let mut protocol = PassthroughProtocol::new(framed);
    let results = plan
        .run(&mut protocol)
        .map_err(|err| client_error("call failed", err))?;

    info!(operations = results.len(), "call complete");
    print_results(&results, format);
    Ok(SUCCESS)
}

/// Variables run first, writes before reads, then functions, then curves.
/// Within a kind, command-line order is kept.
fn build_plan(args: &CallArgs) -> CliResult<DispatchPlan> {
    let mut plan = DispatchPlan::standard();

    let variables = plan.table_mut(TableKind::Variables);
    for var in &args.set_vars {
        add(variables, var.descriptor(), &var.value)?;
    }
    for var in &args.get_vars {
        add(variables, var.descriptor(), &[])?;
    }

    let functions = plan.table_mut(TableKind::Functions);
    for func in &args.funcs {
        add(functions, func.descriptor(), &func.input)?;
    }

    let curves = plan.table_mut(TableKind::Curves);
    for curve in &args.curves {
        add(curves, curve.descriptor(), &[])?;
    }

    Ok(plan)
}

fn add(
    table: &mut DispatchTable,
    descriptor: bpmlink_client::Result<CallDescriptor>,
    input: &[u8],
) -> CliResult<()> {
    let descriptor = descriptor.map_err(|err| client_error("invalid operation", err))?;
    let name = descriptor.name().to_string();
    table
        .push(descriptor)
        .map_err(|err| client_error("invalid operation", err))?;
    table
        .arm(&name, input)
        .map_err(|err| client_error("invalid operation", err))
}
