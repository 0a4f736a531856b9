//! Variable command handlers: vars, rw, get, set, enum, range.

use serde::Serialize;
use tabled::Tabled;

use nutlink_core::{Listing, Session, VarType};

use crate::cli::{GetArgs, GlobalOpts, SetArgs, VarArgs};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct VarEntry {
    name: String,
    value: String,
}

#[derive(Tabled)]
struct VarRow {
    #[tabled(rename = "Variable")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&VarEntry> for VarRow {
    fn from(v: &VarEntry) -> Self {
        Self {
            name: v.name.clone(),
            value: v.value.clone(),
        }
    }
}

#[derive(Serialize)]
struct VarDetail {
    device: String,
    name: String,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    var_type: Option<VarType>,
}

fn detail(v: &VarDetail) -> String {
    let mut lines = vec![
        format!("Device:      {}", v.device),
        format!("Variable:    {}", v.name),
        format!("Value:       {}", v.value),
    ];
    if let Some(ref description) = v.description {
        lines.push(format!("Description: {description}"));
    }
    if let Some(ref var_type) = v.var_type {
        lines.push(format!("Type:        {var_type}"));
    }
    lines.join("\n")
}

#[derive(Tabled)]
struct ValueRow {
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct RangeEntry {
    min: String,
    max: String,
}

#[derive(Tabled)]
struct RangeRow {
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
}

// ── Handlers ────────────────────────────────────────────────────────

pub fn list(session: &mut Session, device: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let vars = session.list_variables(device)?;
    print_vars(vars, global)
}

pub fn list_rw(session: &mut Session, device: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let vars = session.list_rw_variables(device)?;
    print_vars(vars, global)
}

fn print_vars(vars: Listing, global: &GlobalOpts) -> Result<(), CliError> {
    let entries: Vec<VarEntry> = vars
        .into_iter()
        .map(|(name, value)| VarEntry { name, value })
        .collect();

    // Plain output matches `upsc`: "name: value" per line.
    let out = output::render_list(
        &global.output,
        &entries,
        |v| VarRow::from(v),
        |v| format!("{}: {}", v.name, v.value),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn get(session: &mut Session, args: &GetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let value = session.get_variable(&args.device, &args.var)?;
    let (description, var_type) = if args.long {
        let description = session.client()?.var_description(&args.device, &args.var)?;
        let var_type = session.variable_type(&args.device, &args.var)?;
        (Some(description), Some(var_type))
    } else {
        (None, None)
    };

    let var = VarDetail {
        device: args.device.clone(),
        name: args.var.clone(),
        value,
        description,
        var_type,
    };
    let out = output::render_single(&global.output, &var, detail, |v| v.value.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn set(session: &mut Session, args: &SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    session.set_variable(&args.device, &args.var, &args.value)?;
    if !global.quiet {
        eprintln!("{} set on {}", args.var, args.device);
    }
    Ok(())
}

pub fn list_enum(
    session: &mut Session,
    args: &VarArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let values = session.list_enum(&args.device, &args.var)?;
    let out = output::render_list(
        &global.output,
        &values,
        |v| ValueRow { value: v.clone() },
        String::clone,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn list_range(
    session: &mut Session,
    args: &VarArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let ranges: Vec<RangeEntry> = session
        .list_range(&args.device, &args.var)?
        .into_iter()
        .map(|(min, max)| RangeEntry { min, max })
        .collect();

    let out = output::render_list(
        &global.output,
        &ranges,
        |r| RangeRow {
            min: r.min.clone(),
            max: r.max.clone(),
        },
        |r| format!("{} {}", r.min, r.max),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
