//! Rendering of upsd listings and single values for `--output`.
//!
//! Listings (devices, variables, commands, clients) become `tabled` rows or
//! serde documents. The plain view is line-oriented so it can be piped into
//! shell tools the way `upsc` output is.

use std::io::{self, Write};

use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a listing such as `LIST VAR` or `LIST UPS`.
///
/// `to_row` builds the table row for an entry; `plain_line` gives its line
/// in plain mode. JSON and YAML serialize the entries themselves.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    plain_line: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&plain_line).collect::<Vec<_>>().join("\n")),
    }
}

/// Render one answer (a variable, the server version, a login count).
///
/// The table view is the aligned `detail` text; plain mode prints only
/// the bare value from `value`.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail: impl Fn(&T) -> String,
    value: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(value(data)),
    }
}

/// Write rendered output to stdout unless `--quiet` was given.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(out)
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Item {
        name: String,
        value: String,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Name")]
        name: String,
    }

    fn items() -> Vec<Item> {
        vec![
            Item {
                name: "battery.charge".into(),
                value: "100".into(),
            },
            Item {
                name: "ups.status".into(),
                value: "OL".into(),
            },
        ]
    }

    fn render(format: &OutputFormat) -> String {
        render_list(
            format,
            &items(),
            |i| Row {
                name: i.name.clone(),
            },
            |i| i.value.clone(),
        )
        .unwrap()
    }

    #[test]
    fn plain_is_one_line_per_item() {
        assert_eq!(render(&OutputFormat::Plain), "100\nOL");
    }

    #[test]
    fn compact_json_is_one_line() {
        let out = render(&OutputFormat::JsonCompact);
        assert!(!out.contains('\n'));
        assert!(out.starts_with(r#"[{"name":"battery.charge""#));
    }

    #[test]
    fn table_has_header() {
        let out = render(&OutputFormat::Table);
        assert!(out.contains("Name"));
        assert!(out.contains("ups.status"));
    }

    #[test]
    fn single_value_plain_is_bare_and_table_is_detail() {
        let item = &items()[0];
        let detail = |i: &Item| format!("Variable: {}\nValue:    {}", i.name, i.value);
        let value = |i: &Item| i.value.clone();

        assert_eq!(
            render_single(&OutputFormat::Plain, item, detail, value).unwrap(),
            "100"
        );
        assert!(
            render_single(&OutputFormat::Table, item, detail, value)
                .unwrap()
                .starts_with("Variable: battery.charge")
        );
    }

    #[test]
    fn yaml_lists_fields() {
        assert!(render(&OutputFormat::Yaml).contains("value: OL"));
    }
}
