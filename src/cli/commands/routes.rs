use serde_json::{json, Value};

use crate::api::{Permission, RouteTable};
use crate::cli::utils::output_table;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::handlers::route_table;

fn permission_label(permission: Permission) -> &'static str {
    match permission.capability() {
        Some(cap) => cap.as_str(),
        None => "public",
    }
}

fn describe(table: &RouteTable, base: &str) -> Vec<Value> {
    table
        .iter()
        .map(|spec| {
            json!({
                "methods": spec.methods.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
                "path": format!("{}/{}", base, spec.display_path()),
                "permission": permission_label(spec.permission),
                "args": spec.args.iter().map(|a| a.name).collect::<Vec<_>>(),
            })
        })
        .collect()
}

pub fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let base = config().route_base();
    let table = route_table();

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&describe(&table, &base))?);
        }
        OutputFormat::Text => {
            let rows: Vec<Vec<String>> = table
                .iter()
                .map(|spec| {
                    vec![
                        spec.methods.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(","),
                        format!("{}/{}", base, spec.display_path()),
                        permission_label(spec.permission).to_string(),
                    ]
                })
                .collect();
            output_table(&["METHODS", "PATH", "PERMISSION"], &rows);
            println!("\n{} routes", table.len());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_every_route() {
        let table = route_table();
        let described = describe(&table, "/WPNakama/v1");
        assert_eq!(described.len(), table.len());
        assert!(described
            .iter()
            .any(|r| r["path"] == "/WPNakama/v1/boards/{board_id}" && r["permission"] == "public"));
        assert!(described
            .iter()
            .any(|r| r["path"] == "/WPNakama/v1/uniquecards" && r["permission"] == "delete_posts"));
    }
}
