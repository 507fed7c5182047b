//! `portico validate` - check settings without starting the server.
//!
//! Resolves settings exactly as `run` would, builds the route table,
//! loads TLS material and parses the listen address, reporting results in
//! either human-readable text or machine-readable JSON format.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::{self, validation};
use crate::error::PorticoError;
use crate::routing::RouteTable;
use crate::tls;

pub fn execute(args: &ValidateArgs) -> Result<(), PorticoError> {
    let settings = config::load(&args.config)?;

    let routes = match RouteTable::build(&settings.routes) {
        Ok(routes) => routes,
        Err(PorticoError::ConfigValidation { errors }) => {
            match args.format {
                ValidateFormat::Text => {
                    eprintln!("\u{2717} {} route errors\n", errors.len());
                    for error in &errors {
                        eprintln!("{error}");
                    }
                }
                ValidateFormat::Json => {
                    let json_errors: Vec<serde_json::Value> = errors
                        .iter()
                        .map(|e| {
                            serde_json::json!({
                                "route": e.route,
                                "field": e.field,
                                "message": e.message,
                                "suggestion": e.suggestion,
                            })
                        })
                        .collect();
                    println!(
                        "{}",
                        serde_json::json!({
                            "valid": false,
                            "errors": json_errors,
                        })
                    );
                }
            }
            return Err(PorticoError::ConfigValidation { errors });
        }
        Err(e) => return Err(e),
    };

    let tls = tls::load(&settings.tls)?;
    let addr = validation::resolve_listen_addr(&settings.listen)?;

    match args.format {
        ValidateFormat::Text => {
            println!(
                "\u{2713} {} routes, listening on {addr}{}",
                routes.len(),
                if tls.is_some() { " (TLS)" } else { "" }
            );
            for route in routes.routes() {
                println!("  {route}");
            }
        }
        ValidateFormat::Json => {
            let route_list: Vec<String> = routes.routes().iter().map(ToString::to_string).collect();
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "listen": addr.to_string(),
                    "tls": settings.tls.len(),
                    "routes": route_list,
                })
            );
        }
    }

    Ok(())
}
