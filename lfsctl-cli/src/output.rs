//! Terminal presentation helpers.

use lfsctl_core::model::SecretKind;
use lfsctl_core::store::find_token;
use lfsctl_core::{Coordinator, Error};

/// Print a pass-through API response as pretty JSON.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{}", rendered),
        Err(_) => println!("{}", value),
    }
}

/// Report a failure to stderr in a user-facing shape.
///
/// Remote errors carry their status and detail map; usage errors print as
/// plain guidance.
pub fn report_error(err: &Error) {
    match err {
        Error::Usage { message } => eprintln!("✗ {}", message),
        Error::Api(api) => {
            eprintln!("✗ {}", api.message);
            if api.status != 0 {
                eprintln!("  Status code: {}", api.status);
            }
            if !api.details.is_empty() {
                eprintln!(
                    "  Details: {}",
                    serde_json::Value::Object(api.details.clone())
                );
            }
        }
        other => eprintln!("✗ {}", other),
    }
}

/// Show the endpoint, the current tenant, and the known tenant table.
pub async fn show_config(coordinator: &Coordinator) -> Result<(), Error> {
    let session = coordinator.session();

    let endpoint = session.api_endpoint()?;
    if endpoint.is_empty() {
        println!("API endpoint: (not set)");
    } else {
        println!("API endpoint: {}", endpoint);
    }
    match session.current_tenant()? {
        Some(tenant) => println!("Current tenant: {}", tenant),
        None => println!("Current tenant: (none)"),
    }

    if !session.tenants()?.is_empty() {
        println!();
        println!("Known tenants:");
        list_tenants(coordinator).await?;
    }
    Ok(())
}

/// Print the known tenant list with role and token presence.
pub async fn list_tenants(coordinator: &Coordinator) -> Result<(), Error> {
    let session = coordinator.session();
    let current = session.current_tenant()?;
    let tenants = session.tenants()?;

    if tenants.is_empty() {
        println!("No known tenants. Use 'lfsctl login <tenant>' first.");
        return Ok(());
    }

    println!("{:<2} {:<20} {:<20} {:<10} TOKEN", "", "TENANT", "NAME", "ROLE");
    for record in tenants {
        let marker = if current.as_ref() == Some(&record.tenant_id) {
            "*"
        } else {
            ""
        };
        let has_token = find_token(
            coordinator.secrets(),
            SecretKind::SessionToken,
            &record.tenant_id,
        )
        .await?
        .is_some();
        println!(
            "{:<2} {:<20} {:<20} {:<10} {}",
            marker,
            record.tenant_id,
            record.name,
            record.role,
            if has_token { "✓" } else { "✗" }
        );
    }
    Ok(())
}
