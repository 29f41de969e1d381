//! lfsctl CLI
//!
//! Command-line client for the candy-storage multi-tenant LFS service.
//!
//! # Usage
//!
//! ```bash
//! # Point the client at a deployment
//! lfsctl config set-endpoint https://lfs.example.com/api
//!
//! # Authenticate via the GitHub device flow
//! lfsctl login acme
//!
//! # Authorized operations against the current tenant
//! lfsctl repo list
//! lfsctl usage
//! ```

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lfsctl_core::{create_store, Coordinator, Error, SessionStore, TenantId};

mod output;

#[derive(Parser)]
#[command(name = "lfsctl")]
#[command(about = "Client for the candy-storage multi-tenant LFS service")]
#[command(version)]
struct Cli {
    /// Tenant to operate on (defaults to the selected tenant)
    #[arg(short, long, global = true)]
    tenant: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage client configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Log in to a tenant via the GitHub device flow
    Login {
        /// Tenant identifier
        tenant_id: String,
    },

    /// Log out of a tenant (the current one when omitted)
    Logout {
        /// Tenant identifier
        tenant_id: Option<String>,
    },

    /// Manage known tenants
    #[command(subcommand)]
    Tenant(TenantCommands),

    /// Manage repositories
    #[command(subcommand)]
    Repo(RepoCommands),

    /// Manage issued tokens
    #[command(subcommand)]
    Token(TokenCommands),

    /// Show the tenant usage summary
    Usage,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set the API endpoint URL
    SetEndpoint {
        /// Base URL of the storage service API
        url: String,
    },

    /// Show the current configuration
    Show,
}

#[derive(Subcommand)]
enum TenantCommands {
    /// Switch the current tenant
    Select {
        /// Tenant identifier
        tenant_id: String,
    },

    /// List known tenants
    List,

    /// Show server-side info about the tenant
    Info,

    /// Forget a tenant and its stored credentials
    Remove {
        /// Tenant identifier
        tenant_id: String,
    },
}

#[derive(Subcommand)]
enum RepoCommands {
    /// List repositories
    List,

    /// Create a repository
    Create {
        /// Repository name
        name: String,
    },

    /// Delete a repository
    Delete {
        /// Repository name
        name: String,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// List issued tokens
    List,

    /// Create a token, optionally scoped to one repository
    Create {
        /// Restrict the token to this repository
        #[arg(short, long)]
        repo: Option<String>,
    },

    /// Revoke an issued token by id
    Revoke {
        /// Token identifier
        token_id: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        output::report_error(&err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let session = SessionStore::load()?;
    let endpoint = session.api_endpoint()?;
    let store = create_store(true, (!endpoint.is_empty()).then_some(endpoint.as_str()));
    let coordinator = Coordinator::new(session, store);
    tracing::debug!(
        session = %coordinator.session().path().display(),
        "session directory loaded"
    );

    let tenant = cli.tenant.map(TenantId::new);

    match cli.command {
        Commands::Config(command) => run_config(&coordinator, command).await,
        Commands::Login { tenant_id } => login(&coordinator, TenantId::new(tenant_id)).await,
        Commands::Logout { tenant_id } => {
            let tenant = tenant_id.map(TenantId::new).or(tenant);
            let logged_out = coordinator.logout(tenant).await?;
            println!("✓ Logged out from tenant: {}", logged_out);
            Ok(())
        }
        Commands::Tenant(command) => run_tenant(&coordinator, command, tenant).await,
        Commands::Repo(command) => run_repo(&coordinator, command, tenant).await,
        Commands::Token(command) => run_token(&coordinator, command, tenant).await,
        Commands::Usage => {
            let client = coordinator.resolve_token(tenant).await?;
            output::print_json(&client.usage().await?);
            Ok(())
        }
    }
}

async fn run_config(coordinator: &Coordinator, command: ConfigCommands) -> Result<(), Error> {
    match command {
        ConfigCommands::SetEndpoint { url } => {
            coordinator.session().set_api_endpoint(&url)?;
            println!("✓ API endpoint set to: {}", url);
            Ok(())
        }
        ConfigCommands::Show => output::show_config(coordinator).await,
    }
}

async fn login(coordinator: &Coordinator, tenant: TenantId) -> Result<(), Error> {
    println!("Logging in to tenant: {}", tenant);

    let login = coordinator.login(tenant.clone(), |handshake| {
        println!();
        println!("→ Open this URL in your browser:");
        println!("  {}", handshake.verification_uri);
        println!();
        println!("→ Enter this code:");
        println!("  {}", handshake.user_code);
        println!();
        println!("Waiting for authorization (Ctrl-C to cancel)...");
    });

    // The poll loop has no deadline of its own; racing it against Ctrl-C
    // keeps an unapproved login killable.
    let grant = tokio::select! {
        result = login => result?,
        _ = tokio::signal::ctrl_c() => {
            return Err(Error::usage("Login cancelled"));
        }
    };

    println!(
        "✓ Logged in as {} ({})",
        grant.identity_username, grant.permission
    );
    match &grant.repo_names {
        Some(repos) => println!(
            "✓ Token stored for tenant {} ({} repo scopes)",
            tenant,
            repos.len()
        ),
        None => println!("✓ Token stored for tenant: {}", tenant),
    }
    Ok(())
}

async fn run_tenant(
    coordinator: &Coordinator,
    command: TenantCommands,
    tenant: Option<TenantId>,
) -> Result<(), Error> {
    match command {
        TenantCommands::Select { tenant_id } => {
            let tenant = TenantId::new(tenant_id);
            coordinator.select_tenant(&tenant)?;
            println!("✓ Switched to tenant: {}", tenant);
            Ok(())
        }
        TenantCommands::List => output::list_tenants(coordinator).await,
        TenantCommands::Info => {
            let client = coordinator.resolve_token(tenant).await?;
            output::print_json(&client.tenant_info().await?);
            Ok(())
        }
        TenantCommands::Remove { tenant_id } => {
            let tenant = TenantId::new(tenant_id);
            coordinator.remove_tenant(&tenant).await?;
            println!("✓ Removed tenant: {}", tenant);
            Ok(())
        }
    }
}

async fn run_repo(
    coordinator: &Coordinator,
    command: RepoCommands,
    tenant: Option<TenantId>,
) -> Result<(), Error> {
    let client = coordinator.resolve_token(tenant).await?;
    match command {
        RepoCommands::List => output::print_json(&client.list_repos().await?),
        RepoCommands::Create { name } => {
            output::print_json(&client.create_repo(&name).await?);
            println!("✓ Repository created: {}", name);
        }
        RepoCommands::Delete { name } => {
            client.delete_repo(&name).await?;
            println!("✓ Repository deleted: {}", name);
        }
    }
    Ok(())
}

async fn run_token(
    coordinator: &Coordinator,
    command: TokenCommands,
    tenant: Option<TenantId>,
) -> Result<(), Error> {
    let client = coordinator.resolve_token(tenant).await?;
    match command {
        TokenCommands::List => output::print_json(&client.list_tokens().await?),
        TokenCommands::Create { repo } => {
            output::print_json(&client.create_token(repo.as_deref()).await?)
        }
        TokenCommands::Revoke { token_id } => {
            client.delete_token(&token_id).await?;
            println!("✓ Token revoked: {}", token_id);
        }
    }
    Ok(())
}
