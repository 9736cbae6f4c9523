//! Identity provider administration CLI.
//!
//! Talks to a running `idp-admin` server over its admin API to manage OAuth
//! clients and user accounts. Mutating commands fetch an anti-forgery token
//! from `/api/admin/csrf` first and send it in the `X-CSRF-Token` header.
//!
//! ## Usage Examples
//!
//! ```bash
//! idp-admin-cli --base-url http://localhost:8080 clients create \
//!   --name "CLI Tool" \
//!   --redirect-uri "http://localhost:9000/cb" \
//!   --grant-type authorization_code \
//!   --response-type code \
//!   --scope openid --scope profile
//!
//! idp-admin-cli clients update --client-id "<id>" --name "Renamed"
//! idp-admin-cli users create --username alice --role admin --password "..."
//! idp-admin-cli users delete --id "<id>" --yes
//! idp-admin-cli stats
//! ```
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error (network, parsing, etc.)
//! - 2: Administration request rejected by the server
//! - 3: Anti-forgery or authorization failure

use clap::{Args, Parser, Subcommand, ValueEnum};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::process;

const CSRF_HEADER: &str = "X-CSRF-Token";

#[derive(Parser)]
#[command(
    name = "idp-admin-cli",
    about = "Identity provider administration CLI",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Base URL of the admin server
    #[arg(long, env = "IDP_ADMIN_BASE_URL", default_value = "http://localhost:8080")]
    base_url: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "json-pretty")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Json,
    JsonPretty,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage OAuth clients
    #[command(subcommand)]
    Clients(ClientCommands),
    /// Manage user accounts
    #[command(subcommand)]
    Users(UserCommands),
    /// Show dashboard counters
    Stats,
    /// Show recent audit events
    Audit,
}

#[derive(Subcommand)]
enum ClientCommands {
    List,
    Get(ClientIdArgs),
    Create(CreateClientArgs),
    Update(UpdateClientArgs),
    Delete(DeleteClientArgs),
}

#[derive(Subcommand)]
enum UserCommands {
    List,
    Get(UserIdArgs),
    Create(CreateUserArgs),
    Update(UpdateUserArgs),
    Delete(DeleteUserArgs),
}

#[derive(Args)]
struct ClientIdArgs {
    #[arg(long)]
    client_id: String,
}

#[derive(Args)]
struct CreateClientArgs {
    #[arg(long)]
    name: String,

    #[arg(long = "redirect-uri", help = "Redirect URI (repeatable)")]
    redirect_uris: Vec<String>,

    #[arg(long = "grant-type", help = "Grant type (repeatable)")]
    grant_types: Vec<String>,

    #[arg(long = "response-type", help = "Response type (repeatable)")]
    response_types: Vec<String>,

    #[arg(long = "scope", help = "Scope (repeatable)")]
    scopes: Vec<String>,

    #[arg(long)]
    jwks_url: Option<String>,
}

#[derive(Args)]
struct UpdateClientArgs {
    #[arg(long)]
    client_id: String,

    #[arg(long)]
    name: Option<String>,

    #[arg(
        long = "redirect-uri",
        help = "Redirect URI (repeatable; replaces all existing URIs)"
    )]
    redirect_uris: Vec<String>,

    #[arg(
        long = "grant-type",
        help = "Grant type (repeatable; replaces all existing grant types)"
    )]
    grant_types: Vec<String>,

    #[arg(
        long = "response-type",
        help = "Response type (repeatable; replaces all existing response types)"
    )]
    response_types: Vec<String>,

    #[arg(long = "scope", help = "Scope (repeatable; replaces all existing scopes)")]
    scopes: Vec<String>,

    #[arg(long, help = "JWKS URL (an empty value clears it)")]
    jwks_url: Option<String>,
}

#[derive(Args)]
struct DeleteClientArgs {
    #[arg(long)]
    client_id: String,

    #[arg(long, help = "Skip the confirmation prompt")]
    yes: bool,
}

#[derive(Args)]
struct UserIdArgs {
    #[arg(long)]
    id: String,
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long)]
    username: String,

    #[arg(long, env = "IDP_ADMIN_USER_PASSWORD", hide_env_values = true)]
    password: String,

    #[arg(long, default_value = "user")]
    role: String,
}

#[derive(Args)]
struct UpdateUserArgs {
    #[arg(long)]
    id: String,

    #[arg(long)]
    username: Option<String>,

    #[arg(long, env = "IDP_ADMIN_USER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long)]
    role: Option<String>,
}

#[derive(Args)]
struct DeleteUserArgs {
    #[arg(long)]
    id: String,

    #[arg(long, help = "Skip the confirmation prompt")]
    yes: bool,
}

#[derive(Debug, Serialize)]
struct ClientCreateRequest<'a> {
    name: &'a str,
    redirect_uris: &'a [String],
    grant_types: &'a [String],
    response_types: &'a [String],
    scopes: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    jwks_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ClientUpdateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uris: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grant_types: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_types: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scopes: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    jwks_url: Option<&'a str>,
}

#[derive(Serialize)]
struct UserCreateRequest<'a> {
    username: &'a str,
    password: &'a str,
    role: &'a str,
}

#[derive(Serialize)]
struct UserUpdateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Authorization error: {0}")]
    Authorization(String),
    #[error("Error: {0}")]
    General(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Network(_) | AppError::Json(_) | AppError::General(_) => 1,
            AppError::Rejected(_) => 2,
            AppError::Authorization(_) => 3,
        }
    }
}

/// Thin wrapper over the admin API
struct AdminApi<'a> {
    cli: &'a Cli,
    http: Client,
}

impl<'a> AdminApi<'a> {
    fn new(cli: &'a Cli) -> Self {
        Self {
            cli,
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/api/admin{}",
            self.cli.base_url.trim_end_matches('/'),
            path
        )
    }

    async fn csrf_token(&self) -> Result<String, AppError> {
        let response = self.http.get(self.url("/csrf")).send().await?;
        if response.status() != StatusCode::OK {
            return Err(AppError::Authorization(format!(
                "Could not obtain CSRF token (status {})",
                response.status()
            )));
        }
        let body: Value = response.json().await?;
        body.get("csrf_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::General("CSRF response missing csrf_token".to_string()))
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, AppError> {
        let mutating = method != Method::GET;
        let mut builder = self.http.request(method.clone(), self.url(path));
        if mutating {
            builder = builder.header(CSRF_HEADER, self.csrf_token().await?);
        }
        if self.cli.verbose {
            eprintln!("{} {}", method, self.url(path));
        }
        Ok(builder)
    }

    /// Send a request and decode the JSON body, if any
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Option<Value>, AppError> {
        let mut builder = self.request(method, path).await?;
        if let Some(body) = body {
            if self.cli.verbose {
                eprintln!("Request: {}", serde_json::to_string_pretty(&body)?);
            }
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if self.cli.verbose {
            eprintln!("Response status: {}", status);
        }

        match status {
            StatusCode::NO_CONTENT => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            StatusCode::FORBIDDEN => Err(AppError::Authorization(response.text().await?)),
            status => {
                let error_text = response.text().await?;
                Err(AppError::Rejected(format!(
                    "status {}: {}",
                    status, error_text
                )))
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(&cli).await {
        eprintln!("{}", err);
        process::exit(err.exit_code());
    }
}

async fn run(cli: &Cli) -> Result<(), AppError> {
    let api = AdminApi::new(cli);

    let output = match &cli.command {
        Commands::Clients(command) => run_client_command(&api, command).await?,
        Commands::Users(command) => run_user_command(&api, command).await?,
        Commands::Stats => api.send(Method::GET, "/stats", None).await?,
        Commands::Audit => api.send(Method::GET, "/audit", None).await?,
    };

    if let Some(value) = output {
        output_response(&cli.format, &value)?;
    }
    Ok(())
}

async fn run_client_command(
    api: &AdminApi<'_>,
    command: &ClientCommands,
) -> Result<Option<Value>, AppError> {
    match command {
        ClientCommands::List => api.send(Method::GET, "/clients", None).await,
        ClientCommands::Get(args) => {
            api.send(Method::GET, &format!("/clients/{}", args.client_id), None)
                .await
        }
        ClientCommands::Create(args) => {
            let request = ClientCreateRequest {
                name: &args.name,
                redirect_uris: &args.redirect_uris,
                grant_types: &args.grant_types,
                response_types: &args.response_types,
                scopes: &args.scopes,
                jwks_url: args.jwks_url.as_deref(),
            };
            api.send(Method::POST, "/clients", Some(serde_json::to_value(&request)?))
                .await
        }
        ClientCommands::Update(args) => {
            let request = ClientUpdateRequest {
                name: args.name.as_deref(),
                redirect_uris: non_empty(&args.redirect_uris),
                grant_types: non_empty(&args.grant_types),
                response_types: non_empty(&args.response_types),
                scopes: non_empty(&args.scopes),
                jwks_url: args.jwks_url.as_deref(),
            };
            api.send(
                Method::PUT,
                &format!("/clients/{}", args.client_id),
                Some(serde_json::to_value(&request)?),
            )
            .await
        }
        ClientCommands::Delete(args) => {
            if !args.yes && !confirm(&format!("client '{}'", args.client_id))? {
                println!("Deletion cancelled.");
                return Ok(None);
            }
            api.send(Method::DELETE, &format!("/clients/{}", args.client_id), None)
                .await?;
            println!("Client '{}' deleted successfully.", args.client_id);
            Ok(None)
        }
    }
}

async fn run_user_command(
    api: &AdminApi<'_>,
    command: &UserCommands,
) -> Result<Option<Value>, AppError> {
    match command {
        UserCommands::List => api.send(Method::GET, "/users", None).await,
        UserCommands::Get(args) => {
            api.send(Method::GET, &format!("/users/{}", args.id), None)
                .await
        }
        UserCommands::Create(args) => {
            let request = UserCreateRequest {
                username: &args.username,
                password: &args.password,
                role: &args.role,
            };
            api.send(Method::POST, "/users", Some(serde_json::to_value(&request)?))
                .await
        }
        UserCommands::Update(args) => {
            let request = UserUpdateRequest {
                username: args.username.as_deref(),
                password: args.password.as_deref(),
                role: args.role.as_deref(),
            };
            api.send(
                Method::PUT,
                &format!("/users/{}", args.id),
                Some(serde_json::to_value(&request)?),
            )
            .await
        }
        UserCommands::Delete(args) => {
            if !args.yes && !confirm(&format!("user '{}'", args.id))? {
                println!("Deletion cancelled.");
                return Ok(None);
            }
            api.send(Method::DELETE, &format!("/users/{}", args.id), None)
                .await?;
            println!("User '{}' deleted successfully.", args.id);
            Ok(None)
        }
    }
}

fn non_empty(values: &[String]) -> Option<&[String]> {
    if values.is_empty() { None } else { Some(values) }
}

fn confirm(target: &str) -> Result<bool, AppError> {
    println!("Are you sure you want to delete {}? (y/N)", target);
    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| AppError::General(format!("Failed to read confirmation: {}", e)))?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

fn output_response(format: &OutputFormat, data: &Value) -> Result<(), AppError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(data)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFormat::Table => print_table(data, 0),
    }
    Ok(())
}

fn print_table(value: &Value, indent: usize) {
    let prefix = "  ".repeat(indent);

    match value {
        Value::Object(map) => {
            for (key, val) in map {
                match val {
                    Value::Object(_) | Value::Array(_) => {
                        println!("{}{}:", prefix, key);
                        print_table(val, indent + 1);
                    }
                    _ => println!("{}{}: {}", prefix, key, format_value(val)),
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                println!("{}[{}]:", prefix, i);
                print_table(item, indent + 1);
            }
        }
        _ => println!("{}{}", prefix, format_value(value)),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_else(|_| "invalid".to_string()),
    }
}
