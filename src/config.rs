use crate::services::{
    connection::ConnectionParams,
    content_client::{ContextPolicy, ExecutionContext},
};
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt::Display, str::FromStr};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Gateway address and project credentials. Credentials come only from
    /// the environment and are not validated.
    pub gateway: ConnectionParams,
    pub execution_context: ExecutionContext,
    pub context_policy: ContextPolicy,
    /// Serve from an in-process network instead of the gateway.
    pub memory_network: bool,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Content-addressed file vault front-end")]
pub struct Args {
    /// Host to bind to (overrides CONTENT_VAULT_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CONTENT_VAULT_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Storage gateway host (overrides CONTENT_VAULT_GATEWAY_HOST)
    #[arg(long)]
    pub gateway_host: Option<String>,

    /// Storage gateway port (overrides CONTENT_VAULT_GATEWAY_PORT)
    #[arg(long)]
    pub gateway_port: Option<u16>,

    /// Storage gateway scheme, http or https (overrides CONTENT_VAULT_GATEWAY_PROTOCOL)
    #[arg(long)]
    pub gateway_protocol: Option<String>,

    /// Execution context, client or server (overrides CONTENT_VAULT_EXECUTION_CONTEXT)
    #[arg(long)]
    pub execution_context: Option<ExecutionContext>,

    /// Context policy, require-client or unrestricted (overrides CONTENT_VAULT_CONTEXT_POLICY)
    #[arg(long)]
    pub context_policy: Option<ContextPolicy>,

    /// Largest accepted upload body in bytes (overrides CONTENT_VAULT_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Use an in-process storage network instead of the gateway
    #[arg(long)]
    pub memory_network: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();
        Self::resolve(args, |key| env::var(key))
    }

    /// Merge `args` over values looked up through `var`.
    pub fn resolve<F>(args: Args, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        // --- Environment fallback ---
        let env_host = var("CONTENT_VAULT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_var(&var, "CONTENT_VAULT_PORT", 3000)?;
        let env_gateway_host =
            var("CONTENT_VAULT_GATEWAY_HOST").unwrap_or_else(|_| "ipfs.infura.io".into());
        let env_gateway_port = parse_var(&var, "CONTENT_VAULT_GATEWAY_PORT", 5001)?;
        let env_gateway_protocol =
            var("CONTENT_VAULT_GATEWAY_PROTOCOL").unwrap_or_else(|_| "https".into());
        let env_context = parse_var(
            &var,
            "CONTENT_VAULT_EXECUTION_CONTEXT",
            ExecutionContext::Client,
        )?;
        let env_policy = parse_var(
            &var,
            "CONTENT_VAULT_CONTEXT_POLICY",
            ContextPolicy::RequireClient,
        )?;
        let env_max_upload = parse_var(
            &var,
            "CONTENT_VAULT_MAX_UPLOAD_BYTES",
            DEFAULT_MAX_UPLOAD_BYTES,
        )?;
        let project_id = var("CONTENT_VAULT_PROJECT_ID").unwrap_or_default();
        let project_secret = var("CONTENT_VAULT_PROJECT_SECRET").unwrap_or_default();

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            gateway: ConnectionParams::new(
                args.gateway_host.unwrap_or(env_gateway_host),
                args.gateway_port.unwrap_or(env_gateway_port),
                args.gateway_protocol.unwrap_or(env_gateway_protocol),
                project_id,
                project_secret,
            ),
            execution_context: args.execution_context.unwrap_or(env_context),
            context_policy: args.context_policy.unwrap_or(env_policy),
            memory_network: args.memory_network,
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Result<String, env::VarError>,
{
    match var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|err| anyhow::anyhow!("{}", err))
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
