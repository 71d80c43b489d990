use std::time::Duration;

use bulkhook_core::FetchPolicy;
use bulkhook_core::impls::shopify::DEFAULT_API_VERSION;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bulkhook", version, about = "Webhook-driven bulk operation ingestion")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one fetch against a scripted in-memory platform
    Demo(DemoArgs),
    /// Serve the completion webhook and the export routes for one store
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct DemoArgs {
    /// Number of records in the scripted result file
    #[arg(long, default_value_t = 5)]
    pub records: u32,
    /// How many times the operation reports RUNNING after a notification
    #[arg(long, default_value_t = 1)]
    pub spurious_wakes: u32,
    /// Delay between simulated completion webhooks
    #[arg(long, default_value_t = 200)]
    pub notify_delay_ms: u64,
    #[command(flatten)]
    pub policy: PolicyArgs,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Store domain, e.g. example.myshopify.com
    #[arg(long, env = "SHOPIFY_SHOP")]
    pub shop: String,
    /// Admin API access token
    #[arg(long, env = "SHOPIFY_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,
    #[arg(long, env = "SHOPIFY_API_VERSION", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,
    /// Public URL of `/query_finished`; when set the bulk_operations/finish
    /// webhook is registered at startup
    #[arg(long, env = "WEBHOOK_QUERY_FINISHED_URL")]
    pub callback_url: Option<String>,
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,
    #[command(flatten)]
    pub policy: PolicyArgs,
}

#[derive(Debug, Clone, Args)]
pub struct PolicyArgs {
    /// Upper bound for each wait (tenant gate, completion notification)
    #[arg(long, default_value_t = 600_000)]
    pub wait_timeout_ms: u64,
    /// Status checks allowed per fetch
    #[arg(long, default_value_t = 10)]
    pub max_status_checks: u32,
}

impl From<PolicyArgs> for FetchPolicy {
    fn from(args: PolicyArgs) -> Self {
        FetchPolicy::new(
            Duration::from_millis(args.wait_timeout_ms),
            args.max_status_checks,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_defaults() {
        let cli = Cli::try_parse_from(["bulkhook", "demo"]).unwrap();
        match cli.command {
            Command::Demo(args) => {
                assert_eq!(args.records, 5);
                assert_eq!(args.spurious_wakes, 1);
                let policy: FetchPolicy = args.policy.into();
                assert_eq!(policy, FetchPolicy::default());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_reads_flags() {
        let cli = Cli::try_parse_from([
            "bulkhook",
            "serve",
            "--shop",
            "a.myshopify.com",
            "--access-token",
            "shpat_x",
            "--port",
            "8080",
            "--max-status-checks",
            "3",
        ])
        .unwrap();
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.shop, "a.myshopify.com");
                assert_eq!(args.port, 8080);
                assert_eq!(args.policy.max_status_checks, 3);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
