use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use resilience_gateway::config::ProviderConfigPatch;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the resilience gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the health report
    Health,
    /// Fetch comprehensive intelligence
    Intelligence,
    /// List provider settings and API health
    Providers,
    /// Clear cached responses, for one provider or all
    ClearCache { provider: Option<String> },
    /// Update a provider's settings
    SetProvider {
        name: String,
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        credential: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        rate_limit: Option<u32>,
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[arg(long)]
        retry_attempts: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", cli.url)).send().await?,
        Commands::Intelligence => client.get(format!("{}/intelligence", cli.url)).send().await?,
        Commands::Providers => client.get(format!("{}/providers", cli.url)).send().await?,
        Commands::ClearCache { provider } => {
            let path = match provider {
                Some(p) => format!("{}/admin/cache/{}", cli.url, p),
                None => format!("{}/admin/cache", cli.url),
            };
            client.delete(path).headers(headers).send().await?
        }
        Commands::SetProvider {
            name,
            enabled,
            credential,
            base_url,
            rate_limit,
            timeout_ms,
            retry_attempts,
        } => {
            let patch = ProviderConfigPatch {
                enabled,
                credential,
                base_url,
                rate_limit,
                timeout_ms,
                retry_attempts,
            };
            client
                .patch(format!("{}/admin/providers/{}", cli.url, name))
                .headers(headers)
                .json(&patch)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
