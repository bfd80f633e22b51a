//! Command-line client for the catalog API: PSU recommendations and update control

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use pc_power_catalog_lib::domain::component::{PowerRecord, PsuRecord};
use pc_power_catalog_lib::domain::recommendation::{
    DEFAULT_RECOMMENDATIONS, find_component, parse_watts, recommend_psus, required_wattage,
};

#[derive(Parser)]
#[command(name = "psu_advisor", about = "Pick a PSU for a CPU + GPU pair from the catalog API")]
struct Cli {
    /// Base URL of the catalog API
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    api: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend power supplies for a CPU and GPU (names are substring-matched)
    Recommend {
        #[arg(long)]
        cpu: String,
        #[arg(long)]
        gpu: String,
        /// Max PSUs to list
        #[arg(short = 'n', long, default_value_t = DEFAULT_RECOMMENDATIONS)]
        limit: usize,
    },
    /// Run a full catalog update and wait for it
    Update,
    /// Show when the catalog was last refreshed
    Status,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    success: bool,
    data: Vec<T>,
}

struct ApiClient {
    base: String,
    client: reqwest::Client,
}

impl ApiClient {
    fn new(base: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("psu_advisor/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn list<T: DeserializeOwned>(&self, component: &str) -> Result<Vec<T>> {
        let url = format!("{}/{}/", self.base, component);
        let response: ListResponse<T> = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()?
            .json()
            .await
            .with_context(|| format!("Unexpected response from {url}"))?;
        if !response.success {
            bail!("{url} reported failure");
        }
        Ok(response.data)
    }

    async fn send_json(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        let body: Value = response.json().await.context("Response is not JSON")?;
        if !status.is_success() {
            bail!("HTTP {status}: {}", body["detail"].as_str().unwrap_or("request failed"));
        }
        Ok(body)
    }
}

async fn recommend(api: &ApiClient, cpu: &str, gpu: &str, limit: usize) -> Result<()> {
    let (cpus, gpus, psus) = tokio::try_join!(
        api.list::<PowerRecord>("cpus"),
        api.list::<PowerRecord>("gpus"),
        api.list::<PsuRecord>("psus"),
    )?;

    let cpu = find_component(&cpus, cpu).with_context(|| format!("No CPU matching '{cpu}'"))?;
    let gpu = find_component(&gpus, gpu).with_context(|| format!("No GPU matching '{gpu}'"))?;
    let cpu_watts = parse_watts(&cpu.consumption);
    let gpu_watts = parse_watts(&gpu.consumption);
    let required = required_wattage(cpu_watts, gpu_watts);

    println!("CPU: {} ({} W)", cpu.name, cpu_watts);
    println!("GPU: {} ({} W)", gpu.name, gpu_watts);
    println!("Required PSU wattage: {required} W");

    let picks = recommend_psus(&psus, required, limit);
    if picks.is_empty() {
        println!("No PSU in the catalog covers {required} W");
    }
    for (rank, psu) in picks.iter().enumerate() {
        println!("{:>2}. {} ({} W)", rank + 1, psu.name, psu.wattage);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let api = ApiClient::new(&cli.api)?;

    match cli.command {
        Commands::Recommend { cpu, gpu, limit } => recommend(&api, &cpu, &gpu, limit).await,
        Commands::Update => {
            let url = format!("{}/parsing/force-update", api.base);
            let body = api.send_json(api.client.post(&url)).await?;
            println!("{}", body["message"].as_str().unwrap_or("update finished"));
            if body["success"].as_bool() != Some(true) {
                bail!("Update failed");
            }
            Ok(())
        }
        Commands::Status => {
            let url = format!("{}/parsing/status", api.base);
            let body = api.send_json(api.client.get(&url)).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
    }
}
