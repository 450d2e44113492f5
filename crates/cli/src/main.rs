use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use mpx_api::{HttpMethod, HttpRequest};
use mpx_registry::RegistryConfig;
use mpx_types::ServiceType;
use mpx_util::{MpxClient, Query};
use serde_json::{Map, Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mpx", version, about = "Inspect and call mpx platform services")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List cataloged services.
    Services {
        /// Only services of this type (web, data, ingest).
        #[arg(long = "type")]
        service_type: Option<ServiceType>,
    },
    /// Show the service and endpoint a reference URL belongs to.
    Reference { url: String },
    /// Print the request path of an endpoint.
    Path {
        #[arg(long)]
        service: String,
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        extra_path: Option<String>,
        /// Short ids appended to the feed path.
        #[arg(long = "id")]
        ids: Vec<String>,
    },
    /// Print the data request that `get` would send, token redacted.
    Query(QueryArgs),
    /// Run a data service query and print the page.
    Get(QueryArgs),
    /// Resolve and print the service URLs of an account.
    Resolve { account: String },
}

#[derive(Debug, Args)]
struct QueryArgs {
    #[arg(long)]
    service: String,
    #[arg(long)]
    endpoint: String,
    #[arg(long)]
    account: Option<String>,
    #[arg(long)]
    fields: Option<String>,
    #[arg(long)]
    range: Option<String>,
    #[arg(long)]
    sort: Option<String>,
    /// Ask for the total result count.
    #[arg(long)]
    count: bool,
    #[arg(long = "id")]
    ids: Vec<String>,
    /// Extra query parameters as `key=value`; applied last.
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

impl QueryArgs {
    fn to_query(&self) -> Query {
        let mut query = Query::new(&self.service, &self.endpoint);
        query.account = self.account.clone();
        query.fields = self.fields.clone();
        query.range = self.range.clone();
        query.sort = self.sort.clone();
        query.return_count = self.count;
        query.ids = self.ids.clone();
        for (key, value) in &self.params {
            query.query.insert(key.clone(), Value::String(value.clone()));
        }
        query
    }
}

fn parse_param(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("expected key=value, got '{raw}'"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Services { service_type } => list_services(service_type),
        Command::Reference { url } => show_reference(&url),
        Command::Path {
            service,
            endpoint,
            extra_path,
            ids,
        } => show_path(&service, &endpoint, extra_path.as_deref(), &ids),
        Command::Query(args) => show_query(&args).await,
        Command::Get(args) => run_get(&args).await,
        Command::Resolve { account } => resolve(&account).await,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .try_init();
}

/// `RUST_LOG` when set and valid, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn list_services(service_type: Option<ServiceType>) -> Result<()> {
    let config = RegistryConfig::load()?;
    let catalog = config.load_catalog().context("load service catalog")?;
    let services: Vec<Value> = catalog
        .iter()
        .filter(|service| service_type.is_none_or(|wanted| service.service_type == wanted))
        .map(|service| {
            json!({
                "name": service.name,
                "type": service.service_type.as_str(),
                "path": service.path_segment,
                "schema": service.schema_version,
                "readOnly": service.read_only,
                "endpoints": service.endpoints.iter().map(|endpoint| endpoint.name.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&services)?);
    Ok(())
}

fn show_reference(url: &str) -> Result<()> {
    let config = RegistryConfig::load()?;
    let catalog = config.load_catalog().context("load service catalog")?;
    let target = catalog.resolve_reference(url)?;
    println!("{}\t{}", target.service, target.endpoint);
    Ok(())
}

fn show_path(service: &str, endpoint: &str, extra_path: Option<&str>, ids: &[String]) -> Result<()> {
    let client = MpxClient::from_env()?;
    let path = client.assembler().path(service, endpoint, extra_path, ids, None)?;
    println!("{path}");
    Ok(())
}

async fn show_query(args: &QueryArgs) -> Result<()> {
    let client = MpxClient::from_env()?;
    client
        .resolve_domain(args.account.as_deref())
        .await
        .context("resolve account domain")?;
    let request = client.data_request(HttpMethod::Get, &args.to_query().params())?;
    println!("{}", serde_json::to_string_pretty(&render_request(&request))?);
    Ok(())
}

async fn run_get(args: &QueryArgs) -> Result<()> {
    let client = MpxClient::from_env()?;
    let mut query = args.to_query();
    let page = query.run(&client).await?;
    debug!(entries = page.len(), "query returned");
    println!("{}", page.to_json(true)?);
    Ok(())
}

async fn resolve(account: &str) -> Result<()> {
    let client = MpxClient::from_env()?;
    let domain = client.resolve_domain(Some(account)).await?;
    println!("{}", serde_json::to_string_pretty(domain.services())?);
    Ok(())
}

fn render_request(request: &HttpRequest) -> Value {
    let mut query = Map::new();
    for (key, value) in &request.query {
        let value = if key == "token" {
            Value::String("<redacted>".into())
        } else {
            value.clone()
        };
        query.insert(key.clone(), value);
    }
    json!({
        "method": request.method.as_str(),
        "url": request.url,
        "query": query,
        "headers": request.headers,
        "body": request.body.as_deref().map(mpx_util::redact_sensitive),
    })
}
