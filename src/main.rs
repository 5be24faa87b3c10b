use anyhow::{Context, Result, bail};
use clap::Parser;
use rustresources::{
    GetOrReadOptions, InitiatorId, Resource, ResourceEngine, RestResource, StatusOptions, Store,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rustresources")]
#[command(about = "Read a REST collection through a resource engine")]
struct Cli {
    /// Base URL, e.g. https://api.example.com
    #[arg(long)]
    origin: String,
    /// Collection name appended to the origin
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "id")]
    id_key: String,
    /// Page size; the whole collection is read when omitted
    #[arg(long)]
    page_size: Option<u64>,
    /// 1-based page to start from
    #[arg(long, default_value_t = 1)]
    page: u64,
    /// Further pages to walk with the pager
    #[arg(long, default_value_t = 0)]
    follow: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    let config = RestResource::new(cli.origin.as_str(), cli.name.as_str())
        .id_key(&cli.id_key)
        .into_config()
        .context("invalid resource configuration")?;
    let engine = ResourceEngine::new(config, Store::new())?;
    let resource = engine.resource(InitiatorId::new("cli"), None);

    let options = match cli.page_size {
        Some(size) => GetOrReadOptions::page(cli.page, size),
        None => GetOrReadOptions::default(),
    };
    print_records(&resource, &read(&resource, options).await?)?;

    if cli.page_size.is_none() {
        return Ok(());
    }
    for _ in 0..cli.follow {
        let before = resource.page().current()?;
        resource.page().next()?;
        if resource.page().current()? == before {
            break;
        }
        print_records(&resource, &read(&resource, GetOrReadOptions::default()).await?)?;
    }
    Ok(())
}

async fn read(resource: &Resource<Value>, options: GetOrReadOptions) -> Result<Vec<Value>> {
    if let Some(records) = resource.get_or_read(options.clone())? {
        return Ok(records.iter().map(|record| record.as_ref().clone()).collect());
    }
    resource.settle().await?;

    if resource.is_failed(StatusOptions::default())? {
        bail!("read failed");
    }
    let records = resource
        .get_or_read(options)?
        .context("read finished without data")?;
    Ok(records.iter().map(|record| record.as_ref().clone()).collect())
}

fn print_records(resource: &Resource<Value>, records: &[Value]) -> Result<()> {
    let pager = resource.page();
    if let Some(current) = pager.current()? {
        match pager.total()? {
            Some(total) => println!("page {}/{}", current, total),
            None => println!("page {}", current),
        }
    }
    println!("{}", serde_json::to_string_pretty(records)?);
    Ok(())
}
