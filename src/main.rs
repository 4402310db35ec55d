use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nupkg_meta::registry::nuget::NuGetProvider;
use nupkg_meta::registry::resolver::PackageMetadataResolver;
use nupkg_meta::registry::source::RegistrySource;
use nupkg_meta::registry::types::LicenseInfo;

#[derive(Parser)]
#[command(name = "nupkg-meta")]
#[command(version, about = "Resolve published package metadata from NuGet registries")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the details of a published package
    Details {
        /// Package identifier, e.g. "Newtonsoft.Json"
        identifier: String,
        /// Exact version to look up; latest when omitted
        #[arg(long)]
        version: Option<String>,
        /// Service index URL of the registry to query; nuget.org when omitted
        #[arg(long)]
        source: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Details {
            identifier,
            version,
            source,
        } => details(&identifier, version.as_deref(), source.as_deref()).await,
    }
}

async fn details(
    identifier: &str,
    version: Option<&str>,
    source: Option<&str>,
) -> anyhow::Result<()> {
    let source = source.map(RegistrySource::parse).transpose()?;
    let resolver = PackageMetadataResolver::new(NuGetProvider::new());

    let Some(package) = resolver.resolve(identifier, version, source.as_ref()).await? else {
        match version {
            Some(version) => bail!("No version {version} of {identifier} found"),
            None => bail!("No package {identifier} found"),
        }
    };

    println!("{} {}", package.identifier, package.version);
    if !package.authors.is_empty() {
        println!("Authors: {}", package.authors);
    }
    if !package.owners.is_empty() {
        println!("Owners: {}", package.owners);
    }
    if let Some(description) = &package.description {
        println!("Description: {description}");
    }
    match &package.license {
        Some(LicenseInfo::Expression(expression)) => println!("License: {expression}"),
        Some(LicenseInfo::Url(url)) => println!("License: {url}"),
        None => {}
    }
    if let Some(url) = &package.project_url {
        println!("Project: {url}");
    }
    println!("Source: {}", package.source);

    Ok(())
}
