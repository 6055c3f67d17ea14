//! A CLI tool for printing temporary AWS credentials found using the ECS or EC2
//! metadata services.

use std::{io, time::Duration};

use anyhow::{Context as _, Result};
use aws_metadata_credentials::{MetadataConfig, MetadataService, ReqwestRequester};
use clap::Parser;
use tracing::debug;

use crate::{logging::LogFormat, output::OutputFormat};

mod logging;
mod output;

/// Command-line options, parsed using `clap`.
#[derive(Debug, Parser)]
#[command(
    name = "fetch-aws-credentials",
    version,
    about = "Print temporary AWS credentials from the ECS or EC2 metadata services.",
    after_help = r#"If AWS_CONTAINER_CREDENTIALS_RELATIVE_URI is set, credentials are fetched from
the ECS container credentials endpoint. Otherwise, they are fetched from the EC2
instance metadata service."#
)]
struct Opt {
    /// Log format: indented, flat or json. Use RUST_LOG to control verbosity.
    #[arg(long, default_value = "indented")]
    log_format: LogFormat,

    /// Output format: json or env.
    #[arg(long, default_value = "json")]
    output: OutputFormat,

    /// Override the EC2 instance metadata endpoint.
    #[arg(long, value_name = "URL")]
    imds_endpoint: Option<String>,

    /// Override the ECS container credentials endpoint.
    #[arg(long, value_name = "URL")]
    ecs_endpoint: Option<String>,

    /// Timeout for each HTTP request, in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 2)]
    request_timeout: u64,

    /// Give up if the entire lookup takes longer than this, in seconds.
    #[arg(long, value_name = "SECONDS")]
    deadline: Option<u64>,
}

impl Opt {
    /// Build our library configuration from the environment and our options.
    fn config(&self) -> Result<MetadataConfig> {
        let mut config = MetadataConfig::from_env()
            .context("could not read configuration from the environment")?
            .request_timeout(Duration::from_secs(self.request_timeout))
            .deadline(self.deadline.map(Duration::from_secs));
        if let Some(endpoint) = &self.imds_endpoint {
            config = config.imds_endpoint(endpoint.to_owned());
        }
        if let Some(endpoint) = &self.ecs_endpoint {
            config = config.ecs_endpoint(endpoint.to_owned());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();
    opt.log_format.install()?;
    debug!("{:?}", opt);

    let service = MetadataService::new(opt.config()?);
    let credential = service
        .get_credential(&ReqwestRequester)
        .await
        .context("could not find AWS credentials")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    opt.output.write(&mut out, &credential)
}
