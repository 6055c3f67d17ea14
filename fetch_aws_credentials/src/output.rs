//! Printing credentials.

use std::{io::Write, str::FromStr};

use anyhow::{format_err, Error, Result};
use aws_metadata_credentials::{metadata_date, Credential};

/// How to print the credentials we find.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum OutputFormat {
    /// A JSON object using the same field names as the metadata services.
    Json,
    /// `export VAR=value` lines suitable for `eval` in a shell.
    Env,
}

impl OutputFormat {
    /// Write `credential` to `out`.
    pub(crate) fn write(self, out: &mut dyn Write, credential: &Credential) -> Result<()> {
        match self {
            Self::Json => {
                serde_json::to_writer_pretty(&mut *out, credential)?;
                writeln!(out)?;
            }
            Self::Env => {
                export(out, "AWS_ACCESS_KEY_ID", &credential.access_key_id)?;
                export(out, "AWS_SECRET_ACCESS_KEY", &credential.secret_access_key)?;
                if let Some(token) = &credential.session_token {
                    export(out, "AWS_SESSION_TOKEN", token)?;
                }
                if let Some(expiration) = &credential.expiration {
                    export(
                        out,
                        "AWS_CREDENTIAL_EXPIRATION",
                        &metadata_date::format(expiration),
                    )?;
                }
            }
        }
        Ok(())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "env" => Ok(OutputFormat::Env),
            _ => Err(format_err!("unknown output format: {}", s)),
        }
    }
}

/// Write a single `export` line, quoting `value` for POSIX shells.
fn export(out: &mut dyn Write, name: &str, value: &str) -> Result<()> {
    writeln!(out, "export {}='{}'", name, value.replace('\'', r"'\''"))?;
    Ok(())
}
