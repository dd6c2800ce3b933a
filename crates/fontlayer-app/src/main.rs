// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fontlayer: updatable font store
//
// Entry point. Initialises logging, opens the font service over the data
// directory, and dispatches the subcommand.

mod services;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fontlayer_core::error::{FontLayerError, Result};
use fontlayer_core::outcome::describe;
use fontlayer_core::traits::FontFileParser;
use fontlayer_core::types::{FamilyDefinition, FamilyFontRef, FontSource, FontUpdateRequest};
use fontlayer_security::SigningKeyPair;
use fontlayer_store::SfntFontParser;

use services::data_dir;
use services::font_service::FontService;

/// Transactional store of updatable fonts over a read-only baseline.
#[derive(Parser)]
#[command(name = "fontlayer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data directory (defaults to $XDG_DATA_HOME/fontlayer)
    #[arg(short, long, global = true, env = "FONTLAYER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a publisher signing key
    Keygen {
        /// Where to write the PKCS#8 private key
        #[arg(short, long)]
        output: PathBuf,

        /// Do not add the public key to the trusted key directory
        #[arg(long, default_value_t = false)]
        no_trust: bool,
    },

    /// Sign a font file with a publisher key
    Sign {
        /// PKCS#8 private key
        #[arg(short, long)]
        key: PathBuf,

        /// Font file to sign
        font: PathBuf,

        /// Signature output (defaults to <font>.sig)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Install fonts in one batch; each needs a <font>.sig next to it
    Install {
        /// Font files
        #[arg(required = true)]
        fonts: Vec<PathBuf>,

        /// Also define a family over the installed fonts
        #[arg(long)]
        family: Option<String>,
    },

    /// Define or redefine a family over installed fonts
    DefineFamily {
        /// Family name
        name: String,

        /// PostScript names of the member fonts
        #[arg(required = true)]
        fonts: Vec<String>,
    },

    /// Show installed fonts and families
    Status,

    /// Print the effective font configuration as JSON
    Config,

    /// Show recent update history
    History {
        /// Number of entries
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let outcome = describe(&e);
            tracing::error!(error = %e, code = outcome.code, "command failed");
            eprintln!("error {}: {}", outcome.code, outcome.message);
            if outcome.retriable {
                eprintln!("the operation may succeed if retried");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Sign { key, font, output } = &cli.command {
        return sign(key, font, output.as_deref());
    }

    let dir = data_dir::data_dir(cli.data_dir.as_deref());
    let mut service = FontService::open(&dir)?;

    match cli.command {
        Commands::Keygen { output, no_trust } => keygen(&service, &output, !no_trust),
        Commands::Sign { .. } => Ok(()),
        Commands::Install { fonts, family } => install(&mut service, &fonts, family),
        Commands::DefineFamily { name, fonts } => {
            let definition =
                FamilyDefinition::new(name.clone(), fonts.into_iter().map(FamilyFontRef::new).collect());
            service.update(&[FontUpdateRequest::define_family(definition)], &name)?;
            println!("family {name} defined");
            Ok(())
        }
        Commands::Status => {
            status(&service);
            Ok(())
        }
        Commands::Config => {
            let config = service.dir().system_font_config();
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::History { limit } => history(&service, limit),
    }
}

fn keygen(service: &FontService, output: &Path, trust: bool) -> Result<()> {
    let key = SigningKeyPair::generate()?;
    write_private_key(output, key.private_key_pkcs8_der())?;
    println!("private key written to {}", output.display());

    if trust {
        let stem = output
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("publisher");
        let keys_dir = service.trusted_keys_dir();
        std::fs::create_dir_all(&keys_dir)?;
        let public = keys_dir.join(format!("{stem}.pub"));
        std::fs::write(&public, key.public_key())?;
        service.audit("keygen", stem, 0, None);
        println!("public key trusted as {}", public.display());
    }
    Ok(())
}

/// Write key material readable by the owner only.
fn write_private_key(path: &Path, der: &[u8]) -> Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let mut file = options.open(path)?;
        // An existing file keeps its old mode through open.
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        file.write_all(der)?;
    }
    #[cfg(not(unix))]
    options.open(path)?.write_all(der)?;
    Ok(())
}

fn sign(key: &Path, font: &Path, output: Option<&Path>) -> Result<()> {
    let key = SigningKeyPair::from_pkcs8(&std::fs::read(key)?)?;
    let signature = key.sign(&std::fs::read(font)?)?;
    let output = output.map_or_else(|| signature_path(font), Path::to_path_buf);
    std::fs::write(&output, signature)?;
    println!("signature written to {}", output.display());
    Ok(())
}

fn install(service: &mut FontService, fonts: &[PathBuf], family: Option<String>) -> Result<()> {
    let mut requests = Vec::with_capacity(fonts.len() + 1);
    let mut names = Vec::with_capacity(fonts.len());
    for font in fonts {
        let signature = std::fs::read(signature_path(font)).map_err(|e| {
            FontLayerError::InvalidArgument(format!("no signature for {}: {e}", font.display()))
        })?;
        requests.push(FontUpdateRequest::install(FontSource::File(font.clone()), signature));
        if family.is_some() {
            let name = SfntFontParser.postscript_name(font)?.ok_or_else(|| {
                FontLayerError::InvalidArgument(format!("{} has no PostScript name", font.display()))
            })?;
            names.push(name);
        }
    }
    if let Some(family) = &family {
        requests.push(FontUpdateRequest::define_family(FamilyDefinition::new(
            family.clone(),
            names.iter().map(FamilyFontRef::new).collect(),
        )));
    }

    let subject = fonts
        .iter()
        .filter_map(|font| font.file_name().and_then(|name| name.to_str()))
        .collect::<Vec<_>>()
        .join(",");
    service.update(&requests, &subject)?;
    println!("installed {} font(s)", fonts.len());
    Ok(())
}

fn status(service: &FontService) {
    let dir = service.dir();
    println!("data directory:  {}", service.data_dir().display());
    println!("config version:  {}", dir.config_version());
    println!("last modified:   {}", format_millis(dir.last_modified_millis()));
    println!("active slots:    {}", dir.active_slots().len());

    println!("\nfonts:");
    if dir.records().is_empty() {
        println!("  (none)");
    }
    for record in dir.records().values() {
        println!(
            "  {:<32} rev {:<10} {}",
            record.postscript_name,
            record.revision,
            record.path.display()
        );
    }

    println!("\nfamilies:");
    let families = dir.font_family_map();
    if families.is_empty() {
        println!("  (none)");
    }
    for (name, family) in families {
        let members: Vec<_> = family.fonts.iter().map(|f| f.postscript_name.as_str()).collect();
        println!("  {:<32} {}", name, members.join(", "));
    }
}

fn history(service: &FontService, limit: u32) -> Result<()> {
    let entries = service.recent_audit_entries(limit)?;
    if entries.is_empty() {
        println!("no history");
    }
    for entry in entries {
        let status = if entry.succeeded() { "ok" } else { "FAILED" };
        println!(
            "{}  {:<8} {:<6} {:>5}  {}{}",
            entry.timestamp,
            entry.action,
            status,
            entry.result_code,
            entry.subject,
            entry.details.map(|d| format!("  ({d})")).unwrap_or_default()
        );
    }
    Ok(())
}

fn signature_path(font: &Path) -> PathBuf {
    let mut path = font.as_os_str().to_owned();
    path.push(".sig");
    PathBuf::from(path)
}

fn format_millis(millis: i64) -> String {
    if millis == 0 {
        return "never".into();
    }
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}
