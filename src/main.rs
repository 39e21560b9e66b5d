//! zenml-manifests - renders the Kubernetes manifests for a ZenML server.
//!
//! This is the command line entry point that:
//! - Initializes structured logging on stderr
//! - Layers values files and `--set` overrides into a configuration
//! - Writes the manifest stream, the access instructions or the values schema

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use zenml_manifests::config::{Configuration, DEFAULT_APP_VERSION, Release};
use zenml_manifests::{Result, load_values, render};

/// Render ZenML server manifests without a cluster connection
#[derive(Parser, Debug)]
#[command(name = "zenml-manifests", version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true, env = "ZENML_MANIFESTS_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the manifests as a multi-document YAML stream
    ///
    /// The access instructions are printed to stderr afterwards.
    Render(RenderArgs),

    /// Print the post-install access instructions
    Notes(ValuesArgs),

    /// Print the JSON Schema of the values file
    Schema,
}

/// Values and release identity shared by `render` and `notes`
#[derive(Args, Debug)]
struct ValuesArgs {
    /// Values file, may be repeated; later files win
    #[arg(short = 'f', long = "values")]
    values: Vec<PathBuf>,

    /// Override a value, e.g. `--set database.url=mysql://...`
    #[arg(long = "set", value_name = "PATH=VALUE")]
    overrides: Vec<String>,

    /// Release name
    #[arg(long, env = "ZENML_RELEASE_NAME", default_value = "zenml")]
    release_name: String,

    /// Target namespace
    #[arg(short = 'n', long, env = "ZENML_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Server version, used when `image.tag` is unset
    #[arg(long, default_value = DEFAULT_APP_VERSION)]
    app_version: String,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    values: ValuesArgs,

    /// Write one file per resource into this directory instead of stdout
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,
}

impl ValuesArgs {
    fn load(&self) -> Result<(Configuration, Release)> {
        let config = load_values(&self.values, &self.overrides)?;
        let release = Release::new(&self.release_name, &self.namespace)
            .with_app_version(&self.app_version);
        Ok((config, release))
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Err(e) = run(cli.command) {
        error!(error = %e, "Render failed");
        eprintln!("Error: {e}");
        #[allow(clippy::exit)]
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("zenml_manifests=warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Render(args) => {
            let (config, release) = args.values.load()?;
            let rendered = render(&config, &release)?;
            match &args.output_dir {
                Some(dir) => write_documents(dir, &rendered.bundle)?,
                None => print!("{}", rendered.bundle.to_yaml()?),
            }
            eprint!("{}", rendered.notes);
            Ok(())
        }
        Commands::Notes(args) => {
            let (config, release) = args.load()?;
            let rendered = render(&config, &release)?;
            print!("{}", rendered.notes);
            Ok(())
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(Configuration);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn write_documents(dir: &Path, bundle: &zenml_manifests::ManifestBundle) -> Result<()> {
    fs::create_dir_all(dir)?;
    for document in bundle.documents()? {
        let path = dir.join(document.file_name);
        fs::write(&path, &document.content)?;
        info!(kind = document.kind, path = %path.display(), "Wrote manifest");
    }
    Ok(())
}
