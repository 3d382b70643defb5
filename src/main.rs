use clap::{Parser, Subcommand};
use resize_pipe::imaging::{ExternalBackend, ResizeBackend, RustBackend};
use resize_pipe::storage::BlobLocation;
use resize_pipe::{config, output, resize};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "resize-pipe")]
#[command(about = "Resize images through an external converter or in process")]
#[command(long_about = "\
Resize images through an external converter or in process

The external path streams the image through a converter's stdin/stdout
(ImageMagick `convert - -resize 50% -` by default) and kills it if it runs
past the configured deadline. The internal path decodes, resizes with a
Lanczos3 filter and re-encodes without leaving the process.

Settings are read from config.toml in --config-dir when present.
Run 'resize-pipe gen-config' to print a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Log debug detail to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resize through the external converter
    External { input: PathBuf, output: PathBuf },
    /// Resize in process
    Internal { input: PathBuf, output: PathBuf },
    /// Run both backends side by side into result_ext.* and result_int.*
    Both { input: PathBuf },
    /// Print the object-storage blob URL resolved from config and environment
    BlobUrl,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let load_config = || config::load_config(&cli.config_dir);

    match cli.command {
        Command::External { input, output } => {
            let backend = ExternalBackend::from_config(&load_config()?.external);
            run_one(&backend, &input, &output)?;
        }
        Command::Internal { input, output } => {
            let backend = RustBackend::from_config(&load_config()?.internal);
            run_one(&backend, &input, &output)?;
        }
        Command::Both { input } => {
            let app_config = load_config()?;
            let external = ExternalBackend::from_config(&app_config.external);
            let internal = RustBackend::from_config(&app_config.internal);
            let ext_output = resize::sibling_output(&input, "ext");
            let int_output = resize::sibling_output(&input, "int");

            // Independent outputs; one failing does not stop the other
            let (ext_result, int_result) = rayon::join(
                || resize::resize_file(&external, &input, &ext_output),
                || resize::resize_file(&internal, &input, &int_output),
            );
            output::print_result(external.name(), &input, &ext_result);
            output::print_result(internal.name(), &input, &int_result);

            if ext_result.is_err() || int_result.is_err() {
                return Err("one or more backends failed".into());
            }
        }
        Command::BlobUrl => {
            let location = BlobLocation::from_env(&load_config()?.storage)?;
            output::print_blob_location(&location);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Resize and print the result. The failure itself has already been
/// printed, so the error returned is only a summary.
fn run_one(
    backend: &dyn ResizeBackend,
    input: &Path,
    output_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = resize::resize_file(backend, input, output_path);
    output::print_result(backend.name(), input, &result);
    match result {
        Ok(_) => Ok(()),
        Err(_) => Err(format!("{} backend failed", backend.name()).into()),
    }
}

/// Log to stderr so stdout stays clean for results.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
