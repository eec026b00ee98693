use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use stitchflow::imaging::{RasterStamper, TextStyle};
use stitchflow::stitch::CommandConverter;
use stitchflow::{check, classify, config, export, labels, output};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Flags for passes that take files out of the download directories.
#[derive(clap::Args, Clone)]
struct TransferArgs {
    /// Copy files into the sorted tree instead of moving them
    #[arg(long)]
    copy: bool,
}

/// Flags for passes that name exported files.
#[derive(clap::Args, Clone)]
struct DateArgs {
    /// Export day encoded into new names (YYYY-MM-DD, default today)
    #[arg(long)]
    date: Option<NaiveDate>,
}

fn version_string() -> &'static str {
    let on_tag = env!("STITCHFLOW_ON_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("STITCHFLOW_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "stitchflow")]
#[command(about = "Embroidery design sorting, DST export and label stamping")]
#[command(long_about = "\
Embroidery design sorting, DST export and label stamping

Design files and label images are expected in local directories, named the
way the order system writes them:

  files/design/2150_2448_front_L_Sweatshirt_3_1_item_1.pes
  files/labels/2150_2448_1_1_item_1.png

Passes:

  classify   assign owner + folder order, place sources under sorted/<owner>/pes
  export     convert every face to sorted/<owner>/dst/<name>.dst and register it
  label      stamp the registered names onto the matching label images

Export names are nine characters, XXXYLZMMD:

  055A3F09j  folder order 055, owner A, 3 faces, front, exported 09 October

Run 'stitchflow gen-config' to generate a documented stitchflow.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory holding downloaded design files
    #[arg(long, default_value = "files/design", global = true)]
    design_dir: PathBuf,

    /// Directory holding downloaded label images
    #[arg(long, default_value = "files/labels", global = true)]
    label_dir: PathBuf,

    /// Root of the sorted output tree
    #[arg(long, default_value = "sorted", global = true)]
    sorted_dir: PathBuf,

    /// Config file (stock defaults when absent)
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assign identities and place design files into the sorted tree
    Classify(TransferArgs),
    /// Convert classified designs and record them in the export registry
    Export(DateArgs),
    /// Stamp exported names onto the matching label images
    Label(TransferArgs),
    /// Run the full pipeline: classify → export → label
    Run {
        #[command(flatten)]
        transfer: TransferArgs,
        #[command(flatten)]
        date: DateArgs,
    },
    /// Compare item counts in the download directories with their orders
    Check,
    /// Print the fields encoded in export names
    Decode {
        /// Names with or without extension
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print a stock stitchflow.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stitchflow=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Classify(transfer) => {
            let flow = config::load_config(&cli.config)?;
            init_thread_pool(&flow.processing);
            let converter = CommandConverter::new(&flow.converter);
            let report = classify::classify(
                &cli.design_dir,
                &cli.sorted_dir,
                &flow,
                &converter,
                transfer.copy,
            )?;
            output::print_run_report(&report);
        }
        Command::Export(date) => {
            let flow = config::load_config(&cli.config)?;
            init_thread_pool(&flow.processing);
            let converter = CommandConverter::new(&flow.converter);
            let report = export::export(&cli.sorted_dir, &flow, &converter, export_date(&date))?;
            output::print_run_report(&report);
        }
        Command::Label(transfer) => {
            let flow = config::load_config(&cli.config)?;
            let stamper = RasterStamper::new(TextStyle::from(&flow.labels));
            let report = labels::label(
                &cli.label_dir,
                &cli.sorted_dir,
                &flow,
                &stamper,
                transfer.copy,
            )?;
            output::print_run_report(&report);
        }
        Command::Run { transfer, date } => {
            let flow = config::load_config(&cli.config)?;
            init_thread_pool(&flow.processing);
            let converter = CommandConverter::new(&flow.converter);

            println!("==> Classifying {}", cli.design_dir.display());
            let report = classify::classify(
                &cli.design_dir,
                &cli.sorted_dir,
                &flow,
                &converter,
                transfer.copy,
            )?;
            output::print_run_report(&report);

            println!("==> Exporting to {}", cli.sorted_dir.display());
            let report = export::export(&cli.sorted_dir, &flow, &converter, export_date(&date))?;
            output::print_run_report(&report);

            println!("==> Stamping labels from {}", cli.label_dir.display());
            let stamper = RasterStamper::new(TextStyle::from(&flow.labels));
            let report = labels::label(
                &cli.label_dir,
                &cli.sorted_dir,
                &flow,
                &stamper,
                transfer.copy,
            )?;
            output::print_run_report(&report);
        }
        Command::Check => {
            let report = check::check(&cli.design_dir, &cli.label_dir)?;
            output::print_completeness(&report);
        }
        Command::Decode { names } => {
            let flow = config::load_config(&cli.config)?;
            let codec = flow.codec()?;
            for name in &names {
                let decoded = if name.contains('.') {
                    codec.decode_file_name(name)
                } else {
                    codec.decode(name)
                };
                output::print_decoded(name, &decoded);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn export_date(args: &DateArgs) -> NaiveDate {
    args.date.unwrap_or_else(|| chrono::Local::now().date_naive())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the config can constrain
/// down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
