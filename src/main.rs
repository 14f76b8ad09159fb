use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use steggo::capacity::{CodecLimits, DEFAULT_MAX_HEADER_LEN};
use steggo::container;
use steggo::header::SOURCE_TEXT;
use steggo::stego::{self, EmbedOptions};
use steggo::transform::TransformId;

#[derive(Parser)]
#[command(name = "steggo", version, about = "Hide and recover payloads in image files")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Give up on finding a header after this many bytes
    #[arg(long, default_value_t = DEFAULT_MAX_HEADER_LEN, global = true)]
    max_header_len: usize,
    /// Use palette slots whose colour reads back as 0x00. Needed for gzip on GIF
    /// carriers, and must then be passed to extract as well
    #[arg(long, global = true)]
    no_zero_skip: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct PayloadSource {
    /// Literal text to hide
    #[arg(short, long)]
    text: Option<String>,
    /// File whose contents to hide
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Read the payload from standard input
    #[arg(long)]
    stdin: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Hide a payload in an image
    Embed {
        /// Carrier image (png, jpeg, bmp, gif)
        #[arg(long)]
        target: PathBuf,
        /// Existing directory for the output image
        #[arg(short, long, default_value = ".")]
        dest: PathBuf,
        #[command(flatten)]
        source: PayloadSource,
        /// Pre-encodings, applied in order: rot13, base16, base32, base64, base85, gzip
        #[arg(short, long = "pre-encoding")]
        pre_encoding: Vec<String>,
    },
    /// Recover a payload from an image
    Extract {
        #[arg(long)]
        target: PathBuf,
        /// Write the payload to <dest>/message.<type>
        #[arg(short, long)]
        dest: Option<PathBuf>,
    },
    /// Show how much an image can hold
    Capacity {
        #[arg(long)]
        target: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print the embedded header without decoding the payload
    Inspect {
        #[arg(long)]
        target: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let limits = CodecLimits {
        max_header_len:  cli.max_header_len,
        skip_zero_slots: !cli.no_zero_skip,
        ..CodecLimits::default()
    };

    match cli.command {

        // ── Embed ────────────────────────────────────────────────────────────
        Commands::Embed { target, dest, source, pre_encoding } => {
            if !dest.is_dir() {
                return Err(format!("destination {} is not a directory", dest.display()).into());
            }
            let (payload, source_type) = read_payload(&source)?;
            let opts = EmbedOptions {
                source_type,
                pre_encoding: TransformId::parse_list(&pre_encoding)?,
                limits,
            };

            let mut loaded = container::load(&target)?;
            let report = stego::embed(&mut loaded.carrier, &payload, &opts)?;
            let output = dest.join(container::output_file_name(loaded.format));
            container::save(&output, &loaded.carrier, loaded.format)?;

            println!("Wrote: {}", output.display());
            println!("  Carrier        {} ({})", loaded.format, report.kind.name());
            println!("  Source type    {}", report.header.source_type);
            println!("  Pre-encoding   {}", list_or_none(&report.header.pre_encoding));
            println!("  Payload        {} B ({} B encoded)", report.payload_len, report.header.size);
            println!("  Used           {} / {} sub-byte slots", report.framed_values, report.capacity.values);
            if loaded.format.is_lossy() {
                println!("  Note           {} source re-encoded as {}", loaded.format, container::output_format(loaded.format));
            }
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { target, dest } => {
            let loaded = container::load(&target)?;
            let msg = stego::extract(&loaded.carrier, &limits)?;

            if let Some(dir) = dest {
                let path = dir.join(msg.file_name());
                std::fs::write(&path, &msg.payload)?;
                eprintln!("Wrote: {}", path.display());
            }
            match msg.as_text() {
                Some(text) => println!("{text}"),
                None => println!(
                    "<{} bytes of binary data, source type '{}'; use --dest to save it>",
                    msg.payload.len(),
                    msg.header.source_type
                ),
            }
        }

        // ── Capacity ─────────────────────────────────────────────────────────
        Commands::Capacity { target, json } => {
            let loaded = container::load(&target)?;
            let report = stego::capacity_report(&loaded.carrier, &limits);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("── {} ─────────────────────────────────────────", target.display());
                println!("  Format         {}", loaded.format);
                println!("  Carrier        {}", report.kind.name());
                println!("  Slots          {}", report.capacity.slots);
                println!("  Sub-byte slots {}", report.capacity.values);
                println!("  Max text       {} B", report.max_text_payload);
            }
        }

        // ── Inspect ──────────────────────────────────────────────────────────
        Commands::Inspect { target } => {
            let loaded = container::load(&target)?;
            let header = stego::inspect(&loaded.carrier, &limits)?;
            println!("{}", serde_json::to_string_pretty(&header)?);
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::builder().from_env_lossy()
    } else {
        EnvFilter::builder().parse_lossy(format!("steggo={level}"))
    };
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn read_payload(source: &PayloadSource) -> Result<(Vec<u8>, String), Box<dyn std::error::Error>> {
    if let Some(text) = &source.text {
        return Ok((text.clone().into_bytes(), SOURCE_TEXT.to_owned()));
    }
    if let Some(path) = &source.file {
        let data = std::fs::read(path)?;
        return Ok((data, stego::source_type_for_path(path)));
    }
    if !source.stdin {
        return Err("no payload given; use --text, --file or --stdin".into());
    }
    let mut data = Vec::new();
    std::io::stdin().read_to_end(&mut data)?;
    Ok((data, SOURCE_TEXT.to_owned()))
}

fn list_or_none(ops: &[TransformId]) -> String {
    if ops.is_empty() {
        return "none".into();
    }
    ops.iter().map(|t| t.name()).collect::<Vec<_>>().join(" → ")
}

