mod logger;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tag_sheets::{
    Family, GroupStatus, IdRequest, Layout, PaperSize, PhysicalSize, SheetOptions, TagSheets,
};

#[derive(Parser)]
#[command(name = "tagsheet", about = "Printable AprilTag sheets", version)]
struct Cli {
    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose selected tags into a single PDF
    Generate {
        /// Comma separated identifiers, e.g. 100,200,300
        #[arg(long)]
        ids: String,

        /// Tag family (corpus sub-directory)
        #[arg(long, default_value = "tagStandard41h12")]
        family: String,

        /// Corpus root directory
        #[arg(long)]
        corpus: PathBuf,

        /// TrueType font for the legend
        #[arg(long)]
        font: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "PDF")]
        out: PathBuf,

        /// Document name, appended to the timestamp
        #[arg(long, default_value = "tags")]
        name: String,

        /// Extra legend text
        #[arg(long, default_value = "")]
        text: String,

        /// Printed tag size in mm, `W` or `WxH`
        #[arg(long, default_value = "100", value_parser = parse_size)]
        size_mm: PhysicalSize,

        /// Print resolution
        #[arg(long, default_value = "300")]
        dpi: u32,

        /// Center each tag on a full page instead of a bordered tile
        #[arg(long, value_enum)]
        page: Option<PaperArg>,
    },

    /// Generate one PDF per group of every configured collection
    Run {
        /// JSON configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Override the configured output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the groups and identifiers of a configuration
    Plan {
        /// JSON configuration file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// List corpus files for the given identifiers
    Locate {
        /// Comma separated identifiers
        #[arg(long)]
        ids: String,

        /// Tag family (corpus sub-directory)
        #[arg(long, default_value = "tagStandard41h12")]
        family: String,

        /// Corpus root directory
        #[arg(long)]
        corpus: PathBuf,
    },

    /// Write a default configuration file
    InitConfig {
        /// Where to write the configuration
        #[arg(long, default_value = "tagsheet.json")]
        path: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

impl From<PaperArg> for PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
            PaperArg::Tabloid => Self::Tabloid,
        }
    }
}

fn parse_size(value: &str) -> std::result::Result<PhysicalSize, String> {
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a size in millimeters", part))
    };
    let (width_mm, height_mm) = match value.split_once(['x', 'X']) {
        Some((w, h)) => (parse(w)?, parse(h)?),
        None => {
            let side = parse(value)?;
            (side, side)
        }
    };
    Ok(PhysicalSize {
        width_mm,
        height_mm,
    })
}

fn print_plan(options: &SheetOptions) -> Result<()> {
    for collection in TagSheets::plan(options)? {
        println!("{}", collection.name);
        for group in &collection.groups {
            let ids: Vec<String> = group.ids.iter().map(|id| id.to_string()).collect();
            println!("  {:<8} offset {:>2}: {}", group.name, group.offset, ids.join(" "));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::CliLogger::from_verbosity(cli.verbose).init()?;

    match cli.command {
        Commands::Generate {
            ids,
            family,
            corpus,
            font,
            out,
            name,
            text,
            size_mm,
            dpi,
            page,
        } => {
            let request: IdRequest = ids.parse()?;
            let options = SheetOptions {
                corpus_root: corpus,
                output_root: out,
                font_path: font,
                family: Family::new(family)?,
                dpi,
                target_tile_size_mm: size_mm,
                layout: match page {
                    Some(paper) => Layout::Page {
                        paper: paper.into(),
                    },
                    None => Layout::Tile,
                },
                ..Default::default()
            };
            let count = request.len();
            let path = TagSheets::run_adhoc(&options, request, &name, &text).await?;
            println!("Generated tags for {} identifiers → {}", count, path.display());
        }

        Commands::Run { config, out } => {
            let mut options = SheetOptions::load(&config)
                .await
                .with_context(|| format!("Failed to load {}", config.display()))?;
            if let Some(out) = out {
                options.output_root = out;
            }

            let report = TagSheets::run(&options).await?;
            println!("Run Summary:");
            for outcome in &report.groups {
                let label = format!("{}/{}", outcome.collection, outcome.group);
                match &outcome.status {
                    GroupStatus::Exported {
                        path,
                        pages,
                        missing,
                        skipped_tiles,
                    } => {
                        println!("  {:<14} {} pages → {}", label, pages, path.display());
                        if !missing.is_empty() {
                            let ids: Vec<String> = missing.iter().map(|id| id.to_string()).collect();
                            println!("  {:<14} missing: {}", "", ids.join(" "));
                        }
                        for tile in skipped_tiles {
                            println!("  {:<14} skipped {}: {}", "", tile.path.display(), tile.reason);
                        }
                    }
                    GroupStatus::Skipped { reason, .. } => {
                        println!("  {:<14} skipped ({})", label, reason);
                    }
                    GroupStatus::Failed { error } => {
                        println!("  {:<14} FAILED: {}", label, error);
                    }
                }
            }
            println!(
                "  {} exported, {} skipped, {} failed",
                report.exported_count(),
                report.skipped_count(),
                report.failed_count()
            );
            if report.failed_count() > 0 {
                bail!("{} group(s) failed", report.failed_count());
            }
        }

        Commands::Plan { config } => {
            let options = SheetOptions::load(&config)
                .await
                .with_context(|| format!("Failed to load {}", config.display()))?;
            print_plan(&options)?;
        }

        Commands::Locate {
            ids,
            family,
            corpus,
        } => {
            let request: IdRequest = ids.parse()?;
            let found = tag_sheets::locate(request, &Family::new(family)?, &corpus).await?;
            for tag in &found {
                println!("{}\t{}", tag.id, tag.path.display());
            }
            println!("{} matches", found.len());
        }

        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                bail!("{} already exists, pass --force to replace it", path.display());
            }
            let options = SheetOptions {
                collections: vec![tag_sheets::Collection::new("W10A", ["JC", "JD"], 0)],
                ..Default::default()
            };
            options.save(&path).await?;
            println!("Wrote default configuration → {}", path.display());
        }
    }

    Ok(())
}
