//! FastTileTrack CLI entry point
//!
//! Summarizes score tracks into binned bedGraph output at a chosen zoom level.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use fast_tiletrack::core::{
    read_properties, DataSource, GeneticMap, Genome, TileConfig, TileSelector, ViewMode,
    WindowFunction, DEFAULT_BINS_PER_TILE, DEFAULT_CACHE_CAPACITY, DEFAULT_SAMPLE_CAPACITY,
};
use fast_tiletrack::formats::{write_bedgraph, BigWigDataSource, IntervalDataSource};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Window function (CLI enum)
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum WindowFunctionArg {
    /// Raw features, no aggregation
    #[value(name = "none")]
    None,
    #[default]
    #[value(name = "mean")]
    Mean,
    #[value(name = "min")]
    Min,
    #[value(name = "max")]
    Max,
    #[value(name = "median")]
    Median,
    /// 10th percentile
    #[value(name = "p10")]
    Percentile10,
    /// 90th percentile
    #[value(name = "p90")]
    Percentile90,
}

impl From<WindowFunctionArg> for WindowFunction {
    fn from(arg: WindowFunctionArg) -> Self {
        match arg {
            WindowFunctionArg::None => WindowFunction::None,
            WindowFunctionArg::Mean => WindowFunction::Mean,
            WindowFunctionArg::Min => WindowFunction::Min,
            WindowFunctionArg::Max => WindowFunction::Max,
            WindowFunctionArg::Median => WindowFunction::Median,
            WindowFunctionArg::Percentile10 => WindowFunction::Percentile10,
            WindowFunctionArg::Percentile90 => WindowFunction::Percentile90,
        }
    }
}

/// View mode (CLI enum)
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum ViewModeArg {
    /// Cached tiles per chromosome
    #[default]
    #[value(name = "tiled")]
    Tiled,
    /// One uncached tile per query
    #[value(name = "gene-list")]
    GeneList,
}

impl From<ViewModeArg> for ViewMode {
    fn from(arg: ViewModeArg) -> Self {
        match arg {
            ViewModeArg::Tiled => ViewMode::Tiled,
            ViewModeArg::GeneList => ViewMode::GeneList,
        }
    }
}

#[derive(Parser)]
#[command(name = "fast-tiletrack")]
#[command(about = "Multi-resolution summaries of genomic score tracks")]
#[command(version)]
struct Cli {
    /// Chromosome sizes file (name<TAB>length)
    #[arg(short = 'g', long, global = true)]
    genome: Option<PathBuf>,

    /// Genetic map properties file (factor, decimalPlaces, unit, unitSingular)
    #[arg(long, global = true)]
    properties: Option<PathBuf>,

    /// Window function applied within each bin
    #[arg(short = 'w', long = "window-function", global = true, default_value = "mean")]
    window_function: WindowFunctionArg,

    /// Bins per tile
    #[arg(long, global = true, default_value_t = DEFAULT_BINS_PER_TILE)]
    bins: usize,

    /// Tiles kept in the cache
    #[arg(long = "cache-size", global = true, default_value_t = DEFAULT_CACHE_CAPACITY)]
    cache_size: usize,

    /// Samples retained per bin for percentiles
    #[arg(long = "samples", global = true, default_value_t = DEFAULT_SAMPLE_CAPACITY)]
    samples: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize one range as bedGraph
    Summarize {
        /// Input track (.wig, .bedGraph, optionally compressed, or .bw)
        input: PathBuf,
        /// Chromosome
        chrom: String,
        /// Range start (in genome coordinate units)
        start: String,
        /// Range end (in genome coordinate units)
        end: String,
        /// Zoom level (2^zoom tiles per chromosome)
        #[arg(short = 'z', long, default_value = "0")]
        zoom: u32,
        /// View mode
        #[arg(long = "view", default_value = "tiled")]
        view_mode: ViewModeArg,
        /// Output file (stdout if not specified)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
    /// Summarize every chromosome at one zoom level
    Export {
        /// Input track (.wig, .bedGraph, optionally compressed, or .bw)
        input: PathBuf,
        /// Zoom level (2^zoom tiles per chromosome)
        #[arg(short = 'z', long, default_value = "0")]
        zoom: u32,
        /// Output file (stdout if not specified)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        /// Number of threads
        #[arg(short = 't', long, default_value = "1")]
        threads: usize,
    },
}

fn is_bigwig(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref(),
        Some("bw") | Some("bigwig")
    )
}

fn load_genome(cli: &Cli, bigwig: Option<&BigWigDataSource>) -> anyhow::Result<Genome> {
    let genetic_map = match &cli.properties {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open properties file {:?}", path))?;
            GeneticMap::from_properties(&read_properties(io::BufReader::new(file))?)?
        }
        None => None,
    };

    match (&cli.genome, bigwig) {
        (Some(path), _) => Ok(Genome::from_chrom_sizes_file(path, genetic_map)
            .with_context(|| format!("Failed to load genome {:?}", path))?),
        (None, Some(bw)) => {
            let mut sizes: Vec<(&str, u32)> = bw.chromosomes().collect();
            sizes.sort();
            let chromosomes = sizes
                .into_iter()
                .map(|(name, len)| fast_tiletrack::Chromosome::new(name, len as u64))
                .collect();
            let genome = Genome::new("bigwig", chromosomes)?;
            Ok(match genetic_map {
                Some(map) => genome.with_genetic_map(map),
                None => genome,
            })
        }
        (None, None) => anyhow::bail!("--genome is required for wiggle/bedGraph input"),
    }
}

fn open_output(output: &Option<PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::with_capacity(
            128 * 1024,
            File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn build_selector(
    cli: &Cli,
) -> anyhow::Result<TileSelector<Box<dyn DataSource>>> {
    let input = match &cli.command {
        Commands::Summarize { input, .. } | Commands::Export { input, .. } => input,
    };
    let load_start = Instant::now();

    let (genome, source): (Genome, Box<dyn DataSource>) = if is_bigwig(input) {
        let bw = BigWigDataSource::open(input)
            .with_context(|| format!("Failed to open bigWig {:?}", input))?
            .with_bins_per_tile(cli.bins);
        let genome = load_genome(cli, Some(&bw))?;
        (genome, Box::new(bw))
    } else {
        let genome = load_genome(cli, None)?;
        let source = IntervalDataSource::from_wig_file(input, Some(&genome))
            .with_context(|| format!("Failed to load track {:?}", input))?;
        eprintln!("Loaded {} features", source.len());
        (genome, Box::new(source))
    };
    eprintln!(
        "Track loaded in {:.2}s ({} chromosomes)",
        load_start.elapsed().as_secs_f64(),
        genome.chromosome_count()
    );

    let config = TileConfig {
        bins_per_tile: cli.bins,
        cache_capacity: cli.cache_size,
        sample_capacity: cli.samples,
        ..TileConfig::default()
    };
    let selector = TileSelector::with_config(Arc::new(genome), source, config);
    selector.set_window_function(cli.window_function.into());
    Ok(selector)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let start = Instant::now();
    let selector = build_selector(&cli)?;

    match &cli.command {
        Commands::Summarize {
            chrom,
            start: range_start,
            end: range_end,
            zoom,
            view_mode,
            output,
            ..
        } => {
            selector.set_view_mode((*view_mode).into());
            let genome = selector.genome();
            let from = genome.parse_coordinate(range_start)?;
            let to = genome.parse_coordinate(range_end)?;

            let scores = selector.summary_scores_for_range(chrom, from, to, *zoom)?;
            let mut out = open_output(output)?;
            let written = write_bedgraph(&mut out, genome.canonical_name(chrom), &scores)?;
            out.flush()?;

            eprintln!("\n=== Summary ===");
            eprintln!("Range:           {}:{}-{}", chrom, from, to);
            eprintln!(
                "Span:            {}",
                genome.format_length(to.as_f64() - from.as_f64())
            );
            eprintln!("Window function: {}", selector.window_function());
            eprintln!("Scores written:  {}", written);
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }
        Commands::Export {
            zoom,
            output,
            threads,
            ..
        } => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(*threads)
                .build()
                .context("Failed to create thread pool")?;
            let exported = pool.install(|| selector.export(*zoom))?;

            let mut out = open_output(output)?;
            let mut written = 0;
            for (chrom, scores) in &exported {
                written += write_bedgraph(&mut out, chrom, scores)?;
            }
            out.flush()?;

            eprintln!("\n=== Export Statistics ===");
            eprintln!("Chromosomes:     {}", exported.len());
            eprintln!("Zoom level:      {}", zoom);
            eprintln!("Scores written:  {}", written);
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }
    }

    Ok(())
}
