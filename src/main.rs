use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use api_coverage_analyzer::{
    config::Config,
    coverage::UsageCoverageEngine,
    formatter::SurfaceFormatter,
    index::load_api_index,
    reachability::{ClientSurface, ReachabilityAnalyzer},
    samples::SampleTreeLoader,
};

#[derive(Parser)]
#[command(name = "api-coverage")]
#[command(about = "Tree-sitter based API usage-coverage analyzer for SDK sample folders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Analyze sample coverage of an API surface")]
    Analyze {
        #[arg(help = "API index JSON file, or '-' for stdin")]
        api_index: String,
        #[arg(help = "Folder of usage samples")]
        samples: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, help = "Pretty-print the report JSON")]
        pretty: bool,
        #[arg(long, help = "Also write the report to a file")]
        output_json: Option<PathBuf>,
    },
    #[command(about = "Render a budgeted API surface stub, optionally coverage-filtered")]
    Surface {
        #[arg(help = "API index JSON file, or '-' for stdin")]
        api_index: String,
        #[arg(long, help = "Coverage report JSON from a previous analyze run")]
        coverage: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long, help = "Character budget override")]
        budget: Option<usize>,
    },
    #[command(about = "List reachable client types and their operation counts")]
    Reachable {
        #[arg(help = "API index JSON file, or '-' for stdin")]
        api_index: String,
        #[arg(long, help = "Pretty-print the JSON output")]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            api_index,
            samples,
            config,
            pretty,
            output_json,
        } => analyze_samples(api_index, samples, config, pretty, output_json),
        Commands::Surface {
            api_index,
            coverage,
            config,
            budget,
        } => render_surface(api_index, coverage, config, budget),
        Commands::Reachable { api_index, pretty } => list_reachable(api_index, pretty),
    }
}

fn load_config(path: Option<PathBuf>, samples_root: Option<&PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path.to_string_lossy().as_ref())?,
        None => Config::default(),
    };
    if let Some(root) = samples_root {
        config.samples.root = root.clone();
    }
    Ok(config)
}

fn analyze_samples(
    api_index_path: String,
    samples: PathBuf,
    config_path: Option<PathBuf>,
    pretty: bool,
    output_json: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path, Some(&samples))?;

    eprintln!("🔍 Loading API index from {}", api_index_path);
    let index = load_api_index(&api_index_path)?;

    let analyzer = ReachabilityAnalyzer::new()?;
    let analysis = analyzer.analyze(&index);
    let surface = ClientSurface::from_analysis(&index, &analysis);
    eprintln!(
        "📦 {} reachable types, {} client operations",
        analysis.reachable.len(),
        surface.operation_count()
    );

    let mut loader = SampleTreeLoader::new(&config)?;
    let tree = loader.load(&config.samples.root)?;
    eprintln!("🌳 Parsed {} sample files", tree.file_count());

    let engine = UsageCoverageEngine::new(&config.performance);
    let report = engine.analyze(&tree, &index, &surface);
    eprintln!(
        "📊 {} covered, {} uncovered",
        report.covered.len(),
        report.uncovered.len()
    );

    let serialized = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", serialized);

    if let Some(output_path) = output_json {
        std::fs::write(&output_path, &serialized)?;
        eprintln!("💾 Report written to {:?}", output_path);
    }

    Ok(())
}

fn render_surface(
    api_index_path: String,
    coverage_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    budget: Option<usize>,
) -> Result<()> {
    let mut config = load_config(config_path, None)?;
    if let Some(budget) = budget {
        config.formatter.char_budget = budget;
    }

    let index = load_api_index(&api_index_path)?;

    let coverage = match coverage_path {
        Some(path) => {
            let data = std::fs::read_to_string(&path)?;
            Some(serde_json::from_str(&data)?)
        }
        None => None,
    };

    let formatter = SurfaceFormatter::new(&config.formatter);
    print!("{}", formatter.render(&index, coverage.as_ref()));

    Ok(())
}

fn list_reachable(api_index_path: String, pretty: bool) -> Result<()> {
    let index = load_api_index(&api_index_path)?;

    let analyzer = ReachabilityAnalyzer::new()?;
    let analysis = analyzer.analyze(&index);
    let surface = ClientSurface::from_analysis(&index, &analysis);

    let mut reachable: Vec<&String> = analysis.reachable.iter().collect();
    reachable.sort();

    let summary = serde_json::json!({
        "roots": analysis.roots,
        "reachable": reachable,
        "clientTypes": surface.operations.keys().collect::<Vec<_>>(),
        "operationCount": surface.operation_count(),
    });

    let serialized = if pretty {
        serde_json::to_string_pretty(&summary)?
    } else {
        serde_json::to_string(&summary)?
    };
    println!("{}", serialized);

    Ok(())
}
