//! CLI binary for depviz: resolve, inspect, and visualize package dependency graphs.

mod progress;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use depviz_core::config::{ConfigError, Settings};
use depviz_core::graph::DependencyGraph;
use depviz_nav::cycles::{CycleConfig, CycleReport, CycleSort, detect_cycles};
use depviz_nav::explore::{Direction, collect_ids, explore, format_tree, reverse_dependencies};
use depviz_nav::export::ExportFormat;
use depviz_nav::render::{RenderOutcome, Renderer};
use depviz_nav::resolve::{ResolveOptions, resolve, resolve_universe};
use depviz_source::PackageSource;
use depviz_source::graph_file::GraphFile;
use depviz_source::registry::Registry;
use progress::ProgressSource;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "depviz",
    about = "Package dependency graph visualizer",
    version,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(flatten)]
    inputs: Inputs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone)]
struct Inputs {
    /// Configuration file (.ini, or .toml)
    #[arg(default_value = "config.ini")]
    config: PathBuf,

    /// Graph file of a test repository; overrides the repository in the config
    graph: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective settings
    Settings {
        #[command(flatten)]
        inputs: Inputs,
    },

    /// Print the dependency tree of the configured package
    Tree {
        #[command(flatten)]
        inputs: Inputs,

        /// Maximum depth (defaults to analysis.max_depth)
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Print packages that depend on a package
    Reverse {
        #[command(flatten)]
        inputs: Inputs,

        /// Package to look up (defaults to the configured package)
        #[arg(short, long)]
        package: Option<String>,

        /// Maximum depth (defaults to analysis.max_depth)
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Print an installation order (dependencies first)
    Order {
        #[command(flatten)]
        inputs: Inputs,
    },

    /// Detect circular dependencies
    Cycles {
        #[command(flatten)]
        inputs: Inputs,

        /// Sort cycles by length or by first package
        #[arg(long, value_enum, default_value_t = SortArg::Length)]
        sort_by: SortArg,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the graph as DOT, Mermaid or JSON
    Export {
        #[command(flatten)]
        inputs: Inputs,

        /// Output format: dot, mermaid, json, png, svg, pdf (defaults to the output file extension)
        #[arg(short, long)]
        format: Option<String>,

        /// Output path; "-" prints text formats to stdout (defaults to package.output_file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Length,
    Package,
}

impl From<SortArg> for CycleSort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Length => CycleSort::Length,
            SortArg::Package => CycleSort::Package,
        }
    }
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
        Err(err) => {
            if let Some(config_err) = err.downcast_ref::<ConfigError>() {
                eprintln!("configuration error: {}", config_err);
            } else {
                eprintln!("error: {:#}", err);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        None => cmd_run(&cli.inputs),
        Some(Commands::Settings { inputs }) => {
            let settings = load_settings(&inputs)?;
            print!("{}", format_settings(&settings));
            Ok(())
        }
        Some(Commands::Tree { inputs, depth }) => cmd_tree(&inputs, depth),
        Some(Commands::Reverse {
            inputs,
            package,
            depth,
        }) => cmd_reverse(&inputs, package, depth),
        Some(Commands::Order { inputs }) => cmd_order(&inputs),
        Some(Commands::Cycles {
            inputs,
            sort_by,
            json,
        }) => cmd_cycles(&inputs, sort_by.into(), json),
        Some(Commands::Export {
            inputs,
            format,
            output,
        }) => cmd_export(&inputs, format.as_deref(), output),
    }
}

/// Load settings and apply the optional graph-file argument.
fn load_settings(inputs: &Inputs) -> Result<Settings> {
    let settings = Settings::load(&inputs.config)?;
    Ok(match &inputs.graph {
        Some(graph) => settings.with_graph_file(graph),
        None => settings,
    })
}

/// Render settings as grouped key/value lines.
fn format_settings(settings: &Settings) -> String {
    let mut out = String::new();
    out.push_str("=== Settings ===\n");
    out.push_str(&format!("Config file: {}\n", settings.config_path.display()));
    for (section, entries) in settings.entries() {
        out.push_str(&format!("\n[{}]\n", section));
        for (label, value) in entries {
            out.push_str(&format!("  {}: {}\n", label, value));
        }
    }
    out.push_str("\n================\n");
    out
}

/// Resolve a test-mode graph path: as given, else relative to the config file.
fn graph_file_path(settings: &Settings) -> PathBuf {
    let given = PathBuf::from(&settings.repository.url);
    if given.exists() || given.is_absolute() {
        return given;
    }
    settings
        .config_path
        .parent()
        .map(|dir| dir.join(&given))
        .filter(|p| p.exists())
        .unwrap_or(given)
}

fn open_source(settings: &Settings) -> Result<ProgressSource<Box<dyn PackageSource>>> {
    let source: Box<dyn PackageSource> = if settings.repository.test_mode {
        let path = graph_file_path(settings);
        Box::new(
            GraphFile::load(&path)
                .with_context(|| format!("failed to load test repository {}", path.display()))?,
        )
    } else {
        Box::new(Registry::new(&settings.repository.url))
    };
    tracing::info!(source = %source.describe(), "using package source");
    Ok(ProgressSource::new(source, !settings.repository.test_mode))
}

fn resolve_options(settings: &Settings, depth: Option<usize>) -> ResolveOptions {
    ResolveOptions {
        max_depth: depth.unwrap_or(settings.analysis.max_depth),
        filter: settings.analysis.filter.clone(),
    }
}

fn resolve_root(settings: &Settings, depth: Option<usize>) -> Result<DependencyGraph> {
    let source = open_source(settings)?;
    let result = resolve(
        &source,
        &settings.package.name,
        Some(&settings.package.version),
        &resolve_options(settings, depth),
    );
    source.finish();
    Ok(result?)
}

fn cycle_config(settings: &Settings, sort_by: CycleSort) -> CycleConfig {
    CycleConfig {
        max_cycles: settings.analysis.max_cycles,
        sort_by,
        ..CycleConfig::default()
    }
}

fn print_cycles(report: &CycleReport) {
    println!("{}", report.summary);
    for cycle in &report.cycles {
        println!("  {}", cycle.representation);
    }
    if report.cycles.len() < report.cycle_count {
        println!(
            "  ... {} more not shown (analysis.max_cycles = {})",
            report.cycle_count - report.cycles.len(),
            report.cycles.len()
        );
    }
}

fn print_outcome(outcome: &RenderOutcome) {
    match outcome {
        RenderOutcome::Written(path) => eprintln!("Graph written to {}", path.display()),
        RenderOutcome::Rendered(path) => eprintln!("Graph image rendered to {}", path.display()),
        RenderOutcome::Fallback {
            requested,
            written,
            reason,
        } => {
            eprintln!(
                "Could not render {} ({}); DOT source written to {}",
                requested.display(),
                reason,
                written.display()
            );
        }
    }
}

/// Full pipeline: settings, tree, cycles, and the visualization file.
fn cmd_run(inputs: &Inputs) -> Result<()> {
    let settings = load_settings(inputs)?;
    print!("{}", format_settings(&settings));

    let graph = resolve_root(&settings, None)?;

    println!("\nDependencies of {}:", settings.package.name);
    if let Some(tree) = explore(
        &graph,
        &graph.root,
        Direction::Downstream,
        settings.analysis.max_depth,
    ) {
        print!("{}", format_tree(&tree));
    }
    if !graph.skipped.is_empty() {
        println!(
            "Filtered out: {}",
            graph.skipped.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    println!();
    let report = detect_cycles(&graph, &cycle_config(&settings, CycleSort::Length));
    print_cycles(&report);

    let outcome = Renderer::default().write_output(&graph, &settings.package.output_file, &report)?;
    print_outcome(&outcome);

    eprintln!(
        "\n  Packages: {}  Edges: {}  Max depth: {}  Unresolved: {}",
        graph.metadata.total_packages,
        graph.metadata.total_edges,
        graph.metadata.max_depth_reached,
        graph.metadata.unresolved_packages
    );
    Ok(())
}

fn cmd_tree(inputs: &Inputs, depth: Option<usize>) -> Result<()> {
    let settings = load_settings(inputs)?;
    let depth = depth.unwrap_or(settings.analysis.max_depth);
    let graph = resolve_root(&settings, Some(depth))?;
    let tree = explore(&graph, &graph.root, Direction::Downstream, depth)
        .context("root package missing from resolved graph")?;
    print!("{}", format_tree(&tree));
    Ok(())
}

fn cmd_reverse(inputs: &Inputs, package: Option<String>, depth: Option<usize>) -> Result<()> {
    let settings = load_settings(inputs)?;
    let target = package.unwrap_or_else(|| settings.package.name.clone());
    let depth = depth.unwrap_or(settings.analysis.max_depth);
    let options = resolve_options(&settings, None);

    let source = open_source(&settings)?;
    let graph = match resolve_universe(&source, &target, &options) {
        Some(result) => result?,
        None => {
            // A registry cannot be enumerated: only dependents inside the
            // configured package's own graph are visible.
            tracing::warn!("source cannot list all packages; searching the resolved graph only");
            resolve(
                &source,
                &settings.package.name,
                Some(&settings.package.version),
                &ResolveOptions {
                    max_depth: usize::MAX,
                    ..options
                },
            )?
        }
    };
    source.finish();

    let Some(tree) = reverse_dependencies(&graph, &target, depth) else {
        anyhow::bail!("package '{}' is not part of the dependency graph", target);
    };

    let dependents = collect_ids(&tree);
    if dependents.is_empty() {
        println!("No packages depend on {}.", target);
        return Ok(());
    }
    println!("Packages depending on {} ({}):", target, dependents.len());
    print!("{}", format_tree(&tree));
    Ok(())
}

fn cmd_order(inputs: &Inputs) -> Result<()> {
    let settings = load_settings(inputs)?;
    let graph = resolve_root(&settings, None)?;
    let order = depviz_nav::order::load_order(&graph);

    for (i, name) in order.order.iter().enumerate() {
        let label = graph
            .get_package(name)
            .map(|p| p.label())
            .unwrap_or_else(|| name.clone());
        println!("{:>3}. {}", i + 1, label);
    }
    if !order.is_complete() {
        println!(
            "\nCannot order (circular dependencies): {}",
            order.blocked.join(", ")
        );
    }
    Ok(())
}

fn cmd_cycles(inputs: &Inputs, sort_by: CycleSort, json: bool) -> Result<()> {
    let settings = load_settings(inputs)?;
    let graph = resolve_root(&settings, None)?;
    let report = detect_cycles(&graph, &cycle_config(&settings, sort_by));

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to serialize cycle report")?
        );
    } else {
        print_cycles(&report);
    }
    Ok(())
}

fn cmd_export(inputs: &Inputs, format: Option<&str>, output: Option<PathBuf>) -> Result<()> {
    let settings = load_settings(inputs)?;
    let graph = resolve_root(&settings, None)?;
    let report = detect_cycles(&graph, &cycle_config(&settings, CycleSort::Length));

    let output = output.unwrap_or_else(|| settings.package.output_file.clone());
    let format = match format {
        Some(name) => ExportFormat::from_name(name)?,
        None if output == Path::new("-") => ExportFormat::Dot,
        None => ExportFormat::from_path(&output)?,
    };

    if output == Path::new("-") {
        if matches!(format, ExportFormat::Image(_)) {
            anyhow::bail!("image formats cannot be written to stdout");
        }
        print!("{}", depviz_nav::export::export(&graph, &format, &report)?);
        return Ok(());
    }

    let outcome = Renderer::default().write_as(&graph, &output, &format, &report)?;
    print_outcome(&outcome);
    Ok(())
}
