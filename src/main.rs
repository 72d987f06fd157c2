use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use zenith_css::{
    analyze_css_bundle, duplicate_chunk_name, extract_to_file, parse, split_by_route,
    split_critical, AtomicNaming, BuildMode, OptimizeOptions, OptimizeRequest, SplitOptions, Theme,
    UsageInfo,
};

#[derive(Debug, Parser)]
#[command(name = "zenith-css", version, about = "Optimize framework-emitted CSS")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Purge, dedupe, atomize and minify a stylesheet.
    Optimize(OptimizeArgs),
    /// Split a stylesheet into critical and deferred halves.
    Critical(CriticalArgs),
    /// Split a stylesheet into a shared chunk and per-route chunks.
    Routes(RoutesArgs),
    /// Print size and pattern statistics as JSON.
    Analyze(InputArgs),
}

#[derive(Debug, Args)]
struct InputArgs {
    /// Stylesheet to read; stdin when omitted.
    #[arg(long, short)]
    input: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Dev,
    Prod,
    Ssg,
}

impl From<ModeArg> for BuildMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Dev => BuildMode::Dev,
            ModeArg::Prod => BuildMode::Prod,
            ModeArg::Ssg => BuildMode::SSG,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NamingArg {
    ContentHash,
    Sequential,
}

#[derive(Debug, Args)]
struct OptimizeArgs {
    #[command(flatten)]
    input: InputArgs,
    /// HTML or JSX-like sources to scan for used selectors.
    #[arg(long = "usage", value_name = "FILE")]
    usage: Vec<PathBuf>,
    /// JSON file with optimize options; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Start from a build-mode preset instead of the config file.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
    /// Theme tokens JSON (`{"colors": {"primary": "#06f"}}`) prepended as `:root`.
    #[arg(long)]
    theme: Option<PathBuf>,
    #[arg(long)]
    purge: bool,
    #[arg(long)]
    dedupe: bool,
    #[arg(long)]
    atomic: bool,
    #[arg(long, value_enum)]
    naming: Option<NamingArg>,
    #[arg(long)]
    rewrite_atomic: bool,
    #[arg(long)]
    minify: bool,
    #[arg(long)]
    sourcemap: bool,
    /// Output file; stdout when omitted.
    #[arg(long, short)]
    out: Option<PathBuf>,
    /// Print the optimization report as JSON on stderr.
    #[arg(long)]
    report: bool,
}

#[derive(Debug, Args)]
struct CriticalArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Rendered HTML whose classes form the above-fold set.
    #[arg(long)]
    html: Option<PathBuf>,
    /// Extra above-fold class names, comma separated.
    #[arg(long, value_delimiter = ',')]
    above_fold: Vec<String>,
    #[arg(long)]
    theme: Option<PathBuf>,
    #[arg(long)]
    minify: bool,
    /// Where to write the deferred half; discarded when omitted.
    #[arg(long)]
    deferred_out: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct RoutesArgs {
    #[command(flatten)]
    input: InputArgs,
    /// JSON map of route path → selector names.
    #[arg(long)]
    routes: PathBuf,
    #[arg(long)]
    out_dir: PathBuf,
    #[arg(long)]
    minify: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("[zenith-css] {err:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Optimize(args) => optimize(args).await,
        Command::Critical(args) => critical(args),
        Command::Routes(args) => routes(args),
        Command::Analyze(args) => {
            let css = read_input(&args)?;
            println!("{}", serde_json::to_string_pretty(&analyze_css_bundle(&css))?);
            Ok(())
        }
    }
}

async fn optimize(args: OptimizeArgs) -> Result<()> {
    let mut options = match (&args.config, args.mode) {
        (Some(_), Some(_)) => bail!("--config and --mode are mutually exclusive"),
        (Some(path), None) => {
            let raw = read_file(path)?;
            serde_json::from_str::<OptimizeOptions>(&raw)
                .with_context(|| format!("invalid config '{}'", path.display()))?
        }
        (None, Some(mode)) => OptimizeOptions::for_mode(mode.into()),
        (None, None) => OptimizeOptions::default(),
    };
    options.purge |= args.purge;
    options.deduplicate |= args.dedupe;
    options.atomic |= args.atomic;
    options.rewrite_atomic |= args.rewrite_atomic;
    options.minify |= args.minify;
    options.sourcemap |= args.sourcemap;
    if let Some(naming) = args.naming {
        options.atomic_naming = match naming {
            NamingArg::ContentHash => AtomicNaming::ContentHash,
            NamingArg::Sequential => AtomicNaming::Sequential,
        };
    }
    if let Some(path) = &args.input.input {
        options.source_name = file_name(path);
    }

    let mut input = String::new();
    if let Some(theme) = load_theme(args.theme.as_deref())? {
        input.push_str(&theme.to_css(false));
    }
    input.push_str(&read_input(&args.input)?);

    let usage = if args.usage.is_empty() {
        None
    } else {
        Some(scan_usage(&args.usage)?)
    };

    let result = zenith_css::optimize(OptimizeRequest {
        input,
        usage,
        options,
    });

    if args.report {
        eprintln!("{}", serde_json::to_string_pretty(&result.report)?);
    }

    match &args.out {
        Some(path) => extract_to_file(path, &result)
            .await
            .with_context(|| format!("failed to emit '{}'", path.display()))?,
        None => print!("{}", result.css),
    }
    Ok(())
}

fn critical(args: CriticalArgs) -> Result<()> {
    let css = read_input(&args.input)?;
    let mut above_fold: HashSet<String> = args.above_fold.into_iter().collect();
    if let Some(path) = &args.html {
        above_fold.extend(UsageInfo::from_html(&read_file(path)?).classes);
    }
    let theme_css = load_theme(args.theme.as_deref())?
        .map(|t| t.to_css(args.minify))
        .filter(|css| !css.is_empty());

    let split = split_critical(
        &parse(&css),
        &above_fold,
        &SplitOptions {
            minify: args.minify,
            theme_css,
        },
    );

    if let Some(path) = &args.deferred_out {
        write_file(path, &split.deferred)?;
    }
    print!("{}", split.critical);
    Ok(())
}

fn routes(args: RoutesArgs) -> Result<()> {
    let css = read_input(&args.input)?;
    let raw = read_file(&args.routes)?;
    let route_map: BTreeMap<String, Vec<String>> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid route map '{}'", args.routes.display()))?;

    let chunks = split_by_route(&css, &route_map, args.minify);
    if let Some(name) = duplicate_chunk_name(&chunks) {
        bail!("routes collide on chunk name '{name}'; '{name}.css' would be written twice");
    }
    for chunk in &chunks {
        write_file(&args.out_dir.join(format!("{}.css", chunk.name)), &chunk.css)?;
    }
    println!("{}", serde_json::to_string_pretty(&chunks)?);
    Ok(())
}

fn scan_usage(paths: &[PathBuf]) -> Result<UsageInfo> {
    let mut usage = UsageInfo::new();
    for path in paths {
        let source = read_file(path)?;
        let is_html = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("html" | "htm")
        );
        usage.merge(if is_html {
            UsageInfo::from_html(&source)
        } else {
            UsageInfo::from_jsx(&source)
        });
    }
    Ok(usage)
}

fn load_theme(path: Option<&Path>) -> Result<Option<Theme>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw = read_file(path)?;
    let theme = serde_json::from_str(&raw)
        .with_context(|| format!("invalid theme '{}'", path.display()))?;
    Ok(Some(theme))
}

fn read_input(args: &InputArgs) -> Result<String> {
    match &args.input {
        Some(path) => read_file(path),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output dir '{}'", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write '{}'", path.display()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "styles.css".to_string())
}
