use std::{io::Write, path::PathBuf, sync::Arc};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framecount::{
    CountOptions, CountStrategy, ExecutionModel, FfmpegCodec, FfmpegVerbosity, LogProgress,
    OperationType, ProgressCallback, ProgressInfo, RunReport, TranscodePlan, VideoKind,
    WorkerCommand,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

const CLI_AFTER_HELP: &str = "Examples:\n  framecount --video-filepath clips --output-filepath clips\n  framecount --path raw --output-filepath converted --convert-from h264 --convert-to mp4\n  framecount --path clips --strategy metadata --max-workers 4\n  framecount --path clips --execution processes --progress\n  framecount completions zsh > _framecount";

#[derive(Debug, Parser)]
#[command(
    name = "framecount",
    version,
    about = "Count frames of every video in a directory and write a sorted CSV manifest",
    after_help = CLI_AFTER_HELP,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(flatten)]
    count: CountArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Log at debug level.
    #[arg(long, global = true)]
    debug: bool,

    /// FFmpeg log level (quiet, error, warning, info, debug).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Parser, Clone)]
struct CountArgs {
    /// Directory containing the video files.
    #[arg(long = "video-filepath", visible_alias = "path", default_value = ".")]
    video_filepath: PathBuf,

    /// Directory receiving the manifest and converted files.
    #[arg(long = "output-filepath", default_value = ".")]
    output_filepath: PathBuf,

    /// Maximum number of files processed at once.
    #[arg(long, default_value_t = framecount::DEFAULT_MAX_WORKERS)]
    max_workers: usize,

    /// Counting strategy: decode | metadata.
    #[arg(long, default_value = "decode")]
    strategy: String,

    /// Convert files of this kind while counting (h264, mp4).
    #[arg(long)]
    convert_from: Option<String>,

    /// Kind converted files are written as (h264, mp4).
    #[arg(long)]
    convert_to: Option<String>,

    /// Where files are processed: threads | processes.
    #[arg(long, default_value = "threads")]
    execution: String,

    /// Move converted sources into this subdirectory afterwards.
    #[arg(long)]
    archive_sources: Option<String>,

    /// Manifest filename inside the output directory.
    #[arg(long, default_value = framecount::DEFAULT_MANIFEST_NAME)]
    manifest_name: String,

    /// Frames between per-file progress log lines.
    #[arg(long, default_value_t = framecount::DEFAULT_PROGRESS_INTERVAL)]
    progress_interval: u64,

    /// Show a progress bar over files.
    #[arg(long)]
    progress: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "Examples:\n  framecount completions bash > framecount.bash\n  framecount completions zsh > _framecount"
    )]
    Completions {
        /// Target shell.
        shell: Shell,
    },

    /// Process a single file for a parent run and print the result as JSON.
    #[command(hide = true)]
    Worker {
        /// JSON-encoded worker request.
        #[arg(long)]
        request: String,
    },
}

fn parse_kind(value: &str) -> Option<VideoKind> {
    match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "h264" | "264" | "avc" => Some(VideoKind::H264Raw),
        "mp4" | "mpeg4" | "mp4v" => Some(VideoKind::Mp4),
        _ => None,
    }
}

fn parse_strategy(value: &str) -> Option<CountStrategy> {
    match value.to_ascii_lowercase().as_str() {
        "decode" | "exact" => Some(CountStrategy::Decode),
        "metadata" | "meta" | "fast" => Some(CountStrategy::Metadata),
        _ => None,
    }
}

fn parse_execution(
    value: &str,
    global: &GlobalOptions,
) -> Result<ExecutionModel, Box<dyn std::error::Error>> {
    match value.to_ascii_lowercase().as_str() {
        "threads" | "thread" => Ok(ExecutionModel::Threads),
        "processes" | "process" => {
            let mut command = WorkerCommand::current_exe()?;
            if global.debug {
                command = command.with_arg("--debug");
            }
            if let Some(level) = &global.log_level {
                command = command.with_arg("--log-level").with_arg(level.clone());
            }
            Ok(ExecutionModel::Processes(command))
        }
        _ => Err(format!("unsupported --execution: {value}").into()),
    }
}

fn parse_transcode(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<TranscodePlan>, Box<dyn std::error::Error>> {
    match (from, to) {
        (None, None) => Ok(None),
        (Some(from), Some(to)) => {
            let from = parse_kind(from).ok_or(format!("unsupported --convert-from: {from}"))?;
            let to = parse_kind(to).ok_or(format!("unsupported --convert-to: {to}"))?;
            let plan = TranscodePlan::new(from, to)
                .ok_or("--convert-from and --convert-to must name different kinds")?;
            Ok(Some(plan))
        }
        _ => Err("--convert-from and --convert-to must be given together".into()),
    }
}

fn init_logging(debug: bool) {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "{}: {}", buf.timestamp(), record.args()))
        .init();
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} files {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        match info.operation {
            OperationType::Dispatch => {
                if let Some(total) = info.total {
                    self.bar.set_length(total);
                }
                self.bar.set_position(info.current);
            }
            _ => {
                if let Some(filename) = &info.filename {
                    self.bar
                        .set_message(format!("{filename}: {} frames", info.current));
                }
            }
        }
    }
}

fn build_options(
    args: &CountArgs,
    global: &GlobalOptions,
) -> Result<CountOptions, Box<dyn std::error::Error>> {
    let strategy = parse_strategy(&args.strategy)
        .ok_or(format!("unsupported --strategy: {}", args.strategy))?;
    let transcode = parse_transcode(args.convert_from.as_deref(), args.convert_to.as_deref())?;
    let execution = parse_execution(&args.execution, global)?;

    let options = CountOptions::new()
        .with_source_dir(&args.video_filepath)
        .with_output_dir(&args.output_filepath)
        .with_max_workers(args.max_workers)
        .with_strategy(strategy)
        .with_transcode(transcode)
        .with_execution(execution)
        .with_progress_interval(args.progress_interval)
        .with_manifest_name(args.manifest_name.clone())
        .with_archive_sources(args.archive_sources.clone());

    options.validate()?;
    Ok(options)
}

fn print_summary(report: &RunReport) {
    println!(
        "{} {}",
        "success:".green().bold(),
        format!(
            "Counted {} of {} file(s) into {}",
            report.recorded,
            report.discovered,
            report.manifest_path.display()
        )
        .green()
    );

    if !report.transcoded.is_empty() {
        println!(
            "{} {} file(s)",
            "converted".cyan().bold(),
            report.transcoded.len()
        );
    }

    if report.archived > 0 {
        println!("{} {} source file(s)", "archived".cyan().bold(), report.archived);
    }

    if !report.failed.is_empty() {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!(
                "{} file(s) could not be read: {}",
                report.failed.len(),
                report.failed.join(", ")
            )
            .yellow()
        );
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.global.debug);

    if let Some(level) = &cli.global.log_level {
        let parsed =
            FfmpegVerbosity::parse(level).ok_or(format!("unsupported --log-level: {level}"))?;
        framecount::set_ffmpeg_verbosity(parsed);
    }

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framecount", &mut std::io::stdout());
        }
        Some(Commands::Worker { request }) => {
            let progress: Arc<dyn ProgressCallback> = Arc::new(LogProgress);
            let response = framecount::serve(&FfmpegCodec::new(), &request, &progress)?;
            println!("{response}");
        }
        None => {
            let mut options = build_options(&cli.count, &cli.global)?;

            let terminal = if cli.count.progress {
                let terminal = Arc::new(TerminalProgress::new()?);
                options = options.with_progress(terminal.clone());
                Some(terminal)
            } else {
                options = options.with_progress(Arc::new(LogProgress));
                None
            };

            let result = framecount::pipeline::run(&options, &FfmpegCodec::new());

            if let Some(terminal) = terminal {
                terminal.bar.finish_and_clear();
            }

            print_summary(&result?);
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{GlobalOptions, parse_execution, parse_kind, parse_strategy, parse_transcode};
    use framecount::{CountStrategy, ExecutionModel, VideoKind};

    #[test]
    fn parse_kind_aliases() {
        assert_eq!(parse_kind("h264"), Some(VideoKind::H264Raw));
        assert_eq!(parse_kind(".264"), Some(VideoKind::H264Raw));
        assert_eq!(parse_kind("MP4"), Some(VideoKind::Mp4));
        assert_eq!(parse_kind("mkv"), None);
    }

    #[test]
    fn parse_strategy_aliases() {
        assert_eq!(parse_strategy("decode"), Some(CountStrategy::Decode));
        assert_eq!(parse_strategy("Metadata"), Some(CountStrategy::Metadata));
        assert_eq!(parse_strategy("guess"), None);
    }

    #[test]
    fn parse_execution_models() {
        let global = GlobalOptions {
            debug: true,
            log_level: None,
        };
        assert_eq!(
            parse_execution("threads", &global).unwrap(),
            ExecutionModel::Threads
        );
        match parse_execution("processes", &global).unwrap() {
            ExecutionModel::Processes(command) => {
                assert_eq!(command.args, vec!["worker", "--debug"]);
            }
            other => panic!("unexpected model {other:?}"),
        }
        assert!(parse_execution("fibers", &global).is_err());
    }

    #[test]
    fn parse_transcode_pairs() {
        assert_eq!(parse_transcode(None, None).unwrap(), None);
        let plan = parse_transcode(Some("h264"), Some("mp4")).unwrap().unwrap();
        assert_eq!(plan.from, VideoKind::H264Raw);
        assert_eq!(plan.to, VideoKind::Mp4);
        assert!(parse_transcode(Some("mp4"), Some("mp4")).is_err());
        assert!(parse_transcode(Some("mp4"), None).is_err());
    }
}
