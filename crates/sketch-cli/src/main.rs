use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sketch_core::export::{self, GifSettings, Mp4Settings, RecordSettings, Recorder, Trigger};
use sketch_core::sketches::ColumnVariant;
use sketch_core::{SketchKind, Stage};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the current frame to a PNG
    Still {
        #[command(flatten)]
        sketch: SketchArgs,
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },
    /// Export one seamless loop as a GIF
    Gif {
        #[command(flatten)]
        sketch: SketchArgs,
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 20)]
        fps: u32,
        /// Animation cycles in the file
        #[arg(long, default_value_t = 1)]
        loops: u32,
    },
    /// Export a fixed-length H.264 MP4
    Mp4 {
        #[command(flatten)]
        sketch: SketchArgs,
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 30)]
        fps: u32,
        #[arg(long, default_value_t = 5)]
        seconds: u32,
    },
    /// Record the live animation to WebM
    Record {
        #[command(flatten)]
        sketch: SketchArgs,
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
    },
    /// Print the control panel as JSON
    Controls {
        #[command(flatten)]
        sketch: SketchArgs,
    },
}

#[derive(Args, Debug)]
struct SketchArgs {
    /// `flow`, `columns` or `columns:<variant>`
    #[arg(long, default_value = "flow")]
    sketch: SketchKind,

    /// Column variant (overrides the one in `--sketch`)
    #[arg(long)]
    variant: Option<ColumnVariant>,

    /// Canvas width for the flow sketch
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Canvas height for the flow sketch
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Control override as `id=value`, repeatable
    #[arg(long = "set", value_name = "ID=VALUE")]
    overrides: Vec<String>,
}

impl SketchArgs {
    fn stage(&self) -> Result<Stage> {
        let kind = match (self.sketch, self.variant) {
            (SketchKind::Columns(_), Some(variant)) => SketchKind::Columns(variant),
            (SketchKind::Flow, Some(_)) => bail!("--variant only applies to the columns sketch"),
            (kind, None) => kind,
        };
        let size = self.width.zip(self.height);

        let mut stage = Stage::new(kind.build(size))?;
        for entry in &self.overrides {
            let (id, value) = entry
                .split_once('=')
                .with_context(|| format!("expected ID=VALUE, got '{}'", entry))?;
            stage.apply_control(id.trim(), value.trim())?;
        }
        info!(sketch = %kind, size = ?stage.size(), "stage ready");
        Ok(stage)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

fn init_logging(level: LogLevel, format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_directive(level))
        .from_env_lossy();

    let subscriber_builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => subscriber_builder.json().init(),
        LogFormat::Pretty => subscriber_builder.pretty().init(),
    }
}

fn level_directive(level: LogLevel) -> tracing_subscriber::filter::Directive {
    let level = match level {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    };
    tracing_subscriber::filter::LevelFilter::from_level(level).into()
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Still { sketch, output } => {
            let mut stage = sketch.stage()?;
            let path = output.unwrap_or_else(|| export::still::default_file_name(&stage).into());
            export::save_png(&mut stage, &path)?;
            info!("Saved {:?}", path);
        }
        Command::Gif {
            sketch,
            output,
            fps,
            loops,
        } => {
            let mut stage = sketch.stage()?;
            let path = output.unwrap_or_else(|| export::gif::default_file_name(&stage).into());
            let settings = GifSettings {
                fps,
                loop_count: loops,
                ..GifSettings::default()
            };
            let mut trigger = Trigger::new("Export GIF");
            let mut last = 0;
            let frames = export::export_loop_gif(&mut stage, &settings, &path, &mut trigger, |pct| {
                if pct >= last + 10 || pct == 100 {
                    last = pct;
                    info!("Exporting... {}%", pct);
                }
            })?;
            info!(frames, "Saved {:?}", path);
        }
        Command::Mp4 {
            sketch,
            output,
            fps,
            seconds,
        } => {
            let mut stage = sketch.stage()?;
            let settings = Mp4Settings { fps, seconds };
            let path = output
                .unwrap_or_else(|| export::video::default_file_name(&stage, &settings).into());
            let mut trigger = Trigger::new("Export MP4");
            export::export_mp4(&mut stage, &settings, &path, &mut trigger)?;
            info!("Saved {:?}", path);
        }
        Command::Record {
            sketch,
            output,
            seconds,
        } => {
            let mut stage = sketch.stage()?;
            let path = output.unwrap_or_else(|| {
                format!("{}-recording.webm", stage.sketch().file_stem()).into()
            });
            let mut recorder = Recorder::new(RecordSettings {
                seconds,
                ..RecordSettings::default()
            });
            let summary = export::record_live(&mut stage, &mut recorder, &path)?;
            info!(chunks = summary.chunks, "Saved {:?}", path);
        }
        Command::Controls { sketch } => {
            let stage = sketch.stage()?;
            let json = serde_json::to_string_pretty(&stage.describe_controls())?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format);

    if let Err(e) = run(cli.command) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
