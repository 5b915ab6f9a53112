use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slotcast::config::Config;
use slotcast::error::{Error, Result, SlotcastErrorTrait};
use slotcast::guide::{GuideBuilder, GuideService};
use slotcast::models::{ChannelLineup, Program, HOUR_MS};
use slotcast::resolver::LineupResolver;
use slotcast::scheduler::{
    generate_random_slots_async, generate_time_slots_async, RandomSlotSchedule, TimeSlotSchedule,
};
use slotcast::utils::{format_duration, format_time, now_millis, parse_time};

#[derive(Parser)]
#[command(
    name = "slotcast",
    version,
    about = "Slot-based channel lineup generation and program guides",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScheduleKind {
    /// Fixed start times within the period
    Time,
    /// Weighted random slots with cooldowns
    Random,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a lineup from a slot schedule and a program pool
    Generate {
        /// Kind of slot schedule
        #[arg(short, long, value_enum, default_value = "time")]
        kind: ScheduleKind,

        /// Schedule JSON file
        #[arg(short, long)]
        schedule: PathBuf,

        /// Program pool JSON file
        #[arg(short, long)]
        programs: PathBuf,

        /// Generation time (epoch ms or RFC 3339), defaults to now
        #[arg(long)]
        now: Option<String>,

        /// Output file, defaults to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show what a channel is airing
    Now {
        /// Channel lineups JSON file
        #[arg(long)]
        channels: PathBuf,

        /// Channel number
        #[arg(long)]
        channel: u32,

        /// Point in time (epoch ms or RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Build the program guide for all channels
    Guide {
        /// Channel lineups JSON file
        #[arg(long)]
        channels: PathBuf,

        /// Guide start (epoch ms or RFC 3339), defaults to now
        #[arg(long)]
        from: Option<String>,

        /// Guide length in hours
        #[arg(long, default_value = "24")]
        hours: i64,

        /// Output file, defaults to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
    config
        .validate()
        .map_err(|e| Error::config(format!("Invalid configuration: {e:#}")))?;

    // Initialize tracing/logging
    setup_tracing(&config.logging.level, &config.logging.format, cli.verbose)?;

    tracing::info!("slotcast starting");

    if let Err(e) = run(&config, cli.command).await {
        tracing::error!(
            category = %e.category(),
            recoverable = e.is_recoverable(),
            error = %e,
            "Command failed"
        );
        return Err(e.into());
    }

    tracing::info!("slotcast completed successfully");
    Ok(())
}

async fn run(config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Generate {
            kind,
            schedule,
            programs,
            now,
            output,
        } => {
            tracing::info!(
                schedule = %schedule.display(),
                programs = %programs.display(),
                "Starting generate command"
            );
            generate(config, kind, &schedule, &programs, now.as_deref(), output).await?;
        }

        Commands::Now {
            channels,
            channel,
            at,
        } => {
            tracing::info!(channel = %channel, at = ?at, "Starting now command");
            now_playing(config, &channels, channel, at.as_deref()).await?;
        }

        Commands::Guide {
            channels,
            from,
            hours,
            output,
        } => {
            tracing::info!(
                channels = %channels.display(),
                from = ?from,
                hours = %hours,
                "Starting guide command"
            );
            guide(config, &channels, from.as_deref(), hours, output).await?;
        }
    }

    Ok(())
}

fn setup_tracing(level: &str, format: &str, verbose: bool) -> anyhow::Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("slotcast=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new(format!("slotcast={level},warn"))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::with_source(format!("Failed to read {}", path.display()), e))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::with_source(format!("Failed to parse {}", path.display()), e))
}

async fn write_output(output: Option<PathBuf>, json: String) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .map_err(|e| Error::with_source(format!("Failed to write {}", path.display()), e))?;
            tracing::info!(path = %path.display(), "Output written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn time_arg(value: Option<&str>) -> Result<i64> {
    match value {
        Some(value) => parse_time(value).ok_or_else(|| Error::other(format!("Invalid time '{value}'"))),
        None => Ok(now_millis()),
    }
}

async fn generate(
    config: &Config,
    kind: ScheduleKind,
    schedule: &Path,
    programs: &Path,
    now: Option<&str>,
    output: Option<PathBuf>,
) -> Result<()> {
    let now = time_arg(now)?;
    let programs: Vec<Program> = read_json(programs).await?;
    let limits = config.generation_limits();

    let generated = match kind {
        ScheduleKind::Time => {
            let schedule: TimeSlotSchedule = read_json(schedule).await?;
            generate_time_slots_async(schedule, programs, now, limits).await?
        }
        ScheduleKind::Random => {
            let schedule: RandomSlotSchedule = read_json(schedule).await?;
            generate_random_slots_async(schedule, programs, now, limits).await?
        }
    };

    tracing::info!(
        start = %format_time(generated.start_time),
        items = generated.lineup.len(),
        total = %format_duration(generated.lineup.total_duration),
        "Lineup generated"
    );

    write_output(output, serde_json::to_string_pretty(&generated)?).await
}

async fn now_playing(config: &Config, channels: &Path, number: u32, at: Option<&str>) -> Result<()> {
    let at = time_arg(at)?;
    let channels: Vec<ChannelLineup> = read_json(channels).await?;
    let resolver = LineupResolver::with_settings(channels, config.resolver_settings());

    let playing = resolver.current_playing(number, at)?;
    let title = playing
        .program
        .content()
        .map(|c| c.title.clone())
        .unwrap_or_else(|| String::from("(flex)"));

    println!("Channel {number} at {}", format_time(at));
    println!("  Title: {title}");
    println!("  Started: {}", format_time(playing.start));
    println!("  Ends: {}", format_time(playing.end()));
    println!("  Elapsed: {}", format_duration(playing.elapsed_at(at)));
    Ok(())
}

async fn guide(
    config: &Config,
    channels: &Path,
    from: Option<&str>,
    hours: i64,
    output: Option<PathBuf>,
) -> Result<()> {
    let from = time_arg(from)?;
    if hours <= 0 {
        return Err(Error::config(format!("hours must be positive, got {hours}")));
    }

    let channels: Vec<ChannelLineup> = read_json(channels).await?;
    let resolver = LineupResolver::with_settings(channels, config.resolver_settings());
    let builder = Arc::new(GuideBuilder::new(resolver).with_settings(config.guide_settings()));

    let service = GuideService::new(config.retry_config());
    let guide = service.request_refresh(builder, from, hours.saturating_mul(HOUR_MS)).await?;

    tracing::info!(
        channels = guide.channels.len(),
        entries = guide.channels.values().map(|c| c.programs.len()).sum::<usize>(),
        "Guide built"
    );

    write_output(output, serde_json::to_string_pretty(guide.as_ref())?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotcast::error::ErrorCategory;
    use std::io::Write;

    fn json_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[tokio::test]
    async fn test_read_json_errors_carry_the_path() {
        let missing = read_json::<Vec<Program>>(Path::new("/nonexistent/programs.json"))
            .await
            .unwrap_err();
        assert_eq!(missing.category(), ErrorCategory::Other);
        assert!(missing.to_string().contains("Failed to read /nonexistent/programs.json"));

        let broken = json_file("[{");
        let err = read_json::<Vec<Program>>(broken.path()).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invalid_time_argument() {
        assert!(time_arg(Some("yesterday-ish")).is_err());
        assert_eq!(time_arg(Some("3600000")).unwrap(), HOUR_MS);
    }

    #[tokio::test]
    async fn test_command_errors_keep_their_category() {
        let config = Config::default();
        let channels = json_file("[]");

        let err = now_playing(&config, channels.path(), 7, Some("0"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Resolve(_)));
        assert_eq!(err.category(), ErrorCategory::Resolution);

        let err = guide(&config, channels.path(), Some("0"), 0, None)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
    }
}
