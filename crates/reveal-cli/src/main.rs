//! reveal CLI: typewriter-style reveal of scripted chat replies

mod logging;

use clap::{ArgAction, Parser, Subcommand};
use reveal_engine::{timeline, RevealConfig, RevealSnapshot, SequentialRevealEngine, Speed};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Reveal chat replies one character at a time
#[derive(Parser)]
#[command(name = "reveal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file with scripts and speed (built-in demo scripts if missing)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Milliseconds per character, overriding the config
    #[arg(long, global = true)]
    speed: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a script in the terminal UI (default when no command specified)
    Play {
        /// Script name (defaults to the first script)
        script: Option<String>,
    },

    /// Reveal to stdout as the engine publishes
    Print {
        /// Script name (defaults to the first script)
        script: Option<String>,

        /// Reveal these texts instead of a script (repeatable)
        #[arg(long = "text", conflicts_with = "script")]
        texts: Vec<String>,

        /// Print every snapshot as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Print the reveal schedule as JSON lines without waiting
    Timeline {
        /// Script name (defaults to the first script)
        script: Option<String>,

        /// Schedule these texts instead of a script (repeatable)
        #[arg(long = "text", conflicts_with = "script")]
        texts: Vec<String>,
    },

    /// List configured scripts
    Scripts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default config file
    Init {
        /// Where to write it (defaults to --config)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

const DEFAULT_CONFIG: &str = "reveal.json";

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    let play_mode = matches!(cli.command, None | Some(Commands::Play { .. }));
    // The UI owns the screen, so only log there when asked to
    if !play_mode || cli.log_file.is_some() || std::env::var_os("RUST_LOG").is_some() {
        logging::init_logging(cli.verbose, cli.log_file.as_deref())?;
    }

    let mut config = RevealConfig::load_or_default(&cli.config)?;
    if let Some(ms) = cli.speed {
        config.speed_ms = Speed::from_millis(ms).as_millis();
    }
    debug!(
        config = %cli.config.display(),
        speed_ms = config.speed_ms,
        scripts = config.scripts.len(),
        "Loaded config"
    );

    match cli.command {
        None => cmd_play(config, None),
        Some(Commands::Play { script }) => cmd_play(config, script),
        Some(Commands::Print {
            script,
            texts,
            json,
        }) => {
            let texts = resolve_texts(&config, script.as_deref(), texts)?;
            cmd_print(texts, config.speed(), json)
        }
        Some(Commands::Timeline { script, texts }) => {
            let texts = resolve_texts(&config, script.as_deref(), texts)?;
            cmd_timeline(texts, config.speed())
        }
        Some(Commands::Scripts { json }) => cmd_scripts(&config, json),
        Some(Commands::Init { path, force }) => {
            cmd_init(path.as_deref().unwrap_or(&cli.config), force)
        }
    }
}

/// Pick the texts to reveal: explicit `--text` values, else a script's replies.
fn resolve_texts(
    config: &RevealConfig,
    script: Option<&str>,
    texts: Vec<String>,
) -> Result<Vec<String>, String> {
    if !texts.is_empty() {
        return Ok(texts);
    }
    let found = match script {
        Some(name) => config.get_script(name).ok_or_else(|| {
            format!(
                "unknown script '{name}' (available: {})",
                config.script_names().join(", ")
            )
        })?,
        None => config
            .scripts
            .first()
            .ok_or_else(|| "no scripts configured".to_string())?,
    };
    Ok(found.replies.clone())
}

fn cmd_play(config: RevealConfig, script: Option<String>) -> CliResult {
    if let Some(name) = script.as_deref() {
        if config.get_script(name).is_none() {
            return Err(format!("unknown script '{name}'").into());
        }
    }
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(reveal_tui::run_tui(config, script.as_deref()))
}

fn cmd_print(texts: Vec<String>, speed: Speed, json: bool) -> CliResult {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let engine = SequentialRevealEngine::start(texts, speed)?;
        let mut subscription = engine.subscribe();
        let mut stdout = io::stdout().lock();

        let mut snapshot = subscription.latest();
        let mut shown: Vec<String> = Vec::new();
        loop {
            if json {
                writeln!(stdout, "{}", serde_json::to_string(&snapshot)?)?;
            } else {
                write!(stdout, "{}", typed_since(&shown, &snapshot.revealed))?;
                stdout.flush()?;
                shown.clone_from(&snapshot.revealed);
            }

            if snapshot.is_done() {
                break;
            }
            match subscription.changed().await {
                Some(next) => snapshot = next,
                None => break,
            }
        }

        if !json && !shown.is_empty() {
            writeln!(stdout)?;
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Text to append to the terminal to go from `shown` to `revealed`.
///
/// Within one generation every entry only grows, so the output is the new
/// suffix of each entry, with a blank line before every entry after the first.
fn typed_since(shown: &[String], revealed: &[String]) -> String {
    let mut out = String::new();
    for (i, entry) in revealed.iter().enumerate() {
        match shown.get(i) {
            Some(prev) => out.push_str(entry.get(prev.len()..).unwrap_or_default()),
            None => {
                if i > 0 {
                    out.push_str("\n\n");
                }
                out.push_str(entry);
            }
        }
    }
    out
}

fn cmd_timeline(texts: Vec<String>, speed: Speed) -> CliResult {
    let mut stdout = io::stdout().lock();
    for step in timeline(texts, speed) {
        writeln!(stdout, "{}", serde_json::to_string(&step)?)?;
    }
    Ok(())
}

fn cmd_scripts(config: &RevealConfig, json: bool) -> CliResult {
    if json {
        println!("{}", serde_json::to_string_pretty(&config.scripts)?);
        return Ok(());
    }

    if config.scripts.is_empty() {
        println!("No scripts configured");
        return Ok(());
    }

    for script in &config.scripts {
        println!("  {} - {}", script.name, script.prompt);
        println!("    {} repl{}", script.replies.len(), plural(script.replies.len()));
    }
    Ok(())
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}

fn cmd_init(path: &Path, force: bool) -> CliResult {
    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    RevealConfig::default().save(path)?;
    println!("Created {}", path.display());
    Ok(())
}

#[cfg(test)]
async fn collect_snapshots(texts: Vec<String>, speed: Speed) -> Vec<RevealSnapshot> {
    let engine = SequentialRevealEngine::start(texts, speed).unwrap();
    let mut subscription = engine.subscribe();
    let mut seen = vec![subscription.latest()];
    while !seen.last().is_some_and(RevealSnapshot::is_done) {
        match subscription.changed().await {
            Some(next) => seen.push(next),
            None => break,
        }
    }
    seen
}
