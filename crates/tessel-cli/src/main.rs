//! `tessel` -- scene files and generated state classes from the command line.
//!
//! Usage:
//!   tessel new scenes/level1.scene --class-name Level1
//!   tessel check scenes/level1.scene --pack assets/pack.json
//!   tessel generate scenes/level1.scene --pack assets/pack.json --out src/Level1.js
//!
//! Pack files are indexed under their path with `.` segments dropped, so
//! `--pack ./assets/pack.json` matches textures from `assets/pack.json`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tessel_editor::{EditorConfig, EditorSession};
use tessel_model::settings::{OutputLanguage, SceneSettings};
use tessel_scene::PackIndex;

#[derive(Parser)]
#[command(name = "tessel")]
#[command(about = "Phaser scene files and generated state classes")]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, env = "TESSEL_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Language {
    Js,
    Ts,
}

impl From<Language> for OutputLanguage {
    fn from(lang: Language) -> Self {
        match lang {
            Language::Js => OutputLanguage::JavaScript,
            Language::Ts => OutputLanguage::TypeScript,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty scene file and its code scaffold
    New {
        scene: PathBuf,
        /// Generated class name (defaults to the file stem)
        #[arg(long)]
        class_name: Option<String>,
        #[arg(long, value_enum, default_value_t = Language::Js)]
        language: Language,
        #[arg(long, default_value = "Phaser.State")]
        super_class: String,
        /// Write generated code here instead of next to the scene
        #[arg(long, env = "TESSEL_OUT_DIR")]
        out_dir: Option<PathBuf>,
    },
    /// Load a scene and report unresolved assets or broken generated files
    Check {
        scene: PathBuf,
        /// Asset pack file used to resolve textures (repeatable)
        #[arg(long = "pack")]
        packs: Vec<PathBuf>,
    },
    /// Regenerate the code for a scene
    Generate {
        scene: PathBuf,
        #[arg(long = "pack")]
        packs: Vec<PathBuf>,
        /// Target file (defaults to `<stem>.<js|ts>` next to the scene)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::New {
            scene,
            class_name,
            language,
            super_class,
            out_dir,
        } => {
            let settings = SceneSettings {
                class_name,
                super_class,
                output_language: language.into(),
                ..SceneSettings::default()
            };
            new_scene(scene, settings, out_dir)
        }
        Commands::Check { scene, packs } => check(scene, &packs),
        Commands::Generate { scene, packs, out } => generate(scene, &packs, out.as_deref()),
    }
}

/// `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

fn load_packs(paths: &[PathBuf]) -> Result<PackIndex> {
    let mut index = PackIndex::new();
    for path in paths {
        index
            .add_file(path)
            .with_context(|| format!("reading asset pack {}", path.display()))?;
    }
    debug!(packs = index.len(), "asset packs loaded");
    Ok(index)
}

fn new_scene(scene: PathBuf, settings: SceneSettings, out_dir: Option<PathBuf>) -> Result<ExitCode> {
    let config = EditorConfig {
        output_dir: out_dir,
        ..EditorConfig::default()
    };
    let (_, report) = EditorSession::create(scene.clone(), settings, config)
        .with_context(|| format!("creating {}", scene.display()))?;
    println!("created {}", report.scene.display());
    match report.generation {
        Some(Ok(outcome)) => println!("wrote {}", outcome.path.display()),
        Some(Err(e)) => return Err(e).context("writing code scaffold"),
        None => {}
    }
    Ok(ExitCode::SUCCESS)
}

fn check(scene: PathBuf, packs: &[PathBuf]) -> Result<ExitCode> {
    let index = load_packs(packs)?;
    let session = EditorSession::open(scene.clone(), index, EditorConfig::default())
        .with_context(|| format!("loading {}", scene.display()))?;

    let doc = session.document();
    println!("{}: {} objects", scene.display(), doc.len().saturating_sub(1));

    let mut problems = 0;
    for issue in &session.load_status().issues {
        println!("  {issue}");
        problems += 1;
    }

    // Dry-run the merge so broken markers show up before the next save.
    let target = session.output_path();
    if let Some(previous) = read_optional(&target)? {
        if let Err(e) = session.generator().generate(doc, Some(&previous)) {
            println!("  {}: {e}", target.display());
            problems += 1;
        }
    }

    if problems == 0 {
        println!("ok");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{problems} problem(s)");
        Ok(ExitCode::FAILURE)
    }
}

fn generate(scene: PathBuf, packs: &[PathBuf], out: Option<&Path>) -> Result<ExitCode> {
    let index = load_packs(packs)?;
    let session = EditorSession::open(scene.clone(), index, EditorConfig::default())
        .with_context(|| format!("loading {}", scene.display()))?;

    let outcome = match out {
        Some(path) => session.generate_to(path),
        None => session.generate_now(),
    }
    .context("generating code")?;

    let verb = if outcome.written { "wrote" } else { "unchanged" };
    println!("{verb} {}", outcome.path.display());
    Ok(ExitCode::SUCCESS)
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}
