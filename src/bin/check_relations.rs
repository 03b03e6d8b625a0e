use clap::Parser;
use log::LevelFilter;
use relembed::{Config, MetadataStore};
use std::path::PathBuf;
use anyhow::Result;

#[derive(Parser, Debug)]
#[command(name = "check-relations")]
#[command(about = "Load relation metadata and report what each class declares")]
struct Args {
    /// Config file (defaults to RELEMBED_CONFIG, then ./relembed.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra metadata directories or files to check
    paths: Vec<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logger; without RUST_LOG the configured level applies once loaded
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "trace")
    ).init();
    let level_from_env = std::env::var_os("RUST_LOG").is_some();
    if !level_from_env {
        log::set_max_level(LevelFilter::Info);
    }

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None if args.paths.is_empty() => Config::load()?,
        None => Config::default(),
    };

    if !level_from_env {
        match config.logging.level.parse::<LevelFilter>() {
            Ok(level) => log::set_max_level(level),
            Err(_) => log::warn!("Unknown log level '{}', keeping info", config.logging.level),
        }
    }

    let mut builder = MetadataStore::builder();
    for dir in &config.relations.metadata_dirs {
        log::info!("Loading metadata directory {}", dir.display());
        builder.add_dir(dir)?;
    }
    for path in &args.paths {
        log::info!("Loading metadata from {}", path.display());
        if path.is_dir() {
            builder.add_dir(path)?;
        } else {
            builder.add_file(path)?;
        }
    }
    let store = builder.build();

    let mut classes: Vec<&str> = store.classes().collect();
    classes.sort_unstable();

    println!("{:<48} {:>9} {:>9}", "Class", "Relations", "Providers");
    println!("{:-<68}", "");
    for class_name in &classes {
        let declarations = store.declarations(class_name);
        let providers = declarations
            .iter()
            .filter(|declaration| declaration.content_provider.is_some())
            .count();
        println!("{:<48} {:>9} {:>9}", class_name, declarations.len(), providers);
        for declaration in declarations {
            log::debug!("  {} -> {}", declaration.rel, declaration.route);
        }
    }
    println!("{:-<68}", "");
    println!("{} class(es) loaded, relations key '{}'", classes.len(), config.relations.key);

    Ok(())
}
