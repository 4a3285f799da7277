//! cardkit: card data tools
//!
//! Subcommands:
//! - `list [DIR]`: every card under DIR with its id and path
//! - `walk FILE`: each nested node of a card with its inherited view
//! - `id NAME TYPE`: format a card id
//! - `classes`: the hero class to color table
//! - `rewrite [DIR]`: rewrite cards whose files are not in canonical form
//! - `engine [JAR]`: launch the engine, list its classes, shut it down

use anyhow::{Context, Result, bail};
use cardkit_cards::{
    LoaderConfig, card_id, fingerprint, fingerprint_bytes, load_card, name_to_id, walk_card,
    write_card,
};
use cardkit_core::CLASS_MAPPING;
use engine_bridge::{EngineConfig, EngineContext, EngineGateway};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const USAGE: &str = "usage: cardkit <list [DIR] | walk FILE | id NAME TYPE | classes | rewrite [DIR] | engine [JAR]>";

#[derive(Debug, PartialEq)]
enum Command {
    List { dir: Option<PathBuf> },
    Walk { file: PathBuf },
    Id { name: String, card_type: String },
    Classes,
    Rewrite { dir: Option<PathBuf> },
    Engine { jar: Option<PathBuf> },
}

fn parse_args(args: &[String]) -> Result<Command> {
    let rest: Vec<&str> = args.iter().skip(2).map(String::as_str).collect();
    let command = match (args.get(1).map(String::as_str), rest.as_slice()) {
        (Some("list"), [dir]) => Command::List { dir: Some(dir.into()) },
        (Some("list"), []) => Command::List { dir: None },
        (Some("walk"), [file]) => Command::Walk { file: file.into() },
        (Some("id"), [name, card_type]) => Command::Id {
            name: name.to_string(),
            card_type: card_type.to_string(),
        },
        (Some("classes"), []) => Command::Classes,
        (Some("rewrite"), [dir]) => Command::Rewrite { dir: Some(dir.into()) },
        (Some("rewrite"), []) => Command::Rewrite { dir: None },
        (Some("engine"), [jar]) => Command::Engine { jar: Some(jar.into()) },
        (Some("engine"), []) => Command::Engine { jar: None },
        _ => bail!(USAGE),
    };
    Ok(command)
}

fn loader(dir: Option<PathBuf>) -> LoaderConfig {
    dir.map(LoaderConfig::with_root).unwrap_or_default()
}

fn list(dir: Option<PathBuf>) {
    let config = loader(dir);
    info!("Listing cards under {}", config.root.display());

    let mut files = config.iter();
    let mut count = 0;
    for (card, path) in files.by_ref() {
        let id = card_id(&card).unwrap_or_else(|| "-".into());
        println!("{}\t{}", id, path.display());
        count += 1;
    }
    info!("{} cards, {} skipped", count, files.skipped().len());
}

fn walk(file: PathBuf) -> Result<()> {
    let card = load_card(&file).with_context(|| format!("loading {}", file.display()))?;
    for node in walk_card(&card) {
        println!(
            "{}\t{}\t{}\t{}",
            node.depth(),
            node.path,
            node.key.unwrap_or("-"),
            serde_json::to_string(&node.inherited)?
        );
    }
    Ok(())
}

fn rewrite(dir: Option<PathBuf>) -> Result<()> {
    let config = loader(dir);
    info!("Rewriting cards under {}", config.root.display());

    let mut files = config.iter();
    let mut rewritten = 0;
    let mut unchanged = 0;
    for (card, path) in files.by_ref() {
        let on_disk = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        if fingerprint_bytes(&on_disk) == fingerprint(&card)? {
            unchanged += 1;
            continue;
        }
        write_card(&card, &path)?;
        rewritten += 1;
    }

    info!(
        "{} rewritten, {} unchanged, {} skipped",
        rewritten,
        unchanged,
        files.skipped().len()
    );
    Ok(())
}

async fn engine(jar: Option<PathBuf>) -> Result<()> {
    let config = match jar {
        Some(jar) => EngineConfig::with_jar(jar),
        None => EngineConfig::default(),
    };

    let mut context = EngineContext::launch(config).await?;
    let (name, version) = context.engine_info();
    println!("{} v{}", name, version);
    for reference in context.references() {
        println!("{}\t{}", reference.name, reference.target);
    }

    if let Err(e) = context.close().await {
        warn!("Engine did not shut down cleanly: {}", e);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args: Vec<String> = std::env::args().collect();
    match parse_args(&args)? {
        Command::List { dir } => list(dir),
        Command::Walk { file } => walk(file)?,
        Command::Id { name, card_type } => println!("{}", name_to_id(&name, &card_type)),
        Command::Classes => {
            for (class, color) in CLASS_MAPPING {
                println!("{}\t{}", class, color);
            }
        }
        Command::Rewrite { dir } => rewrite(dir)?,
        Command::Engine { jar } => engine(jar).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardkit_core::parse_document;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("cardkit")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(parse_args(&args(&["list"])).unwrap(), Command::List { dir: None });
        assert_eq!(
            parse_args(&args(&["walk", "fireball.json"])).unwrap(),
            Command::Walk { file: "fireball.json".into() }
        );
        assert_eq!(
            parse_args(&args(&["id", "Fire ball!", "SPELL"])).unwrap(),
            Command::Id {
                name: "Fire ball!".into(),
                card_type: "SPELL".into()
            }
        );
        assert_eq!(parse_args(&args(&["classes"])).unwrap(), Command::Classes);
    }

    #[test]
    fn test_parse_args_rejects_bad_usage() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["id", "only-name"])).is_err());
        assert!(parse_args(&args(&["frobnicate"])).is_err());
    }

    #[test]
    fn test_rewrite_normalizes_only_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        let messy = dir.path().join("messy.json");
        let clean = dir.path().join("clean.json");
        std::fs::write(&messy, r#"{"name":"Wisp",   "type":"MINION"}"#).unwrap();
        let card = parse_document(r#"{"name": "Imp", "type": "MINION"}"#).unwrap();
        write_card(&card, &clean).unwrap();
        let clean_before = std::fs::metadata(&clean).unwrap().modified().unwrap();

        rewrite(Some(dir.path().to_path_buf())).unwrap();

        assert_eq!(
            std::fs::read_to_string(&messy).unwrap(),
            "{\n  \"name\": \"Wisp\",\n  \"type\": \"MINION\"\n}"
        );
        assert_eq!(std::fs::metadata(&clean).unwrap().modified().unwrap(), clean_before);
    }
}
