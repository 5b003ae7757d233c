use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facesift_core::{Embedder, Matcher, OnnxEmbedder, DEFAULT_DISTANCE_THRESHOLD};
use facesift_photos::PhotoFolder;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "facesift", about = "facesift face search CLI")]
struct Cli {
    /// Directory containing det_10g.onnx and w600k_r50.onnx
    #[arg(long, global = true, env = "FACESIFT_MODEL_DIR")]
    models: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find photos showing the same face as IMAGE
    Search {
        /// Query image
        image: PathBuf,
        /// Photo folder to scan
        #[arg(short, long, env = "FACESIFT_PHOTO_DIR", default_value = "static/photos")]
        photos: PathBuf,
        /// Maximum Euclidean distance for a match
        #[arg(short, long, default_value_t = DEFAULT_DISTANCE_THRESHOLD)]
        threshold: f32,
    },
    /// List the photos in the collection
    List {
        #[arg(short, long, env = "FACESIFT_PHOTO_DIR", default_value = "static/photos")]
        photos: PathBuf,
    },
    /// Print the embedding of the first face in IMAGE
    Embed {
        image: PathBuf,
    },
    /// Load the models and report
    Check,
}

fn load_embedder(models: Option<PathBuf>) -> Result<OnnxEmbedder> {
    let dir = models.unwrap_or_else(facesift_core::default_model_dir);
    OnnxEmbedder::from_dir(&dir).with_context(|| format!("loading models from {}", dir.display()))
}

fn load_query(path: &Path) -> Result<image::RgbImage> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    facesift_photos::decode_rgb(&bytes).with_context(|| format!("{} is not a readable image", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            image,
            photos,
            threshold,
        } => {
            if !threshold.is_finite() || threshold < 0.0 {
                bail!("threshold must be a non-negative number, got {threshold}");
            }
            let query = load_query(&image)?;
            let matcher = Matcher::new(Arc::new(load_embedder(cli.models)?)).with_threshold(threshold);

            let Some(target) = matcher.embed_query(&query)? else {
                println!("{}", json!({ "error": "No face detected" }));
                return Ok(());
            };

            let results = matcher.search(&target, &PhotoFolder::new(&photos))?;
            let count = results.len();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "results": results, "count": count }))?
            );
        }
        Commands::List { photos } => {
            let records = PhotoFolder::new(&photos)
                .list()
                .with_context(|| format!("listing {}", photos.display()))?;
            let count = records.len();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "photos": records, "count": count }))?
            );
        }
        Commands::Embed { image } => {
            let query = load_query(&image)?;
            let embedder = load_embedder(cli.models)?;
            match embedder.extract(&query)? {
                Some(embedding) => println!("{}", serde_json::to_string(&embedding)?),
                None => println!("{}", json!({ "error": "No face detected" })),
            }
        }
        Commands::Check => {
            let embedder = load_embedder(cli.models)?;
            println!(
                "models ok: {}",
                embedder.model_version().unwrap_or("unknown")
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_defaults() {
        let cli = Cli::try_parse_from(["facesift", "search", "me.jpg"]).unwrap();
        match cli.command {
            Commands::Search { image, threshold, .. } => {
                assert_eq!(image, PathBuf::from("me.jpg"));
                assert_eq!(threshold, 0.5);
            }
            _ => panic!("expected search"),
        }
    }
}
