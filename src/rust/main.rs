use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use fasttext_estimator::{FastTextCli, FastTextConfig, FastTextModel};
use log::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Training data, one `label<TAB>text` document per line
    #[arg(short, long)]
    train: PathBuf,

    /// Documents to classify, one per line
    #[arg(short, long)]
    predict: Option<PathBuf>,

    /// JSON file with fastText hyperparameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path of the fasttext executable (defaults to $FASTTEXT_BIN, then PATH)
    #[arg(long)]
    fasttext_bin: Option<PathBuf>,

    /// Print class probabilities instead of the best label
    #[arg(long)]
    proba: bool,

    /// Print the class embedding table after training
    #[arg(long)]
    embeddings: bool,

    /// Copy the trained fastText model to this path
    #[arg(long)]
    save_model: Option<PathBuf>,
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

fn read_training_data(path: &Path) -> Result<(Vec<Vec<String>>, Vec<String>)> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let mut docs = Vec::new();
    let mut labels = Vec::new();

    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((label, text)) = line.split_once('\t') else {
            bail!("Line {} of {:?} is not `label<TAB>text`", i + 1, path);
        };
        labels.push(label.trim().to_string());
        docs.push(tokenize(text));
    }
    Ok((docs, labels))
}

fn read_documents(path: &Path) -> Result<Vec<Vec<String>>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(content.lines().map(tokenize).collect())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FastTextConfig::from_json_file(path)?,
        None => FastTextConfig::default(),
    };
    let backend = match &args.fasttext_bin {
        Some(path) => FastTextCli::new(path),
        None => FastTextCli::from_env(),
    };
    info!("Using fasttext binary {:?}", backend.binary());

    let (docs, labels) = read_training_data(&args.train)?;
    info!("Loaded {} training documents", docs.len());

    let start_time = Instant::now();
    let mut model = FastTextModel::new(config, backend)?;
    model.fit(&docs, &labels)?;
    info!("=== Model trained (took {:.2?}) ===", start_time.elapsed());

    let model_info = model.info();
    println!(
        "Classes ({}): {}",
        model_info.num_classes,
        model_info.class_labels.join(", ")
    );
    println!("Training accuracy: {:.3}", model.score(&docs, &labels)?);

    if let Some(path) = &args.save_model {
        model.estimator().trained_model()?.save_model(path)?;
    }

    if args.embeddings {
        if let Some(embeddings) = model.class_embeddings() {
            println!("\nClass embeddings (dim {}):", embeddings.dim());
            for (label, vector) in embeddings.iter() {
                let preview: Vec<String> =
                    vector.iter().take(5).map(|v| format!("{:.4}", v)).collect();
                println!("  {}: [{}, ...]", label, preview.join(", "));
            }
        }
    }

    if let Some(path) = &args.predict {
        let documents = read_documents(path)?;
        let classify_start = Instant::now();

        if args.proba {
            let classes = model.classes().unwrap_or_default().to_vec();
            let table = model.predict_proba(&documents)?.reindex(&classes);
            println!("\n{}", table.columns().join("\t"));
            for row in table.values().rows() {
                let cells: Vec<String> = row.iter().map(|p| format!("{:.4}", p)).collect();
                println!("{}", cells.join("\t"));
            }
        } else {
            for label in model.predict(&documents)? {
                println!("{}", label);
            }
        }
        info!(
            "Classified {} documents in {:.2?}",
            documents.len(),
            classify_start.elapsed()
        );
    }

    Ok(())
}
