use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docsearch_core::builder::{IndexBuilder, IndexConfig};
use docsearch_core::persist::{language_of_corpus, load_artifact, load_corpus, save_artifact, ArtifactPaths};
use docsearch_core::tokenizer::LanguageRegistry;
use docsearch_core::IndexHandle;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "docsearch-indexer")]
#[command(about = "Build per-language search indexes for a documentation site", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build `search-<LANG>.json` from `docs-<LANG>.json`
    Build {
        /// Language code of the corpus
        #[arg(default_value = "en")]
        lang: String,
        /// Directory holding the corpus and receiving the artifact
        #[arg(default_value = ".")]
        output: PathBuf,
        /// Read the corpus from this file instead of `<OUTPUT>/docs-<LANG>.json`
        #[arg(long)]
        input: Option<PathBuf>,
        /// Build every `docs-*.json` found in the output directory
        #[arg(long, default_value_t = false, conflicts_with = "input")]
        all: bool,
        /// Boost applied to title matches
        #[arg(long, default_value_t = 10.0, value_parser = parse_boost)]
        title_boost: f32,
    },
    /// List the languages the tokenizer supports
    Languages,
    /// Query a built artifact from the command line
    Search {
        artifact: PathBuf,
        query: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let registry = LanguageRegistry::default();

    match cli.command {
        Commands::Build { lang, output, input, all, title_boost } => {
            let config = IndexConfig { title_boost, ..IndexConfig::default() };
            let paths = ArtifactPaths::new(&output);
            if all {
                let langs = discover_languages(&output);
                if langs.is_empty() {
                    bail!("no docs-<lang>.json corpus found in {}", output.display());
                }
                for lang in langs {
                    build_language(&registry, &paths, &lang, &paths.corpus(&lang), config)?;
                }
                Ok(())
            } else {
                let corpus = input.unwrap_or_else(|| paths.corpus(&lang));
                build_language(&registry, &paths, &lang, &corpus, config)
            }
        }
        Commands::Languages => {
            for code in registry.codes() {
                println!("{code}");
            }
            Ok(())
        }
        Commands::Search { artifact, query, k } => search_artifact(&registry, &artifact, &query, k),
    }
}

/// A boost is a finite number greater than zero.
fn parse_boost(raw: &str) -> Result<f32, String> {
    let boost: f32 = raw.parse().map_err(|e| format!("{raw:?} is not a number: {e}"))?;
    if boost.is_finite() && boost > 0.0 {
        Ok(boost)
    } else {
        Err(format!("boost must be a finite number greater than 0, got {raw}"))
    }
}

fn discover_languages(dir: &Path) -> Vec<String> {
    let mut langs: Vec<String> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.file_name().to_str().and_then(language_of_corpus).map(str::to_string))
        .collect();
    langs.sort();
    langs
}

fn build_language(registry: &LanguageRegistry, paths: &ArtifactPaths, lang: &str, corpus: &Path, config: IndexConfig) -> Result<()> {
    let documents = load_corpus(corpus).with_context(|| format!("reading corpus for {lang}"))?;
    tracing::info!(lang, corpus = %corpus.display(), num_docs = documents.len(), "ingested documents");

    let mut builder = IndexBuilder::for_language(registry, lang, config)?;
    for doc in documents {
        builder.add(doc)?;
    }
    let mut artifact = builder.finish();
    artifact.built_at = time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).ok();

    let written = save_artifact(paths, &artifact).with_context(|| format!("writing index for {lang}"))?;
    println!("{}", written.display());
    tracing::info!(lang, output = %written.display(), "index build complete");
    Ok(())
}

fn search_artifact(registry: &LanguageRegistry, path: &Path, query: &str, k: usize) -> Result<()> {
    let artifact = load_artifact(path).with_context(|| format!("loading {}", path.display()))?;
    let handle = IndexHandle::from_artifact(artifact, registry)?;
    for m in handle.search(query).into_iter().take(k) {
        let title = handle.docs().get(&m.doc_ref).map_or("", |d| d.title.as_str());
        println!("{:>8.3}  {}  {}", m.score, m.doc_ref, title);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_boost_must_be_positive_and_finite() {
        assert_eq!(parse_boost("10"), Ok(10.0));
        assert_eq!(parse_boost("0.5"), Ok(0.5));
        for bad in ["0", "-2", "NaN", "inf", "ten"] {
            assert!(parse_boost(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn cli_rejects_a_zero_title_boost() {
        assert!(Cli::try_parse_from(["docsearch-indexer", "build", "--title-boost", "0"]).is_err());
        assert!(Cli::try_parse_from(["docsearch-indexer", "build", "--title-boost", "4"]).is_ok());
    }
}
