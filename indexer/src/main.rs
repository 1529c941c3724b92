use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use search_core::store::open_or_warn;
use search_core::{replay_into, InvertedIndex, PageRecord, PageStore, SledPageStore};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputPage {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

impl From<InputPage> for PageRecord {
    fn from(p: InputPage) -> Self { PageRecord::new(p.url, p.title, p.content) }
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Search, inspect and load the persisted page store", long_about = None)]
struct Cli {
    /// Page store directory
    #[arg(long, global = true, default_value = "./data/pages")]
    store: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from the store and run a ranked query
    Search {
        query: String,
        /// Maximum results to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print document and term counts of the rebuilt index
    Stats,
    /// Load pages from JSON/JSONL files or a directory into the store
    Import {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
    },
    /// Write every stored page to a JSONL file
    Export {
        #[arg(long)]
        output: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { query, limit } => search(&cli.store, &query, limit),
        Commands::Stats => stats(&cli.store),
        Commands::Import { input } => {
            let store = SledPageStore::open(&cli.store)?;
            let count = import_pages(Path::new(&input), &store)?;
            store.flush()?;
            tracing::info!(count, store = %cli.store, "import complete");
            Ok(())
        }
        Commands::Export { output } => {
            let store = SledPageStore::open(&cli.store)?;
            let count = export_pages(&store, Path::new(&output))?;
            tracing::info!(count, output = %output, "export complete");
            Ok(())
        }
    }
}

/// An index rebuilt from the store, or an empty one when the store cannot be opened.
fn load_index(store_path: &str) -> InvertedIndex {
    let index = InvertedIndex::new();
    match open_or_warn(store_path) {
        Some(store) => {
            if let Err(err) = replay_into(&store, &index) {
                tracing::warn!(error = %format!("{err:#}"), "failed to load stored pages");
            }
        }
        None => eprintln!("page store not available, search will be empty"),
    }
    index
}

fn search(store_path: &str, query: &str, limit: usize) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("usage: indexer search <query>");
    }
    let index = load_index(store_path);
    let results = index.search(query);
    println!("Found {} results for '{}':", results.len(), query);
    for page in results.iter().take(limit) {
        println!("- {}\n  Title: {}\n  Snippet: {}", page.url, page.title, page.snippet);
    }
    Ok(())
}

fn stats(store_path: &str) -> Result<()> {
    let stats = load_index(store_path).stats();
    println!("documents={} terms={}", stats.document_count, stats.term_count);
    Ok(())
}

fn import_pages(input: &Path, store: &dyn PageStore) -> Result<usize> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        anyhow::bail!("input {} does not exist", input.display());
    }

    let mut count = 0;
    for file in files {
        let pages = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file)?
        } else {
            read_json(&file)?
        };
        for page in pages {
            store.save_page(&page)?;
            count += 1;
        }
    }
    Ok(count)
}

fn read_jsonl(file: &Path) -> Result<Vec<PageRecord>> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let mut pages = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let page: InputPage = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid page", file.display(), lineno + 1))?;
        pages.push(page.into());
    }
    Ok(pages)
}

fn read_json(file: &Path) -> Result<Vec<PageRecord>> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);
    let json: serde_json::Value = serde_json::from_reader(reader).with_context(|| format!("parsing {}", file.display()))?;
    let pages = match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(|v| serde_json::from_value::<InputPage>(v).map(PageRecord::from))
            .collect::<Result<Vec<_>, _>>()?,
        serde_json::Value::Object(_) => vec![serde_json::from_value::<InputPage>(json)?.into()],
        _ => Vec::new(),
    };
    Ok(pages)
}

fn export_pages(store: &dyn PageStore, output: &Path) -> Result<usize> {
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let mut out = BufWriter::new(File::create(output).with_context(|| format!("creating {}", output.display()))?);
    let pages = store.load_all_pages()?;
    for page in &pages {
        serde_json::to_writer(&mut out, page)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(pages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn imports_json_jsonl_and_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            dir.path().join("a.jsonl"),
            "{\"url\":\"http://a.com\",\"title\":\"Go Lang\",\"content\":\"Go is great for concurrency\"}\n\n\
             {\"url\":\"http://b.com\",\"title\":\"Rust Lang\",\"content\":\"concurrency is harder\"}\n",
        )
        .unwrap();
        fs::write(nested.join("c.json"), r#"[{"url":"http://c.com","title":"Python","content":"Python is slow"}]"#).unwrap();
        fs::write(nested.join("d.json"), r#"{"url":"http://d.com"}"#).unwrap();
        fs::write(nested.join("notes.txt"), "ignored").unwrap();

        let store = SledPageStore::temporary().unwrap();
        assert_eq!(import_pages(dir.path(), &store).unwrap(), 4);

        let index = InvertedIndex::new();
        replay_into(&store, &index).unwrap();
        assert_eq!(index.stats().document_count, 4);
        assert_eq!(index.search("concurrency").len(), 2);
        assert_eq!(index.document("http://a.com").unwrap().snippet, "Go is great for concurrency");
    }

    #[test]
    fn invalid_lines_report_their_location() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bad.jsonl");
        fs::write(&file, "{\"url\":\"http://a.com\"}\n{\"title\":\"no url\"}\n").unwrap();
        let err = import_pages(&file, &SledPageStore::temporary().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("bad.jsonl:2"));
    }

    #[test]
    fn export_writes_one_page_per_line() {
        let dir = tempdir().unwrap();
        let store = SledPageStore::temporary().unwrap();
        store.save_page(&PageRecord::new("http://a.com", "A", "alpha")).unwrap();
        store.save_page(&PageRecord::new("http://b.com", "B", "beta")).unwrap();

        let output = dir.path().join("out/pages.jsonl");
        assert_eq!(export_pages(&store, &output).unwrap(), 2);

        let reimported = SledPageStore::temporary().unwrap();
        assert_eq!(import_pages(&output, &reimported).unwrap(), 2);
        assert_eq!(reimported.len(), 2);
    }
}
