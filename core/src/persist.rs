//! Text output formats for the index and for query results.
//!
//! Index: for each word in ascending order, the word on its own line, then
//! one `"<path>", <pos>, <pos>, ...` line per document, then a blank line.
//!
//! Results: for each query line, the line itself, then one
//! `"<path>", <frequency>, <position>` line per result, then a blank line.

use crate::index::{InvertedIndex, Postings, WordMap};
use crate::query::{run_query_file, QueryResults};
use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Where a run writes its index and query results.
#[derive(Debug, Clone, Default)]
pub struct OutputPaths {
    pub index: Option<PathBuf>,
    pub queries: Option<PathBuf>,
    pub results: Option<PathBuf>,
    /// Write results as JSON instead of the text format.
    pub json: bool,
}

/// Writes the index, then runs the query file and writes its results, as
/// configured. Queries run on `threads` workers when given.
pub fn write_outputs(
    index: &Arc<InvertedIndex>,
    paths: &OutputPaths,
    threads: Option<usize>,
) -> Result<Option<QueryResults>> {
    if let Some(path) = &paths.index {
        save_index(index, path)?;
        info!(path = %path.display(), words = index.len(), "index written");
    }

    let Some(queries) = &paths.queries else {
        return Ok(None);
    };
    let results = run_query_file(index, queries, threads)?;
    if let Some(path) = &paths.results {
        if paths.json {
            save_results_json(&results, path)?;
        } else {
            save_results(&results, path)?;
        }
        info!(path = %path.display(), queries = results.len(), "results written");
    }
    Ok(Some(results))
}

pub fn write_index<W: Write>(index: &InvertedIndex, mut out: W) -> std::io::Result<()> {
    let words = index.read();
    for (word, postings) in words.iter() {
        writeln!(out, "{word}")?;
        for (path, positions) in postings {
            write!(out, "\"{path}\"")?;
            for position in positions {
                write!(out, ", {position}")?;
            }
            writeln!(out)?;
        }
        writeln!(out)?;
    }
    out.flush()
}

pub fn save_index(index: &InvertedIndex, path: &Path) -> Result<()> {
    let f = create_file(path)?;
    write_index(index, BufWriter::new(f))
        .with_context(|| format!("failed to write index to {}", path.display()))
}

/// Parses the index output format back into an index.
pub fn read_index<R: BufRead>(reader: R) -> Result<InvertedIndex> {
    let mut words = WordMap::new();
    let mut current: Option<(String, Postings)> = None;

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            if let Some((word, postings)) = current.take() {
                words.insert(word, postings);
            }
            continue;
        }
        match current.as_mut() {
            None => current = Some((line, Postings::new())),
            Some((_, postings)) => {
                let (path, positions) =
                    parse_location(&line).with_context(|| format!("line {}", n + 1))?;
                postings.insert(path, positions);
            }
        }
    }
    if let Some((word, postings)) = current {
        words.insert(word, postings);
    }
    Ok(InvertedIndex::from(words))
}

pub fn load_index(path: &Path) -> Result<InvertedIndex> {
    let f = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read_index(BufReader::new(f))
}

fn parse_location(line: &str) -> Result<(String, Vec<usize>)> {
    let rest = line
        .strip_prefix('"')
        .ok_or_else(|| anyhow!("expected quoted path: {line}"))?;
    let end = rest
        .rfind('"')
        .ok_or_else(|| anyhow!("unterminated path: {line}"))?;
    let path = rest[..end].to_string();
    let positions = rest[end + 1..]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|e| anyhow!("bad position {s:?}: {e}")))
        .collect::<Result<Vec<_>>>()?;
    if positions.is_empty() {
        bail!("no positions for {path}");
    }
    Ok((path, positions))
}

pub fn write_results<W: Write>(results: &QueryResults, mut out: W) -> std::io::Result<()> {
    for (line, found) in results.iter() {
        writeln!(out, "{line}")?;
        for result in found {
            writeln!(out, "{result}")?;
        }
        writeln!(out)?;
    }
    out.flush()
}

pub fn save_results(results: &QueryResults, path: &Path) -> Result<()> {
    let f = create_file(path)?;
    write_results(results, BufWriter::new(f))
        .with_context(|| format!("failed to write results to {}", path.display()))
}

#[derive(Serialize)]
struct QueryRecord<'a> {
    query: &'a str,
    results: &'a [crate::SearchResult],
}

/// Writes results as a JSON array of `{query, results}` objects.
pub fn save_results_json(results: &QueryResults, path: &Path) -> Result<()> {
    let f = create_file(path)?;
    let records: Vec<QueryRecord<'_>> = results
        .iter()
        .map(|(query, results)| QueryRecord { query, results })
        .collect();
    let mut out = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut out, &records)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

fn create_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    File::create(path).with_context(|| format!("failed to create {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SearchResult;
    use tempfile::tempdir;

    fn sample() -> InvertedIndex {
        let index = InvertedIndex::new();
        index.add_words(&["b", "a", "b"], "/docs/x.txt");
        index.add_words(&["a"], "/docs/w.txt");
        index
    }

    #[test]
    fn index_format_is_exact() {
        let mut out = Vec::new();
        write_index(&sample(), &mut out).unwrap();
        let expected = "a\n\"/docs/w.txt\", 1\n\"/docs/x.txt\", 2\n\nb\n\"/docs/x.txt\", 1, 3\n\n";
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn index_reads_back() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("out/index.txt");
        let original = sample();
        original.add("c", "/odd \"quoted\" path", 4);
        save_index(&original, &file).unwrap();

        let loaded = load_index(&file).unwrap();
        assert_eq!(loaded.words(), original.words());
        for word in original.words() {
            for doc in original.documents() {
                assert_eq!(loaded.positions(&word, &doc), original.positions(&word, &doc));
            }
        }
    }

    #[test]
    fn rejects_malformed_location() {
        let err = read_index("a\n/no/quotes, 1\n".as_bytes());
        assert!(err.is_err());
    }

    #[test]
    fn results_format_is_exact() {
        let mut results = QueryResults::new();
        results.set_results(
            "Hello world",
            vec![SearchResult::new("/b", 2, 1), SearchResult::new("/a", 1, 4)],
        );
        results.set_results("nothing", Vec::new());
        let mut out = Vec::new();
        write_results(&results, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Hello world\n\"/b\", 2, 1\n\"/a\", 1, 4\n\nnothing\n\n"
        );
    }

    #[test]
    fn outputs_written_where_configured() {
        let dir = tempdir().unwrap();
        let queries = dir.path().join("queries.txt");
        std::fs::write(&queries, "b\nmissing\n").unwrap();
        let paths = OutputPaths {
            index: Some(dir.path().join("index.txt")),
            queries: Some(queries),
            results: Some(dir.path().join("results.txt")),
            json: false,
        };

        let results = write_outputs(&Arc::new(sample()), &paths, Some(2))
            .unwrap()
            .unwrap();
        assert_eq!(results.len(), 2);
        let text = std::fs::read_to_string(dir.path().join("results.txt")).unwrap();
        assert_eq!(text, "b\n\"/docs/x.txt\", 2, 1\n\nmissing\n\n");
        assert!(dir.path().join("index.txt").exists());
    }

    #[test]
    fn results_json_lists_queries_in_order() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("results.json");
        let mut results = QueryResults::new();
        results.set_results("z", vec![SearchResult::new("/a", 1, 2)]);
        results.set_results("a", Vec::new());
        save_results_json(&results, &file).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(json[0]["query"], "z");
        assert_eq!(json[0]["results"][0]["path"], "/a");
        assert_eq!(json[0]["results"][0]["frequency"], 1);
        assert_eq!(json[1]["query"], "a");
    }
}
