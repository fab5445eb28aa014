//! CLI operations: discover graph files, unify them, emit one module.
//!
//! The binary in `src/bin/symgraph.rs` only parses flags and reports errors;
//! everything it does goes through the functions here so they can be tested
//! without spawning a process.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use symgraph_core::collector::{CollectorOptions, CollectorOutput, GraphCollector};
use symgraph_core::graph::{SymbolGraph, SYMBOL_GRAPH_SUFFIX};
use symgraph_core::mixin::MixinRegistry;
use symgraph_core::unified::UnifiedGraph;

use crate::error::CliError;

/// Inputs and output settings for [`run_dump`].
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Individual symbol graph files.
    pub files: Vec<PathBuf>,
    /// Directories scanned recursively for `*.symbols.json`.
    pub directories: Vec<PathBuf>,
    /// Module to emit; required when the inputs yield more than one.
    pub module_name: Option<String>,
    pub pretty: bool,
    pub collector: CollectorOptions,
}

/// Explicit files first, then directory matches in sorted order.
///
/// Duplicates are dropped, keeping the first occurrence.
pub fn discover_symbol_graphs(
    files: &[PathBuf],
    directories: &[PathBuf],
) -> Result<Vec<PathBuf>, CliError> {
    let mut found: Vec<PathBuf> = files.to_vec();

    for dir in directories {
        if !dir.is_dir() {
            return Err(CliError::invalid_args(format!(
                "not a directory: {}",
                dir.display()
            )));
        }
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|err| CliError::Io {
                path: err.path().unwrap_or(dir).to_path_buf(),
                source: err.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_graph = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(SYMBOL_GRAPH_SUFFIX));
            if is_graph {
                found.push(entry.into_path());
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    found.retain(|path| seen.insert(path.clone()));
    debug!(count = found.len(), "discovered symbol graph files");
    Ok(found)
}

/// Read and decode one symbol graph file.
pub fn load_symbol_graph(path: &Path, registry: &MixinRegistry) -> Result<SymbolGraph, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    SymbolGraph::from_json_str(&text, registry).map_err(|source| CliError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every path in order and run the collector over them.
pub fn unify(
    paths: &[PathBuf],
    registry: &MixinRegistry,
    options: CollectorOptions,
) -> Result<CollectorOutput, CliError> {
    let mut collector = GraphCollector::with_options(options);
    for path in paths {
        let graph = load_symbol_graph(path, registry)?;
        debug!(
            path = %path.display(),
            module = %graph.module.name,
            symbols = graph.symbols.len(),
            "loaded symbol graph"
        );
        collector.merge(graph, path, false);
    }
    let output = collector.finish();
    info!(modules = output.unified_graphs.len(), "unified symbol graphs");
    Ok(output)
}

/// Pick the unified graph to emit.
///
/// Without a name the inputs must have produced exactly one module.
pub fn select_module(
    output: CollectorOutput,
    module_name: Option<&str>,
) -> Result<UnifiedGraph, CliError> {
    let mut graphs = output.unified_graphs;
    let available: Vec<String> = graphs.keys().cloned().collect();

    match module_name {
        Some(name) => graphs.remove(name).ok_or_else(|| CliError::UnknownModule {
            name: name.to_string(),
            available,
        }),
        None if graphs.len() > 1 => Err(CliError::AmbiguousModule { modules: available }),
        None => graphs.into_values().next().ok_or(CliError::NoInput),
    }
}

/// Discover, unify and encode; returns the JSON text to emit.
pub fn run_dump(options: &DumpOptions, registry: &MixinRegistry) -> Result<String, CliError> {
    let paths = discover_symbol_graphs(&options.files, &options.directories)?;
    if paths.is_empty() {
        return Err(CliError::NoInput);
    }

    let output = unify(&paths, registry, options.collector.clone())?;
    let graph = select_module(output, options.module_name.as_deref())?;
    for inconsistency in graph.overload_diagnostics() {
        debug!(%inconsistency, "overload diagnostic");
    }

    let value = graph.encode(registry)?;
    let text = if options.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(text)
}

/// Write `text` to `path`, or to stdout when no path is given.
pub fn write_output(text: &str, path: Option<&Path>) -> Result<(), CliError> {
    match path {
        Some(path) => fs::write(path, format!("{text}\n")).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_graph(dir: &Path, file: &str, module: &str, ids: &[&str]) -> PathBuf {
        let symbols: Vec<_> = ids
            .iter()
            .map(|id| {
                json!({
                    "identifier": {"precise": id, "interfaceLanguage": "swift"},
                    "kind": {"identifier": "swift.struct", "displayName": "Structure"},
                    "pathComponents": [id],
                    "names": {"title": id},
                    "accessLevel": "public"
                })
            })
            .collect();
        let graph = json!({
            "metadata": {"formatVersion": "0.6.0", "generator": "test"},
            "module": {"name": module, "platform": {"operatingSystem": {"name": "macosx"}}},
            "symbols": symbols,
            "relationships": []
        });
        let path = dir.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, graph.to_string()).unwrap();
        path
    }

    mod discovery {
        use super::*;

        #[test]
        fn scans_directories_recursively_in_order() {
            let temp = TempDir::new().unwrap();
            write_graph(temp.path(), "b/M.symbols.json", "M", &[]);
            write_graph(temp.path(), "a/M@N.symbols.json", "M", &[]);
            fs::write(temp.path().join("notes.json"), "{}").unwrap();

            let found = discover_symbol_graphs(&[], &[temp.path().to_path_buf()]).unwrap();
            let names: Vec<_> = found
                .iter()
                .map(|p| p.strip_prefix(temp.path()).unwrap().to_path_buf())
                .collect();
            assert_eq!(
                names,
                vec![
                    PathBuf::from("a/M@N.symbols.json"),
                    PathBuf::from("b/M.symbols.json")
                ]
            );
        }

        #[test]
        fn explicit_files_come_first_without_duplicates() {
            let temp = TempDir::new().unwrap();
            let file = write_graph(temp.path(), "M.symbols.json", "M", &[]);
            let found =
                discover_symbol_graphs(&[file.clone()], &[temp.path().to_path_buf()]).unwrap();
            assert_eq!(found, vec![file]);
        }

        #[test]
        fn missing_directory_is_invalid() {
            let err = discover_symbol_graphs(&[], &[PathBuf::from("/nonexistent/graphs")])
                .unwrap_err();
            assert!(matches!(err, CliError::InvalidArguments { .. }));
        }
    }

    mod selection {
        use super::*;

        fn output(temp: &TempDir, modules: &[&str]) -> CollectorOutput {
            let paths: Vec<_> = modules
                .iter()
                .map(|m| write_graph(temp.path(), &format!("{m}.symbols.json"), m, &["s"]))
                .collect();
            unify(&paths, &MixinRegistry::new(), CollectorOptions::default()).unwrap()
        }

        #[test]
        fn single_module_needs_no_name() {
            let temp = TempDir::new().unwrap();
            let graph = select_module(output(&temp, &["M"]), None).unwrap();
            assert_eq!(graph.module_name(), "M");
        }

        #[test]
        fn several_modules_need_a_name() {
            let temp = TempDir::new().unwrap();
            let err = select_module(output(&temp, &["A", "B"]), None).unwrap_err();
            assert!(matches!(err, CliError::AmbiguousModule { modules } if modules == ["A", "B"]));

            let graph = select_module(output(&temp, &["A", "B"]), Some("B")).unwrap();
            assert_eq!(graph.module_name(), "B");
        }

        #[test]
        fn unknown_module_lists_available() {
            let temp = TempDir::new().unwrap();
            let err = select_module(output(&temp, &["A"]), Some("Z")).unwrap_err();
            assert!(
                matches!(err, CliError::UnknownModule { name, available } if name == "Z" && available == ["A"])
            );
        }
    }

    #[test]
    fn run_dump_reports_empty_input() {
        let temp = TempDir::new().unwrap();
        let options = DumpOptions {
            directories: vec![temp.path().to_path_buf()],
            ..DumpOptions::default()
        };
        let err = run_dump(&options, &MixinRegistry::new()).unwrap_err();
        assert!(matches!(err, CliError::NoInput));
    }

    #[test]
    fn run_dump_reports_decode_errors_with_path() {
        let temp = TempDir::new().unwrap();
        let bad = temp.path().join("Bad.symbols.json");
        fs::write(&bad, r#"{"metadata": {}}"#).unwrap();
        let options = DumpOptions {
            files: vec![bad.clone()],
            ..DumpOptions::default()
        };
        let err = run_dump(&options, &MixinRegistry::new()).unwrap_err();
        assert!(matches!(err, CliError::Decode { path, .. } if path == bad));
    }
}
