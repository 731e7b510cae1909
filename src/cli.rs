//! Minimal CLI: load a descriptor table → (decode | encode | check)
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use json_cast::engine::DEFAULT_MAX_DEPTH;
use json_cast::{DescriptorTable, Direction, Engine, EngineOptions};
use rayon::prelude::*;
use serde_json::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// validate JSON documents against a descriptor table and convert them between wire and typed shapes
#[derive(Parser, Debug)]
#[command(name = "json-cast", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate wire-format documents and emit the typed shape
    Decode(ConvertOut),
    /// validate typed documents and emit the wire format
    Encode(ConvertOut),
    /// load a descriptor table, report configuration errors and list its types
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// descriptor table (.json)
    #[arg(long, short)]
    schema: PathBuf,

    /// deepest object/array nesting accepted in a document
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON); output is NDJSON as well
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct ConvertOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// name of the top-level type in the table
    #[arg(long)]
    root: String,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// validate every document but write no output
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,
}

/// One input document and where it came from.
#[derive(Debug)]
struct Document {
    source: String,
    value: Value,
}

#[derive(Debug)]
enum Source {
    Stdin,
    File(PathBuf),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Decode(target) => target.run(Direction::Decode),
            Command::Encode(target) => target.run(Direction::Encode),
            Command::Check(target) => target.run(),
        }
    }
}

impl SchemaSettings {
    fn engine(&self) -> Result<Engine> {
        let table = DescriptorTable::from_path(&self.schema)?;
        let options = EngineOptions { max_depth: self.max_depth };
        Ok(Engine::with_options(table, options))
    }
}

impl ConvertOut {
    fn run(&self, direction: Direction) -> Result<()> {
        let engine = self.schema_settings.engine()?;
        engine.table().resolve(&self.root)?;

        let documents = self.input_settings.load()?;
        tracing::info!(
            documents = documents.len(),
            direction = direction.name(),
            root = %self.root,
            "converting"
        );

        let converted = convert_all(&engine, &documents, &self.root, direction)?;
        if self.dry_run {
            eprintln!("{} {} documents match {}", "ok:".green().bold(), converted.len(), self.root);
            return Ok(());
        }
        let rendered = render(converted, self.input_settings.ndjson)?;
        write_output(self.out.as_deref(), &rendered)
    }
}

/// Documents are independent; the first failure in input order is reported.
fn convert_all(
    engine: &Engine,
    documents: &[Document],
    root: &str,
    direction: Direction,
) -> Result<Vec<Value>> {
    let results = documents
        .par_iter()
        .map(|doc| engine.convert(&doc.value, root, direction))
        .collect::<Vec<_>>();

    let mut converted = Vec::with_capacity(results.len());
    for (doc, result) in documents.iter().zip(results) {
        let value = result.map_err(|error| {
            let location = error
                .as_mismatch()
                .map(|mismatch| mismatch.path().to_string())
                .filter(|path| !path.is_empty())
                .map(|path| format!(" at {path}"))
                .unwrap_or_default();
            let message = format!("{}{location} does not match {root}", doc.source);
            anyhow::Error::new(error).context(message)
        })?;
        converted.push(value);
    }
    Ok(converted)
}

impl CheckOut {
    fn run(&self) -> Result<()> {
        let engine = self.schema_settings.engine()?;
        let table = engine.table();
        for name in table.names() {
            let descriptor = table.resolve(name)?;
            println!("{} {descriptor}", name.bold());
        }
        eprintln!(
            "{} {} types in {}",
            "ok:".green().bold(),
            table.len(),
            self.schema_settings.schema.display()
        );
        Ok(())
    }
}

impl InputSettings {
    fn load(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for source in resolve_file_path_patterns(&self.input)? {
            let (label, text) = read_source(&source)?;
            if self.ndjson {
                for (line_no, line) in text.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{label}:{}", line_no + 1);
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("Failed to parse NDJSON line ({label})"))?;
                    self.select(label, value, &mut documents)?;
                }
            } else {
                let value = serde_json::from_str::<Value>(&text)
                    .with_context(|| format!("Failed to parse JSON source file ({label})"))?;
                self.select(label, value, &mut documents)?;
            }
        }
        Ok(documents)
    }

    /// Applies `--json-pointer` then `--jq-expr` to one parsed document.
    fn select(&self, source: String, value: Value, out: &mut Vec<Document>) -> Result<()> {
        let value = match self.json_pointer.as_deref() {
            None => value,
            Some(pointer) => match value.pointer(pointer) {
                Some(node) => node.clone(),
                None => bail!("JSON pointer {pointer} selects nothing in {source}"),
            },
        };
        match self.jq_expr.as_ref() {
            None => out.push(Document { source, value }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &value).with_context(|| {
                    format!("Failed to apply jq expression to source file ({source})")
                })?;
                for (position, value) in results.into_iter().enumerate() {
                    out.push(Document { source: format!("{source}#{position}"), value });
                }
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_source(source: &Source) -> Result<(String, String)> {
    match source {
        Source::Stdin => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(("<stdin>".to_owned(), text))
        }
        Source::File(path) => {
            let label = path.to_string_lossy().to_string();
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read source file ({label})"))?;
            Ok((label, text))
        }
    }
}

fn render(values: Vec<Value>, ndjson: bool) -> Result<String> {
    if ndjson {
        let lines = values
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(lines.join("\n"));
    }
    let rendered = match <[Value; 1]>::try_from(values) {
        Ok([single]) => serde_json::to_string_pretty(&single)?,
        Err(many) => serde_json::to_string_pretty(&many)?,
    };
    Ok(rendered)
}

fn write_output(out: Option<&Path>, rendered: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(out, rendered)
                .with_context(|| format!("Failed to write {}", out.display()))?;
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<Source>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<Source>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if pattern == "-" {
            out.push(Source::Stdin);
        } else if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                matched_any = true;
                out.push(Source::File(entry?));
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(Source::File(PathBuf::from(pattern)));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use json_cast::{Additional, Descriptor, Property};
    use serde_json::json;

    fn settings(json_pointer: Option<&str>, jq_expr: Option<&str>) -> InputSettings {
        InputSettings {
            ndjson: false,
            json_pointer: json_pointer.map(str::to_owned),
            jq_expr: jq_expr.map(str::to_owned),
            input: vec!["-".to_owned()],
        }
    }

    fn document(source: &str, value: Value) -> Document {
        Document { source: source.to_owned(), value }
    }

    fn level_engine() -> Engine {
        let level = Descriptor::object(
            [Property::new("__identifier", "identifier", Descriptor::string())],
            Additional::Reject,
        );
        Engine::new(DescriptorTable::builder().define("Level", level).build().unwrap())
    }

    #[test]
    fn ndjson_renders_one_compact_line_per_document() {
        let rendered = render(vec![json!({"a": 1}), json!([true, null])], true).unwrap();
        assert_eq!(rendered, "{\"a\":1}\n[true,null]");
    }

    #[test]
    fn single_document_is_not_wrapped() {
        let rendered = render(vec![json!({"a": 1})], false).unwrap();
        assert_eq!(rendered, serde_json::to_string_pretty(&json!({"a": 1})).unwrap());
        let rendered = render(vec![json!(1), json!(2)], false).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&rendered).unwrap(), json!([1, 2]));
        assert_eq!(render(Vec::new(), false).unwrap(), "[]");
    }

    #[test]
    fn json_pointer_selects_a_subnode() {
        let mut out = Vec::new();
        settings(Some("/data/items/1"), None)
            .select("doc.json".to_owned(), json!({"data": {"items": [1, {"v": 2}]}}), &mut out)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, "doc.json");
        assert_eq!(out[0].value, json!({"v": 2}));
    }

    #[test]
    fn json_pointer_that_selects_nothing_fails() {
        let mut out = Vec::new();
        let err = settings(Some("/missing"), None)
            .select("doc.json".to_owned(), json!({"data": 1}), &mut out)
            .unwrap_err();
        assert!(err.to_string().contains("/missing"), "unexpected error {err}");
        assert!(out.is_empty());
    }

    #[test]
    fn jq_outputs_become_separate_documents() {
        let mut out = Vec::new();
        settings(None, Some(".items[]"))
            .select("doc.json".to_owned(), json!({"items": [{"a": 1}, {"a": 2}]}), &mut out)
            .unwrap();
        let sources = out.iter().map(|d| d.source.as_str()).collect::<Vec<_>>();
        assert_eq!(sources, ["doc.json#0", "doc.json#1"]);
        assert_eq!(out[1].value, json!({"a": 2}));
    }

    #[test]
    fn conversion_keeps_input_order() {
        let engine = level_engine();
        let documents = (0..16)
            .map(|n| document(&format!("in:{n}"), json!({"__identifier": format!("Level_{n}")})))
            .collect::<Vec<_>>();
        let converted = convert_all(&engine, &documents, "Level", Direction::Decode).unwrap();
        let names = converted.iter().map(|v| v["identifier"].as_str().unwrap()).collect::<Vec<_>>();
        let expected = (0..16).map(|n| format!("Level_{n}")).collect::<Vec<_>>();
        assert_eq!(names, expected);
    }

    #[test]
    fn first_failure_in_input_order_is_reported() {
        let engine = level_engine();
        let documents = vec![
            document("in:1", json!({"__identifier": "ok"})),
            document("in:2", json!({"__identifier": 2})),
            document("in:3", json!({"__identifier": "ok", "extra": true})),
        ];
        let err = convert_all(&engine, &documents, "Level", Direction::Decode).unwrap_err();
        assert_eq!(err.to_string(), "in:2 at /__identifier does not match Level");
        let mismatch = err.downcast_ref::<json_cast::Error>().and_then(json_cast::Error::as_mismatch);
        assert_eq!(mismatch.map(|m| m.key.as_str()), Some("__identifier"));
    }

    #[test]
    fn encode_direction_uses_typed_keys() {
        let engine = level_engine();
        let documents = vec![document("in:1", json!({"identifier": "Door"}))];
        let converted = convert_all(&engine, &documents, "Level", Direction::Encode).unwrap();
        assert_eq!(converted, [json!({"__identifier": "Door"})]);
    }

    #[test]
    fn dash_reads_stdin_and_empty_globs_fail() {
        let sources = resolve_file_path_patterns(["-", "table.json"]).unwrap();
        assert!(matches!(sources[0], Source::Stdin));
        assert!(matches!(&sources[1], Source::File(path) if path == Path::new("table.json")));
        assert!(resolve_file_path_patterns(["/nonexistent-json-cast-dir/*.json"]).is_err());
    }
}
