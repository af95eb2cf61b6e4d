use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pagemark_anchor::{
    AnchorEngine, AnchorState, EngineConfig, PersistenceSink, SelectorUpdate,
};
use pagemark_dom::{parse_html, Document, DocumentQuery};
use pagemark_selector::{confidence, validate, AttrExpectation, SelectorGenerator};

mod report;
mod tuning;

use report::{ConfidenceReport, GenerateReport, NodeReport, NoteReport, ReconcileReport, ResolveReport};

/// Note id used for the ephemeral record behind the `resolve` subcommand.
const RESOLVE_NOTE_ID: &str = "cli";

#[derive(Parser)]
#[command(name = "pagemark")]
#[command(about = "Durable element anchors for page notes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML file with resolver/generator/engine tuning overrides
    #[arg(long, global = true)]
    tuning: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a durable selector for an element of an HTML file
    Generate(GenerateArgs),

    /// Resolve a stored selector against an HTML file, fuzzily if needed
    Resolve(ResolveArgs),

    /// Check a selector for syntax errors and injection patterns
    Validate(SelectorArg),

    /// Score a selector's expected durability from its shape alone
    Confidence(SelectorArg),

    /// Decompose a selector into its structural parts
    Parse(SelectorArg),

    /// Re-resolve a whole set of stored notes against an HTML file
    Reconcile(ReconcileArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// HTML file to load
    file: PathBuf,

    /// Selector picking the target element (stands in for the user's click)
    target: String,

    /// Which match to anchor when the target selector hits several (0-based)
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ResolveArgs {
    /// HTML file to load
    file: PathBuf,

    /// Stored selector to re-resolve
    selector: String,

    /// Remembered text snapshot, used for disambiguation and fuzzy matching
    #[arg(long)]
    text: Option<String>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SelectorArg {
    /// Selector string
    selector: String,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ReconcileArgs {
    /// HTML file to load
    file: PathBuf,

    /// JSON file with an array of {"noteId", "selector", "anchorText"} records
    #[arg(long)]
    notes: PathBuf,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Auto-enable quiet mode when --json is used (to keep stdout clean for JSON parsing)
    let json_output = match &cli.command {
        Commands::Generate(args) => args.json,
        Commands::Resolve(args) => args.json,
        Commands::Validate(args) | Commands::Confidence(args) | Commands::Parse(args) => args.json,
        Commands::Reconcile(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = tuning::load_engine_config(cli.tuning.as_deref())?;

    match cli.command {
        Commands::Generate(args) => run_generate(args, config),
        Commands::Resolve(args) => run_resolve(args, config),
        Commands::Validate(args) => run_validate(args),
        Commands::Confidence(args) => run_confidence(args),
        Commands::Parse(args) => run_parse(args),
        Commands::Reconcile(args) => run_reconcile(args, config),
    }
}

fn run_generate(args: GenerateArgs, config: EngineConfig) -> Result<()> {
    let doc = load_document(&args.file)?;
    let matches = doc
        .query_selector_all(&args.target)
        .with_context(|| format!("Target selector {:?} is not queryable", args.target))?;
    let target = matches.get(args.index).copied().with_context(|| {
        format!(
            "Target selector matched {} element(s); index {} is out of range",
            matches.len(),
            args.index
        )
    })?;
    if matches.len() > 1 {
        log::info!(
            "target selector matched {} elements, anchoring index {}",
            matches.len(),
            args.index
        );
    }

    let generator = SelectorGenerator::new(config.generator);
    let selector = generator
        .generate(&doc, target)
        .context("No selector could be generated for that element")?;
    let out = GenerateReport {
        confidence: confidence(&selector),
        target: NodeReport::build(&doc, target),
        selector,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", out.selector);
        eprintln!("confidence: {}", out.confidence);
        eprintln!("target: {}", out.target.describe());
    }
    Ok(())
}

fn run_resolve(args: ResolveArgs, config: EngineConfig) -> Result<()> {
    let doc = load_document(&args.file)?;
    let mut engine = AnchorEngine::new(config);
    engine.insert_loaded(
        RESOLVE_NOTE_ID,
        &args.selector,
        args.text.as_deref().unwrap_or(""),
    );
    let event = engine.resolve(&doc, RESOLVE_NOTE_ID)?;
    let record = engine
        .record(RESOLVE_NOTE_ID)
        .context("Record disappeared during resolution")?;

    let out = ResolveReport {
        matched: event.current.is_some(),
        outcome: event.outcome,
        state: record.state(),
        selector: record.selector().to_string(),
        needs_disambiguation: record.needs_disambiguation(),
        node: event.current.map(|node| NodeReport::build(&doc, node)),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if let Some(node) = &out.node {
        println!("{}", node.describe());
        eprintln!("outcome: {:?}", out.outcome);
        if out.selector != args.selector.trim() {
            eprintln!("selector corrected to: {}", out.selector);
        }
    } else {
        eprintln!("No acceptable match; the note would be orphaned");
    }
    if !out.matched {
        std::process::exit(1);
    }
    Ok(())
}

fn run_validate(args: SelectorArg) -> Result<()> {
    let verdict = validate(&args.selector);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else if verdict.valid {
        println!("valid");
    } else {
        println!(
            "invalid: {}",
            verdict.reason.as_deref().unwrap_or("unspecified")
        );
    }
    if !verdict.valid {
        std::process::exit(1);
    }
    Ok(())
}

fn run_confidence(args: SelectorArg) -> Result<()> {
    let out = ConfidenceReport {
        confidence: confidence(&args.selector),
        selector: args.selector,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", out.confidence);
    }
    Ok(())
}

fn run_parse(args: SelectorArg) -> Result<()> {
    let parts = pagemark_selector::parse(&args.selector);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&parts)?);
        return Ok(());
    }
    if let Some(tag) = &parts.tag_name {
        println!("tag: {tag}");
    }
    if let Some(id) = &parts.id {
        println!("id: {id}");
    }
    if !parts.classes.is_empty() {
        let classes: Vec<&str> = parts.classes.iter().map(String::as_str).collect();
        println!("classes: {}", classes.join(" "));
    }
    for (name, expectation) in &parts.attributes {
        match expectation {
            AttrExpectation::Present => println!("attribute: [{name}]"),
            AttrExpectation::Value(value) => println!("attribute: [{name}={value:?}]"),
        }
    }
    if let Some(nth) = parts.nth_child {
        println!("nth-child: {nth}");
    }
    if parts.is_empty() {
        eprintln!("nothing extractable");
    }
    Ok(())
}

fn run_reconcile(args: ReconcileArgs, config: EngineConfig) -> Result<()> {
    let doc = load_document(&args.file)?;
    let notes = load_notes(&args.notes)?;

    let sink = CollectSink::default();
    let corrections = sink.handle();
    let mut engine = AnchorEngine::with_sink(config, Box::new(sink));
    for note in &notes {
        engine.insert_loaded(&note.note_id, &note.selector, &note.anchor_text);
    }

    let mut reports = Vec::with_capacity(notes.len());
    for note in &notes {
        let event = engine.resolve(&doc, &note.note_id)?;
        let record = engine
            .record(&note.note_id)
            .context("Record disappeared during reconciliation")?;
        reports.push(NoteReport {
            note_id: note.note_id.clone(),
            outcome: event.outcome,
            state: record.state(),
            selector: record.selector().to_string(),
            needs_disambiguation: record.needs_disambiguation(),
            node: event.current.map(|node| NodeReport::build(&doc, node)),
        });
    }

    let resolved = engine
        .records()
        .filter(|record| record.state() == AnchorState::Resolved)
        .count();
    let out = ReconcileReport {
        total: reports.len(),
        resolved,
        orphaned: engine.orphan_count(),
        notes: reports,
        corrections: corrections.borrow().clone(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for note in &out.notes {
            let location = note
                .node
                .as_ref()
                .map_or_else(|| "-".to_string(), NodeReport::describe);
            println!(
                "{}\t{:?}\t{:?}\t{}",
                note.note_id, note.state, note.outcome, location
            );
        }
        eprintln!(
            "{} note(s): {} resolved, {} orphaned",
            out.total, out.resolved, out.orphaned
        );
        for correction in &out.corrections {
            eprintln!("corrected {}: {}", correction.note_id, correction.selector);
        }
    }
    Ok(())
}

fn load_document(path: &Path) -> Result<Document> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_html(&html))
}

fn load_notes(path: &Path) -> Result<Vec<SelectorUpdate>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read notes file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| {
        format!(
            "Notes file {} is not a JSON array of {{noteId, selector, anchorText}} records",
            path.display()
        )
    })
}

/// Buffers the engine's persistence pushes so the reconcile report can list
/// which selectors were corrected.
#[derive(Default)]
struct CollectSink {
    updates: Rc<RefCell<Vec<SelectorUpdate>>>,
}

impl CollectSink {
    fn handle(&self) -> Rc<RefCell<Vec<SelectorUpdate>>> {
        Rc::clone(&self.updates)
    }
}

impl PersistenceSink for CollectSink {
    fn persist(&mut self, update: &SelectorUpdate) -> Result<()> {
        self.updates.borrow_mut().push(update.clone());
        Ok(())
    }
}
