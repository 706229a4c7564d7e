//! exigram CLI: kompiliert ein JSON-Typ-Modell und gibt Grammars oder String-Tabellen aus.

use clap::{Args, Parser, Subcommand};
use exigram::{CompileOptions, CompiledSchema, QName, compile_with_options, parse_schema};
use std::fmt::Write as _;
use std::io::{IsTerminal, Read, Write};
use std::process;

#[derive(Parser)]
#[command(name = "exigram", about = "Schema-informed EXI grammar compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a type model and print its grammars
    Compile(CompileArgs),
    /// Compile a type model and print the canonical string tables
    Tables(CommonArgs),
}

#[derive(Args)]
struct CompileArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Only print the grammar of this named type (NS:NAME, ":NAME" for no namespace)
    #[arg(long = "type", value_name = "NS:NAME")]
    type_name: Option<String>,
}

#[derive(Args)]
struct CommonArgs {
    /// JSON type model ("-" for stdin)
    #[arg(short, long)]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Skip unsupported constructs with a warning instead of failing
    #[arg(long)]
    skip_unsupported: bool,

    /// Order attribute uses by local name, then namespace
    #[arg(long)]
    sort_attributes: bool,
}

impl CommonArgs {
    fn to_options(&self) -> CompileOptions {
        let mut opts = CompileOptions::default();
        opts.set_skip_unsupported(self.skip_unsupported);
        opts.set_sort_attributes(self.sort_attributes);
        opts
    }

    fn compile(&self) -> Result<CompiledSchema, String> {
        let bytes = read_input(&self.input)?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| format!("input '{}' is not UTF-8: {e}", self.input))?;
        let schema = parse_schema(text).map_err(|e| e.to_string())?;
        compile_with_options(&schema, self.to_options()).map_err(|e| e.to_string())
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Compile(args) => run_compile(args),
        Command::Tables(args) => run_tables(args),
    }
}

fn run_compile(args: CompileArgs) -> Result<(), String> {
    let compiled = args.common.compile()?;
    let mut out = String::new();

    match args.type_name.as_deref() {
        Some(name) => {
            let (ns, local) = name
                .rsplit_once(':')
                .ok_or_else(|| format!("expected NS:NAME, got '{name}'"))?;
            let tg = compiled
                .type_grammar(ns, local)
                .ok_or_else(|| format!("unknown type {}", QName::new(ns, local)))?;
            dump_grammar(&mut out, &compiled, &format!("type {}", QName::new(ns, local)), tg.grammar)?;
        }
        None => {
            for (name, tg) in compiled.type_grammars() {
                dump_grammar(&mut out, &compiled, &format!("type {name}"), tg.grammar)?;
                dump_grammar(&mut out, &compiled, &format!("type {name} (empty)"), tg.empty)?;
            }
            for e in compiled.global_elements().iter() {
                let label = format!("element {}", QName::new(e.uri.as_str(), e.local_name.as_str()));
                dump_grammar(&mut out, &compiled, &label, e.grammar)?;
            }
            for e in compiled.local_elements() {
                let label = format!("local element {}", QName::new(e.uri.as_str(), e.local_name.as_str()));
                dump_grammar(&mut out, &compiled, &label, e.grammar)?;
            }
        }
    }

    write_output(args.common.output.as_deref(), &out)
}

fn dump_grammar(
    out: &mut String,
    compiled: &CompiledSchema,
    label: &str,
    id: exigram::GrammarId,
) -> Result<(), String> {
    let grammar = compiled
        .grammar(id)
        .ok_or_else(|| format!("dangling grammar {id}"))?;
    writeln!(out, "{label} [{id}]:").map_err(|e| e.to_string())?;
    write!(out, "{grammar}").map_err(|e| e.to_string())
}

fn run_tables(args: CommonArgs) -> Result<(), String> {
    let compiled = args.compile()?;
    let mut out = String::new();

    for (uri_id, row) in compiled.uri_table().rows().iter().enumerate() {
        writeln!(out, "uri {uri_id}: {:?}", row.string.as_str()).map_err(|e| e.to_string())?;
        if let Some(prefixes) = &row.prefix_table {
            for (i, p) in prefixes.rows().iter().enumerate() {
                writeln!(out, "  prefix {i}: {:?}", p.string.as_str()).map_err(|e| e.to_string())?;
            }
        }
        if let Some(lns) = &row.ln_table {
            for (i, ln) in lns.rows().iter().enumerate() {
                writeln!(out, "  ln {i}: {}", ln.string).map_err(|e| e.to_string())?;
            }
        }
    }
    for e in compiled.global_elements().iter() {
        writeln!(
            out,
            "global {}:{} -> {}",
            e.qname.uri, e.qname.ln, e.grammar
        )
        .map_err(|e| e.to_string())?;
    }

    write_output(args.output.as_deref(), &out)
}

fn read_input(path: &str) -> Result<Vec<u8>, String> {
    if path == "-" {
        if std::io::stdin().is_terminal() {
            eprintln!("reading from stdin (Ctrl+D to finish)...");
        }
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| format!("read error (stdin): {e}"))?;
        Ok(buf)
    } else {
        std::fs::read(path).map_err(|e| format!("read error '{path}': {e}"))
    }
}

fn write_output(path: Option<&str>, text: &str) -> Result<(), String> {
    match path {
        None | Some("-") => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(text.as_bytes())
                .and_then(|()| lock.flush())
                .map_err(|e| format!("write error (stdout): {e}"))
        }
        Some(path) => std::fs::write(path, text).map_err(|e| format!("write error '{path}': {e}")),
    }
}
