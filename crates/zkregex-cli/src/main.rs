//! zkregex CLI
//!
//! Compile regular expressions into circuit programs, inspect them, evaluate
//! them natively and check their halo2 layout with the mock prover.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use halo2_proofs::dev::MockProver;
use halo2curves::pasta::Fp;
use std::{
    fs,
    path::{Path, PathBuf},
};
use zkregex_compiler::{
    compile, pad_input, to_json_string, minimal_dfa, AcceptMode, CircuitConfig, CompileOptions,
    CompiledArtifact, Halo2Renderer, RevealRequest,
};
use zkregex_runtime::{evaluate, ListingRenderer, Renderer, Verdict};

#[derive(Parser)]
#[command(name = "zkregex")]
#[command(about = "Compile regular expressions into zero-knowledge circuits", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a pattern and write the artifact JSON
    Compile {
        pattern: String,

        #[command(flatten)]
        options: OptionArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the minimal automaton as JSON
    Graph { pattern: String },

    /// Print a human-readable listing of the compiled circuit
    Render {
        pattern: String,

        #[command(flatten)]
        options: OptionArgs,

        /// Annotate printable byte codes
        #[arg(long)]
        annotate: bool,
    },

    /// Evaluate a pattern over an input natively
    Eval {
        pattern: String,
        input: String,

        #[command(flatten)]
        options: OptionArgs,

        /// Zero-pad the input to this many bytes
        #[arg(long)]
        pad: Option<usize>,
    },

    /// Lay the circuit out in halo2 and verify it with the mock prover
    Check {
        pattern: String,
        input: String,

        #[command(flatten)]
        options: OptionArgs,

        /// Zero-pad the input to this many bytes
        #[arg(long)]
        pad: Option<usize>,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct OptionArgs {
    /// Acceptance mode: count, exists or universal
    #[arg(short, long)]
    mode: Option<AcceptMode>,

    /// Reveal the bytes matched by a sub-pattern (repeatable)
    #[arg(short, long = "reveal")]
    reveal: Vec<String>,

    /// Reveal the bytes consumed on explicit edges: NAME=FROM:TO,FROM:TO (repeatable)
    #[arg(long = "reveal-edges", value_parser = parse_edge_reveal)]
    reveal_edges: Vec<RevealRequest>,

    /// JSON options file; flags override its values
    #[arg(long = "options")]
    file: Option<PathBuf>,
}

fn load_options(path: &Path) -> Result<CompileOptions> {
    let content =
        fs::read_to_string(path).context(format!("Failed to read options file: {:?}", path))?;

    serde_json::from_str(&content).context("Failed to parse options JSON")
}

/// File values first, then flags; reveal flags replace the file's reveal list
fn resolve_options(args: &OptionArgs) -> Result<CompileOptions> {
    let mut options = match &args.file {
        Some(path) => load_options(path)?,
        None => CompileOptions::default(),
    };

    if let Some(mode) = args.mode {
        options.acceptance = mode;
    }

    if !args.reveal.is_empty() || !args.reveal_edges.is_empty() {
        options.reveals = args.reveal.iter().map(RevealRequest::substring).collect();
        options.reveals.extend(args.reveal_edges.iter().cloned());
    }

    Ok(options)
}

fn parse_edge_reveal(spec: &str) -> std::result::Result<RevealRequest, String> {
    let (name, edges) = spec
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=FROM:TO,..., got '{}'", spec))?;
    if name.is_empty() {
        return Err("reveal name must not be empty".to_string());
    }

    let edges = edges
        .split(',')
        .map(|pair| {
            let (from, to) =
                pair.split_once(':').ok_or_else(|| format!("expected FROM:TO, got '{}'", pair))?;
            let from = from.trim().parse().map_err(|_| format!("bad state '{}'", from))?;
            let to = to.trim().parse().map_err(|_| format!("bad state '{}'", to))?;
            Ok((from, to))
        })
        .collect::<std::result::Result<Vec<(usize, usize)>, String>>()?;

    Ok(RevealRequest::Edges { name: name.to_string(), edges })
}

/// Zero bytes print as `.`, other non-printables as `\xNN`
fn display_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| match *b {
            0 => ".".to_string(),
            b if b.is_ascii_graphic() || b == b' ' => (b as char).to_string(),
            b => format!("\\x{:02x}", b),
        })
        .collect()
}

fn prepare_input(input: &str, pad: Option<usize>) -> Result<Vec<u8>> {
    match pad {
        Some(len) => pad_input(input.as_bytes(), len).context("Failed to pad input"),
        None => Ok(input.as_bytes().to_vec()),
    }
}

fn compile_pattern(pattern: &str, args: &OptionArgs) -> Result<CompiledArtifact> {
    let options = resolve_options(args)?;
    compile(pattern, &options).context(format!("Failed to compile pattern {:?}", pattern))
}

fn write_artifact(artifact: &CompiledArtifact, output: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(artifact).context("Failed to serialize artifact")?;

    match output {
        Some(path) => {
            fs::write(&path, &json).context(format!("Failed to write artifact to {:?}", path))?;
            println!("✅ Compiled {:?}", artifact.pattern);
            println!("   States: {}", artifact.program.state_count);
            println!("   Ops per byte: {}", artifact.program.step.len());
            println!("   Reveals: {}", artifact.program.reveals.len());
            println!("   Output: {:?}", path);
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn eval_command(pattern: &str, input: &str, args: &OptionArgs, pad: Option<usize>) -> Result<()> {
    let artifact = compile_pattern(pattern, args)?;
    let bytes = prepare_input(input, pad)?;
    let evaluation = evaluate(&artifact.program, &bytes).context("Evaluation failed")?;

    println!("🔍 Pattern: {:?} ({:?})", pattern, artifact.program.acceptance);
    println!("   Input: {}", display_bytes(&bytes));
    match evaluation.verdict {
        Verdict::Match(true) => println!("✅ Match"),
        Verdict::Match(false) => println!("❌ No match"),
        Verdict::Count(count) => println!("📊 Matches: {}", count),
    }
    for reveal in &evaluation.reveals {
        println!("   Reveal {:?}: {}", reveal.name, display_bytes(&reveal.bytes));
    }

    Ok(())
}

fn check_command(pattern: &str, input: &str, args: &OptionArgs, pad: Option<usize>) -> Result<()> {
    let artifact = compile_pattern(pattern, args)?;
    let bytes = prepare_input(input, pad)?;
    let config = CircuitConfig::for_artifact(&artifact, bytes.len());

    println!("🔑 Laying out circuit with k={} over {} bytes...", config.k, config.input_len);
    let circuit = Halo2Renderer::<Fp>::new(bytes.len())
        .render(&artifact)
        .context("Failed to render circuit")?
        .with_input(&bytes)
        .context("Failed to set circuit input")?;
    let public = circuit.public_inputs().context("Failed to compute public inputs")?;

    println!("🔍 Running mock prover...");
    let prover = MockProver::run(config.k, &circuit, vec![public])
        .map_err(|e| anyhow::anyhow!("Mock prover failed to run: {:?}", e))?;

    match prover.verify() {
        Ok(()) => {
            println!("✅ Circuit is satisfied");
            Ok(())
        }
        Err(failures) => {
            println!("❌ Circuit is NOT satisfied ({} failures)", failures.len());
            for failure in failures.iter().take(5) {
                println!("   {}", failure);
            }
            anyhow::bail!("Constraint check failed")
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile { pattern, options, output } => {
            let artifact = compile_pattern(&pattern, &options)?;
            write_artifact(&artifact, output)?;
        }
        Commands::Graph { pattern } => {
            let dfa = minimal_dfa(&pattern)
                .context(format!("Failed to build automaton for {:?}", pattern))?;
            println!("{}", to_json_string(&dfa)?);
        }
        Commands::Render { pattern, options, annotate } => {
            let artifact = compile_pattern(&pattern, &options)?;
            let listing = ListingRenderer { annotate_bytes: annotate }
                .render(&artifact)
                .context("Failed to render listing")?;
            print!("{}", listing);
        }
        Commands::Eval { pattern, input, options, pad } => {
            eval_command(&pattern, &input, &options, pad)?;
        }
        Commands::Check { pattern, input, options, pad } => {
            check_command(&pattern, &input, &options, pad)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_options_valid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"acceptance": "count", "reveals": [{{"kind": "substring", "pattern": "b"}}]}}"#
        )
        .unwrap();

        let options = load_options(file.path()).unwrap();
        assert_eq!(options.acceptance, AcceptMode::Count);
        assert_eq!(options.reveals, vec![RevealRequest::substring("b")]);
    }

    #[test]
    fn test_load_options_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"acceptance": sometimes}}"#).unwrap();

        assert!(load_options(file.path()).is_err());
    }

    #[test]
    fn test_load_options_missing_file() {
        assert!(load_options(Path::new("/nonexistent/options.json")).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"acceptance": "count", "reveals": [{{"kind": "substring", "pattern": "a"}}]}}"#
        )
        .unwrap();

        let args = OptionArgs {
            mode: Some(AcceptMode::Exists),
            reveal: vec!["b".to_string()],
            reveal_edges: vec![],
            file: Some(file.path().to_path_buf()),
        };
        let options = resolve_options(&args).unwrap();
        assert_eq!(options.acceptance, AcceptMode::Exists);
        assert_eq!(options.reveals, vec![RevealRequest::substring("b")]);
    }

    #[test]
    fn test_file_values_kept_without_flags() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"acceptance": "count"}}"#).unwrap();

        let args = OptionArgs { file: Some(file.path().to_path_buf()), ..OptionArgs::default() };
        let options = resolve_options(&args).unwrap();
        assert_eq!(options.acceptance, AcceptMode::Count);
        assert!(options.reveals.is_empty());
    }

    #[test]
    fn test_parse_edge_reveal() {
        assert_eq!(
            parse_edge_reveal("tail=1:2,2:2").unwrap(),
            RevealRequest::Edges { name: "tail".to_string(), edges: vec![(1, 2), (2, 2)] }
        );
        assert!(parse_edge_reveal("tail").is_err());
        assert!(parse_edge_reveal("=1:2").is_err());
        assert!(parse_edge_reveal("tail=1-2").is_err());
        assert!(parse_edge_reveal("tail=x:2").is_err());
    }

    #[test]
    fn test_display_bytes() {
        assert_eq!(display_bytes(b"fl\0g"), "fl.g");
        assert_eq!(display_bytes(b"a\nb"), "a\\x0ab");
    }

    #[test]
    fn test_prepare_input() {
        assert_eq!(prepare_input("ab", Some(4)).unwrap(), b"ab\0\0".to_vec());
        assert_eq!(prepare_input("ab", None).unwrap(), b"ab".to_vec());
        assert!(prepare_input("abc", Some(2)).is_err());
    }

    #[test]
    fn test_write_artifact_to_file() {
        let artifact = compile_pattern("ab", &OptionArgs::default()).unwrap();
        let file = NamedTempFile::new().unwrap();

        write_artifact(&artifact, Some(file.path().to_path_buf())).unwrap();
        let content = fs::read_to_string(file.path()).unwrap();
        let back: CompiledArtifact = serde_json::from_str(&content).unwrap();
        assert_eq!(back, artifact);
    }

    #[test]
    fn test_check_command_satisfied() {
        let args = OptionArgs { reveal: vec!["b".to_string()], ..OptionArgs::default() };
        assert!(check_command("ab", "xab", &args, Some(6)).is_ok());
    }

    #[test]
    fn test_eval_command_rejects_bad_pattern() {
        assert!(eval_command("a||b", "ab", &OptionArgs::default(), None).is_err());
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from([
            "zkregex",
            "eval",
            "(mina|MINA)+",
            "stamina",
            "--mode",
            "count",
            "--reveal",
            "mina",
            "--reveal-edges",
            "loop=7:2",
            "--pad",
            "16",
        ]);
        match cli.command {
            Commands::Eval { pattern, input, options, pad } => {
                assert_eq!(pattern, "(mina|MINA)+");
                assert_eq!(input, "stamina");
                assert_eq!(options.mode, Some(AcceptMode::Count));
                assert_eq!(options.reveal, vec!["mina".to_string()]);
                assert_eq!(options.reveal_edges.len(), 1);
                assert_eq!(pad, Some(16));
            }
            _ => panic!("expected eval"),
        }
    }
}
