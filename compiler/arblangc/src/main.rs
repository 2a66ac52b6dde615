//! Arblang Compiler CLI.
//!
//! A single-file driver: `arblangc [-o <prefix>] [-N <namespace>] [-v] \
//! [--emit=ir|preprint] <input.arbl>`. Grounded on `oric::main`'s hand-rolled
//! flag parsing over `std::env::args()` (no `clap`/`argh` dependency for a
//! flag set this small), scaled down to this workspace's much smaller
//! surface: one mandatory input file, no subcommands.

mod render;
mod tracing_setup;

use std::process::ExitCode;

use arblang_compiler::{compile, render_error, CompileConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Emit {
    Ir,
    Preprint,
}

struct Cli {
    input: String,
    prefix: Option<String>,
    namespace: Option<String>,
    verbose: bool,
    emit: Emit,
}

fn parse_args(args: &[String]) -> Result<Cli, String> {
    let mut input = None;
    let mut prefix = None;
    let mut namespace = None;
    let mut verbose = false;
    let mut emit = Emit::Preprint;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-o" => {
                i += 1;
                let value = args.get(i).ok_or("-o requires an argument")?;
                prefix = Some(value.clone());
            }
            "-N" => {
                i += 1;
                let value = args.get(i).ok_or("-N requires an argument")?;
                namespace = Some(value.clone());
            }
            "-v" | "--verbose" => verbose = true,
            "--emit=ir" => emit = Emit::Ir,
            "--emit=preprint" => emit = Emit::Preprint,
            other if other.starts_with("--emit=") => {
                return Err(format!("unknown --emit value: `{}` (expected `ir` or `preprint`)", &other[7..]));
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(format!("unknown flag: `{other}`"));
            }
            _ => {
                if input.is_some() {
                    return Err(format!("unexpected extra argument: `{arg}`"));
                }
                input = Some(arg.clone());
            }
        }
        i += 1;
    }

    let input = input.ok_or("missing input file")?;
    Ok(Cli { input, prefix, namespace, verbose, emit })
}

fn print_usage() {
    eprintln!("Usage: arblangc [-o <prefix>] [-N <namespace>] [-v] [--emit=ir|preprint] <input.arbl>");
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(message) => {
            eprintln!("arblangc: {message}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    tracing_setup::init(cli.verbose);

    let source = match std::fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("arblangc: could not read '{}': {e}", cli.input);
            return ExitCode::FAILURE;
        }
    };

    let config = CompileConfig { file_path: cli.input.clone() };
    let output = compile(&source, &config);

    if let Some(error) = output.error {
        eprintln!("{}", render_error(&cli.input, &error));
        return ExitCode::FAILURE;
    }

    let rendered = match (cli.emit, &output.ir, &output.mechanism) {
        (Emit::Ir, Some(ir), _) => render::render_ir(ir),
        (Emit::Preprint, _, Some(mechanism)) => render::render_preprint(mechanism),
        _ => {
            eprintln!("arblangc: internal error: compilation reported success with no output");
            return ExitCode::FAILURE;
        }
    };

    if let (Some(namespace), Some(prefix)) = (&cli.namespace, &cli.prefix) {
        println!("# namespace: {namespace}, prefix: {prefix}");
    }
    print!("{rendered}");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_mandatory_input_file() {
        let cli = parse_args(&["mech.arbl".to_string()]).unwrap();
        assert_eq!(cli.input, "mech.arbl");
        assert_eq!(cli.emit, Emit::Preprint);
        assert!(!cli.verbose);
    }

    #[test]
    fn parses_every_flag_together() {
        let args: Vec<String> = ["-o", "out", "-N", "ns", "-v", "--emit=ir", "mech.arbl"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let cli = parse_args(&args).unwrap();
        assert_eq!(cli.prefix.as_deref(), Some("out"));
        assert_eq!(cli.namespace.as_deref(), Some("ns"));
        assert!(cli.verbose);
        assert_eq!(cli.emit, Emit::Ir);
        assert_eq!(cli.input, "mech.arbl");
    }

    #[test]
    fn missing_input_file_is_an_error() {
        let err = parse_args(&["-v".to_string()]).unwrap_err();
        assert!(err.contains("missing input file"));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = parse_args(&["--bogus".to_string(), "mech.arbl".to_string()]).unwrap_err();
        assert!(err.contains("--bogus"));
    }
}
