use std::{env, fs, process::ExitCode, time::Instant};

use msilc::{MsilcError, emit_program};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let mut file_path = None;
    let mut msil_only = false;
    for arg in args.iter().skip(1) {
        if arg == "--msil-only" {
            msil_only = true;
        } else if file_path.is_none() {
            file_path = Some(arg.clone());
        } else {
            eprintln!("error: unexpected argument `{arg}`");
            return ExitCode::from(1);
        }
    }
    let Some(file_path) = file_path else {
        eprintln!("usage: msilc [--msil-only] <source-file>");
        return ExitCode::from(1);
    };

    let source = match read_file(&file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(1);
        }
    };

    let start = Instant::now();
    let ast = match msilc::parse_source(&source) {
        Ok(ast) => ast,
        Err(err) => return report(&err),
    };
    if !msil_only {
        eprintln!("parsed in {:?}", start.elapsed());
        println!("{}", serde_json::to_string_pretty(&ast).expect("AST always serialises"));
    }

    let start = Instant::now();
    let checked = match msilc::check_source(&source) {
        Ok(ast) => ast,
        Err(err) => return report(&err),
    };
    if !msil_only {
        eprintln!("semantic check completed in {:?}", start.elapsed());
        println!("{}", serde_json::to_string_pretty(&checked).expect("AST always serialises"));
    }

    let start = Instant::now();
    let listing = emit_program(&checked);
    if !msil_only {
        eprintln!("emission completed in {:?}", start.elapsed());
    }
    print!("{listing}");
    ExitCode::SUCCESS
}

/// Exit code 2 for a semantic rejection, 1 for anything else that kept the program from
/// becoming well-formed (lex/parse failure), matching the CLI's three-way contract.
fn report(err: &MsilcError) -> ExitCode {
    eprintln!("error: {err}");
    match err {
        MsilcError::Semantic(_) => ExitCode::from(2),
        MsilcError::Lex(_) | MsilcError::Parse(_) => ExitCode::from(1),
    }
}

fn read_file(file_path: &str) -> Result<String, String> {
    eprintln!("reading file: {file_path}");
    match fs::metadata(file_path) {
        Ok(metadata) if !metadata.is_file() => return Err(format!("{file_path} is not a file")),
        Ok(_) => {}
        Err(err) => return Err(format!("reading {file_path}: {err}")),
    }
    fs::read_to_string(file_path).map_err(|err| format!("reading {file_path}: {err}"))
}
