//! mycelium CLI — single-shot repository topology analysis.
//!
//! Exit codes: 0 success, 1 invalid arguments, 2 I/O failure on the root
//! or output path, 3 internal error.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;

mod cli_args;

use cli_args::Cli;
use mycelium_core::cancel::CancellationToken;
use mycelium_core::config::AnalysisOptions;
use mycelium_core::types::{AnalysisError, Lang};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{e}");
            std::process::exit(0);
        }
        Err(e) => {
            eprint!("{e}");
            std::process::exit(1);
        }
    };
    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let languages = match parse_languages(cli.languages.as_deref()) {
        Ok(languages) => languages,
        Err(tag) => {
            eprintln!("mycelium: unknown language tag: {tag}");
            return 1;
        }
    };

    let options = AnalysisOptions {
        languages,
        exclude: cli.exclude.clone(),
        resolution: cli.resolution,
        max_processes: cli.max_processes,
        max_depth: cli.max_depth,
        ..Default::default()
    };

    let token = CancellationToken::new();
    let analysis = match mycelium_analysis::pipeline::run(&cli.root, &options, &token) {
        Ok(analysis) => analysis,
        Err(AnalysisError::InvalidRoot(path)) => {
            eprintln!("mycelium: root path is not a directory: {path}");
            return 2;
        }
        Err(AnalysisError::Io { path, source }) => {
            eprintln!("mycelium: i/o failure on {path}: {source}");
            return 2;
        }
        Err(e @ AnalysisError::Invariant { .. }) => {
            eprintln!("mycelium: internal error: {e}");
            return 3;
        }
        Err(AnalysisError::Cancelled) => {
            eprintln!("mycelium: cancelled");
            return 3;
        }
    };

    if cli.verbose {
        for timing in &analysis.timings {
            eprintln!("mycelium: phase {} took {}ms", timing.phase, timing.millis);
        }
    }

    let commit = mycelium_output::read_commit_hash(&cli.root);
    let artifact = mycelium_output::build(&analysis, commit, mycelium_output::artifact::now_iso8601());
    let json = mycelium_output::to_pretty_json(&artifact);

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.mycelium.json", analysis.root_name)));
    if let Err(e) = std::fs::write(&output, &json) {
        eprintln!("mycelium: cannot write {}: {e}", output.display());
        return 2;
    }

    if !cli.quiet {
        eprintln!(
            "mycelium: {} files, {} symbols, {} calls, {} communities, {} processes → {}",
            artifact.stats.files,
            artifact.stats.symbols,
            artifact.stats.call_edges,
            artifact.stats.communities,
            artifact.stats.processes,
            output.display()
        );
    }
    0
}

fn parse_languages(tags: Option<&[String]>) -> Result<Option<Vec<Lang>>, String> {
    let Some(tags) = tags else {
        return Ok(None);
    };
    let mut languages = Vec::new();
    for tag in tags {
        match Lang::from_tag(tag.trim()) {
            Some(lang) => languages.push(lang),
            None => return Err(tag.clone()),
        }
    }
    Ok(Some(languages))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_languages() {
        let tags = vec!["cs".to_string(), "ts".to_string()];
        let parsed = parse_languages(Some(&tags)).unwrap().unwrap();
        assert_eq!(parsed, vec![Lang::CSharp, Lang::TypeScript]);
        assert!(parse_languages(Some(&["cobol".to_string()][..])).is_err());
        assert!(parse_languages(None).unwrap().is_none());
    }

    #[test]
    fn test_invalid_root_exit_code() {
        let cli = Cli::try_parse_from(["mycelium", "/definitely/not/here"]).unwrap();
        assert_eq!(run(cli), 2);
    }

    #[test]
    fn test_unknown_language_exit_code() {
        let cli = Cli::try_parse_from(["mycelium", ".", "--languages", "cobol"]).unwrap();
        assert_eq!(run(cli), 1);
    }
}
