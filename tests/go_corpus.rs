//! Opt-in run over a real Go tree (for example `$GOROOT/src`):
//! `GOCLIENTGEN_CORPUS=/usr/local/go/src cargo test --test go_corpus`.

use go_syntax::parse_source;
use goclientgen::config::GoEnv;
use goclientgen::loader::{matches_constraints, matches_file_name};
use walkdir::WalkDir;

#[test]
fn parses_go_corpus_if_configured() {
    let Some(root) = std::env::var_os("GOCLIENTGEN_CORPUS") else {
        eprintln!("GOCLIENTGEN_CORPUS not set; skipping corpus test");
        return;
    };

    let env = GoEnv::default();
    let mut total = 0usize;
    let mut skipped = 0usize;

    for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("go") {
            continue;
        }
        // testdata holds deliberately broken files
        if path.components().any(|c| c.as_os_str() == "testdata") {
            continue;
        }
        let Ok(src) = std::fs::read_to_string(path) else {
            continue;
        };
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if !matches_file_name(name, &env)
            || !matches_constraints(go_syntax::leading_comments(&src), &env)
        {
            skipped += 1;
            continue;
        }

        total += 1;
        if let Err(f) = parse_source(&src) {
            eprintln!("FAILED: {}", path.display());
            for d in f.diags.iter().take(8) {
                eprintln!("  {:?} {:?}: {}", d.kind, d.span, d.message);
            }
            panic!("Go corpus parse failed after {total} files");
        }
    }

    eprintln!("Parsed {total} Go files ({skipped} excluded by build constraints).");
}
