#![no_main]

use go_syntax::lexer::{Lexer, Tok};
use go_syntax::{leading_comments, parse_source, LineIndex};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);

    let mut max_end = 0usize;
    let max_steps = s.len().saturating_mul(4) + 64;
    for (steps, (start, tok, end)) in Lexer::new(&s).enumerate() {
        assert!(start <= end && end <= s.len());
        if !(tok == Tok::Semi && start == end) {
            assert!(end >= max_end);
        }
        max_end = max_end.max(end);
        assert!(steps <= max_steps);
    }

    let _ = leading_comments(&s);
    let lines = LineIndex::new(&s);
    if let Err(failure) = parse_source(&s) {
        for d in &failure.diags {
            assert!(d.span.start as usize <= s.len());
            let _ = lines.line(d.span.start);
        }
    }
});
