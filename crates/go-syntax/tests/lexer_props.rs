use go_syntax::lexer::{Lexer, Tok};
use go_syntax::parse_source;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]
    #[test]
    fn never_panics_and_progresses(s in ".*") {
        let lx = Lexer::new(&s);

        let mut max_end = 0usize;
        // end of the last token taken from the input, injected semis excluded
        let mut last_real_end = 0usize;
        let max_steps = s.len().saturating_mul(4) + 64;

        for (steps, (start, tok, end)) in lx.enumerate() {
            prop_assert!(start <= end, "start>end: ({start},{end}) tok={tok:?} input={s:?}");
            prop_assert!(end <= s.len(), "end out of bounds: ({start},{end}) tok={tok:?} input={s:?}");

            let injected_semi = tok == Tok::Semi && start == end;
            if injected_semi {
                prop_assert!(start >= max_end, "injected semi before progress: pos={start} input={s:?}");
            } else {
                prop_assert!(start >= last_real_end, "token moved backwards: {tok:?} ({start},{end}) input={s:?}");
                last_real_end = end;
            }
            max_end = max_end.max(end);

            prop_assert!(steps <= max_steps, "possible hang: steps={steps} input={s:?}");
        }
    }

    #[test]
    fn parser_never_panics(s in "(package p\n)?[a-z(){}\\[\\]*.,;= \n\"]{0,64}") {
        let _ = parse_source(&s);
    }
}
