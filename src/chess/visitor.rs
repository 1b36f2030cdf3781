use pgn_reader::{Nag, RawComment, SanPlus, Skip, Visitor};
use std::ops::ControlFlow;

#[macro_export]
macro_rules! pgn_visitor_skip_variations {
    () => {
        fn nag(&mut self, _: &mut Self::Movetext, _: Nag) -> ControlFlow<Self::Output> {
            ControlFlow::Continue(())
        }

        fn comment(
            &mut self,
            _: &mut Self::Movetext,
            _: RawComment<'_>,
        ) -> ControlFlow<Self::Output> {
            ControlFlow::Continue(())
        }

        fn partial_comment(
            &mut self,
            _: &mut Self::Movetext,
            _: RawComment<'_>,
        ) -> ControlFlow<Self::Output> {
            ControlFlow::Continue(())
        }

        fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
            ControlFlow::Continue(Skip(true))
        }
    };
}

/// Counts the SAN moves on the mainline of one game (pgn-reader).
///
/// Tags, comments, NAGs and variations are ignored; the movetext accumulator
/// is the running half-move count.
pub struct MainlineCounter;

impl Visitor for MainlineCounter {
    type Tags = ();
    type Movetext = u32;
    type Output = u32;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(0)
    }

    fn san(&mut self, half_moves: &mut Self::Movetext, _: SanPlus) -> ControlFlow<Self::Output> {
        *half_moves += 1;
        ControlFlow::Continue(())
    }

    pgn_visitor_skip_variations!();

    fn end_game(&mut self, half_moves: Self::Movetext) -> Self::Output {
        half_moves
    }
}
