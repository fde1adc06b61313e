use std::collections::HashSet;

use crate::model::QuestionId;

/// Anything the selector can pick from.
pub trait HasQuestionId {
    fn question_id(&self) -> QuestionId;
}

impl<T: HasQuestionId + ?Sized> HasQuestionId for &T {
    fn question_id(&self) -> QuestionId {
        (**self).question_id()
    }
}

/// First candidate, in input order, whose id is not in `mastered`.
///
/// Returns `None` when every candidate is mastered or there are none. This is
/// a plain linear scan with no side effects, cheap enough to call per render.
#[must_use]
pub fn next_question<'a, C: HasQuestionId>(
    candidates: &'a [C],
    mastered: &HashSet<QuestionId>,
) -> Option<&'a C> {
    candidates
        .iter()
        .find(|candidate| !mastered.contains(&candidate.question_id()))
}
