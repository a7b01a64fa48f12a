//! Pure arithmetic question generation.

use rand::Rng;

/// A generated question before it is persisted: display text plus the
/// correct answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    /// Display text shown to players.
    pub question_text: String,
    /// The correct integer answer.
    pub answer: i64,
}

/// Generate a new arithmetic question from the injected random source.
///
/// One of four operators is picked uniformly; operand ranges are tuned per
/// operator so results stay in a friendly range. Division draws divisor and
/// quotient first and multiplies to obtain the dividend, so the quotient is
/// always an exact integer. Deterministic given the random source.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> QuestionDraft {
    match rng.random_range(0..4u8) {
        0 => {
            let a = rng.random_range(1..=50i64);
            let b = rng.random_range(1..=50i64);
            QuestionDraft {
                question_text: format!("{a} + {b}"),
                answer: a + b,
            }
        }
        1 => {
            // Minuend drawn above the subtrahend range keeps results positive.
            let a = rng.random_range(25..=74i64);
            let b = rng.random_range(1..=25i64);
            QuestionDraft {
                question_text: format!("{a} - {b}"),
                answer: a - b,
            }
        }
        2 => {
            let a = rng.random_range(1..=12i64);
            let b = rng.random_range(1..=12i64);
            QuestionDraft {
                question_text: format!("{a} × {b}"),
                answer: a * b,
            }
        }
        _ => {
            let divisor = rng.random_range(2..=11i64);
            let quotient = rng.random_range(1..=10i64);
            let dividend = divisor * quotient;
            QuestionDraft {
                question_text: format!("{dividend} ÷ {divisor}"),
                answer: quotient,
            }
        }
    }
}
