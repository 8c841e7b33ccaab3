//! Multiple-choice answer grading.
//!
//! A question carries a list of [`AnswerChoice`] entries, exactly one of
//! which should be marked correct. Grading tolerates malformed questions:
//! a selection that matches no correct choice is simply incorrect.

use serde::{Deserialize, Serialize};

/// One selectable answer of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerChoice {
    pub value: String,
    #[serde(default)]
    pub correct: bool,
}

/// Returns `true` when `selected` names a choice that is marked correct.
pub fn is_correct(choices: &[AnswerChoice], selected: &str) -> bool {
    choices.iter().any(|c| c.correct && c.value == selected)
}

/// Number of choices flagged as correct.
pub fn correct_choice_count(choices: &[AnswerChoice]) -> usize {
    choices.iter().filter(|c| c.correct).count()
}

/// Validate the shape of a question before it is stored.
///
/// The question text must be non-blank and at least one choice must be
/// marked correct. More than one correct choice is tolerated, since
/// generated content occasionally has it and grading already copes.
pub fn validate_question(question: &str, choices: &[AnswerChoice]) -> Result<(), String> {
    if question.trim().is_empty() {
        return Err("Question text must not be empty".to_string());
    }
    if choices.is_empty() {
        return Err("Question must have at least one answer choice".to_string());
    }
    if correct_choice_count(choices) == 0 {
        return Err("Question must have a correct answer choice".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices() -> Vec<AnswerChoice> {
        vec![
            AnswerChoice { value: "Paris".into(), correct: true },
            AnswerChoice { value: "Lyon".into(), correct: false },
            AnswerChoice { value: "Nice".into(), correct: false },
        ]
    }

    #[test]
    fn matching_correct_choice_is_correct() {
        assert!(is_correct(&choices(), "Paris"));
    }

    #[test]
    fn matching_wrong_choice_is_incorrect() {
        assert!(!is_correct(&choices(), "Lyon"));
    }

    #[test]
    fn unknown_selection_is_incorrect() {
        assert!(!is_correct(&choices(), "Marseille"));
    }

    #[test]
    fn question_without_correct_choice_grades_everything_incorrect() {
        let none_correct: Vec<AnswerChoice> = choices()
            .into_iter()
            .map(|c| AnswerChoice { correct: false, ..c })
            .collect();
        assert_eq!(correct_choice_count(&none_correct), 0);
        assert!(!is_correct(&none_correct, "Paris"));
    }

    #[test]
    fn selection_is_case_sensitive() {
        assert!(!is_correct(&choices(), "paris"));
    }

    #[test]
    fn validate_question_rejects_blank_text_and_missing_choices() {
        assert!(validate_question("  ", &choices()).is_err());
        assert!(validate_question("Capital of France?", &[]).is_err());
        assert!(validate_question("Capital of France?", &choices()).is_ok());
    }

    #[test]
    fn validate_question_requires_a_correct_choice() {
        let none_correct: Vec<AnswerChoice> = choices()
            .into_iter()
            .map(|c| AnswerChoice { correct: false, ..c })
            .collect();
        assert_eq!(
            validate_question("Capital of France?", &none_correct).unwrap_err(),
            "Question must have a correct answer choice"
        );

        let mut two_correct = choices();
        two_correct[1].correct = true;
        assert!(validate_question("Capital of France?", &two_correct).is_ok());
    }

    #[test]
    fn correct_defaults_to_false_when_absent() {
        let parsed: AnswerChoice = serde_json::from_str(r#"{"value":"A"}"#).unwrap();
        assert!(!parsed.correct);
    }
}
