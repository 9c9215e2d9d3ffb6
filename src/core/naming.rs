//! Identifier normalization for generated action and predicate names.

/// Camel-case a free-form name.
///
/// Runs of characters that are neither alphanumeric nor `_` separate words.
/// The first word is kept as written, every following word gets an upper-case
/// first letter.
///
/// ```rust
/// use machina::core::naming::to_camel_case;
///
/// assert_eq!(to_camel_case("run baby run"), "runBabyRun");
/// assert_eq!(to_camel_case("go-to  sleep"), "goToSleep");
/// assert_eq!(to_camel_case("running_abzar"), "running_abzar");
/// ```
pub fn to_camel_case(text: &str) -> String {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .enumerate()
        .map(|(index, word)| {
            if index == 0 {
                word.to_string()
            } else {
                capitalize(word)
            }
        })
        .collect()
}

/// Identifier under which an action is reachable on a machine.
pub fn action_identifier(action: &str) -> String {
    to_camel_case(action)
}

/// Identifier of the `isX` predicate generated for a state.
///
/// ```rust
/// use machina::core::naming::predicate_identifier;
///
/// assert_eq!(predicate_identifier("idle"), "isIdle");
/// assert_eq!(predicate_identifier("waiting for input"), "isWaitingForInput");
/// ```
pub fn predicate_identifier(state: &str) -> String {
    format!("is{}", capitalize(&to_camel_case(state)))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_word_is_unchanged() {
        assert_eq!(to_camel_case("run"), "run");
        assert_eq!(to_camel_case("Run"), "Run");
    }

    #[test]
    fn separators_are_dropped() {
        assert_eq!(to_camel_case("  run   baby  "), "runBaby");
        assert_eq!(to_camel_case("fetch.user/data"), "fetchUserData");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn predicates_capitalize_the_first_word() {
        assert_eq!(predicate_identifier("running_abzar"), "isRunning_abzar");
        assert_eq!(predicate_identifier("Done"), "isDone");
    }

    #[test]
    fn non_ascii_words_are_capitalized() {
        assert_eq!(to_camel_case("go über"), "goÜber");
    }
}
