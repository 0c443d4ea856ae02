//! Answer checking.
//!
//! A guess is right when, after dropping punctuation and case, it is exactly
//! one word of the canonical answer. Typing the whole answer of a multi-word
//! question therefore counts as wrong: "Maya Angelou" is matched by "maya"
//! or "angelou" but not by "maya angelou".

const STRIPPED: [char; 21] = [
    '.', ',', '/', '#', '!', '$', '%', '^', '&', '*', ';', ':', '{', '}', '=', '-', '_', '`',
    '~', '(', ')',
];

/// Lower-cased whitespace-separated words of the canonical answer.
pub fn accepted_tokens(answer: &str) -> Vec<String> {
    answer.split_whitespace().map(str::to_lowercase).collect()
}

/// The guess with punctuation removed and lower-cased. Whitespace is kept.
pub fn clean_guess(guess: &str) -> String {
    guess
        .chars()
        .filter(|c| !STRIPPED.contains(c))
        .collect::<String>()
        .to_lowercase()
}

pub fn is_correct(answer: &str, guess: &str) -> bool {
    let guess = clean_guess(guess);
    accepted_tokens(answer).iter().any(|token| *token == guess)
}
