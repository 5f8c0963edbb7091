//! Vowel-group syllable approximation.

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')
}

/// Approximate syllables in a normalized (lower-case) word.
///
/// Counts maximal runs of vowels, drops a silent final `e` and never returns
/// less than one for a non-empty word.
pub fn count_syllables(word: &str) -> usize {
    if word.is_empty() {
        return 0;
    }
    let chars: Vec<char> = word.chars().collect();

    let mut groups = 0;
    let mut in_group = false;
    for &c in &chars {
        let vowel = is_vowel(c);
        if vowel && !in_group {
            groups += 1;
        }
        in_group = vowel;
    }

    // "make" -> 1, but "be" and "the" keep their only vowel and "free" its pair.
    let n = chars.len();
    if groups > 1 && n >= 2 && chars[n - 1] == 'e' && !is_vowel(chars[n - 2]) && !ends_with_le(&chars) {
        groups -= 1;
    }
    groups.max(1)
}

/// Consonant + "le" endings ("table", "simple") are voiced.
fn ends_with_le(chars: &[char]) -> bool {
    let n = chars.len();
    n >= 3 && chars[n - 2] == 'l' && chars[n - 1] == 'e' && !is_vowel(chars[n - 3])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_words() {
        assert_eq!(count_syllables("the"), 1);
        assert_eq!(count_syllables("quick"), 1);
        assert_eq!(count_syllables("over"), 2);
        assert_eq!(count_syllables("lazy"), 2);
        assert_eq!(count_syllables("make"), 1);
        assert_eq!(count_syllables("table"), 2);
        assert_eq!(count_syllables("beautiful"), 3);
        assert_eq!(count_syllables("free"), 1);
    }

    #[test]
    fn minimum_one_for_words_without_vowels() {
        assert_eq!(count_syllables("rhythm"), 1);
        assert_eq!(count_syllables("2024"), 1);
        assert_eq!(count_syllables(""), 0);
    }
}
