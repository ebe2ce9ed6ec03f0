/// Word-wise title-casing for member names. Every word — including ones
/// with apostrophes (O'connor) and nobiliary particles (van, de, Mc) —
/// gets exactly one leading capital with the remainder folded to
/// lowercase; no interior letters are re-capitalized.
pub fn capitalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let rest: String = chars.collect::<String>().to_lowercase();
    format!("{}{rest}", first.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_plain_names() {
        assert_eq!(capitalize_name("john smith"), "John Smith");
        assert_eq!(capitalize_name("  JANE   DOE "), "Jane Doe");
    }

    #[test]
    fn preserves_apostrophe_names() {
        assert_eq!(capitalize_name("shay o'connor"), "Shay O'connor");
    }

    #[test]
    fn handles_particles() {
        assert_eq!(capitalize_name("ludwig van beethoven"), "Ludwig Van Beethoven");
        assert_eq!(capitalize_name("amara de silva"), "Amara De Silva");
    }

    #[test]
    fn empty_name_stays_empty() {
        assert_eq!(capitalize_name(""), "");
        assert_eq!(capitalize_name("   "), "");
    }
}
