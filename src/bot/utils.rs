/// Truncates `content` to `max_length` characters, marking the cut with an ellipsis.
pub(crate) fn shorten_content(content: &str, max_length: usize) -> String {
    if content.chars().count() <= max_length {
        content.to_owned()
    } else {
        let shortened = content.chars().take(max_length).collect::<String>();
        shortened.trim_end().to_owned() + "…"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_untouched() {
        assert_eq!(shorten_content("fix bug", 50), "fix bug");
        assert_eq!(shorten_content("", 50), "");
    }

    #[test]
    fn long_content_is_truncated() {
        let long = "a".repeat(60);
        let shortened = shorten_content(&long, 50);

        assert_eq!(shortened, format!("{}…", "a".repeat(50)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "é".repeat(60);
        assert_eq!(shorten_content(&long, 3), "ééé…");
    }
}
