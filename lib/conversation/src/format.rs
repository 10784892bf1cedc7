//! Display normalisation for generated replies.

/// Bullet glyph the model uses inline for list items.
pub const BULLET: char = '\u{2022}';

/// Puts every bullet on its own line by prefixing it with a newline.
///
/// Text without a bullet is returned unchanged.
#[must_use]
pub fn format_response(text: &str) -> String {
    text.replace(BULLET, "\n\u{2022}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_bullets_is_unchanged() {
        let text = "Rest, drink water.\n- keep warm";
        assert_eq!(format_response(text), text);
    }

    #[test]
    fn bullets_start_new_lines() {
        assert_eq!(
            format_response("Try: \u{2022} ginger tea \u{2022} rest"),
            "Try: \n\u{2022} ginger tea \n\u{2022} rest"
        );
    }

    #[test]
    fn formatting_is_deterministic() {
        let text = "\u{2022}a\u{2022}b";
        assert_eq!(format_response(text), format_response(text));
        assert_eq!(format_response(text), "\n\u{2022}a\n\u{2022}b");
    }
}
