//! Telegram MarkdownV2 helpers.
//!
//! Telegram rejects the whole message when a reserved character appears
//! unescaped outside of an entity, so every piece of free text has to go
//! through [`escape_markdown`] before it is embedded.

use crate::model::Article;

const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    '\\',
];

pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        if RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Builds the channel post for an article: bold title, optional synopsis,
/// then the link.
pub fn compose_article_message(article: &Article, synopsis: &str) -> String {
    let synopsis = synopsis.trim();
    let synopsis = if synopsis.is_empty() {
        String::new()
    } else {
        format!("\n\n{}", escape_markdown(synopsis))
    };

    format!(
        "*{}*{}\n\n{}",
        escape_markdown(&article.title),
        synopsis,
        escape_markdown(&article.link)
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn article(title: &str, link: &str) -> Article {
        Article {
            id: 1,
            source_id: 1,
            title: title.to_string(),
            link: link.to_string(),
            synopsis: String::new(),
            published_at: Utc::now(),
            delivered_at: None,
        }
    }

    /// Every reserved character in the output must be preceded by an odd
    /// number of backslashes.
    fn assert_fully_escaped(output: &str) {
        let chars: Vec<char> = output.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '\\' {
                assert!(i + 1 < chars.len(), "dangling backslash in {output:?}");
                assert!(RESERVED.contains(&chars[i + 1]), "needless escape in {output:?}");
                i += 2;
                continue;
            }
            assert!(!RESERVED.contains(&chars[i]), "unescaped {:?} in {output:?}", chars[i]);
            i += 1;
        }
    }

    #[test]
    fn escapes_every_reserved_character() {
        let input = "_*[]()~`>#+-=|{}.!\\";
        let escaped = escape_markdown(input);
        assert_eq!(escaped, "\\_\\*\\[\\]\\(\\)\\~\\`\\>\\#\\+\\-\\=\\|\\{\\}\\.\\!\\\\");
        assert_fully_escaped(&escaped);
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(escape_markdown("Привет, world 42"), "Привет, world 42");
    }

    #[test]
    fn escaping_preexisting_backslashes_stays_safe() {
        for input in ["a\\*b", "\\\\", "end\\", "1.5 (beta) - rc!", "[x](http://y.z)"] {
            assert_fully_escaped(&escape_markdown(input));
        }
    }

    #[test]
    fn compose_escapes_each_field() {
        let message = compose_article_message(&article("A*B", "http://x"), "ok");
        assert_eq!(message, "*A\\*B*\n\nok\n\nhttp://x");
    }

    #[test]
    fn compose_without_synopsis_has_no_extra_block() {
        let message = compose_article_message(&article("Release 1.0", "https://e.com/a_b"), "  ");
        assert_eq!(message, "*Release 1\\.0*\n\nhttps://e\\.com/a\\_b");
    }
}
