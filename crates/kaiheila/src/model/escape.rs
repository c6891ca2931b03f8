//! Escaping for the inline `[CQ:type,key=value]` encoding.
//!
//! Text between tags reserves `&`, `[` and `]`; tag parameter values
//! additionally reserve `,`.

/// Escapes a plain text span.
pub fn escape_text(text: &str) -> String {
    escape(text, false)
}

/// Escapes a tag parameter value.
pub fn escape_param(value: &str) -> String {
    escape(value, true)
}

/// Reverses [`escape_text`].
pub fn unescape_text(text: &str) -> String {
    unescape(text, false)
}

/// Reverses [`escape_param`].
pub fn unescape_param(value: &str) -> String {
    unescape(value, true)
}

fn escape(s: &str, escape_comma: bool) -> String {
    // `&` first so the entities introduced below are not re-escaped.
    let s = s.replace('&', "&amp;").replace('[', "&#91;").replace(']', "&#93;");
    if escape_comma {
        s.replace(',', "&#44;")
    } else {
        s
    }
}

fn unescape(s: &str, unescape_comma: bool) -> String {
    let s = if unescape_comma {
        s.replace("&#44;", ",")
    } else {
        s.to_string()
    };
    // `&amp;` last: an escaped literal `&#91;` must survive as text.
    s.replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text_keeps_commas() {
        assert_eq!(escape_text("a,[b]&c"), "a,&#91;b&#93;&amp;c");
    }

    #[test]
    fn test_escape_param_escapes_commas() {
        assert_eq!(escape_param("a,[b]&c"), "a&#44;&#91;b&#93;&amp;c");
    }

    #[test]
    fn test_unescape_reverses_escape() {
        for s in [
            "",
            "plain",
            "&[],",
            "&amp;",
            "&#91;literal entity&#93;",
            "[CQ:at,user_id=1]",
            "中文 & more",
        ] {
            assert_eq!(unescape_text(&escape_text(s)), s);
            assert_eq!(unescape_param(&escape_param(s)), s);
        }
    }

    #[test]
    fn test_unescape_text_leaves_comma_entity() {
        assert_eq!(unescape_text("a&#44;b"), "a&#44;b");
        assert_eq!(unescape_param("a&#44;b"), "a,b");
    }

    #[test]
    fn test_double_escaped_ampersand() {
        assert_eq!(unescape_text("&amp;amp;"), "&amp;");
    }
}
