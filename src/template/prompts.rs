//! Built-in prompt templates

/// Text query prompt
pub const CHAT: &str = "chat";

/// Image analysis prompt
pub const IMAGE: &str = "image";

const CHAT_SOURCE: &str = include_str!("../../prompts/chat.j2");
const IMAGE_SOURCE: &str = include_str!("../../prompts/image.j2");

/// Source of a built-in template by name
pub fn builtin(name: &str) -> Option<&'static str> {
    match name {
        CHAT => Some(CHAT_SOURCE),
        IMAGE => Some(IMAGE_SOURCE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert!(builtin(CHAT).unwrap().contains("RELEVANT AGRICULTURAL KNOWLEDGE"));
        assert!(builtin(IMAGE).unwrap().contains("ANALYZE THE IMAGE FOR"));
        assert!(builtin("missing").is_none());
    }
}
