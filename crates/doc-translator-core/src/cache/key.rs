use crate::config::Lang;

/// Cache key for a post-edited paragraph group.
///
/// Keys are opaque MD5 hashes of every input that can change the model's
/// answer: the group text, model, language pair, register and glossary.
/// Values are hashed exactly as they appear in the request, so two inputs
/// that build different prompts never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

/// Inputs that identify one post-edit completion.
pub struct CompletionInputs<'a> {
    pub group_text: &'a str,
    pub model: &'a str,
    pub source_lang: &'a Lang,
    pub target_lang: &'a Lang,
    pub language_level: &'a str,
    pub glossary: &'a str,
}

impl CacheKey {
    pub fn new(inputs: &CompletionInputs<'_>) -> Self {
        // NUL separators keep ("a", "bc") and ("ab", "c") apart.
        let combined = format!(
            "{}\0{}\0{}\0{}\0{}\0{}",
            inputs.group_text,
            inputs.model,
            inputs.source_lang.as_str(),
            inputs.target_lang.as_str(),
            inputs.language_level,
            inputs.glossary,
        );

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str, model: &str, src: &str, tgt: &str, level: &str, glossary: &str) -> CacheKey {
        CacheKey::new(&CompletionInputs {
            group_text: text,
            model,
            source_lang: &Lang::new(src),
            target_lang: &Lang::new(tgt),
            language_level: level,
            glossary,
        })
    }

    #[test]
    fn test_cache_key_is_fixed_length_hash() {
        let k = key("Hello world", "gpt-4", "FR", "EN", "standard", "{}");
        assert_eq!(k.to_string().len(), 32);
        assert!(k.to_string().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_key_differs_by_each_input() {
        let base = key("Hello", "gpt-4", "FR", "EN", "standard", "{}");
        assert_ne!(base, key("World", "gpt-4", "FR", "EN", "standard", "{}"));
        assert_ne!(base, key("Hello", "gpt-3.5-turbo", "FR", "EN", "standard", "{}"));
        assert_ne!(base, key("Hello", "gpt-4", "DE", "EN", "standard", "{}"));
        assert_ne!(base, key("Hello", "gpt-4", "FR", "ES", "standard", "{}"));
        assert_ne!(base, key("Hello", "gpt-4", "FR", "EN", "soutenu", "{}"));
        assert_ne!(base, key("Hello", "gpt-4", "FR", "EN", "standard", "{'a': 'b'}"));
    }

    #[test]
    fn test_cache_key_keeps_prompt_values_verbatim() {
        let base = key("Hello", "gpt-4", "FR", "EN", "soutenu", "{}");
        assert_eq!(base, key("Hello", "gpt-4", "FR", "EN", "soutenu", "{}"));
        assert_ne!(base, key("Hello", "gpt-4", "FR", "EN", "Soutenu", "{}"));
        assert_ne!(base, key("Hello", "gpt-4", "FR", "EN", " soutenu", "{}"));
        assert_ne!(base, key("Hello", "gpt-4", "fr", "EN", "soutenu", "{}"));
    }
}
