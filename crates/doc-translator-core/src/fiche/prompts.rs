//! Prompt texts for fiche generation.

use super::FicheKind;

pub const ANALYSIS_SYSTEM: &str =
    "You are a product marketing analyst. You extract facts, never invent them.";

pub const COPYWRITER_SYSTEM: &str = "You are an experienced e-commerce copywriter.";

const ANALYSIS_PROMPT: &str = "Analyse the following excerpt of a product document. \
List the product name, its key features, technical specifications, target customers, \
use cases and any selling points. Keep only information present in the excerpt.";

const COMMERCIAL_PROMPT: &str = "Using the product analysis below, write a commercial \
product sheet for sales representatives: a catchy title, a two-sentence pitch, the key \
benefits as short bullet points, the technical specifications, and a closing call to action.";

const SHOPIFY_PROMPT: &str = "Using the product analysis below, write a Shopify product \
listing: an SEO-friendly product title, a short description of at most 160 characters, \
a long description in short paragraphs, a bullet list of features, and five search tags.";

/// Prompt asking for the analysis of one chunk.
pub fn analysis(chunk: &str, index: usize, total: usize) -> String {
    format!("{ANALYSIS_PROMPT}\n\nExcerpt {index}/{total}:\n{chunk}")
}

/// Prompt asking for a fiche in one language.
pub fn fiche(kind: FicheKind, analysis: &str, language: &str) -> String {
    let template = match kind {
        FicheKind::Commercial => COMMERCIAL_PROMPT,
        FicheKind::Shopify => SHOPIFY_PROMPT,
    };
    format!("{template}\n\nContenu du fichier:\n{analysis}\n\nLangue: {language}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiche_prompt_names_language() {
        let prompt = fiche(FicheKind::Shopify, "Widget, blue", "Anglais");
        assert!(prompt.starts_with("Using the product analysis below, write a Shopify"));
        assert!(prompt.contains("Contenu du fichier:\nWidget, blue"));
        assert!(prompt.ends_with("Langue: Anglais"));
    }

    #[test]
    fn test_analysis_prompt_numbers_excerpt() {
        assert!(analysis("text", 2, 5).contains("Excerpt 2/5:\ntext"));
    }
}
