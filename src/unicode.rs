//! Unicode support for `\p{...}` escapes and capture names.

/// Decides which names are valid inside `\p{...}` and `\P{...}`.
///
/// The parser only validates names; it never evaluates category membership.
/// Swapping in a custom resolver lets callers track a different Unicode
/// version than the built-in [`DotnetCategories`] table.
pub trait CategoryResolver {
    fn is_category(&self, name: &str) -> bool;
}

/// General category abbreviations, grouped-category abbreviations, and named
/// blocks understood by the reference engine.
const CATEGORY_NAMES: &[&str] = &[
    // General categories and their one-letter groups.
    "C", "Cc", "Cf", "Cn", "Co", "Cs", "L", "Ll", "Lm", "Lo", "Lt", "Lu", "M", "Mc", "Me", "Mn",
    "N", "Nd", "Nl", "No", "P", "Pc", "Pd", "Pe", "Pf", "Pi", "Po", "Ps", "S", "Sc", "Sk", "Sm",
    "So", "Z", "Zl", "Zp", "Zs",
    // Named blocks.
    "IsAlphabeticPresentationForms",
    "IsArabic",
    "IsArabicPresentationForms-A",
    "IsArabicPresentationForms-B",
    "IsArmenian",
    "IsArrows",
    "IsBasicLatin",
    "IsBengali",
    "IsBlockElements",
    "IsBopomofo",
    "IsBopomofoExtended",
    "IsBoxDrawing",
    "IsBraillePatterns",
    "IsBuhid",
    "IsCJKCompatibility",
    "IsCJKCompatibilityForms",
    "IsCJKCompatibilityIdeographs",
    "IsCJKRadicalsSupplement",
    "IsCJKSymbolsandPunctuation",
    "IsCJKUnifiedIdeographs",
    "IsCJKUnifiedIdeographsExtensionA",
    "IsCherokee",
    "IsCombiningDiacriticalMarks",
    "IsCombiningDiacriticalMarksforSymbols",
    "IsCombiningHalfMarks",
    "IsCombiningMarksforSymbols",
    "IsControlPictures",
    "IsCurrencySymbols",
    "IsCyrillic",
    "IsCyrillicSupplement",
    "IsDevanagari",
    "IsDingbats",
    "IsEnclosedAlphanumerics",
    "IsEnclosedCJKLettersandMonths",
    "IsEthiopic",
    "IsGeneralPunctuation",
    "IsGeometricShapes",
    "IsGeorgian",
    "IsGreek",
    "IsGreekExtended",
    "IsGreekandCoptic",
    "IsGujarati",
    "IsGurmukhi",
    "IsHalfwidthandFullwidthForms",
    "IsHangulCompatibilityJamo",
    "IsHangulJamo",
    "IsHangulSyllables",
    "IsHanunoo",
    "IsHebrew",
    "IsHighPrivateUseSurrogates",
    "IsHighSurrogates",
    "IsHiragana",
    "IsIPAExtensions",
    "IsIdeographicDescriptionCharacters",
    "IsKanbun",
    "IsKangxiRadicals",
    "IsKannada",
    "IsKatakana",
    "IsKatakanaPhoneticExtensions",
    "IsKhmer",
    "IsKhmerSymbols",
    "IsLao",
    "IsLatin-1Supplement",
    "IsLatinExtended-A",
    "IsLatinExtended-B",
    "IsLatinExtendedAdditional",
    "IsLetterlikeSymbols",
    "IsLimbu",
    "IsLowSurrogates",
    "IsMalayalam",
    "IsMathematicalOperators",
    "IsMiscellaneousMathematicalSymbols-A",
    "IsMiscellaneousMathematicalSymbols-B",
    "IsMiscellaneousSymbols",
    "IsMiscellaneousSymbolsandArrows",
    "IsMiscellaneousTechnical",
    "IsMongolian",
    "IsMyanmar",
    "IsNumberForms",
    "IsOgham",
    "IsOpticalCharacterRecognition",
    "IsOriya",
    "IsPhoneticExtensions",
    "IsPrivateUse",
    "IsPrivateUseArea",
    "IsRunic",
    "IsSinhala",
    "IsSmallFormVariants",
    "IsSpacingModifierLetters",
    "IsSpecials",
    "IsSuperscriptsandSubscripts",
    "IsSupplementalArrows-A",
    "IsSupplementalArrows-B",
    "IsSupplementalMathematicalOperators",
    "IsSyriac",
    "IsTagalog",
    "IsTagbanwa",
    "IsTaiLe",
    "IsTamil",
    "IsTelugu",
    "IsThaana",
    "IsThai",
    "IsTibetan",
    "IsUnifiedCanadianAboriginalSyllabics",
    "IsVariationSelectors",
    "IsYiRadicals",
    "IsYiSyllables",
    "IsYijingHexagramSymbols",
];

/// The built-in resolver matching the reference engine's name table.
#[derive(Clone, Copy, Debug, Default)]
pub struct DotnetCategories;

impl CategoryResolver for DotnetCategories {
    fn is_category(&self, name: &str) -> bool {
        CATEGORY_NAMES.contains(&name)
    }
}

/// Whether `unit` can appear in a capture name. Alphanumerics, `_`, and the
/// zero-width (non-)joiners count.
#[must_use]
pub fn is_word_char(unit: u16) -> bool {
    match char::from_u32(u32::from(unit)) {
        Some(ch) => ch == '_' || ch == '\u{200C}' || ch == '\u{200D}' || ch.is_alphanumeric(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_categories_resolve() {
        let resolver = DotnetCategories;
        for name in ["Lu", "Ll", "Nd", "P", "Zs", "Cn"] {
            assert!(resolver.is_category(name), "{name}");
        }
        assert!(!resolver.is_category("Banana"));
        assert!(!resolver.is_category("lu"));
        assert!(!resolver.is_category(""));
    }

    #[test]
    fn named_blocks_resolve() {
        let resolver = DotnetCategories;
        assert!(resolver.is_category("IsGreek"));
        assert!(resolver.is_category("IsBasicLatin"));
        assert!(resolver.is_category("IsLatin-1Supplement"));
        assert!(!resolver.is_category("IsKlingon"));
    }

    #[test]
    fn word_chars() {
        assert!(is_word_char(u16::from(b'a')));
        assert!(is_word_char(u16::from(b'0')));
        assert!(is_word_char(u16::from(b'_')));
        assert!(is_word_char(0x00E9)); // é
        assert!(!is_word_char(u16::from(b'-')));
        assert!(!is_word_char(u16::from(b'<')));
        assert!(!is_word_char(0xD800)); // unpaired surrogate
    }
}
