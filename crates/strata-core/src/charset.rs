//! MySQL character sets and the collations each one supports.

/// A supported character set.
///
/// The first listed collation is the charset's default.
#[derive(Debug, Clone, Copy)]
pub struct Charset {
    pub name: &'static str,
    collations: &'static [&'static str],
    /// Whether the charset also has the Unicode language collations.
    unicode: bool,
}

/// Language collations shared by the Unicode charsets, as suffixes of
/// `<charset>_`.
const UNICODE_VARIANTS: &[&str] = &[
    "unicode_ci",
    "icelandic_ci",
    "latvian_ci",
    "romanian_ci",
    "slovenian_ci",
    "polish_ci",
    "estonian_ci",
    "spanish_ci",
    "swedish_ci",
    "turkish_ci",
    "czech_ci",
    "danish_ci",
    "lithuanian_ci",
    "slovak_ci",
    "spanish2_ci",
    "roman_ci",
    "persian_ci",
    "esperanto_ci",
    "hungarian_ci",
    "sinhala_ci",
    "german2_ci",
    "croatian_ci",
    "unicode_520_ci",
    "vietnamese_ci",
];

const fn charset(name: &'static str, collations: &'static [&'static str]) -> Charset {
    Charset {
        name,
        collations,
        unicode: false,
    }
}

const fn unicode(name: &'static str, collations: &'static [&'static str]) -> Charset {
    Charset {
        name,
        collations,
        unicode: true,
    }
}

/// All supported charsets.
pub const CHARSETS: &[Charset] = &[
    charset("armscii8", &["armscii8_general_ci", "armscii8_bin"]),
    charset("ascii", &["ascii_general_ci", "ascii_bin"]),
    charset("big5", &["big5_chinese_ci", "big5_bin"]),
    charset("binary", &["binary"]),
    charset(
        "cp1250",
        &[
            "cp1250_general_ci",
            "cp1250_czech_cs",
            "cp1250_croatian_ci",
            "cp1250_bin",
            "cp1250_polish_ci",
        ],
    ),
    charset(
        "cp1251",
        &[
            "cp1251_general_ci",
            "cp1251_bulgarian_ci",
            "cp1251_ukrainian_ci",
            "cp1251_bin",
            "cp1251_general_cs",
        ],
    ),
    charset("cp1256", &["cp1256_general_ci", "cp1256_bin"]),
    charset(
        "cp1257",
        &["cp1257_general_ci", "cp1257_lithuanian_ci", "cp1257_bin"],
    ),
    charset("cp850", &["cp850_general_ci", "cp850_bin"]),
    charset("cp852", &["cp852_general_ci", "cp852_bin"]),
    charset("cp866", &["cp866_general_ci", "cp866_bin"]),
    charset("cp932", &["cp932_japanese_ci", "cp932_bin"]),
    charset("dec8", &["dec8_swedish_ci", "dec8_bin"]),
    charset("eucjpms", &["eucjpms_japanese_ci", "eucjpms_bin"]),
    charset("euckr", &["euckr_korean_ci", "euckr_bin"]),
    charset("gb18030", &["gb18030_chinese_ci", "gb18030_bin", "gb18030_unicode_520_ci"]),
    charset("gb2312", &["gb2312_chinese_ci", "gb2312_bin"]),
    charset("gbk", &["gbk_chinese_ci", "gbk_bin"]),
    charset("geostd8", &["geostd8_general_ci", "geostd8_bin"]),
    charset("greek", &["greek_general_ci", "greek_bin"]),
    charset("hebrew", &["hebrew_general_ci", "hebrew_bin"]),
    charset("hp8", &["hp8_english_ci", "hp8_bin"]),
    charset("keybcs2", &["keybcs2_general_ci", "keybcs2_bin"]),
    charset("koi8r", &["koi8r_general_ci", "koi8r_bin"]),
    charset("koi8u", &["koi8u_general_ci", "koi8u_bin"]),
    charset(
        "latin1",
        &[
            "latin1_swedish_ci",
            "latin1_german1_ci",
            "latin1_danish_ci",
            "latin1_german2_ci",
            "latin1_bin",
            "latin1_general_ci",
            "latin1_general_cs",
            "latin1_spanish_ci",
        ],
    ),
    charset(
        "latin2",
        &[
            "latin2_general_ci",
            "latin2_czech_cs",
            "latin2_hungarian_ci",
            "latin2_croatian_ci",
            "latin2_bin",
        ],
    ),
    charset("latin5", &["latin5_turkish_ci", "latin5_bin"]),
    charset(
        "latin7",
        &[
            "latin7_general_ci",
            "latin7_estonian_cs",
            "latin7_general_cs",
            "latin7_bin",
        ],
    ),
    charset("macce", &["macce_general_ci", "macce_bin"]),
    charset("macroman", &["macroman_general_ci", "macroman_bin"]),
    charset("sjis", &["sjis_japanese_ci", "sjis_bin"]),
    charset("swe7", &["swe7_swedish_ci", "swe7_bin"]),
    charset("tis620", &["tis620_thai_ci", "tis620_bin"]),
    unicode("ucs2", &["ucs2_general_ci", "ucs2_bin", "ucs2_general_mysql500_ci"]),
    charset("ujis", &["ujis_japanese_ci", "ujis_bin"]),
    unicode("utf16", &["utf16_general_ci", "utf16_bin"]),
    charset("utf16le", &["utf16le_general_ci", "utf16le_bin"]),
    unicode("utf32", &["utf32_general_ci", "utf32_bin"]),
    unicode("utf8", &["utf8_general_ci", "utf8_bin", "utf8_general_mysql500_ci"]),
    unicode(
        "utf8mb4",
        &[
            "utf8mb4_general_ci",
            "utf8mb4_bin",
            "utf8mb4_0900_ai_ci",
            "utf8mb4_0900_as_ci",
            "utf8mb4_0900_as_cs",
            "utf8mb4_0900_bin",
        ],
    ),
];

/// Looks up a charset by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static Charset> {
    CHARSETS.iter().find(|c| c.name == name)
}

/// Returns `true` when `name` is a supported charset.
#[must_use]
pub fn is_charset(name: &str) -> bool {
    lookup(name).is_some()
}

impl Charset {
    /// Returns `true` when the collation belongs to this charset.
    #[must_use]
    pub fn supports(&self, collation: &str) -> bool {
        if self.collations.contains(&collation) {
            return true;
        }
        self.unicode
            && collation
                .strip_prefix(self.name)
                .and_then(|rest| rest.strip_prefix('_'))
                .is_some_and(|variant| UNICODE_VARIANTS.contains(&variant))
    }

    /// Collation MySQL uses when only the charset is given.
    #[must_use]
    pub fn default_collation(&self) -> &'static str {
        self.collations.first().copied().unwrap_or(self.name)
    }

    /// Lists every collation of this charset.
    #[must_use]
    pub fn collations(&self) -> Vec<String> {
        let mut all: Vec<String> = self.collations.iter().map(ToString::to_string).collect();
        if self.unicode {
            all.extend(
                UNICODE_VARIANTS
                    .iter()
                    .map(|variant| format!("{}_{variant}", self.name)),
            );
        }
        all
    }
}
