use super::contains_at_word_start;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical color buckets every raw color word is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Pink,
    Purple,
    Blue,
    Green,
    Yellow,
    Orange,
    Brown,
    Beige,
    White,
    Gray,
    Black,
    Patterned,
    Multicolor,
    Unknown,
}

impl Color {
    /// The twelve hue buckets, in table declaration order.
    pub const BUCKETS: [Color; 12] = [
        Color::Red,
        Color::Pink,
        Color::Purple,
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::Orange,
        Color::Brown,
        Color::Beige,
        Color::White,
        Color::Gray,
        Color::Black,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Pink => "pink",
            Color::Purple => "purple",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Orange => "orange",
            Color::Brown => "brown",
            Color::Beige => "beige",
            Color::White => "white",
            Color::Gray => "gray",
            Color::Black => "black",
            Color::Patterned => "patterned",
            Color::Multicolor => "multicolor",
            Color::Unknown => "unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Color> {
        let name = name.trim().to_lowercase();
        Color::BUCKETS
            .iter()
            .chain([Color::Patterned, Color::Multicolor, Color::Unknown].iter())
            .find(|c| c.name() == name)
            .copied()
    }

    pub fn is_known(&self) -> bool {
        *self != Color::Unknown
    }

    /// Representative swatch used when a candidate has no measured RGB.
    pub fn approximate_rgb(&self) -> [u8; 3] {
        match self {
            Color::Red => [255, 0, 0],
            Color::Pink => [255, 192, 203],
            Color::Purple => [128, 0, 128],
            Color::Blue => [0, 0, 255],
            Color::Green => [0, 128, 0],
            Color::Yellow => [255, 255, 0],
            Color::Orange => [255, 165, 0],
            Color::Brown => [139, 69, 19],
            Color::Beige => [245, 245, 220],
            Color::White => [255, 255, 255],
            Color::Gray => [128, 128, 128],
            Color::Black => [0, 0, 0],
            Color::Patterned | Color::Multicolor | Color::Unknown => [128, 128, 128],
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColorBucket {
    pub color: Color,
    pub synonyms: &'static [&'static str],
}

// Declaration order decides words that fit several buckets
// (rust, cream, tan, ivory, steel, midnight).
static COLOR_BUCKETS: &[ColorBucket] = &[
    ColorBucket {
        color: Color::Red,
        synonyms: &[
            "red", "crimson", "scarlet", "ruby", "cherry", "maroon", "burgundy", "wine",
            "carmine", "cardinal", "vermilion", "rust", "auburn", "blood", "brick", "tomato",
            "raspberry", "cranberry", "oxblood",
        ],
    },
    ColorBucket {
        color: Color::Pink,
        synonyms: &[
            "pink", "rose", "salmon", "coral", "blush", "flamingo", "watermelon", "bubblegum",
            "cerise", "hot pink",
        ],
    },
    ColorBucket {
        color: Color::Purple,
        synonyms: &[
            "purple", "violet", "lavender", "lilac", "mauve", "plum", "indigo", "amethyst",
            "periwinkle", "magenta", "fuchsia", "orchid", "mulberry", "eggplant", "grape",
        ],
    },
    ColorBucket {
        color: Color::Blue,
        synonyms: &[
            "blue", "navy", "cobalt", "azure", "cyan", "teal", "turquoise", "aqua", "cerulean",
            "sapphire", "royal", "sky", "denim", "steel", "powder blue", "baby blue", "midnight",
            "ocean",
        ],
    },
    ColorBucket {
        color: Color::Green,
        synonyms: &[
            "green", "olive", "emerald", "lime", "mint", "jade", "sage", "forest", "chartreuse",
            "avocado", "moss", "pistachio", "seafoam", "hunter", "shamrock", "juniper", "seaweed",
            "khaki green",
        ],
    },
    ColorBucket {
        color: Color::Yellow,
        synonyms: &[
            "yellow", "gold", "amber", "lemon", "mustard", "banana", "honey", "cream", "butter",
            "daffodil", "flaxen", "canary", "dandelion", "sunshine",
        ],
    },
    ColorBucket {
        color: Color::Orange,
        synonyms: &[
            "orange", "tangerine", "peach", "apricot", "cantaloupe", "carrot", "rust", "copper",
            "terracotta", "pumpkin", "clay", "ginger", "cinnamon",
        ],
    },
    ColorBucket {
        color: Color::Brown,
        synonyms: &[
            "brown", "tan", "chocolate", "coffee", "caramel", "mahogany", "chestnut", "hazel",
            "umber", "sienna", "bronze", "walnut", "mocha", "hickory", "cocoa", "cacao", "sepia",
            "russet", "tawny", "cognac",
        ],
    },
    ColorBucket {
        color: Color::Beige,
        synonyms: &[
            "beige", "cream", "off-white", "ecru", "khaki", "taupe", "tan", "fawn", "eggshell",
            "sand", "oatmeal", "ivory", "champagne", "buff", "vanilla", "nude",
        ],
    },
    ColorBucket {
        color: Color::White,
        synonyms: &[
            "white", "snow", "ivory", "pearl", "alabaster", "chalk", "milk", "ghost",
            "porcelain", "bone", "paper", "cloud", "linen", "frost",
        ],
    },
    ColorBucket {
        color: Color::Gray,
        synonyms: &[
            "gray", "grey", "silver", "slate", "ash", "charcoal", "graphite", "iron", "steel",
            "stone", "pewter", "smoke", "cement", "fossil", "lead", "anchor", "heather",
        ],
    },
    ColorBucket {
        color: Color::Black,
        synonyms: &[
            "black", "ebony", "onyx", "jet", "coal", "obsidian", "raven", "midnight", "ink",
            "pitch", "shadow", "sable",
        ],
    },
];

static PATTERN_KEYWORDS: &[&str] = &[
    "pattern", "stripe", "check", "plaid", "tartan", "floral", "print", "dot", "polka",
    "paisley", "camo",
];

static MULTICOLOR_KEYWORDS: &[&str] = &["multi", "rainbow", "colorful", "colourful", "various"];

// Ordinary vocabulary that the substring passes would otherwise read as colors.
static NON_COLOR_WORDS: &[&str] = &[
    "sandal", "sandals", "sandbar", "stand", "standard", "tank", "titan", "washer",
    "dishwasher", "wash", "cash", "crash", "sink", "drink", "jetty", "jetliner", "husky",
    "trust", "shredder", "bread", "thread", "hazelnut", "pitcher", "inkwell", "ironing",
    "leader", "rosehip", "limestone", "limousine", "mintmark", "skyscraper", "oceanliner",
];

/// Shortest synonym that may be matched inside a longer word.
const MIN_EMBEDDED_SYNONYM_LEN: usize = 4;
/// Shortest input word that may be matched as a fragment of a synonym.
const MIN_FRAGMENT_LEN: usize = 4;

/// Static, declaration-ordered synonym table.
#[derive(Debug)]
pub struct ColorTaxonomy {
    buckets: &'static [ColorBucket],
    pattern_keywords: &'static [&'static str],
    multicolor_keywords: &'static [&'static str],
    non_color_words: &'static [&'static str],
}

static STANDARD_COLOR_TAXONOMY: ColorTaxonomy = ColorTaxonomy {
    buckets: COLOR_BUCKETS,
    pattern_keywords: PATTERN_KEYWORDS,
    multicolor_keywords: MULTICOLOR_KEYWORDS,
    non_color_words: NON_COLOR_WORDS,
};

impl ColorTaxonomy {
    pub fn standard() -> &'static ColorTaxonomy {
        &STANDARD_COLOR_TAXONOMY
    }

    pub fn buckets(&self) -> &'static [ColorBucket] {
        self.buckets
    }

    pub fn synonyms(&self, color: Color) -> &'static [&'static str] {
        self.buckets
            .iter()
            .find(|b| b.color == color)
            .map(|b| b.synonyms)
            .unwrap_or(&[])
    }

    pub fn synonym_count(&self) -> usize {
        self.buckets.iter().map(|b| b.synonyms.len()).sum()
    }

    /// Map a raw color word onto its canonical bucket.
    ///
    /// Pattern and multicolor keywords are checked first. Then the buckets are
    /// walked in declaration order and the first one with a synonym that equals
    /// the word, is contained in it, or contains it wins.
    pub fn normalize(&self, word: &str) -> Color {
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return Color::Unknown;
        }

        if self.pattern_keywords.iter().any(|k| word.contains(k)) {
            return Color::Patterned;
        }
        if self.multicolor_keywords.iter().any(|k| word.contains(k)) {
            return Color::Multicolor;
        }

        // A bucket's own name never drifts into an earlier bucket ("white" is
        // a fragment of beige's "off-white").
        if let Some(bucket) = self.buckets.iter().find(|b| b.color.name() == word) {
            return bucket.color;
        }

        let blocked = self.non_color_words.contains(&word.as_str());
        self.buckets
            .iter()
            .find(|bucket| {
                bucket
                    .synonyms
                    .iter()
                    .any(|syn| *syn == word || (!blocked && fragment_match(bucket, &word, syn)))
            })
            .map(|bucket| bucket.color)
            .unwrap_or(Color::Unknown)
    }
}

fn fragment_match(bucket: &ColorBucket, word: &str, syn: &str) -> bool {
    let word_contains_synonym = if syn.len() >= MIN_EMBEDDED_SYNONYM_LEN {
        word.contains(syn)
    } else {
        syn == bucket.color.name() && contains_at_word_start(word, syn)
    };
    word_contains_synonym || (word.len() >= MIN_FRAGMENT_LEN && syn.contains(word))
}

/// Normalize against the standard table.
pub fn normalize(word: &str) -> Color {
    ColorTaxonomy::standard().normalize(word)
}
