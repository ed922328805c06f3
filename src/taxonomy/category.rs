use super::color::Color;
use super::contains_at_word_start;
use super::rules::RuleEvaluation;
use crate::common::labels::{sort_labels, ScoredLabel};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical listing categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tshirt,
    Shirt,
    Blouse,
    Hoodie,
    Sweatshirt,
    Jacket,
    Blazer,
    Pants,
    Jeans,
    Shorts,
    Skirt,
    Dress,
    Footwear,
    Bag,
    Hat,
    Jewelry,
    Scarf,
    Accessories,
    Electronics,
    Kitchen,
    Tickets,
    Other,
}

impl Category {
    pub const ALL: [Category; 22] = [
        Category::Tshirt,
        Category::Shirt,
        Category::Blouse,
        Category::Hoodie,
        Category::Sweatshirt,
        Category::Jacket,
        Category::Blazer,
        Category::Pants,
        Category::Jeans,
        Category::Shorts,
        Category::Skirt,
        Category::Dress,
        Category::Footwear,
        Category::Bag,
        Category::Hat,
        Category::Jewelry,
        Category::Scarf,
        Category::Accessories,
        Category::Electronics,
        Category::Kitchen,
        Category::Tickets,
        Category::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Tshirt => "tshirt",
            Category::Shirt => "shirt",
            Category::Blouse => "blouse",
            Category::Hoodie => "hoodie",
            Category::Sweatshirt => "sweatshirt",
            Category::Jacket => "jacket",
            Category::Blazer => "blazer",
            Category::Pants => "pants",
            Category::Jeans => "jeans",
            Category::Shorts => "shorts",
            Category::Skirt => "skirt",
            Category::Dress => "dress",
            Category::Footwear => "footwear",
            Category::Bag => "bag",
            Category::Hat => "hat",
            Category::Jewelry => "jewelry",
            Category::Scarf => "scarf",
            Category::Accessories => "accessories",
            Category::Electronics => "electronics",
            Category::Kitchen => "kitchen",
            Category::Tickets => "tickets",
            Category::Other => "other",
        }
    }

    pub fn from_name(name: &str) -> Option<Category> {
        let name = name.trim().to_lowercase();
        Category::ALL.iter().find(|c| c.name() == name).copied()
    }

    /// Color assumed for an item of this category when nothing else resolved.
    pub fn default_color(&self) -> Option<Color> {
        match self {
            Category::Tshirt | Category::Shirt | Category::Blouse => Some(Color::White),
            Category::Hoodie | Category::Sweatshirt => Some(Color::Gray),
            Category::Jeans | Category::Shorts => Some(Color::Blue),
            Category::Jacket
            | Category::Blazer
            | Category::Pants
            | Category::Skirt
            | Category::Dress
            | Category::Footwear
            | Category::Bag
            | Category::Hat
            | Category::Electronics => Some(Color::Black),
            Category::Jewelry
            | Category::Scarf
            | Category::Accessories
            | Category::Kitchen
            | Category::Tickets
            | Category::Other => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One family of keywords pointing at a category. Keywords match at the start
/// of a word inside the label; any exclusion anywhere in the label vetoes the group.
#[derive(Debug, Clone, Copy)]
pub struct KeywordGroup {
    pub family: &'static str,
    pub category: Category,
    pub keywords: &'static [&'static str],
    pub exclude: &'static [&'static str],
}

impl KeywordGroup {
    pub fn matches(&self, label: &str) -> bool {
        !self.exclude.iter().any(|e| label.contains(e))
            && self
                .keywords
                .iter()
                .any(|k| contains_at_word_start(label, k))
    }
}

// Order matters: specific families before the generic ones they overlap with.
static KEYWORD_GROUPS: &[KeywordGroup] = &[
    KeywordGroup {
        family: "clog",
        category: Category::Footwear,
        keywords: &["clog", "croc", "geta", "patten", "sabot"],
        exclude: &["crock pot", "crockpot", "crocodile"],
    },
    KeywordGroup {
        family: "tshirt",
        category: Category::Tshirt,
        keywords: &["t-shirt", "tshirt", "tee shirt", "tee", "jersey"],
        exclude: &[],
    },
    KeywordGroup {
        family: "sweatshirt",
        category: Category::Sweatshirt,
        keywords: &["sweatshirt", "crewneck", "pullover"],
        exclude: &[],
    },
    KeywordGroup {
        family: "hoodie",
        category: Category::Hoodie,
        keywords: &["hoodie", "hooded"],
        exclude: &[],
    },
    KeywordGroup {
        family: "blouse",
        category: Category::Blouse,
        keywords: &["blouse", "tunic"],
        exclude: &[],
    },
    KeywordGroup {
        family: "shirt",
        category: Category::Shirt,
        keywords: &["shirt", "polo", "button-down"],
        exclude: &[],
    },
    KeywordGroup {
        family: "blazer",
        category: Category::Blazer,
        keywords: &["blazer", "suit", "sport coat"],
        exclude: &["suitcase"],
    },
    KeywordGroup {
        family: "jacket",
        category: Category::Jacket,
        keywords: &[
            "jacket", "coat", "parka", "anorak", "windbreaker", "cardigan", "bomber", "poncho",
        ],
        exclude: &[],
    },
    KeywordGroup {
        family: "jeans",
        category: Category::Jeans,
        keywords: &["jean", "denim"],
        exclude: &[],
    },
    KeywordGroup {
        family: "shorts",
        category: Category::Shorts,
        keywords: &["shorts", "swimming trunks", "trunks"],
        exclude: &[],
    },
    KeywordGroup {
        family: "pants",
        category: Category::Pants,
        keywords: &[
            "pants", "trousers", "leggings", "chinos", "slacks", "sweatpants", "joggers",
        ],
        exclude: &[],
    },
    KeywordGroup {
        family: "skirt",
        category: Category::Skirt,
        keywords: &["skirt", "miniskirt", "overskirt", "hoopskirt", "sarong"],
        exclude: &[],
    },
    KeywordGroup {
        family: "dress",
        category: Category::Dress,
        keywords: &["dress", "gown", "abaya", "kimono", "sundress"],
        exclude: &[],
    },
    KeywordGroup {
        family: "shoe",
        category: Category::Footwear,
        keywords: &[
            "shoe", "sneaker", "loafer", "sandal", "boot", "heel", "slipper", "trainer",
            "moccasin", "espadrille", "flip-flop", "stiletto", "footwear",
        ],
        exclude: &["booth"],
    },
    KeywordGroup {
        family: "bag",
        category: Category::Bag,
        keywords: &[
            "bag", "handbag", "purse", "backpack", "tote", "wallet", "satchel", "clutch",
            "suitcase", "mailbag",
        ],
        exclude: &["bagel"],
    },
    KeywordGroup {
        family: "hat",
        category: Category::Hat,
        keywords: &["hat", "cap", "beanie", "sombrero", "bonnet", "beret", "fedora"],
        exclude: &["cape", "capuchin", "capsule", "hatchet", "hatchback"],
    },
    KeywordGroup {
        family: "jewelry",
        category: Category::Jewelry,
        keywords: &[
            "necklace", "bracelet", "earring", "pendant", "jewel", "brooch", "locket", "bangle",
            "ring",
        ],
        exclude: &[],
    },
    KeywordGroup {
        family: "scarf",
        category: Category::Scarf,
        keywords: &["scarf", "stole", "shawl", "feather boa", "bandana"],
        exclude: &[],
    },
    KeywordGroup {
        family: "accessories",
        category: Category::Accessories,
        keywords: &[
            "sunglass", "tie", "belt", "watch", "umbrella", "glove", "mitten", "sock",
            "accessor",
        ],
        exclude: &[],
    },
    KeywordGroup {
        family: "electronics",
        category: Category::Electronics,
        keywords: &[
            "electronic", "laptop", "phone", "telephone", "cellphone", "smartphone",
            "computer", "notebook", "monitor", "television", "tablet", "ipod", "keyboard",
            "headphone", "camera", "console", "joystick", "speaker",
        ],
        exclude: &[],
    },
    KeywordGroup {
        family: "kitchen",
        category: Category::Kitchen,
        keywords: &[
            "kitchen", "appliance", "cookware", "crock pot", "crockpot", "wok", "frying pan",
            "toaster", "microwave", "blender", "kettle", "teapot", "coffeepot", "espresso",
            "dutch oven", "mixing bowl", "mug", "cup",
        ],
        exclude: &[],
    },
    KeywordGroup {
        family: "tickets",
        category: Category::Tickets,
        keywords: &["ticket", "pass", "admission", "voucher"],
        exclude: &["passenger"],
    },
];

#[derive(Debug)]
pub struct CategoryTaxonomy {
    groups: &'static [KeywordGroup],
}

static STANDARD_CATEGORY_TAXONOMY: CategoryTaxonomy = CategoryTaxonomy {
    groups: KEYWORD_GROUPS,
};

impl CategoryTaxonomy {
    pub fn standard() -> &'static CategoryTaxonomy {
        &STANDARD_CATEGORY_TAXONOMY
    }

    pub fn groups(&self) -> &'static [KeywordGroup] {
        self.groups
    }

    /// First group in declaration order that accepts the (lowercased) label.
    pub fn find_group(&self, label: &str) -> Option<&'static KeywordGroup> {
        let label = label.to_lowercase();
        self.groups.iter().find(|g| g.matches(&label))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMatch {
    pub category: Category,
    pub matched_label: Option<String>,
    pub confidence: f32,
    /// Name of the override rule that forced the category, if any.
    pub override_rule: Option<String>,
}

impl CategoryMatch {
    pub fn unmatched() -> Self {
        Self {
            category: Category::Other,
            matched_label: None,
            confidence: 0.0,
            override_rule: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CategoryMatcher {
    taxonomy: &'static CategoryTaxonomy,
}

impl Default for CategoryMatcher {
    fn default() -> Self {
        Self::new(CategoryTaxonomy::standard())
    }
}

impl CategoryMatcher {
    pub fn new(taxonomy: &'static CategoryTaxonomy) -> Self {
        Self { taxonomy }
    }

    /// Highest-scoring label that belongs to any keyword group decides the category.
    pub fn match_category(&self, labels: &[ScoredLabel]) -> CategoryMatch {
        let mut ranked = labels.to_vec();
        sort_labels(&mut ranked);

        ranked
            .iter()
            .find_map(|l| {
                self.taxonomy.find_group(&l.label).map(|group| CategoryMatch {
                    category: group.category,
                    matched_label: Some(l.label.clone()),
                    confidence: l.score.clamp(0.0, 1.0),
                    override_rule: None,
                })
            })
            .unwrap_or_else(CategoryMatch::unmatched)
    }

    /// Generic keyword matching followed by the category override, if one fired.
    pub fn match_with(&self, labels: &[ScoredLabel], rules: &RuleEvaluation) -> CategoryMatch {
        let generic = self.match_category(labels);
        match &rules.category {
            Some(hit) => CategoryMatch {
                category: hit.value,
                matched_label: Some(hit.matched_label.clone()),
                confidence: (hit.label_score * hit.confidence).clamp(0.0, 1.0),
                override_rule: Some(hit.rule.clone()),
            },
            None => generic,
        }
    }
}
