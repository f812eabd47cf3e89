use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_DB_PATH: &str = "data/devices.sqlite";

pub const CANONICAL_CATEGORIES: &[&str] = &[
    "Network",
    "Launch",
    "Body",
    "Display",
    "Platform",
    "Memory",
    "Main Camera",
    "Selfie camera",
    "Sound",
    "Comms",
    "Features",
    "Battery",
    "Misc",
    "Our Tests",
];

const BRANDS: &[&str] = &[
    "Samsung", "Apple", "Google", "Xiaomi", "OnePlus", "Oppo", "Vivo",
    "Realme", "Huawei", "Honor", "Motorola", "Nokia", "Sony", "Asus", "Lenovo", "LG", "HTC",
    "ZTE", "Nubia", "Nothing", "Tecno", "Infinix", "Itel", "Meizu", "Fairphone", "Alcatel",
    "TCL", "Ulefone", "Doogee", "Blackview", "Oukitel", "Cat", "Microsoft", "Amazon",
];

const BRAND_PREFIXES: &[(&str, &str)] = &[
    ("galaxy", "Samsung"),
    ("iphone", "Apple"),
    ("ipad", "Apple"),
    ("pixel", "Google"),
    ("mi ", "Xiaomi"),
    ("redmi", "Xiaomi"),
    ("poco", "Xiaomi"),
    ("nord", "OnePlus"),
    ("moto", "Motorola"),
    ("razr", "Motorola"),
    ("xperia", "Sony"),
    ("zenfone", "Asus"),
    ("rog phone", "Asus"),
    ("mate", "Huawei"),
    ("nova", "Huawei"),
    ("reno", "Oppo"),
    ("find x", "Oppo"),
    ("lumia", "Nokia"),
    ("surface duo", "Microsoft"),
    ("fire hd", "Amazon"),
];

const GENERIC_NAME_WORDS: &[&str] = &[
    "specifications", "specification", "specs", "spec", "tech", "technical", "full", "phone",
    "phones", "mobile", "finder", "compare", "comparison", "tool", "product", "products",
    "home", "support", "page", "official", "site", "website", "detail", "details", "overview",
    "features", "buy", "shop", "store", "untitled", "search",
];

/// A model-family prefix that implies a brand.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrefixRule {
    pub prefix: String,
    pub brand: String,
}

/// Lookup tables driving the merger and identity extractor.
///
/// Injected rather than global so tests and deployments can swap brand lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    pub category_order: Vec<String>,
    pub brands: Vec<String>,
    pub brand_prefixes: Vec<PrefixRule>,
    pub generic_name_words: Vec<String>,
    pub min_name_len: usize,
}

impl Default for Heuristics {
    fn default() -> Self {
        Heuristics {
            category_order: CANONICAL_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            brands: BRANDS.iter().map(|s| s.to_string()).collect(),
            brand_prefixes: BRAND_PREFIXES
                .iter()
                .map(|(prefix, brand)| PrefixRule {
                    prefix: prefix.to_string(),
                    brand: brand.to_string(),
                })
                .collect(),
            generic_name_words: GENERIC_NAME_WORDS.iter().map(|s| s.to_string()).collect(),
            min_name_len: 4,
        }
    }
}

impl Heuristics {
    pub fn with_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.brands = brands.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub heuristics: Heuristics,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            heuristics: Heuristics::default(),
        }
    }
}

impl Settings {
    /// Layer `devspec.toml` (optional) under `DEVSPEC_*` environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("devspec").required(false))
            .add_source(
                config::Environment::with_prefix("DEVSPEC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_canonical_order() {
        let h = Heuristics::default();
        assert_eq!(h.category_order.len(), 14);
        assert_eq!(h.category_order[0], "Network");
        assert_eq!(h.category_order[13], "Our Tests");
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg = config::Config::builder()
            .set_override("heuristics.min_name_len", 6)
            .unwrap()
            .build()
            .unwrap();
        let s: Settings = cfg.try_deserialize().unwrap();
        assert_eq!(s.heuristics.min_name_len, 6);
        assert!(s.heuristics.brands.iter().any(|b| b == "Samsung"));
        assert_eq!(s.db_path, PathBuf::from(DEFAULT_DB_PATH));
    }

    #[test]
    fn brand_list_can_be_substituted() {
        let h = Heuristics::default().with_brands(["Acme"]);
        assert_eq!(h.brands, vec!["Acme".to_string()]);
    }
}
