use std::collections::{HashMap, HashSet};
use regex::Regex;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

/// Default maximum catalog key length
pub const DEFAULT_MAX_KEY_LENGTH: usize = 64;

/// Smallest maximum length that still leaves room for prefix, hash and suffix;
/// shorter limits produce hash-only keys
pub const MIN_KEY_LENGTH: usize = 16;

/// Width of the hash segment inserted into shortened keys
pub const HASH_LENGTH: usize = 8;

/// Name given to parameters whose sanitized name carries no information
pub const UNUSED_PARAM_NAME: &str = "unused_param";

/// Characters not allowed in catalog keys
static CATALOG_KEY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9_\-]").expect("Invalid regex pattern")
});

/// Characters not allowed in parameter identifiers
static PARAM_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9_]").expect("Invalid regex pattern")
});

/// Sanitizes an arbitrary operation name into a catalog key:
/// - Only ASCII alphanumerics, dashes and underscores
/// - Starts with a letter or underscore
/// - At most `max_len` characters; longer names keep a prefix and a suffix around
///   an 8-character hash of the original name, or just `_` and the hash when
///   `max_len` is below [`MIN_KEY_LENGTH`]
pub fn sanitize_catalog_key(raw_name: &str, max_len: usize) -> String {
    let replaced = CATALOG_KEY_REGEX.replace_all(raw_name, "_");
    let sanitized = ensure_identifier_start(&replaced, "_unnamed");

    if sanitized.len() <= max_len {
        return sanitized;
    }

    let hash = short_hash(raw_name);
    if max_len < MIN_KEY_LENGTH {
        return hash_only_key(&hash, max_len);
    }

    let budget = max_len - HASH_LENGTH - 2;
    let prefix_len = (budget + 1) / 2;
    let suffix_len = budget - prefix_len;

    // sanitized is pure ASCII, byte slicing is char slicing
    let prefix = &sanitized[..prefix_len];
    let suffix = &sanitized[sanitized.len() - suffix_len..];

    format!("{}_{}_{}", prefix, hash, suffix)
}

/// Key for limits too small to keep any of the name: `_` plus as much of the hash as fits.
/// A limit of zero is treated as one.
fn hash_only_key(hash: &str, max_len: usize) -> String {
    let mut key = format!("_{}", hash);
    key.truncate(max_len.max(1));
    key
}

/// Builds the catalog key for an operation of a provider
pub fn catalog_key_for(prefix: &str, qualified_name: &str, max_len: usize) -> String {
    if prefix.is_empty() {
        sanitize_catalog_key(qualified_name, max_len)
    } else {
        sanitize_catalog_key(&format!("{}_{}", prefix, qualified_name), max_len)
    }
}

/// First 8 hex characters of the SHA-256 of `input`
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(HASH_LENGTH);
    encoded
}

fn ensure_identifier_start(name: &str, empty_fallback: &str) -> String {
    match name.chars().next() {
        None => empty_fallback.to_string(),
        Some(c) if c.is_ascii_alphabetic() || c == '_' => name.to_string(),
        Some(_) => format!("_{}", name),
    }
}

/// Sanitizes a parameter name into a valid identifier (`.` and friends become `_`)
pub fn sanitize_parameter_name(raw_name: &str) -> String {
    let replaced = PARAM_NAME_REGEX.replace_all(raw_name, "_");
    if replaced.chars().all(|c| c == '_') {
        return UNUSED_PARAM_NAME.to_string();
    }
    ensure_identifier_start(&replaced, UNUSED_PARAM_NAME)
}

/// Reverse mapping from exposed (sanitized) parameter names to the provider's names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterNameMap {
    exposed_to_original: HashMap<String, String>,
}

impl ParameterNameMap {
    /// Sanitize every name, disambiguating collisions with a numeric suffix.
    /// Returns the exposed names in input order together with the map.
    pub fn build<'a, I>(original_names: I) -> (Vec<String>, Self)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut map = Self::default();
        let mut taken = HashSet::new();
        let mut exposed_names = Vec::new();

        for original in original_names {
            let base = sanitize_parameter_name(original);
            let mut exposed = base.clone();
            let mut counter = 2;
            while taken.contains(&exposed) {
                exposed = format!("{}_{}", base, counter);
                counter += 1;
            }
            taken.insert(exposed.clone());
            map.exposed_to_original.insert(exposed.clone(), original.to_string());
            exposed_names.push(exposed);
        }

        (exposed_names, map)
    }

    /// Register a name that is exposed unchanged
    pub fn insert_identity(&mut self, name: &str) {
        self.exposed_to_original.insert(name.to_string(), name.to_string());
    }

    /// Original provider name for an exposed name
    pub fn original_for(&self, exposed: &str) -> Option<&str> {
        self.exposed_to_original.get(exposed).map(|s| s.as_str())
    }

    /// Whether sanitization changed the name
    pub fn is_renamed(&self, exposed: &str) -> bool {
        self.original_for(exposed).map(|o| o != exposed).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.exposed_to_original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exposed_to_original.is_empty()
    }
}

/// Derives a catalog prefix from a provider type name by dropping `Client` and `Service`
/// (e.g. `AccessApprovalClient` -> `AccessApproval`)
pub fn derive_service_prefix(type_name: &str) -> String {
    let stripped = type_name.replace("Client", "").replace("Service", "");
    let stripped = if stripped.is_empty() { type_name.to_string() } else { stripped };
    CATALOG_KEY_REGEX.replace_all(&stripped, "_").to_string()
}

/// Title-cases an API name (`translate` -> `Translate`, `cloud-run` -> `Cloud-Run`)
pub fn title_case_api_name(api_name: &str) -> String {
    let mut out = String::with_capacity(api_name.len());
    let mut at_word_start = true;
    for c in api_name.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = !c.is_ascii_digit();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid_key(key: &str, max_len: usize) {
        assert!(key.len() <= max_len, "{} exceeds {}", key, max_len);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'), "bad charset: {}", key);
        let first = key.chars().next().unwrap();
        assert!(first.is_ascii_alphabetic() || first == '_', "bad start: {}", key);
    }

    #[test]
    fn test_sanitize_catalog_key_short_names() {
        assert_eq!(sanitize_catalog_key("Maps_geocode", 64), "Maps_geocode");
        assert_eq!(sanitize_catalog_key("Translate.detections.list", 64), "Translate_detections_list");
        assert_eq!(sanitize_catalog_key("9lives", 64), "_9lives");
        assert_eq!(sanitize_catalog_key("-dash", 64), "_-dash");
        assert_eq!(sanitize_catalog_key("", 64), "_unnamed");
        assert_eq!(sanitize_catalog_key("héllo wörld", 64), "h_llo_w_rld");
    }

    #[test]
    fn test_sanitize_catalog_key_properties() {
        let inputs = [
            "simple",
            "with spaces and $ymbols!",
            "0starts_with_digit",
            "ünïcödé/🚀/names",
            "a".repeat(200).as_str(),
            "AssetService_batch_get_effective_iam_policies_for_a_really_long_project_hierarchy",
            "",
            "....",
        ]
        .map(|s| s.to_string());

        for max_len in [1, 2, 9, 10, 15, 16, 17, 32, 64] {
            for input in &inputs {
                assert_valid_key(&sanitize_catalog_key(input, max_len), max_len);
            }
        }
    }

    #[test]
    fn test_small_limits_fall_back_to_hash() {
        let raw = "x".repeat(40);
        let key = sanitize_catalog_key(&raw, 10);
        assert_eq!(key, format!("_{}", short_hash(&raw)));
        assert_eq!(sanitize_catalog_key(&raw, 4), format!("_{}", &short_hash(&raw)[..3]));
        assert_eq!(sanitize_catalog_key("", 4), "_".to_string() + &short_hash("")[..3]);
        assert_eq!(sanitize_catalog_key("abc", 4), "abc");
    }

    #[test]
    fn test_long_key_keeps_prefix_hash_and_suffix() {
        let raw = format!("AlloyDBAdmin_{}_list_clusters", "x".repeat(80));
        let key = sanitize_catalog_key(&raw, 64);
        assert_eq!(key.len(), 64);
        assert!(key.starts_with("AlloyDBAdmin_"));
        assert!(key.ends_with("list_clusters"));
        assert!(key.contains(&format!("_{}_", short_hash(&raw))));
    }

    #[test]
    fn test_sanitize_catalog_key_is_deterministic() {
        let raw = "Dataproc_projects_regions_clusters_node_groups_create_with_a_very_long_tail_name";
        assert_eq!(sanitize_catalog_key(raw, 48), sanitize_catalog_key(raw, 48));
    }

    #[test]
    fn test_hash_distinguishes_long_names_with_same_edges() {
        let a = format!("Prefix_{}_suffix", "a".repeat(100));
        let b = format!("Prefix_{}_suffix", "b".repeat(100));
        assert_ne!(sanitize_catalog_key(&a, 40), sanitize_catalog_key(&b, 40));
    }

    #[test]
    fn test_short_hash_width() {
        let hash = short_hash("anything");
        assert_eq!(hash.len(), HASH_LENGTH);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_sanitize_parameter_name() {
        assert_eq!(sanitize_parameter_name("page.size"), "page_size");
        assert_eq!(sanitize_parameter_name("_"), UNUSED_PARAM_NAME);
        assert_eq!(sanitize_parameter_name("2fa"), "_2fa");
        assert_eq!(sanitize_parameter_name("x-goog-user"), "x_goog_user");
        assert_eq!(sanitize_parameter_name("user_id"), "user_id");
    }

    #[test]
    fn test_parameter_name_map_reverse_lookup_and_collisions() {
        let (exposed, map) = ParameterNameMap::build(["page.size", "page_size", "_", "id"]);
        assert_eq!(exposed, vec!["page_size", "page_size_2", "unused_param", "id"]);
        assert_eq!(map.original_for("page_size"), Some("page.size"));
        assert_eq!(map.original_for("page_size_2"), Some("page_size"));
        assert_eq!(map.original_for("unused_param"), Some("_"));
        assert!(map.is_renamed("unused_param"));
        assert!(!map.is_renamed("id"));
    }

    #[test]
    fn test_derive_service_prefix() {
        assert_eq!(derive_service_prefix("AccessApprovalClient"), "AccessApproval");
        assert_eq!(derive_service_prefix("AssetServiceClient"), "Asset");
        assert_eq!(derive_service_prefix("Client"), "Client");
    }

    #[test]
    fn test_title_case_api_name() {
        assert_eq!(title_case_api_name("translate"), "Translate");
        assert_eq!(title_case_api_name("cloud-run"), "Cloud-Run");
        assert_eq!(title_case_api_name("gmail"), "Gmail");
    }
}
