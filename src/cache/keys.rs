//! Cache key derivation.
//!
//! A key is the endpoint path followed by its query parameters sorted by name
//! (then value) and form-encoded, e.g. `/api/products?page=2&sort=name`.

use url::form_urlencoded::Serializer;

/// Build the cache key for a CMS request.
///
/// Two requests with the same path and the same parameter set map to the same
/// key regardless of insertion order; any difference in a name or value yields
/// a different key. Names and values are percent-encoded, so a `&` or `=`
/// inside a value cannot impersonate another parameter.
pub fn build_key<K, V>(path: &str, query: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if query.is_empty() {
        return path.to_string();
    }

    let mut pairs: Vec<(&str, &str)> = query
        .iter()
        .map(|(name, value)| (name.as_ref(), value.as_ref()))
        .collect();
    pairs.sort_unstable();

    let mut serializer = Serializer::new(String::new());
    for (name, value) in pairs {
        serializer.append_pair(name, value);
    }

    format!("{path}?{}", serializer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_path_without_query() {
        let query: [(&str, &str); 0] = [];
        assert_eq!(build_key("/api/products", &query), "/api/products");
    }

    #[test]
    fn parameter_order_does_not_matter() {
        let first = build_key("/api/products", &[("sort", "name"), ("page", "2")]);
        let second = build_key("/api/products", &[("page", "2"), ("sort", "name")]);

        assert_eq!(first, second);
        assert_eq!(first, "/api/products?page=2&sort=name");
    }

    #[test]
    fn different_values_produce_different_keys() {
        let page_one = build_key("/api/products", &[("page", "1")]);
        let page_two = build_key("/api/products", &[("page", "2")]);
        assert_ne!(page_one, page_two);
    }

    #[test]
    fn different_paths_produce_different_keys() {
        let products = build_key("/api/products", &[("page", "1")]);
        let categories = build_key("/api/category-types", &[("page", "1")]);
        assert_ne!(products, categories);
    }

    #[test]
    fn extra_parameter_changes_key() {
        let narrow = build_key("/api/products", &[("page", "1")]);
        let wide = build_key("/api/products", &[("page", "1"), ("pageSize", "50")]);
        assert_ne!(narrow, wide);
    }

    #[test]
    fn separators_inside_values_cannot_alias() {
        let packed = build_key("/api/products", &[("a", "1&b=2")]);
        let split = build_key("/api/products", &[("a", "1"), ("b", "2")]);
        assert_ne!(packed, split);
    }

    #[test]
    fn repeated_names_sort_by_value() {
        let first = build_key("/api/products", &[("tag", "b"), ("tag", "a")]);
        let second = build_key("/api/products", &[("tag", "a"), ("tag", "b")]);
        assert_eq!(first, second);
    }

    #[test]
    fn strapi_filter_brackets_are_encoded() {
        let key = build_key("/api/products", &[("filters[publishedAt][$notNull]", "true")]);
        assert_eq!(
            key,
            "/api/products?filters%5BpublishedAt%5D%5B%24notNull%5D=true"
        );
    }
}
