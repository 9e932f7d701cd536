use uuid::Uuid;

/// Derive a URL slug from a display name: lowercase, alphanumerics kept,
/// everything else collapsed to single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Route identifiers are either a product UUID or a slug; a well-formed UUID
/// always dispatches to the id lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductIdentifier {
    Id(Uuid),
    Slug(String),
}

impl ProductIdentifier {
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw) {
            Ok(id) => ProductIdentifier::Id(id),
            Err(_) => ProductIdentifier::Slug(raw.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Samsung Galaxy S24 Ultra"), "samsung-galaxy-s24-ultra");
        assert_eq!(slugify("  Ferris // Mug!  "), "ferris-mug");
        assert_eq!(slugify("Déjà Vu"), "d-j-vu");
    }

    #[test]
    fn well_formed_uuid_classifies_as_id() {
        let raw = "8f14e45f-ceea-467f-a0f9-d997bcfb9a17";
        assert_eq!(
            ProductIdentifier::parse(raw),
            ProductIdentifier::Id(raw.parse().unwrap())
        );
    }

    #[test]
    fn anything_else_classifies_as_slug() {
        assert_eq!(
            ProductIdentifier::parse("samsung-galaxy-s24"),
            ProductIdentifier::Slug("samsung-galaxy-s24".into())
        );
    }
}
