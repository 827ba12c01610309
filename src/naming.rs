//! Identifier casing helpers shared by the schema model, codegen and migration
//!
//! Column names are snake_case projections of field codes; accessor names in
//! generated code are lowerCamel projections of entity names.

/// Convert a camelCase/PascalCase code to snake_case (`createdBy` -> `created_by`)
///
/// Only a lowercase-to-uppercase boundary inserts an underscore, so runs of
/// capitals (`userID`) collapse into one word (`user_id`).
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c == '-' || c == ' ' {
            result.push('_');
            prev_lower = false;
        } else {
            result.push(c);
            prev_lower = c.is_ascii_lowercase();
        }
    }

    result
}

/// Lowercase the first character, leave the rest untouched (`UserProfile` -> `userProfile`)
pub fn to_lower_camel(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// Convert snake/kebab case to PascalCase (`order_item` -> `OrderItem`)
pub fn to_pascal_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;

    for c in s.chars() {
        if c == '_' || c == '-' || c == ' ' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("createdBy"), "created_by");
        assert_eq!(to_snake_case("updatedAt"), "updated_at");
        assert_eq!(to_snake_case("id"), "id");
        assert_eq!(to_snake_case("OrderItem"), "order_item");
        assert_eq!(to_snake_case("userID"), "user_id");
    }

    #[test]
    fn test_lower_camel() {
        assert_eq!(to_lower_camel("User"), "user");
        assert_eq!(to_lower_camel("OrderItem"), "orderItem");
        assert_eq!(to_lower_camel(""), "");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(to_pascal_case("order_item"), "OrderItem");
        assert_eq!(to_pascal_case("user"), "User");
    }
}
