//! Key layout of the memory backend, mirroring a redis key space.
//!
//! Every key starts with a tag naming its shape, and every free-form segment
//! except the last is length-prefixed, so no pk or field name can produce a
//! key of another shape or of another record.

use crate::{model::ModelKey, store::Pk};

/// Set of every pk of a model.
pub(super) fn collection(model: &ModelKey) -> String {
    format!("col:{model}")
}

/// Hash holding the hash-backed fields of one record.
pub(super) fn record_hash(model: &ModelKey, pk: &Pk) -> String {
    format!("rec:{model}:{}", segment(pk))
}

/// Own key of one string or collection field.
pub(super) fn field(model: &ModelKey, pk: &Pk, field: &str) -> String {
    format!("fld:{model}:{}:{field}", segment(pk))
}

/// Set of pks whose `field` holds or contains `value`.
pub(super) fn index(model: &ModelKey, field: &str, value: &str) -> String {
    format!("idx:{model}:{}:{value}", segment(field))
}

// `<byte length>:<text>`
fn segment(text: &str) -> String {
    format!("{}:{text}", text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> ModelKey {
        ModelKey::parse("tests:Group").expect("key should parse")
    }

    #[test]
    fn keys_follow_model_pk_field_layout() {
        let pk = Pk::from("7");

        assert_eq!(collection(&group()), "col:tests:group");
        assert_eq!(record_hash(&group(), &pk), "rec:tests:group:1:7");
        assert_eq!(field(&group(), &pk, "owner"), "fld:tests:group:1:7:owner");
        assert_eq!(index(&group(), "owner", "3"), "idx:tests:group:5:owner:3");
    }

    #[test]
    fn separators_in_pks_and_values_stay_inside_their_segment() {
        let plain = Pk::from("x");
        let nested = Pk::from("x:parent");

        assert_ne!(record_hash(&group(), &nested), field(&group(), &plain, "parent"));
        assert_ne!(
            field(&group(), &nested, "owner"),
            field(&group(), &plain, "parent:owner")
        );
        assert_ne!(collection(&group()), record_hash(&group(), &Pk::from("collection")));
        assert_ne!(index(&group(), "a", "b:c"), index(&group(), "a:b", "c"));
    }
}
