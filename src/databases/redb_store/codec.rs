//! bincode encoding of metadata and entity records.

use bincode::config;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::EavResult;

pub(crate) fn encode<T: Serialize>(record: &T) -> EavResult<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(record, config::standard())?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> EavResult<T> {
    let (record, _) = bincode::serde::decode_from_slice(bytes, config::standard())?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeSet, AttributeSetId, EntityTypeId};

    #[test]
    fn records_survive_encoding() {
        let set = AttributeSet {
            id: AttributeSetId(3),
            entity_type_id: EntityTypeId::PRODUCT,
            name: "Apparel".into(),
            sort_order: 2,
        };
        let bytes = encode(&set).unwrap();
        let back: AttributeSet = decode(&bytes).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let bytes = encode(&"a fairly long attribute set name".to_string()).unwrap();
        let result: EavResult<String> = decode(&bytes[..4]);
        assert!(result.is_err());
    }
}
