use uuid::Uuid;

/// Deterministic UUIDv5 from an arbitrary string id.
///
/// Backends that only accept UUID point ids store `stable_uuid(id)`; the same
/// id always maps to the same point, so upserts stay last-write-wins per id.
pub fn stable_uuid(id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, id.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_same_uuid() {
        assert_eq!(stable_uuid("your-embedding-id-1"), stable_uuid("your-embedding-id-1"));
        assert_ne!(stable_uuid("your-embedding-id-1"), stable_uuid("your-embedding-id-2"));
    }
}
