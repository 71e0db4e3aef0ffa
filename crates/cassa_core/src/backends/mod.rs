//! Storage backends for the graph store
//!
//! - Memory: ordered N-Triples lines with SPARQL Update patches (testing/reference)

#[cfg(feature = "memory-backend")]
pub mod memory;

#[cfg(feature = "memory-backend")]
pub use memory::{Clock, MemoryStore, ReadOnlyStore};

#[cfg(all(test, feature = "memory-backend"))]
mod tests {
    use super::*;
    use crate::store::{ModifiableStore, Store};

    #[test]
    fn test_memory_store_implements_store_traits() {
        fn accepts_store<T: Store>(_: &T) {}
        fn accepts_modifiable<T: ModifiableStore>(_: &T) {}
        let store = MemoryStore::new();
        accepts_store(&store);
        accepts_modifiable(&store);
        accepts_store(&store.read_only());
    }
}
