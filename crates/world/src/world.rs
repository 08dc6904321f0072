//! The world: all live eidolons plus a simulation clock.
//!
//! Constructed explicitly and passed where needed; there is no global
//! instance. Multiple worlds can coexist (tests rely on this).

use crate::eidolon::Eidolon;
use crate::error::{Result, WorldError};
use indexmap::IndexMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct World {
    eidolons: IndexMap<String, Eidolon>,
    time: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an eidolon. Names are unique per world.
    pub fn add(&mut self, eidolon: Eidolon) -> Result<()> {
        if self.eidolons.contains_key(eidolon.name()) {
            return Err(WorldError::DuplicateEidolon(eidolon.name().to_string()));
        }
        debug!(name = eidolon.name(), "eidolon added to world");
        self.eidolons.insert(eidolon.name().to_string(), eidolon);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Eidolon> {
        self.eidolons.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Eidolon> {
        self.eidolons.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Eidolon> {
        self.eidolons.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.eidolons.contains_key(name)
    }

    /// All eidolons in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &Eidolon> {
        self.eidolons.values()
    }

    pub fn len(&self) -> usize {
        self.eidolons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eidolons.is_empty()
    }

    pub fn advance_time(&mut self, steps: u64) {
        self.time += steps;
        info!(time = self.time, "world time advanced");
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    /// Drop all eidolons and reset the clock.
    pub fn reset(&mut self) {
        debug!(count = self.eidolons.len(), "world reset");
        self.eidolons.clear();
        self.time = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut world = World::new();
        world.add(Eidolon::new("Alice")).unwrap();
        world.add(Eidolon::new("Bob")).unwrap();

        assert_eq!(world.len(), 2);
        assert_eq!(world.get("Alice").unwrap().name(), "Alice");
        assert!(world.get("Carol").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut world = World::new();
        world.add(Eidolon::new("Alice")).unwrap();
        let err = world.add(Eidolon::new("Alice")).unwrap_err();
        assert!(matches!(err, WorldError::DuplicateEidolon(ref name) if name == "Alice"));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_worlds_are_independent() {
        let mut first = World::new();
        let mut second = World::new();
        first.add(Eidolon::new("Alice")).unwrap();
        assert!(second.is_empty());
        second.advance_time(3);
        assert_eq!(first.time(), 0);
        assert_eq!(second.time(), 3);
    }

    #[test]
    fn test_time_and_reset() {
        let mut world = World::new();
        world.add(Eidolon::new("Alice")).unwrap();
        world.advance_time(1);
        world.advance_time(5);
        assert_eq!(world.time(), 6);

        world.reset();
        assert!(world.is_empty());
        assert_eq!(world.time(), 0);
    }

    #[test]
    fn test_remove() {
        let mut world = World::new();
        world.add(Eidolon::new("Alice")).unwrap();
        let removed = world.remove("Alice").unwrap();
        assert_eq!(removed.name(), "Alice");
        assert!(world.remove("Alice").is_none());
    }
}
