//! Arena-style stores mapping engine ids to live host-side records.

use crate::world::constraint::Constraint;
use crate::world::scene::SceneNode;
use crate::world::vehicle::Vehicle;
use std::collections::HashMap;

/// Owns every registered object, vehicle and constraint, keyed by id.
///
/// Ids come from one monotonically increasing counter shared by all three
/// kinds, starting at 1; an id is never reused within a session. Removal
/// deletes the key, so a lookup of a removed id is simply a miss — which
/// the report decoders treat as "skip this record", since reports and
/// removals race across the worker boundary by design.
#[derive(Debug)]
pub struct WorldRegistry {
    next_id: u32,
    objects: HashMap<u32, SceneNode>,
    vehicles: HashMap<u32, Vehicle>,
    constraints: HashMap<u32, Constraint>,
}

impl WorldRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            objects: HashMap::new(),
            vehicles: HashMap::new(),
            constraints: HashMap::new(),
        }
    }

    /// Fresh id, strictly greater than every previously issued one.
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert_object(&mut self, id: u32, node: SceneNode) {
        self.objects.insert(id, node);
    }

    pub fn remove_object(&mut self, id: u32) -> Option<SceneNode> {
        self.objects.remove(&id)
    }

    pub fn object(&self, id: u32) -> Option<&SceneNode> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: u32) -> Option<&mut SceneNode> {
        self.objects.get_mut(&id)
    }

    pub fn object_ids(&self) -> Vec<u32> {
        self.objects.keys().copied().collect()
    }

    pub fn objects_mut(&mut self) -> impl Iterator<Item = &mut SceneNode> {
        self.objects.values_mut()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn insert_vehicle(&mut self, id: u32, vehicle: Vehicle) {
        self.vehicles.insert(id, vehicle);
    }

    pub fn remove_vehicle(&mut self, id: u32) -> Option<Vehicle> {
        self.vehicles.remove(&id)
    }

    pub fn vehicle(&self, id: u32) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn vehicle_mut(&mut self, id: u32) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(&id)
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn insert_constraint(&mut self, id: u32, constraint: Constraint) {
        self.constraints.insert(id, constraint);
    }

    pub fn remove_constraint(&mut self, id: u32) -> Option<Constraint> {
        self.constraints.remove(&id)
    }

    pub fn constraint(&self, id: u32) -> Option<&Constraint> {
        self.constraints.get(&id)
    }

    pub fn constraint_mut(&mut self, id: u32) -> Option<&mut Constraint> {
        self.constraints.get_mut(&id)
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}

impl Default for WorldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::physics::{Material, PhysicsData};
    use crate::world::shapes::ShapeData;
    use crate::world::vehicle::VehicleTuning;

    fn node() -> SceneNode {
        SceneNode::new(PhysicsData::new(
            ShapeData::Sphere { radius: 1.0 },
            1.0,
            Material::default(),
        ))
    }

    #[test]
    fn test_id_monotonicity() {
        let mut registry = WorldRegistry::new();
        let mut previous = 0;
        for _ in 0..100 {
            let id = registry.allocate_id();
            assert!(id > previous);
            previous = id;
        }
    }

    #[test]
    fn test_counter_shared_across_kinds() {
        let mut registry = WorldRegistry::new();

        let object_id = registry.allocate_id();
        registry.insert_object(object_id, node());

        let vehicle_id = registry.allocate_id();
        registry.insert_vehicle(vehicle_id, Vehicle::new(object_id, VehicleTuning::default()));

        assert!(vehicle_id > object_id);
        assert_eq!(registry.allocate_id(), vehicle_id + 1);
    }

    #[test]
    fn test_removal_deletes_key() {
        let mut registry = WorldRegistry::new();
        let id = registry.allocate_id();
        registry.insert_object(id, node());

        assert!(registry.remove_object(id).is_some());
        assert!(registry.object(id).is_none());
        assert_eq!(registry.object_count(), 0);

        // The id is gone for good, never recycled.
        assert!(registry.allocate_id() > id);
    }
}
