pub mod constraint;
pub mod events;
pub mod physics;
pub mod scene;
pub mod shapes;
pub mod vehicle;

// Re-export the main world-side types for easier access
pub use constraint::{Constraint, ConstraintKind};
pub use events::WorldEvent;
pub use physics::{BodyType, GeometryProcessor, Material, PhysicsData};
pub use scene::{SceneNode, SoftGeometry};
pub use shapes::ShapeData;
pub use vehicle::{Vehicle, VehicleTuning, WheelDescription, WheelNode};
