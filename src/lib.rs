// simbridge: scene-graph <-> physics-worker synchronization layer

pub mod bridge;
pub mod config;
pub mod utils;
pub mod world;

// Re-export commonly used types for convenience
pub use bridge::{
    BridgeError, BridgeResult, ChannelTransport, Command, CommandChannel, CommandEnvelope,
    InboundPayload, PhysicsScene, Report, WorkerTransport, WorldRegistry,
};
pub use config::SimulationSettings;
pub use world::{
    BodyType, Constraint, ConstraintKind, GeometryProcessor, Material, PhysicsData, SceneNode,
    ShapeData, Vehicle, VehicleTuning, WheelDescription, WorldEvent,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
