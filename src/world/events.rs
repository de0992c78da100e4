//! Events sent from the synchronization layer to the application.

use cgmath::Vector3;

/// Notifications delivered over the scene's event channel.
#[derive(Debug, Clone)]
pub enum WorldEvent {
    /// A world report was applied; scene transforms reflect the latest tick.
    Updated,

    /// Two objects began touching this tick. Fires exactly once per contact,
    /// on the 0→1 transition, and never repeats while the contact persists.
    Collision {
        object_id: u32,
        other_id: u32,
        relative_linear_velocity: Vector3<f32>,
        relative_angular_velocity: Vector3<f32>,
        contact_normal: Vector3<f32>,
    },

    /// The engine confirmed an object registration.
    ObjectReady { id: u32 },

    /// The engine confirmed a vehicle registration.
    VehicleReady { id: u32 },

    /// The engine world is initialized; deferred registrations were flushed.
    WorldReady,

    /// The engine runtime finished loading in the worker.
    EngineLoaded,
}
