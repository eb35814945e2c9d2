pub mod body;
pub mod bounds;
pub mod c_api;
pub mod config;
pub mod error;
pub mod forces;
pub mod quadtree;
pub mod scenario;
pub mod system;
pub mod vector;

pub use body::Body;
pub use bounds::AxisAlignedBox;
pub use config::{BoundsPolicy, PositionUpdate, Strategy, SystemConfig};
pub use error::{GravityError, Result};
pub use forces::{Accumulator, ForceLaw};
pub use quadtree::{Node, PointMass, Quadtree};
pub use system::GravitySystem;
pub use vector::Vector2;
