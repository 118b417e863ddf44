//! Instance batching: GPU-ready per-instance transforms, grouping by shared
//! geometry and LOD tier, and a parameter-keyed cache so batches are rebuilt
//! only when their inputs change.

mod cache;
mod planner;
mod transform;

pub use cache::{BatchCache, PlanKey};
pub use planner::{
    BatchPlan, DEFAULT_MAX_INSTANCES, GeometryId, InstanceBatch, InstanceBatchPlanner,
    InstanceRequest, collect_instances, collect_world_instances, feature_class_of,
};
pub use transform::InstanceTransform;
