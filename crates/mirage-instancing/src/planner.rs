//! Instance batch planning: group instances by shared geometry and LOD tier.
//!
//! Requests are sorted by category, then variant, then tier. Runs sharing the
//! same key become one [`InstanceBatch`], split only when a run exceeds the
//! planner's instance limit. The number of batches therefore depends on the
//! number of distinct keys, not on the number of entities.

use glam::Vec3;
use mirage_lod::{FeatureClass, LodTier};
use mirage_procgen::{DistrictLayout, EntityCategory, EntityDescriptor};

use crate::transform::InstanceTransform;

/// Default upper bound on instances per batch.
pub const DEFAULT_MAX_INSTANCES: usize = 4096;

/// Shared geometry for a batch: one pre-authored mesh per category variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId {
    /// Entity category.
    pub category: EntityCategory,
    /// Variant index within the category.
    pub variant: u16,
}

impl GeometryId {
    /// Geometry of a descriptor.
    pub fn of(entity: &EntityDescriptor) -> Self {
        Self {
            category: entity.category(),
            variant: entity.variant,
        }
    }
}

/// One instance to batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceRequest {
    /// Geometry to draw.
    pub geometry: GeometryId,
    /// Selected detail tier.
    pub tier: LodTier,
    /// Instance transform.
    pub transform: InstanceTransform,
}

impl InstanceRequest {
    fn key(&self) -> (GeometryId, LodTier) {
        (self.geometry, self.tier)
    }
}

/// One shared geometry at one tier, plus its instance transforms.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceBatch {
    /// Geometry shared by all instances.
    pub geometry: GeometryId,
    /// Tier shared by all instances.
    pub tier: LodTier,
    /// Instance transforms in request order.
    pub transforms: Vec<InstanceTransform>,
}

impl InstanceBatch {
    /// Number of instances to draw.
    pub fn instance_count(&self) -> u32 {
        self.transforms.len() as u32
    }

    /// Transforms as raw bytes for an instance buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transforms)
    }
}

/// The batches for one set of inputs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchPlan {
    batches: Vec<InstanceBatch>,
}

impl BatchPlan {
    /// Batches in key order.
    pub fn batches(&self) -> &[InstanceBatch] {
        &self.batches
    }

    /// Number of batches, i.e. draw calls.
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total instances across every batch.
    pub fn instance_count(&self) -> usize {
        self.batches.iter().map(|b| b.transforms.len()).sum()
    }

    /// Batches drawn at `tier`.
    pub fn at_tier(&self, tier: LodTier) -> impl Iterator<Item = &InstanceBatch> + '_ {
        self.batches.iter().filter(move |b| b.tier == tier)
    }
}

/// Builds [`BatchPlan`]s with a bounded instance count per batch.
#[derive(Clone, Copy, Debug)]
pub struct InstanceBatchPlanner {
    max_instances: usize,
}

impl Default for InstanceBatchPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INSTANCES)
    }
}

impl InstanceBatchPlanner {
    /// A planner splitting batches above `max_instances`. Zero is treated as one.
    pub fn new(max_instances: usize) -> Self {
        Self {
            max_instances: max_instances.max(1),
        }
    }

    /// Instance limit per batch.
    pub fn max_instances(&self) -> usize {
        self.max_instances
    }

    /// Batch one class of entities that already share geometry and tier.
    ///
    /// Returns a single batch unless `transforms` exceeds the instance limit.
    pub fn plan_class(
        &self,
        geometry: GeometryId,
        tier: LodTier,
        transforms: &[InstanceTransform],
    ) -> Vec<InstanceBatch> {
        transforms
            .chunks(self.max_instances)
            .map(|chunk| InstanceBatch {
                geometry,
                tier,
                transforms: chunk.to_vec(),
            })
            .collect()
    }

    /// Group arbitrary requests into batches.
    ///
    /// Identical input produces an identical plan. Within a batch, transforms
    /// keep their request order.
    pub fn plan(&self, requests: impl IntoIterator<Item = InstanceRequest>) -> BatchPlan {
        let mut requests: Vec<InstanceRequest> = requests.into_iter().collect();
        // Stable, so equal keys keep request order.
        requests.sort_by_key(InstanceRequest::key);

        let mut batches = Vec::new();
        for run in requests.chunk_by(|a, b| a.key() == b.key()) {
            let (geometry, tier) = run[0].key();
            let transforms: Vec<InstanceTransform> = run.iter().map(|r| r.transform).collect();
            batches.extend(self.plan_class(geometry, tier, &transforms));
        }

        tracing::trace!(
            requests = requests.len(),
            batches = batches.len(),
            "planned instance batches"
        );
        BatchPlan { batches }
    }
}

/// LOD class used for an entity category.
pub const fn feature_class_of(category: EntityCategory) -> FeatureClass {
    match category {
        EntityCategory::Landmark | EntityCategory::Minaret => FeatureClass::Landmark,
        EntityCategory::Building | EntityCategory::Shop | EntityCategory::Tent => {
            FeatureClass::Building
        }
        EntityCategory::Crop | EntityCategory::Tree => FeatureClass::Vegetation,
        EntityCategory::FencePost | EntityCategory::Well | EntityCategory::Prop => {
            FeatureClass::Prop
        }
        EntityCategory::Silhouette => FeatureClass::Skyline,
    }
}

/// Turn a layout into instance requests.
///
/// `origin` is the world position of the layout's tile centre; `tier_of`
/// picks a tier for each entity given its world position.
pub fn collect_instances(
    layout: &DistrictLayout,
    origin: Vec3,
    mut tier_of: impl FnMut(&EntityDescriptor, Vec3) -> LodTier,
) -> Vec<InstanceRequest> {
    layout
        .entities()
        .iter()
        .map(|entity| {
            let transform = InstanceTransform::from_descriptor(entity, origin);
            InstanceRequest {
                geometry: GeometryId::of(entity),
                tier: tier_of(entity, transform.position()),
                transform,
            }
        })
        .collect()
}

/// Instance requests for world-space entities such as the horizon skyline.
pub fn collect_world_instances<'a>(
    entities: impl IntoIterator<Item = &'a EntityDescriptor>,
    mut tier_of: impl FnMut(&EntityDescriptor, Vec3) -> LodTier,
) -> Vec<InstanceRequest> {
    entities
        .into_iter()
        .map(|entity| {
            let transform = InstanceTransform::from_descriptor(entity, Vec3::ZERO);
            InstanceRequest {
                geometry: GeometryId::of(entity),
                tier: tier_of(entity, transform.position()),
                transform,
            }
        })
        .collect()
}
