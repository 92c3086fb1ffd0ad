use glam::{Mat4, Vec3};
use log::debug;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Surface indicator. Its transform is written directly each frame rather
/// than composed from position/rotation/scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub visible: bool,
    pub transform: Mat4,
}

impl Marker {
    pub fn new() -> Self {
        Self {
            visible: false,
            transform: Mat4::IDENTITY,
        }
    }

    pub fn show_at(&mut self, pose: Mat4) {
        self.transform = pose;
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::new()
    }
}

/// A loaded model, shared read-only by every instance placed from it.
pub struct ModelTemplate<A> {
    pub asset: Arc<A>,
    pub scale: Vec3,
}

impl<A> ModelTemplate<A> {
    pub fn new(asset: Arc<A>, scale: Vec3) -> Self {
        Self { asset, scale }
    }

    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_scale(self.scale)
    }

    pub fn instantiate(&self, transform: Mat4) -> ModelInstance<A> {
        ModelInstance {
            asset: Arc::clone(&self.asset),
            transform,
            local: self.local_transform(),
            visible: true,
        }
    }
}

pub struct ModelInstance<A> {
    pub asset: Arc<A>,
    /// Placement pose, fixed at creation.
    pub transform: Mat4,
    pub local: Mat4,
    pub visible: bool,
}

impl<A> ModelInstance<A> {
    pub fn world_transform(&self) -> Mat4 {
        self.transform * self.local
    }
}

pub struct Scene<A> {
    pub marker: Marker,
    template: Option<ModelTemplate<A>>,
    instances: Vec<ModelInstance<A>>,
    max_instances: Option<NonZeroUsize>,
}

impl<A> Scene<A> {
    pub fn new() -> Self {
        Self {
            marker: Marker::new(),
            template: None,
            instances: Vec::new(),
            max_instances: None,
        }
    }

    /// Caps placed instances; the oldest are evicted first. `None` keeps
    /// every instance for the life of the scene.
    pub fn with_max_instances(mut self, max_instances: Option<NonZeroUsize>) -> Self {
        self.max_instances = max_instances;
        self
    }

    pub fn set_template(&mut self, template: ModelTemplate<A>) {
        self.template = Some(template);
    }

    pub fn template(&self) -> Option<&ModelTemplate<A>> {
        self.template.as_ref()
    }

    pub fn instances(&self) -> &[ModelInstance<A>] {
        &self.instances
    }

    /// Returns how many old instances were evicted to make room.
    pub fn add_instance(&mut self, instance: ModelInstance<A>) -> usize {
        self.instances.push(instance);
        let Some(max) = self.max_instances.map(NonZeroUsize::get) else {
            return 0;
        };
        let excess = self.instances.len().saturating_sub(max);
        if excess > 0 {
            self.instances.drain(..excess);
            debug!("evicted {excess} placed instance(s), cap is {max}");
        }
        excess
    }
}

impl<A> Default for Scene<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> ModelTemplate<&'static str> {
        ModelTemplate::new(Arc::new("box"), Vec3::splat(0.2))
    }

    #[test]
    fn marker_starts_hidden() {
        let marker = Marker::new();
        assert!(!marker.visible);
        assert_eq!(marker.transform, Mat4::IDENTITY);
    }

    #[test]
    fn show_then_hide_keeps_last_pose() {
        let mut marker = Marker::new();
        let pose = Mat4::from_translation(Vec3::new(1.0, 0.0, -2.0));
        marker.show_at(pose);
        assert!(marker.visible);
        marker.hide();
        assert!(!marker.visible);
        assert_eq!(marker.transform, pose);
    }

    #[test]
    fn instances_share_the_template_asset() {
        let template = template();
        let a = template.instantiate(Mat4::IDENTITY);
        let b = template.instantiate(Mat4::from_translation(Vec3::X));
        assert!(Arc::ptr_eq(&a.asset, &b.asset));
        assert!(a.visible && b.visible);
    }

    #[test]
    fn world_transform_applies_template_scale_after_placement() {
        let pose = Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0));
        let instance = template().instantiate(pose);
        let corner = instance.world_transform().transform_point3(Vec3::ONE);
        assert!(corner.abs_diff_eq(Vec3::new(0.2, 0.2, -0.8), 1e-6));
        assert_eq!(instance.transform, pose);
    }

    #[test]
    fn unbounded_scene_keeps_everything() {
        let template = template();
        let mut scene = Scene::new();
        for i in 0..50 {
            let evicted = scene.add_instance(template.instantiate(Mat4::from_translation(
                Vec3::new(i as f32, 0.0, 0.0),
            )));
            assert_eq!(evicted, 0);
        }
        assert_eq!(scene.instances().len(), 50);
    }

    #[test]
    fn capped_scene_evicts_oldest_first() {
        let template = template();
        let mut scene = Scene::new().with_max_instances(NonZeroUsize::new(2));
        for x in [1.0, 2.0, 3.0] {
            scene.add_instance(template.instantiate(Mat4::from_translation(Vec3::new(
                x, 0.0, 0.0,
            ))));
        }
        let xs: Vec<f32> = scene
            .instances()
            .iter()
            .map(|i| i.transform.w_axis.x)
            .collect();
        assert_eq!(xs, vec![2.0, 3.0]);
    }

    #[test]
    fn cap_of_one_keeps_the_newest() {
        let template = template();
        let mut scene = Scene::new().with_max_instances(NonZeroUsize::new(1));
        assert_eq!(scene.add_instance(template.instantiate(Mat4::IDENTITY)), 0);
        let newest = Mat4::from_translation(Vec3::X);
        assert_eq!(scene.add_instance(template.instantiate(newest)), 1);
        assert_eq!(scene.instances().len(), 1);
        assert_eq!(scene.instances()[0].transform, newest);
    }

    #[test]
    fn template_is_unset_until_loaded() {
        let mut scene: Scene<&'static str> = Scene::new();
        assert!(scene.template().is_none());
        scene.set_template(template());
        assert!(scene.template().is_some());
    }
}
