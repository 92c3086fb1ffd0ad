use log::debug;
use placer_scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredTap {
    NotPresenting,
    MarkerHidden,
    ModelNotLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    Placed { evicted: usize },
    Ignored(IgnoredTap),
}

/// Tap handler: drops a copy of the template at the marker. Taps that
/// arrive before there is something to place, or somewhere to place it, are
/// dropped without feedback.
pub fn place_at_marker<A>(scene: &mut Scene<A>, presenting: bool) -> TapOutcome {
    if !presenting {
        return ignore(IgnoredTap::NotPresenting);
    }
    if !scene.marker.visible {
        return ignore(IgnoredTap::MarkerHidden);
    }
    let Some(template) = scene.template() else {
        return ignore(IgnoredTap::ModelNotLoaded);
    };

    let instance = template.instantiate(scene.marker.transform);
    let evicted = scene.add_instance(instance);
    debug!("placed instance #{}", scene.instances().len());
    TapOutcome::Placed { evicted }
}

fn ignore(reason: IgnoredTap) -> TapOutcome {
    debug!("tap ignored: {reason:?}");
    TapOutcome::Ignored(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};
    use placer_scene::ModelTemplate;
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    fn loaded_scene() -> Scene<&'static str> {
        let mut scene = Scene::new();
        scene.set_template(ModelTemplate::new(Arc::new("box"), Vec3::splat(0.2)));
        scene
    }

    #[test]
    fn hidden_marker_places_nothing() {
        let mut scene = loaded_scene();
        assert_eq!(
            place_at_marker(&mut scene, true),
            TapOutcome::Ignored(IgnoredTap::MarkerHidden)
        );
        assert!(scene.instances().is_empty());
    }

    #[test]
    fn unloaded_model_places_nothing() {
        let mut scene: Scene<&'static str> = Scene::new();
        scene.marker.show_at(Mat4::IDENTITY);
        assert_eq!(
            place_at_marker(&mut scene, true),
            TapOutcome::Ignored(IgnoredTap::ModelNotLoaded)
        );
        assert!(scene.instances().is_empty());
    }

    #[test]
    fn not_presenting_places_nothing() {
        let mut scene = loaded_scene();
        scene.marker.show_at(Mat4::IDENTITY);
        assert_eq!(
            place_at_marker(&mut scene, false),
            TapOutcome::Ignored(IgnoredTap::NotPresenting)
        );
        assert!(scene.instances().is_empty());
    }

    #[test]
    fn placed_instance_stays_put_when_marker_moves() {
        let mut scene = loaded_scene();
        let tap_pose = Mat4::from_translation(Vec3::new(0.5, 0.0, -1.0));
        scene.marker.show_at(tap_pose);

        assert_eq!(
            place_at_marker(&mut scene, true),
            TapOutcome::Placed { evicted: 0 }
        );
        assert_eq!(scene.instances().len(), 1);

        scene.marker.show_at(Mat4::from_translation(Vec3::new(3.0, 0.0, -4.0)));
        let placed = &scene.instances()[0];
        assert_eq!(placed.transform, tap_pose);
        assert!(placed.visible);
    }

    #[test]
    fn every_tap_adds_one_instance() {
        let mut scene = loaded_scene();
        scene.marker.show_at(Mat4::IDENTITY);
        for n in 1..=3 {
            place_at_marker(&mut scene, true);
            assert_eq!(scene.instances().len(), n);
        }
    }

    #[test]
    fn capped_scene_reports_evictions() {
        let mut scene = loaded_scene().with_max_instances(NonZeroUsize::new(1));
        scene.marker.show_at(Mat4::IDENTITY);
        place_at_marker(&mut scene, true);
        assert_eq!(
            place_at_marker(&mut scene, true),
            TapOutcome::Placed { evicted: 1 }
        );
        assert_eq!(scene.instances().len(), 1);
    }
}
