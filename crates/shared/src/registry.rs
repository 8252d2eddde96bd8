use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::attrs::{Attributes, LocationAttrs};
use crate::engine::MapEngine;
use crate::error::Error;
use crate::ids::IdSource;
use crate::markers::{MarkerDecl, MarkerSpec};
use crate::models::{ElementKey, LngLat, MarkerRef, StopId, TourStop};

/// Snapshot of one attached `map-location` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclaredLocation {
    pub key: ElementKey,
    pub attrs: Attributes,
    /// Popup body shown in the information box.
    pub content_html: String,
    pub markers: Vec<MarkerDecl>,
}

impl DeclaredLocation {
    pub fn new(key: impl Into<String>, attrs: Attributes) -> Self {
        Self {
            key: ElementKey::new(key),
            attrs,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct ReconcileResult {
    pub added: Vec<TourStop>,
    pub removed: Vec<StopId>,
    /// Locations that failed to resolve, with the reason.
    pub rejected: Vec<(ElementKey, Error)>,
}

impl ReconcileResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.rejected.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct LocationRegistry {
    /// Document order as of the last reconciliation.
    stops: Vec<TourStop>,
    /// Attached locations that failed to resolve; reported once.
    rejected: HashSet<ElementKey>,
}

impl LocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn stops(&self) -> &[TourStop] {
        &self.stops
    }

    /// Traversal order.
    pub fn order(&self) -> Vec<StopId> {
        self.stops.iter().map(|s| s.id.clone()).collect()
    }

    /// Stop at `index`, wrapping; `None` when empty.
    pub fn get(&self, index: usize) -> Option<&TourStop> {
        if self.stops.is_empty() {
            return None;
        }
        self.stops.get(index % self.stops.len())
    }

    pub fn find(&self, id: &StopId) -> Option<&TourStop> {
        self.stops.iter().find(|s| &s.id == id)
    }

    pub fn is_rejected(&self, key: &ElementKey) -> bool {
        self.rejected.contains(key)
    }

    /// Position of the first stop declaring element id `id`, for edges.
    pub fn anchor_of(&self, id: &str) -> Option<LngLat> {
        self.stops
            .iter()
            .find(|s| s.declared_id.as_deref() == Some(id))
            .map(|s| s.view_state.center())
    }

    /// Whether the attached set differs from what was last reconciled.
    pub fn membership_changed(&self, attached: &[DeclaredLocation]) -> bool {
        let known = self.stops.len() + self.rejected.len();
        let distinct: HashSet<&ElementKey> = attached.iter().map(|d| &d.key).collect();
        distinct.len() != known
            || attached.iter().any(|decl| {
                !self.rejected.contains(&decl.key) && !self.stops.iter().any(|s| s.key == decl.key)
            })
    }

    /// Reconcile only when membership changed; attribute edits on known
    /// stops go through [`Self::location_updated`] instead.
    pub fn on_mutation<E: MapEngine + ?Sized>(
        &mut self,
        attached: &[DeclaredLocation],
        ids: &mut dyn IdSource,
        engine: &mut E,
    ) -> Option<ReconcileResult> {
        if !self.membership_changed(attached) {
            return None;
        }
        Some(self.reconcile(attached, ids, engine))
    }

    /// Diff `attached` (in document order) against the known stops.
    ///
    /// Stops keep their id and markers across reconciliations; the index
    /// is rebuilt from `attached` every time. A repeated element key only
    /// counts at its first position.
    pub fn reconcile<E: MapEngine + ?Sized>(
        &mut self,
        attached: &[DeclaredLocation],
        ids: &mut dyn IdSource,
        engine: &mut E,
    ) -> ReconcileResult {
        let mut result = ReconcileResult::default();
        let attached_keys: HashSet<&ElementKey> = attached.iter().map(|d| &d.key).collect();

        let mut known: HashMap<ElementKey, TourStop> = HashMap::new();
        for stop in self.stops.drain(..) {
            if attached_keys.contains(&stop.key) {
                known.insert(stop.key.clone(), stop);
            } else {
                for marker in &stop.markers {
                    engine.remove_marker(marker.handle);
                }
                result.removed.push(stop.id);
            }
        }
        self.rejected.retain(|key| attached_keys.contains(key));

        let mut seen: HashSet<&ElementKey> = HashSet::with_capacity(attached.len());
        let mut ordered = Vec::with_capacity(attached.len());
        for decl in attached {
            if !seen.insert(&decl.key) {
                warn!(key = %decl.key, "skipping location with a repeated element key");
                continue;
            }
            if let Some(stop) = known.remove(&decl.key) {
                ordered.push(stop);
                continue;
            }
            if self.rejected.contains(&decl.key) {
                continue;
            }
            match LocationAttrs::resolve(&decl.attrs) {
                Ok(attrs) => {
                    let stop = build_stop(decl, attrs, ids, engine);
                    result.added.push(stop.clone());
                    ordered.push(stop);
                }
                Err(err) => {
                    warn!(key = %decl.key, "rejecting location: {err}");
                    self.rejected.insert(decl.key.clone());
                    result.rejected.push((decl.key.clone(), err));
                }
            }
        }
        self.stops = ordered;

        debug!(
            added = result.added.len(),
            removed = result.removed.len(),
            rejected = result.rejected.len(),
            stops = self.stops.len(),
            "reconciled locations"
        );
        result
    }

    /// Re-read the pose of a known stop and move its markers. Returns the
    /// stop's id, or `None` for unknown or rejected elements. An edit that
    /// makes the pose invalid keeps the previous pose.
    pub fn location_updated<E: MapEngine + ?Sized>(
        &mut self,
        key: &ElementKey,
        attrs: &Attributes,
        engine: &mut E,
    ) -> Option<StopId> {
        let stop = self.stops.iter_mut().find(|s| &s.key == key)?;
        let resolved = match LocationAttrs::resolve(attrs) {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(key = %key, "ignoring location update: {err}");
                return None;
            }
        };
        stop.view_state = resolved.view_state;
        stop.duration_ms = resolved.duration_ms;
        stop.title = resolved.title;
        let anchor = stop.view_state.center();
        for marker in &mut stop.markers {
            marker.anchor = anchor;
            engine.move_marker(marker.handle, anchor);
        }
        Some(stop.id.clone())
    }

    /// Drop a detached stop and its markers.
    pub fn location_removed<E: MapEngine + ?Sized>(
        &mut self,
        key: &ElementKey,
        engine: &mut E,
    ) -> Option<StopId> {
        self.rejected.remove(key);
        let index = self.stops.iter().position(|s| &s.key == key)?;
        let stop = self.stops.remove(index);
        for marker in &stop.markers {
            engine.remove_marker(marker.handle);
        }
        debug!(stop = %stop.id, "location removed");
        Some(stop.id)
    }
}

fn build_stop<E: MapEngine + ?Sized>(
    decl: &DeclaredLocation,
    attrs: LocationAttrs,
    ids: &mut dyn IdSource,
    engine: &mut E,
) -> TourStop {
    let id = StopId(ids.next_id());
    let anchor = attrs.view_state.center();
    let markers = MarkerSpec::for_location(&decl.markers)
        .iter()
        .map(|spec| MarkerRef {
            owner: id.clone(),
            anchor,
            handle: engine.add_marker(&id, spec, anchor),
        })
        .collect();
    TourStop {
        id,
        key: decl.key.clone(),
        declared_id: attrs.id,
        view_state: attrs.view_state,
        duration_ms: attrs.duration_ms,
        title: attrs.title,
        content_html: decl.content_html.clone(),
        markers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::models::ViewState;
    use crate::testing::RecordingEngine;
    use pretty_assertions::assert_eq;

    fn location(key: &str, lat: &str) -> DeclaredLocation {
        DeclaredLocation::new(
            key,
            Attributes::new()
                .with("latitude", lat)
                .with("longitude", "21")
                .with("zoom", "5"),
        )
    }

    fn zoomless(key: &str) -> DeclaredLocation {
        DeclaredLocation::new(
            key,
            Attributes::new().with("latitude", "1").with("longitude", "2"),
        )
    }

    #[test]
    fn test_reconcile_adds_in_document_order_with_default_markers() {
        let mut registry = LocationRegistry::new();
        let mut engine = RecordingEngine::default();
        let mut ids = SequentialIds::new();
        let attached = vec![location("a", "1"), location("b", "2"), location("c", "3")];

        let result = registry.reconcile(&attached, &mut ids, &mut engine);
        assert_eq!(result.added.len(), 3);
        assert_eq!(
            registry.order(),
            vec![
                StopId("dtrm-1".into()),
                StopId("dtrm-2".into()),
                StopId("dtrm-3".into())
            ]
        );
        assert_eq!(engine.markers.len(), 3);
        assert!(registry.stops().iter().all(|s| s.markers.len() == 1));
    }

    #[test]
    fn test_reconcile_twice_is_idempotent() {
        let mut registry = LocationRegistry::new();
        let mut engine = RecordingEngine::default();
        let mut ids = SequentialIds::new();
        let attached = vec![location("a", "1"), zoomless("bad"), location("b", "2")];

        registry.reconcile(&attached, &mut ids, &mut engine);
        let order = registry.order();
        let again = registry.reconcile(&attached, &mut ids, &mut engine);
        assert!(again.is_empty());
        assert_eq!(registry.order(), order);
        assert_eq!(engine.markers.len(), 2);
    }

    #[test]
    fn test_location_missing_zoom_never_registers() {
        let mut registry = LocationRegistry::new();
        let mut engine = RecordingEngine::default();
        let result = registry.reconcile(&[zoomless("bad")], &mut SequentialIds::new(), &mut engine);
        assert!(registry.is_empty());
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].0, ElementKey::new("bad"));
        assert!(registry.is_rejected(&ElementKey::new("bad")));
        assert!(engine.markers.is_empty());
    }

    #[test]
    fn test_removal_detaches_markers_and_keeps_order() {
        let mut registry = LocationRegistry::new();
        let mut engine = RecordingEngine::default();
        let mut ids = SequentialIds::new();
        registry.reconcile(
            &[location("a", "1"), location("b", "2"), location("c", "3")],
            &mut ids,
            &mut engine,
        );
        let result = registry.reconcile(&[location("a", "1"), location("c", "3")], &mut ids, &mut engine);
        assert_eq!(result.removed, vec![StopId("dtrm-2".into())]);
        assert_eq!(
            registry.order(),
            vec![StopId("dtrm-1".into()), StopId("dtrm-3".into())]
        );
        assert_eq!(engine.markers.len(), 2);
    }

    #[test]
    fn test_inserted_location_takes_document_position() {
        let mut registry = LocationRegistry::new();
        let mut engine = RecordingEngine::default();
        let mut ids = SequentialIds::new();
        registry.reconcile(&[location("a", "1"), location("c", "3")], &mut ids, &mut engine);
        registry.reconcile(
            &[location("a", "1"), location("b", "2"), location("c", "3")],
            &mut ids,
            &mut engine,
        );
        let keys: Vec<_> = registry.stops().iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_on_mutation_skips_unchanged_membership() {
        let mut registry = LocationRegistry::new();
        let mut engine = RecordingEngine::default();
        let mut ids = SequentialIds::new();
        let attached = vec![location("a", "1")];
        assert!(registry.on_mutation(&attached, &mut ids, &mut engine).is_some());
        assert!(registry.on_mutation(&attached, &mut ids, &mut engine).is_none());

        // Same count, different element.
        let swapped = vec![location("z", "1")];
        let result = registry.on_mutation(&swapped, &mut ids, &mut engine);
        assert!(result.is_some_and(|r| r.added.len() == 1 && r.removed.len() == 1));
    }

    #[test]
    fn test_declared_id_is_kept_beside_minted_id() {
        let mut registry = LocationRegistry::new();
        let mut decl = location("a", "1");
        decl.attrs.set("id", "harbour");
        registry.reconcile(&[decl], &mut SequentialIds::new(), &mut RecordingEngine::default());
        assert_eq!(registry.order(), vec![StopId("dtrm-1".into())]);
        assert_eq!(registry.stops()[0].declared_id.as_deref(), Some("harbour"));
        assert_eq!(registry.anchor_of("harbour"), Some(LngLat::new(21.0, 1.0)));
        assert_eq!(registry.anchor_of("dtrm-1"), None);
    }

    #[test]
    fn test_shared_declared_id_still_gives_distinct_stops() {
        let mut registry = LocationRegistry::new();
        let mut engine = RecordingEngine::default();
        let mut first = location("a", "1");
        first.attrs.set("id", "same");
        let mut second = location("b", "2");
        second.attrs.set("id", "same");
        registry.reconcile(&[first, second], &mut SequentialIds::new(), &mut engine);

        let owners: HashSet<_> = engine.markers.values().map(|(owner, _, _)| owner.clone()).collect();
        assert_eq!(owners.len(), 2);
        let second_owner = &registry.stops()[1].markers[0].owner;
        let found = registry.find(second_owner).map(|s| s.view_state.latitude);
        assert_eq!(found, Some(2.0));
    }

    #[test]
    fn test_repeated_key_is_registered_once_and_stays_stable() {
        let mut registry = LocationRegistry::new();
        let mut engine = RecordingEngine::default();
        let mut ids = SequentialIds::new();
        let attached = vec![location("story_location-7", "1"), location("story_location-7", "2")];

        let first = registry.reconcile(&attached, &mut ids, &mut engine);
        assert_eq!(first.added.len(), 1);
        for _ in 0..2 {
            let again = registry.reconcile(&attached, &mut ids, &mut engine);
            assert!(again.is_empty());
        }
        assert!(registry.on_mutation(&attached, &mut ids, &mut engine).is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(engine.markers.len(), 1);
    }

    #[test]
    fn test_custom_markers_one_per_declaration() {
        let mut registry = LocationRegistry::new();
        let mut engine = RecordingEngine::default();
        let mut decl = location("a", "1");
        decl.markers = vec![MarkerDecl::default(), MarkerDecl::default()];
        registry.reconcile(&[decl], &mut SequentialIds::new(), &mut engine);
        assert_eq!(registry.stops()[0].markers.len(), 2);
        assert!(engine.markers.values().all(|(_, spec, _)| spec.is_custom()));
    }

    #[test]
    fn test_location_updated_moves_markers() {
        let mut registry = LocationRegistry::new();
        let mut engine = RecordingEngine::default();
        registry.reconcile(&[location("a", "1")], &mut SequentialIds::new(), &mut engine);

        let attrs = Attributes::new()
            .with("latitude", "7")
            .with("longitude", "8")
            .with("zoom", "9");
        let id = registry.location_updated(&ElementKey::new("a"), &attrs, &mut engine);
        assert_eq!(id, Some(StopId("dtrm-1".into())));
        let stop = &registry.stops()[0];
        assert_eq!(stop.view_state, ViewState::new(8.0, 7.0, 9.0, 80.0, 60.0));
        let handle = stop.markers[0].handle;
        assert_eq!(engine.markers[&handle].2, LngLat::new(8.0, 7.0));
    }

    #[test]
    fn test_invalid_update_keeps_previous_pose() {
        let mut registry = LocationRegistry::new();
        let mut engine = RecordingEngine::default();
        registry.reconcile(&[location("a", "1")], &mut SequentialIds::new(), &mut engine);
        let before = registry.stops()[0].view_state;
        let broken = Attributes::new().with("latitude", "x");
        assert_eq!(
            registry.location_updated(&ElementKey::new("a"), &broken, &mut engine),
            None
        );
        assert_eq!(registry.stops()[0].view_state, before);
    }

    #[test]
    fn test_location_removed_drops_stop() {
        let mut registry = LocationRegistry::new();
        let mut engine = RecordingEngine::default();
        registry.reconcile(
            &[location("a", "1"), location("b", "2")],
            &mut SequentialIds::new(),
            &mut engine,
        );
        let removed = registry.location_removed(&ElementKey::new("a"), &mut engine);
        assert_eq!(removed, Some(StopId("dtrm-1".into())));
        assert_eq!(registry.len(), 1);
        assert_eq!(engine.markers.len(), 1);
        assert_eq!(registry.location_removed(&ElementKey::new("a"), &mut engine), None);
    }

    #[test]
    fn test_get_wraps_and_handles_empty() {
        let mut registry = LocationRegistry::new();
        assert!(registry.get(0).is_none());
        registry.reconcile(
            &[location("a", "1"), location("b", "2")],
            &mut SequentialIds::new(),
            &mut RecordingEngine::default(),
        );
        assert_eq!(registry.get(3).map(|s| s.key.as_str()), Some("b"));
    }
}
