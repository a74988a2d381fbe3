//! Publication registry.
//!
//! Which object-class attributes and interaction classes this federate
//! currently publishes. Publishing is a monotone union; the cascading
//! divestiture that unpublishing triggers is orchestrated by the manager,
//! which owns the lock ordering — this module only mutates the sets.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{FederateError, FederateResult};
use crate::handle::{AttributeHandle, AttributeHandleSet, InteractionClassHandle, ObjectClassHandle};

/// The federate's current publications.
#[derive(Default)]
pub struct PublicationSet {
    object_classes: FxHashMap<ObjectClassHandle, AttributeHandleSet>,
    interaction_classes: FxHashSet<InteractionClassHandle>,
}

impl PublicationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds attributes to a class's published set; never removes any.
    pub fn publish_object_class(
        &mut self,
        class: ObjectClassHandle,
        attributes: &AttributeHandleSet,
    ) {
        self.object_classes
            .entry(class)
            .or_default()
            .extend(attributes.iter().copied());
    }

    /// The attribute set published for `class`, or `ObjectClassNotPublished`.
    pub fn published_attributes(&self, class: ObjectClassHandle) -> FederateResult<&AttributeHandleSet> {
        self.object_classes
            .get(&class)
            .ok_or(FederateError::ObjectClassNotPublished(class))
    }

    pub fn object_class_published(&self, class: ObjectClassHandle) -> bool {
        self.object_classes.contains_key(&class)
    }

    /// Fails unless every attribute is currently published for the class.
    pub fn check_attributes_published(
        &self,
        class: ObjectClassHandle,
        attributes: &[AttributeHandle],
    ) -> FederateResult<()> {
        let published = self.published_attributes(class)?;
        for attribute in attributes {
            if !published.contains(attribute) {
                return Err(FederateError::AttributeNotPublished {
                    class,
                    attribute: *attribute,
                });
            }
        }
        Ok(())
    }

    /// Removes the class's publication entry entirely. The caller has
    /// already divested every affected instance.
    pub fn remove_object_class(&mut self, class: ObjectClassHandle) -> Option<AttributeHandleSet> {
        self.object_classes.remove(&class)
    }

    /// Removes an attribute subset from the class's publication entry.
    pub fn remove_object_class_attributes(
        &mut self,
        class: ObjectClassHandle,
        attributes: &AttributeHandleSet,
    ) {
        if let Some(published) = self.object_classes.get_mut(&class) {
            published.retain(|attribute| !attributes.contains(attribute));
        }
    }

    pub fn publish_interaction_class(&mut self, class: InteractionClassHandle) {
        self.interaction_classes.insert(class);
    }

    pub fn unpublish_interaction_class(&mut self, class: InteractionClassHandle) {
        self.interaction_classes.remove(&class);
    }

    pub fn check_interaction_published(&self, class: InteractionClassHandle) -> FederateResult<()> {
        if self.interaction_classes.contains(&class) {
            Ok(())
        } else {
            Err(FederateError::InteractionClassNotPublished(class))
        }
    }

    /// Published object classes with their attribute sets, sorted, for the
    /// federation snapshot.
    pub fn object_class_entries(&self) -> Vec<(ObjectClassHandle, Vec<AttributeHandle>)> {
        let mut entries: Vec<_> = self
            .object_classes
            .iter()
            .map(|(class, attributes)| {
                let mut attributes: Vec<_> = attributes.iter().copied().collect();
                attributes.sort();
                (*class, attributes)
            })
            .collect();
        entries.sort_by_key(|(class, _)| *class);
        entries
    }

    /// Published interaction classes, sorted, for the federation snapshot.
    pub fn interaction_class_entries(&self) -> Vec<InteractionClassHandle> {
        let mut entries: Vec<_> = self.interaction_classes.iter().copied().collect();
        entries.sort();
        entries
    }

    pub fn clear(&mut self) {
        self.object_classes.clear();
        self.interaction_classes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::AttributeHandle;

    fn set(handles: &[u32]) -> AttributeHandleSet {
        handles.iter().map(|h| AttributeHandle(*h)).collect()
    }

    #[test]
    fn publish_is_a_monotone_union() {
        let class = ObjectClassHandle(1);
        let mut publications = PublicationSet::new();
        publications.publish_object_class(class, &set(&[1, 2]));
        publications.publish_object_class(class, &set(&[2, 3]));

        let published = publications.published_attributes(class).expect("published");
        assert_eq!(*published, set(&[1, 2, 3]));
    }

    #[test]
    fn unpublished_class_is_an_error() {
        let publications = PublicationSet::new();
        assert_eq!(
            publications.published_attributes(ObjectClassHandle(9)).err(),
            Some(FederateError::ObjectClassNotPublished(ObjectClassHandle(9)))
        );
    }

    #[test]
    fn attribute_subset_removal_keeps_the_entry() {
        let class = ObjectClassHandle(1);
        let mut publications = PublicationSet::new();
        publications.publish_object_class(class, &set(&[1, 2, 3]));
        publications.remove_object_class_attributes(class, &set(&[2]));

        assert!(publications
            .check_attributes_published(class, &[AttributeHandle(1), AttributeHandle(3)])
            .is_ok());
        assert!(matches!(
            publications.check_attributes_published(class, &[AttributeHandle(2)]),
            Err(FederateError::AttributeNotPublished { .. })
        ));
    }

    #[test]
    fn interaction_classes_round_trip() {
        let class = InteractionClassHandle(5);
        let mut publications = PublicationSet::new();
        assert!(publications.check_interaction_published(class).is_err());
        publications.publish_interaction_class(class);
        assert!(publications.check_interaction_published(class).is_ok());
        publications.unpublish_interaction_class(class);
        assert!(publications.check_interaction_published(class).is_err());
    }
}
