//! Test doubles shared by the unit tests: a fixed FOM, a recording
//! coordinator link, a table-driven subscription matcher and recording
//! callbacks, wired together into a manager fixture.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::callbacks::{AttributeOwner, CallbackError, FederateCallbacks};
use crate::config::FederateConfig;
use crate::error::FederateResult;
use crate::fom::FomView;
use crate::handle::{
    AttributeHandle, AttributeHandleSet, AttributeValueMap, FederateHandle,
    InteractionClassHandle, ObjectClassHandle, ObjectInstanceHandle,
};
use crate::link::{CoordinatorLink, Message};
use crate::manager::ObjectManager;
use crate::subscription::SubscriptionMatcher;

pub(crate) const DELETE_PRIVILEGE: AttributeHandle = AttributeHandle(0);

pub(crate) fn set(handles: &[u32]) -> AttributeHandleSet {
    handles.iter().map(|h| AttributeHandle(*h)).collect()
}

pub(crate) fn attrs(handles: &[u32]) -> Vec<AttributeHandle> {
    handles.iter().map(|h| AttributeHandle(*h)).collect()
}

pub(crate) fn values(handles: &[u32]) -> AttributeValueMap {
    handles
        .iter()
        .map(|h| (AttributeHandle(*h), vec![*h as u8]))
        .collect()
}

/// FOM double: a fixed table of classes and attributes.
pub(crate) struct TestFom {
    classes: FxHashMap<ObjectClassHandle, AttributeHandleSet>,
    delete_privilege: AttributeHandle,
}

impl TestFom {
    /// Classes 1 and 2, attributes 1..=5 each, delete privilege 0.
    pub(crate) fn standard() -> Self {
        let mut fom = Self {
            classes: FxHashMap::default(),
            delete_privilege: DELETE_PRIVILEGE,
        };
        fom.classes.insert(ObjectClassHandle(1), set(&[1, 2, 3, 4, 5]));
        fom.classes.insert(ObjectClassHandle(2), set(&[1, 2, 3, 4, 5]));
        fom
    }

    pub(crate) fn with_class(class: ObjectClassHandle, attributes: &[AttributeHandle]) -> Self {
        let mut fom = Self {
            classes: FxHashMap::default(),
            delete_privilege: DELETE_PRIVILEGE,
        };
        fom.classes
            .insert(class, attributes.iter().copied().collect());
        fom
    }
}

impl FomView for TestFom {
    fn object_class_defined(&self, class: ObjectClassHandle) -> bool {
        self.classes.contains_key(&class)
    }

    fn attribute_defined(&self, class: ObjectClassHandle, attribute: AttributeHandle) -> bool {
        match self.classes.get(&class) {
            Some(attributes) => attribute == self.delete_privilege || attributes.contains(&attribute),
            None => false,
        }
    }

    fn delete_privilege(&self) -> AttributeHandle {
        self.delete_privilege
    }
}

/// Link double: records every message instead of sending it.
#[derive(Default)]
pub(crate) struct RecordingLink {
    sent: Mutex<Vec<Message>>,
}

impl RecordingLink {
    pub(crate) fn sent(&self) -> Vec<Message> {
        self.sent.lock().expect("link poisoned").clone()
    }

    pub(crate) fn last(&self) -> Option<Message> {
        self.sent.lock().expect("link poisoned").last().cloned()
    }

    pub(crate) fn clear(&self) {
        self.sent.lock().expect("link poisoned").clear();
    }
}

impl CoordinatorLink for RecordingLink {
    fn send(&self, message: Message) -> FederateResult<()> {
        self.sent.lock().expect("link poisoned").push(message);
        Ok(())
    }
}

/// Matcher double: exact-class table, no hierarchy.
#[derive(Default)]
pub(crate) struct TestMatcher {
    object_classes: FxHashMap<ObjectClassHandle, AttributeHandleSet>,
    interaction_classes: FxHashSet<InteractionClassHandle>,
}

impl SubscriptionMatcher for TestMatcher {
    fn subscribed_object_class(&self, class: ObjectClassHandle) -> Option<ObjectClassHandle> {
        self.object_classes.contains_key(&class).then_some(class)
    }

    fn interaction_class_subscribed(&self, class: InteractionClassHandle) -> bool {
        self.interaction_classes.contains(&class)
    }

    fn subscribe_object_class_attributes(
        &mut self,
        class: ObjectClassHandle,
        attributes: &AttributeHandleSet,
    ) {
        self.object_classes
            .entry(class)
            .or_default()
            .extend(attributes.iter().copied());
    }

    fn unsubscribe_object_class(&mut self, class: ObjectClassHandle) {
        self.object_classes.remove(&class);
    }

    fn subscribe_interaction_class(&mut self, class: InteractionClassHandle) {
        self.interaction_classes.insert(class);
    }

    fn unsubscribe_interaction_class(&mut self, class: InteractionClassHandle) {
        self.interaction_classes.remove(&class);
    }

    fn save_state(&self) -> Vec<u8> {
        let mut object_classes: Vec<(u32, Vec<u32>)> = self
            .object_classes
            .iter()
            .map(|(class, attributes)| {
                let mut attributes: Vec<u32> = attributes.iter().map(|a| a.0).collect();
                attributes.sort_unstable();
                (class.0, attributes)
            })
            .collect();
        object_classes.sort_unstable();
        let mut interaction_classes: Vec<u32> =
            self.interaction_classes.iter().map(|c| c.0).collect();
        interaction_classes.sort_unstable();
        bincode::serialize(&(object_classes, interaction_classes)).unwrap_or_default()
    }

    fn restore_state(&mut self, state: &[u8]) {
        self.object_classes.clear();
        self.interaction_classes.clear();
        if let Ok((object_classes, interaction_classes)) =
            bincode::deserialize::<(Vec<(u32, Vec<u32>)>, Vec<u32>)>(state)
        {
            for (class, attributes) in object_classes {
                self.object_classes.insert(
                    ObjectClassHandle(class),
                    attributes.into_iter().map(AttributeHandle).collect(),
                );
            }
            self.interaction_classes = interaction_classes
                .into_iter()
                .map(InteractionClassHandle)
                .collect();
        }
    }
}

/// Everything the callbacks double observed.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum CallbackEvent {
    Discover(ObjectInstanceHandle, ObjectClassHandle, String),
    Remove(ObjectInstanceHandle),
    Reflect(ObjectInstanceHandle, Vec<AttributeHandle>),
    Acquired(ObjectInstanceHandle, Vec<AttributeHandle>),
    ReleaseRequested(ObjectInstanceHandle, Vec<AttributeHandle>),
    DivestitureRequested(ObjectInstanceHandle, Vec<AttributeHandle>),
    OwnershipReport(ObjectInstanceHandle, AttributeHandle, AttributeOwner),
    NameReservationSucceeded(String),
    NameReservationFailed(String),
}

/// Callbacks double: records every event; optionally fails each call to
/// prove failures stay contained.
#[derive(Default)]
pub(crate) struct RecordingCallbacks {
    events: Mutex<Vec<CallbackEvent>>,
    fail: bool,
}

impl RecordingCallbacks {
    pub(crate) fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn events(&self) -> Vec<CallbackEvent> {
        self.events.lock().expect("callbacks poisoned").clone()
    }

    fn record(&self, event: CallbackEvent) -> Result<(), CallbackError> {
        self.events.lock().expect("callbacks poisoned").push(event);
        if self.fail {
            Err(CallbackError("deliberate test failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl FederateCallbacks for RecordingCallbacks {
    fn discover_instance(
        &self,
        instance: ObjectInstanceHandle,
        class: ObjectClassHandle,
        name: &str,
        _producer: FederateHandle,
    ) -> Result<(), CallbackError> {
        self.record(CallbackEvent::Discover(instance, class, name.to_string()))
    }

    fn remove_instance(
        &self,
        instance: ObjectInstanceHandle,
        _tag: &[u8],
    ) -> Result<(), CallbackError> {
        self.record(CallbackEvent::Remove(instance))
    }

    fn reflect_attributes(
        &self,
        instance: ObjectInstanceHandle,
        values: &AttributeValueMap,
        _tag: &[u8],
    ) -> Result<(), CallbackError> {
        let mut attributes: Vec<AttributeHandle> = values.keys().copied().collect();
        attributes.sort();
        self.record(CallbackEvent::Reflect(instance, attributes))
    }

    fn acquisition_notification(
        &self,
        instance: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        _tag: &[u8],
    ) -> Result<(), CallbackError> {
        self.record(CallbackEvent::Acquired(instance, attributes.to_vec()))
    }

    fn release_requested(
        &self,
        instance: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        _tag: &[u8],
    ) -> Result<(), CallbackError> {
        self.record(CallbackEvent::ReleaseRequested(instance, attributes.to_vec()))
    }

    fn divestiture_notification(
        &self,
        instance: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), CallbackError> {
        self.record(CallbackEvent::DivestitureRequested(
            instance,
            attributes.to_vec(),
        ))
    }

    fn ownership_report(
        &self,
        instance: ObjectInstanceHandle,
        attribute: AttributeHandle,
        owner: AttributeOwner,
    ) -> Result<(), CallbackError> {
        self.record(CallbackEvent::OwnershipReport(instance, attribute, owner))
    }

    fn name_reservation_succeeded(&self, name: &str) -> Result<(), CallbackError> {
        self.record(CallbackEvent::NameReservationSucceeded(name.to_string()))
    }

    fn name_reservation_failed(&self, name: &str) -> Result<(), CallbackError> {
        self.record(CallbackEvent::NameReservationFailed(name.to_string()))
    }
}

/// A wired-up manager plus handles on its doubles.
pub(crate) struct Fixture {
    pub(crate) manager: ObjectManager,
    pub(crate) link: Arc<RecordingLink>,
    pub(crate) callbacks: Arc<RecordingCallbacks>,
}

pub(crate) fn fixture() -> Fixture {
    fixture_for(FederateHandle(1))
}

pub(crate) fn fixture_for(federate: FederateHandle) -> Fixture {
    build_fixture(federate, Arc::new(RecordingCallbacks::default()))
}

pub(crate) fn failing_fixture() -> Fixture {
    build_fixture(FederateHandle(1), Arc::new(RecordingCallbacks::failing()))
}

fn build_fixture(federate: FederateHandle, callbacks: Arc<RecordingCallbacks>) -> Fixture {
    let link = Arc::new(RecordingLink::default());
    let config = FederateConfig {
        request_timeout: Duration::from_millis(200),
        generated_name_prefix: "OBJ".to_string(),
    };
    let manager = ObjectManager::new(
        federate,
        config,
        Arc::new(TestFom::standard()),
        Arc::clone(&link) as Arc<dyn CoordinatorLink>,
        Box::new(TestMatcher::default()),
        Arc::clone(&callbacks) as Arc<dyn FederateCallbacks>,
    );
    Fixture {
        manager,
        link,
        callbacks,
    }
}
