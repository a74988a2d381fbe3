//! The object manager: one federate's directory runtime.
//!
//! Owns the four shared structures (publication registry, subscription
//! matcher, object directory, name reservations) behind their locks and
//! implements every public operation plus the remote-event application
//! paths. Locks nest in the fixed order publication → subscription →
//! directory → instance → reservation; `locks::enter` asserts it in debug
//! builds.
//!
//! Operations that must wait for a correlated coordinator response release
//! every lock first (validate → release → await → re-acquire → commit); a
//! write lock across a network round trip would deadlock if the response is
//! delivered on the blocked thread.

use std::sync::{Arc, Mutex, RwLock};

use crate::callbacks::{self, AttributeOwner, FederateCallbacks};
use crate::config::FederateConfig;
use crate::directory::{Directory, ObjectInstance};
use crate::error::{FederateError, FederateResult};
use crate::fom::{self, FomView};
use crate::handle::{
    AttributeHandle, AttributeHandleSet, AttributeValueMap, FederateHandle,
    InteractionClassHandle, ObjectClassHandle, ObjectInstanceHandle, ParameterValueMap,
};
use crate::link::{
    CoordinatorLink, CorrelationId, Message, PendingRequests, RequestStats, Response, SendOrder,
};
use crate::locks::{self, LockRank};
use crate::publication::PublicationSet;
use crate::reservation::ReservationSet;
use crate::subscription::SubscriptionMatcher;

/// What to do with owned state when resigning from the federation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResignAction {
    UnconditionallyDivestAttributes,
    DeleteObjects,
    CancelPendingOwnershipAcquisitions,
    DeleteObjectsThenDivest,
    CancelThenDeleteThenDivest,
    NoAction,
}

/// One federate's object and ownership directory.
pub struct ObjectManager {
    pub(crate) federate: FederateHandle,
    config: FederateConfig,
    fom: Arc<dyn FomView>,
    link: Arc<dyn CoordinatorLink>,
    callbacks: Arc<dyn FederateCallbacks>,
    pending: PendingRequests,
    pub(crate) publication: RwLock<PublicationSet>,
    pub(crate) subscription: RwLock<Box<dyn SubscriptionMatcher>>,
    pub(crate) directory: RwLock<Directory>,
    pub(crate) reservation: Mutex<ReservationSet>,
}

fn sorted(attributes: &AttributeHandleSet) -> Vec<AttributeHandle> {
    let mut attributes: Vec<AttributeHandle> = attributes.iter().copied().collect();
    attributes.sort();
    attributes
}

impl ObjectManager {
    pub fn new(
        federate: FederateHandle,
        config: FederateConfig,
        fom: Arc<dyn FomView>,
        link: Arc<dyn CoordinatorLink>,
        matcher: Box<dyn SubscriptionMatcher>,
        callbacks: Arc<dyn FederateCallbacks>,
    ) -> Self {
        Self {
            federate,
            config,
            fom,
            link,
            callbacks,
            pending: PendingRequests::new(),
            publication: RwLock::new(PublicationSet::new()),
            subscription: RwLock::new(matcher),
            directory: RwLock::new(Directory::new()),
            reservation: Mutex::new(ReservationSet::new()),
        }
    }

    pub fn federate(&self) -> FederateHandle {
        self.federate
    }

    pub fn request_stats(&self) -> FederateResult<RequestStats> {
        self.pending.stats()
    }

    // --- publication ---

    pub fn publish_object_class_attributes(
        &self,
        class: ObjectClassHandle,
        attributes: &AttributeHandleSet,
    ) -> FederateResult<()> {
        fom::check_class_defined(&*self.fom, class)?;
        for attribute in attributes {
            fom::check_attribute_defined(&*self.fom, class, *attribute)?;
        }

        let _publication_rank = locks::enter(LockRank::Publication);
        let mut publication = self.publication.write()?;
        publication.publish_object_class(class, attributes);
        self.link.send(Message::PublishObjectClassAttributes {
            class,
            attributes: sorted(attributes),
        })
    }

    /// Unpublishes a whole object class. Every known instance of the class
    /// is first checked for pending acquisitions (all-or-nothing), then the
    /// formerly published attributes are unconditionally divested on each,
    /// and only then does the publication entry disappear.
    pub fn unpublish_object_class(&self, class: ObjectClassHandle) -> FederateResult<()> {
        let _publication_rank = locks::enter(LockRank::Publication);
        let mut publication = self.publication.write()?;
        let published = match publication.published_attributes(class) {
            Ok(published) => published.clone(),
            // not published: nothing to divest, nothing to remove
            Err(_) => return Ok(()),
        };

        let divested = {
            let _directory_rank = locks::enter(LockRank::Directory);
            let directory = self.directory.write()?;
            let handles = directory.handles_of_class(class);

            for handle in &handles {
                let shared = directory.get(*handle)?;
                let _instance_rank = locks::enter(LockRank::Instance);
                let instance = shared.read()?;
                instance.ownership().check_acquisition_pending()?;
            }

            let mut divested = Vec::new();
            for handle in &handles {
                let shared = directory.get(*handle)?;
                let _instance_rank = locks::enter(LockRank::Instance);
                let mut instance = shared.write()?;
                if instance.ownership().owns_any(&published) {
                    instance.ownership_mut().divest_unchecked(&published);
                    divested.push(*handle);
                }
            }
            divested
        };

        publication.remove_object_class(class);
        self.link.send(Message::UnpublishObjectClass {
            class,
            divested_instances: divested,
        })
    }

    /// Unpublishes an attribute subset of an object class, with the same
    /// validate-all-then-mutate-all discipline as [`Self::unpublish_object_class`].
    pub fn unpublish_object_class_attributes(
        &self,
        class: ObjectClassHandle,
        attributes: &AttributeHandleSet,
    ) -> FederateResult<()> {
        let _publication_rank = locks::enter(LockRank::Publication);
        let mut publication = self.publication.write()?;
        if !publication.object_class_published(class) {
            return Ok(());
        }

        let divested = {
            let _directory_rank = locks::enter(LockRank::Directory);
            let directory = self.directory.write()?;
            let handles = directory.handles_of_class(class);

            for handle in &handles {
                let shared = directory.get(*handle)?;
                let _instance_rank = locks::enter(LockRank::Instance);
                let instance = shared.read()?;
                instance
                    .ownership()
                    .check_acquisition_pending_among(attributes)?;
            }

            let mut divested = Vec::new();
            for handle in &handles {
                let shared = directory.get(*handle)?;
                let _instance_rank = locks::enter(LockRank::Instance);
                let mut instance = shared.write()?;
                if instance.ownership().owns_any(attributes) {
                    instance.ownership_mut().divest_unchecked(attributes);
                    divested.push(*handle);
                }
            }
            divested
        };

        publication.remove_object_class_attributes(class, attributes);
        self.link.send(Message::UnpublishObjectClassAttributes {
            class,
            divested_instances: divested,
            attributes: sorted(attributes),
        })
    }

    pub fn publish_interaction_class(&self, class: InteractionClassHandle) -> FederateResult<()> {
        let _publication_rank = locks::enter(LockRank::Publication);
        let mut publication = self.publication.write()?;
        publication.publish_interaction_class(class);
        self.link.send(Message::PublishInteractionClass { class })
    }

    pub fn unpublish_interaction_class(&self, class: InteractionClassHandle) -> FederateResult<()> {
        let _publication_rank = locks::enter(LockRank::Publication);
        let mut publication = self.publication.write()?;
        publication.unpublish_interaction_class(class);
        self.link.send(Message::UnpublishInteractionClass { class })
    }

    pub fn send_interaction(
        &self,
        class: InteractionClassHandle,
        parameters: &ParameterValueMap,
        tag: &[u8],
    ) -> FederateResult<()> {
        let _publication_rank = locks::enter(LockRank::Publication);
        let publication = self.publication.read()?;
        publication.check_interaction_published(class)?;
        self.link.send(Message::SendInteraction {
            class,
            parameters: parameters.clone(),
            tag: tag.to_vec(),
        })
    }

    // --- subscription ---

    pub fn subscribe_object_class_attributes(
        &self,
        class: ObjectClassHandle,
        attributes: &AttributeHandleSet,
    ) -> FederateResult<()> {
        fom::check_class_defined(&*self.fom, class)?;
        let _subscription_rank = locks::enter(LockRank::Subscription);
        let mut subscription = self.subscription.write()?;
        subscription.subscribe_object_class_attributes(class, attributes);
        self.link.send(Message::SubscribeObjectClassAttributes {
            class,
            attributes: sorted(attributes),
        })
    }

    pub fn unsubscribe_object_class(&self, class: ObjectClassHandle) -> FederateResult<()> {
        let _subscription_rank = locks::enter(LockRank::Subscription);
        let mut subscription = self.subscription.write()?;
        subscription.unsubscribe_object_class(class);
        self.link.send(Message::UnsubscribeObjectClass { class })
    }

    pub fn subscribe_interaction_class(&self, class: InteractionClassHandle) -> FederateResult<()> {
        let _subscription_rank = locks::enter(LockRank::Subscription);
        let mut subscription = self.subscription.write()?;
        subscription.subscribe_interaction_class(class);
        self.link.send(Message::SubscribeInteractionClass { class })
    }

    pub fn unsubscribe_interaction_class(
        &self,
        class: InteractionClassHandle,
    ) -> FederateResult<()> {
        let _subscription_rank = locks::enter(LockRank::Subscription);
        let mut subscription = self.subscription.write()?;
        subscription.unsubscribe_interaction_class(class);
        self.link.send(Message::UnsubscribeInteractionClass { class })
    }

    // --- name reservation ---

    pub fn reserve_name(&self, name: &str) -> FederateResult<()> {
        {
            let _reservation_rank = locks::enter(LockRank::Reservation);
            let mut reservation = self.reservation.lock()?;
            reservation.begin_reserve(name)?;
        }
        self.link.send(Message::ReserveName {
            name: name.to_string(),
        })
    }

    pub fn reserve_names(&self, names: &[String]) -> FederateResult<()> {
        {
            let _reservation_rank = locks::enter(LockRank::Reservation);
            let mut reservation = self.reservation.lock()?;
            reservation.begin_reserve_many(names)?;
        }
        self.link.send(Message::ReserveNames {
            names: names.to_vec(),
        })
    }

    pub fn release_name(&self, name: &str) -> FederateResult<()> {
        {
            let _reservation_rank = locks::enter(LockRank::Reservation);
            let mut reservation = self.reservation.lock()?;
            reservation.release(name)?;
        }
        self.link.send(Message::ReleaseName {
            name: name.to_string(),
        })
    }

    pub fn release_names(&self, names: &[String]) -> FederateResult<()> {
        {
            let _reservation_rank = locks::enter(LockRank::Reservation);
            let mut reservation = self.reservation.lock()?;
            reservation.release_many(names)?;
        }
        self.link.send(Message::ReleaseNames {
            names: names.to_vec(),
        })
    }

    /// Applies the coordinator's reservation verdict. The local state is
    /// consistent before the application hears about it.
    pub fn on_reservation_outcome(&self, name: &str, succeeded: bool) -> FederateResult<()> {
        {
            let _reservation_rank = locks::enter(LockRank::Reservation);
            let mut reservation = self.reservation.lock()?;
            reservation.complete(name, succeeded);
        }
        if succeeded {
            callbacks::dispatch(
                "name_reservation_succeeded",
                self.callbacks.name_reservation_succeeded(name),
            );
        } else {
            callbacks::dispatch(
                "name_reservation_failed",
                self.callbacks.name_reservation_failed(name),
            );
        }
        Ok(())
    }

    // --- registration / discovery / deletion ---

    /// Registers a new instance under a generated name. The handle comes
    /// from this federate's own space, so no round trip is needed.
    pub fn register_instance(
        &self,
        class: ObjectClassHandle,
    ) -> FederateResult<ObjectInstanceHandle> {
        fom::check_class_defined(&*self.fom, class)?;

        let _publication_rank = locks::enter(LockRank::Publication);
        let publication = self.publication.read()?;
        let published = publication.published_attributes(class)?.clone();

        let _directory_rank = locks::enter(LockRank::Directory);
        let mut directory = self.directory.write()?;
        let handle = directory.allocate_handle(self.federate);
        let name = format!(
            "{}-{}.{}",
            self.config.generated_name_prefix,
            self.federate.0,
            handle.serial()
        );
        self.insert_registered(&mut directory, handle, name, class, &published)
    }

    /// Registers a new instance under a previously reserved name.
    pub fn register_instance_with_name(
        &self,
        class: ObjectClassHandle,
        name: &str,
    ) -> FederateResult<ObjectInstanceHandle> {
        fom::check_class_defined(&*self.fom, class)?;

        let _publication_rank = locks::enter(LockRank::Publication);
        let publication = self.publication.read()?;
        let published = publication.published_attributes(class)?.clone();

        let _directory_rank = locks::enter(LockRank::Directory);
        let mut directory = self.directory.write()?;
        {
            let _reservation_rank = locks::enter(LockRank::Reservation);
            let reservation = self.reservation.lock()?;
            reservation.check_reserved(name)?;
        }
        if directory.contains_name(name) {
            return Err(FederateError::NameInUse(name.to_string()));
        }

        let handle = directory.allocate_handle(self.federate);
        self.insert_registered(&mut directory, handle, name.to_string(), class, &published)
    }

    fn insert_registered(
        &self,
        directory: &mut Directory,
        handle: ObjectInstanceHandle,
        name: String,
        class: ObjectClassHandle,
        published: &AttributeHandleSet,
    ) -> FederateResult<ObjectInstanceHandle> {
        let mut owned = published.clone();
        owned.insert(self.fom.delete_privilege());

        directory.insert(ObjectInstance::registered(
            handle,
            name.clone(),
            class,
            self.federate,
            owned.iter().copied(),
        ));
        self.link.send(Message::RegisterInstance {
            instance: handle,
            class,
            name,
            attributes: sorted(published),
        })?;
        Ok(handle)
    }

    /// Applies a remote discovery. A discovery for a class this federate is
    /// no longer subscribed to is an expected race, dropped with a trace.
    pub fn on_discover_instance(
        &self,
        handle: ObjectInstanceHandle,
        class: ObjectClassHandle,
        name: &str,
        producer: FederateHandle,
    ) -> FederateResult<()> {
        let known_class = {
            let _subscription_rank = locks::enter(LockRank::Subscription);
            let subscription = self.subscription.read()?;
            match subscription.subscribed_object_class(class) {
                Some(known_class) => known_class,
                None => {
                    log::trace!(
                        "dropping discover, no longer subscribed: {} {}",
                        handle,
                        class
                    );
                    return Ok(());
                }
            }
        };

        {
            let _directory_rank = locks::enter(LockRank::Directory);
            let mut directory = self.directory.write()?;
            if directory.was_removed(handle) {
                log::trace!("dropping discover, instance already removed: {}", handle);
                return Ok(());
            }
            directory.insert(ObjectInstance::discovered(
                handle,
                name.to_string(),
                known_class,
                producer,
            ));
        }

        callbacks::dispatch(
            "discover_instance",
            self.callbacks
                .discover_instance(handle, known_class, name, producer),
        );
        Ok(())
    }

    /// Applies an inbound attribute update. Updates for removed instances or
    /// unsubscribed classes are dropped with a trace.
    pub fn on_reflect_attributes(
        &self,
        handle: ObjectInstanceHandle,
        values: &AttributeValueMap,
        tag: &[u8],
    ) -> FederateResult<()> {
        let still_wanted = {
            let _subscription_rank = locks::enter(LockRank::Subscription);
            let subscription = self.subscription.read()?;
            let _directory_rank = locks::enter(LockRank::Directory);
            let directory = self.directory.read()?;
            match directory.get(handle) {
                Err(_) => {
                    log::trace!("dropping reflect, instance no longer known: {}", handle);
                    false
                }
                Ok(shared) => {
                    let _instance_rank = locks::enter(LockRank::Instance);
                    let instance = shared.read()?;
                    if subscription.subscribed_object_class(instance.class()).is_none() {
                        log::trace!("dropping reflect, no longer subscribed: {}", handle);
                        false
                    } else {
                        true
                    }
                }
            }
        };

        if still_wanted {
            callbacks::dispatch(
                "reflect_attributes",
                self.callbacks.reflect_attributes(handle, values, tag),
            );
        }
        Ok(())
    }

    /// Deletes an instance this federate holds the delete privilege for and
    /// tells the coordinator. The instance's name is retired.
    pub fn delete_instance(&self, handle: ObjectInstanceHandle, tag: &[u8]) -> FederateResult<()> {
        self.delete_instance_ordered(handle, tag, SendOrder::Receive)
    }

    /// Time-stamped delete. Only a receive-order send removes the instance
    /// locally right away; a timestamp-order delete is removed when the
    /// coordinator's remove notification arrives.
    pub fn delete_instance_ordered(
        &self,
        handle: ObjectInstanceHandle,
        tag: &[u8],
        order: SendOrder,
    ) -> FederateResult<()> {
        let _directory_rank = locks::enter(LockRank::Directory);
        let mut directory = self.directory.write()?;
        let shared = directory.get(handle)?;
        {
            let _instance_rank = locks::enter(LockRank::Instance);
            let instance = shared.read()?;
            instance.check_delete_privilege(self.fom.delete_privilege())?;
        }

        if order == SendOrder::Receive {
            if let Some((_, name)) = directory.remove(handle) {
                let _reservation_rank = locks::enter(LockRank::Reservation);
                self.reservation.lock()?.retire(&name);
            }
        }

        self.link.send(Message::DeleteInstance {
            instance: handle,
            tag: tag.to_vec(),
            order,
        })
    }

    /// Forgets an instance locally without deleting it federation-wide.
    /// Used when resigning without a full delete; everything must already be
    /// divested.
    pub fn local_delete_instance(&self, handle: ObjectInstanceHandle) -> FederateResult<()> {
        let _directory_rank = locks::enter(LockRank::Directory);
        let mut directory = self.directory.write()?;
        let shared = directory.get(handle)?;
        {
            let _instance_rank = locks::enter(LockRank::Instance);
            let instance = shared.read()?;
            instance.ownership().check_acquisition_pending()?;
            instance.ownership().check_owns_none()?;
        }
        directory.remove_local(handle);
        Ok(())
    }

    /// Applies a coordinator-originated removal. Unknown handles were
    /// already removed locally; that is a race, not an error.
    pub fn on_remove_instance(&self, handle: ObjectInstanceHandle, tag: &[u8]) -> FederateResult<()> {
        let name = {
            let _directory_rank = locks::enter(LockRank::Directory);
            let mut directory = self.directory.write()?;
            match directory.remove(handle) {
                None => {
                    log::trace!("dropping remove, instance no longer known: {}", handle);
                    return Ok(());
                }
                Some((_, name)) => name,
            }
        };
        {
            let _reservation_rank = locks::enter(LockRank::Reservation);
            self.reservation.lock()?.retire(&name);
        }
        callbacks::dispatch("remove_instance", self.callbacks.remove_instance(handle, tag));
        Ok(())
    }

    // --- lookups ---

    pub fn instance_handle(&self, name: &str) -> FederateResult<ObjectInstanceHandle> {
        let _directory_rank = locks::enter(LockRank::Directory);
        let directory = self.directory.read()?;
        let shared = directory.get_by_name(name)?;
        let _instance_rank = locks::enter(LockRank::Instance);
        let instance = shared.read()?;
        Ok(instance.handle())
    }

    pub fn instance_name(&self, handle: ObjectInstanceHandle) -> FederateResult<String> {
        let _directory_rank = locks::enter(LockRank::Directory);
        let directory = self.directory.read()?;
        let shared = directory.get(handle)?;
        let _instance_rank = locks::enter(LockRank::Instance);
        let instance = shared.read()?;
        Ok(instance.name().to_string())
    }

    pub fn instance_class(&self, handle: ObjectInstanceHandle) -> FederateResult<ObjectClassHandle> {
        let _directory_rank = locks::enter(LockRank::Directory);
        let directory = self.directory.read()?;
        let shared = directory.get(handle)?;
        let _instance_rank = locks::enter(LockRank::Instance);
        let instance = shared.read()?;
        Ok(instance.class())
    }

    // --- attribute updates ---

    /// Sends new values for attributes this federate owns.
    pub fn update_attributes(
        &self,
        handle: ObjectInstanceHandle,
        values: &AttributeValueMap,
        tag: &[u8],
    ) -> FederateResult<()> {
        let _directory_rank = locks::enter(LockRank::Directory);
        let directory = self.directory.read()?;
        let shared = directory.get(handle)?;
        let _instance_rank = locks::enter(LockRank::Instance);
        let instance = shared.read()?;
        for attribute in values.keys() {
            if !instance.ownership().owns(*attribute) {
                fom::check_attribute_defined(&*self.fom, instance.class(), *attribute)?;
                return Err(FederateError::AttributeNotOwned {
                    instance: handle,
                    attribute: *attribute,
                });
            }
        }
        self.link.send(Message::UpdateAttributes {
            instance: handle,
            values: values.clone(),
            tag: tag.to_vec(),
        })
    }

    /// Asks the owners of the named attributes for fresh values. Locally
    /// owned attributes are filtered out.
    pub fn request_attribute_update(
        &self,
        handle: ObjectInstanceHandle,
        attributes: &AttributeHandleSet,
        tag: &[u8],
    ) -> FederateResult<()> {
        let _directory_rank = locks::enter(LockRank::Directory);
        let directory = self.directory.read()?;
        let shared = directory.get(handle)?;
        let _instance_rank = locks::enter(LockRank::Instance);
        let instance = shared.read()?;
        for attribute in attributes {
            fom::check_attribute_defined(&*self.fom, instance.class(), *attribute)?;
        }
        let mut unowned: Vec<AttributeHandle> = attributes
            .iter()
            .copied()
            .filter(|attribute| !instance.ownership().owns(*attribute))
            .collect();
        unowned.sort();
        self.link.send(Message::RequestAttributeUpdate {
            instance: handle,
            attributes: unowned,
            tag: tag.to_vec(),
        })
    }

    // --- ownership transfer ---

    pub fn unconditional_divestiture(
        &self,
        handle: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> FederateResult<()> {
        self.with_instance_write(handle, |manager, instance| {
            instance.ownership_mut().divest_unconditional(attributes)?;
            manager.link.send(Message::UnconditionalDivest {
                instance: handle,
                attributes: attributes.to_vec(),
            })
        })
    }

    pub fn negotiated_divestiture(
        &self,
        handle: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        tag: &[u8],
    ) -> FederateResult<()> {
        self.with_instance_write(handle, |manager, instance| {
            instance
                .ownership_mut()
                .begin_negotiated_divestiture(attributes)?;
            manager.link.send(Message::NegotiatedDivest {
                instance: handle,
                attributes: attributes.to_vec(),
                tag: tag.to_vec(),
            })
        })
    }

    pub fn confirm_divestiture(
        &self,
        handle: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        tag: &[u8],
    ) -> FederateResult<()> {
        self.with_instance_write(handle, |manager, instance| {
            instance.ownership_mut().confirm_divestiture(attributes)?;
            manager.link.send(Message::ConfirmDivest {
                instance: handle,
                attributes: attributes.to_vec(),
                tag: tag.to_vec(),
            })
        })
    }

    pub fn cancel_negotiated_divestiture(
        &self,
        handle: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> FederateResult<()> {
        self.with_instance_write(handle, |manager, instance| {
            instance
                .ownership_mut()
                .cancel_negotiated_divestiture(attributes)?;
            manager.link.send(Message::CancelDivest {
                instance: handle,
                attributes: attributes.to_vec(),
            })
        })
    }

    /// Requests unconditional acquisition of unowned attributes this
    /// federate publishes.
    pub fn acquire(
        &self,
        handle: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        tag: &[u8],
    ) -> FederateResult<()> {
        let _publication_rank = locks::enter(LockRank::Publication);
        let publication = self.publication.read()?;
        let _directory_rank = locks::enter(LockRank::Directory);
        let directory = self.directory.read()?;
        let shared = directory.get(handle)?;
        let _instance_rank = locks::enter(LockRank::Instance);
        let mut instance = shared.write()?;

        for attribute in attributes {
            fom::check_attribute_defined(&*self.fom, instance.class(), *attribute)?;
        }
        publication.check_attributes_published(instance.class(), attributes)?;

        instance.ownership_mut().begin_acquisition(attributes)?;
        self.link.send(Message::Acquire {
            instance: handle,
            attributes: attributes.to_vec(),
            tag: tag.to_vec(),
        })
    }

    /// Conditional acquisition: take ownership only if nobody owns it.
    pub fn acquire_if_available(
        &self,
        handle: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> FederateResult<()> {
        let _publication_rank = locks::enter(LockRank::Publication);
        let publication = self.publication.read()?;
        let _directory_rank = locks::enter(LockRank::Directory);
        let directory = self.directory.read()?;
        let shared = directory.get(handle)?;
        let _instance_rank = locks::enter(LockRank::Instance);
        let mut instance = shared.write()?;

        for attribute in attributes {
            fom::check_attribute_defined(&*self.fom, instance.class(), *attribute)?;
        }
        publication.check_attributes_published(instance.class(), attributes)?;

        instance
            .ownership_mut()
            .begin_acquisition_if_available(attributes)?;
        self.link.send(Message::AcquireIfAvailable {
            instance: handle,
            attributes: attributes.to_vec(),
        })
    }

    pub fn cancel_acquisition(
        &self,
        handle: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> FederateResult<()> {
        self.with_instance_write(handle, |manager, instance| {
            instance.ownership_mut().cancel_acquisition(attributes)?;
            manager.link.send(Message::CancelAcquire {
                instance: handle,
                attributes: attributes.to_vec(),
            })
        })
    }

    /// A peer wants attributes this federate owns; asks the coordinator
    /// which subset to hand over and commits exactly that subset.
    ///
    /// This is the one blocking round trip in the runtime: validate under
    /// the locks, release them, await the correlated response with a
    /// timeout, then re-acquire to commit. On timeout the local state is
    /// deliberately left alone — the request may still be in flight.
    pub fn release_if_wanted(
        &self,
        handle: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> FederateResult<Vec<AttributeHandle>> {
        {
            let _directory_rank = locks::enter(LockRank::Directory);
            let directory = self.directory.read()?;
            let shared = directory.get(handle)?;
            let _instance_rank = locks::enter(LockRank::Instance);
            let instance = shared.read()?;
            instance.ownership().check_all_owned(attributes)?;
        }

        let (correlation, receiver) = self.pending.begin()?;
        self.link.send(Message::ReleaseIfWanted {
            correlation,
            instance: handle,
            attributes: attributes.to_vec(),
        })?;
        let response = self.pending.await_response(
            correlation,
            &receiver,
            self.config.request_timeout,
            "release_if_wanted",
        )?;
        let Response::ReleaseIfWanted {
            attributes: confirmed,
        } = response;

        let _directory_rank = locks::enter(LockRank::Directory);
        let directory = self.directory.read()?;
        let shared = match directory.get(handle) {
            Ok(shared) => shared,
            Err(_) => {
                log::trace!("instance removed during release-if-wanted: {}", handle);
                return Ok(Vec::new());
            }
        };
        let _instance_rank = locks::enter(LockRank::Instance);
        let mut instance = shared.write()?;
        let released = instance.ownership_mut().commit_release(&confirmed);
        if released.len() != confirmed.len() {
            log::trace!(
                "release-if-wanted on {}: {} of {} confirmed attributes were no longer owned",
                handle,
                confirmed.len() - released.len(),
                confirmed.len()
            );
        }
        Ok(released)
    }

    /// Resolves a release-if-wanted round trip; called from the network
    /// thread when the coordinator answers.
    pub fn on_release_response(
        &self,
        correlation: CorrelationId,
        attributes: Vec<AttributeHandle>,
    ) -> FederateResult<()> {
        self.pending
            .resolve(correlation, Response::ReleaseIfWanted { attributes })
            .map(|_| ())
    }

    /// Asks the coordinator who owns an attribute. The answer comes back
    /// through [`Self::on_ownership_report`].
    pub fn query_ownership(
        &self,
        handle: ObjectInstanceHandle,
        attribute: AttributeHandle,
    ) -> FederateResult<()> {
        {
            let _directory_rank = locks::enter(LockRank::Directory);
            let directory = self.directory.read()?;
            let shared = directory.get(handle)?;
            let _instance_rank = locks::enter(LockRank::Instance);
            let instance = shared.read()?;
            fom::check_attribute_defined(&*self.fom, instance.class(), attribute)?;
        }
        self.link.send(Message::QueryOwnership {
            instance: handle,
            attribute,
        })
    }

    /// Local ownership test, no round trip.
    pub fn is_attribute_owned(
        &self,
        handle: ObjectInstanceHandle,
        attribute: AttributeHandle,
    ) -> FederateResult<bool> {
        let _directory_rank = locks::enter(LockRank::Directory);
        let directory = self.directory.read()?;
        let shared = directory.get(handle)?;
        let _instance_rank = locks::enter(LockRank::Instance);
        let instance = shared.read()?;
        if instance.ownership().owns(attribute) {
            Ok(true)
        } else {
            fom::check_attribute_defined(&*self.fom, instance.class(), attribute)?;
            Ok(false)
        }
    }

    // --- remote ownership events ---

    /// The coordinator granted an acquisition. Idempotent for attributes
    /// already owned; a grant for an unknown instance is dropped.
    pub fn on_acquisition_notification(
        &self,
        handle: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        tag: &[u8],
    ) -> FederateResult<()> {
        {
            let _directory_rank = locks::enter(LockRank::Directory);
            let directory = self.directory.read()?;
            let shared = match directory.get(handle) {
                Ok(shared) => shared,
                Err(_) => {
                    log::trace!("dropping acquisition grant, instance unknown: {}", handle);
                    return Ok(());
                }
            };
            let _instance_rank = locks::enter(LockRank::Instance);
            let mut instance = shared.write()?;
            instance.ownership_mut().grant(attributes);
        }
        callbacks::dispatch(
            "acquisition_notification",
            self.callbacks
                .acquisition_notification(handle, attributes, tag),
        );
        Ok(())
    }

    /// A peer asked for attributes this federate owns. The application
    /// decides what to release.
    pub fn on_release_requested(
        &self,
        handle: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        tag: &[u8],
    ) -> FederateResult<()> {
        let known = {
            let _directory_rank = locks::enter(LockRank::Directory);
            let directory = self.directory.read()?;
            directory.contains(handle)
        };
        if known {
            callbacks::dispatch(
                "release_requested",
                self.callbacks.release_requested(handle, attributes, tag),
            );
        } else {
            log::trace!("dropping release request, instance unknown: {}", handle);
        }
        Ok(())
    }

    /// The coordinator asks whether an outstanding negotiated divestiture
    /// should go through. The application answers with
    /// [`Self::confirm_divestiture`] or [`Self::cancel_negotiated_divestiture`].
    pub fn on_divestiture_requested(
        &self,
        handle: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> FederateResult<()> {
        callbacks::dispatch(
            "divestiture_notification",
            self.callbacks.divestiture_notification(handle, attributes),
        );
        Ok(())
    }

    /// Answer to an earlier ownership query.
    pub fn on_ownership_report(
        &self,
        handle: ObjectInstanceHandle,
        attribute: AttributeHandle,
        owner: AttributeOwner,
    ) -> FederateResult<()> {
        callbacks::dispatch(
            "ownership_report",
            self.callbacks.ownership_report(handle, attribute, owner),
        );
        Ok(())
    }

    // --- resignation ---

    /// Validates that this federate may resign with `action`. Every known
    /// instance is checked before anything is torn down; the actual
    /// teardown (divestitures, deletes) is driven by the coordinator once
    /// the resign message is accepted.
    pub fn resign(&self, action: ResignAction) -> FederateResult<()> {
        let delete_privilege = self.fom.delete_privilege();
        {
            let _directory_rank = locks::enter(LockRank::Directory);
            let directory = self.directory.write()?;
            for shared in directory.entries() {
                let _instance_rank = locks::enter(LockRank::Instance);
                let instance = shared.read()?;
                let ownership = instance.ownership();
                match action {
                    ResignAction::UnconditionallyDivestAttributes => {
                        ownership.check_acquisition_pending()?;
                    }
                    ResignAction::DeleteObjects => {
                        ownership.check_owns_none_besides(delete_privilege)?;
                        ownership.check_acquisition_pending()?;
                    }
                    ResignAction::CancelPendingOwnershipAcquisitions => {
                        ownership.check_owns_none()?;
                    }
                    ResignAction::DeleteObjectsThenDivest
                    | ResignAction::CancelThenDeleteThenDivest => {
                        ownership.check_acquisition_pending()?;
                    }
                    ResignAction::NoAction => {
                        ownership.check_owns_none()?;
                    }
                }
            }
        }
        self.link.send(Message::Resigned {
            federate: self.federate,
        })
    }

    // --- helpers ---

    fn with_instance_write<R>(
        &self,
        handle: ObjectInstanceHandle,
        operation: impl FnOnce(&Self, &mut ObjectInstance) -> FederateResult<R>,
    ) -> FederateResult<R> {
        let _directory_rank = locks::enter(LockRank::Directory);
        let directory = self.directory.read()?;
        let shared = directory.get(handle)?;
        let _instance_rank = locks::enter(LockRank::Instance);
        let mut instance = shared.write()?;
        operation(self, &mut instance)
    }
}
