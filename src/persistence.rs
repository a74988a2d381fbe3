//! Federation save/restore.
//!
//! The snapshot is one self-describing record per collection, written in a
//! fixed order so restore is driven purely by the encoded lengths: published
//! object classes, published interaction classes, the subscription matcher's
//! opaque state, reserved names, in-flight names, retired names, object
//! instance records, and finally the instance serial counter. Collections
//! are sorted before encoding so the same directory state always produces
//! the same bytes.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::directory::ObjectInstance;
use crate::error::{FederateError, FederateResult};
use crate::handle::{
    AttributeHandle, FederateHandle, InteractionClassHandle, ObjectClassHandle,
    ObjectInstanceHandle,
};
use crate::locks::{self, LockRank};
use crate::manager::ObjectManager;
use crate::ownership::{AttributeOwnershipRecord, OwnershipTracker};

const SNAPSHOT_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct InstanceRecord {
    handle: ObjectInstanceHandle,
    class: ObjectClassHandle,
    name: String,
    producer: FederateHandle,
    attributes: Vec<(AttributeHandle, AttributeOwnershipRecord)>,
}

fn encode<W: Write, T: Serialize>(writer: &mut W, value: &T) -> FederateResult<()> {
    bincode::serialize_into(writer, value)
        .map_err(|error| FederateError::SnapshotEncode(error.to_string()))
}

fn decode<R: Read, T: serde::de::DeserializeOwned>(reader: &mut R) -> FederateResult<T> {
    bincode::deserialize_from(reader)
        .map_err(|error| FederateError::SnapshotDecode(error.to_string()))
}

impl ObjectManager {
    /// Writes the directory state for a federation save. All four locks are
    /// held (in order) for the duration, so the snapshot is a consistent
    /// cut.
    pub fn save_state<W: Write>(&self, writer: &mut W) -> FederateResult<()> {
        let _publication_rank = locks::enter(LockRank::Publication);
        let publication = self.publication.read()?;
        let _subscription_rank = locks::enter(LockRank::Subscription);
        let subscription = self.subscription.read()?;
        let _directory_rank = locks::enter(LockRank::Directory);
        let directory = self.directory.read()?;

        writer
            .write_all(&[SNAPSHOT_VERSION])
            .map_err(|error| FederateError::SnapshotEncode(error.to_string()))?;

        encode(writer, &publication.object_class_entries())?;
        encode(writer, &publication.interaction_class_entries())?;
        encode(writer, &subscription.save_state())?;

        {
            let _reservation_rank = locks::enter(LockRank::Reservation);
            let reservation = self.reservation.lock()?;
            encode(writer, &reservation.reserved_entries())?;
            encode(writer, &reservation.being_reserved_entries())?;
            encode(writer, &reservation.retired_entries())?;
        }

        let mut records = Vec::with_capacity(directory.len());
        for shared in directory.entries() {
            let _instance_rank = locks::enter(LockRank::Instance);
            let instance = shared.read()?;
            records.push(InstanceRecord {
                handle: instance.handle(),
                class: instance.class(),
                name: instance.name().to_string(),
                producer: instance.producer(),
                attributes: instance.ownership().records(),
            });
        }
        encode(writer, &records)?;

        encode(writer, &directory.next_serial())
    }

    /// Rebuilds the directory from a snapshot produced by
    /// [`Self::save_state`]. All three indices are reconstructed and the
    /// serial counter resumes past every handle this federate had allocated.
    pub fn restore_state<R: Read>(&self, reader: &mut R) -> FederateResult<()> {
        let mut version = [0u8; 1];
        reader
            .read_exact(&mut version)
            .map_err(|error| FederateError::SnapshotDecode(error.to_string()))?;
        if version[0] != SNAPSHOT_VERSION {
            return Err(FederateError::SnapshotVersionMismatch {
                expected: SNAPSHOT_VERSION,
                found: version[0],
            });
        }

        let object_classes: Vec<(ObjectClassHandle, Vec<AttributeHandle>)> = decode(reader)?;
        let interaction_classes: Vec<InteractionClassHandle> = decode(reader)?;
        let matcher_state: Vec<u8> = decode(reader)?;
        let reserved: Vec<String> = decode(reader)?;
        let being_reserved: Vec<String> = decode(reader)?;
        let retired: Vec<String> = decode(reader)?;
        let records: Vec<InstanceRecord> = decode(reader)?;
        let serial: u64 = decode(reader)?;

        let _publication_rank = locks::enter(LockRank::Publication);
        let mut publication = self.publication.write()?;
        let _subscription_rank = locks::enter(LockRank::Subscription);
        let mut subscription = self.subscription.write()?;
        let _directory_rank = locks::enter(LockRank::Directory);
        let mut directory = self.directory.write()?;

        publication.clear();
        for (class, attributes) in object_classes {
            publication.publish_object_class(class, &attributes.into_iter().collect());
        }
        for class in interaction_classes {
            publication.publish_interaction_class(class);
        }

        subscription.restore_state(&matcher_state);

        {
            let _reservation_rank = locks::enter(LockRank::Reservation);
            let mut reservation = self.reservation.lock()?;
            reservation.restore(reserved, being_reserved, retired);
        }

        directory.clear();
        for record in records {
            let ownership = OwnershipTracker::from_records(record.handle, record.attributes);
            if record.handle.federate() == self.federate {
                directory.resume_serial(record.handle.serial());
            }
            directory.insert(ObjectInstance::restored(
                record.handle,
                record.name,
                record.class,
                record.producer,
                ownership,
            ));
        }
        directory.resume_serial(serial);
        Ok(())
    }
}
