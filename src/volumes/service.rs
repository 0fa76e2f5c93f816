//! Spare Drive Service
//!
//! Keeps the list of spare drives and runs create, attach and delete as
//! tracked operations with optimistic list updates.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;
use uuid::Uuid;

use crate::error::VolumeError;
use crate::ops::{
    confirm_insert, confirm_removal, confirm_replace, remove_on_success, Operation,
    OperationCoordinator, OperationHandle, OperationMessages, TrackedCollection, TrackedEntry,
};
use crate::volumes::{SimulatedVolumeBackend, Volume, VolumeAttachment, VolumeCreation, VolumeRequest};

type SharedVolumes = Arc<Mutex<TrackedCollection<Volume>>>;

fn lock(volumes: &SharedVolumes) -> MutexGuard<'_, TrackedCollection<Volume>> {
    volumes.lock().unwrap_or_else(PoisonError::into_inner)
}

// == Spare Drive Service ==
#[derive(Clone)]
pub struct SpareDriveService {
    coordinator: OperationCoordinator,
    backend: Arc<SimulatedVolumeBackend>,
    volumes: SharedVolumes,
}

impl SpareDriveService {
    /// Loads the current spare drives from the backend.
    pub fn new(coordinator: OperationCoordinator, backend: Arc<SimulatedVolumeBackend>) -> Self {
        let volumes = TrackedCollection::from_confirmed(backend.spares());
        info!(count = volumes.len(), "Spare drives loaded");
        Self {
            coordinator,
            backend,
            volumes: Arc::new(Mutex::new(volumes)),
        }
    }

    pub fn coordinator(&self) -> &OperationCoordinator {
        &self.coordinator
    }

    /// Spare drives, including ones still waiting on an operation.
    pub fn list(&self) -> Vec<TrackedEntry<Volume>> {
        lock(&self.volumes).entries().to_vec()
    }

    pub fn get(&self, id: &str) -> Option<TrackedEntry<Volume>> {
        lock(&self.volumes).get(&id.to_string()).cloned()
    }

    // == Create ==
    /// Shows the new drive right away and replaces it with the backend's
    /// volume once the job succeeds; a failed job removes it again.
    pub fn create(&self, creation: VolumeCreation) -> Result<OperationHandle<Volume>, VolumeError> {
        if let Some(reason) = creation.validate() {
            return Err(VolumeError::Invalid(reason));
        }

        let operation_id = Uuid::now_v7().to_string();
        lock(&self.volumes).insert_provisional(
            Volume::from_creation(operation_id.clone(), &creation),
            operation_id.clone(),
        );

        let volumes = self.volumes.clone();
        let op = operation_id.clone();
        let started = self.coordinator.run(
            Operation::new(
                VolumeRequest::Create(creation),
                OperationMessages::keyed("VOLUME_CREATE"),
            )
            .with_id(operation_id.clone()),
            self.backend.clone(),
            self.backend.clone(),
            move |outcome| {
                lock(&volumes).apply(|c| confirm_insert(c, &op, outcome));
            },
        );

        started.map_err(|err| {
            let rollback = Err(err.clone());
            lock(&self.volumes).apply(|c| confirm_insert(c, &operation_id, &rollback));
            VolumeError::from(err)
        })
    }

    // == Attach ==
    /// Attaches a spare drive to a virtual machine. The drive stays listed
    /// until the backend confirms the attachment.
    pub fn attach(&self, attachment: VolumeAttachment) -> Result<OperationHandle<Volume>, VolumeError> {
        let volume_id = attachment.volume_id.clone();
        match lock(&self.volumes).get(&volume_id) {
            None => return Err(VolumeError::NotFound(volume_id)),
            Some(entry) if !entry.is_confirmed() => return Err(VolumeError::Busy(volume_id)),
            Some(_) => {}
        }

        let volumes = self.volumes.clone();
        let handle = self.coordinator.run(
            Operation::new(
                VolumeRequest::Attach(attachment),
                OperationMessages::keyed("VOLUME_ATTACH"),
            ),
            self.backend.clone(),
            self.backend.clone(),
            move |outcome| {
                lock(&volumes).apply(|c| remove_on_success(c, &volume_id, outcome));
            },
        )?;
        Ok(handle)
    }

    // == Remove ==
    /// Hides the drive while the delete runs and restores it on failure.
    pub fn remove(&self, id: &str) -> Result<OperationHandle<Volume>, VolumeError> {
        let operation_id = Uuid::now_v7().to_string();
        {
            let mut volumes = lock(&self.volumes);
            if !volumes.contains(&id.to_string()) {
                return Err(VolumeError::NotFound(id.to_string()));
            }
            if !volumes.mark_removing(&id.to_string(), operation_id.clone()) {
                return Err(VolumeError::Busy(id.to_string()));
            }
        }

        let volumes = self.volumes.clone();
        let op = operation_id.clone();
        let started = self.coordinator.run(
            Operation::new(
                VolumeRequest::Delete { id: id.to_string() },
                OperationMessages::keyed("VOLUME_DELETE"),
            )
            .with_id(operation_id.clone()),
            self.backend.clone(),
            self.backend.clone(),
            move |outcome| {
                lock(&volumes).apply(|c| confirm_removal(c, &op, outcome));
            },
        );

        started.map_err(|err| {
            let restore: crate::error::Result<()> = Err(err.clone());
            lock(&self.volumes).apply(|c| confirm_removal(c, &operation_id, &restore));
            VolumeError::from(err)
        })
    }

    // == Update ==
    /// Replaces a listed drive with a fresher copy. Unknown drives are ignored.
    pub fn update(&self, volume: Volume) -> bool {
        let mut volumes = lock(&self.volumes);
        if !volumes.contains(&volume.id) {
            return false;
        }
        volumes.apply(|c| confirm_replace(c, &Ok(volume)));
        true
    }
}
