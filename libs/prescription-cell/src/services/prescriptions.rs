use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use appointment_cell::services::{AccessGuard, SchedulingLocks};
use audit_cell::models::{actions, AuditEvent};
use audit_cell::services::AuditSink;
use shared_database::{PrescriptionRepository, Repositories};
use shared_models::consultation::{Prescription, PrescriptionItem, PrescriptionRecord};
use shared_models::error::ServiceError;
use shared_models::scheduling::{Appointment, AppointmentStatus};
use shared_utils::clock::Clock;

use crate::codec::PrescriptionItemsCodec;
use crate::models::{CreatePrescriptionRequest, UpdatePrescriptionRequest};

/// Prescriptions written by an appointment's doctor and readable by both
/// participants.
///
/// Writes hold the appointment's lock across "authorize, status check,
/// write" so they serialize with status transitions on the same appointment.
pub struct PrescriptionService {
    prescriptions: Arc<dyn PrescriptionRepository>,
    guard: AccessGuard,
    locks: Arc<SchedulingLocks>,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
}

impl PrescriptionService {
    pub fn new(
        repos: &Repositories,
        locks: Arc<SchedulingLocks>,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            prescriptions: repos.prescriptions.clone(),
            guard: AccessGuard::new(repos.appointments.clone()),
            locks,
            audit,
            clock,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        appointment_id: Uuid,
        actor_id: Uuid,
        request: CreatePrescriptionRequest,
    ) -> Result<Prescription, ServiceError> {
        let _guard = self.locks.appointment(appointment_id).await;
        let appointment = self.guard.authorize_doctor(appointment_id, actor_id).await?;
        ensure_not_cancelled(&appointment)?;
        validate_items(&request.items)?;

        let now = self.clock.now();
        let record = self
            .prescriptions
            .insert(PrescriptionRecord {
                id: Uuid::new_v4(),
                appointment_id,
                items_document: PrescriptionItemsCodec::encode(&request.items)?,
                notes: request.notes,
                created_by_doctor_id: actor_id,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!("Prescription {} issued for appointment {}", record.id, appointment_id);
        self.audit.record(
            AuditEvent::new(actions::PRESCRIPTION_CREATE, "prescription", record.id)
                .by(actor_id)
                .with("appointment_id", appointment_id.to_string())
                .with("item_count", request.items.len()),
        );

        into_prescription(record)
    }

    pub async fn get(&self, prescription_id: Uuid, actor_id: Uuid) -> Result<Prescription, ServiceError> {
        let record = self.find(prescription_id).await?;
        self.guard.authorize(record.appointment_id, actor_id).await?;
        into_prescription(record)
    }

    /// Oldest first.
    pub async fn list_for_appointment(
        &self,
        appointment_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Vec<Prescription>, ServiceError> {
        self.guard.authorize(appointment_id, actor_id).await?;

        self.prescriptions
            .list_by_appointment(appointment_id)
            .await?
            .into_iter()
            .map(into_prescription)
            .collect()
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        prescription_id: Uuid,
        actor_id: Uuid,
        request: UpdatePrescriptionRequest,
    ) -> Result<Prescription, ServiceError> {
        let appointment_id = self.find(prescription_id).await?.appointment_id;
        let _guard = self.locks.appointment(appointment_id).await;

        let mut record = self.find(prescription_id).await?;
        let appointment = self.guard.authorize_doctor(record.appointment_id, actor_id).await?;
        ensure_not_cancelled(&appointment)?;

        if let Some(items) = &request.items {
            validate_items(items)?;
            record.items_document = PrescriptionItemsCodec::encode(items)?;
        }
        if let Some(notes) = request.notes {
            record.notes = notes;
        }
        record.updated_at = self.clock.now();

        let record = self.prescriptions.update(record).await?;

        self.audit.record(
            AuditEvent::new(actions::PRESCRIPTION_UPDATE, "prescription", record.id)
                .by(actor_id)
                .with("items_replaced", request.items.is_some()),
        );

        into_prescription(record)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, prescription_id: Uuid, actor_id: Uuid) -> Result<(), ServiceError> {
        let appointment_id = self.find(prescription_id).await?.appointment_id;
        let _guard = self.locks.appointment(appointment_id).await;

        let record = self.find(prescription_id).await?;
        self.guard.authorize_doctor(record.appointment_id, actor_id).await?;

        if !self.prescriptions.delete(prescription_id).await? {
            return Err(ServiceError::not_found("prescription"));
        }

        info!("Prescription {} deleted", prescription_id);
        self.audit.record(
            AuditEvent::new(actions::PRESCRIPTION_DELETE, "prescription", prescription_id)
                .by(actor_id)
                .with("appointment_id", record.appointment_id.to_string()),
        );

        Ok(())
    }

    async fn find(&self, prescription_id: Uuid) -> Result<PrescriptionRecord, ServiceError> {
        self.prescriptions
            .find_by_id(prescription_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("prescription"))
    }
}

fn ensure_not_cancelled(appointment: &Appointment) -> Result<(), ServiceError> {
    if appointment.status == AppointmentStatus::Cancelled {
        return Err(ServiceError::conflict("appointment has been cancelled"));
    }
    Ok(())
}

fn validate_items(items: &[PrescriptionItem]) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::validation("prescription must contain at least one item"));
    }

    for (index, item) in items.iter().enumerate() {
        let required = [
            ("medication_name", &item.medication_name),
            ("dosage", &item.dosage),
            ("frequency", &item.frequency),
            ("duration", &item.duration),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ServiceError::validation(format!("item {}: {} is required", index + 1, field)));
        }
    }

    Ok(())
}

fn into_prescription(record: PrescriptionRecord) -> Result<Prescription, ServiceError> {
    Ok(Prescription {
        items: PrescriptionItemsCodec::decode(&record.items_document)?,
        id: record.id,
        appointment_id: record.appointment_id,
        notes: record.notes,
        created_by_doctor_id: record.created_by_doctor_id,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}
