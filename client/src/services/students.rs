//! Audited destructive actions on students and supplements.

use shared::{
    fold_digits, HistoryAction, NewHistoryEntry, Student, Supplement, STUDENTS_KEY, SUPPLEMENTS_KEY,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::ApiError;
use crate::services::history::HistoryRecorder;
use crate::services::notifications::RefreshBus;
use crate::services::traits::StudentDirectory;
use crate::validation::PhoneCheckCache;

#[derive(Clone)]
pub struct StudentActions {
    directory: Arc<dyn StudentDirectory>,
    recorder: HistoryRecorder,
    refresh: RefreshBus,
    phone_checks: Arc<PhoneCheckCache>,
}

impl StudentActions {
    pub fn new(
        directory: Arc<dyn StudentDirectory>,
        recorder: HistoryRecorder,
        refresh: RefreshBus,
        phone_checks: Arc<PhoneCheckCache>,
    ) -> Self {
        Self {
            directory,
            recorder,
            refresh,
            phone_checks,
        }
    }

    /// Record the student's pre-delete attributes, then delete it remotely.
    /// The delete is issued even if the history entry could not be written.
    pub async fn delete_student(&self, student: &Student) -> Result<(), ApiError> {
        let entry = NewHistoryEntry::new(
            HistoryAction::Delete,
            Some(student.id),
            student.name.clone(),
            format!("phone: {}", student.phone),
            format!("Student {} ({}) was deleted", student.name, student.phone),
        );

        let result = self
            .recorder
            .record_then(&entry, || self.directory.delete_student(student.id))
            .await;

        match result {
            Ok(()) => {
                info!("Deleted student {} '{}'", student.id, student.name);
                // The number is free again
                self.phone_checks.invalidate(&fold_digits(&student.phone));
                self.refresh.invalidate(STUDENTS_KEY);
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete student {} '{}': {}", student.id, student.name, e);
                Err(e)
            }
        }
    }

    pub async fn delete_supplement(&self, supplement: &Supplement) -> Result<(), ApiError> {
        let entry = NewHistoryEntry::new(
            HistoryAction::Delete,
            None,
            supplement.name.clone(),
            supplement.dosage.clone().unwrap_or_default(),
            format!("Supplement {} was deleted", supplement.name),
        );

        let result = self
            .recorder
            .record_then(&entry, || self.directory.delete_supplement(supplement.id))
            .await;

        match result {
            Ok(()) => {
                info!("Deleted supplement {} '{}'", supplement.id, supplement.name);
                self.refresh.invalidate(SUPPLEMENTS_KEY);
                Ok(())
            }
            Err(e) => {
                error!("Failed to delete supplement {} '{}': {}", supplement.id, supplement.name, e);
                Err(e)
            }
        }
    }
}
