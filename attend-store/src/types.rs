//! Enrollment and catalog types

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use attend_core::{
    ActivityId, ActivitySchedule, OwnerId, ParticipantCredentials, ParticipantId, ParticipantSecret,
    StoreError, StoreResult, DEFAULT_GRACE_PERIOD_MINUTES,
};

/// Enrolled participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: ParticipantId,
    /// Identifier printed in the QR payload (e.g. student number)
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub section: String,
    /// Owner whose roster the participant is on
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
    pub secret: ParticipantSecret,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// Build a participant with a freshly generated secret
    pub fn enroll(registration: ParticipantRegistration) -> StoreResult<Self> {
        registration.validate()?;
        Ok(Self {
            participant_id: ParticipantId::generate(),
            external_id: registration.external_id.trim().to_string(),
            first_name: registration.first_name,
            last_name: registration.last_name,
            email: registration.email.filter(|e| !e.trim().is_empty()),
            section: registration.section,
            owner_id: registration.owner_id.filter(|o| !o.as_str().trim().is_empty()),
            secret: ParticipantSecret::generate(),
            created_at: Utc::now(),
        })
    }

    pub fn is_on_roster_of(&self, owner_id: &OwnerId) -> bool {
        self.owner_id.as_ref() == Some(owner_id)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn credentials(&self) -> ParticipantCredentials {
        ParticipantCredentials {
            participant_id: self.participant_id.clone(),
            secret: self.secret.clone(),
        }
    }

    #[cfg(test)]
    fn test_participant_without_owner_field_deserializes() {
        let participant = Participant::enroll(ParticipantRegistration {
            external_id: "S-1".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: None,
            section: "A".to_string(),
            owner_id: Some(OwnerId::new("")),
        })
        .unwrap();
        assert_eq!(participant.owner_id, None);

        let mut value = serde_json::to_value(&participant).unwrap();
        value.as_object_mut().unwrap().remove("owner_id");
        let back: Participant = serde_json::from_value(value).unwrap();
        assert_eq!(back.owner_id, None);
        assert_eq!(back.secret, participant.secret);
    }
}

/// Enrollment request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRegistration {
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub section: String,
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
}

impl ParticipantRegistration {
    pub fn validate(&self) -> StoreResult<()> {
        let required = [
            ("external_id", &self.external_id),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("section", &self.section),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(StoreError::Validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn test_participant_without_owner_field_deserializes() {
        let participant = Participant::enroll(ParticipantRegistration {
            external_id: "S-1".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: None,
            section: "A".to_string(),
            owner_id: Some(OwnerId::new("")),
        })
        .unwrap();
        assert_eq!(participant.owner_id, None);

        let mut value = serde_json::to_value(&participant).unwrap();
        value.as_object_mut().unwrap().remove("owner_id");
        let back: Participant = serde_json::from_value(value).unwrap();
        assert_eq!(back.owner_id, None);
        assert_eq!(back.secret, participant.secret);
    }
}

/// Activity (course, class session series, event)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub activity_id: ActivityId,
    pub owner_id: OwnerId,
    pub title: String,
    pub description: Option<String>,
    /// Free-form recurrence label, e.g. "MWF"
    pub schedule_label: String,
    pub room: Option<String>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub grace_period_minutes: u32,
    pub allows_departure_scan: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    pub fn from_draft(activity_id: ActivityId, draft: ActivityDraft) -> StoreResult<Self> {
        draft.validate()?;
        let now = Utc::now();
        Ok(Self {
            activity_id,
            owner_id: draft.owner_id,
            title: draft.title,
            description: draft.description,
            schedule_label: draft.schedule_label,
            room: draft.room,
            start_time: draft.start_time,
            end_time: draft.end_time,
            grace_period_minutes: draft.grace_period_minutes.unwrap_or(DEFAULT_GRACE_PERIOD_MINUTES),
            allows_departure_scan: draft.allows_departure_scan.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply an update; identity, owner and creation time are kept
    pub fn apply(&self, draft: ActivityDraft) -> StoreResult<Self> {
        let mut updated = Self::from_draft(self.activity_id.clone(), draft)?;
        updated.owner_id = self.owner_id.clone();
        updated.created_at = self.created_at;
        Ok(updated)
    }

    pub fn schedule(&self) -> ActivitySchedule {
        ActivitySchedule::new(self.start_time, self.grace_period_minutes, self.allows_departure_scan)
    }

    #[cfg(test)]
    fn test_participant_without_owner_field_deserializes() {
        let participant = Participant::enroll(ParticipantRegistration {
            external_id: "S-1".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: None,
            section: "A".to_string(),
            owner_id: Some(OwnerId::new("")),
        })
        .unwrap();
        assert_eq!(participant.owner_id, None);

        let mut value = serde_json::to_value(&participant).unwrap();
        value.as_object_mut().unwrap().remove("owner_id");
        let back: Participant = serde_json::from_value(value).unwrap();
        assert_eq!(back.owner_id, None);
        assert_eq!(back.secret, participant.secret);
    }
}

/// Activity create/update request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDraft {
    pub owner_id: OwnerId,
    pub title: String,
    pub description: Option<String>,
    pub schedule_label: String,
    pub room: Option<String>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Defaults to 15 minutes
    pub grace_period_minutes: Option<u32>,
    /// Defaults to false
    pub allows_departure_scan: Option<bool>,
}

impl ActivityDraft {
    pub fn validate(&self) -> StoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(StoreError::Validation("title is required".to_string()));
        }
        if self.owner_id.as_str().trim().is_empty() {
            return Err(StoreError::Validation("owner_id is required".to_string()));
        }
        Ok(())
    }

    #[cfg(test)]
    fn test_participant_without_owner_field_deserializes() {
        let participant = Participant::enroll(ParticipantRegistration {
            external_id: "S-1".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: None,
            section: "A".to_string(),
            owner_id: Some(OwnerId::new("")),
        })
        .unwrap();
        assert_eq!(participant.owner_id, None);

        let mut value = serde_json::to_value(&participant).unwrap();
        value.as_object_mut().unwrap().remove("owner_id");
        let back: Participant = serde_json::from_value(value).unwrap();
        assert_eq!(back.owner_id, None);
        assert_eq!(back.secret, participant.secret);
    }
}
