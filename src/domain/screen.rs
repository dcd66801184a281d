use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::area_profile::AreaProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ScreenStatus {
    Draft,
    Submitted,
    Pending,
    Verified,
    Rejected,
    Resubmitted,
    ScheduledBlock,
    Blocked,
}

impl ScreenStatus {
    pub fn is_discoverable(&self) -> bool {
        matches!(self, ScreenStatus::Verified | ScreenStatus::ScheduledBlock)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ProfileStatus {
    Unprofiled,
    Profiled,
    Reprofile,
}

impl ProfileStatus {
    pub fn is_discoverable(&self) -> bool {
        matches!(self, ProfileStatus::Profiled | ProfileStatus::Reprofile)
    }
}

/// Hardware/environment/orientation fields (expanded per SPEC_FULL §3 from
/// `original_source/backend/xia/models.py::ScreenMaster`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenHardware {
    pub environment: String,
    pub orientation: String,
    pub resolution_width: Option<i32>,
    pub resolution_height: Option<i32>,
    pub brightness_nits: Option<i32>,
    pub screen_width: Option<f64>,
    pub screen_height: Option<f64>,
    pub pixel_pitch_mm: Option<String>,
    pub supported_formats: Vec<String>,
    pub audio_supported: bool,
    pub technology: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenLocation {
    pub city: String,
    pub full_address: String,
    pub nearest_landmark: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotEconomics {
    pub total_slots_per_loop: i32,
    pub reserved_slots: i32,
}

/// Read-only to the core (spec §3). Only the fields the Discover/Ranking/Profiler
/// pipeline actually reads are modeled as live data; the rest of the administrative
/// schema is out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screen {
    pub id: Uuid,
    pub name: String,
    pub location: ScreenLocation,
    pub hardware: ScreenHardware,
    pub base_price_per_slot: f64,
    pub slots: SlotEconomics,
    pub status: ScreenStatus,
    pub scheduled_block_date: Option<NaiveDate>,
    pub profile_status: ProfileStatus,
    pub area_profile: Option<AreaProfile>,
    pub restricted_ad_categories: Vec<String>,
}

impl Screen {
    pub fn is_discoverable(&self) -> bool {
        self.status.is_discoverable() && self.profile_status.is_discoverable()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingSource {
    Xigi,
    Partner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Hold,
    Active,
    Expired,
    Cancelled,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotBooking {
    pub id: Uuid,
    pub screen_id: Uuid,
    pub num_slots: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub source: BookingSource,
    pub status: BookingStatus,
    pub payment: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl SlotBooking {
    /// Spec §3 invariant: an unpaid XIGI HOLD older than 10 minutes must be
    /// auto-expired before any availability read. PARTNER bookings never auto-expire.
    pub fn is_stale_hold(&self, now: DateTime<Utc>, hold_expiry: chrono::Duration) -> bool {
        self.source == BookingSource::Xigi
            && self.status == BookingStatus::Hold
            && self.payment == PaymentStatus::Unpaid
            && now - self.created_at > hold_expiry
    }

    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }

    pub fn counts_against_availability(&self) -> bool {
        matches!(self.status, BookingStatus::Active | BookingStatus::Hold)
    }
}

/// One creative brief per requested screen, produced by `POST /creative-suggestion`
/// (SPEC_FULL §3, §10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreativeBrief {
    pub screen_id: Uuid,
    pub headline: String,
    pub body_copy: String,
    pub visual_direction: String,
    pub recommended_duration_sec: u32,
    pub compliance_notes: Vec<String>,
}
