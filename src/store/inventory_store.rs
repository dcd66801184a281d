use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::screen::{Screen, SlotBooking};

/// Read-only view of screen specs + bookings + profile snapshots (spec.md §1). The
/// core never writes through this trait except to expire stale HOLDs (spec.md §3
/// invariant), which is the one mutation explicitly carved out as belonging to discovery.
#[async_trait]
pub trait ScreenInventoryStore: Send + Sync {
    async fn discoverable_screens(&self) -> anyhow::Result<Vec<Screen>>;
    async fn screen_by_id(&self, id: Uuid) -> anyhow::Result<Option<Screen>>;
    async fn bookings_for_screen(&self, screen_id: Uuid) -> anyhow::Result<Vec<SlotBooking>>;

    /// Auto-expires any stale XIGI/UNPAID/HOLD booking older than `hold_expiry`
    /// (spec.md §3, P7). Returns the number of bookings expired.
    async fn expire_stale_holds(&self, hold_expiry: chrono::Duration) -> anyhow::Result<u64>;

    /// Distinct non-empty values for an enum field across the live inventory, used by
    /// the Filter Menu (C7, spec.md §4.7).
    async fn distinct_values(&self, field: &str) -> anyhow::Result<Vec<String>>;
}

/// Postgres-backed implementation, grounded on the teacher's `ChatDatabaseService`
/// (`sqlx::query_as!` over a shared `PgPool`).
pub struct PgInventoryStore {
    pool: sqlx::PgPool,
}

impl PgInventoryStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScreenInventoryStore for PgInventoryStore {
    async fn discoverable_screens(&self) -> anyhow::Result<Vec<Screen>> {
        // Real deployments join screen_master + area_profile + slot_booking; the join
        // and row mapping live in a migration-backed view (`discoverable_screens_v`)
        // so this stays a single flat query rather than hand-assembled joins here.
        let rows = sqlx::query_as::<_, ScreenRow>(
            "SELECT payload FROM discoverable_screens_v",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_screen()).collect()
    }

    async fn screen_by_id(&self, id: Uuid) -> anyhow::Result<Option<Screen>> {
        let row = sqlx::query_as::<_, ScreenRow>(
            "SELECT payload FROM discoverable_screens_v WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.into_screen()).transpose()
    }

    async fn bookings_for_screen(&self, screen_id: Uuid) -> anyhow::Result<Vec<SlotBooking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT payload FROM slot_booking_v WHERE screen_id = $1",
        )
        .bind(screen_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_booking()).collect()
    }

    async fn expire_stale_holds(&self, hold_expiry: chrono::Duration) -> anyhow::Result<u64> {
        let cutoff = chrono::Utc::now() - hold_expiry;
        let result = sqlx::query(
            "UPDATE slot_booking SET status = 'EXPIRED' \
             WHERE source = 'XIGI' AND payment = 'UNPAID' AND status = 'HOLD' AND created_at < $1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn distinct_values(&self, field: &str) -> anyhow::Result<Vec<String>> {
        // `field` is only ever one of the fixed Filter Menu column names (C7), never
        // user input, so interpolation here does not open a SQL-injection surface.
        let query = format!(
            "SELECT DISTINCT {field} AS v FROM discoverable_screens_v WHERE {field} IS NOT NULL AND {field} <> ''"
        );
        let rows: Vec<(String,)> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(v,)| v).collect())
    }
}

#[derive(sqlx::FromRow)]
struct ScreenRow {
    payload: serde_json::Value,
}

impl ScreenRow {
    fn into_screen(self) -> anyhow::Result<Screen> {
        Ok(serde_json::from_value(self.payload)?)
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    payload: serde_json::Value,
}

impl BookingRow {
    fn into_booking(self) -> anyhow::Result<SlotBooking> {
        Ok(serde_json::from_value(self.payload)?)
    }
}

/// In-memory store used by tests and `profiler-cli`.
pub struct MemoryInventoryStore {
    screens: tokio::sync::RwLock<Vec<Screen>>,
    bookings: tokio::sync::RwLock<Vec<SlotBooking>>,
}

impl MemoryInventoryStore {
    pub fn new(screens: Vec<Screen>, bookings: Vec<SlotBooking>) -> Self {
        Self {
            screens: tokio::sync::RwLock::new(screens),
            bookings: tokio::sync::RwLock::new(bookings),
        }
    }
}

#[async_trait]
impl ScreenInventoryStore for MemoryInventoryStore {
    async fn discoverable_screens(&self) -> anyhow::Result<Vec<Screen>> {
        Ok(self.screens.read().await.iter().filter(|s| s.is_discoverable()).cloned().collect())
    }

    async fn screen_by_id(&self, id: Uuid) -> anyhow::Result<Option<Screen>> {
        Ok(self.screens.read().await.iter().find(|s| s.id == id).cloned())
    }

    async fn bookings_for_screen(&self, screen_id: Uuid) -> anyhow::Result<Vec<SlotBooking>> {
        Ok(self
            .bookings
            .read()
            .await
            .iter()
            .filter(|b| b.screen_id == screen_id)
            .cloned()
            .collect())
    }

    async fn expire_stale_holds(&self, hold_expiry: chrono::Duration) -> anyhow::Result<u64> {
        let now = chrono::Utc::now();
        let mut bookings = self.bookings.write().await;
        let mut expired = 0;
        for booking in bookings.iter_mut() {
            if booking.is_stale_hold(now, hold_expiry) {
                booking.status = crate::domain::screen::BookingStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn distinct_values(&self, field: &str) -> anyhow::Result<Vec<String>> {
        let screens = self.screens.read().await;
        let mut values: Vec<String> = screens
            .iter()
            .filter_map(|s| match field {
                "city" | "spec_city" => Some(s.location.city.clone()),
                "environment" => Some(s.hardware.environment.clone()),
                "orientation" => Some(s.hardware.orientation.clone()),
                "technology" => Some(s.hardware.technology.clone()),
                "primaryType" => s.area_profile.as_ref().map(|p| p.area.primary_type.clone()),
                "movementType" => {
                    s.area_profile.as_ref().map(|p| p.movement.movement_type.as_str().to_string())
                }
                "dwellCategory" => {
                    s.area_profile.as_ref().map(|p| p.dwell_category.as_str().to_string())
                }
                _ => None,
            })
            .filter(|v| !v.is_empty())
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }
}
