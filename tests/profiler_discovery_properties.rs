//! Property tests over the Ring Engine's place dedupe (P2) and the Discover Engine's
//! slot arithmetic (P6), exercised black-box through their public entry points.

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use uuid::Uuid;

use xigi_core::discovery::{self, DiscoverParams};
use xigi_core::domain::filters::FilterMap;
use xigi_core::domain::place::Place;
use xigi_core::domain::screen::{
    BookingSource, BookingStatus, PaymentStatus, ProfileStatus, Screen, ScreenHardware, ScreenLocation, ScreenStatus, SlotBooking, SlotEconomics,
};
use xigi_core::profiler::place_normalizer::PlaceNormalizer;
use xigi_core::profiler::ProfilerTables;
use xigi_core::store::{Cache, MemoryCache, MemoryInventoryStore, ScreenInventoryStore};

fn arb_place() -> impl Strategy<Value = Place> {
    ("[a-z]{1,8}", "[a-z]{1,12}", 12.9f64..13.2, 80.1f64..80.4, 0u32..5000).prop_map(|(id, name, lat, lng, ratings)| Place {
        place_id: id,
        name,
        types: vec!["point_of_interest".to_string()],
        latitude: lat,
        longitude: lng,
        user_ratings_total: ratings,
        editorial_summary: None,
        rating: None,
    })
}

proptest! {
    /// Running dedupe twice must be a no-op: the first pass has already removed every
    /// duplicate-by-id and every near-coincident same-name place.
    #[test]
    fn dedupe_is_idempotent(places in proptest::collection::vec(arb_place(), 0..30)) {
        let tables = ProfilerTables::load(None).expect("bundled profiler tables must parse");
        let normalizer = PlaceNormalizer::new(&tables);

        let once = normalizer.dedupe(&places);
        let twice = normalizer.dedupe(&once);

        prop_assert_eq!(once.len(), twice.len());
        let once_ids: std::collections::HashSet<_> = once.iter().map(|p| p.place_id.clone()).collect();
        let twice_ids: std::collections::HashSet<_> = twice.iter().map(|p| p.place_id.clone()).collect();
        prop_assert_eq!(once_ids, twice_ids);
    }

    /// Deduping never creates places out of thin air and never keeps more than one
    /// place per distinct `place_id`.
    #[test]
    fn dedupe_never_grows_and_drops_literal_id_duplicates(places in proptest::collection::vec(arb_place(), 0..30)) {
        let tables = ProfilerTables::load(None).expect("bundled profiler tables must parse");
        let normalizer = PlaceNormalizer::new(&tables);

        let deduped = normalizer.dedupe(&places);
        prop_assert!(deduped.len() <= places.len());

        let mut seen = std::collections::HashSet::new();
        for place in &deduped {
            prop_assert!(seen.insert(place.place_id.clone()), "duplicate place_id survived dedupe: {}", place.place_id);
        }
    }
}

fn sample_screen(total_slots: i32, reserved: i32, price: f64) -> Screen {
    Screen {
        id: Uuid::new_v4(),
        name: "Property Test Screen".to_string(),
        location: ScreenLocation {
            city: "Chennai".to_string(),
            full_address: "Test Road".to_string(),
            nearest_landmark: "Test Landmark".to_string(),
            latitude: 13.0,
            longitude: 80.2,
        },
        hardware: ScreenHardware {
            environment: "Mall".to_string(),
            orientation: "Landscape".to_string(),
            resolution_width: None,
            resolution_height: None,
            brightness_nits: None,
            screen_width: None,
            screen_height: None,
            pixel_pitch_mm: None,
            supported_formats: vec![],
            audio_supported: false,
            technology: "LED".to_string(),
        },
        base_price_per_slot: price,
        slots: SlotEconomics { total_slots_per_loop: total_slots, reserved_slots: reserved },
        status: ScreenStatus::Verified,
        scheduled_block_date: None,
        profile_status: ProfileStatus::Profiled,
        area_profile: None,
        restricted_ad_categories: vec![],
    }
}

fn active_booking(screen_id: Uuid, num_slots: i32, start: NaiveDate, end: NaiveDate) -> SlotBooking {
    SlotBooking {
        id: Uuid::new_v4(),
        screen_id,
        num_slots,
        start_date: start,
        end_date: end,
        source: BookingSource::Partner,
        status: BookingStatus::Active,
        payment: PaymentStatus::Paid,
        created_at: start.and_hms_opt(0, 0, 0).unwrap().and_utc(),
    }
}

proptest! {
    /// A screen can only be reported available when its booked + reserved slots leave
    /// at least one free slot in the requested window, and its per-slot price fits
    /// the window's derived daily budget — the arithmetic `compute_availability`
    /// performs internally (C8, spec.md P6).
    #[test]
    fn availability_never_exceeds_physical_slot_capacity(
        total_slots in 0i32..30,
        reserved in 0i32..30,
        booked in 0i32..30,
        price in 1.0f64..5000.0,
        budget in 1.0f64..500000.0,
    ) {
        tokio::runtime::Runtime::new().unwrap().block_on(async {
            let screen = sample_screen(total_slots, reserved, price);
            let start = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
            let end = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();
            let bookings = if booked > 0 { vec![active_booking(screen.id, booked, start, end)] } else { vec![] };

            let screen_id = screen.id;
            let inventory: Arc<dyn ScreenInventoryStore> = Arc::new(MemoryInventoryStore::new(vec![screen], bookings));
            let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
            let menu = discovery::filter_menu::build(&inventory, &cache).await.unwrap();

            let empty_filters = FilterMap::new();
            let result = discovery::discover(
                &inventory,
                &menu,
                &[],
                chrono::Duration::minutes(10),
                DiscoverParams {
                    locations: vec![],
                    start,
                    end,
                    budget,
                    xia_filters: &empty_filters,
                    excludes: &empty_filters,
                    text_search: None,
                },
            )
            .await
            .unwrap();

            let found = result.screens.iter().find(|s| s.screen.id == screen_id).expect("screen always matches an empty filter set");
            let physical_free = total_slots - reserved - booked;

            if found.availability.is_available {
                prop_assert!(physical_free > 0, "reported available with no physical slots free: free={physical_free}");
            }
            if physical_free <= 0 {
                prop_assert!(!found.availability.is_available, "reported available with free={physical_free}");
            }
            Ok(())
        })?;
    }
}
