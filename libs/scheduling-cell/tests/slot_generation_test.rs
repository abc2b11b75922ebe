mod common;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use scheduling_cell::models::*;
use scheduling_cell::services::{overlaps, slots_for_day, SchedulingStore, SlotGenerator};

use common::*;

fn generator(store: Arc<scheduling_cell::services::InMemoryStore>) -> SlotGenerator {
    let availability = calculator(store.clone());
    let store: Arc<dyn SchedulingStore> = store;
    SlotGenerator::new(store, availability, Duration::minutes(30))
}

// ==============================================================================
// OVERLAP CHECKER
// ==============================================================================

#[test]
fn touching_ranges_do_not_overlap() {
    let t = |h| Utc.with_ymd_and_hms(2030, 3, 4, h, 0, 0).unwrap();
    assert!(!overlaps(t(1), t(2), t(2), t(3)));
    assert!(!overlaps(t(2), t(3), t(1), t(2)));
}

#[test]
fn overlap_is_symmetric_for_strict_intersections() {
    let t = |h, m| Utc.with_ymd_and_hms(2030, 3, 4, h, m, 0).unwrap();
    let cases = [
        (t(1, 0), t(2, 0), t(1, 30), t(2, 30)),
        (t(1, 0), t(3, 0), t(1, 30), t(2, 0)),
        (t(1, 0), t(2, 0), t(1, 0), t(2, 0)),
        (t(1, 0), t(2, 0), t(4, 0), t(5, 0)),
    ];
    for (a, b, c, d) in cases {
        assert_eq!(overlaps(a, b, c, d), overlaps(c, d, a, b));
    }
    assert!(overlaps(t(1, 0), t(2, 0), t(1, 59), t(3, 0)));
    assert!(!overlaps(t(1, 0), t(2, 0), t(4, 0), t(5, 0)));
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[tokio::test]
async fn business_hours_give_the_window() {
    let store = open_store().await;
    let staff = add_staff(&store, "Aoki", 4).await;

    let day = calculator(store).for_staff(staff.id, monday()).await.unwrap();

    assert_eq!(day.window, Some(TimeRange::new(local(monday(), 9, 0), local(monday(), 18, 0))));
    assert!(day.bookings.is_empty());
}

#[tokio::test]
async fn closed_weekday_and_missing_record_are_unavailable() {
    let store = Arc::new(scheduling_cell::services::InMemoryStore::new());
    let staff = add_staff(&store, "Aoki", 4).await;
    let calc = calculator(store.clone());

    assert!(!calc.for_staff(staff.id, monday()).await.unwrap().is_working());

    open_week(&store).await;
    assert!(!calc.for_staff(staff.id, sunday()).await.unwrap().is_working());
}

#[tokio::test]
async fn staff_schedule_overrides_business_hours() {
    let store = open_store().await;
    let staff = add_staff(&store, "Aoki", 4).await;
    store
        .put_staff_schedule(StaffSchedule {
            staff_id: staff.id,
            date: sunday(),
            is_off: false,
            work_start: Some(clock(10, 0)),
            work_end: Some(clock(14, 0)),
        })
        .await;

    let day = calculator(store).for_staff(staff.id, sunday()).await.unwrap();
    assert_eq!(day.window, Some(TimeRange::new(local(sunday(), 10, 0), local(sunday(), 14, 0))));
}

#[tokio::test]
async fn partial_override_falls_back_per_field() {
    let store = open_store().await;
    let staff = add_staff(&store, "Aoki", 4).await;
    store
        .put_staff_schedule(StaffSchedule {
            staff_id: staff.id,
            date: monday(),
            is_off: false,
            work_start: Some(clock(13, 0)),
            work_end: None,
        })
        .await;

    let day = calculator(store).for_staff(staff.id, monday()).await.unwrap();
    assert_eq!(day.window, Some(TimeRange::new(local(monday(), 13, 0), local(monday(), 18, 0))));
}

#[tokio::test]
async fn day_off_short_circuits() {
    let store = open_store().await;
    let staff = add_staff(&store, "Aoki", 4).await;
    add_booking(&store, staff.id, local(monday(), 10, 0), 60).await;
    store
        .put_staff_schedule(StaffSchedule {
            staff_id: staff.id,
            date: monday(),
            is_off: true,
            work_start: Some(clock(9, 0)),
            work_end: Some(clock(18, 0)),
        })
        .await;

    let day = calculator(store).for_staff(staff.id, monday()).await.unwrap();
    assert!(!day.is_working());
    assert!(day.bookings.is_empty());
}

#[tokio::test]
async fn unknown_staff_is_unavailable_not_an_error() {
    let store = open_store().await;
    let day = calculator(store).for_staff(Uuid::new_v4(), monday()).await.unwrap();
    assert!(!day.is_working());
    assert!(day.bookings.is_empty());
}

#[tokio::test]
async fn bookings_are_bucketed_by_clinic_day() {
    let store = open_store().await;
    let staff = add_staff(&store, "Aoki", 4).await;
    let on_day = add_booking(&store, staff.id, local(monday(), 9, 0), 30).await;
    add_booking(&store, staff.id, local(monday().succ_opt().unwrap(), 9, 0), 30).await;
    let mut canceled = add_booking(&store, staff.id, local(monday(), 11, 0), 30).await;
    canceled.status = BookingStatus::Canceled;
    store.put_booking(canceled).await;

    let day = calculator(store).for_staff(staff.id, monday()).await.unwrap();
    assert_eq!(day.bookings.len(), 1);
    assert_eq!(day.bookings[0].id, on_day.id);
}

// ==============================================================================
// SLOT GENERATION
// ==============================================================================

#[tokio::test]
async fn full_free_day_yields_every_fitting_slot() {
    let store = open_store().await;
    add_staff(&store, "Aoki", 4).await;

    let slots = generator(store).generate(monday(), Duration::minutes(60), None).await.unwrap();

    // 09:00, 09:30, ... 17:00; 17:00 + 60 ends exactly at close.
    assert_eq!(slots.len(), 17);
    assert_eq!(slots.first().unwrap().start, local(monday(), 9, 0));
    assert_eq!(slots.last().unwrap().start, local(monday(), 17, 0));
    assert_eq!(slots.last().unwrap().end, local(monday(), 18, 0));
    assert!(slots.iter().all(|s| s.available));
}

#[tokio::test]
async fn existing_booking_marks_overlapping_slots_taken() {
    let store = open_store().await;
    let staff = add_staff(&store, "Aoki", 4).await;
    add_booking(&store, staff.id, local(monday(), 14, 0), 60).await;

    let slots = generator(store).generate(monday(), Duration::minutes(60), None).await.unwrap();
    let at = |h, m| slots.iter().find(|s| s.start == local(monday(), h, m)).unwrap();

    assert!(at(13, 0).available);
    assert!(!at(13, 30).available);
    assert!(!at(14, 0).available);
    assert!(!at(14, 30).available);
    assert!(at(15, 0).available);
}

#[tokio::test]
async fn slots_stay_inside_window_with_exact_duration() {
    let store = open_store().await;
    let staff = add_staff(&store, "Aoki", 4).await;
    store
        .put_staff_schedule(StaffSchedule {
            staff_id: staff.id,
            date: monday(),
            is_off: false,
            work_start: Some(clock(10, 15)),
            work_end: Some(clock(12, 0)),
        })
        .await;
    let window = TimeRange::new(local(monday(), 10, 15), local(monday(), 12, 0));

    for minutes in [15, 30, 45, 90, 105] {
        let duration = Duration::minutes(minutes);
        let slots = generator(store.clone()).generate(monday(), duration, None).await.unwrap();
        assert!(!slots.is_empty());
        for slot in &slots {
            assert_eq!(slot.end - slot.start, duration);
            assert!(slot.start >= window.start);
            assert!(slot.end <= window.end);
        }
    }

    let too_long = generator(store).generate(monday(), Duration::minutes(120), None).await.unwrap();
    assert!(too_long.is_empty());
}

#[tokio::test]
async fn generation_is_idempotent() {
    let store = open_store().await;
    let a = add_staff(&store, "Aoki", 4).await;
    add_staff(&store, "Baba", 4).await;
    add_booking(&store, a.id, local(monday(), 10, 0), 30).await;

    let gen = generator(store);
    let first = gen.generate(monday(), Duration::minutes(30), None).await.unwrap();
    let second = gen.generate(monday(), Duration::minutes(30), None).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn slots_sorted_by_start_then_staff_order() {
    let store = open_store().await;
    let baba = add_staff(&store, "Baba", 4).await;
    let aoki = add_staff(&store, "Aoki", 4).await;

    let slots = generator(store).generate(monday(), Duration::minutes(30), None).await.unwrap();

    assert_eq!(slots.len(), 36);
    assert!(slots.windows(2).all(|w| w[0].start <= w[1].start));
    assert_eq!(slots[0].staff_id, aoki.id);
    assert_eq!(slots[1].staff_id, baba.id);
    assert_eq!(slots[0].start, slots[1].start);
}

#[tokio::test]
async fn unnamed_listing_skips_private_and_inactive_staff() {
    let store = open_store().await;
    let public = add_staff(&store, "Aoki", 4).await;
    let mut private = add_staff(&store, "Baba", 4).await;
    private.is_public = false;
    store.put_staff(private.clone()).await;
    let mut retired = add_staff(&store, "Chiba", 4).await;
    retired.is_active = false;
    store.put_staff(retired.clone()).await;

    let gen = generator(store);
    let slots = gen.generate(monday(), Duration::minutes(60), None).await.unwrap();
    assert!(slots.iter().all(|s| s.staff_id == public.id));

    // Named requests reach private staff but never inactive ones.
    let named = gen.generate(monday(), Duration::minutes(60), Some(private.id)).await.unwrap();
    assert_eq!(named.len(), 17);
    let retired_slots = gen.generate(monday(), Duration::minutes(60), Some(retired.id)).await.unwrap();
    assert!(retired_slots.is_empty());
}

#[tokio::test]
async fn non_positive_duration_is_a_validation_error() {
    let store = open_store().await;
    add_staff(&store, "Aoki", 4).await;
    let result = generator(store).generate(monday(), Duration::zero(), None).await;
    assert!(matches!(result, Err(SchedulingError::Validation(_))));
}

#[tokio::test]
async fn duration_beyond_a_day_is_a_validation_error() {
    let store = open_store().await;
    add_staff(&store, "Aoki", 4).await;
    let gen = generator(store);

    let longest = gen.generate(monday(), Duration::minutes(MAX_BOOKING_MINUTES), None).await;
    assert!(longest.unwrap().is_empty());

    let result = gen.generate(monday(), Duration::minutes(MAX_BOOKING_MINUTES + 1), None).await;
    assert!(matches!(result, Err(SchedulingError::Validation(_))));
}

#[test]
fn huge_minute_counts_do_not_panic() {
    assert!(matches!(booking_duration(10_000_000_000_000), Err(SchedulingError::Validation(_))));
    assert!(matches!(booking_duration(i64::MAX), Err(SchedulingError::Validation(_))));
    assert!(matches!(booking_duration(0), Err(SchedulingError::Validation(_))));
    assert_eq!(booking_duration(90).unwrap(), Duration::minutes(90));
}

#[test]
fn range_past_the_end_of_time_saturates() {
    let start = chrono::DateTime::<Utc>::MAX_UTC - Duration::minutes(5);
    let range = TimeRange::starting_at(start, Duration::minutes(60));
    assert_eq!(range.end, chrono::DateTime::<Utc>::MAX_UTC);
}

#[test]
fn off_staff_contributes_nothing() {
    let staff = Staff {
        id: Uuid::new_v4(),
        name: "Aoki".to_string(),
        is_active: true,
        is_public: true,
        max_parallel: 1,
    };
    let day = DayAvailability::unavailable(staff.id, monday());
    assert!(slots_for_day(&staff, &day, Duration::minutes(30), Duration::minutes(30)).is_empty());
}
