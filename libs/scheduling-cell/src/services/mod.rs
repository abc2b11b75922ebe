pub mod availability;
pub mod balancer;
pub mod booking;
pub mod guard;
pub mod locks;
pub mod memory_store;
pub mod notify;
pub mod overlap;
pub mod reminder;
pub mod slots;
pub mod store;
pub mod supabase_store;
pub mod validation;

pub use availability::{clinic_day, clinic_instant, AvailabilityCalculator};
pub use balancer::StaffLoadBalancer;
pub use booking::BookingService;
pub use guard::{BookingConflictGuard, ProposedBooking};
pub use locks::StaffLocks;
pub use memory_store::InMemoryStore;
pub use notify::{BookingNotifier, DispatcherNotifier, NoopNotifier};
pub use overlap::overlaps;
pub use reminder::ReminderService;
pub use slots::{slots_for_day, SlotGenerator};
pub use store::SchedulingStore;
pub use supabase_store::SupabaseStore;
pub use validation::{validate_create, validate_email, validate_phone};
