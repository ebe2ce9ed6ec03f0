pub mod checkin;
pub mod household;
pub mod member;

pub use checkin::Checkin;
pub use household::Household;
pub use member::{Member, MemberStatus};
